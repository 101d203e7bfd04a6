use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that overrides the configured endpoint.
pub const ENDPOINT_ENV: &str = "FEATURELENS_ENDPOINT";

/// Endpoint of a locally running analysis server.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/api/v1/analyze/";

/// Configuration validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Endpoint is not an absolute http(s) URL.
    #[error("invalid endpoint '{0}': expected an absolute http or https URL")]
    InvalidEndpoint(String),
    /// Timeout set to zero.
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,
    /// An element id or the hidden class is blank.
    #[error("element setting '{0}' must not be empty")]
    EmptyElement(&'static str),
}

/// How overlapping submissions are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Every settled response updates the panels; the last to settle wins.
    #[default]
    LastSettledWins,
    /// Responses belonging to an older submission are discarded.
    Supersede,
}

/// Identifiers of the document elements the controller drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    /// Form receiving submit events.
    pub form: String,
    /// Numeric train percentage input.
    pub percentage: String,
    /// Results panel.
    pub results: String,
    /// Loading panel.
    pub loading: String,
    /// Error panel.
    pub error: String,
    /// CSS class that hides an element.
    pub hidden_class: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            form: "analysis-form".into(),
            percentage: "percentage".into(),
            results: "results".into(),
            loading: "loading".into(),
            error: "error-message".into(),
            hidden_class: "hidden".into(),
        }
    }
}

impl ElementIds {
    fn validate(&self) -> Result<(), ConfigError> {
        let entries = [
            ("form", &self.form),
            ("percentage", &self.percentage),
            ("results", &self.results),
            ("loading", &self.loading),
            ("error", &self.error),
            ("hidden_class", &self.hidden_class),
        ];
        for (name, value) in entries {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyElement(name));
            }
        }
        Ok(())
    }
}

/// Client configuration, usually loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Analysis endpoint receiving the POST.
    pub endpoint: String,
    /// Optional request timeout. No timeout when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Overlapping submission policy.
    pub in_flight: InFlightPolicy,
    /// Sentence appended to server error messages.
    pub guidance: String,
    /// Document element identifiers.
    pub elements: ElementIds,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            timeout_ms: None,
            in_flight: InFlightPolicy::default(),
            guidance: default_guidance(),
            elements: ElementIds::default(),
        }
    }
}

impl ClientConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading client config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.endpoint = config.endpoint.trim().to_string();
        config.validate()?;
        Ok(config)
    }

    /// Applies `FEATURELENS_ENDPOINT` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        self.validate()
    }

    /// Checks every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(self.endpoint.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        self.elements.validate()
    }

    /// Request timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn default_guidance() -> String {
    "Please check the analysis server's storage environment variables.".into()
}
