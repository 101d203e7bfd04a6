use serde::{Deserialize, Serialize};

/// Request body posted to the analysis endpoint.
///
/// The percentage is forwarded exactly as typed; range and numeric checks are
/// left to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Raw text of the train percentage field.
    pub train_percentage: String,
}

impl AnalysisRequest {
    /// Wraps the raw field value.
    #[must_use]
    pub fn new(train_percentage: impl Into<String>) -> Self {
        Self {
            train_percentage: train_percentage.into(),
        }
    }
}

/// Metrics and feature rankings produced by one server-side analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Number of training samples.
    pub train_size: u64,
    /// Number of validation samples.
    pub validation_size: u64,
    /// Weighted F1 on the validation split, all features.
    pub f1_score_validation: f64,
    /// Weighted F1 on the training split, all features.
    pub f1_score_training: f64,
    /// Top features, most important first.
    pub top_10_features_desc: Vec<String>,
    /// Weighted F1 on the validation split, top features only.
    pub f1_score_validation_reduced: f64,
    /// Weighted F1 on the training split, top features only.
    pub f1_score_training_reduced: f64,
    /// Every feature, least important first.
    pub features_asc: Vec<String>,
}

/// Body of a 2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    /// Analysis payload. Absent only on a misbehaving server.
    #[serde(default)]
    pub results: Option<AnalysisResult>,
    /// Informational message from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Percentage as the server understood it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_percentage: Option<f64>,
}

/// Body of a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Server-provided failure description.
    #[serde(default)]
    pub error: Option<String>,
}
