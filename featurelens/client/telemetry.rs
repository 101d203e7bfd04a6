use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use uuid::Uuid;

/// Builder configuring telemetry for the form controller.
pub struct ClientTelemetryBuilder {
    component: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl ClientTelemetryBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            event_publisher: None,
        }
    }

    /// Sets the JSON log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops log records below `level`.
    #[must_use]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Assigns the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<ClientTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::with_min_level(path, self.min_level)?),
            None => None,
        };
        Ok(ClientTelemetry {
            inner: Arc::new(TelemetryInner {
                component: self.component,
                logger,
                publisher: self.event_publisher,
            }),
        })
    }
}

/// Telemetry handle shared by concurrent submissions.
#[derive(Clone)]
pub struct ClientTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ClientTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientTelemetry")
            .field("component", &self.inner.component)
            .field("logging", &self.inner.logger.is_some())
            .field("events", &self.inner.publisher.is_some())
            .finish()
    }
}

struct TelemetryInner {
    component: String,
    logger: Option<JsonLogger>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl ClientTelemetry {
    /// Returns a builder for this telemetry helper.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> ClientTelemetryBuilder {
        ClientTelemetryBuilder::new(component)
    }

    /// Telemetry that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                component: "client".into(),
                logger: None,
                publisher: None,
            }),
        }
    }

    /// Logs a structured record.
    pub fn log(&self, level: LogLevel, message: &str, fields: &Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(&self.inner.component, level, message).with_fields(fields);
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Emits an event on the configured bus.
    pub async fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(publisher) = &self.inner.publisher {
            let record = EventRecord::new(
                format!("evt-{}", Uuid::new_v4()),
                self.inner.component.clone(),
                event_type,
                payload,
            );
            publisher.publish(record).await?;
        }
        Ok(())
    }

    /// Logs and emits the same lifecycle entry. Sink failures never fail a submission.
    pub async fn record(&self, level: LogLevel, event_type: &str, payload: Value) {
        if let Err(err) = self.log(level, event_type, &payload) {
            tracing::warn!("telemetry log write failed: {err:#}");
        }
        if let Err(err) = self.event(event_type, payload).await {
            tracing::warn!("telemetry event publish failed: {err:#}");
        }
    }
}
