use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use serde_json::json;
use shared_logging::LogLevel;
use uuid::Uuid;

use crate::{
    config::{ClientConfig, InFlightPolicy},
    error::AnalyzeError,
    model::{AnalysisRequest, AnalysisResult, ErrorEnvelope, SuccessEnvelope},
    render::render_results,
    surface::{DocumentSurface, Panel},
    telemetry::ClientTelemetry,
    transport::{AnalysisTransport, TransportResponse},
};

/// How a submission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Results were rendered into the results panel.
    Rendered {
        /// Identifier used in logs and events.
        submission_id: String,
        /// Parsed analysis payload.
        results: AnalysisResult,
        /// Informational message sent alongside the results.
        message: Option<String>,
    },
    /// The error panel shows the failure.
    Failed {
        /// Identifier used in logs and events.
        submission_id: String,
        /// Failure classification.
        error: AnalyzeError,
    },
    /// A newer submission started first; the panels were left untouched.
    Superseded {
        /// Identifier used in logs and events.
        submission_id: String,
    },
}

impl SubmissionOutcome {
    /// Identifier of the submission.
    #[must_use]
    pub fn submission_id(&self) -> &str {
        match self {
            Self::Rendered { submission_id, .. }
            | Self::Failed { submission_id, .. }
            | Self::Superseded { submission_id } => submission_id,
        }
    }

    /// Whether results were rendered.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Drives the analysis form: panel toggling, the request, and dispatch to the
/// renderer or the error panel.
///
/// Cloning is cheap and clones share the surface, transport, and submission
/// counter, so overlapping submissions can be issued from several tasks.
#[derive(Clone)]
pub struct FormController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    surface: Arc<dyn DocumentSurface>,
    transport: Arc<dyn AnalysisTransport>,
    config: ClientConfig,
    telemetry: ClientTelemetry,
    generation: AtomicU64,
}

impl std::fmt::Debug for FormController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("endpoint", &self.inner.config.endpoint)
            .field("in_flight", &self.inner.config.in_flight)
            .finish()
    }
}

impl FormController {
    /// Creates a controller without telemetry.
    #[must_use]
    pub fn new(
        surface: Arc<dyn DocumentSurface>,
        transport: Arc<dyn AnalysisTransport>,
        config: ClientConfig,
    ) -> Self {
        Self::builder(surface, transport).config(config).build()
    }

    /// Builder entry point.
    #[must_use]
    pub fn builder(
        surface: Arc<dyn DocumentSurface>,
        transport: Arc<dyn AnalysisTransport>,
    ) -> FormControllerBuilder {
        FormControllerBuilder {
            surface,
            transport,
            config: ClientConfig::default(),
            telemetry: None,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Handles a form submit: reads the percentage input and submits it.
    pub async fn handle_submit(&self) -> SubmissionOutcome {
        let raw = self.inner.surface.percentage_value();
        self.submit(&raw).await
    }

    /// Submits a raw percentage value and updates the panels with the outcome.
    pub async fn submit(&self, raw_percentage: &str) -> SubmissionOutcome {
        let inner = &self.inner;
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let submission_id = format!("sub-{}", Uuid::new_v4());
        let endpoint = inner.config.endpoint.as_str();

        inner.surface.hide(Panel::Results);
        inner.surface.hide(Panel::Error);
        inner.surface.show(Panel::Loading);
        inner
            .telemetry
            .record(
                LogLevel::Info,
                "submission.started",
                json!({
                    "submission_id": submission_id,
                    "train_percentage": raw_percentage,
                    "endpoint": endpoint,
                }),
            )
            .await;

        let started = Instant::now();
        let request = AnalysisRequest::new(raw_percentage);
        let response = inner.transport.post_json(endpoint, &request).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if inner.config.in_flight == InFlightPolicy::Supersede
            && inner.generation.load(Ordering::SeqCst) != generation
        {
            tracing::debug!("dropping response of superseded submission {submission_id}");
            inner
                .telemetry
                .record(
                    LogLevel::Debug,
                    "submission.superseded",
                    json!({ "submission_id": submission_id, "latency_ms": latency_ms }),
                )
                .await;
            return SubmissionOutcome::Superseded { submission_id };
        }

        inner.surface.hide(Panel::Loading);
        let status = response.as_ref().ok().map(|r| r.status);
        let parsed = match response {
            Ok(response) if response.is_success() => parse_success(&response),
            Ok(response) => Err(classify_failure(&response)),
            Err(err) => Err(AnalyzeError::Connection {
                reason: err.to_string(),
                endpoint: endpoint.to_string(),
            }),
        };

        match parsed {
            Ok(envelope) => {
                let html = render_results(&envelope.results);
                inner.surface.hide(Panel::Error);
                inner.surface.set_html(Panel::Results, &html);
                inner.surface.show(Panel::Results);
                inner
                    .telemetry
                    .record(
                        LogLevel::Info,
                        "submission.rendered",
                        json!({
                            "submission_id": submission_id,
                            "status": status,
                            "latency_ms": latency_ms,
                            "message": envelope.message,
                            "input_percentage": envelope.input_percentage,
                            "top_features": envelope.results.top_10_features_desc.len(),
                            "features": envelope.results.features_asc.len(),
                        }),
                    )
                    .await;
                SubmissionOutcome::Rendered {
                    submission_id,
                    results: envelope.results,
                    message: envelope.message,
                }
            }
            Err(error) => {
                let text = error.user_message(&inner.config.guidance);
                inner.surface.hide(Panel::Results);
                inner.surface.set_text(Panel::Error, &text);
                inner.surface.show(Panel::Error);
                inner
                    .telemetry
                    .record(
                        LogLevel::Warn,
                        "submission.failed",
                        json!({
                            "submission_id": submission_id,
                            "kind": error.kind(),
                            "status": error.status(),
                            "latency_ms": latency_ms,
                            "error": error.to_string(),
                        }),
                    )
                    .await;
                SubmissionOutcome::Failed {
                    submission_id,
                    error,
                }
            }
        }
    }
}

/// Builder for [`FormController`].
pub struct FormControllerBuilder {
    surface: Arc<dyn DocumentSurface>,
    transport: Arc<dyn AnalysisTransport>,
    config: ClientConfig,
    telemetry: Option<ClientTelemetry>,
}

impl FormControllerBuilder {
    /// Overrides the configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: ClientTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the controller.
    #[must_use]
    pub fn build(self) -> FormController {
        FormController {
            inner: Arc::new(ControllerInner {
                surface: self.surface,
                transport: self.transport,
                config: self.config,
                telemetry: self.telemetry.unwrap_or_else(ClientTelemetry::disabled),
                generation: AtomicU64::new(0),
            }),
        }
    }
}

struct ParsedSuccess {
    results: AnalysisResult,
    message: Option<String>,
    input_percentage: Option<f64>,
}

fn parse_success(response: &TransportResponse) -> Result<ParsedSuccess, AnalyzeError> {
    let value: serde_json::Value =
        serde_json::from_str(&response.body).map_err(|err| AnalyzeError::MalformedSuccess {
            reason: format!("body is not JSON ({err})"),
        })?;
    let envelope: SuccessEnvelope =
        serde_json::from_value(value).map_err(|err| AnalyzeError::MalformedSuccess {
            reason: format!("invalid results payload ({err})"),
        })?;
    let results = envelope
        .results
        .ok_or_else(|| AnalyzeError::MalformedSuccess {
            reason: "response has no results".into(),
        })?;
    Ok(ParsedSuccess {
        results,
        message: envelope.message,
        input_percentage: envelope.input_percentage,
    })
}

fn classify_failure(response: &TransportResponse) -> AnalyzeError {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&response.body) else {
        return AnalyzeError::MalformedErrorBody {
            status: response.status,
            status_text: response.status_text.clone(),
        };
    };
    // Any JSON body without a string `error` member falls back to the status text.
    let message = serde_json::from_value::<ErrorEnvelope>(value)
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| response.status_text.clone());
    AnalyzeError::Server {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        model::fixtures::sample_result,
        surface::{MemorySurface, PanelContent},
        transport::{ScriptedTransport, TransportError},
    };

    fn success_body() -> serde_json::Value {
        json!({
            "message": "Feature analysis completed.",
            "input_percentage": 70.0,
            "results": sample_result(),
        })
    }

    fn controller(
        transport: ScriptedTransport,
    ) -> (FormController, Arc<MemorySurface>, Arc<ScriptedTransport>) {
        let surface = Arc::new(MemorySurface::with_percentage("70"));
        let transport = Arc::new(transport);
        let controller =
            FormController::new(surface.clone(), transport.clone(), ClientConfig::default());
        (controller, surface, transport)
    }

    fn error_text(surface: &MemorySurface) -> String {
        match surface.snapshot().error.content {
            PanelContent::Text(text) => text,
            other => panic!("expected error text, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_renders_results_panel() {
        let (controller, surface, transport) = controller(
            ScriptedTransport::new()
                .respond(Duration::ZERO, TransportResponse::json(200, &success_body())),
        );
        let outcome = controller.handle_submit().await;
        assert!(outcome.is_rendered());
        let snapshot = surface.snapshot();
        assert_eq!(snapshot.visible_panels(), vec![Panel::Results]);
        assert!(matches!(
            snapshot.results.content,
            PanelContent::Html(ref html) if html.contains("<li>x</li>")
        ));
        let requests = transport.requests();
        assert_eq!(requests[0].body, AnalysisRequest::new("70"));
        assert_eq!(requests[0].endpoint, ClientConfig::default().endpoint);
    }

    #[tokio::test]
    async fn loading_panel_shows_only_while_in_flight() {
        let (controller, surface, _) = controller(
            ScriptedTransport::new()
                .respond(Duration::ZERO, TransportResponse::json(200, &success_body())),
        );
        controller.submit("70").await;
        let history = surface.visibility_history();
        assert_eq!(history[2], vec![Panel::Loading]);
        assert!(history.iter().all(|visible| {
            !(visible.contains(&Panel::Loading) && visible.contains(&Panel::Results))
        }));
    }

    #[tokio::test]
    async fn server_error_message_is_shown_with_status() {
        let (controller, surface, _) = controller(ScriptedTransport::new().respond(
            Duration::ZERO,
            TransportResponse::json(
                400,
                &json!({ "error": "percentage must be between 1 and 100" }),
            ),
        ));
        let outcome = controller.submit("250").await;
        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed {
                error: AnalyzeError::Server { status: 400, .. },
                ..
            }
        ));
        let text = error_text(&surface);
        assert!(text.contains("400"));
        assert!(text.contains("percentage must be between 1 and 100"));
        assert!(text.ends_with(&ClientConfig::default().guidance));
        assert_eq!(surface.snapshot().visible_panels(), vec![Panel::Error]);
    }

    #[tokio::test]
    async fn missing_error_member_falls_back_to_status_text() {
        let (controller, surface, _) = controller(
            ScriptedTransport::new()
                .respond(Duration::ZERO, TransportResponse::json(503, &json!({}))),
        );
        controller.submit("70").await;
        assert!(error_text(&surface).starts_with("Error 503: Service Unavailable."));
    }

    #[tokio::test]
    async fn error_member_of_wrong_shape_falls_back_to_status_text() {
        for body in [json!({ "error": ["x"] }), json!([]), json!({ "error": 42 })] {
            let (controller, surface, _) = controller(
                ScriptedTransport::new()
                    .respond(Duration::ZERO, TransportResponse::json(500, &body)),
            );
            let outcome = controller.submit("70").await;
            assert!(matches!(
                outcome,
                SubmissionOutcome::Failed {
                    error: AnalyzeError::Server { status: 500, ref message },
                    ..
                } if message == "Internal Server Error"
            ));
            assert!(error_text(&surface).starts_with("Error 500: Internal Server Error."));
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_handled() {
        let (controller, surface, _) = controller(ScriptedTransport::new().respond(
            Duration::ZERO,
            TransportResponse::new(502, "<html>bad gateway</html>"),
        ));
        let outcome = controller.submit("70").await;
        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed {
                error: AnalyzeError::MalformedErrorBody { status: 502, .. },
                ..
            }
        ));
        assert!(error_text(&surface).starts_with("Error 502: Bad Gateway."));
    }

    #[tokio::test]
    async fn network_failure_shows_connection_error() {
        let (controller, surface, _) = controller(ScriptedTransport::new().fail(
            Duration::ZERO,
            TransportError::Network("connection refused".into()),
        ));
        let outcome = controller.submit("70").await;
        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed {
                error: AnalyzeError::Connection { .. },
                ..
            }
        ));
        let snapshot = surface.snapshot();
        assert!(!snapshot.is_visible(Panel::Loading));
        assert!(!snapshot.is_visible(Panel::Results));
        assert!(snapshot.is_visible(Panel::Error));
        let text = error_text(&surface);
        assert!(text.contains("connection refused"));
        assert!(text.contains(&ClientConfig::default().endpoint));
    }

    #[tokio::test]
    async fn malformed_success_bodies_surface_errors() {
        let cases = [
            TransportResponse::new(200, "not json"),
            TransportResponse::json(200, &json!({ "message": "done" })),
            TransportResponse::json(200, &json!({ "results": { "train_size": 1 } })),
        ];
        for response in cases {
            let (controller, surface, _) =
                controller(ScriptedTransport::new().respond(Duration::ZERO, response));
            let outcome = controller.submit("70").await;
            assert!(matches!(
                outcome,
                SubmissionOutcome::Failed {
                    error: AnalyzeError::MalformedSuccess { .. },
                    ..
                }
            ));
            assert_eq!(surface.snapshot().visible_panels(), vec![Panel::Error]);
        }
    }

    #[tokio::test]
    async fn last_settled_response_wins_by_default() {
        let (controller, surface, _) = controller(
            ScriptedTransport::new()
                .respond(
                    Duration::from_millis(150),
                    TransportResponse::json(200, &success_body()),
                )
                .respond(
                    Duration::from_millis(10),
                    TransportResponse::json(500, &json!({ "error": "dataset unavailable" })),
                ),
        );
        let first = controller.clone();
        let second = controller.clone();
        let (a, b) = tokio::join!(first.submit("70"), async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            second.submit("80").await
        });
        assert!(a.is_rendered());
        assert!(matches!(b, SubmissionOutcome::Failed { .. }));
        // The first request settled last, so its results own the panels.
        assert_eq!(surface.snapshot().visible_panels(), vec![Panel::Results]);
    }

    #[tokio::test]
    async fn supersede_policy_keeps_latest_submission() {
        let surface = Arc::new(MemorySurface::default());
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    Duration::from_millis(150),
                    TransportResponse::json(200, &success_body()),
                )
                .respond(
                    Duration::from_millis(10),
                    TransportResponse::json(500, &json!({ "error": "dataset unavailable" })),
                ),
        );
        let config = ClientConfig {
            in_flight: InFlightPolicy::Supersede,
            ..ClientConfig::default()
        };
        let controller = FormController::new(surface.clone(), transport, config);
        let second = controller.clone();
        let (a, b) = tokio::join!(controller.submit("70"), async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            second.submit("80").await
        });
        assert!(matches!(a, SubmissionOutcome::Superseded { .. }));
        assert!(matches!(b, SubmissionOutcome::Failed { .. }));
        let snapshot = surface.snapshot();
        assert_eq!(snapshot.visible_panels(), vec![Panel::Error]);
        assert!(error_text(&surface).contains("dataset unavailable"));
    }
}
