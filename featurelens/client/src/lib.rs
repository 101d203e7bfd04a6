#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions)]

//! Featurelens client: submits a train percentage to the feature-selection
//! analysis API and renders the returned metrics into a document surface.

/// Client configuration and validation.
#[path = "../config.rs"]
pub mod config;

/// Failure taxonomy of a submission.
#[path = "../error.rs"]
pub mod error;

/// Request and response payloads.
#[path = "../model.rs"]
pub mod model;

/// HTML rendering of analysis results.
#[path = "../render.rs"]
pub mod render;

/// Document panels driven by the controller.
#[path = "../surface.rs"]
pub mod surface;

/// HTTP transports.
#[path = "../transport.rs"]
pub mod transport;

/// Structured logging and lifecycle events.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Form controller orchestrating a submission.
#[path = "../controller.rs"]
pub mod controller;

/// Full-page rendering.
#[path = "../page.rs"]
pub mod page;

pub use config::{ClientConfig, ConfigError, ElementIds, InFlightPolicy};
pub use controller::{FormController, FormControllerBuilder, SubmissionOutcome};
pub use error::AnalyzeError;
pub use model::{AnalysisRequest, AnalysisResult, ErrorEnvelope, SuccessEnvelope};
pub use page::render_page;
pub use render::{escape_html, render_results};
pub use surface::{DocumentSurface, MemorySurface, Panel, PanelContent, SurfaceSnapshot};
pub use telemetry::{ClientTelemetry, ClientTelemetryBuilder};
pub use transport::{
    AnalysisTransport, HttpTransport, ScriptedTransport, TransportError, TransportResponse,
};
