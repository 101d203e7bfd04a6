use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use featurelens_client::{
    render_page, render_results, AnalysisResult, ClientConfig, ClientTelemetry, DocumentSurface,
    ElementIds, FormController, HttpTransport, MemorySurface, Panel, PanelContent,
    SubmissionOutcome, SuccessEnvelope,
};
use serde_json::Value;
use shared_event_bus::FileEventPublisher;
use shared_logging::LogLevel;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "lens", version, about = "Feature-selection analysis client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submits a train percentage to the analysis API.
    Analyze(AnalyzeArgs),
    /// Renders a saved analysis response without contacting the server.
    Render {
        /// JSON file holding a success response or a bare results object.
        #[arg(long)]
        input: PathBuf,
        /// Writes a full page instead of printing the fragment.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Supplies element ids and the hidden class for `--out`.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Prints the empty analysis page.
    Page {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Raw train percentage, forwarded unmodified.
    #[arg(long, allow_hyphen_values = true)]
    percentage: String,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured endpoint (and FEATURELENS_ENDPOINT).
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Writes the resulting page snapshot to this file.
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long)]
    event_log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => handle_analyze(args),
        Commands::Render { input, out, config } => {
            let config = load_config(config.as_deref())?;
            handle_render(&input, out.as_deref(), &config.elements)
        }
        Commands::Page { config } => {
            let config = load_config(config.as_deref())?;
            print!(
                "{}",
                render_page(&MemorySurface::default().snapshot(), &config.elements)
            );
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;
    Ok(config)
}

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_cli_overrides(&mut config, args.endpoint.as_deref(), args.timeout_ms);
    config.validate()?;

    let mut telemetry = ClientTelemetry::builder("lens.analyze").min_level(LogLevel::Info);
    if let Some(path) = &args.log_file {
        telemetry = telemetry.log_path(path);
    }
    if let Some(path) = &args.event_log {
        telemetry = telemetry.event_publisher(Arc::new(FileEventPublisher::new(path)?));
    }
    let telemetry = telemetry.build()?;

    let surface = Arc::new(MemorySurface::with_percentage(args.percentage));
    let transport = Arc::new(HttpTransport::new(config.timeout())?);
    let controller = FormController::builder(surface.clone(), transport)
        .config(config)
        .telemetry(telemetry)
        .build();

    let runtime = Runtime::new()?;
    let outcome = runtime.block_on(controller.handle_submit());

    if let Some(path) = &args.out {
        write_file(
            path,
            &render_page(&surface.snapshot(), &controller.config().elements),
        )?;
    }

    let submission_id = outcome.submission_id().to_string();
    match outcome {
        SubmissionOutcome::Rendered { results, .. } => {
            print!("{}", render_results(&results));
            Ok(())
        }
        SubmissionOutcome::Failed { error, .. } => {
            let text = match surface.snapshot().error.content {
                PanelContent::Text(text) => text,
                _ => error.to_string(),
            };
            bail!("{text} (submission {submission_id})")
        }
        SubmissionOutcome::Superseded { .. } => {
            bail!("submission {submission_id} was superseded")
        }
    }
}

fn apply_cli_overrides(config: &mut ClientConfig, endpoint: Option<&str>, timeout_ms: Option<u64>) {
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint.trim().to_string();
    }
    if timeout_ms.is_some() {
        config.timeout_ms = timeout_ms;
    }
}

fn handle_render(input: &Path, out: Option<&Path>, elements: &ElementIds) -> Result<()> {
    let raw = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let results = parse_saved_results(&raw)
        .with_context(|| format!("parsing analysis results from {}", input.display()))?;
    let fragment = render_results(&results);
    match out {
        Some(path) => {
            let surface = MemorySurface::default();
            surface.set_html(Panel::Results, &fragment);
            surface.show(Panel::Results);
            write_file(path, &render_page(&surface.snapshot(), elements))
        }
        None => {
            print!("{fragment}");
            Ok(())
        }
    }
}

fn parse_saved_results(raw: &str) -> Result<AnalysisResult> {
    let value: Value = serde_json::from_str(raw)?;
    if value.get("results").is_some() {
        let envelope: SuccessEnvelope = serde_json::from_value(value)?;
        envelope
            .results
            .context("response holds a null results member")
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
