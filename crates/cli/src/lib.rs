use anyhow::{Context, Result};
use blueprint_core::{Annotation, EngineConfig, Marker};
use blueprint_render::{open_path, SharedDocument};
use blueprint_ui::MultiPageReportRenderer;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "blueprint-cli")]
#[command(about = "Blueprint annotation CLI")]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable document metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Burn anchors into every page and write PNGs plus a manifest.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// JSON file with `annotations` and `markers` arrays
        #[arg(long, value_name = "JSON")]
        anchors: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        /// Export zoom; overrides the configured value
        #[arg(long)]
        scale: Option<f32>,
        /// Engine config TOML; defaults to environment settings
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    backend: &'static str,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    page: u32,
    width_pt: f32,
    height_pt: f32,
}

#[derive(Debug, Serialize)]
struct ExportOutput {
    out: String,
    scale: f32,
    page_count: usize,
    rendered: usize,
    skipped: usize,
    manifest: String,
}

/// Anchor file consumed by `export`
#[derive(Debug, Default, Deserialize)]
struct AnchorFile {
    #[serde(default)]
    annotations: Vec<Annotation>,
    #[serde(default)]
    markers: Vec<Marker>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Export {
            file,
            anchors,
            out,
            scale,
            config,
        } => run_export(&file, anchors.as_deref(), &out, scale, config.as_deref()),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when `run` is called twice in one process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_info(file: &Path) -> Result<()> {
    let document = open_document(file)?;

    let page_count = document.page_count();
    let pages = (1..=page_count)
        .map(|page| {
            let size = document
                .page_size(page)
                .with_context(|| format!("failed to measure page {page}"))?;
            Ok(PageOutput {
                page,
                width_pt: size.width_pt,
                height_pt: size.height_pt,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload = InfoOutput {
        path: file.display().to_string(),
        backend: document.kind(),
        page_count,
        pages,
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_export(
    file: &Path,
    anchors: Option<&Path>,
    out: &Path,
    scale: Option<f32>,
    config: Option<&Path>,
) -> Result<()> {
    let mut engine_config = match config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::from_env().context("invalid BLUEPRINT_* environment settings")?,
    };
    if let Some(scale) = scale {
        engine_config = engine_config.with_export_scale(scale);
        engine_config.validate().context("invalid --scale")?;
    }

    let anchor_file = match anchors {
        Some(path) => load_anchors(path)?,
        None => AnchorFile::default(),
    };

    tracing::debug!(
        annotations = anchor_file.annotations.len(),
        markers = anchor_file.markers.len(),
        scale = engine_config.export_scale,
        "starting export"
    );

    let document = open_document(file)?;
    let renderer = MultiPageReportRenderer::new(engine_config);
    let report = renderer.render(document.as_ref(), &anchor_file.annotations, &anchor_file.markers);
    let manifest = report
        .write_to_dir(out)
        .with_context(|| format!("failed to write report to {}", out.display()))?;

    let payload = ExportOutput {
        out: out.display().to_string(),
        scale: report.scale,
        page_count: manifest.rows.len(),
        rendered: report.rendered_count(),
        skipped: report.skipped_count(),
        manifest: out.join(blueprint_ui::ReportManifest::FILE_NAME).display().to_string(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn load_anchors(path: &Path) -> Result<AnchorFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read anchors {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid anchors file {}", path.display()))
}

fn open_document(path: &Path) -> Result<SharedDocument> {
    ensure_file_exists(path)?;
    open_path(path).with_context(|| format!("failed to open {}", path.display()))
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
