use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use filigrane::config::AppConfig;
use filigrane::watermark::{
    AlwaysVisible, CommandViewer, CoverageMode, ExportCache, FixedLayout, FontFace, ImageViewer,
    LogViewer, PngFileExporter, RasterSurfaceProvider, RenderOutcome, SourceImageResolver,
    WatermarkHost, WatermarkView,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CoverageArg {
    Classic,
    Diagonal,
}

impl From<CoverageArg> for CoverageMode {
    fn from(arg: CoverageArg) -> Self {
        match arg {
            CoverageArg::Classic => CoverageMode::Classic,
            CoverageArg::Diagonal => CoverageMode::Diagonal,
        }
    }
}

/// Filigrane - composite a tiled text watermark over an image
#[derive(Parser, Debug)]
#[command(name = "filigrane")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Background image (URL or path)
    #[arg(short, long)]
    image: Option<String>,

    /// Watermark text
    #[arg(short, long)]
    text: Option<String>,

    /// Host element width in logical pixels
    #[arg(short, long, default_value_t = 750.0)]
    width: f32,

    /// Text colour, e.g. "rgba(255,255,255,.5)" or "#FF000080"
    #[arg(long)]
    color: Option<String>,

    /// Font size in logical pixels
    #[arg(long)]
    size: Option<f32>,

    /// Tile coverage strategy
    #[arg(long, value_enum)]
    coverage: Option<CoverageArg>,

    /// TrueType/OpenType font file
    #[arg(long)]
    font: Option<PathBuf>,

    /// Copy the exported PNG to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Program to open the exported image with
    #[arg(long)]
    viewer: Option<String>,

    /// Print a JSON summary to stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate().map_err(anyhow::Error::msg)?;

    filigrane::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        config_file = ?args.config,
        image = %config.watermark.image_url,
        width = args.width,
        coverage = ?config.watermark.coverage,
        "Configuration loaded successfully"
    );

    let surfaces = RasterSurfaceProvider::new(FontFace::discover(
        config.watermark.font_path.as_deref(),
    )?);
    let exporter = PngFileExporter::new(config.export.output_dir.clone());
    tracing::info!(
        font = ?surfaces.font().source(),
        export_dir = %exporter.dir().display(),
        max_artifacts = config.export.max_artifacts,
        "Renderer ready"
    );

    let viewer: Arc<dyn ImageViewer> = match &args.viewer {
        Some(program) => Arc::new(CommandViewer::new(program.as_str())),
        None => Arc::new(LogViewer),
    };

    let host = WatermarkHost {
        resolver: Arc::new(SourceImageResolver::new(config.fetch.to_fetcher_config())?),
        layout: Arc::new(FixedLayout::new(args.width)),
        visibility: Arc::new(AlwaysVisible),
        surfaces: Arc::new(surfaces),
        exports: Arc::new(ExportCache::with_capacity(
            Arc::new(exporter),
            config.export.max_artifacts,
        )),
        viewer,
    };

    let view = WatermarkView::new(config.watermark.clone(), host)?;
    let surface = match view.on_ready().await? {
        RenderOutcome::Rendered(surface) => surface,
        other => bail!("Watermark was not rendered: {:?}", other),
    };

    let artifact = view.request_preview().await?;

    if let Some(output) = &args.output {
        tokio::fs::copy(&artifact.handle, output)
            .await
            .with_context(|| format!("Failed to copy export to {}", output.display()))?;
    }

    let dimensions = surface.dimensions();
    if args.json {
        let summary = serde_json::json!({
            "surface_id": surface.id().to_string(),
            "logical_width": dimensions.logical_width,
            "logical_height": dimensions.logical_height,
            "physical_width": dimensions.physical_width(),
            "physical_height": dimensions.physical_height(),
            "tiles": surface.tile_count(),
            "artifact": artifact.handle,
            "output": args.output.as_ref().map(|p| p.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", artifact.handle);
    }

    tracing::info!(
        surface_id = %surface.id(),
        tiles = surface.tile_count(),
        artifact = %artifact.handle,
        "Done"
    );

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    let options = &mut config.watermark;
    if let Some(image) = &args.image {
        options.image_url = image.clone();
    }
    if let Some(text) = &args.text {
        options.content = text.clone();
    }
    if let Some(color) = &args.color {
        options.content_color = color.clone();
    }
    if let Some(size) = args.size {
        options.content_size = size;
    }
    if let Some(coverage) = args.coverage {
        options.coverage = coverage.into();
    }
    if let Some(font) = &args.font {
        options.font_path = Some(font.clone());
    }
    // Headless: render immediately
    options.lazy = false;
}
