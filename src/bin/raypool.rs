use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use raypool::{
    BackendKind, DirectoryProvider, EmptyProvider, PreviewCanvas, RenderBackend, RenderConfig,
    RenderContext, RenderOutput, RenderRequest, SharedResourceProvider, SkyFactory,
    create_backend, partition_samples, partition_scanlines, preview_channel,
};

#[derive(Parser, Debug)]
#[command(name = "raypool", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an image with the built-in procedural renderer.
    Render(RenderArgs),
    /// Print how a request would be partitioned, without rendering.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Run configuration JSON; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Samples per pixel.
    #[arg(long)]
    samples: Option<u32>,

    /// Maximum trace depth.
    #[arg(long)]
    max_depth: Option<u32>,

    /// Scene id (0 gradient, 1 checker, 2 backdrop).
    #[arg(long)]
    scene: Option<u32>,

    /// Base noise seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Worker count.
    #[arg(long)]
    workers: Option<usize>,

    /// Scanline strip height.
    #[arg(long)]
    strip_height: Option<u32>,

    /// Scheduling backend.
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Ask the renderer to build an acceleration structure.
    #[arg(long, default_value_t = false)]
    bvh: bool,

    /// Directory loaded as shared resources (e.g. `backdrop.png` for scene 2).
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Consume progressive preview events on a separate thread while rendering.
    #[arg(long, default_value_t = false)]
    preview: bool,

    /// Preview redraw cadence in milliseconds.
    #[arg(long, default_value_t = 100)]
    preview_ms: u64,

    /// Output PNG path.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Samples per pixel.
    #[arg(long, default_value_t = 16)]
    samples: u32,

    /// Worker count.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Image width in pixels.
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = 180)]
    height: u32,

    /// Scanline strip height.
    #[arg(long, default_value_t = 16)]
    strip_height: u32,
}

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn load_config(args: &RenderArgs) -> anyhow::Result<RenderConfig> {
    let mut cfg = match &args.config {
        Some(path) => RenderConfig::from_path(path)?,
        None => RenderConfig::default(),
    };
    let req = &mut cfg.request;
    if let Some(v) = args.width {
        req.width = v;
    }
    if let Some(v) = args.height {
        req.height = v;
    }
    if let Some(v) = args.samples {
        req.samples_per_pixel = v;
    }
    if let Some(v) = args.max_depth {
        req.max_depth = v;
    }
    if let Some(v) = args.scene {
        req.scene_id = v;
    }
    if let Some(v) = args.seed {
        req.seed = v;
    }
    if args.bvh {
        req.accel = true;
    }
    if let Some(v) = args.workers {
        cfg.opts.workers = v;
    }
    if let Some(v) = args.strip_height {
        cfg.opts.strip_height = v;
    }
    if let Some(v) = args.backend {
        cfg.backend = v;
    }
    if let Some(dir) = &args.resources {
        cfg.resources = Some(dir.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let provider: Box<dyn SharedResourceProvider> = match &cfg.resources {
        Some(dir) => Box::new(DirectoryProvider::new(dir)),
        None => Box::new(EmptyProvider),
    };
    let mut ctx =
        RenderContext::with_provider(Arc::new(SkyFactory), provider.as_ref(), cfg.opts.clone())?;
    let mut backend = create_backend(cfg.backend);

    let out = if args.preview {
        let cadence = Duration::from_millis(args.preview_ms.max(1));
        render_with_preview(&mut ctx, backend.as_mut(), cfg.request, cadence)?
    } else {
        backend.render_image(&mut ctx, &cfg.request)?
    };

    eprintln!(
        "rendered {}x{} with {} in {} ms ({} units on {} workers)",
        out.image.width,
        out.image.height,
        cfg.backend,
        out.elapsed_ms(),
        out.stats.units_total,
        out.stats.workers_used
    );

    if let Some(path) = &args.out {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            path,
            &out.image.data,
            out.image.width,
            out.image.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn render_with_preview(
    ctx: &mut RenderContext,
    backend: &mut dyn RenderBackend,
    request: RenderRequest,
    cadence: Duration,
) -> anyhow::Result<RenderOutput> {
    let (tx, rx) = preview_channel(ctx.opts().preview_capacity);
    let request = request.with_preview(tx);
    let (width, height) = (request.width, request.height);

    std::thread::scope(|s| {
        let consumer = s.spawn(move || -> raypool::RaypoolResult<PreviewCanvas> {
            let mut canvas = PreviewCanvas::new(width, height);
            canvas.run_until_disconnected(&rx, cadence, |c| {
                tracing::info!(
                    coverage = format!("{:.0}%", c.coverage() * 100.0),
                    rows = c.covered_rows(),
                    "preview"
                );
            })?;
            Ok(canvas)
        });

        let rendered = backend.render_image(ctx, &request);
        // The consumer stops once the last sender is gone.
        drop(request);
        settle_preview(rendered, consumer.join())
    })
}

type ConsumerOutcome = std::thread::Result<raypool::RaypoolResult<PreviewCanvas>>;

/// The render result wins; a broken preview consumer is only logged.
fn settle_preview(
    rendered: raypool::RaypoolResult<RenderOutput>,
    consumer: ConsumerOutcome,
) -> anyhow::Result<RenderOutput> {
    let out = rendered?;
    match consumer {
        Ok(Ok(canvas)) => tracing::info!(
            events = canvas.events(),
            complete = canvas.is_complete(),
            "preview finished"
        ),
        Ok(Err(e)) => tracing::warn!(error = %e, "preview consumer failed"),
        Err(_) => tracing::warn!("preview consumer panicked"),
    }
    Ok(out)
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let counts = partition_samples(args.samples, args.workers)?;
    println!("sample partition: {counts:?}");
    let strips = partition_scanlines(args.width, args.height, args.strip_height)?;
    let last = strips.last().map_or(0, |r| r.height);
    println!("scanline strips: {} (last strip height {last})", strips.len());
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/bin/raypool.rs"]
mod tests;
