use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use log::{debug, info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

mod raytracing;
use raytracing::canvas::ImageCanvas;
use raytracing::core::Scene;
use raytracing::parser::{SceneDescription, SceneParser};
use raytracing::render::draw;

const DEFAULT_SIZE: (u32, u32) = (401, 401);

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// scene description file, the built-in sphere on a checkerboard is rendered when omitted
    scene: Option<PathBuf>,
    /// the path where the rendered image is saved, the format follows the extension
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,
    /// image width in pixels, overrides the scene file
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    width: Option<u32>,
    /// image height in pixels, overrides the scene file
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    height: Option<u32>,
    /// apply gamma correction to the final image
    #[arg(long, default_value = "false")]
    gamma_correction: bool,
    /// number of render threads, 0 lets rayon decide
    #[arg(short, long, default_value_t = 0)]
    threads: usize,
    /// one of error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: String,
    /// show the picture in a window instead of saving it
    #[cfg(feature = "preview")]
    #[arg(long)]
    preview: bool,
}

fn parse_log_level(level: &str, default: LevelFilter) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "trace" => LevelFilter::Trace,
        "error" => LevelFilter::Error,
        "debug" => LevelFilter::Debug,
        _ => default,
    }
}

fn load_scene(path: Option<&PathBuf>) -> anyhow::Result<SceneDescription> {
    let Some(path) = path else {
        return Ok(SceneDescription {
            size: None,
            scene: Scene::default(),
        });
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read scene file {}", path.display()))?;
    match SceneParser::new(&content).parse_scene() {
        Ok(description) => Ok(description),
        Err(parser_error) => {
            parser_error.print_error_location(&content);
            bail!("cannot parse {}: {}", path.display(), parser_error)
        }
    }
}

#[cfg(feature = "preview")]
fn run_preview(scene: &Scene, width: u32, height: u32) -> anyhow::Result<()> {
    use raytracing::canvas::PreviewCanvas;

    let mut canvas = PreviewCanvas::open("checker-tracer", width as usize, height as usize)?;
    draw(scene, &mut canvas)?;
    while canvas.is_open() {
        if canvas.resized() {
            let start = Instant::now();
            draw(scene, &mut canvas)?;
            debug!("redrawn after resize in {:?}", start.elapsed());
        } else {
            canvas.idle()?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    TermLogger::init(
        parse_log_level(&args.log_level, LevelFilter::Info),
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()?;
    }
    debug!("rendering with {} threads", rayon::current_num_threads());

    let SceneDescription { size, scene } = load_scene(args.scene.as_ref())?;
    info!(
        "scene: sphere at {:?} radius {}, floor at y = {}, light toward {:?}",
        scene.sphere.center, scene.sphere.radius, scene.floor.y, scene.light.direction
    );

    let (default_width, default_height) = size.unwrap_or(DEFAULT_SIZE);
    let width = args.width.unwrap_or(default_width);
    let height = args.height.unwrap_or(default_height);

    #[cfg(feature = "preview")]
    {
        if args.preview {
            return run_preview(&scene, width, height);
        }
    }

    info!("rendering {}x{}", width, height);
    let start = Instant::now();
    let mut canvas = ImageCanvas::new(width, height, &args.output, args.gamma_correction);
    draw(&scene, &mut canvas)?;
    info!("Rendered {} in {:?}", args.output.display(), start.elapsed());
    Ok(())
}
