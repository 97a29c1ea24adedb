use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use podium::panic_handler::initialize_panic_handler;
use podium::presentation::{Presentation, clock_label};
use podium::render::{
    NotesMode, PageSource, RenderService, SurfaceRole, SyntheticDocument,
};
use podium::settings::{Settings, load_settings};

const DEFAULT_SYNTHETIC_PAGES: usize = 12;

/// Headless driver for the presenter render cache
#[derive(Parser, Debug)]
#[command(name = "podium", version, about)]
struct Args {
    /// PDF to present (needs the `pdf` feature)
    file: Option<PathBuf>,

    /// Use a generated document with this many pages
    #[arg(long, value_name = "PAGES")]
    synthetic: Option<usize>,

    /// Notes mode: auto, on or off (overrides the config file)
    #[arg(long)]
    notes: Option<NotesMode>,

    /// Step through every page like a talk would
    #[arg(long)]
    walk: bool,

    /// Write every displayed surface as PNG into this directory
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "PATH", default_value = "podium.log")]
    log_file: PathBuf,

    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("creating log file {:?}", args.log_file))?,
    )?;
    initialize_panic_handler();

    info!("Starting podium");
    let res = run(&args);
    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }
    info!("Shutting down podium");
    res
}

fn run(args: &Args) -> Result<()> {
    let settings = load_settings(args.config.as_deref());
    let document = open_document(args)?;
    let notes_mode = args
        .notes
        .unwrap_or(settings.notes_mode)
        .enabled_for(document.has_secondary_content());

    let mut service = RenderService::with_config(
        document,
        settings.prerender_window(),
        settings.effective_render_retries(),
        notes_mode,
    );
    register_surfaces(&mut service, &settings)?;

    if let Some(dir) = &args.export {
        fs::create_dir_all(dir).with_context(|| format!("creating export directory {dir:?}"))?;
    }

    let mut presentation = Presentation::new(service.page_count());
    if presentation.page_count() == 0 {
        bail!("document has no pages");
    }

    let center = presentation.first();
    service.on_navigate(center);
    display(&mut service, &presentation, args.export.as_deref())?;
    service.run_until_idle();

    if args.walk {
        let units_per_tick = settings.idle_units_per_tick.max(1);
        // The talk starts with the walk, not with the cold first frame
        presentation.timer_mut().reset();
        while presentation.current() + 1 < presentation.page_count() {
            let center = presentation.next();
            service.on_navigate(center);
            display(&mut service, &presentation, args.export.as_deref())?;
            service.run_idle(units_per_tick);
            info!(
                "{} {} {}",
                presentation.position_label(),
                presentation.timer().elapsed_label(),
                clock_label()
            );
        }
    }

    let stats = service.stats();
    println!(
        "{} pages, notes {}: {} hits, {} misses ({:.0}% hit ratio), {} renders, {} prerendered, {} released, {} failures, {} cached ({} KiB)",
        service.page_count(),
        if service.notes_mode() { "on" } else { "off" },
        stats.hits,
        stats.misses,
        stats.hit_ratio() * 100.0,
        stats.renders,
        stats.prerendered,
        stats.released,
        stats.render_failures,
        service.cache().len(),
        service.cache().byte_len() / 1024,
    );
    Ok(())
}

fn open_document(args: &Args) -> Result<Box<dyn PageSource>> {
    match (&args.file, args.synthetic) {
        (Some(_), Some(_)) => bail!("give either a FILE or --synthetic, not both"),
        (Some(path), None) => open_pdf(path),
        (None, pages) => {
            let pages = pages.unwrap_or(DEFAULT_SYNTHETIC_PAGES);
            let notes = args.notes == Some(NotesMode::On);
            Ok(Box::new(SyntheticDocument::new(pages, notes)))
        }
    }
}

#[cfg(feature = "pdf")]
fn open_pdf(path: &Path) -> Result<Box<dyn PageSource>> {
    let doc = podium::render::MuPdfDocument::open(path)
        .with_context(|| format!("opening {path:?}"))?;
    Ok(Box::new(doc))
}

#[cfg(not(feature = "pdf"))]
fn open_pdf(path: &Path) -> Result<Box<dyn PageSource>> {
    bail!("cannot open {path:?}: built without the `pdf` feature")
}

fn register_surfaces<D: PageSource>(
    service: &mut RenderService<D>,
    settings: &Settings,
) -> Result<()> {
    for role in SurfaceRole::ALL {
        let id = service.register_role(role)?;
        let size = settings.size_for(role);
        service.on_surface_resized(id, size.width, size.height)?;
    }
    Ok(())
}

/// Fetch every visible role surface, like an expose pass of both windows
fn display<D: PageSource>(
    service: &mut RenderService<D>,
    presentation: &Presentation,
    export: Option<&Path>,
) -> Result<()> {
    for role in SurfaceRole::ALL {
        let Some(id) = service.registry().id_for_role(role) else {
            continue;
        };
        let Some(page) = presentation.page_for(role) else {
            continue;
        };

        match service.fetch_for_display(id, page) {
            Ok(entry) => {
                if let Some(dir) = export {
                    let path = dir.join(format!("{}-{:03}.png", role.name(), page + 1));
                    entry
                        .bitmap()
                        .save_png(&path)
                        .with_context(|| format!("writing {path:?}"))?;
                }
            }
            Err(e) if e.is_programming_error() => return Err(e.into()),
            Err(e) => warn!("Showing placeholder for {}: {e}", role.name()),
        }
    }
    Ok(())
}
