//! Entry point for **osd-tac**.
//!
//! Parses flags, loads the config file, picks a rendering surface and hands
//! over to [`coordinator::run`].  If a termination signal ended the server,
//! its default disposition is applied once cleanup is done.

use clap::Parser;
use log::{error, info};
use osd_tac::cli::Cli;
use osd_tac::config::{config_dir, Config};
use osd_tac::coordinator::{self, Options, OsdError, Outcome};
use osd_tac::shutdown;
use osd_tac::surface::console::ConsoleSurface;
use osd_tac::surface::SurfaceKind;
use std::io::Write;
use std::path::Path;

/// Log records carry their source location, so fatal diagnostics read
/// `src/ipc/rendezvous.rs:42 ERROR ...`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {:<5} {}",
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();
}

/// Load the config from `path` (or `$XDG_CONFIG_HOME/osd-tac/config.json`),
/// falling back to compiled-in defaults.
fn load_config(path: Option<&Path>) -> Config {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_dir().join("config.json"));
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let opts = cli.options(&config);

    let outcome = match cli.surface_kind(&config) {
        SurfaceKind::Gtk => run_gtk(&opts),
        SurfaceKind::Console => run_console(&opts),
    };

    match outcome {
        Ok(Outcome::Served {
            signal: Some(signal),
        }) => {
            let _ = shutdown::resume_default(signal);
            std::process::exit(128 + signal);
        }
        Ok(outcome) => info!("done: {:?}", outcome),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run_console(opts: &Options) -> Result<Outcome, OsdError> {
    coordinator::run(opts, || Ok::<_, std::convert::Infallible>(ConsoleSurface::stderr()))
}

#[cfg(feature = "surface-gtk")]
fn run_gtk(opts: &Options) -> Result<Outcome, OsdError> {
    coordinator::run(opts, osd_tac::surface::gtk::GtkSurface::new)
}

// The warning lives in the factory, which only a server calls.
#[cfg(not(feature = "surface-gtk"))]
fn run_gtk(opts: &Options) -> Result<Outcome, OsdError> {
    coordinator::run(opts, || {
        log::warn!("built without the `surface-gtk` feature; rendering to the console");
        Ok::<_, std::convert::Infallible>(ConsoleSurface::stderr())
    })
}
