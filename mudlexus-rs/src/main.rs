use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mudlexus::bootstrap::{AnyLoader, Bootstrap, DirLoader, EmbeddedLoader, ShimContext};
use mudlexus::cli::{self, AssetSource, ConfigFile, Mode};
use mudlexus::config::Config;
use mudlexus::host::ConsoleHost;
use mudlexus::package::{self, NxsCompiler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("mudlexus: {e}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    // ── Logging ───────────────────────────────────────────────────────────────
    // RUST_LOG wins; otherwise -d / -dd raise the level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match args.verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // ── Package conversion ────────────────────────────────────────────────────
    match args.mode {
        Mode::Run => {}
        Mode::Extract { package, target } => {
            return match package::extract(&package, &target, args.overwrite) {
                Ok(()) => {
                    info!("extracted {} into {}", package.display(), target.display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("mudlexus: {e}");
                    ExitCode::FAILURE
                }
            };
        }
        Mode::Compile { source, name } => {
            let compiler = match name {
                Some(name) => NxsCompiler::new(name, source),
                None => NxsCompiler::from_dir(source),
            };
            return match compiler.write(Path::new(".")) {
                Ok(path) => {
                    println!("{}", path.display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("mudlexus: {e}");
                    ExitCode::FAILURE
                }
            };
        }
    }

    // ── Host setup ────────────────────────────────────────────────────────────
    let config_path = match args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => Some(path),
        ConfigFile::Search => cli::find_user_config(),
    };
    let config = match config_path {
        None => Config::new(),
        Some(path) => match Config::load_file(&path) {
            Ok((config, errors)) => {
                for e in errors {
                    warn!("{}: {e}", path.display());
                }
                config
            }
            Err(e) => {
                eprintln!("mudlexus: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
    };

    let host = Rc::new(ConsoleHost::new(std::io::stdout(), config.vars, config.reflexes));
    let mut ctx = ShimContext::new(host);

    // ── Bootstrap ─────────────────────────────────────────────────────────────
    let loader = match args.source {
        AssetSource::Embedded => AnyLoader::Embedded(EmbeddedLoader),
        AssetSource::Dir(dir) => AnyLoader::Dir(DirLoader::new(dir)),
        #[cfg(feature = "remote")]
        AssetSource::Remote => AnyLoader::Http(mudlexus::bootstrap::HttpLoader::new()),
        #[cfg(not(feature = "remote"))]
        AssetSource::Remote => {
            eprintln!("mudlexus: -r: built without the `remote` feature");
            return ExitCode::FAILURE;
        }
    };

    // Failures are reported through tracing by the bootstrap itself.
    if Bootstrap::new(loader).run(&mut ctx).await.is_err() {
        return ExitCode::FAILURE;
    }

    // ── User scripts ──────────────────────────────────────────────────────────
    let mut status = ExitCode::SUCCESS;

    if let Some(chunk) = args.command {
        if let Err(e) = ctx.exec(&chunk) {
            eprintln!("mudlexus: {e}");
            status = ExitCode::FAILURE;
        }
    }

    for script in &args.scripts {
        if let Err(e) = ctx.load_file(script) {
            eprintln!("mudlexus: {}: {e}", script.display());
            status = ExitCode::FAILURE;
        }
    }

    status
}
