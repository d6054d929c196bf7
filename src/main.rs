use anyhow::{Context, Result};
use argh::FromArgs;
use browse_commands::{Environment, FsNav, Interpreter, LineUi, Presentation, ShellRunner};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(FromArgs)]
/// Browse the filesystem from the terminal.
struct Args {
    /// write the selected paths to this file and exit instead of opening files
    #[argh(option)]
    selection_path: Option<PathBuf>,

    /// startup script (default: <config dir>/browse/browserc)
    #[argh(option)]
    config: Option<PathBuf>,

    /// log file (default: <tmp>/browse.log)
    #[argh(option)]
    log: Option<PathBuf>,

    /// directory to start in
    #[argh(positional)]
    start: Option<String>,
}

fn init_logging(path: PathBuf) -> Result<()> {
    let file = File::create(&path).with_context(|| format!("can't create log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    Ok(())
}

fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| dirs::config_dir().map(|dir| dir.join("browse").join("browserc")))
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    init_logging(args.log.unwrap_or_else(|| std::env::temp_dir().join("browse.log")))?;
    tracing::info!("starting in {:?}", args.start);

    let env = Environment::new(args.selection_path);
    let ui = LineUi::new(&env.options.ratios);
    let nav = FsNav::new(args.start.as_deref(), ui.window_height(), &env.options)?;
    let runner = ShellRunner::new()?;

    let mut sh = Interpreter::new(env, Box::new(nav), Box::new(ui), Box::new(runner));

    if let Some(rc) = config_path(args.config).filter(|p| p.is_file()) {
        let script = std::fs::read_to_string(&rc).with_context(|| format!("can't read {}", rc.display()))?;
        tracing::info!("sourcing {}", rc.display());
        sh.run_script(&script);
    }

    sh.repl();
    tracing::info!("bye");
    Ok(())
}
