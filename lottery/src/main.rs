use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use event_lottery::backend::events::EventSink;
use event_lottery::backend::initialize_backend;
use event_lottery::backend::scheduling::TokioScheduler;
use event_lottery::config::{AppConfig, ConfigSources};
use event_lottery::console::{Console, Flow};

#[derive(Parser, Debug)]
#[command(name = "event-lottery")]
#[command(version)]
#[command(about = "Check-in desk and lucky draw for live events.", long_about = None)]
struct Args {
    /// YAML configuration file (overrides $EVENT_LOTTERY_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the roster snapshot
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with the draw ticker
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::resolve(&ConfigSources::from_env(args.config, args.data_dir))
        .context("Failed to load configuration")?;

    let (events, mut event_rx) = EventSink::channel();
    let (scheduler, mut timer_rx) = TokioScheduler::new();
    let backend = initialize_backend(&config, scheduler, events)?;

    let mut console = Console::new(backend);
    let mut stdout = std::io::stdout();
    console.print_banner(&mut stdout)?;
    write!(stdout, "{}", console.prompt())?;
    stdout.flush()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    info!("stdin closed, shutting down");
                    break;
                };
                if console.handle_line(&line, &mut stdout)? == Flow::Quit {
                    break;
                }
                write!(stdout, "{}", console.prompt())?;
                stdout.flush()?;
            }
            Some(id) = timer_rx.recv() => console.on_timer(id),
            Some(event) = event_rx.recv() => console.render_event(&event, &mut stdout)?,
        }
    }

    console.shutdown();
    info!("Goodbye");
    Ok(())
}
