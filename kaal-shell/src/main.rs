use anyhow::Result;
use colored::{ColoredString, Colorize};
use kaal::notify::BroadcastNotifier;
use kaal::prelude::*;
use kaal::random::StdRandom;
use kaal::time::{format_duration, SystemWallClock};
use kaal::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline::history::DefaultHistory;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Highlights the command word of the current line.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    let rule = "-".repeat(72);
    println!("{}", "PROJECT KAAL // SESSION RECORDER".cyan().bold());
    println!("{}", rule.dimmed());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.".dimmed()
    );
    println!("{}", rule.dimmed());
}

fn paint_severity(severity: Severity) -> ColoredString {
    let label = format!("{:<7}", severity.as_str().to_uppercase());
    match severity {
        Severity::Info => label.cyan(),
        Severity::Warning => label.yellow(),
        Severity::Error => label.red().bold(),
    }
}

fn print_entry(entry: &LogEntry) {
    println!(
        "  {} {} {}",
        entry.timestamp().dimmed(),
        paint_severity(entry.severity()),
        entry.message()
    );
}

/// Spawns tasks that print toasts and noteworthy engine events as they arrive.
fn spawn_event_listeners(engine: &KaalEngine, notifier: &BroadcastNotifier) {
    let mut toast_rx = notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(toast) = toast_rx.recv().await {
            let title = match toast.variant {
                ToastVariant::Default => toast.title.green().bold(),
                ToastVariant::Destructive => toast.title.red().bold(),
            };
            println!("\n<-- [{}] {}", title, toast.description);
        }
    });

    let mut recorder_rx = engine.subscribe_recorder_events();
    tokio::spawn(async move {
        while let Ok(event) = recorder_rx.recv().await {
            if let RecorderEvent::EntryAppended(entry) = event {
                print!("\n<-- [LOG]");
                print_entry(&entry);
            }
        }
    });

    let mut simulation_rx = engine.subscribe_simulation_events();
    tokio::spawn(async move {
        while let Ok(event) = simulation_rx.recv().await {
            if event.phase == SimulationPhase::Ready {
                println!("\n<-- [SIMULATION] {} ready", event.kind);
            }
        }
    });
}

async fn print_status(engine: &KaalEngine) {
    let status = engine.status().await;
    let state = match status.state {
        RecordingState::Recording => status.state.to_string().red().bold(),
        RecordingState::Idle => status.state.to_string().dimmed(),
    };
    println!("Session Info      {}", state);
    println!("  Current Duration: {}", format_duration(status.elapsed_seconds));
    println!("  Log Entries:      {}", status.entry_count);
    println!(
        "  Status:           {}",
        match (status.state, status.exporting) {
            (_, true) => "Exporting...",
            (RecordingState::Recording, false) => "Recording in progress",
            (RecordingState::Idle, false) => "Ready to record",
        }
    );
}

async fn print_timeline(engine: &KaalEngine) {
    for phase in engine.timeline_phases().await {
        let status = match phase.status {
            PhaseStatus::Complete => "complete".green(),
            PhaseStatus::Current => "current".cyan().bold(),
            PhaseStatus::Upcoming => "upcoming".dimmed(),
        };
        println!(
            "  {:<8} {:<26} {}  {:>3}%  {}",
            phase.id, phase.name, phase.duration, phase.progress, status
        );
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  start | stop | toggle       - Control session recording.");
    println!("  status                      - Shows the recorder state.");
    println!("  logs                        - Prints the session log.");
    println!("  export                      - Exports the session log.");
    println!("  clear                       - Clears the session log.");
    println!("  timeline                    - Shows the mission phases.");
    println!("  select <PHASE>              - Makes a mission phase current.");
    println!("  replay                      - Loads the mission replay.");
    println!("  place <ASSET> <X> <Y>       - Places soldiers, tanks, drones or bunkers.");
    println!("  deploy                      - Deploys all placed assets.");
    println!("  probability <P>             - Sets the per-tick log emit probability.");
    println!("  help                        - Shows this list.");
    println!("  exit                        - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = RecorderConfig::load(config_path.as_deref())?;
    let notifier = BroadcastNotifier::new(config.channel_capacity);
    let rng = Box::new(StdRandom::from_seed_option(config.seed));
    let engine = KaalEngine::with_parts(
        config,
        rng,
        Arc::new(SystemWallClock),
        Arc::new(notifier.clone()),
    )?;

    spawn_event_listeners(&engine, &notifier);
    info!("{} ready.", ENGINE_NAME);

    let mut rl: Editor<CommandHighlighter, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting kaalshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "start" => {
                engine.start().await;
            }
            "stop" => {
                if engine.stop().await == Transition::Unchanged {
                    println!("--> Not recording.");
                }
            }
            "toggle" => {
                engine.toggle().await;
            }
            "status" => print_status(&engine).await,
            "logs" => {
                let entries = engine.log_snapshot().await;
                if entries.is_empty() {
                    println!("--> No logs available.");
                }
                for entry in &entries {
                    print_entry(entry);
                }
                println!("--> {} entries", entries.len());
            }
            "export" => {
                if !engine.can_export().await {
                    println!("--> Nothing to export, or an export is already running.");
                } else {
                    let exporter = engine.clone();
                    tokio::spawn(async move {
                        let report = exporter.export_log().await;
                        println!("\n{}", report.render().dimmed());
                    });
                    println!("--> Exporting...");
                }
            }
            "clear" => {
                let removed = engine.clear_log().await;
                println!("--> Removed {} entries.", removed);
            }
            "timeline" => print_timeline(&engine).await,
            "select" => match args.get(1) {
                Some(id) => match engine.select_phase(id).await {
                    Ok(phase) => println!("--> {} is now current.", phase.name),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: select <PHASE>"),
            },
            "replay" => match engine.replay_mission().await {
                Ok(_) => println!("--> Loading Replay..."),
                Err(e) => println!("Error: {}", e),
            },
            "place" => {
                let parsed = (
                    args.get(1).map(|s| s.parse::<AssetKind>()),
                    args.get(2).and_then(|s| s.parse::<f64>().ok()),
                    args.get(3).and_then(|s| s.parse::<f64>().ok()),
                );
                match parsed {
                    (Some(Ok(kind)), Some(x), Some(y)) => {
                        let count = engine.place_asset(kind, x, y).await;
                        println!("--> {} deployed: {}", kind, count);
                    }
                    (Some(Err(e)), _, _) => println!("Error: {}", e),
                    _ => println!("Usage: place <ASSET> <X> <Y>"),
                }
            }
            "deploy" => match engine.deploy().await {
                Ok(_) => println!("--> Deploying..."),
                Err(KaalError::NothingToDeploy) => {}
                Err(e) => println!("Error: {}", e),
            },
            "probability" => match args.get(1).and_then(|s| s.parse::<f64>().ok()) {
                Some(p) => {
                    engine.set_emit_probability(p).await;
                    println!("--> Emit probability set.");
                }
                None => println!("Usage: probability <0.0..=1.0>"),
            },
            "help" => print_help(),
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line),
        }
    }

    let cancelled = engine.shutdown().await;
    info!("Shell closed; {} timers cancelled.", cancelled);
    Ok(())
}
