use std::sync::Arc;

use ava_chat::{ChatEngine, Command, ViewEvent};
use ava_gateway::HttpGateway;
use ava_storage::JsonSnapshotStore;
use tokio::sync::mpsc;

mod config;
mod shell;

use config::ShellConfig;
use shell::{HELP_TEXT, QUICK_REPLIES, ShellAction, Transcript, WELCOME_MESSAGE, parse_line};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ShellConfig::load();
    tracing::debug!(endpoint = %config.endpoint, "starting chat shell");

    let gateway = Arc::new(HttpGateway::new(&config.endpoint)?);
    let snapshots = Arc::new(JsonSnapshotStore::new(config.snapshot_path()));
    let (engine, mut handle) = ChatEngine::new(snapshots, gateway, config.personas());
    tokio::spawn(engine.run());

    println!("{WELCOME_MESSAGE}");
    for (index, prompt) in QUICK_REPLIES.iter().enumerate() {
        println!("  /{}  {prompt}", index + 1);
    }
    println!("(/help for commands)");
    println!();

    // Stdin blocks, so input runs on a plain thread feeding the engine's
    // command queue.
    let commands = handle.commands.clone();
    std::thread::spawn(move || read_input(commands));

    let mut transcript = Transcript::new();
    while let Some(event) = handle.view_events.recv().await {
        match event {
            ViewEvent::MessagesChanged(entries) => {
                for line in transcript.apply(&entries) {
                    println!("{line}");
                }
            }
            // Terminal output already tails the newest line.
            ViewEvent::ScrollToBottom => {}
        }
    }

    Ok(())
}

fn read_input(commands: mpsc::UnboundedSender<Command>) {
    for line in std::io::stdin().lines() {
        let Ok(line) = line else { break };

        let action = match parse_line(&line) {
            Ok(action) => action,
            Err(error) => {
                eprintln!("{error}");
                continue;
            }
        };

        let command = match action {
            ShellAction::Nothing => continue,
            ShellAction::Help => {
                println!("{HELP_TEXT}");
                continue;
            }
            ShellAction::Quit => {
                let _ = commands.send(Command::Shutdown);
                break;
            }
            ShellAction::Send(content) => Command::Submit { content },
            ShellAction::Edit {
                exchange_id,
                new_content,
            } => Command::Edit {
                exchange_id,
                new_content,
            },
            ShellAction::DeleteFrom { exchange_id } => Command::DeleteFrom { exchange_id },
            ShellAction::Clear => Command::Clear,
        };

        if commands.send(command).is_err() {
            break;
        }
    }

    let _ = commands.send(Command::Shutdown);
}
