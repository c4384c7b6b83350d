//! Interactive REPL.

use crate::commands;
use crate::Commands;
use colored::Colorize;
use courier_client::Client;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::net::SocketAddr;

const HELP_TEXT: &str = r#"
Available commands:
  help                          Show this help

  echo <text>                   Send text and print the echo
  register <user> <password>    Register a new account
  login <user> <password>       Log in to an account

  quit, exit                    Exit the REPL
"#;

/// One parsed REPL line.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Help,
    Quit,
    Usage(&'static str),
    Unknown(String),
    Run(Commands),
}

pub async fn run(
    client: Client,
    addr: SocketAddr,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "courier CLI".bold().cyan());
    println!("Connecting to {}...", addr);

    client.connect().await?;
    println!("{}", "Connected!".green());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".courier_history"))
        .unwrap_or_else(|_| ".courier_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "courier>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match parse_line(line) {
                    Line::Help => println!("{}", HELP_TEXT),
                    Line::Quit => break,
                    Line::Usage(usage) => println!("Usage: {}\n", usage),
                    Line::Unknown(cmd) => println!(
                        "{}: {} (type 'help' for commands)\n",
                        "Unknown command".red(),
                        cmd
                    ),
                    Line::Run(cmd) => match commands::execute(&client, cmd, as_json).await {
                        Ok(output) => println!("{}\n", output),
                        Err(e) => {
                            println!("{}: {}\n", "Error".red(), e);
                            if !client.is_connected() {
                                println!("{}", "Connection lost.".red());
                                break;
                            }
                        }
                    },
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

fn parse_line(line: &str) -> Line {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((first, args)) = parts.split_first() else {
        return Line::Help;
    };

    match first.to_lowercase().as_str() {
        "help" | "?" => Line::Help,

        "quit" | "exit" | "q" => Line::Quit,

        "echo" => {
            if args.is_empty() {
                return Line::Usage("echo <text>");
            }
            Line::Run(Commands::Echo {
                text: args.join(" "),
            })
        }

        "register" | "reg" => match args {
            [username, password] => Line::Run(Commands::Register {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Line::Usage("register <username> <password>"),
        },

        "login" => match args {
            [username, password] => Line::Run(Commands::Login {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Line::Usage("login <username> <password>"),
        },

        _ => Line::Unknown(first.to_string()),
    }
}
