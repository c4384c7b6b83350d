//! Command execution.

use crate::Commands;
use colored::Colorize;
use courier_client::Client;
use courier_protocol::{LoginResponse, RegisterResponse};
use serde_json::{json, Value};

/// Executes a command and returns the formatted output.
pub async fn execute(
    client: &Client,
    cmd: Commands,
    as_json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl => Ok("Already in a session".yellow().to_string()),

        Commands::Echo { text } => {
            let content = client.echo(text.as_bytes()).await?;
            Ok(format_echo(&content, as_json))
        }

        Commands::Register { username, password } => {
            let response = client.register(&username, &password).await?;
            Ok(format_register(&username, &response, as_json))
        }

        Commands::Login { username, password } => {
            let response = client.login(&username, &password).await?;
            Ok(format_login(&username, &response, as_json))
        }
    }
}

pub fn format_echo(content: &[u8], as_json: bool) -> String {
    let text = String::from_utf8_lossy(content);
    if as_json {
        return format_json(&json!({ "content": text }));
    }
    text.into_owned()
}

pub fn format_register(username: &str, response: &RegisterResponse, as_json: bool) -> String {
    if as_json {
        return format_json(&json!({
            "success": response.success,
            "message": response.message,
            "user_id": response.user_id,
        }));
    }
    if response.success {
        format!(
            "{} user {} (id: {})",
            "Registered".green(),
            username.cyan(),
            response.user_id
        )
    } else {
        format!("{}: {}", "Registration failed".red(), response.message)
    }
}

pub fn format_login(username: &str, response: &LoginResponse, as_json: bool) -> String {
    if as_json {
        return format_json(&json!({
            "success": response.success,
            "message": response.message,
            "user_id": response.user_id,
            "username": response.username,
        }));
    }
    if response.success {
        format!(
            "{} as {} (id: {})",
            "Logged in".green(),
            response.username.cyan(),
            response.user_id
        )
    } else {
        format!(
            "{} for {}: {}",
            "Login failed".red(),
            username.cyan(),
            response.message
        )
    }
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
