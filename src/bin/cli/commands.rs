use emergency_stomp::{ClientError, Session};
use tokio::net::TcpStream;

use super::args::Cli;

pub type ClientSession = Session<TcpStream>;

/// Result of executing a command
pub enum CommandResult {
    /// Command executed, nothing to report
    Ok,
    /// Command executed with a message for the user
    Info(String),
    /// Command requests exit
    Quit,
    /// Error executing command
    Error(String),
}

/// Parse and execute one line of user input
pub async fn execute_command(
    line: &str,
    session: &mut Option<ClientSession>,
    cli: &Cli,
) -> CommandResult {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = parts.first() else {
        return CommandResult::Ok;
    };

    match command {
        "quit" | "q" => CommandResult::Quit,

        "login" => {
            if session.is_some() {
                return CommandResult::Error("Already logged in. Please logout first.".to_string());
            }
            if parts.len() != 4 {
                return CommandResult::Error(
                    "Usage: login {host:port} {username} {password}".to_string(),
                );
            }
            let (address, user, passcode) = (parts[1], parts[2], parts[3]);
            match Session::connect(address, user, passcode, cli.session_options()).await {
                Ok(s) => {
                    *session = Some(s);
                    CommandResult::Info(format!("Connected to {} as {}.", address, user))
                }
                Err(e) => CommandResult::Error(format!("Could not connect to server: {}", e)),
            }
        }

        "logout" => match session.take() {
            Some(s) => match s.logout().await {
                Ok(_) => CommandResult::Info("Logged out.".to_string()),
                Err(e) => CommandResult::Error(format!("Logged out ({})", e)),
            },
            None => CommandResult::Error("Not logged in.".to_string()),
        },

        "join" => {
            let Some(s) = session.as_ref() else {
                return CommandResult::Error("You must login first.".to_string());
            };
            if parts.len() != 2 {
                return CommandResult::Error("Usage: join {channel}".to_string());
            }
            match s.join(parts[1]).await {
                Ok(_) => CommandResult::Info(format!("Joined channel {}", parts[1])),
                Err(ClientError::DuplicateSubscription(_)) => {
                    CommandResult::Error("Already subscribed to this channel.".to_string())
                }
                Err(e) => CommandResult::Error(format!("Join failed: {}", e)),
            }
        }

        "exit" => {
            let Some(s) = session.as_ref() else {
                return CommandResult::Error("You must login first.".to_string());
            };
            if parts.len() != 2 {
                return CommandResult::Error("Usage: exit {channel}".to_string());
            }
            match s.exit(parts[1]).await {
                Ok(()) => CommandResult::Info(format!("Exited channel {}", parts[1])),
                Err(ClientError::UnsubscribedTopic(_)) => CommandResult::Error(format!(
                    "You are not subscribed to channel {}.",
                    parts[1]
                )),
                Err(e) => CommandResult::Error(format!("Exit failed: {}", e)),
            }
        }

        "report" => {
            let Some(s) = session.as_ref() else {
                return CommandResult::Error("You must login first.".to_string());
            };
            if parts.len() != 2 {
                return CommandResult::Error("Usage: report {file.json}".to_string());
            }
            match s.report(parts[1]).await {
                Ok(count) => CommandResult::Info(format!("Reported {} events.", count)),
                Err(e) => CommandResult::Error(format!("Report failed: {}", e)),
            }
        }

        "summary" => {
            let Some(s) = session.as_ref() else {
                return CommandResult::Error("You must login first.".to_string());
            };
            if parts.len() != 4 {
                return CommandResult::Error(
                    "Usage: summary {channel_name} {user} {file}".to_string(),
                );
            }
            let (channel, user, file) = (parts[1], parts[2], parts[3]);
            let summary = s.summary(channel, user);
            if summary.is_empty() {
                return CommandResult::Info(format!(
                    "No reports found for channel \"{}\" and user \"{}\".",
                    channel, user
                ));
            }
            let path = cli.summary_dir.join(file);
            match std::fs::write(&path, summary.render()) {
                Ok(()) => CommandResult::Info(format!("Summary written to {}", path.display())),
                Err(e) => {
                    CommandResult::Error(format!("Could not write {}: {}", path.display(), e))
                }
            }
        }

        "help" | "?" => {
            print_help();
            CommandResult::Ok
        }

        _ => CommandResult::Error(format!(
            "Unknown command: {}. Type 'help' for commands.",
            command
        )),
    }
}

/// Print help text
pub fn print_help() {
    println!("Commands:");
    println!("  login {{host:port}} {{user}} {{password}}  - Connect and log in");
    println!("  join {{channel}}                         - Subscribe to a channel");
    println!("  exit {{channel}}                         - Unsubscribe from a channel");
    println!("  report {{file.json}}                     - Report the events in a file");
    println!(
        "  summary {{channel}} {{user}} {{file}}        - Write a summary of a user's reports"
    );
    println!("  logout                                 - Disconnect from the server");
    println!("  quit                                   - Exit");
}
