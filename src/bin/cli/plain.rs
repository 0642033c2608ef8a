use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

use super::args::Cli;
use super::commands::{ClientSession, CommandResult, execute_command, print_help};

/// Run the interactive command loop until `quit` or end of input
pub async fn run(cli: &Cli) {
    // Channel to receive user commands from stdin reader
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<String>(16);

    // Spawn blocking stdin reader
    std::thread::spawn(move || {
        let stdin = io::stdin();
        let reader = stdin.lock();
        for line in reader.lines() {
            match line {
                Ok(l) => {
                    if cmd_tx.blocking_send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    println!("Client started.");
    print_help();
    println!();

    let mut session: Option<ClientSession> = None;

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match cmd_rx.recv().await {
            Some(l) => l,
            None => break,
        };

        reap_ended_session(&mut session).await;

        match execute_command(&line, &mut session, cli).await {
            CommandResult::Ok => {}
            CommandResult::Info(msg) => println!("{}", msg),
            CommandResult::Error(msg) => eprintln!("{}", msg),
            CommandResult::Quit => break,
        }
    }

    if let Some(s) = session.take() {
        if s.is_logged_in() {
            println!("Disconnecting...");
            if let Err(e) = s.logout().await {
                eprintln!("Logout failed: {}", e);
            }
        } else {
            s.close().await;
        }
    }
}

/// Drop a session whose login flag was cleared by an ERROR frame or a lost
/// connection, telling the user about it.
async fn reap_ended_session(session: &mut Option<ClientSession>) {
    if let Some(s) = session.take_if(|s| !s.is_logged_in()) {
        s.close().await;
        eprintln!("Disconnected from server.");
    }
}
