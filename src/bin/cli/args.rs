use clap::Parser;
use emergency_stomp::SessionOptions;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stomp-client")]
#[command(version)]
#[command(about = "Interactive client for emergency event channels")]
pub struct Cli {
    /// Value sent in the CONNECT `host` header
    #[arg(long, default_value = "stomp.cs.bgu.ac.il")]
    pub host_header: String,

    /// Directory summary files are written to
    #[arg(long, default_value = ".")]
    pub summary_dir: PathBuf,

    /// How long logout waits for the receive loop (milliseconds)
    #[arg(long, default_value_t = 5000)]
    pub disconnect_timeout_ms: u64,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_host(self.host_header.clone())
            .with_disconnect_timeout(Duration::from_millis(self.disconnect_timeout_ms))
    }
}
