use std::net::SocketAddr;

use clap::Parser;

use crate::{inbound::OutputMode, outbound::DEFAULT_LEAVE_COMMAND, session::SessionConfig};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address of the chat server to connect to.
    #[arg(long, default_value = "127.0.0.1:1394")]
    pub server: SocketAddr,

    /// Name announced to the server as the first line of the session.
    #[arg(long)]
    pub name: Option<String>,

    /// How the server's stream is decoded and shown.
    #[arg(long, value_enum, default_value_t = OutputMode::Text)]
    pub mode: OutputMode,

    /// Line that, once sent, ends the session.
    #[arg(long, default_value = DEFAULT_LEAVE_COMMAND)]
    pub leave_command: String,
}

impl Cli {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mode: self.mode,
            leave_command: self.leave_command.clone(),
        }
    }
}
