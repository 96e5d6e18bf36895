use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "restyle", about = "Restyle — rewrite short texts in a chosen tone")]
pub struct Cli {
    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Locally hosted GGUF model (POST /generate_text)
    Local,
    /// Hosted chat-completion API (POST /api/chat)
    Remote,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long, value_enum, default_value_t = BackendKind::Local)]
        backend: BackendKind,
    },

    /// Transform one text and print the result
    Transform {
        #[arg(long, value_enum, default_value_t = BackendKind::Local)]
        backend: BackendKind,
        #[arg(long, default_value = "casual")]
        style: String,
        text: String,
    },
}
