mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{Command, MemoryCommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "liam", version, about = "Signed requests for the LIAM memory API")]
struct Cli {
    /// TOML config file (defaults to ./liam.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Generate a P-256 key pair
    Keygen {
        /// Write private.pem and public.pem here instead of printing them
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Canonicalize and sign a body, print the headers and the exact bytes
    Sign {
        /// JSON body, or @FILE to read it from a file
        #[arg(long)]
        body: String,

        /// Endpoint the body is meant for (e.g. memory/create)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Check a base64 signature over a body as received
    Verify {
        /// Body bytes, or @FILE to read them from a file
        #[arg(long)]
        body: String,

        /// Base64 DER signature
        #[arg(long)]
        signature: String,

        /// SPKI PEM public key file
        #[arg(long)]
        public_key: PathBuf,
    },

    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Store, search and forget memories
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Create a profile and print its userkey
    Create {
        #[arg(long)]
        name: String,

        /// Unique identifier of the user in the calling application
        #[arg(long)]
        identification: String,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Store a memory
    Create {
        #[arg(long)]
        user_key: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        session_id: String,
    },

    /// Search memories
    List {
        #[arg(long)]
        user_key: String,

        #[arg(long, default_value = "")]
        query: String,

        /// Search token (repeatable)
        #[arg(long = "token")]
        tokens: Vec<String>,
    },

    /// Forget a memory by its query hash
    Forget {
        #[arg(long)]
        user_key: String,

        #[arg(long)]
        query_hash: String,
    },

    /// List a user's tags
    Tags {
        #[arg(long)]
        user_key: String,
    },
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Keygen { out_dir } => Command::Keygen { out_dir },
            CliCommand::Sign { body, endpoint } => Command::Sign { body, endpoint },
            CliCommand::Verify { body, signature, public_key } => {
                Command::Verify { body, signature, public_key }
            }
            CliCommand::Profile {
                action: ProfileAction::Create { name, identification },
            } => Command::CreateProfile { name, identification },
            CliCommand::Memory { action } => Command::Memory(match action {
                MemoryAction::Create { user_key, content, tag, session_id } => {
                    MemoryCommand::Create { user_key, content, tag, session_id }
                }
                MemoryAction::List { user_key, query, tokens } => {
                    MemoryCommand::List { user_key, query, tokens }
                }
                MemoryAction::Forget { user_key, query_hash } => {
                    MemoryCommand::Forget { user_key, query_hash }
                }
                MemoryAction::Tags { user_key } => MemoryCommand::Tags { user_key },
            }),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match commands::run(cli.command.into(), cli.config.as_deref()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
