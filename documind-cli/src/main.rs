#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::{info, warn};

use documind_client::{
    ChatController, ControllerEvent, DeleteOutcome, FileUpload, SessionId, UploadForm,
    UploadOutcome,
};
use documind_common::{logging, util, Config};

mod render;
mod repl;

/// `documind` - ask questions about your documents.
#[derive(Parser, Debug)]
#[command(name = "documind")]
#[command(version)]
#[command(about = "Chat with your PDFs and web pages through a DocuMind server.", long_about = None)]
struct Cli {
    /// Base URL of the DocuMind API (overrides config and DOCUMIND_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to a config file (default: ~/.documind/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List chat sessions, most recent first
    Sessions,

    /// Delete a chat session with its messages and documents
    DeleteSession {
        /// Session ID
        id: String,
    },

    /// Print a session's message history
    History {
        /// Session ID
        session: String,
    },

    /// List a session's documents and their ingestion status
    Docs {
        /// Session ID
        session: String,
    },

    /// Upload a PDF or a web page into a session
    #[command(group(ArgGroup::new("source").required(true).args(["url", "file"])))]
    Upload {
        /// Session ID
        session: String,

        /// Web page URL to ingest
        #[arg(long)]
        url: Option<String>,

        /// PDF file to upload
        #[arg(long)]
        file: Option<PathBuf>,

        /// Wait until ingestion finishes
        #[arg(long)]
        wait: bool,
    },

    /// Delete a document from a session
    DeleteDoc {
        /// Session ID
        session: String,
        /// Document ID
        document: String,
    },

    /// Ask a single question in a session
    Ask {
        /// Session ID
        session: String,
        /// Question text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Start an interactive chat
    Chat {
        /// Resume an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_with_env(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    config.validate().context("Invalid configuration")?;

    logging::init_from_config(&config.observability);

    let controller = ChatController::from_config(&config)?;
    let result = run(&controller, cli.command).await;
    controller.shutdown().await;
    result
}

async fn run(controller: &ChatController, command: Commands) -> Result<()> {
    match command {
        Commands::Sessions => {
            controller.refresh_sessions().await?;
            render::sessions(&controller.sessions().await, &controller.active_session());
        }

        Commands::DeleteSession { id } => {
            controller.delete_session(&SessionId::from(id.as_str())).await?;
            println!("Deleted session {id}");
        }

        Commands::History { session } => {
            controller.select_session(session.into()).await;
            let messages = controller.messages().await;
            if messages.is_empty() {
                println!("No messages.");
            }
            for message in &messages {
                render::message(message);
            }
        }

        Commands::Docs { session } => {
            controller.select_session(session.into()).await;
            render::documents(&controller.documents().await);
        }

        Commands::Upload {
            session,
            url,
            file,
            wait,
        } => {
            controller.select_session(session.into()).await;
            let form = match (url, file) {
                (Some(url), _) => UploadForm::url(url),
                (None, Some(path)) => {
                    let upload = FileUpload::from_path(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    info!(
                        file = %upload.name,
                        size = %util::format_bytes(upload.bytes.len() as u64),
                        "Read upload"
                    );
                    UploadForm::file(upload)
                }
                (None, None) => UploadForm::default(),
            };
            upload(controller, form, wait).await?;
        }

        Commands::DeleteDoc { session, document } => {
            controller.select_session(session.into()).await;
            match controller.delete_document(&document).await? {
                DeleteOutcome::Deleted => println!("Deleted document {document}"),
                DeleteOutcome::Failed(notice) => bail!(notice),
            }
        }

        Commands::Ask { session, text } => {
            let session = SessionId::from(session);
            controller.select_session(session.clone()).await;
            if !controller.has_ready_document(&session).await {
                warn!("No ready documents in this session; the answer may not be grounded");
            }
            if let Some(reply) = controller.send_message(&text.join(" ")).await {
                render::message(&reply);
            }
        }

        Commands::Chat { session } => {
            if let Some(session) = session {
                controller.select_session(session.into()).await;
            } else {
                controller.bootstrap().await;
            }
            repl::run(controller).await?;
        }
    }

    Ok(())
}

async fn upload(controller: &ChatController, form: UploadForm, wait: bool) -> Result<()> {
    let mut events = controller.subscribe();

    let document = match controller.upload_document(form).await? {
        UploadOutcome::Uploaded(document) => document,
        UploadOutcome::Failed(notice) => bail!(notice),
        UploadOutcome::Skipped => bail!("Nothing to upload"),
    };
    println!("Uploaded {} as {} ({})", document.name, document.id, document.status);

    if !wait {
        return Ok(());
    }

    while controller.is_polling().await {
        match events.recv().await {
            Ok(ControllerEvent::DocumentsChanged { documents, .. }) => {
                if let Some(current) = documents.iter().find(|d| d.id == document.id) {
                    println!("{}: {}", current.name, current.status);
                }
            }
            Ok(ControllerEvent::PollingStopped { .. }) => break,
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    render::documents(&controller.documents().await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["documind", "upload", "s1"]).is_err());
        assert!(Cli::try_parse_from([
            "documind", "upload", "s1", "--url", "https://a", "--file", "a.pdf"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["documind", "upload", "s1", "--file", "a.pdf"]).is_ok());
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::try_parse_from(["documind", "ask", "s1", "What", "is", "it?"]).unwrap();
        match cli.command {
            Commands::Ask { text, .. } => assert_eq!(text.join(" "), "What is it?"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli =
            Cli::try_parse_from(["documind", "sessions", "--api-url", "http://rag:8000"]).unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://rag:8000"));
    }
}
