//! Interactive chat loop.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use documind_client::{
    ChatController, ControllerEvent, DeleteOutcome, DocumentStatus, FileUpload, SessionId,
    UploadForm, UploadOutcome,
};
use documind_common::util;

use crate::render;

const HELP: &str = "\
Commands:
  /new                  start a new session
  /sessions             list sessions
  /switch <id>          switch to a session
  /delete-session [id]  delete a session (default: the active one)
  /docs                 list documents in this session
  /upload <path>        upload a PDF
  /upload-url <url>     ingest a web page
  /delete-doc <id>      delete a document
  /help                 show this help
  /quit                 exit
Anything else is sent as a question.";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    New,
    Sessions,
    Switch(String),
    DeleteSession(Option<String>),
    Docs,
    Upload(String),
    UploadUrl(String),
    DeleteDoc(String),
    Help,
    Quit,
    Ask(String),
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Ask(line.to_string());
        };

        let (command, arg) = match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (rest, ""),
        };
        let required = |build: fn(String) -> Self| {
            if arg.is_empty() {
                Self::Invalid(format!("/{command} needs an argument"))
            } else {
                build(arg.to_string())
            }
        };

        match command {
            "new" => Self::New,
            "sessions" => Self::Sessions,
            "switch" => required(Self::Switch),
            "delete-session" => Self::DeleteSession((!arg.is_empty()).then(|| arg.to_string())),
            "docs" => Self::Docs,
            "upload" => required(Self::Upload),
            "upload-url" => required(Self::UploadUrl),
            "delete-doc" => required(Self::DeleteDoc),
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("Unknown command /{other}, try /help")),
        }
    }
}

/// Run the chat loop until `/quit`, end of input, or Ctrl-C.
pub async fn run(controller: &ChatController) -> Result<()> {
    let events = controller.subscribe();
    let watcher = tokio::spawn(watch_documents(events));

    println!("Session {}. Type /help for commands.", controller.active_session());
    for message in controller.messages().await {
        render::message(&message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match Input::parse(&line) {
            Input::Ask(text) if text.is_empty() => {}
            Input::Ask(text) => ask(controller, &text).await,
            Input::New => {
                let id = controller.new_session().await;
                println!("Started session {id}");
            }
            Input::Sessions => {
                if let Err(e) = controller.refresh_sessions().await {
                    println!("Could not list sessions: {e}");
                }
                render::sessions(&controller.sessions().await, &controller.active_session());
            }
            Input::Switch(id) => {
                controller.select_session(SessionId::from(id)).await;
                println!("Switched to {}", controller.active_session());
                for message in controller.messages().await {
                    render::message(&message);
                }
            }
            Input::DeleteSession(id) => {
                let id = id.map_or_else(|| controller.active_session(), SessionId::from);
                match controller.delete_session(&id).await {
                    Ok(()) => println!(
                        "Deleted session {id}. Active session: {}",
                        controller.active_session()
                    ),
                    Err(e) => println!("Could not delete session: {e}"),
                }
            }
            Input::Docs => render::documents(&controller.documents().await),
            Input::Upload(path) => match FileUpload::from_path(&path).await {
                Ok(file) => {
                    println!("Uploading {} ({})", file.name, util::format_bytes(file.bytes.len() as u64));
                    upload(controller, UploadForm::file(file)).await;
                }
                Err(e) => println!("Could not read {path}: {e}"),
            },
            Input::UploadUrl(url) => upload(controller, UploadForm::url(url)).await,
            Input::DeleteDoc(id) => match controller.delete_document(&id).await {
                Ok(DeleteOutcome::Deleted) => println!("Deleted document {id}"),
                Ok(DeleteOutcome::Failed(notice)) => println!("documind> {notice}"),
                Err(e) => println!("{e}"),
            },
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
            Input::Invalid(reason) => println!("{reason}"),
        }
    }

    watcher.abort();
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn ask(controller: &ChatController, text: &str) {
    let session = controller.active_session();
    if !controller.has_ready_document(&session).await {
        println!("(no ready documents in this session yet)");
    }
    if let Some(reply) = controller.send_message(text).await {
        render::message(&reply);
    }
}

async fn upload(controller: &ChatController, form: UploadForm) {
    match controller.upload_document(form).await {
        Ok(UploadOutcome::Uploaded(document)) => {
            println!("Queued {} as {}", document.name, document.id);
        }
        Ok(UploadOutcome::Failed(notice)) => println!("documind> {notice}"),
        Ok(UploadOutcome::Skipped) => println!("Nothing to upload"),
        Err(e) => println!("{e}"),
    }
}

/// Print document status transitions reported by background polls.
async fn watch_documents(mut events: tokio::sync::broadcast::Receiver<ControllerEvent>) {
    let mut seen: HashMap<String, DocumentStatus> = HashMap::new();

    loop {
        match events.recv().await {
            Ok(ControllerEvent::DocumentsChanged { documents, .. }) => {
                for document in &documents {
                    let previous = seen.insert(document.id.clone(), document.status);
                    if previous.is_some_and(|p| p != document.status) {
                        println!("\n[{}] {}", document.name, document.status);
                        prompt();
                    }
                }
            }
            Ok(ControllerEvent::SessionActivated { .. }) => seen.clear(),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event watcher lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_question() {
        assert_eq!(
            Input::parse("  What is the refund policy? "),
            Input::Ask("What is the refund policy?".into())
        );
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(Input::parse("/switch abc"), Input::Switch("abc".into()));
        assert_eq!(
            Input::parse("/upload-url   https://example.com "),
            Input::UploadUrl("https://example.com".into())
        );
        assert_eq!(Input::parse("/delete-session"), Input::DeleteSession(None));
        assert_eq!(
            Input::parse("/delete-session s1"),
            Input::DeleteSession(Some("s1".into()))
        );
    }

    #[test]
    fn test_missing_or_unknown_commands_are_invalid() {
        assert!(matches!(Input::parse("/switch"), Input::Invalid(_)));
        assert!(matches!(Input::parse("/frobnicate"), Input::Invalid(_)));
        assert_eq!(Input::parse("/quit"), Input::Quit);
    }
}
