//! Terminal output for sessions, documents and messages.

use documind_client::{Document, Message, Sender, Session, SessionId, Source};
use documind_common::util::truncate_with_ellipsis;

const EXCERPT_CHARS: usize = 200;

pub fn sessions(sessions: &[Session], active: &SessionId) {
    if sessions.is_empty() {
        println!("No sessions.");
        return;
    }
    for session in sessions {
        let marker = if &session.id == active { "*" } else { " " };
        println!(
            "{marker} {}  {}  updated {}",
            session.id.short(),
            session.id,
            session.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn documents(documents: &[Document]) {
    if documents.is_empty() {
        println!("No documents.");
        return;
    }
    for document in documents {
        println!(
            "{:<12} {:<4} {:<10} {}",
            document.id,
            document.kind.to_string(),
            document.status.to_string(),
            document.name
        );
    }
}

pub fn message(message: &Message) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Ai => "documind",
    };
    println!("{who}> {}", message.text);
    if message.has_sources() {
        println!("  Sources:");
        for source in &message.sources {
            print_source(source);
        }
    }
}

fn print_source(source: &Source) {
    println!(
        "  - Doc: {}  Chunk: {}  {}",
        source.document_id,
        source.chunk_index,
        source.score_percent()
    );
    println!(
        "    {}",
        truncate_with_ellipsis(source.content_excerpt.trim(), EXCERPT_CHARS)
    );
}
