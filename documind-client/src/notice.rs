//! Assistant-style notices appended to the transcript when a user action fails.

use crate::error::ClientError;

pub const SEND_FAILED: &str = "Sorry, something went wrong.";
pub const UPLOAD_FAILED: &str = "Sorry, something went wrong during document upload.";
pub const DELETE_FAILED: &str = "Sorry, something went wrong during document deletion.";

/// Notice for a failed upload.
pub fn upload_failed(error: &ClientError) -> String {
    match error.server_message() {
        Some(message) => format!("Error uploading document: {message}"),
        None => UPLOAD_FAILED.to_string(),
    }
}

/// Notice for a failed document deletion.
pub fn delete_failed(error: &ClientError) -> String {
    match error.server_message() {
        Some(message) => format!("Error deleting document: {message}"),
        None => DELETE_FAILED.to_string(),
    }
}
