//! The remote library collaborator.
//!
//! Every call takes the bearer token explicitly; nothing here touches the
//! playback core, so a failing call can never disturb playback state.

use thiserror::Error;

use super::model::Track;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Token rejected or expired.
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("remote API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for showing in the UI status line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Auth(_) => "Token is invalid or expired, please log in again".to_string(),
            ApiError::Api { message, .. } => message.clone(),
            ApiError::Transport(_) => "Network error, check your connection".to_string(),
            ApiError::Decode(_) => "Unexpected response from the server".to_string(),
        }
    }
}

pub trait LibraryApi {
    fn get_identity(&self, token: &str) -> Result<i64, ApiError>;
    fn get_library(&self, token: &str, owner_id: i64) -> Result<Vec<Track>, ApiError>;
    fn get_recommendations(&self, token: &str) -> Result<Vec<Track>, ApiError>;
    fn search(&self, token: &str, query: &str) -> Result<Vec<Track>, ApiError>;
    fn add_to_library(&self, token: &str, owner_id: i64, track_id: i64) -> Result<(), ApiError>;
    fn remove_from_library(&self, token: &str, owner_id: i64, track_id: i64)
    -> Result<(), ApiError>;
}
