//! `LibraryApi` over the VK-style HTTP method API.
//!
//! Every method is a form-encoded POST to `<base_url>/<method>` carrying the
//! token and the API version marker. Responses are either `{"response": ...}`
//! or `{"error": {"error_code": .., "error_msg": ..}}`.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ApiSettings;

use super::api::{ApiError, LibraryApi};
use super::model::Track;

/// Error codes the API uses for bad or expired tokens.
const AUTH_ERROR_CODES: [i64; 2] = [5, 1116];

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<AudioItem>,
}

#[derive(Debug, Deserialize)]
struct AudioItem {
    id: Option<i64>,
    owner_id: Option<i64>,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    url: String,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Album {
    thumb: Option<Thumb>,
}

#[derive(Debug, Deserialize)]
struct Thumb {
    photo_135: Option<String>,
    photo_68: Option<String>,
}

impl AudioItem {
    fn into_track(self) -> Option<Track> {
        // Items without a stream location are region-locked or removed.
        if self.url.trim().is_empty() {
            return None;
        }
        let cover_art_url = self
            .album
            .and_then(|a| a.thumb)
            .and_then(|t| t.photo_135.or(t.photo_68))
            .filter(|u| !u.is_empty());
        Some(Track {
            title: self.title,
            artist: self.artist,
            duration_seconds: self.duration,
            stream_url: self.url,
            cover_art_url,
            remote_id: self.id,
            owner_id: self.owner_id,
        })
    }
}

pub(super) fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if let Some(err) = envelope.error {
        if AUTH_ERROR_CODES.contains(&err.error_code) {
            return Err(ApiError::Auth(err.error_msg));
        }
        return Err(ApiError::Api {
            code: err.error_code,
            message: err.error_msg,
        });
    }
    envelope
        .response
        .ok_or_else(|| ApiError::Decode("neither response nor error present".to_string()))
}

pub(super) fn parse_tracks(body: &str) -> Result<Vec<Track>, ApiError> {
    let list: ItemList = parse_envelope(body)?;
    Ok(list.items.into_iter().filter_map(AudioItem::into_track).collect())
}

pub struct VkClient {
    agent: ureq::Agent,
    settings: ApiSettings,
}

impl VkClient {
    pub fn new(settings: ApiSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(&settings.user_agent)
            .build();
        Self { agent, settings }
    }

    fn call(&self, method: &str, token: &str, params: &[(&str, String)]) -> Result<String, ApiError> {
        let url = format!("{}/{}", self.settings.base_url.trim_end_matches('/'), method);

        let mut form: Vec<(&str, &str)> = vec![
            ("access_token", token),
            ("v", self.settings.version.as_str()),
        ];
        form.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        log::debug!("api call {}", method);
        let response = self.agent.post(&url).send_form(&form).map_err(|e| match e {
            ureq::Error::Status(code, _) => ApiError::Transport(format!("HTTP {code} from {method}")),
            ureq::Error::Transport(t) => ApiError::Transport(t.to_string()),
        })?;
        response
            .into_string()
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    fn page_size(&self) -> String {
        self.settings.page_size.to_string()
    }
}

impl LibraryApi for VkClient {
    fn get_identity(&self, token: &str) -> Result<i64, ApiError> {
        let body = self.call("users.get", token, &[])?;
        let users: Vec<User> = parse_envelope(&body)?;
        users
            .first()
            .map(|u| u.id)
            .ok_or_else(|| ApiError::Auth("no user bound to token".to_string()))
    }

    fn get_library(&self, token: &str, owner_id: i64) -> Result<Vec<Track>, ApiError> {
        let body = self.call(
            "audio.get",
            token,
            &[("owner_id", owner_id.to_string()), ("count", self.page_size())],
        )?;
        parse_tracks(&body)
    }

    fn get_recommendations(&self, token: &str) -> Result<Vec<Track>, ApiError> {
        let body = self.call("audio.getRecommendations", token, &[("count", self.page_size())])?;
        parse_tracks(&body)
    }

    fn search(&self, token: &str, query: &str) -> Result<Vec<Track>, ApiError> {
        let body = self.call(
            "audio.search",
            token,
            &[("q", query.to_string()), ("count", self.page_size())],
        )?;
        parse_tracks(&body)
    }

    fn add_to_library(&self, token: &str, owner_id: i64, track_id: i64) -> Result<(), ApiError> {
        let body = self.call(
            "audio.add",
            token,
            &[("owner_id", owner_id.to_string()), ("audio_id", track_id.to_string())],
        )?;
        let _new_id: i64 = parse_envelope(&body)?;
        Ok(())
    }

    fn remove_from_library(
        &self,
        token: &str,
        owner_id: i64,
        track_id: i64,
    ) -> Result<(), ApiError> {
        let body = self.call(
            "audio.delete",
            token,
            &[("owner_id", owner_id.to_string()), ("audio_id", track_id.to_string())],
        )?;
        match parse_envelope::<i64>(&body)? {
            1 => Ok(()),
            other => Err(ApiError::Api {
                code: other,
                message: "track could not be removed".to_string(),
            }),
        }
    }
}
