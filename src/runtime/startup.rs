use thiserror::Error;

use crate::app::TrackSource;
use crate::library::{ApiError, CredentialError, CredentialStore, LibraryApi, Track};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("no access token: pass --token <token> or set RESONANCE_TOKEN in the credentials file")]
    NoToken,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Command line: `resonance [--token <t>] [--no-persist] [library | search <query>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub token: Option<String>,
    pub persist: bool,
    pub source: TrackSource,
}

impl LaunchOptions {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, StartupError> {
        let mut token = None;
        let mut persist = true;
        let mut words: Vec<String> = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--token" => match args.next() {
                    Some(t) => token = Some(t),
                    None => return Err(StartupError::Usage("--token needs a value".into())),
                },
                "--no-persist" => persist = false,
                _ if arg.starts_with("--") => {
                    return Err(StartupError::Usage(format!("unknown option {arg}")));
                }
                _ => words.push(arg),
            }
        }

        let source = match words.split_first() {
            None => TrackSource::Recommendations,
            Some((cmd, rest)) => match cmd.as_str() {
                "recommendations" if rest.is_empty() => TrackSource::Recommendations,
                "library" if rest.is_empty() => TrackSource::Library,
                "search" => {
                    let query = rest.join(" ");
                    if query.trim().is_empty() {
                        return Err(StartupError::Usage("search needs a query".into()));
                    }
                    TrackSource::Search(query)
                }
                _ => return Err(StartupError::Usage(format!("unexpected argument {cmd}"))),
            },
        };

        Ok(Self {
            token,
            persist,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
}

/// Resolve and validate the bearer token.
///
/// A token given on the command line is saved once it validates. A stored
/// token the API rejects is deleted so the next launch asks again.
pub fn authenticate(
    api: &dyn LibraryApi,
    credentials: &dyn CredentialStore,
    cli_token: Option<String>,
) -> Result<Session, StartupError> {
    let from_cli = cli_token.is_some();
    let token = match cli_token {
        Some(t) => Some(t),
        None => credentials.load()?,
    };
    let token = token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(StartupError::NoToken)?;

    match api.get_identity(&token) {
        Ok(user_id) => {
            log::info!("signed in as user {}", user_id);
            if from_cli {
                if let Err(e) = credentials.save(&token) {
                    log::warn!("could not store token: {}", e);
                }
            }
            Ok(Session { token, user_id })
        }
        Err(ApiError::Auth(msg)) => {
            log::warn!("token rejected: {}", msg);
            if !from_cli {
                credentials.delete()?;
            }
            Err(ApiError::Auth(msg).into())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn fetch_tracks(
    api: &dyn LibraryApi,
    session: &Session,
    source: &TrackSource,
) -> Result<Vec<Track>, ApiError> {
    match source {
        TrackSource::Recommendations => api.get_recommendations(&session.token),
        TrackSource::Library => api.get_library(&session.token, session.user_id),
        TrackSource::Search(query) => api.search(&session.token, query),
    }
}

/// Add or remove `track` in the signed-in library. Returns the status line
/// to show; failures never touch playback.
pub fn edit_library(
    api: &dyn LibraryApi,
    session: &Session,
    track: Option<&Track>,
    add: bool,
) -> String {
    let Some(track) = track else {
        return "Nothing is playing".to_string();
    };
    let Some((owner_id, track_id)) = track.library_ref() else {
        return "This track is not in the remote library".to_string();
    };

    let result = if add {
        api.add_to_library(&session.token, owner_id, track_id)
    } else {
        api.remove_from_library(&session.token, owner_id, track_id)
    };
    match result {
        Ok(()) if add => format!("Added to library: {}", track.display()),
        Ok(()) => format!("Removed from library: {}", track.display()),
        Err(e) => {
            log::warn!("library edit for {} failed: {}", track.display(), e);
            e.user_message()
        }
    }
}
