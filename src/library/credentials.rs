//! Bearer token storage.
//!
//! The token lives in a small dotenv-style file outside the UI process.
//! Other lines in the file are preserved on save and delete.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

const TOKEN_KEY: &str = "RESONANCE_TOKEN";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait CredentialStore {
    fn load(&self) -> Result<Option<String>, CredentialError>;
    fn save(&self, token: &str) -> Result<(), CredentialError>;
    fn delete(&self) -> Result<(), CredentialError>;
}

pub struct EnvFileCredentials {
    path: PathBuf,
}

impl EnvFileCredentials {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn io_err(&self, source: io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_lines(&self) -> Result<Vec<String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn write_lines(&self, lines: &[String]) -> Result<(), CredentialError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let mut body = lines.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        fs::write(&self.path, body).map_err(|e| self.io_err(e))
    }
}

fn is_token_line(line: &str) -> bool {
    line.trim_start()
        .strip_prefix(TOKEN_KEY)
        .is_some_and(|rest| rest.starts_with('='))
}

impl CredentialStore for EnvFileCredentials {
    fn load(&self) -> Result<Option<String>, CredentialError> {
        let token = self
            .read_lines()?
            .iter()
            .filter(|l| is_token_line(l))
            .filter_map(|l| l.split_once('=').map(|(_, v)| v.trim().to_string()))
            .find(|v| !v.is_empty());
        Ok(token)
    }

    fn save(&self, token: &str) -> Result<(), CredentialError> {
        let mut lines: Vec<String> = self
            .read_lines()?
            .into_iter()
            .filter(|l| !is_token_line(l))
            .collect();
        lines.push(format!("{}={}", TOKEN_KEY, token.trim()));
        self.write_lines(&lines)
    }

    fn delete(&self) -> Result<(), CredentialError> {
        if !self.path.exists() {
            return Ok(());
        }
        let lines: Vec<String> = self
            .read_lines()?
            .into_iter()
            .filter(|l| !is_token_line(l))
            .collect();
        self.write_lines(&lines)
    }
}
