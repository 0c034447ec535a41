//! Loading YAML or JSON request files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Syntax a request file was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    Yaml,
    Json,
}

impl RequestFormat {
    /// Picks the format from the file extension; `None` if it is neither.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for RequestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => f.write_str("YAML"),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// Error type for request loading. Every variant names the file.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {} as {format}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: RequestFormat,
        message: String,
    },
    #[error("failed to parse {} (tried YAML and JSON)", .path.display())]
    Unrecognized { path: PathBuf },
}

/// Loads a request from a YAML or JSON file into the provided type.
pub fn load_request<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, RequestError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| RequestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_request(&data, path)
}

/// Parses request data by file extension; other extensions try YAML, then JSON.
pub fn parse_request<T: DeserializeOwned>(
    data: &[u8],
    path: impl AsRef<Path>,
) -> Result<T, RequestError> {
    let path = path.as_ref();
    let parse_error = |format, message: String| RequestError::Parse {
        path: path.to_path_buf(),
        format,
        message,
    };

    match RequestFormat::from_path(path) {
        Some(RequestFormat::Yaml) => serde_yaml::from_slice(data)
            .map_err(|e| parse_error(RequestFormat::Yaml, e.to_string())),
        Some(RequestFormat::Json) => serde_json::from_slice(data)
            .map_err(|e| parse_error(RequestFormat::Json, e.to_string())),
        None => serde_yaml::from_slice(data)
            .or_else(|_| serde_json::from_slice(data))
            .map_err(|_| RequestError::Unrecognized {
                path: path.to_path_buf(),
            }),
    }
}
