//! Where key material comes from

use std::{fmt, path::PathBuf};

use pico_jwt_base64::Base64Url;
use serde::Deserialize;

use crate::{error, key::Key};

/// Raw key material, given inline or as a path to read
///
/// When deserialized, a source is written as one of
/// `{ "literal": "<text>" }`, `{ "base64": "<base64url>" }`, or
/// `{ "file": "<path>" }`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "KeySourceDto")]
pub enum KeySource {
    /// Key bytes held in memory
    Literal(Vec<u8>),

    /// A file holding the key bytes
    File(PathBuf),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum KeySourceDto {
    Literal(String),
    Base64(Base64Url),
    File(PathBuf),
}

impl From<KeySourceDto> for KeySource {
    fn from(dto: KeySourceDto) -> Self {
        match dto {
            KeySourceDto::Literal(s) => Self::Literal(s.into_bytes()),
            KeySourceDto::Base64(b) => Self::Literal(b.into_inner()),
            KeySourceDto::File(p) => Self::File(p),
        }
    }
}

impl KeySource {
    /// Key bytes held in memory
    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Literal(bytes.into())
    }

    /// A path to read the key bytes from
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Produces the raw key bytes
    ///
    /// # Errors
    ///
    /// The key file could not be read.
    pub async fn resolve(&self) -> Result<Vec<u8>, error::KeyLoadError> {
        match self {
            Self::Literal(bytes) => Ok(bytes.clone()),
            Self::File(path) => {
                tracing::trace!(path = %path.display(), "reading key file");
                tokio::fs::read(path)
                    .await
                    .map_err(|err| error::key_file_unreadable(path, err))
            }
        }
    }

    /// Resolves the source and types the resulting key
    ///
    /// # Errors
    ///
    /// The key file could not be read, or the bytes are PEM-armored but do
    /// not hold a supported key.
    pub async fn load_key(&self) -> Result<Key, error::KeyLoadError> {
        let bytes = self.resolve().await?;
        Ok(Key::from_bytes(&bytes)?)
    }
}

impl From<Vec<u8>> for KeySource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Literal(bytes)
    }
}

impl From<&'_ [u8]> for KeySource {
    fn from(bytes: &[u8]) -> Self {
        Self::Literal(bytes.to_vec())
    }
}

impl From<&'_ str> for KeySource {
    fn from(text: &str) -> Self {
        Self::Literal(text.as_bytes().to_vec())
    }
}

impl From<String> for KeySource {
    fn from(text: String) -> Self {
        Self::Literal(text.into_bytes())
    }
}

impl From<PathBuf> for KeySource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Literal(bytes) => f
                .debug_struct("Literal")
                .field("len", &bytes.len())
                .finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}
