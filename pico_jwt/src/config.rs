//! Declarative engine configuration

use serde::Deserialize;

use crate::{engine::Engine, error, jws, key::KeyMaterial, source::KeySource};

/// Describes an engine: its default algorithm and where its keys come from
///
/// ```
/// use pico_jwt::{jws, EngineConfig};
///
/// let config: EngineConfig = serde_json::from_str(r#"{
///     "algorithm": "HS256",
///     "private_key": { "literal": "secret123" }
/// }"#).unwrap();
///
/// assert_eq!(config.algorithm, jws::Algorithm::HS256);
/// assert!(config.public_key.is_none());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[must_use]
pub struct EngineConfig {
    /// The default signing algorithm
    pub algorithm: jws::Algorithm,

    /// The HMAC secret or private key used for signing
    #[serde(default)]
    pub private_key: Option<KeySource>,

    /// The public key used for verifying
    ///
    /// When absent, verification uses the private key.
    #[serde(default)]
    pub public_key: Option<KeySource>,
}

impl EngineConfig {
    /// A configuration without keys
    pub fn new(algorithm: jws::Algorithm) -> Self {
        Self {
            algorithm,
            private_key: None,
            public_key: None,
        }
    }

    /// Sets the private key source
    pub fn with_private_key(mut self, source: impl Into<KeySource>) -> Self {
        self.private_key = Some(source.into());
        self
    }

    /// Sets the public key source
    pub fn with_public_key(mut self, source: impl Into<KeySource>) -> Self {
        self.public_key = Some(source.into());
        self
    }

    /// Loads the configured keys and builds an engine
    ///
    /// # Errors
    ///
    /// A configured key source cannot be read or does not hold a usable key.
    pub async fn build(&self) -> Result<Engine, error::KeyLoadError> {
        let keys =
            KeyMaterial::load(self.private_key.as_ref(), self.public_key.as_ref()).await?;

        tracing::debug!(algorithm = %self.algorithm, "engine configured");

        Ok(Engine::new(self.algorithm).with_keys(keys))
    }
}
