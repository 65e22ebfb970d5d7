//! Common errors

#![allow(missing_copy_implementations)]

use std::{error::Error as StdError, io, path::PathBuf};

use thiserror::Error;

use crate::jws;

/// The key cannot be used with the requested algorithm
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key incompatible with algorithm '{alg}'")]
pub struct IncompatibleAlgorithm {
    alg: jws::Algorithm,
}

impl IncompatibleAlgorithm {
    /// The algorithm that was requested
    #[must_use]
    pub fn algorithm(&self) -> jws::Algorithm {
        self.alg
    }
}

#[inline]
pub(crate) fn incompatible_algorithm(alg: impl Into<jws::Algorithm>) -> IncompatibleAlgorithm {
    IncompatibleAlgorithm { alg: alg.into() }
}

/// The provided name could not be matched with supported algorithms
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("'{alg}' does not match supported algorithms")]
pub struct UnknownAlgorithm {
    alg: String,
}

impl UnknownAlgorithm {
    /// The algorithm name that was not recognized
    #[must_use]
    pub fn name(&self) -> &str {
        &self.alg
    }
}

#[inline]
pub(crate) fn unknown_algorithm(alg: impl Into<String>) -> UnknownAlgorithm {
    UnknownAlgorithm { alg: alg.into() }
}

/// The token declares a `typ` other than `JWT`
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unexpected token type '{typ}'")]
pub struct TypeMismatch {
    typ: String,
}

pub(crate) fn type_mismatch(typ: impl Into<String>) -> TypeMismatch {
    TypeMismatch { typ: typ.into() }
}

/// The JWT is malformed and cannot be parsed out into header, payload, and signature sections
#[derive(Clone, Copy, Debug, Error)]
#[error("malformed JWT")]
pub struct MalformedJwt {
    _p: (),
}

pub(crate) fn malformed_jwt() -> MalformedJwt {
    MalformedJwt { _p: () }
}

/// The JWT header section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT header")]
pub struct MalformedJwtHeader {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtHeader {
    MalformedJwtHeader {
        source: source.into(),
    }
}

/// The JWT payload section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT payload")]
pub struct MalformedJwtPayload {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtPayload {
    MalformedJwtPayload {
        source: source.into(),
    }
}

/// The JWT signature section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT signature")]
pub struct MalformedJwtSignature {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_signature(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtSignature {
    MalformedJwtSignature {
        source: source.into(),
    }
}

/// The signature did not match
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// The key was rejected
#[derive(Debug, Error)]
#[error("key rejected")]
pub struct KeyRejected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn key_rejected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> KeyRejected {
    KeyRejected {
        source: source.into(),
    }
}

/// Missing private key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("cannot sign without a private key")]
pub struct MissingPrivateKey {
    _p: (),
}

pub(crate) const fn missing_private_key() -> MissingPrivateKey {
    MissingPrivateKey { _p: () }
}

/// Neither a public key nor a private/secret key is available for verification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("cannot verify without a key")]
pub struct MissingVerificationKey {
    _p: (),
}

pub(crate) const fn missing_verification_key() -> MissingVerificationKey {
    MissingVerificationKey { _p: () }
}

/// Unexpected error (possibly a bug)
#[derive(Debug, Error)]
#[error("unexpected error")]
pub struct Unexpected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn unexpected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> Unexpected {
    Unexpected {
        source: source.into(),
    }
}

/// An error occurring while creating a signature
#[derive(Debug, Error)]
pub enum SigningError {
    /// The key cannot be used for signing operations
    #[error(transparent)]
    MissingPrivateKey(#[from] MissingPrivateKey),

    /// The key cannot be used with this algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// An unexpected error
    #[error(transparent)]
    Unexpected(#[from] Unexpected),
}

impl From<std::convert::Infallible> for SigningError {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

/// An error occurring while verifying a signature with a key
#[derive(Debug, Error)]
pub enum KeyVerifyError {
    /// The key cannot be used with this algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// Signature is invalid
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

impl KeyVerifyError {
    /// Whether the error is due to an incompatible algorithm
    #[must_use]
    pub fn is_incompatible_alg(&self) -> bool {
        matches!(self, Self::IncompatibleAlgorithm(_))
    }

    /// Whether the error is due to a signature mismatch
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch(_))
    }
}

/// An error occurring while verifying a JWT
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The JWT was rejected by the key
    #[error("token rejected by key")]
    KeyVerifyError(#[from] KeyVerifyError),

    /// The JWT is malformed, without a discernible header, payload, and signature
    #[error(transparent)]
    MalformedToken(#[from] MalformedJwt),

    /// The JWT header is malformed
    #[error(transparent)]
    MalformedTokenHeader(#[from] MalformedJwtHeader),

    /// The JWT signature is malformed
    #[error(transparent)]
    MalformedTokenSignature(#[from] MalformedJwtSignature),

    /// The JWT declares an unexpected `typ`
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),

    /// The JWT declares an algorithm that is not supported
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),

    /// No key is available to verify the JWT
    #[error(transparent)]
    MissingVerificationKey(#[from] MissingVerificationKey),
}

impl JwtVerifyError {
    /// Whether the token could not be decoded at all
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken(_)
                | Self::MalformedTokenHeader(_)
                | Self::MalformedTokenSignature(_)
        )
    }

    /// Whether the token's signature did not match
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::KeyVerifyError(e) if e.is_signature_mismatch())
    }

    /// Whether the token's algorithm cannot be used with the available key
    #[must_use]
    pub fn is_incompatible_alg(&self) -> bool {
        matches!(self, Self::KeyVerifyError(e) if e.is_incompatible_alg())
    }
}

impl From<SignatureMismatch> for JwtVerifyError {
    fn from(err: SignatureMismatch) -> Self {
        Self::KeyVerifyError(err.into())
    }
}

/// An error occurring while creating a JWT
#[derive(Debug, Error)]
pub enum JwtSigningError {
    /// The JWT could not be signed by the key
    #[error(transparent)]
    SigningError(#[from] SigningError),

    /// The JWT header requests an algorithm that is not supported
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),

    /// The JWT header was malformed and could not be serialized
    #[error(transparent)]
    MalformedJwtHeader(#[from] MalformedJwtHeader),

    /// The JWT payload was malformed and could not be serialized
    #[error(transparent)]
    MalformedJwtPayload(#[from] MalformedJwtPayload),
}

impl From<MissingPrivateKey> for JwtSigningError {
    fn from(err: MissingPrivateKey) -> Self {
        Self::SigningError(err.into())
    }
}

/// An error occurring while loading key material
#[derive(Debug, Error)]
pub enum KeyLoadError {
    /// The key file could not be read
    #[error("unable to read key file '{}'", path.display())]
    Io {
        /// The path of the key file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The key material was read but is not a usable key
    #[error(transparent)]
    Rejected(#[from] KeyRejected),
}

pub(crate) fn key_file_unreadable(path: impl Into<PathBuf>, source: io::Error) -> KeyLoadError {
    KeyLoadError::Io {
        path: path.into(),
        source,
    }
}
