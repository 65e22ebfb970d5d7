//! RSA signatures with PKCS #1 v1.5 or PSS padding

use std::{convert::TryFrom, fmt};

use pico_jwt_base64::Base64Url;
use ring::signature as rs;
use serde::{Deserialize, Serialize};

use crate::{error, jws};

mod private;
mod public;

pub use private::PrivateKey;
pub use public::PublicKey;

/// An RSA public key, optionally paired with its private half
///
/// Every `RS*` and `PS*` algorithm works with any key. Signing needs the
/// private half.
#[derive(Debug, Clone, Eq, PartialEq)]
#[must_use]
pub struct Rsa {
    public: PublicKey,
    private: Option<PrivateKey>,
}

impl Rsa {
    /// A fresh 2048-bit key pair
    ///
    /// # Errors
    ///
    /// openssl failed to generate the key.
    pub fn generate() -> Result<Self, error::Unexpected> {
        Ok(PrivateKey::generate()?.into())
    }

    /// Parses a private key PEM
    ///
    /// `RSA PRIVATE KEY` (PKCS #1) and `PRIVATE KEY` (PKCS #8) are accepted.
    ///
    /// # Errors
    ///
    /// The PEM holds no usable RSA private key.
    pub fn private_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        Ok(PrivateKey::from_pem(pem)?.into())
    }

    /// Parses a public key PEM
    ///
    /// `PUBLIC KEY` (SPKI) and `RSA PUBLIC KEY` (PKCS #1) are accepted.
    ///
    /// # Errors
    ///
    /// The PEM holds no usable RSA public key.
    pub fn public_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        Ok(PublicKey::from_pem(pem)?.into())
    }

    /// A verify-only key from big-endian `n` and `e`
    ///
    /// # Errors
    ///
    /// See [`PublicKey::from_components`].
    pub fn from_public_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        Ok(PublicKey::from_components(modulus, exponent)?.into())
    }

    /// The verifying half
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Whether this key can sign
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Drops the private half
    pub fn public_only(self) -> Self {
        Self {
            private: None,
            ..self
        }
    }

    /// Signature length in bytes, equal to the modulus length
    #[must_use]
    pub fn signature_size(&self) -> usize {
        self.public.modulus().as_slice().len()
    }
}

/// `RS256` through `PS512`
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum SigningAlgorithm {
    /// PKCS #1 v1.5 padding, SHA-256
    RS256,
    /// PKCS #1 v1.5 padding, SHA-384
    RS384,
    /// PKCS #1 v1.5 padding, SHA-512
    RS512,
    /// PSS padding, SHA-256 digest and MGF1
    PS256,
    /// PSS padding, SHA-384 digest and MGF1
    PS384,
    /// PSS padding, SHA-512 digest and MGF1
    PS512,
}

impl SigningAlgorithm {
    /// Signature length for a 2048-bit modulus
    ///
    /// Larger keys make longer signatures; see [`Rsa::signature_size`].
    #[must_use]
    pub const fn signature_size(self) -> usize {
        256
    }

    pub(crate) const fn is_pss(self) -> bool {
        matches!(self, Self::PS256 | Self::PS384 | Self::PS512)
    }

    pub(crate) const fn digest(self) -> jws::Digest {
        match self {
            Self::RS256 | Self::PS256 => jws::Digest::Sha256,
            Self::RS384 | Self::PS384 => jws::Digest::Sha384,
            Self::RS512 | Self::PS512 => jws::Digest::Sha512,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        }
    }

    fn ring_verification(self) -> &'static rs::RsaParameters {
        match (self.is_pss(), self.digest()) {
            (false, jws::Digest::Sha256) => &rs::RSA_PKCS1_2048_8192_SHA256,
            (false, jws::Digest::Sha384) => &rs::RSA_PKCS1_2048_8192_SHA384,
            (false, jws::Digest::Sha512) => &rs::RSA_PKCS1_2048_8192_SHA512,
            (true, jws::Digest::Sha256) => &rs::RSA_PSS_2048_8192_SHA256,
            (true, jws::Digest::Sha384) => &rs::RSA_PSS_2048_8192_SHA384,
            (true, jws::Digest::Sha512) => &rs::RSA_PSS_2048_8192_SHA512,
        }
    }

    fn ring_padding(self) -> &'static dyn rs::RsaEncoding {
        match (self.is_pss(), self.digest()) {
            (false, jws::Digest::Sha256) => &rs::RSA_PKCS1_SHA256,
            (false, jws::Digest::Sha384) => &rs::RSA_PKCS1_SHA384,
            (false, jws::Digest::Sha512) => &rs::RSA_PKCS1_SHA512,
            (true, jws::Digest::Sha256) => &rs::RSA_PSS_SHA256,
            (true, jws::Digest::Sha384) => &rs::RSA_PSS_SHA384,
            (true, jws::Digest::Sha512) => &rs::RSA_PSS_SHA512,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<SigningAlgorithm> for jws::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        Self::Rsa(alg)
    }
}

impl TryFrom<jws::Algorithm> for SigningAlgorithm {
    type Error = error::IncompatibleAlgorithm;

    fn try_from(alg: jws::Algorithm) -> Result<Self, Self::Error> {
        if let jws::Algorithm::Rsa(rsa) = alg {
            Ok(rsa)
        } else {
            Err(error::incompatible_algorithm(alg))
        }
    }
}

impl jws::Verifier for Rsa {
    type Algorithm = SigningAlgorithm;
    type Error = error::SignatureMismatch;

    fn can_verify(&self, _alg: Self::Algorithm) -> bool {
        true
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        jws::Verifier::verify(&self.public, alg, data, signature)
    }
}

impl jws::Signer for Rsa {
    type Algorithm = SigningAlgorithm;
    type Error = error::SigningError;

    fn can_sign(&self, _alg: Self::Algorithm) -> bool {
        self.has_private_key()
    }

    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let private = self.private.as_ref().ok_or_else(error::missing_private_key)?;
        Ok(jws::Signer::sign(private, alg, data)?)
    }
}

impl From<PublicKey> for Rsa {
    fn from(public: PublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }
}

impl From<PrivateKey> for Rsa {
    fn from(private: PrivateKey) -> Self {
        Self {
            public: private.public_key().clone(),
            private: Some(private),
        }
    }
}
