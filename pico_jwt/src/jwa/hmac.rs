//! HMAC signatures over a shared secret

use std::{convert::TryFrom, fmt};

use pico_jwt_base64::{Base64Url, Base64UrlRef};
use ring::rand::SecureRandom;
use serde::{Deserialize, Serialize};

use crate::{error, jws};

/// A shared secret for the `HS*` algorithms
///
/// The same secret signs and verifies. Any length is accepted, including an
/// empty one.
#[derive(Clone, PartialEq, Eq)]
#[must_use]
pub struct Hmac {
    secret: Base64Url,
}

impl fmt::Debug for Hmac {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Hmac")
            .field("len", &self.secret.as_slice().len())
            .finish_non_exhaustive()
    }
}

impl Hmac {
    /// Wraps raw secret bytes
    pub fn new(secret: impl Into<Base64Url>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Draws a random secret as long as the digest of `alg`
    ///
    /// # Errors
    ///
    /// The system RNG failed.
    pub fn generate(alg: SigningAlgorithm) -> Result<Self, error::Unexpected> {
        Self::generate_with_rng(alg, &ring::rand::SystemRandom::new())
    }

    /// Like [`generate`][Self::generate], drawing from `rng`
    ///
    /// # Errors
    ///
    /// `rng` failed to fill the buffer.
    pub fn generate_with_rng(
        alg: SigningAlgorithm,
        rng: &dyn SecureRandom,
    ) -> Result<Self, error::Unexpected> {
        let mut bytes = vec![0; alg.digest().output_len()];
        rng.fill(&mut bytes)
            .map_err(|_| error::unexpected("unable to draw random secret"))?;

        Ok(Self::new(bytes))
    }

    /// The raw secret bytes
    pub fn secret(&self) -> &Base64UrlRef {
        &self.secret
    }

    fn keyed(&self, alg: SigningAlgorithm) -> ring::hmac::Key {
        ring::hmac::Key::new(alg.ring_mac(), self.secret.as_slice())
    }
}

/// `HS256`, `HS384` and `HS512`
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum SigningAlgorithm {
    /// HMAC-SHA-256
    HS256,
    /// HMAC-SHA-384
    HS384,
    /// HMAC-SHA-512
    HS512,
}

impl SigningAlgorithm {
    /// Tag length in bytes, equal to the digest length
    #[must_use]
    pub const fn signature_size(self) -> usize {
        self.digest().output_len()
    }

    pub(crate) const fn digest(self) -> jws::Digest {
        match self {
            Self::HS256 => jws::Digest::Sha256,
            Self::HS384 => jws::Digest::Sha384,
            Self::HS512 => jws::Digest::Sha512,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }

    fn ring_mac(self) -> ring::hmac::Algorithm {
        match self.digest() {
            jws::Digest::Sha256 => ring::hmac::HMAC_SHA256,
            jws::Digest::Sha384 => ring::hmac::HMAC_SHA384,
            jws::Digest::Sha512 => ring::hmac::HMAC_SHA512,
        }
    }
}

impl From<SigningAlgorithm> for jws::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        Self::Hmac(alg)
    }
}

impl TryFrom<jws::Algorithm> for SigningAlgorithm {
    type Error = error::IncompatibleAlgorithm;

    fn try_from(alg: jws::Algorithm) -> Result<Self, Self::Error> {
        if let jws::Algorithm::Hmac(hs) = alg {
            Ok(hs)
        } else {
            Err(error::incompatible_algorithm(alg))
        }
    }
}

impl jws::Signer for Hmac {
    type Algorithm = SigningAlgorithm;
    type Error = std::convert::Infallible;

    fn can_sign(&self, _alg: Self::Algorithm) -> bool {
        true
    }

    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let tag = ring::hmac::sign(&self.keyed(alg), data);
        Ok(tag.as_ref().to_vec())
    }
}

impl jws::Verifier for Hmac {
    type Algorithm = SigningAlgorithm;
    type Error = error::SignatureMismatch;

    fn can_verify(&self, _alg: Self::Algorithm) -> bool {
        true
    }

    /// Compares tags in constant time
    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        ring::hmac::verify(&self.keyed(alg), data, signature)
            .map_err(|_| error::signature_mismatch())
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
