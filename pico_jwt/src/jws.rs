//! Signature algorithms and the signer/verifier seams
//!
//! Every token names its algorithm in the `alg` header field. [`Algorithm`]
//! is the closed set of names this crate understands, and [`Signer`] and
//! [`Verifier`] are implemented by each key family in [`jwa`][crate::jwa].

use std::{convert::TryFrom, error::Error as StdError, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error, jwa};

/// Supported signing algorithms
///
/// ```
/// use pico_jwt::jws::{Algorithm, Digest, Family};
///
/// let alg: Algorithm = "PS384".parse().unwrap();
/// assert_eq!(alg, Algorithm::PS384);
/// assert_eq!(alg.family(), Family::RsaPss);
/// assert_eq!(alg.digest(), Digest::Sha384);
/// assert_eq!(alg.digest_name(), "RSA-SHA384");
///
/// assert!(Algorithm::lookup("none").is_none());
/// ```
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Algorithm {
    /// HMAC symmetric
    Hmac(jwa::hmac::SigningAlgorithm),

    /// RSA public/private key pair
    Rsa(jwa::rsa::SigningAlgorithm),

    /// Elliptic curve cryptography
    EllipticCurve(jwa::ec::SigningAlgorithm),
}

impl Algorithm {
    /// The HS256 signing algorithm
    pub const HS256: Algorithm = Self::Hmac(jwa::hmac::SigningAlgorithm::HS256);
    /// The HS384 signing algorithm
    pub const HS384: Algorithm = Self::Hmac(jwa::hmac::SigningAlgorithm::HS384);
    /// The HS512 signing algorithm
    pub const HS512: Algorithm = Self::Hmac(jwa::hmac::SigningAlgorithm::HS512);

    /// The RS256 signing algorithm
    pub const RS256: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS256);
    /// The RS384 signing algorithm
    pub const RS384: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS384);
    /// The RS512 signing algorithm
    pub const RS512: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS512);
    /// The PS256 signing algorithm
    pub const PS256: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS256);
    /// The PS384 signing algorithm
    pub const PS384: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS384);
    /// The PS512 signing algorithm
    pub const PS512: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS512);

    /// The ES256 signing algorithm
    pub const ES256: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES256);
    /// The ES384 signing algorithm
    pub const ES384: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES384);
    /// The ES512 signing algorithm
    pub const ES512: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES512);

    /// Every supported algorithm
    pub const ALL: [Algorithm; 12] = [
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
    ];

    /// Looks up an algorithm by its `alg` identifier
    ///
    /// Matching is exact and case-sensitive.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|alg| alg.name() == name)
    }

    /// The `alg` identifier
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hmac(alg) => alg.name(),
            Self::Rsa(alg) => alg.name(),
            Self::EllipticCurve(alg) => alg.name(),
        }
    }

    /// The signature family
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::Hmac(_) => Family::Hmac,
            Self::Rsa(alg) if alg.is_pss() => Family::RsaPss,
            Self::Rsa(_) => Family::RsaPkcs1,
            Self::EllipticCurve(_) => Family::Ecdsa,
        }
    }

    /// The message digest used by the algorithm
    #[must_use]
    pub const fn digest(self) -> Digest {
        match self {
            Self::Hmac(alg) => alg.digest(),
            Self::Rsa(alg) => alg.digest(),
            Self::EllipticCurve(alg) => alg.digest(),
        }
    }

    /// The conventional digest name for the algorithm
    ///
    /// HMAC algorithms name the bare digest (`SHA256`); asymmetric algorithms
    /// name the signature digest (`RSA-SHA256`).
    #[must_use]
    pub const fn digest_name(self) -> &'static str {
        match (self.family(), self.digest()) {
            (Family::Hmac, Digest::Sha256) => "SHA256",
            (Family::Hmac, Digest::Sha384) => "SHA384",
            (Family::Hmac, Digest::Sha512) => "SHA512",
            (_, Digest::Sha256) => "RSA-SHA256",
            (_, Digest::Sha384) => "RSA-SHA384",
            (_, Digest::Sha512) => "RSA-SHA512",
        }
    }

    /// The expected output size of the algorithm's signature in bytes
    ///
    /// RSA signatures are as long as the key modulus; this reports the size
    /// for a 2048-bit key.
    #[must_use]
    pub fn signature_size(self) -> usize {
        match self {
            Self::Hmac(alg) => alg.signature_size(),
            Self::Rsa(alg) => alg.signature_size(),
            Self::EllipticCurve(alg) => alg.signature_size(),
        }
    }
}

/// A family of signature schemes
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum Family {
    /// HMAC with a shared secret
    Hmac,
    /// RSASSA-PKCS1-v1_5
    RsaPkcs1,
    /// RSASSA-PSS with a salt as long as the digest
    RsaPss,
    /// ECDSA with fixed-width `r ‖ s` signatures
    Ecdsa,
}

/// A message digest from the SHA-2 family
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum Digest {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl Digest {
    /// The size in bytes of the digest output
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 256 / 8,
            Self::Sha384 => 384 / 8,
            Self::Sha512 => 512 / 8,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::lookup(name).ok_or_else(|| error::unknown_algorithm(name))
    }
}

impl FromStr for Algorithm {
    type Err = error::UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// A JWS signer
pub trait Signer {
    /// The usable signature algorithms
    type Algorithm;

    /// The error returned on failure to sign
    type Error: fmt::Debug + fmt::Display + Sync + Send + 'static;

    /// Whether the specific algorithm provided is compatible
    /// with this signer
    fn can_sign(&self, alg: Self::Algorithm) -> bool;

    /// Attempts to sign the data provided using the specified algorithm
    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

/// A JWS verifier
pub trait Verifier {
    /// The verifiable signature algorithms
    type Algorithm;

    /// The error returned on a failure to verify
    type Error: StdError + Send + Sync + 'static;

    /// Whether the specific algorithm provided is compatible
    /// with this verifier
    fn can_verify(&self, alg: Self::Algorithm) -> bool;

    /// Attempts to verify the data against the signature using the
    /// specified algorithm
    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error>;
}
