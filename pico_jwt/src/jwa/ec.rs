//! ECDSA signatures over the NIST prime curves
//!
//! OpenSSL produces and consumes DER-encoded `ECDSA-Sig-Value` structures,
//! while tokens carry the fixed-width concatenation `r ‖ s`, each integer
//! left-padded to the curve's coordinate size. Signing converts DER to the
//! fixed form and verification converts back.

use std::{convert::TryFrom, fmt};

use openssl::{
    bn::BigNum,
    ec::EcGroupRef,
    ecdsa::EcdsaSig,
    hash::MessageDigest,
    nid::Nid,
};
use serde::{Deserialize, Serialize};

use crate::{error, jws};

mod private;
mod public;

pub use private::PrivateKey;
pub use public::PublicKey;

/// A named ECC curve
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Curve {
    /// The P-256 curve (prime256v1/secp256r1)
    P256,

    /// The P-384 curve (secp384r1)
    P384,

    /// The P-521 curve (secp521r1)
    P521,
}

impl Curve {
    /// The size in bytes of a single coordinate or signature integer
    #[must_use]
    pub const fn coordinate_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    pub(crate) const fn nid(self) -> Nid {
        match self {
            Self::P256 => Nid::X9_62_PRIME256V1,
            Self::P384 => Nid::SECP384R1,
            Self::P521 => Nid::SECP521R1,
        }
    }

    pub(crate) fn from_group(group: &EcGroupRef) -> Result<Self, error::KeyRejected> {
        let nid = group
            .curve_name()
            .ok_or_else(|| error::key_rejected("elliptic curve has no name"))?;

        [Self::P256, Self::P384, Self::P521]
            .into_iter()
            .find(|crv| crv.nid() == nid)
            .ok_or_else(|| error::key_rejected("unsupported elliptic curve"))
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        };

        f.write_str(s)
    }
}

/// Elliptic curve cryptography key
#[derive(Debug, Clone, Eq, PartialEq)]
#[must_use]
pub struct EllipticCurve {
    key: MaybePrivate,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum MaybePrivate {
    PublicAndPrivate(PrivateKey),
    PublicOnly(PublicKey),
}

impl EllipticCurve {
    /// Generates a newly minted key pair using the specified curve
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate(curve: Curve) -> Result<Self, error::Unexpected> {
        let private_key = PrivateKey::generate(curve)?;

        Ok(Self::from(private_key))
    }

    /// Constructs a private key from a PEM file
    ///
    /// Accepts SEC1 (`EC PRIVATE KEY`) and PKCS #8 (`PRIVATE KEY`) armor.
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid ECC private key on a supported curve.
    pub fn private_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let private_key = PrivateKey::from_pem(pem)?;

        Ok(Self::from(private_key))
    }

    /// Constructs a public key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid ECC public key on a supported curve.
    pub fn public_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let public_key = PublicKey::from_pem(pem)?;

        Ok(Self::from(public_key))
    }

    /// The curve the key lies on
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.public_key().curve()
    }

    pub(crate) fn private_key(&self) -> Option<&PrivateKey> {
        match &self.key {
            MaybePrivate::PublicAndPrivate(p) => Some(p),
            MaybePrivate::PublicOnly(_) => None,
        }
    }

    /// The public half of the key
    pub fn public_key(&self) -> &PublicKey {
        match &self.key {
            MaybePrivate::PublicAndPrivate(p) => p.public_key(),
            MaybePrivate::PublicOnly(p) => p,
        }
    }

    /// Whether the private key is available
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.private_key().is_some()
    }

    /// Removes the private key components
    pub fn public_only(self) -> Self {
        match self.key {
            MaybePrivate::PublicAndPrivate(p) => Self::from(p.into_public_key()),
            MaybePrivate::PublicOnly(_) => self,
        }
    }
}

/// Elliptic curve cryptography signing algorithms
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum SigningAlgorithm {
    /// ECDSA using the P-256 curve and SHA-256
    ES256,
    /// ECDSA using the P-384 curve and SHA-384
    ES384,
    /// ECDSA using the P-521 curve and SHA-512
    ES512,
}

impl SigningAlgorithm {
    /// Size in bytes of a fixed-width ECDSA signature
    #[must_use]
    pub const fn signature_size(self) -> usize {
        self.curve().coordinate_size() * 2
    }

    /// The curve required by the algorithm
    #[must_use]
    pub const fn curve(self) -> Curve {
        match self {
            Self::ES256 => Curve::P256,
            Self::ES384 => Curve::P384,
            Self::ES512 => Curve::P521,
        }
    }

    pub(crate) const fn digest(self) -> jws::Digest {
        match self {
            Self::ES256 => jws::Digest::Sha256,
            Self::ES384 => jws::Digest::Sha384,
            Self::ES512 => jws::Digest::Sha512,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    fn message_digest(self) -> MessageDigest {
        match self {
            Self::ES256 => MessageDigest::sha256(),
            Self::ES384 => MessageDigest::sha384(),
            Self::ES512 => MessageDigest::sha512(),
        }
    }
}

impl From<SigningAlgorithm> for jws::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        Self::EllipticCurve(alg)
    }
}

impl TryFrom<jws::Algorithm> for SigningAlgorithm {
    type Error = error::IncompatibleAlgorithm;

    fn try_from(alg: jws::Algorithm) -> Result<Self, Self::Error> {
        match alg {
            jws::Algorithm::EllipticCurve(alg) => Ok(alg),
            _ => Err(error::incompatible_algorithm(alg)),
        }
    }
}

impl From<SigningAlgorithm> for Curve {
    fn from(alg: SigningAlgorithm) -> Self {
        alg.curve()
    }
}

impl From<Curve> for SigningAlgorithm {
    fn from(crv: Curve) -> Self {
        match crv {
            Curve::P256 => Self::ES256,
            Curve::P384 => Self::ES384,
            Curve::P521 => Self::ES512,
        }
    }
}

/// Converts a DER-encoded ECDSA signature into fixed-width `r ‖ s`
fn der_to_fixed(der: &[u8], curve: Curve) -> Result<Vec<u8>, error::Unexpected> {
    let sig = EcdsaSig::from_der(der).map_err(error::unexpected)?;
    let width = i32::try_from(curve.coordinate_size()).map_err(error::unexpected)?;

    let mut fixed = sig.r().to_vec_padded(width).map_err(error::unexpected)?;
    fixed.extend(sig.s().to_vec_padded(width).map_err(error::unexpected)?);

    Ok(fixed)
}

/// Converts a fixed-width `r ‖ s` signature into DER
fn fixed_to_der(fixed: &[u8], curve: Curve) -> Result<Vec<u8>, error::SignatureMismatch> {
    let width = curve.coordinate_size();
    if fixed.len() != width * 2 {
        return Err(error::signature_mismatch());
    }

    let (r, s) = fixed.split_at(width);
    let r = BigNum::from_slice(r).map_err(|_| error::signature_mismatch())?;
    let s = BigNum::from_slice(s).map_err(|_| error::signature_mismatch())?;

    EcdsaSig::from_private_components(r, s)
        .and_then(|sig| sig.to_der())
        .map_err(|_| error::signature_mismatch())
}

impl jws::Verifier for EllipticCurve {
    type Algorithm = SigningAlgorithm;
    type Error = error::SignatureMismatch;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        jws::Verifier::can_verify(self.public_key(), alg)
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        jws::Verifier::verify(self.public_key(), alg, data, signature)
    }
}

impl jws::Signer for EllipticCurve {
    type Algorithm = SigningAlgorithm;
    type Error = error::SigningError;

    fn can_sign(&self, alg: Self::Algorithm) -> bool {
        if let Some(p) = self.private_key() {
            jws::Signer::can_sign(p, alg)
        } else {
            false
        }
    }

    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        if let Some(p) = self.private_key() {
            jws::Signer::sign(p, alg, data)
        } else {
            Err(error::missing_private_key().into())
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<PublicKey> for EllipticCurve {
    fn from(key: PublicKey) -> Self {
        Self {
            key: MaybePrivate::PublicOnly(key),
        }
    }
}

impl From<PrivateKey> for EllipticCurve {
    fn from(key: PrivateKey) -> Self {
        Self {
            key: MaybePrivate::PublicAndPrivate(key),
        }
    }
}
