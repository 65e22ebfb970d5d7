use openssl::{
    pkey::{HasPublic, PKey},
    rsa::{Rsa, RsaRef},
};
use pico_jwt_base64::{Base64Url, Base64UrlRef};

use super::SigningAlgorithm;
use crate::{error, jws};

const MIN_MODULUS_LEN: usize = 2048 / 8;
const MAX_MODULUS_LEN: usize = 8192 / 8;

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublicKey {
    /// The public modulus
    modulus: Base64Url,

    /// The public exponent
    exponent: Base64Url,
}

impl PublicKey {
    /// The public key's modulus
    pub fn modulus(&self) -> &Base64UrlRef {
        &self.modulus
    }

    /// The public key's exponent
    pub fn exponent(&self) -> &Base64UrlRef {
        &self.exponent
    }

    /// Imports an RSA public key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let rsa = match PKey::public_key_from_pem(pem.as_bytes()) {
            Ok(pkey) => pkey.rsa().map_err(error::key_rejected)?,
            Err(_) => Rsa::public_key_from_pem_pkcs1(pem.as_bytes()).map_err(error::key_rejected)?,
        };

        Self::from_openssl_key(&rsa)
    }

    pub(crate) fn from_openssl_key<T: HasPublic>(
        rsa: &RsaRef<T>,
    ) -> Result<Self, error::KeyRejected> {
        Self::from_components(rsa.n().to_vec(), rsa.e().to_vec())
    }

    /// Exports an RSA public key to a PEM file
    ///
    /// # Errors
    ///
    /// The key components could not be re-assembled into a PEM file.
    pub fn to_pem(&self) -> Result<String, error::Unexpected> {
        use openssl::bn::BigNum;

        let modulus = BigNum::from_slice(self.modulus.as_slice()).map_err(error::unexpected)?;
        let exponent = BigNum::from_slice(self.exponent.as_slice()).map_err(error::unexpected)?;

        let key = Rsa::from_public_components(modulus, exponent).map_err(error::unexpected)?;
        let pem = key.public_key_to_pem().map_err(error::unexpected)?;
        String::from_utf8(pem).map_err(error::unexpected)
    }

    /// Constructs a public key from the modulus and exponent
    ///
    /// # Errors
    ///
    /// The modulus is shorter than 2048 bits or longer than 8192 bits, or
    /// the exponent is empty.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = modulus.into();
        let exponent = exponent.into();

        let len = modulus.as_slice().len();
        if !(MIN_MODULUS_LEN..=MAX_MODULUS_LEN).contains(&len) {
            return Err(error::key_rejected(format!(
                "key modulus must be between 2048 and 8192 bits, got {} bits",
                len * 8
            )));
        }

        if exponent.as_slice().is_empty() {
            return Err(error::key_rejected("key exponent is empty"));
        }

        Ok(Self { modulus, exponent })
    }
}

impl jws::Verifier for PublicKey {
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
        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(alg.ring_verification(), data, signature)
            .map_err(|_| error::signature_mismatch())
    }
}
