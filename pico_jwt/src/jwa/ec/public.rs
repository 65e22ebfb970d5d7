use std::fmt;

use openssl::{
    ec::{EcKey, EcKeyRef},
    pkey::{HasPublic, PKey, Public},
    sign::Verifier,
};

use super::{fixed_to_der, Curve, SigningAlgorithm};
use crate::{error, jws};

/// ECC public key
#[derive(Clone)]
pub struct PublicKey {
    curve: Curve,
    pkey: PKey<Public>,
}

impl PublicKey {
    /// Imports an ECC public key from a SubjectPublicKeyInfo PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid ECC public key on a supported curve.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let pkey = PKey::public_key_from_pem(pem.as_bytes()).map_err(error::key_rejected)?;
        let key = pkey.ec_key().map_err(error::key_rejected)?;
        Self::from_openssl_eckey(&key)
    }

    pub(crate) fn from_openssl_eckey<T: HasPublic>(
        key: &EcKeyRef<T>,
    ) -> Result<Self, error::KeyRejected> {
        let curve = Curve::from_group(key.group())?;
        let public = EcKey::from_public_key(key.group(), key.public_key())
            .map_err(error::key_rejected)?;
        let pkey = PKey::from_ec_key(public).map_err(error::key_rejected)?;

        Ok(Self { curve, pkey })
    }

    /// The curve the key lies on
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Exports the public key as a SubjectPublicKeyInfo PEM file
    ///
    /// # Errors
    ///
    /// The key could not be encoded.
    pub fn to_pem(&self) -> Result<String, error::Unexpected> {
        let pem = self.pkey.public_key_to_pem().map_err(error::unexpected)?;
        String::from_utf8(pem).map_err(error::unexpected)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve && self.pkey.public_eq(&other.pkey)
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("curve", &self.curve)
            .finish()
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = SigningAlgorithm;
    type Error = error::SignatureMismatch;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.curve == alg.curve()
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if !jws::Verifier::can_verify(self, alg) {
            return Err(error::signature_mismatch());
        }

        let der = fixed_to_der(signature, self.curve)?;

        let mut verifier =
            Verifier::new(alg.message_digest(), &self.pkey).map_err(|_| error::signature_mismatch())?;
        verifier
            .update(data)
            .map_err(|_| error::signature_mismatch())?;

        match verifier.verify(&der) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(error::signature_mismatch()),
        }
    }
}
