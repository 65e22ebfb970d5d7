//! Typed keys and the signing/verifying key slots of an engine

use openssl::{
    pkey::{Id, PKey, Private, Public},
    rsa::Rsa,
};
use pico_jwt_base64::Base64Url;

use crate::{
    error, jwa,
    jws::{self, Signer, Verifier},
    source::KeySource,
};

const PEM_PREFIX: &[u8] = b"-----BEGIN";

/// A key from one of the supported families
///
/// Keys are typed when they are loaded. PEM-armored material becomes an RSA
/// or EC key, and anything else is an HMAC secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// HMAC shared secret
    Hmac(jwa::Hmac),

    /// RSA key pair or public key
    Rsa(jwa::Rsa),

    /// ECC key pair or public key
    EllipticCurve(jwa::EllipticCurve),
}

impl Key {
    /// A shared HMAC secret
    pub fn from_secret(secret: impl Into<Base64Url>) -> Self {
        Self::Hmac(jwa::Hmac::new(secret))
    }

    /// Types raw key material
    ///
    /// Bytes that start with a PEM `-----BEGIN` line (after optional leading
    /// whitespace) are parsed with [`Key::from_pem()`]. Everything else is
    /// taken as an HMAC secret verbatim.
    ///
    /// ```
    /// use pico_jwt::Key;
    ///
    /// let key = Key::from_bytes(b"secret123").unwrap();
    /// assert!(matches!(key, Key::Hmac(_)));
    ///
    /// assert!(Key::from_bytes(b"-----BEGIN PUBLIC KEY-----\ngarbage").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// The bytes are PEM-armored but do not hold a supported key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, error::KeyRejected> {
        if looks_like_pem(bytes) {
            let pem = std::str::from_utf8(bytes).map_err(error::key_rejected)?;
            Self::from_pem(pem)
        } else {
            Ok(Self::from_secret(bytes))
        }
    }

    /// Parses a PEM-armored RSA or EC key
    ///
    /// Private keys may be PKCS #1, SEC1, or PKCS #8. Public keys may be
    /// SubjectPublicKeyInfo or PKCS #1.
    ///
    /// # Errors
    ///
    /// The PEM file does not hold an RSA key of 2048 to 8192 bits or an EC key
    /// on P-256, P-384, or P-521.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        if let Ok(pkey) = PKey::private_key_from_pem(pem.as_bytes()) {
            return Self::from_private_pkey(&pkey);
        }

        if let Ok(pkey) = PKey::public_key_from_pem(pem.as_bytes()) {
            return Self::from_public_pkey(&pkey);
        }

        let rsa = Rsa::public_key_from_pem_pkcs1(pem.as_bytes()).map_err(error::key_rejected)?;
        Ok(Self::from(jwa::rsa::PublicKey::from_openssl_key(&rsa)?))
    }

    fn from_private_pkey(pkey: &PKey<Private>) -> Result<Self, error::KeyRejected> {
        match pkey.id() {
            Id::RSA => {
                let rsa = pkey.rsa().map_err(error::key_rejected)?;
                Ok(Self::from(jwa::rsa::PrivateKey::from_openssl_key(&rsa)?))
            }
            Id::EC => {
                let ec = pkey.ec_key().map_err(error::key_rejected)?;
                Ok(Self::from(jwa::ec::PrivateKey::from_openssl_eckey(ec)?))
            }
            _ => Err(error::key_rejected("unsupported private key type")),
        }
    }

    fn from_public_pkey(pkey: &PKey<Public>) -> Result<Self, error::KeyRejected> {
        match pkey.id() {
            Id::RSA => {
                let rsa = pkey.rsa().map_err(error::key_rejected)?;
                Ok(Self::from(jwa::rsa::PublicKey::from_openssl_key(&rsa)?))
            }
            Id::EC => {
                let ec = pkey.ec_key().map_err(error::key_rejected)?;
                Ok(Self::from(jwa::ec::PublicKey::from_openssl_eckey(&ec)?))
            }
            _ => Err(error::key_rejected("unsupported public key type")),
        }
    }

    /// Whether the key can produce signatures
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        match self {
            Self::Hmac(_) => true,
            Self::Rsa(p) => p.has_private_key(),
            Self::EllipticCurve(p) => p.has_private_key(),
        }
    }
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());

    bytes[start..].starts_with(PEM_PREFIX)
}

impl From<jwa::Hmac> for Key {
    fn from(key: jwa::Hmac) -> Self {
        Self::Hmac(key)
    }
}

impl From<jwa::Rsa> for Key {
    fn from(key: jwa::Rsa) -> Self {
        Self::Rsa(key)
    }
}

impl From<jwa::rsa::PublicKey> for Key {
    fn from(key: jwa::rsa::PublicKey) -> Self {
        Self::Rsa(key.into())
    }
}

impl From<jwa::rsa::PrivateKey> for Key {
    fn from(key: jwa::rsa::PrivateKey) -> Self {
        Self::Rsa(key.into())
    }
}

impl From<jwa::EllipticCurve> for Key {
    fn from(key: jwa::EllipticCurve) -> Self {
        Self::EllipticCurve(key)
    }
}

impl From<jwa::ec::PublicKey> for Key {
    fn from(key: jwa::ec::PublicKey) -> Self {
        Self::EllipticCurve(key.into())
    }
}

impl From<jwa::ec::PrivateKey> for Key {
    fn from(key: jwa::ec::PrivateKey) -> Self {
        Self::EllipticCurve(key.into())
    }
}

impl Verifier for Key {
    type Algorithm = jws::Algorithm;
    type Error = error::KeyVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        match self {
            Self::Hmac(p) => alg.try_into().map_or(false, |alg| p.can_verify(alg)),
            Self::Rsa(p) => alg.try_into().map_or(false, |alg| p.can_verify(alg)),
            Self::EllipticCurve(p) => alg.try_into().map_or(false, |alg| p.can_verify(alg)),
        }
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        match self {
            Self::Hmac(p) => p.verify(alg.try_into()?, data, signature)?,
            Self::Rsa(p) => p.verify(alg.try_into()?, data, signature)?,
            Self::EllipticCurve(p) => p.verify(alg.try_into()?, data, signature)?,
        }

        Ok(())
    }
}

impl Signer for Key {
    type Algorithm = jws::Algorithm;
    type Error = error::SigningError;

    fn can_sign(&self, alg: Self::Algorithm) -> bool {
        match self {
            Self::Hmac(p) => alg.try_into().map_or(false, |alg| p.can_sign(alg)),
            Self::Rsa(p) => alg.try_into().map_or(false, |alg| p.can_sign(alg)),
            Self::EllipticCurve(p) => alg.try_into().map_or(false, |alg| p.can_sign(alg)),
        }
    }

    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let signature = match self {
            Self::Hmac(p) => p.sign(alg.try_into()?, data)?,
            Self::Rsa(p) => p.sign(alg.try_into()?, data)?,
            Self::EllipticCurve(p) => p.sign(alg.try_into()?, data)?,
        };

        Ok(signature)
    }
}

/// The keys held by an engine
///
/// Signing uses the signing key. Verification uses the verifying key, falling
/// back to the signing key when no separate verifying key was supplied.
///
/// ```
/// use pico_jwt::KeyMaterial;
///
/// let keys = KeyMaterial::secret("secret123".as_bytes());
/// assert!(keys.signing_key().is_some());
/// assert_eq!(keys.verifying_key(), keys.signing_key());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct KeyMaterial {
    signing: Option<Key>,
    verifying: Option<Key>,
}

impl KeyMaterial {
    /// Key material with the given slots filled
    pub fn new(signing: Option<Key>, verifying: Option<Key>) -> Self {
        Self { signing, verifying }
    }

    /// An HMAC secret used for both signing and verifying
    pub fn secret(secret: impl Into<Base64Url>) -> Self {
        Self::new(Some(Key::from_secret(secret)), None)
    }

    /// Replaces the signing key
    pub fn with_signing_key(mut self, key: impl Into<Key>) -> Self {
        self.signing = Some(key.into());
        self
    }

    /// Replaces the verifying key
    pub fn with_verifying_key(mut self, key: impl Into<Key>) -> Self {
        self.verifying = Some(key.into());
        self
    }

    /// The key used to sign tokens
    #[must_use]
    pub fn signing_key(&self) -> Option<&Key> {
        self.signing.as_ref()
    }

    /// The key used to verify tokens
    #[must_use]
    pub fn verifying_key(&self) -> Option<&Key> {
        self.verifying.as_ref().or(self.signing.as_ref())
    }

    /// Whether any key is present
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.signing.is_some() || self.verifying.is_some()
    }

    /// Resolves and types both key slots concurrently
    ///
    /// Completes once both slots have resolved, or with the first error.
    ///
    /// # Errors
    ///
    /// Either source cannot be read or does not hold a usable key.
    pub async fn load(
        private: Option<&KeySource>,
        public: Option<&KeySource>,
    ) -> Result<Self, error::KeyLoadError> {
        let (signing, verifying) = tokio::try_join!(load_slot(private), load_slot(public))?;

        tracing::debug!(
            signing = signing.is_some(),
            verifying = verifying.is_some(),
            "key material loaded"
        );

        Ok(Self { signing, verifying })
    }
}

async fn load_slot(source: Option<&KeySource>) -> Result<Option<Key>, error::KeyLoadError> {
    match source {
        Some(source) => source.load_key().await.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test;

    #[test]
    fn pem_material_is_typed() -> color_eyre::Result<()> {
        assert!(matches!(
            Key::from_bytes(test::rsa::PRIVATE_KEY.as_bytes())?,
            Key::Rsa(ref k) if k.has_private_key()
        ));
        assert!(matches!(
            Key::from_bytes(test::rsa::PUBLIC_KEY.as_bytes())?,
            Key::Rsa(ref k) if !k.has_private_key()
        ));
        assert!(matches!(
            Key::from_bytes(test::ec::P384_PRIVATE_KEY.as_bytes())?,
            Key::EllipticCurve(ref k) if k.has_private_key()
        ));
        assert!(matches!(
            Key::from_bytes(test::ec::P521_PUBLIC_KEY.as_bytes())?,
            Key::EllipticCurve(ref k) if !k.has_private_key()
        ));
        Ok(())
    }

    #[test]
    fn leading_whitespace_before_pem_is_allowed() -> color_eyre::Result<()> {
        let padded = format!("\n  {}", test::ec::P256_PUBLIC_KEY);
        assert!(matches!(
            Key::from_bytes(padded.as_bytes())?,
            Key::EllipticCurve(_)
        ));
        Ok(())
    }

    #[test]
    fn other_bytes_are_secrets() -> color_eyre::Result<()> {
        let key = Key::from_bytes(b"secret123")?;
        assert_eq!(key, Key::from_secret(&b"secret123"[..]));
        assert!(key.has_private_key());

        assert!(matches!(Key::from_bytes(b"")?, Key::Hmac(_)));
        assert!(matches!(Key::from_bytes(b"----BEGIN")?, Key::Hmac(_)));
        Ok(())
    }

    #[test]
    fn broken_pem_is_rejected() {
        let mut pem = test::rsa::PUBLIC_KEY.to_owned();
        pem.truncate(pem.len() / 2);
        assert!(Key::from_bytes(pem.as_bytes()).is_err());
    }

    #[test]
    fn cross_family_use_is_incompatible() -> color_eyre::Result<()> {
        let hmac = Key::from_secret(&b"secret123"[..]);
        let rsa = Key::from_pem(test::rsa::PRIVATE_KEY)?;

        assert!(!hmac.can_sign(jws::Algorithm::RS256));
        assert!(!rsa.can_verify(jws::Algorithm::HS256));

        let err = hmac.sign(jws::Algorithm::ES256, b"data").unwrap_err();
        assert!(matches!(err, error::SigningError::IncompatibleAlgorithm(_)));

        let err = rsa.verify(jws::Algorithm::HS256, b"data", b"sig").unwrap_err();
        assert!(err.is_incompatible_alg());
        Ok(())
    }

    #[test]
    fn verifying_falls_back_to_signing_key() -> color_eyre::Result<()> {
        let private = Key::from_pem(test::rsa::PRIVATE_KEY)?;
        let public = Key::from_pem(test::rsa::PUBLIC_KEY)?;

        let keys = KeyMaterial::default().with_signing_key(private.clone());
        assert_eq!(keys.verifying_key(), Some(&private));

        let keys = keys.with_verifying_key(public.clone());
        assert_eq!(keys.verifying_key(), Some(&public));
        assert_eq!(keys.signing_key(), Some(&private));
        Ok(())
    }

    #[test]
    fn empty_material_is_unkeyed() {
        let keys = KeyMaterial::default();
        assert!(!keys.is_keyed());
        assert!(keys.verifying_key().is_none());
        assert!(KeyMaterial::new(None, Some(Key::from_secret(&b"k"[..]))).is_keyed());
    }

    #[tokio::test]
    async fn loads_both_slots() -> color_eyre::Result<()> {
        let private = KeySource::file(test::rsa::PRIVATE_KEY_PATH);
        let public = KeySource::literal(test::rsa::PUBLIC_KEY);

        let keys = KeyMaterial::load(Some(&private), Some(&public)).await?;
        assert!(keys.signing_key().map_or(false, Key::has_private_key));
        assert!(keys.verifying_key().map_or(false, |k| !k.has_private_key()));
        Ok(())
    }

    #[tokio::test]
    async fn first_error_wins() {
        let missing = KeySource::file(test::MISSING_PATH);
        let public = KeySource::literal(test::rsa::PUBLIC_KEY);

        let err = KeyMaterial::load(Some(&missing), Some(&public))
            .await
            .unwrap_err();
        assert!(matches!(err, error::KeyLoadError::Io { .. }));
    }
}
