//! Token creation and verification with a fixed set of keys

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error,
    jws::{self, Verifier},
    jwt::{Decomposed, Headers, Jwt, JwtRef, TOKEN_TYPE},
    key::KeyMaterial,
    source::KeySource,
};

/// Creates and verifies tokens
///
/// An engine holds a default signing algorithm and the key material used for
/// signing and verifying. Without keys it can still decode headers and
/// payloads, but it cannot create or verify tokens.
///
/// ```
/// use pico_jwt::{jws, Engine, KeyMaterial};
/// use serde_json::json;
///
/// let engine = Engine::new(jws::Algorithm::HS256)
///     .with_keys(KeyMaterial::secret("secret123".as_bytes()));
///
/// let token = engine.create(&json!({"hello": "world"})).unwrap();
/// assert!(engine.verify(&token));
///
/// let payload: serde_json::Value = engine.payload(&token).unwrap();
/// assert_eq!(payload["hello"], "world");
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct Engine {
    algorithm: jws::Algorithm,
    keys: KeyMaterial,
}

impl Engine {
    /// An unkeyed engine signing with `algorithm` by default
    pub fn new(algorithm: jws::Algorithm) -> Self {
        Self {
            algorithm,
            keys: KeyMaterial::default(),
        }
    }

    /// Replaces the key material
    pub fn with_keys(mut self, keys: KeyMaterial) -> Self {
        self.keys = keys;
        self
    }

    /// Loads the private and public key slots from their sources
    ///
    /// Both sources are resolved concurrently. The engine's keys are only
    /// replaced once both have loaded successfully.
    ///
    /// # Errors
    ///
    /// Either source cannot be read or does not hold a usable key.
    pub async fn load_keys(
        &mut self,
        private: Option<&KeySource>,
        public: Option<&KeySource>,
    ) -> Result<(), error::KeyLoadError> {
        self.keys = KeyMaterial::load(private, public).await?;
        Ok(())
    }

    /// The default signing algorithm
    #[must_use]
    pub fn algorithm(&self) -> jws::Algorithm {
        self.algorithm
    }

    /// The held key material
    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Whether any key material is held
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.keys.is_keyed()
    }

    /// Creates a token signed with the default algorithm
    ///
    /// # Errors
    ///
    /// See [`Engine::create_with_headers()`].
    pub fn create<P>(&self, payload: &P) -> Result<Jwt, error::JwtSigningError>
    where
        P: Serialize + ?Sized,
    {
        self.create_with_headers(payload, Headers::empty())
    }

    /// Creates a token with additional header fields
    ///
    /// The header starts as `{"typ":"JWT","alg":<default>}` and every field in
    /// `overrides` replaces or extends it. Overriding `alg` signs this token
    /// with a different algorithm.
    ///
    /// ```
    /// use pico_jwt::{jws, jwt::Headers, Engine, KeyMaterial};
    /// use serde_json::json;
    ///
    /// let engine = Engine::new(jws::Algorithm::HS256)
    ///     .with_keys(KeyMaterial::secret("secret123".as_bytes()));
    ///
    /// let token = engine
    ///     .create_with_headers(&json!({}), Headers::empty().with_key_id("ab1"))
    ///     .unwrap();
    ///
    /// let headers = engine.header(&token).unwrap();
    /// assert_eq!(headers.kid(), Some("ab1"));
    /// ```
    ///
    /// # Errors
    ///
    /// * No signing key is held, or the key holds no private half.
    /// * The header names an algorithm that is unknown or that the key
    ///   cannot sign with.
    /// * The header or payload could not be serialized.
    pub fn create_with_headers<P>(
        &self,
        payload: &P,
        overrides: Headers,
    ) -> Result<Jwt, error::JwtSigningError>
    where
        P: Serialize + ?Sized,
    {
        let headers = Headers::new(self.algorithm).merge(overrides);
        let key = self
            .keys
            .signing_key()
            .ok_or_else(error::missing_private_key)?;

        Jwt::try_from_parts_with_signature(&headers, payload, key)
    }

    /// Decodes the header of a token without verifying it
    ///
    /// Returns `None` if the header segment cannot be decoded.
    #[must_use]
    pub fn header(&self, token: &JwtRef) -> Option<Headers> {
        match token.decode_header() {
            Ok(headers) => Some(headers),
            Err(err) => {
                tracing::debug!(error = %err, "unable to decode token header");
                None
            }
        }
    }

    /// Decodes the payload of a token without verifying it
    ///
    /// Returns `None` if the payload segment cannot be decoded into `P`.
    #[must_use]
    pub fn payload<P>(&self, token: &JwtRef) -> Option<P>
    where
        P: DeserializeOwned,
    {
        match token.decode_payload() {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::debug!(error = %err, "unable to decode token payload");
                None
            }
        }
    }

    /// Checks the structure, header, and signature of a token
    ///
    /// A `typ` header is optional, but when present it must be `JWT`. The
    /// signature is checked with the verifying key, or with the signing key
    /// when no separate verifying key is held.
    ///
    /// # Errors
    ///
    /// The reason the token was rejected.
    pub fn check(&self, token: &JwtRef) -> Result<(), error::JwtVerifyError> {
        let decomposed: Decomposed = token.decompose()?;
        let headers = decomposed.header();

        headers.check_type(TOKEN_TYPE)?;
        let alg = headers.algorithm()?;

        let key = self
            .keys
            .verifying_key()
            .ok_or_else(error::missing_verification_key)?;

        key.verify(
            alg,
            decomposed.signing_input().as_bytes(),
            decomposed.signature().as_slice(),
        )?;

        Ok(())
    }

    /// Whether a token is well-formed and carries a valid signature
    ///
    /// Never fails. Rejections are logged at `debug` level with their reason.
    #[must_use]
    pub fn verify(&self, token: &JwtRef) -> bool {
        match self.check(token) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "token rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pico_jwt_base64::Base64Url;
    use serde_json::{json, Value};
    use tracing_test::traced_test;

    use super::*;
    use crate::{jwa, jwt::Segment, test, Key};

    fn hmac_engine(alg: jws::Algorithm) -> Engine {
        Engine::new(alg).with_keys(KeyMaterial::secret(test::hmac::SECRET.as_bytes()))
    }

    fn keyed_engine(alg: jws::Algorithm) -> color_eyre::Result<Engine> {
        let pem = match alg.family() {
            jws::Family::Hmac => return Ok(hmac_engine(alg)),
            jws::Family::RsaPkcs1 | jws::Family::RsaPss => test::rsa::PRIVATE_KEY,
            jws::Family::Ecdsa => match alg {
                jws::Algorithm::ES256 => test::ec::P256_PRIVATE_KEY,
                jws::Algorithm::ES384 => test::ec::P384_PRIVATE_KEY,
                _ => test::ec::P521_PRIVATE_KEY,
            },
        };

        Ok(Engine::new(alg).with_keys(KeyMaterial::default().with_signing_key(Key::from_pem(pem)?)))
    }

    fn public_engine(alg: jws::Algorithm) -> color_eyre::Result<Engine> {
        let pem = match alg {
            jws::Algorithm::ES256 => test::ec::P256_PUBLIC_KEY,
            jws::Algorithm::ES384 => test::ec::P384_PUBLIC_KEY,
            jws::Algorithm::ES512 => test::ec::P521_PUBLIC_KEY,
            _ => test::rsa::PUBLIC_KEY,
        };

        Ok(Engine::new(alg).with_keys(KeyMaterial::default().with_verifying_key(Key::from_pem(pem)?)))
    }

    #[test]
    fn creates_known_hs256_token() -> color_eyre::Result<()> {
        let engine = hmac_engine(jws::Algorithm::HS256);
        let token = engine.create(&json!({"hello": "world"}))?;

        assert_eq!(token.as_str(), test::HS256_TOKEN);
        assert_eq!(token.segment(Segment::Signature), test::HS256_SIGNATURE);
        assert_eq!(
            serde_json::to_value(engine.header(&token))?,
            json!({"typ": "JWT", "alg": "HS256"})
        );
        assert!(engine.verify(&token));
        Ok(())
    }

    #[test]
    fn creates_known_rs256_token() -> color_eyre::Result<()> {
        let engine = keyed_engine(jws::Algorithm::RS256)?;
        let token = engine.create(&json!({"hello": "world"}))?;

        assert_eq!(
            token.as_str(),
            format!("{}.{}", test::RS256_SIGNING_INPUT, test::RS256_SIGNATURE)
        );
        assert!(public_engine(jws::Algorithm::RS256)?.verify(&token));
        Ok(())
    }

    #[test]
    fn verifies_known_es256_token() -> color_eyre::Result<()> {
        let token = Jwt::new(format!(
            "{}.{}",
            test::ES256_SIGNING_INPUT,
            test::ES256_SIGNATURE
        ));
        assert!(public_engine(jws::Algorithm::ES256)?.verify(&token));
        Ok(())
    }

    #[test]
    fn every_algorithm_round_trips() -> color_eyre::Result<()> {
        let payload = json!({"hello": "world", "n": [1, 2, 3]});

        for alg in jws::Algorithm::ALL {
            let engine = keyed_engine(alg)?;
            let token = engine.create(&payload)?;

            assert!(engine.verify(&token), "{alg} token did not verify");
            assert_eq!(engine.header(&token).map(|h| h.alg_name().map(String::from)), Some(Some(alg.to_string())));
            assert_eq!(engine.payload::<Value>(&token), Some(payload.clone()));

            if alg.family() != jws::Family::Hmac {
                assert!(
                    public_engine(alg)?.verify(&token),
                    "{alg} token did not verify with the public key"
                );
            }
        }

        Ok(())
    }

    #[test]
    fn any_bit_flip_invalidates_token() -> color_eyre::Result<()> {
        let engine = hmac_engine(jws::Algorithm::HS256);
        let token = engine.create(&json!({"hello": "world"}))?;
        let bytes = token.as_str().as_bytes();

        for idx in 0..bytes.len() {
            for bit in 0..8 {
                let mut tampered = bytes.to_vec();
                tampered[idx] ^= 1 << bit;

                if let Ok(tampered) = String::from_utf8(tampered) {
                    assert!(
                        !engine.verify(JwtRef::from_str(&tampered)),
                        "flipping bit {bit} of byte {idx} went unnoticed"
                    );
                }
            }
        }

        Ok(())
    }

    #[test]
    fn hmac_token_keyed_with_public_key_is_rejected() -> color_eyre::Result<()> {
        let forger = Engine::new(jws::Algorithm::HS256).with_keys(KeyMaterial::new(
            Some(Key::from_secret(test::rsa::PUBLIC_KEY.as_bytes())),
            None,
        ));
        let forged = forger.create(&json!({"admin": true}))?;

        let engine = public_engine(jws::Algorithm::RS256)?;
        assert!(!engine.verify(&forged));
        assert!(engine.check(&forged).unwrap_err().is_incompatible_alg());
        Ok(())
    }

    #[test]
    fn asymmetric_token_is_rejected_by_hmac_engine() -> color_eyre::Result<()> {
        let token = keyed_engine(jws::Algorithm::RS256)?.create(&json!({}))?;
        assert!(!hmac_engine(jws::Algorithm::HS256).verify(&token));

        let token = keyed_engine(jws::Algorithm::ES256)?.create(&json!({}))?;
        assert!(!hmac_engine(jws::Algorithm::HS256).verify(&token));
        Ok(())
    }

    #[test]
    fn token_from_other_key_is_rejected() -> color_eyre::Result<()> {
        let token = keyed_engine(jws::Algorithm::PS256)?.create(&json!({}))?;
        let other = Engine::new(jws::Algorithm::PS256).with_keys(
            KeyMaterial::default().with_verifying_key(Key::from_pem(test::rsa::OTHER_PUBLIC_KEY)?),
        );

        assert!(other.check(&token).unwrap_err().is_signature_mismatch());
        Ok(())
    }

    #[test]
    fn deterministic_algorithms_repeat() -> color_eyre::Result<()> {
        let payload = json!({"hello": "world"});

        for alg in [jws::Algorithm::HS384, jws::Algorithm::RS512] {
            let engine = keyed_engine(alg)?;
            assert_eq!(engine.create(&payload)?, engine.create(&payload)?);
        }

        Ok(())
    }

    #[test]
    fn randomized_algorithms_vary_but_verify() -> color_eyre::Result<()> {
        let payload = json!({"hello": "world"});

        for alg in [jws::Algorithm::PS256, jws::Algorithm::ES384] {
            let engine = keyed_engine(alg)?;
            let first = engine.create(&payload)?;
            let second = engine.create(&payload)?;

            assert_ne!(first, second);
            assert!(engine.verify(&first));
            assert!(engine.verify(&second));
        }

        Ok(())
    }

    #[test]
    fn non_tokens_decode_to_nothing() {
        let engine = hmac_engine(jws::Algorithm::HS256);

        for junk in ["", ".", "..", "no separators", "!!!.???.***"] {
            let token = JwtRef::from_str(junk);
            assert!(engine.header(token).is_none(), "{junk}");
            assert!(engine.payload::<Value>(token).is_none(), "{junk}");
            assert!(!engine.verify(token), "{junk}");
        }

        let token = JwtRef::from_str("e30.%%%.e30");
        assert!(engine.header(token).is_some());
        assert!(engine.payload::<Value>(token).is_none());
        assert!(!engine.verify(token));
    }

    #[test]
    fn payload_of_wrong_shape_is_none() -> color_eyre::Result<()> {
        #[derive(Debug, serde::Deserialize)]
        struct Claims {
            #[allow(dead_code)]
            sub: String,
        }

        let engine = hmac_engine(jws::Algorithm::HS256);
        let token = engine.create(&json!({"hello": "world"}))?;
        assert!(engine.payload::<Claims>(&token).is_none());
        Ok(())
    }

    #[test]
    fn wrong_type_is_rejected() -> color_eyre::Result<()> {
        let engine = hmac_engine(jws::Algorithm::HS256);
        let token = engine.create_with_headers(&json!({}), Headers::empty().with_type("JWE"))?;

        assert!(matches!(
            engine.check(&token),
            Err(error::JwtVerifyError::TypeMismatch(_))
        ));
        Ok(())
    }

    fn hand_signed(header: &str, payload: &str) -> color_eyre::Result<Jwt> {
        let input = format!(
            "{}.{}",
            Base64Url::from_raw(header),
            Base64Url::from_raw(payload),
        );
        let key = Key::from_secret(test::hmac::SECRET.as_bytes());
        let signature = jws::Signer::sign(&key, jws::Algorithm::HS256, input.as_bytes())?;
        Ok(Jwt::new(format!("{}.{}", input, Base64Url::from_raw(signature))))
    }

    #[test]
    fn null_type_is_rejected() -> color_eyre::Result<()> {
        let engine = hmac_engine(jws::Algorithm::HS256);

        for header in [
            r#"{"typ":null,"alg":"HS256"}"#,
            r#"{"typ":1,"alg":"HS256"}"#,
            r#"{"typ":["JWT"],"alg":"HS256"}"#,
        ] {
            let token = hand_signed(header, r#"{"a":1}"#)?;
            assert!(!engine.verify(&token), "{}", header);
            assert!(matches!(
                engine.check(&token),
                Err(error::JwtVerifyError::TypeMismatch(_))
            ));
        }

        let token = hand_signed(r#"{"typ":"JWT","alg":"HS256"}"#, r#"{"a":1}"#)?;
        assert!(engine.verify(&token));
        Ok(())
    }

    #[test]
    fn non_string_algorithm_is_unknown() -> color_eyre::Result<()> {
        let engine = hmac_engine(jws::Algorithm::HS256);
        let token = hand_signed(r#"{"typ":"JWT","alg":["HS256"]}"#, "{}")?;

        assert!(matches!(
            engine.check(&token),
            Err(error::JwtVerifyError::UnknownAlgorithm(_))
        ));
        Ok(())
    }

    #[test]
    fn missing_type_is_accepted() -> color_eyre::Result<()> {
        let key = Key::from_secret(test::hmac::SECRET.as_bytes());
        let token = Jwt::try_from_parts_with_signature(
            &Headers::empty().with_algorithm(jws::Algorithm::HS256),
            &json!({}),
            &key,
        )?;

        assert!(hmac_engine(jws::Algorithm::HS256).verify(&token));
        Ok(())
    }

    #[test]
    fn unknown_algorithm_fails_loudly_when_signing() {
        let engine = hmac_engine(jws::Algorithm::HS256);
        let err = engine
            .create_with_headers(&json!({}), Headers::empty().with_field("alg", "XS256"))
            .unwrap_err();

        assert!(matches!(err, error::JwtSigningError::UnknownAlgorithm(_)));
    }

    #[test]
    fn non_string_reserved_overrides_fail_when_signing() {
        let engine = hmac_engine(jws::Algorithm::HS256);

        let err = engine
            .create_with_headers(&json!({}), Headers::empty().with_field("alg", 256))
            .unwrap_err();
        assert!(matches!(err, error::JwtSigningError::UnknownAlgorithm(_)));

        let err = engine
            .create_with_headers(&json!({}), Headers::empty().with_field("typ", Value::Null))
            .unwrap_err();
        assert!(matches!(err, error::JwtSigningError::MalformedJwtHeader(_)));
    }

    #[test]
    fn unknown_algorithm_fails_quietly_when_verifying() {
        // {"typ":"JWT","alg":"none"}.{}.
        let token = JwtRef::from_str("eyJ0eXAiOiJKV1QiLCJhbGciOiJub25lIn0.e30.");
        let engine = hmac_engine(jws::Algorithm::HS256);

        assert!(!engine.verify(token));
        assert!(matches!(
            engine.check(token),
            Err(error::JwtVerifyError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn algorithm_can_be_overridden_per_token() -> color_eyre::Result<()> {
        let engine = hmac_engine(jws::Algorithm::HS256);
        let token = engine.create_with_headers(
            &json!({}),
            Headers::empty().with_algorithm(jws::Algorithm::HS512),
        )?;

        assert_eq!(
            engine.header(&token).map(|h| h.algorithm().ok()),
            Some(Some(jws::Algorithm::HS512))
        );
        assert!(engine.verify(&token));
        Ok(())
    }

    #[test]
    fn key_id_is_added_to_header() -> color_eyre::Result<()> {
        let engine = keyed_engine(jws::Algorithm::ES256)?;
        let token =
            engine.create_with_headers(&json!({"hello": "world"}), Headers::empty().with_key_id("ab1"))?;

        assert_eq!(
            serde_json::to_value(engine.header(&token))?,
            json!({"typ": "JWT", "alg": "ES256", "kid": "ab1"})
        );
        assert!(engine.verify(&token));
        Ok(())
    }

    #[test]
    fn unkeyed_engine_cannot_sign_or_verify() {
        let engine = Engine::new(jws::Algorithm::HS256);
        assert!(!engine.is_keyed());

        let err = engine.create(&json!({})).unwrap_err();
        assert!(matches!(
            err,
            error::JwtSigningError::SigningError(error::SigningError::MissingPrivateKey(_))
        ));

        let token = JwtRef::from_str(test::HS256_TOKEN);
        assert!(matches!(
            engine.check(token),
            Err(error::JwtVerifyError::MissingVerificationKey(_))
        ));
        assert!(engine.header(token).is_some());
    }

    #[test]
    fn public_only_engine_cannot_sign() -> color_eyre::Result<()> {
        let engine = public_engine(jws::Algorithm::RS256)?;
        assert!(engine.is_keyed());
        assert!(engine.create(&json!({})).is_err());

        let engine = Engine::new(jws::Algorithm::ES256).with_keys(
            KeyMaterial::default()
                .with_signing_key(jwa::EllipticCurve::public_key_from_pem(test::ec::P256_PUBLIC_KEY)?),
        );
        let err = engine.create(&json!({})).unwrap_err();
        assert!(matches!(
            err,
            error::JwtSigningError::SigningError(error::SigningError::MissingPrivateKey(_))
        ));
        Ok(())
    }

    #[test]
    fn signing_key_must_match_algorithm() -> color_eyre::Result<()> {
        let engine = keyed_engine(jws::Algorithm::ES256)?;
        let err = engine
            .create_with_headers(&json!({}), Headers::empty().with_algorithm(jws::Algorithm::ES384))
            .unwrap_err();

        assert!(matches!(
            err,
            error::JwtSigningError::SigningError(error::SigningError::IncompatibleAlgorithm(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn loads_keys_from_files() -> color_eyre::Result<()> {
        let mut engine = Engine::new(jws::Algorithm::RS256);
        engine
            .load_keys(
                Some(&KeySource::file(test::rsa::PRIVATE_KEY_PATH)),
                Some(&KeySource::file(test::rsa::PUBLIC_KEY_PATH)),
            )
            .await?;

        let token = engine.create(&json!({"hello": "world"}))?;
        assert!(engine.verify(&token));
        assert_eq!(token.segment(Segment::Signature), test::RS256_SIGNATURE);
        Ok(())
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_keys() {
        let mut engine = hmac_engine(jws::Algorithm::HS256);
        let err = engine
            .load_keys(Some(&KeySource::file(test::MISSING_PATH)), None)
            .await
            .unwrap_err();

        assert!(matches!(err, error::KeyLoadError::Io { .. }));
        assert!(engine.verify(JwtRef::from_str(test::HS256_TOKEN)));
    }

    #[test]
    #[traced_test]
    fn rejections_are_logged() {
        let engine = hmac_engine(jws::Algorithm::HS256);
        let mut token = test::HS256_TOKEN.to_owned();
        token.pop();
        token.push('d');

        assert!(!engine.verify(JwtRef::from_str(&token)));
        assert!(logs_contain("token rejected"));
    }

    #[test]
    #[traced_test]
    fn decode_failures_are_logged() {
        let engine = hmac_engine(jws::Algorithm::HS256);
        assert!(engine.header(JwtRef::from_str("%%%.e30.e30")).is_none());
        assert!(logs_contain("unable to decode token header"));
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
