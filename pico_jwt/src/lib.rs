//! Compact signed JSON Web Tokens
//!
//! This crate creates and verifies tokens in the compact JSON Web Token
//! format, signed with one of:
//!
//! * HMAC: `HS256`, `HS384`, `HS512`
//! * RSASSA-PKCS1-v1_5: `RS256`, `RS384`, `RS512`
//! * RSASSA-PSS: `PS256`, `PS384`, `PS512`
//! * ECDSA: `ES256`, `ES384`, `ES512`
//!
//! Only the token structure and its signature are checked. Claims such as
//! `exp`, `iss`, or `aud` are left to the caller.
//!
//! See [RFC7515][] for signatures, [RFC7518][] for the algorithms, and
//! [RFC7519][] for the token format.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use pico_jwt::{jws, jwt::Headers, Engine, JwtRef, KeyMaterial};
//! use serde_json::json;
//!
//! let engine = Engine::new(jws::Algorithm::HS256)
//!     .with_keys(KeyMaterial::secret("secret123".as_bytes()));
//!
//! let token = engine.create(&json!({"hello": "world"})).unwrap();
//! assert_eq!(
//!     token.as_str(),
//!     concat!(
//!         "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9.",
//!         "eyJoZWxsbyI6IndvcmxkIn0.",
//!         "pe233CdfCuOwFxw8O4nostPdxcvcIJxQpmprMYZmN0c",
//!     ),
//! );
//!
//! assert!(engine.verify(&token));
//! assert!(!engine.verify(JwtRef::from_str("not.a.token")));
//!
//! let headers: Headers = engine.header(&token).unwrap();
//! assert_eq!(headers.algorithm().unwrap(), jws::Algorithm::HS256);
//! ```
//!
//! Keys can also be loaded from PEM files, or built from an
//! [`EngineConfig`]:
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use pico_jwt::{jws, EngineConfig, KeySource};
//!
//! let engine = EngineConfig::new(jws::Algorithm::RS256)
//!     .with_private_key(KeySource::file("/etc/tokens/private.pem"))
//!     .with_public_key(KeySource::file("/etc/tokens/public.pem"))
//!     .build()
//!     .await?;
//! # let _ = engine;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod config;
mod engine;
pub mod error;
pub mod jwa;
pub mod jws;
pub mod jwt;
mod key;
mod source;


#[doc(inline)]
pub use config::EngineConfig;
#[doc(inline)]
pub use engine::Engine;
#[doc(inline)]
pub use jwt::{Headers, Jwt, JwtRef};
#[doc(inline)]
pub use key::{Key, KeyMaterial};
#[doc(inline)]
pub use source::KeySource;
