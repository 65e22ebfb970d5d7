//! Key families and their signature algorithms
//!
//! Each family pairs a key type with the algorithms it can produce and check.
//! The algorithm definitions follow [RFC7518][].
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

pub mod ec;
pub mod hmac;
pub mod rsa;

#[doc(inline)]
pub use ec::EllipticCurve;
#[doc(inline)]
pub use hmac::Hmac;
#[doc(inline)]
pub use rsa::Rsa;
