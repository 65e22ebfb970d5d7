//! Byte buffers that are represented as unpadded, URL-safe base64
//!
//! Compact tokens carry every segment in the URL-safe base64 alphabet
//! without `=` padding. The [`Base64Url`][] and [`Base64UrlRef`][] types
//! wrap owned and borrowed byte buffers that encode that way whenever they are
//! displayed or serialized.
//!
//! Underlying data is stored as raw bytes. The cost of conversion is only
//! paid by [`Base64Url::from_encoded()`] and when the value is formatted.
//!
//! Decoding is lenient about padding: both `aGk` and `aGk=` decode to `hi`.
//! It is strict about everything else. Characters outside the URL-safe
//! alphabet and non-canonical trailing bits are rejected with
//! [`InvalidBase64Data`].
//!
//! The underlying encoding/decoding mechanism is provided by the [`base64`][]
//! crate.
//!
//!   [`base64`]: https://docs.rs/base64
//!
//! # Example
//!
//! ```
//! use pico_jwt_base64::Base64Url;
//!
//! let data = Base64Url::from_raw(r#"{"typ":"JWT","alg":"HS256"}"#);
//! assert_eq!(data.to_string(), "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9");
//!
//! let decoded = Base64Url::from_encoded("eyJoZWxsbyI6IndvcmxkIn0").unwrap();
//! assert_eq!(decoded.as_slice(), br#"{"hello":"world"}"#);
//! ```
//!
//! Debug output fences the encoded value in backticks:
//!
//! ```
//! use pico_jwt_base64::Base64Url;
//!
//! let data = Base64Url::from_raw(vec![0xfb, 0xff]);
//! assert_eq!(format!("{:?}", data), "`-_8`");
//! ```
//!
//! # Unsafe code
//!
//! [`Base64UrlRef`] is a `#[repr(transparent)]` wrapper around `[u8]`, and
//! reinterpreting a borrowed slice as that type needs two small `unsafe`
//! blocks. Nothing else in the crate is unsafe, so the crate uses
//! `#![deny(unsafe_code)]` with a local allow on those two functions.
//!
//! # Serde
//!
//! With the `serde` feature enabled, the wrappers serialize as base64url
//! strings and deserialize from them.

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
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{borrow::Borrow, error::Error, fmt, ops};

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig},
        DecodePaddingMode,
    },
    Engine as _,
};

/// URL-safe alphabet, never pads on encode, accepts either form on decode
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An error while decoding a value which is not properly formatted
/// base64url data
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidBase64Data {
    source: base64::DecodeError,
}

impl From<base64::DecodeError> for InvalidBase64Data {
    fn from(err: base64::DecodeError) -> Self {
        Self { source: err }
    }
}

impl fmt::Display for InvalidBase64Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid base64url data")
    }
}

impl Error for InvalidBase64Data {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Owned data to be encoded as URL-safe base64 (no padding)
///
/// Encoding alphabet: `A`–`Z`, `a`–`z`, `0`–`9`, `-`, `_`
///
/// Implementations of the [`From`] trait assume that the underlying
/// structure is in raw form.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
#[repr(transparent)]
#[must_use]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Creates an empty buffer
    #[inline]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a new buffer from an owned value
    ///
    /// This function has no cost for [`Vec<u8>`]. Other types incur
    /// the cost of copying into a buffer.
    ///
    /// To decode a base64url-encoded buffer, use [`from_encoded()`][Self::from_encoded()].
    #[inline]
    pub fn from_raw<T: Into<Vec<u8>>>(raw: T) -> Self {
        Self(raw.into())
    }

    /// Decodes a base64url-encoded value into a new owned buffer
    ///
    /// Padding is optional.
    ///
    /// # Errors
    ///
    /// The input contains characters outside of the URL-safe alphabet,
    /// has an impossible length, or has non-zero trailing bits.
    pub fn from_encoded<T: AsRef<[u8]>>(enc: T) -> Result<Self, InvalidBase64Data> {
        let data = URL_SAFE_LENIENT.decode(enc)?;
        Ok(Self(data))
    }

    /// Unwraps the underlying buffer
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Calculates the length of the unpadded encoding for a buffer of size `len`
    #[inline]
    #[must_use]
    pub const fn calc_encoded_len(len: usize) -> usize {
        let d = len / 3 * 4;
        match len % 3 {
            0 => d,
            m => d + m + 1,
        }
    }
}

impl From<Vec<u8>> for Base64Url {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl From<&'_ [u8]> for Base64Url {
    #[inline]
    fn from(slice: &[u8]) -> Self {
        Self::from_raw(slice)
    }
}

impl From<&'_ Base64UrlRef> for Base64Url {
    #[inline]
    fn from(val: &Base64UrlRef) -> Self {
        val.to_owned()
    }
}

impl From<Base64Url> for Vec<u8> {
    #[inline]
    fn from(val: Base64Url) -> Self {
        val.0
    }
}

impl<'a> From<&'a [u8]> for &'a Base64UrlRef {
    #[inline]
    fn from(slice: &'a [u8]) -> Self {
        Base64UrlRef::from_slice(slice)
    }
}

impl Borrow<Base64UrlRef> for Base64Url {
    #[inline]
    fn borrow(&self) -> &Base64UrlRef {
        self
    }
}

impl ops::Deref for Base64Url {
    type Target = Base64UrlRef;

    #[inline]
    fn deref(&self) -> &Self::Target {
        Base64UrlRef::from_slice(self.0.as_slice())
    }
}

impl ops::DerefMut for Base64Url {
    #[inline]
    fn deref_mut(&mut self) -> &mut Base64UrlRef {
        Base64UrlRef::from_mut_slice(self.0.as_mut_slice())
    }
}

impl AsRef<Base64UrlRef> for Base64Url {
    #[inline]
    fn as_ref(&self) -> &Base64UrlRef {
        self
    }
}

impl fmt::Display for Base64Url {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl fmt::Debug for Base64Url {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Borrowed data to be encoded as URL-safe base64 (no padding)
///
/// Encoding alphabet: `A`–`Z`, `a`–`z`, `0`–`9`, `-`, `_`
#[derive(Hash, PartialEq, Eq)]
#[repr(transparent)]
pub struct Base64UrlRef([u8]);

impl Base64UrlRef {
    /// Transparently reinterprets the slice as base64url
    #[allow(unsafe_code)]
    #[inline]
    #[must_use]
    pub fn from_slice(raw: &[u8]) -> &Self {
        let ptr: *const [u8] = raw;

        // `Base64UrlRef` is a transparent wrapper around `[u8]`
        unsafe { &*(ptr as *const Self) }
    }

    /// Transparently reinterprets the mutable slice as base64url
    #[allow(unsafe_code)]
    #[inline]
    #[must_use]
    pub fn from_mut_slice(raw: &mut [u8]) -> &mut Self {
        let ptr: *mut [u8] = raw;

        // `Base64UrlRef` is a transparent wrapper around `[u8]`
        unsafe { &mut *(ptr as *mut Self) }
    }

    /// Calculates the length of the unpadded encoding of this buffer
    #[inline]
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        Base64Url::calc_encoded_len(self.0.len())
    }

    /// Provides access to the underlying slice
    #[inline]
    #[must_use]
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Provides mutable access to the underlying slice
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl ToOwned for Base64UrlRef {
    type Owned = Base64Url;

    #[inline]
    fn to_owned(&self) -> Self::Owned {
        Base64Url(self.0.to_owned())
    }
}

impl PartialEq<Base64UrlRef> for Base64Url {
    #[inline]
    fn eq(&self, other: &Base64UrlRef) -> bool {
        self.0 == other.0
    }
}

impl PartialEq<Base64Url> for Base64UrlRef {
    #[inline]
    fn eq(&self, other: &Base64Url) -> bool {
        self.0 == *other.0
    }
}

impl fmt::Display for Base64UrlRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&URL_SAFE_LENIENT.encode(&self.0))
    }
}

impl fmt::Debug for Base64UrlRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", URL_SAFE_LENIENT.encode(&self.0))
    }
}

/// Serialize the underlying byte array as a base64url string
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl serde::Serialize for Base64UrlRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_LENIENT.encode(&self.0))
    }
}

/// Serialize the underlying byte array as a base64url string
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl serde::Serialize for Base64Url {
    #[inline]
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&**self, serializer)
    }
}

/// Deserialize a base64url string and decode it into a byte array
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> serde::Deserialize<'de> for Base64Url {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_encoded(encoded).map_err(serde::de::Error::custom)
    }
}
