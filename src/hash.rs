//! Hash primitives and the payload model used for content hashing.

use std::fmt;
use std::fmt::Debug;
use std::io::Read;

use bytes::Bytes;
use hmac::Hmac;
use hmac::Mac;
use sha2::Digest;
use sha2::Sha256;

use crate::{Error, Result};

/// Hex encoded SHA256 digest of zero bytes, the content hash of an absent
/// or empty payload.
pub const EMPTY_STRING_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Chunk size used when hashing a streaming payload.
const STREAM_CHUNK_SIZE: usize = 16 * 1024;

/// Hex encoded SHA256 hash.
///
/// Use this function instead of `hex::encode(sha256(content))` can reduce
/// extra copy.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content).as_slice())
}

/// HMAC with SHA256 hash.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> Vec<u8> {
    // SAFETY: HMAC's new_from_slice always returns Ok - it handles any key length
    let mut h = Hmac::<Sha256>::new_from_slice(key).unwrap();
    h.update(content);

    h.finalize().into_bytes().to_vec()
}

/// Hex encoded HMAC with SHA256 hash.
///
/// Use this function instead of `hex::encode(hmac_sha256(key, content))` can
/// reduce extra copy.
pub fn hex_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    // SAFETY: HMAC's new_from_slice always returns Ok - it handles any key length
    let mut h = Hmac::<Sha256>::new_from_slice(key).unwrap();
    h.update(content);

    hex::encode(h.finalize().into_bytes())
}

/// Payload of a signable request.
///
/// `Reader` hashing is single-pass and destructive: [`hash_payload`] takes
/// the payload by value and drives the stream to its end, so a stream can
/// never be hashed twice. Callers that need the bytes again must buffer
/// them externally and use [`Payload::Bytes`].
#[derive(Default)]
pub enum Payload {
    /// No payload.
    #[default]
    Empty,
    /// In-memory payload bytes. Strings hash as their UTF-8 bytes.
    Bytes(Bytes),
    /// A finite byte stream, hashed incrementally in bounded chunks.
    Reader(Box<dyn Read + Send>),
    /// A content hash the caller computed ahead of time. Signing uses it
    /// verbatim instead of hashing.
    Precomputed(String),
    /// Explicit opt-out of payload hashing, signed as `UNSIGNED-PAYLOAD`.
    Unsigned,
}

impl Payload {
    /// Wrap a finite byte stream.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Name of the payload kind, used in diagnostics.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Bytes(_) => "bytes",
            Payload::Reader(_) => "reader",
            Payload::Precomputed(_) => "precomputed",
            Payload::Unsigned => "unsigned",
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Bytes(b) => f.debug_struct("Bytes").field("length", &b.len()).finish(),
            Payload::Reader(_) => f.write_str("Reader"),
            Payload::Precomputed(v) => f.debug_tuple("Precomputed").field(v).finish(),
            Payload::Unsigned => f.write_str("Unsigned"),
        }
    }
}

/// Compute the hex encoded SHA256 content hash of a payload.
///
/// Accepts an absent payload (hashes to [`EMPTY_STRING_SHA256`]), in-memory
/// bytes, or a finite byte stream consumed in bounded chunks without
/// buffering it whole. Every returned digest is 64 lowercase hex characters.
/// Other payload kinds are not hashable inputs and fail with
/// [`crate::ErrorKind::PayloadUnsupported`].
pub fn hash_payload(payload: Payload) -> Result<String> {
    match payload {
        Payload::Empty => Ok(EMPTY_STRING_SHA256.to_string()),
        Payload::Bytes(b) => Ok(hex_sha256(&b)),
        Payload::Reader(mut reader) => {
            let mut hasher = Sha256::new();
            let mut buf = [0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hex::encode(hasher.finalize().as_slice()))
        }
        other => Err(Error::payload_unsupported(format!(
            "payload kind {} is not a hashable input",
            other.kind()
        ))),
    }
}
