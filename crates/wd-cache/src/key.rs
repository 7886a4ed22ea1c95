//! Cache key derivation.

use sha1::{Digest, Sha1};
use wd_document::Format;

/// Derive the cache key for `data` converted to `format`.
///
/// Hex SHA-1 over the document bytes, then the format token, then `secret`.
/// The input order is part of the on-disk format and must not change.
#[must_use]
pub fn key_for(data: &[u8], format: Format, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.update(format.extension().as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
