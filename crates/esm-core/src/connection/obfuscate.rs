//! Password obfuscation for the connections file
//!
//! Passwords are base64-encoded before they are written and decoded after
//! they are read. This only keeps them from being readable at a glance; it is
//! not encryption and anyone with the file can recover them.
//!
//! Values that do not decode to UTF-8 text are returned unchanged, so files
//! written by hand with plaintext passwords keep working. The same rule means a
//! corrupted value is indistinguishable from a plaintext one, which is why the
//! fallback logs a warning.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode a password for storage
#[must_use]
pub fn obfuscate(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

/// Decode a stored password, passing undecodable values through as plaintext
#[must_use]
pub fn reveal(stored: &str) -> String {
    match STANDARD.decode(stored.trim()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(plain) => plain,
            Err(_) => {
                tracing::warn!("stored password is not valid UTF-8 after decoding, treating it as plaintext");
                stored.to_string()
            }
        },
        Err(err) => {
            tracing::warn!(error = %err, "stored password is not base64, treating it as plaintext");
            stored.to_string()
        }
    }
}
