//! Username/password pair encoding
//!
//! Current layout: `0x01 || u32_be(username_len) || username || password`.
//! Plaintexts that do not start with the format tag are legacy
//! `username:password` strings and are split on the first `:` only.

use zeroize::Zeroizing;

use crate::error::{GhostpassError, Result};

/// Leading byte of a length-prefixed pair
pub const FORMAT_LENGTH_PREFIXED: u8 = 0x01;

/// Separator used by legacy pair plaintexts
pub const LEGACY_SEPARATOR: u8 = b':';

const LEN_PREFIX: usize = 4;

/// A decoded credential pair. Both strings are wiped on drop.
pub struct DecodedPair {
    pub username: Zeroizing<String>,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for DecodedPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedPair")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Encode a pair into a wipe-on-drop buffer
pub fn encode_pair(username: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let username_len = u32::try_from(username.len())
        .map_err(|_| GhostpassError::InvalidInput("username too long".to_string()))?;

    let mut out = Zeroizing::new(Vec::with_capacity(
        1 + LEN_PREFIX + username.len() + password.len(),
    ));
    out.push(FORMAT_LENGTH_PREFIXED);
    out.extend_from_slice(&username_len.to_be_bytes());
    out.extend_from_slice(username);
    out.extend_from_slice(password);
    Ok(out)
}

/// Encode in the legacy `username:password` form, as older stores did.
/// The username must not contain the separator.
#[cfg(test)]
fn encode_legacy_pair(username: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if username.contains(&LEGACY_SEPARATOR) {
        return Err(GhostpassError::InvalidInput(
            "username contains the ':' separator".to_string(),
        ));
    }

    let mut out = Zeroizing::new(Vec::with_capacity(username.len() + 1 + password.len()));
    out.extend_from_slice(username);
    out.push(LEGACY_SEPARATOR);
    out.extend_from_slice(password);
    Ok(out)
}

/// Split a pair plaintext into its username and password components
pub fn decode_pair(plaintext: &[u8]) -> Result<DecodedPair> {
    let (username, password) = match plaintext.first() {
        Some(&FORMAT_LENGTH_PREFIXED) => split_length_prefixed(&plaintext[1..])?,
        _ => split_legacy(plaintext)?,
    };

    Ok(DecodedPair {
        username: Zeroizing::new(to_utf8(username, "username")?),
        password: Zeroizing::new(to_utf8(password, "password")?),
    })
}

fn split_length_prefixed(body: &[u8]) -> Result<(&[u8], &[u8])> {
    if body.len() < LEN_PREFIX {
        return Err(GhostpassError::MalformedPlaintext(
            "missing username length prefix".to_string(),
        ));
    }

    let (len_bytes, rest) = body.split_at(LEN_PREFIX);
    let mut prefix = [0u8; LEN_PREFIX];
    prefix.copy_from_slice(len_bytes);
    let username_len = u32::from_be_bytes(prefix) as usize;

    if username_len > rest.len() {
        return Err(GhostpassError::MalformedPlaintext(format!(
            "username length {} exceeds remaining {} bytes",
            username_len,
            rest.len()
        )));
    }

    Ok(rest.split_at(username_len))
}

fn split_legacy(plaintext: &[u8]) -> Result<(&[u8], &[u8])> {
    let sep = plaintext
        .iter()
        .position(|&b| b == LEGACY_SEPARATOR)
        .ok_or_else(|| {
            GhostpassError::MalformedPlaintext("no ':' separator in plaintext".to_string())
        })?;

    Ok((&plaintext[..sep], &plaintext[sep + 1..]))
}

fn to_utf8(bytes: &[u8], what: &str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| GhostpassError::MalformedPlaintext(format!("{} is not valid UTF-8", what)))
}
