// Key codec — textual server keys to canonical node identities
//
// Accepted forms:
//   <64 hex chars>
//   @<localpart>:<64 hex chars>
//
// `parse_server_key` is strict and reports why a key was rejected.
// `parse_key_list` is the best-effort batch form used by the relay
// directory: malformed tokens are dropped, never reported to the caller.

use super::{NodeIdentity, KEY_LENGTH};
use std::collections::HashSet;
use thiserror::Error;

/// Sigil that marks the compound form.
const COMPOUND_SIGIL: char = '@';

/// Separator between the localpart and the key in the compound form.
const COMPOUND_SEPARATOR: char = ':';

/// Delimiter between keys in a relay list.
pub const RELAY_LIST_DELIMITER: char = ',';

/// Number of hex characters in a canonical key.
const KEY_HEX_LENGTH: usize = KEY_LENGTH * 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Empty key")]
    Empty,
    #[error("Key is not valid hex")]
    InvalidHex,
    #[error("Invalid key length: expected {expected} hex chars, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Parse a server key in bare or compound form.
///
/// Only input starting with `@` is treated as compound: everything up to and
/// including its first `:` is discarded. Anything else is parsed whole, so
/// `foo:<key>` is rejected. The remainder must be exactly 64 hex characters.
pub fn parse_server_key(text: &str) -> Result<NodeIdentity, KeyError> {
    let candidate = match text.split_once(COMPOUND_SEPARATOR) {
        Some((_localpart, key)) if text.starts_with(COMPOUND_SIGIL) => key,
        _ => text,
    };

    if candidate.is_empty() {
        return Err(KeyError::Empty);
    }
    if candidate.len() != KEY_HEX_LENGTH {
        return Err(KeyError::InvalidLength {
            expected: KEY_HEX_LENGTH,
            actual: candidate.len(),
        });
    }

    let mut bytes = [0u8; KEY_LENGTH];
    hex::decode_to_slice(candidate, &mut bytes).map_err(|_| KeyError::InvalidHex)?;
    Ok(NodeIdentity::from_bytes(bytes))
}

/// Parse a comma-separated key list, keeping only the tokens that pass
/// [`parse_server_key`]. Duplicates collapse.
pub fn parse_key_list(list: &str) -> HashSet<NodeIdentity> {
    list.split(RELAY_LIST_DELIMITER)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match parse_server_key(token) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::debug!("Dropping relay key {:?}: {}", token, e);
                None
            }
        })
        .collect()
}

/// Join identities into the external comma-separated form.
pub fn join_keys<I>(keys: I) -> String
where
    I: IntoIterator<Item = NodeIdentity>,
{
    keys.into_iter()
        .map(|key| key.to_hex())
        .collect::<Vec<_>>()
        .join(&RELAY_LIST_DELIMITER.to_string())
}


// ---------------------------------------------------------------------------
// Property tests (proptest)
// ---------------------------------------------------------------------------
