//! Destination references for contact-addressed commands.

use crate::error::DestinationError;
use crate::types::{Contact, PublicKey};

/// A caller-supplied reference to a remote contact.
#[derive(Debug, Clone, Copy)]
pub enum Destination<'a> {
    /// Raw key bytes (a full key or a long enough prefix).
    Key(&'a [u8]),
    /// Hex encoding of the key.
    Hex(&'a str),
    /// A decoded contact record.
    Contact(&'a Contact),
    /// A JSON contact record carrying a `public_key` hex field.
    Record(&'a serde_json::Value),
}

impl Destination<'_> {
    /// Reduce the reference to the first `prefix_len` key bytes.
    ///
    /// Fails instead of padding when fewer bytes are available.
    pub fn normalize(&self, prefix_len: usize) -> Result<Vec<u8>, DestinationError> {
        let key = match self {
            Destination::Key(bytes) => bytes.to_vec(),
            Destination::Hex(s) => {
                hex::decode(s).map_err(|_| DestinationError::InvalidHex((*s).to_owned()))?
            }
            Destination::Contact(contact) => contact.public_key.0.to_vec(),
            Destination::Record(record) => {
                let field = record
                    .get("public_key")
                    .ok_or(DestinationError::MissingPublicKey)?;
                let s = field
                    .as_str()
                    .ok_or_else(|| DestinationError::InvalidRecordKey(field.to_string()))?;
                hex::decode(s).map_err(|_| DestinationError::InvalidRecordKey(s.to_owned()))?
            }
        };

        if key.len() < prefix_len {
            return Err(DestinationError::KeyTooShort {
                expected: prefix_len,
                actual: key.len(),
            });
        }
        Ok(key[..prefix_len].to_vec())
    }
}

impl<'a> From<&'a [u8]> for Destination<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Destination::Key(bytes)
    }
}

impl<'a> From<&'a PublicKey> for Destination<'a> {
    fn from(key: &'a PublicKey) -> Self {
        Destination::Key(&key.0)
    }
}

impl<'a> From<&'a str> for Destination<'a> {
    fn from(s: &'a str) -> Self {
        Destination::Hex(s)
    }
}

impl<'a> From<&'a String> for Destination<'a> {
    fn from(s: &'a String) -> Self {
        Destination::Hex(s)
    }
}

impl<'a> From<&'a Contact> for Destination<'a> {
    fn from(contact: &'a Contact) -> Self {
        Destination::Contact(contact)
    }
}

impl<'a> From<&'a serde_json::Value> for Destination<'a> {
    fn from(record: &'a serde_json::Value) -> Self {
        Destination::Record(record)
    }
}
