//! # Notarization Signer Slots
//!
//! A notarization request names its signers in a fixed-width text field:
//! exactly M slots of two ASCII characters each, `"00"` to `"63"` for a
//! signer index or `"-1"` for an empty slot, concatenated without delimiter.
//!
//! ```text
//! "0312-1-1..."  =>  [Some(3), Some(12), None, None, ...]
//! ```

use crate::domain::outcome::SignerViolation;
use std::collections::HashSet;

/// Token for an empty slot.
pub const ABSENT_TOKEN: &str = "-1";

/// Highest signer index.
pub const MAX_SIGNER_INDEX: u8 = 63;

const SLOT_WIDTH: usize = 2;

/// Decoded signer slots of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerSlots(Vec<Option<u8>>);

impl SignerSlots {
    /// Build from already-decoded slots.
    pub fn from_slots(slots: Vec<Option<u8>>) -> Self {
        Self(slots)
    }

    /// Decode the text form, requiring exactly `slot_count` slots.
    pub fn decode(text: &str, slot_count: usize) -> Result<Self, SignerViolation> {
        let bytes = text.as_bytes();
        let expected = slot_count * SLOT_WIDTH;
        if bytes.len() != expected {
            return Err(SignerViolation::BadLength {
                expected,
                actual: bytes.len(),
            });
        }

        bytes
            .chunks(SLOT_WIDTH)
            .enumerate()
            .map(|(slot, chunk)| decode_slot(slot, chunk))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Encode back to the text form.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|slot| match slot {
                Some(index) => format!("{:02}", index),
                None => ABSENT_TOKEN.to_string(),
            })
            .collect()
    }

    /// Slots in order.
    pub fn slots(&self) -> &[Option<u8>] {
        &self.0
    }

    /// Number of filled slots.
    pub fn present_count(&self) -> usize {
        self.0.iter().flatten().count()
    }

    /// Last filled slot in scan order.
    pub fn last_present(&self) -> Option<u8> {
        self.0.iter().rev().flatten().next().copied()
    }

    /// Check the slots against the asserted count and the extra-field index.
    ///
    /// The extra-field index must name the last filled slot: each partial
    /// signature appends its signer to the slots of the request it extends.
    pub fn check_consistency(
        &self,
        sig_count: u8,
        extra_index: Option<u8>,
    ) -> Result<(), SignerViolation> {
        let present = self.present_count();
        if present != sig_count as usize {
            return Err(SignerViolation::CountMismatch {
                asserted: sig_count,
                present,
            });
        }

        let mut seen = HashSet::with_capacity(present);
        for index in self.0.iter().flatten() {
            if !seen.insert(*index) {
                return Err(SignerViolation::RepeatedSigner(*index));
            }
        }

        let slot = self.last_present().ok_or(SignerViolation::NoSigners)?;
        let extra = extra_index.ok_or(SignerViolation::MissingExtraIndex)?;
        if extra != slot {
            return Err(SignerViolation::ExtraIndexMismatch { extra, slot });
        }
        Ok(())
    }
}

fn decode_slot(slot: usize, chunk: &[u8]) -> Result<Option<u8>, SignerViolation> {
    let bad_token = || SignerViolation::BadToken {
        slot,
        token: String::from_utf8_lossy(chunk).into_owned(),
    };

    if chunk == ABSENT_TOKEN.as_bytes() {
        return Ok(None);
    }
    match chunk {
        [tens @ b'0'..=b'9', ones @ b'0'..=b'9'] => {
            let index = (tens - b'0') * 10 + (ones - b'0');
            if index > MAX_SIGNER_INDEX {
                Err(bad_token())
            } else {
                Ok(Some(index))
            }
        }
        _ => Err(bad_token()),
    }
}
