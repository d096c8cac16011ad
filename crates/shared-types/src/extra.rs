//! # Transaction Extra Field
//!
//! The extra field is a sequence of tagged records:
//!
//! | Tag | Record | Layout |
//! |-----|--------|--------|
//! | `0x00` | Padding | zero bytes to the end of extra (at most 255) |
//! | `0x01` | Tx public key | 32 bytes |
//! | `0x02` | Nonce | length byte + bytes |
//! | `0xA0` | Notarization signer index | 1 byte |

use crate::entities::PublicKey;
use crate::errors::CodecError;

/// Padding tag.
pub const TX_EXTRA_TAG_PADDING: u8 = 0x00;
/// Transaction public key tag.
pub const TX_EXTRA_TAG_PUBKEY: u8 = 0x01;
/// Nonce tag.
pub const TX_EXTRA_TAG_NONCE: u8 = 0x02;
/// Notarization signer index tag.
pub const TX_EXTRA_TAG_SIGNER_INDEX: u8 = 0xA0;

/// Maximum padding run.
pub const TX_EXTRA_PADDING_MAX_COUNT: usize = 255;

/// One parsed extra record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraField {
    /// Zero padding of the given length (tag byte included).
    Padding(usize),
    /// Transaction public key.
    PubKey(PublicKey),
    /// Free-form nonce.
    Nonce(Vec<u8>),
    /// Signer slot claimed by a notarization request.
    SignerIndex(u8),
}

impl ExtraField {
    /// Append this record's encoding to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            ExtraField::Padding(len) => out.extend(std::iter::repeat(0u8).take(*len)),
            ExtraField::PubKey(key) => {
                out.push(TX_EXTRA_TAG_PUBKEY);
                out.extend_from_slice(key);
            }
            ExtraField::Nonce(bytes) => {
                out.push(TX_EXTRA_TAG_NONCE);
                out.push(bytes.len() as u8);
                out.extend_from_slice(bytes);
            }
            ExtraField::SignerIndex(index) => {
                out.push(TX_EXTRA_TAG_SIGNER_INDEX);
                out.push(*index);
            }
        }
    }
}

/// Encode a list of records.
pub fn encode_extra(fields: &[ExtraField]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        field.encode_into(&mut out);
    }
    out
}

fn take<'a>(extra: &'a [u8], pos: usize, len: usize, tag: u8) -> Result<&'a [u8], CodecError> {
    extra
        .get(pos..pos + len)
        .ok_or(CodecError::TruncatedExtra { tag })
}

/// Parse the extra field into records.
pub fn parse_extra(extra: &[u8]) -> Result<Vec<ExtraField>, CodecError> {
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos < extra.len() {
        let tag = extra[pos];
        pos += 1;
        match tag {
            TX_EXTRA_TAG_PADDING => {
                let rest = &extra[pos..];
                if rest.len() + 1 > TX_EXTRA_PADDING_MAX_COUNT || rest.iter().any(|b| *b != 0) {
                    return Err(CodecError::InvalidPadding);
                }
                fields.push(ExtraField::Padding(rest.len() + 1));
                pos = extra.len();
            }
            TX_EXTRA_TAG_PUBKEY => {
                let bytes = take(extra, pos, 32, tag)?;
                let mut key = [0u8; 32];
                key.copy_from_slice(bytes);
                fields.push(ExtraField::PubKey(key));
                pos += 32;
            }
            TX_EXTRA_TAG_NONCE => {
                let len = *take(extra, pos, 1, tag)?.first().unwrap_or(&0) as usize;
                let bytes = take(extra, pos + 1, len, tag)?;
                fields.push(ExtraField::Nonce(bytes.to_vec()));
                pos += 1 + len;
            }
            TX_EXTRA_TAG_SIGNER_INDEX => {
                let index = take(extra, pos, 1, tag)?[0];
                fields.push(ExtraField::SignerIndex(index));
                pos += 1;
            }
            other => return Err(CodecError::UnknownExtraTag(other)),
        }
    }

    Ok(fields)
}

/// First notarization signer index embedded in the extra field.
pub fn signer_index_from_extra(extra: &[u8]) -> Result<Option<u8>, CodecError> {
    Ok(parse_extra(extra)?.into_iter().find_map(|field| match field {
        ExtraField::SignerIndex(index) => Some(index),
        _ => None,
    }))
}
