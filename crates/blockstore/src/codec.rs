use calimero_primitives::{Link, DIGEST_SIZE};
use thiserror::Error;

/// `link_count: u32 LE` + `payload_len: u32 LE`, followed by the links
/// themselves and then the payload.
pub(crate) const HEADER_SIZE: usize = 8;

/// A decoded block: its child links, in order, and its payload slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    pub links: Vec<Link>,
    pub payload: Vec<u8>,
}

/// Failure decoding a block's bytes. Every variant maps to `MalformedBlock`
/// at the coordinator layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated header: need {HEADER_SIZE} bytes, got {0}")]
    TruncatedHeader(usize),
    #[error("implausible link count {0} for a {1}-byte block")]
    ImplausibleLinkCount(u32, usize),
    #[error("trailing payload mismatch: header declares {declared}, block has {actual}")]
    TrailingMismatch { declared: u32, actual: usize },
}

/// The maximum number of links an interior block can carry at `max_size`.
/// The sole definition of "max fan-out" (`K`).
#[must_use]
pub const fn links_per_block(max_size: usize) -> usize {
    if max_size <= HEADER_SIZE {
        return 0;
    }
    (max_size - HEADER_SIZE) / DIGEST_SIZE
}

/// The largest payload a leaf (zero links) can carry while still encoding
/// to at most `max_size` bytes.
#[must_use]
pub const fn max_leaf_payload(max_size: usize) -> usize {
    max_size.saturating_sub(HEADER_SIZE)
}

/// Encodes a block from its links and payload. The content id of the
/// resulting bytes is `Link::digest(&encoded)`.
#[must_use]
pub fn encode_block(links: &[Link], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + links.len() * DIGEST_SIZE + payload.len());
    #[expect(clippy::cast_possible_truncation, reason = "link counts fit in u32")]
    out.extend_from_slice(&(links.len() as u32).to_le_bytes());
    #[expect(clippy::cast_possible_truncation, reason = "payload len fits in u32 at max_size")]
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    for link in links {
        out.extend_from_slice(link.as_bytes());
    }
    out.extend_from_slice(payload);
    out
}

/// Decodes a block previously produced by [`encode_block`]. Fails with
/// [`CodecError`] if the header is truncated, the link count is
/// implausible for the byte length, or the trailing payload length is
/// inconsistent with the header.
pub fn decode_block(bytes: &[u8]) -> Result<DecodedBlock, CodecError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::TruncatedHeader(bytes.len()));
    }

    let link_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let payload_len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    let links_bytes = (link_count as usize)
        .checked_mul(DIGEST_SIZE)
        .ok_or(CodecError::ImplausibleLinkCount(link_count, bytes.len()))?;

    let links_end = HEADER_SIZE
        .checked_add(links_bytes)
        .ok_or(CodecError::ImplausibleLinkCount(link_count, bytes.len()))?;

    if links_end > bytes.len() {
        return Err(CodecError::ImplausibleLinkCount(link_count, bytes.len()));
    }

    let payload = &bytes[links_end..];
    if payload.len() as u64 != u64::from(payload_len) {
        return Err(CodecError::TrailingMismatch {
            declared: payload_len,
            actual: payload.len(),
        });
    }

    let mut links = Vec::with_capacity(link_count as usize);
    let mut cursor = HEADER_SIZE;
    for _ in 0..link_count {
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&bytes[cursor..cursor + DIGEST_SIZE]);
        links.push(Link::from_bytes(digest));
        cursor += DIGEST_SIZE;
    }

    Ok(DecodedBlock {
        links,
        payload: payload.to_vec(),
    })
}

#[cfg(test)]
#[path = "tests/codec.rs"]
mod tests;
