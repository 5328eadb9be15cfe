//! Transport decoding of raw rule lists.
//!
//! gfwlist is published base64-encoded with line breaks every 64 characters,
//! while custom lists are usually kept as plain text. [`decode_rule_list`]
//! accepts both.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Standard alphabet, padding optional.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Error type for rule-list decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Content is neither valid base64 nor recognizable as a plain rule list.
    #[error("base64 decode: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded content is not UTF-8.
    #[error("rule list is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decode a raw rule list that may or may not be base64-encoded.
///
/// Whitespace is stripped and the content decoded as standard base64. If that
/// fails but the content looks like a plain rule list (it has several lines
/// or contains a `||` anchor), it is returned as-is.
///
/// # Errors
///
/// Returns [`DecodeError::Base64`] for content that is neither, and
/// [`DecodeError::Utf8`] if the resulting bytes are not UTF-8.
///
/// # Example
///
/// ```
/// use pacserve::rules::decode_rule_list;
///
/// assert_eq!(decode_rule_list(b"fHxleGFtcGxlLmNvbQo=").unwrap(), "||example.com\n");
/// assert_eq!(decode_rule_list(b"||example.com\n").unwrap(), "||example.com");
/// ```
pub fn decode_rule_list(input: &[u8]) -> Result<String, DecodeError> {
    let trimmed = input.trim_ascii();
    let compact: Vec<u8> = trimmed
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    match LENIENT_STANDARD.decode(&compact) {
        Ok(decoded) => Ok(String::from_utf8(decoded)?),
        Err(err) => {
            if looks_like_plain_text(trimmed) {
                Ok(String::from_utf8(trimmed.to_vec())?)
            } else {
                Err(DecodeError::Base64(err))
            }
        }
    }
}

fn looks_like_plain_text(content: &[u8]) -> bool {
    content.contains(&b'\n') || content.windows(2).any(|w| w == b"||")
}
