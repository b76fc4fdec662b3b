//! Bearer token payload decoding
//!
//! The payload segment is read without checking the signature. Verifying a
//! token is the backend's job; the client only needs to know who it claims
//! to be and when it runs out.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::auth::models::SessionClaims;

/// Standard alphabet, padding optional (token segments are usually unpadded)
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the claims from a `header.payload.signature` token.
///
/// Returns `None` when the token has fewer than two segments or the payload
/// is not base64url-encoded UTF-8 JSON object text. Never panics.
pub fn decode_claims(token: &str) -> Option<SessionClaims> {
    let payload = payload_segment(token)?;
    let bytes = match PAYLOAD_ENGINE.decode(to_standard_alphabet(payload)) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Token payload is not base64: {}", e);
            return None;
        }
    };
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            tracing::debug!("Token payload is not UTF-8");
            return None;
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Token payload is not JSON: {}", e);
            return None;
        }
    };
    if !value.is_object() {
        tracing::debug!("Token payload is not a JSON object");
        return None;
    }
    match serde_json::from_value(value) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!("Token payload is not a claims object: {}", e);
            None
        }
    }
}

fn payload_segment(token: &str) -> Option<&str> {
    let mut segments = token.split('.');
    segments.next()?;
    segments.next()
}

fn to_standard_alphabet(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect()
}

/// Encode claims into an unsigned token of the same shape the backend issues.
/// Useful for fixtures and local tooling; the signature segment is a placeholder.
pub fn encode_unsigned(claims: &SessionClaims) -> crate::error::Result<String> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    Ok(format!("{}.{}.unsigned", header, payload))
}
