//! Message normalization.
//!
//! Turns one provider-supplied notification into plain text plus a timestamp.
//! Only plain-text bodies are read; HTML parts are ignored. The timestamp comes
//! from the `Date` header and falls back to the caller's "now" when the header
//! is missing or unparseable, so a bad header never costs us the order.

use crate::errors::{Error, Result};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name, compared case-insensitively
    pub name: String,
    /// Raw header value
    pub value: String,
}

/// How a body's `data` field is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    /// Data is the text itself
    #[default]
    Plain,
    /// Data is base64, standard or URL-safe alphabet, padding optional
    Base64,
}

/// Encoded body content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyData {
    /// Encoding of `data`
    #[serde(default)]
    pub encoding: BodyEncoding,
    /// The encoded content, empty for attachment stubs that carry only a size
    #[serde(default)]
    pub data: String,
}

/// One part of a multi-part body. Parts may nest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    /// MIME type such as `text/plain` or `multipart/alternative`
    pub mime_type: String,
    /// Content of this part, absent for container parts
    #[serde(default)]
    pub body: Option<BodyData>,
    /// Nested parts
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

/// Body of a raw message: either a single encoded body or a list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    /// Multi-part body
    Multipart {
        /// Top-level parts
        parts: Vec<MessagePart>,
    },
    /// Single body
    Single(BodyData),
}

/// A notification as delivered by the message source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Provider message identifier
    pub id: String,
    /// All headers in provider order
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Message body
    pub body: MessageBody,
}

impl RawMessage {
    /// Returns the value of the first header with the given name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// A message reduced to what the extractor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    /// Provider message identifier
    pub id: String,
    /// Subject header, if any
    pub subject: Option<String>,
    /// Plain-text body, empty when the message had no plain-text part
    pub text: String,
    /// Notification time
    pub timestamp: DateTime<Utc>,
    /// True when `timestamp` is the fallback rather than the `Date` header
    pub timestamp_fallback: bool,
}

/// Normalizes a raw message into plain text and a timestamp.
///
/// # Arguments
/// * `raw` - The message to normalize
/// * `now` - Timestamp to use when the `Date` header is missing or malformed
///
/// # Errors
/// Returns `Error::Parse` if the plain-text body cannot be decoded. Callers in
/// the ingestion pipeline skip such messages rather than failing the batch.
pub fn normalize(raw: &RawMessage, now: DateTime<Utc>) -> Result<NormalizedMessage> {
    let text = match &raw.body {
        MessageBody::Single(body) => decode_body(body)?,
        MessageBody::Multipart { parts } => match find_plain_text(parts) {
            Some(body) => decode_body(body)?,
            None => String::new(),
        },
    };

    let parsed = raw.header("Date").and_then(parse_message_date);
    if parsed.is_none() {
        warn!(
            "Message {} has a missing or malformed Date header, using current time",
            raw.id
        );
    }

    Ok(NormalizedMessage {
        id: raw.id.clone(),
        subject: raw.header("Subject").map(ToString::to_string),
        text,
        timestamp: parsed.unwrap_or(now),
        timestamp_fallback: parsed.is_none(),
    })
}

/// Finds the first `text/plain` part with content, searching depth-first.
fn find_plain_text(parts: &[MessagePart]) -> Option<&BodyData> {
    parts.iter().find_map(|part| {
        if part.mime_type.eq_ignore_ascii_case("text/plain") {
            if let Some(body) = &part.body {
                return Some(body);
            }
        }
        find_plain_text(&part.parts)
    })
}

/// Decodes body data into text. Invalid UTF-8 sequences are replaced.
pub fn decode_body(body: &BodyData) -> Result<String> {
    match body.encoding {
        BodyEncoding::Plain => Ok(body.data.clone()),
        BodyEncoding::Base64 => {
            let compact: String = body.data.chars().filter(|c| !c.is_whitespace()).collect();
            let unpadded = compact.trim_end_matches('=');
            let bytes = URL_SAFE_NO_PAD
                .decode(unpadded)
                .or_else(|_| STANDARD_NO_PAD.decode(unpadded))
                .map_err(|e| Error::Parse {
                    message: format!("invalid base64 body: {e}"),
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// Parses a `Date` header value.
///
/// Accepts RFC 2822 (with an optional trailing `(TZ)` comment, as mail servers
/// like to append) and RFC 3339.
#[must_use]
pub fn parse_message_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    let without_comment = match trimmed.rfind('(') {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
        _ => trimmed,
    };

    DateTime::parse_from_rfc2822(without_comment)
        .or_else(|_| DateTime::parse_from_rfc3339(without_comment))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
