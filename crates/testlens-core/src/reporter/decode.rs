//! Extracting events from runner output.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use super::escape::restore_at_signs;
use super::event::MessageType;

/// A frame is everything from `@@<` to the last `>` before the next `@`.
const FRAME_PATTERN: &str = r"@@<([^@]*)>";
const WRAPPER_OPEN: &str = "TestRunner-";
const WRAPPER_CLOSE: &str = "-TestRunner";

/// Errors for frames that cannot be decoded.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame is missing the TestRunner wrapper: {0}")]
    MissingWrapper(String),

    #[error("Malformed frame payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// An event read back from a frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecodedEvent {
    pub name: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, Option<String>>>,
}

impl DecodedEvent {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.as_ref()?.get(key)?.as_deref()
    }
}

/// Decode every frame in `text`. A malformed frame does not stop later ones.
pub fn decode_frames(text: &str) -> Vec<Result<DecodedEvent, FrameError>> {
    let re = match Regex::new(FRAME_PATTERN) {
        Ok(r) => r,
        Err(_) => return vec![],
    };

    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_frame(m.as_str()))
        .collect()
}

/// Decode one frame body (the text between `@@<` and `>`).
pub fn decode_frame(body: &str) -> Result<DecodedEvent, FrameError> {
    let payload = body
        .strip_prefix(WRAPPER_OPEN)
        .ok_or_else(|| FrameError::MissingWrapper(body.to_string()))?;

    let mut stream = serde_json::Deserializer::from_str(payload).into_iter::<DecodedEvent>();
    let mut event = match stream.next() {
        Some(event) => event?,
        None => return Err(FrameError::MissingWrapper(body.to_string())),
    };
    if !payload[stream.byte_offset()..].starts_with(WRAPPER_CLOSE) {
        return Err(FrameError::MissingWrapper(body.to_string()));
    }

    if let Some(attributes) = event.attributes.as_mut() {
        for value in attributes.values_mut().flatten() {
            *value = restore_at_signs(value);
        }
    }
    Ok(event)
}

/// Decodes frames from output arriving in arbitrary chunks.
///
/// Frames are line-framed, so only complete lines are decoded; a trailing
/// partial line waits for the next chunk or [`FrameDecoder::finish`].
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<Result<DecodedEvent, FrameError>> {
        self.pending.push_str(chunk);
        let Some(end) = self.pending.rfind('\n') else {
            return Vec::new();
        };
        let complete: String = self.pending.drain(..=end).collect();
        decode_frames(&complete)
    }

    /// Decode whatever is left after the last line break.
    pub fn finish(&mut self) -> Vec<Result<DecodedEvent, FrameError>> {
        let rest = std::mem::take(&mut self.pending);
        decode_frames(&rest)
    }
}
