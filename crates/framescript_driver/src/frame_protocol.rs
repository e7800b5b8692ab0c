// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame-fetch wire format.
//!
//! Requests are JSON text `{video, width, height, frame}`. Responses are a
//! 12 byte header (width, height, frame index, each `u32` little endian)
//! followed by `width * height * 4` RGBA bytes.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};

/// Header length of a frame packet
pub const HEADER_LEN: usize = 12;

/// One pixel frame request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRequest {
    /// Source path
    pub video: String,
    /// Requested width
    pub width: u32,
    /// Requested height
    pub height: u32,
    /// Source frame index
    pub frame: u32,
}

impl FrameRequest {
    /// Create a request
    pub fn new(video: impl Into<String>, width: u32, height: u32, frame: u32) -> Self {
        Self {
            video: video.into(),
            width,
            height,
            frame,
        }
    }

    /// Key under which newer requests supersede older ones
    pub fn target(&self) -> String {
        format!("{}@{}x{}", self.video, self.width, self.height)
    }

    /// Encode as the JSON text message
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A decoded RGBA frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame index
    pub frame: u32,
    /// `width * height * 4` RGBA bytes
    pub rgba: Vec<u8>,
}

impl DecodedFrame {
    /// Encode as a frame packet
    pub fn to_packet(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(HEADER_LEN + self.rgba.len());
        packet.extend_from_slice(&self.width.to_le_bytes());
        packet.extend_from_slice(&self.height.to_le_bytes());
        packet.extend_from_slice(&self.frame.to_le_bytes());
        packet.extend_from_slice(&self.rgba);
        packet
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decode and validate a frame packet
pub fn decode_frame_packet(bytes: &[u8]) -> Result<DecodedFrame, FrameError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::TooShort { len: bytes.len() });
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    let width = read_u32(header, 0);
    let height = read_u32(header, 4);
    let frame = read_u32(header, 8);

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4));
    if expected != Some(payload.len()) {
        return Err(FrameError::SizeMismatch {
            frame,
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            actual: payload.len(),
        });
    }

    Ok(DecodedFrame {
        width,
        height,
        frame,
        rgba: payload.to_vec(),
    })
}
