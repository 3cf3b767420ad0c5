//! Session identity and payload assembly.

use std::fmt;

/// Container MIME type of every finalized payload.
pub const AUDIO_MIME: &str = "audio/webm";

/// Identity of one recording attempt. Ids increase monotonically within
/// a controller; a finished upload is applied only if its id is still
/// the most recently started one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub(crate) fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered fragment storage for one session. Empty fragments are dropped
/// at append time; encoders occasionally emit them and they carry no
/// audio.
#[derive(Debug, Default)]
pub(crate) struct FragmentBuffer {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl FragmentBuffer {
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn fragment_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate all fragments, in arrival order, into the payload.
    pub fn into_payload(self) -> AudioPayload {
        let mut bytes = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks {
            bytes.extend_from_slice(&chunk);
        }
        AudioPayload { bytes }
    }
}

/// The finalized audio of one session: immutable bytes plus the fixed
/// container MIME type. Produced once, handed to the upload, then gone.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    bytes: Vec<u8>,
}

impl AudioPayload {
    pub fn mime(&self) -> &'static str {
        AUDIO_MIME
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}
