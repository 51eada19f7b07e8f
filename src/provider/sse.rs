//! Incremental Server-Sent Events decoder.
//!
//! Buffers raw bytes rather than text so a multi-byte UTF-8 character split
//! across network reads is decoded only once its line is complete.

/// A decoded SSE line of interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line
    Data(String),
    /// The `data: [DONE]` terminator
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return the events completed by them
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&line, &mut events);
        }

        events
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.push_line(&line, &mut events);
        }
        events
    }

    /// Whether `[DONE]` has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn push_line(&mut self, raw: &[u8], events: &mut Vec<SseEvent>) {
        if self.done {
            return;
        }

        let line = String::from_utf8_lossy(raw);
        let line = line.trim();

        // blank separators, comments/keep-alives, and other fields
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim_start();

        if data == "[DONE]" {
            self.done = true;
            events.push(SseEvent::Done);
        } else if !data.is_empty() {
            events.push(SseEvent::Data(data.to_string()));
        }
    }
}
