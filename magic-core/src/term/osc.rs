use bytes::BytesMut;
use serde::Serialize;

/// `ESC ] 1 3 3 ;` - shared by all four markers.
pub const MARKER_PREFIX: &[u8] = b"\x1b]133;";

/// Prefix + letter + BEL.
pub const MARKER_LEN: usize = MARKER_PREFIX.len() + 2;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// The four boundaries the injected hooks announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// OSC 133;A  a command is about to run
    CommandStart,

    /// OSC 133;B  the command returned
    CommandEnd,

    /// OSC 133;P  the prompt is about to be drawn
    PromptStart,

    /// OSC 133;Q  the prompt is drawn, shell waits for input
    PromptEnd,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 4] = [
        MarkerKind::CommandStart,
        MarkerKind::CommandEnd,
        MarkerKind::PromptStart,
        MarkerKind::PromptEnd,
    ];

    pub fn letter(self) -> u8 {
        match self {
            MarkerKind::CommandStart => b'A',
            MarkerKind::CommandEnd => b'B',
            MarkerKind::PromptStart => b'P',
            MarkerKind::PromptEnd => b'Q',
        }
    }

    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'A' => Some(MarkerKind::CommandStart),
            b'B' => Some(MarkerKind::CommandEnd),
            b'P' => Some(MarkerKind::PromptStart),
            b'Q' => Some(MarkerKind::PromptEnd),
            _ => None,
        }
    }

    /// The exact wire bytes of this marker.
    pub fn bytes(self) -> [u8; MARKER_LEN] {
        let mut out = [0u8; MARKER_LEN];
        out[..MARKER_PREFIX.len()].copy_from_slice(MARKER_PREFIX);
        out[MARKER_LEN - 2] = self.letter();
        out[MARKER_LEN - 1] = BEL;
        out
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarkerKind::CommandStart => "command_start",
            MarkerKind::CommandEnd => "command_end",
            MarkerKind::PromptStart => "prompt_start",
            MarkerKind::PromptEnd => "prompt_end",
        }
    }
}

/// A piece of a scanned chunk, in stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a [u8]),
    Marker(MarkerKind),
}

/// Split `chunk` into text runs and markers without copying.
pub fn segments(chunk: &[u8]) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while let Some(offset) = chunk[i..].iter().position(|&b| b == ESC) {
        let at = i + offset;
        match marker_at(&chunk[at..]) {
            Some(kind) => {
                if text_start < at {
                    out.push(Segment::Text(&chunk[text_start..at]));
                }
                out.push(Segment::Marker(kind));
                i = at + MARKER_LEN;
                text_start = i;
            }
            None => i = at + 1,
        }
    }

    if text_start < chunk.len() {
        out.push(Segment::Text(&chunk[text_start..]));
    }
    out
}

/// Strip every marker from `chunk` and report the kinds in encounter order.
///
/// Pure and stateless: a marker split across two chunks is not recognised
/// here (see [`MarkerScanner`] for the chunk-safe variant). Bytes that are not
/// part of a marker come back unchanged, including invalid UTF-8.
pub fn parse(chunk: &[u8]) -> (Vec<u8>, Vec<MarkerKind>) {
    let mut cleaned = Vec::with_capacity(chunk.len());
    let mut events = Vec::new();

    for segment in segments(chunk) {
        match segment {
            Segment::Text(text) => cleaned.extend_from_slice(text),
            Segment::Marker(kind) => events.push(kind),
        }
    }

    (cleaned, events)
}

fn marker_at(bytes: &[u8]) -> Option<MarkerKind> {
    if bytes.len() < MARKER_LEN || !bytes.starts_with(MARKER_PREFIX) || bytes[MARKER_LEN - 1] != BEL {
        return None;
    }
    MarkerKind::from_letter(bytes[MARKER_LEN - 2])
}

/// Could `tail` still grow into a marker?
fn is_marker_prefix(tail: &[u8]) -> bool {
    if tail.len() <= MARKER_PREFIX.len() {
        return MARKER_PREFIX.starts_with(tail);
    }
    tail.len() == MARKER_LEN - 1
        && tail.starts_with(MARKER_PREFIX)
        && MarkerKind::from_letter(tail[MARKER_LEN - 2]).is_some()
}

/// Length of the longest suffix of `chunk` that is a strict marker prefix.
pub fn partial_marker_len(chunk: &[u8]) -> usize {
    let longest = chunk.len().min(MARKER_LEN - 1);
    (1..=longest)
        .rev()
        .find(|&n| is_marker_prefix(&chunk[chunk.len() - n..]))
        .unwrap_or(0)
}

/// Chunk-safe marker scanning for the output path.
///
/// Holds back a trailing partial marker (never more than `MARKER_LEN - 1`
/// bytes) until the next chunk decides what it is.
#[derive(Debug, Default)]
pub struct MarkerScanner {
    carry: BytesMut,
}

impl MarkerScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently held back.
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    /// Scan `chunk` and hand every segment to `emit`, in order.
    pub fn feed<E, F>(&mut self, chunk: &[u8], mut emit: F) -> Result<(), E>
    where
        F: FnMut(Segment<'_>) -> Result<(), E>,
    {
        if self.carry.is_empty() {
            let hold = partial_marker_len(chunk);
            let (ready, tail) = chunk.split_at(chunk.len() - hold);
            for segment in segments(ready) {
                emit(segment)?;
            }
            self.carry.extend_from_slice(tail);
            return Ok(());
        }

        self.carry.extend_from_slice(chunk);
        let pending = self.carry.split();
        let hold = partial_marker_len(&pending);
        let (ready, tail) = pending.split_at(pending.len() - hold);
        for segment in segments(ready) {
            emit(segment)?;
        }
        self.carry.extend_from_slice(tail);
        Ok(())
    }

    /// End of stream: whatever is still held back was never a marker.
    pub fn finish(&mut self) -> BytesMut {
        self.carry.split()
    }
}
