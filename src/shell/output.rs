//! Cleaning captured process output into error text.

use std::collections::VecDeque;

use super::RunOutput;

/// Lines an interactive shell prints on its own when started without a
/// terminal. They say nothing about the command being re-run.
const JOB_CONTROL_NOISE: &[&str] = &[
    "cannot set terminal process group",
    "no job control in this shell",
    "can't access tty; job control turned off",
];

/// Byte-bounded capture of one output stream.
///
/// Keeps the first and last `limit / 2` bytes; anything in between is
/// replaced by a marker with the number of dropped bytes.
#[derive(Debug)]
pub struct CaptureBuffer {
    head: Vec<u8>,
    tail: VecDeque<u8>,
    half: usize,
    dropped: u64,
}

impl CaptureBuffer {
    pub fn new(limit: usize) -> Self {
        let half = limit / 2;
        Self {
            head: Vec::with_capacity(half.min(8 * 1024)),
            tail: VecDeque::new(),
            half,
            dropped: 0,
        }
    }

    pub fn push(&mut self, mut chunk: &[u8]) {
        if self.head.len() < self.half {
            let take = (self.half - self.head.len()).min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];
        }
        self.tail.extend(chunk.iter().copied());
        if self.tail.len() > self.half {
            let excess = self.tail.len() - self.half;
            self.tail.drain(..excess);
            self.dropped += excess as u64;
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = self.head;
        if self.dropped > 0 {
            out.extend_from_slice(format!("\n... [{} bytes omitted] ...\n", self.dropped).as_bytes());
        }
        out.extend(self.tail);
        out
    }
}

/// Merge stdout and stderr, then strip escape codes and shell noise.
pub fn clean_output(output: &RunOutput) -> String {
    let mut merged = Vec::with_capacity(output.stdout.len() + output.stderr.len() + 1);
    merged.extend_from_slice(&output.stdout);
    if !output.stderr.is_empty() {
        if !merged.is_empty() && merged.last() != Some(&b'\n') {
            merged.push(b'\n');
        }
        merged.extend_from_slice(&output.stderr);
    }

    let text = strip_ansi_codes(&String::from_utf8_lossy(&merged));
    let mut cleaned: String = text
        .split_inclusive('\n')
        .filter(|line| !JOB_CONTROL_NOISE.iter().any(|noise| line.contains(noise)))
        .collect();
    // A noise line may have been the last one before the real output ended.
    if !text.ends_with('\n') && cleaned.ends_with('\n') {
        cleaned.pop();
    }
    cleaned
}

/// Remove CSI (`ESC [ ... letter`) and OSC (`ESC ] ... BEL|ST`) sequences.
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\x1b' {
            result.push(ch);
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                while let Some(next_ch) = chars.next() {
                    if next_ch.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(next_ch) = chars.next() {
                    if next_ch == '\x07' {
                        break;
                    }
                    if next_ch == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            // Lone ESC or a two-byte sequence: drop the following char too.
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }

    result
}
