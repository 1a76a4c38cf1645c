//! Reassembly of complete text lines from raw output chunks.

/// What: Buffers raw bytes from a child stream and yields complete lines.
///
/// Details:
/// - Splits on the `\n` byte. In UTF-8 that byte never occurs inside a
///   multi-byte sequence, so a chunk boundary can never cut a character in half
///   once the line is complete.
/// - Each line comes back twice: `raw` as the child wrote it (decoded lossily,
///   newline removed) for the transcript, and `text` with a trailing `\r` and
///   ANSI escape codes stripped for classification.
#[derive(Debug, Default)]
pub struct LineAssembler {
    /// Bytes received after the last newline.
    pending: Vec<u8>,
}

/// One complete output line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Bytes as received, without the terminating newline.
    pub raw: String,
    /// Plain text used for matching.
    pub text: String,
}

impl Line {
    /// Decode `bytes` (terminator already removed).
    fn decode(bytes: &[u8]) -> Self {
        let trimmed = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let cleaned = strip_ansi_escapes::strip(trimmed);
        Self {
            raw: String::from_utf8_lossy(bytes).into_owned(),
            text: String::from_utf8_lossy(&cleaned).into_owned(),
        }
    }
}

impl LineAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Feed a chunk and collect the lines it completes.
    ///
    /// Inputs:
    /// - `chunk`: Raw bytes as read from the pipe.
    ///
    /// Output:
    /// - Every line terminated inside `chunk` (possibly none).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Line> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(Line::decode(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// What: Flush the unterminated tail once the stream closed.
    ///
    /// Output:
    /// - `Some(line)` when bytes remain after the last newline, `None` otherwise.
    pub fn finish(&mut self) -> Option<Line> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(Line::decode(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: Vec<Line>) -> Vec<String> {
        lines.into_iter().map(|l| l.text).collect()
    }

    #[test]
    /// What: Lines split across chunks are reassembled in order.
    ///
    /// Inputs:
    /// - Chunks `"Scan"`, `"ning /a\nScanning /b\nInf"`, `"ected files: 0\n"`.
    ///
    /// Output:
    /// - Nothing for the first chunk, then two lines, then the summary line.
    fn push_reassembles_split_lines() {
        let mut asm = LineAssembler::new();
        assert!(asm.push(b"Scan").is_empty());
        assert_eq!(
            texts(asm.push(b"ning /a\nScanning /b\nInf")),
            vec!["Scanning /a".to_string(), "Scanning /b".to_string()]
        );
        assert_eq!(
            texts(asm.push(b"ected files: 0\n")),
            vec!["Infected files: 0".to_string()]
        );
        assert_eq!(asm.finish(), None);
    }

    #[test]
    /// What: Multi-byte characters split mid-sequence survive intact.
    ///
    /// Inputs:
    /// - `"Scanning /tmp/é.txt\n"` fed one byte at a time.
    ///
    /// Output:
    /// - One line equal to the original text.
    fn push_keeps_multibyte_sequences_whole() {
        let text = "Scanning /tmp/é.txt\n";
        let mut asm = LineAssembler::new();
        let mut lines = Vec::new();
        for b in text.as_bytes() {
            lines.extend(texts(asm.push(std::slice::from_ref(b))));
        }
        assert_eq!(lines, vec!["Scanning /tmp/é.txt".to_string()]);
    }

    #[test]
    /// What: CRLF endings and ANSI colours are stripped for matching but kept raw.
    ///
    /// Inputs:
    /// - A coloured CRLF line followed by a tail without newline.
    ///
    /// Output:
    /// - Plain `text`, verbatim `raw`, and the tail returned by `finish`.
    fn crlf_ansi_and_tail_are_handled() {
        let mut asm = LineAssembler::new();
        let lines = asm.push(b"\x1b[31m/x: Eicar FOUND\x1b[0m\r\nInfected files: 1");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "/x: Eicar FOUND");
        assert_eq!(lines[0].raw, "\x1b[31m/x: Eicar FOUND\x1b[0m\r");
        let tail = asm.finish().expect("tail");
        assert_eq!(tail.text, "Infected files: 1");
        assert_eq!(tail.raw, "Infected files: 1");
        assert_eq!(asm.finish(), None);
    }
}
