/// Incremental UTF-8 decoder for chunked response bodies.
///
/// Bytes of a multi-byte character split across two chunks are held back until
/// the rest arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + bytes` as possible.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut start = 0;

        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let good = start + e.valid_up_to();
                    // valid_up_to guarantees this range is UTF-8
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..good]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = good + len;
                        }
                        None => {
                            // truncated sequence at the end, wait for more bytes
                            start = good;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Flush whatever is left at end of stream.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut acc = Utf8Accumulator::new();
        assert_eq!(acc.push(b"<SECTION>"), "<SECTION>");
        assert_eq!(acc.finish(), "");
    }

    #[test]
    fn test_split_multibyte_character() {
        let text = "日本";
        let bytes = text.as_bytes();
        let mut acc = Utf8Accumulator::new();

        let first = acc.push(&bytes[..2]);
        assert_eq!(first, "");
        let second = acc.push(&bytes[2..4]);
        assert_eq!(second, "日");
        let third = acc.push(&bytes[4..]);
        assert_eq!(third, "本");
    }

    #[test]
    fn test_invalid_byte_is_replaced() {
        let mut acc = Utf8Accumulator::new();
        let out = acc.push(&[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
    }

    #[test]
    fn test_truncated_tail_flushed_lossily() {
        let mut acc = Utf8Accumulator::new();
        let bytes = "é".as_bytes();
        assert_eq!(acc.push(&bytes[..1]), "");
        assert_eq!(acc.finish(), "\u{FFFD}");
    }
}
