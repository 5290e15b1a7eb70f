//! Leading filler detection for leaf chunks.
//!
//! Leaf payloads may be preceded by a run of filler bytes (and, for some
//! titles, whole sentinel words) inserted by the authoring tools to align the
//! real content. The scan is heuristic: a payload whose first byte happens to
//! equal the filler is misread. Each title keeps its own odd-length rule.

/// How a title corrects an odd-length filler run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OddLengthFix {
    /// Odd runs are taken as-is.
    None,
    /// The last filler byte is handed back to the payload: the count and the
    /// payload start both move back by one.
    Rewind,
    /// Only the count is decremented; the payload start stays after the run,
    /// so the declared payload length is one byte longer than the readable
    /// bytes.
    CountOnly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PaddingRule {
    pub filler: Option<u8>,
    /// Scanned word-wise before the filler byte.
    pub sentinel_word: Option<u32>,
    pub odd_fix: OddLengthFix,
}

/// Where the real content of a leaf chunk lives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PaddedPayload {
    /// Bytes skipped from the start of the chunk payload.
    pub skip: usize,
    /// Declared chunk size minus the corrected filler count.
    pub len: usize,
}

impl PaddedPayload {
    /// The readable payload, never extending past the chunk end.
    pub fn slice<'a>(&self, chunk: &'a [u8]) -> &'a [u8] {
        let end = (self.skip + self.len).min(chunk.len());
        &chunk[self.skip..end]
    }
}

impl PaddingRule {
    pub const NONE: Self = Self { filler: None, sentinel_word: None, odd_fix: OddLengthFix::None };

    pub const fn filler(byte: u8, odd_fix: OddLengthFix) -> Self {
        Self { filler: Some(byte), sentinel_word: None, odd_fix }
    }

    pub const fn sentinel(word: u32, byte: u8, odd_fix: OddLengthFix) -> Self {
        Self { filler: Some(byte), sentinel_word: Some(word), odd_fix }
    }

    pub fn scan(&self, chunk: &[u8]) -> PaddedPayload {
        let mut run = 0usize;
        if let Some(word) = self.sentinel_word {
            while let Some(bytes) = chunk.get(run..run + 4) {
                if u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) != word {
                    break;
                }
                run += 4;
            }
        }
        if let Some(filler) = self.filler {
            while chunk.get(run) == Some(&filler) {
                run += 1;
            }
        }

        let mut skip = run;
        let mut count = run;
        if count % 2 == 1 {
            match self.odd_fix {
                OddLengthFix::None => {}
                OddLengthFix::Rewind => {
                    count -= 1;
                    skip -= 1;
                }
                OddLengthFix::CountOnly => count -= 1,
            }
        }
        PaddedPayload { skip, len: chunk.len() - count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MW: PaddingRule = PaddingRule::filler(0x11, OddLengthFix::None);

    #[test]
    fn no_filler_keeps_payload() {
        let chunk = [1u8, 2, 3, 4];
        let payload = MW.scan(&chunk);
        assert_eq!(payload, PaddedPayload { skip: 0, len: 4 });
        assert_eq!(payload.slice(&chunk), &chunk);
    }

    #[test]
    fn filler_run_is_skipped() {
        let chunk = [0x11, 0x11, 0x11, 0x11, 5, 6, 7, 8, 9, 10, 11, 12];
        let payload = MW.scan(&chunk);
        assert_eq!(payload, PaddedPayload { skip: 4, len: 8 });
        assert_eq!(payload.slice(&chunk), &[5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn odd_run_rewind_hands_back_one_byte() {
        let rule = PaddingRule::filler(0x11, OddLengthFix::Rewind);
        let chunk = [0x11, 0x11, 0x11, 0xAB, 0xCD];
        let payload = rule.scan(&chunk);
        assert_eq!(payload, PaddedPayload { skip: 2, len: 3 });
        assert_eq!(payload.slice(&chunk), &[0x11, 0xAB, 0xCD]);
    }

    #[test]
    fn odd_run_count_only_keeps_start() {
        let rule = PaddingRule::filler(0x11, OddLengthFix::CountOnly);
        let chunk = [0x11, 0x11, 0x11, 0xAB, 0xCD];
        let payload = rule.scan(&chunk);
        assert_eq!(payload, PaddedPayload { skip: 3, len: 3 });
        assert_eq!(payload.slice(&chunk), &[0xAB, 0xCD]);
    }

    #[test]
    fn sentinel_words_then_filler() {
        let rule = PaddingRule::sentinel(0x1111_1111, 0x11, OddLengthFix::Rewind);
        let mut chunk = vec![0x11; 8];
        chunk.extend_from_slice(&[0x11, 0x11, 0x20, 0x30]);
        let payload = rule.scan(&chunk);
        assert_eq!(payload, PaddedPayload { skip: 10, len: 2 });
    }

    #[test]
    fn all_filler_yields_empty_payload() {
        let chunk = [0x11; 6];
        let payload = MW.scan(&chunk);
        assert_eq!(payload.len, 0);
        assert!(payload.slice(&chunk).is_empty());
    }

    #[test]
    fn none_rule_never_skips() {
        let chunk = [0x11, 0x11];
        assert_eq!(PaddingRule::NONE.scan(&chunk), PaddedPayload { skip: 0, len: 2 });
    }
}
