//! Splitting new text into display chunks.
//!
//! Lengths are counted in Unicode scalar values, so a CJK character and an
//! ASCII letter weigh the same.

/// Default lower bound for a chunk, in characters.
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 24;
/// Default upper bound for a chunk, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 64;

/// Characters that end a sentence or clause. Each stays attached to the text
/// before it.
pub const TERMINATORS: &[char] = &['。', '！', '？', '!', '?', '；', ';', '…', '\n', '\r'];

fn is_terminator(ch: char) -> bool {
    TERMINATORS.contains(&ch)
}

fn is_soft_separator(ch: char) -> bool {
    matches!(ch, '，' | ',' | '、') || ch.is_whitespace()
}

/// Boundary-aware chunker with a minimum and maximum chunk length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segmenter {
    min_chars: usize,
    max_chars: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHUNK_CHARS, DEFAULT_MAX_CHUNK_CHARS)
    }
}

impl Segmenter {
    /// Creates a segmenter. `max_chars` is raised to at least 1.
    pub fn new(min_chars: usize, max_chars: usize) -> Self {
        Self {
            min_chars,
            max_chars: max_chars.max(1),
        }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Splits `text` into chunks whose concatenation is exactly `text`.
    ///
    /// Chunks never exceed `max_chars`, except where a short chunk was merged
    /// with its successor.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for sentence in split_sentences(text) {
            if sentence.chars().count() <= self.max_chars {
                pieces.push(sentence.to_string());
            } else {
                self.cut_long(sentence, &mut pieces);
            }
        }
        merge_short(pieces, self.min_chars)
    }

    /// Cuts an over-long piece, preferring the last soft separator inside
    /// each `max_chars` window and force-cutting when none lies past
    /// `min_chars`.
    fn cut_long(&self, piece: &str, out: &mut Vec<String>) {
        let mut rest = piece;
        while let Some((window_end, _)) = rest.char_indices().nth(self.max_chars) {
            let window = &rest[..window_end];
            let soft_cut = window
                .char_indices()
                .enumerate()
                .filter(|(_, (_, ch))| is_soft_separator(*ch))
                .last()
                .filter(|(pos, _)| *pos > self.min_chars)
                .map(|(_, (byte, ch))| byte + ch.len_utf8());
            let cut = soft_cut.unwrap_or(window_end);
            out.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
}

/// Splits after every terminator, keeping it with the preceding text.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if is_terminator(ch) {
            let end = idx + ch.len_utf8();
            out.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Concatenates each too-short piece with the one after it. The last piece is
/// never merged.
fn merge_short(pieces: Vec<String>, min_chars: usize) -> Vec<String> {
    let mut merged = Vec::with_capacity(pieces.len());
    let mut iter = pieces.into_iter();
    while let Some(mut current) = iter.next() {
        if current.chars().count() < min_chars
            && let Some(next) = iter.next()
        {
            current.push_str(&next);
        }
        merged.push(current);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_inputs() -> Vec<String> {
        let mut inputs: Vec<String> = [
            "",
            "短",
            "你好！这是一条测试消息。",
            "a。b。c。",
            "\r\n\r\n",
            "No punctuation at all but quite a long run of words that keeps going past the limit for sure",
            "逗号，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，很多，结束。",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        // Deterministic pseudo-random mixes of letters, CJK and separators.
        let alphabet: Vec<char> = "ab 中文，,。!?\n…x、".chars().collect();
        let mut seed: u64 = 0x9e37_79b9;
        for len in [10usize, 63, 64, 65, 130, 400] {
            let mut s = String::new();
            for _ in 0..len {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                s.push(alphabet[(seed >> 33) as usize % alphabet.len()]);
            }
            inputs.push(s);
        }
        inputs.push("z".repeat(300));
        inputs
    }

    #[test]
    fn chunks_concatenate_to_input() {
        let segmenter = Segmenter::default();
        for input in sample_inputs() {
            let chunks = segmenter.segment(&input);
            assert_eq!(chunks.concat(), input);
            assert!(chunks.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(Segmenter::default().segment("").is_empty());
    }

    #[test]
    fn short_sentences_collapse_into_one_chunk() {
        let chunks = Segmenter::default().segment("你好！这是一条测试消息。");
        assert_eq!(chunks, vec!["你好！这是一条测试消息。"]);
    }

    #[test]
    fn merge_pass_pairs_a_short_piece_with_its_successor_only() {
        let chunks = Segmenter::default().segment("a。b。c。");
        assert_eq!(chunks, vec!["a。b。", "c。"]);
    }

    #[test]
    fn long_runs_without_boundaries_are_force_cut() {
        let chunks = Segmenter::default().segment(&"z".repeat(150));
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![64, 64, 22]);
    }

    #[test]
    fn long_runs_cut_after_last_soft_separator() {
        let text = format!("{} {}", "a".repeat(30), "b".repeat(39));
        let chunks = Segmenter::default().segment(&text);
        assert_eq!(chunks, vec![format!("{} ", "a".repeat(30)), "b".repeat(39)]);
    }

    #[test]
    fn soft_separator_before_minimum_is_ignored() {
        let text = format!("{}，{}", "中".repeat(10), "文".repeat(80));
        let chunks = Segmenter::default().segment(&text);
        assert_eq!(chunks[0].chars().count(), 64);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn unmerged_chunks_respect_the_maximum() {
        let segmenter = Segmenter::new(4, 16);
        for input in sample_inputs() {
            let chunks = segmenter.segment(&input);
            let with_min = Segmenter::new(0, 16).segment(&input);
            assert!(with_min.iter().all(|c| c.chars().count() <= 16));
            assert_eq!(chunks.concat(), input);
        }
    }

    #[test]
    fn crlf_line_breaks_stay_in_the_text() {
        let chunks = Segmenter::new(0, 64).segment("one\r\ntwo");
        assert_eq!(chunks, vec!["one\r", "\n", "two"]);
    }
}
