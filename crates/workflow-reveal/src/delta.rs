/// Byte offset into `next` where `prev` and `next` first differ.
///
/// Characters are compared from the start; the scan stops at the first
/// mismatch or at the end of the shorter string. The result is always a char
/// boundary of `next`.
pub fn common_prefix_len(prev: &str, next: &str) -> usize {
    let mut prev_chars = prev.chars();
    for (idx, ch) in next.char_indices() {
        match prev_chars.next() {
            Some(p) if p == ch => {}
            _ => return idx,
        }
    }
    next.len()
}

/// Tracks the cumulative text of a session and yields only what is new.
///
/// Upstream events report the whole text accumulated so far, so every event
/// is compared against the last snapshot instead of being appended as is.
#[derive(Debug, Default, Clone)]
pub struct DeltaTracker {
    cumulative: String,
}

impl DeltaTracker {
    /// Returns the suffix of `new_full` not covered by the common prefix with
    /// the current snapshot, updating the snapshot when it is non-empty.
    pub fn advance(&mut self, new_full: &str) -> Option<String> {
        let start = common_prefix_len(&self.cumulative, new_full);
        let delta = &new_full[start..];
        if delta.is_empty() {
            return None;
        }
        let delta = delta.to_string();
        self.cumulative = new_full.to_string();
        Some(delta)
    }

    /// The last cumulative text that produced a delta.
    pub fn cumulative(&self) -> &str {
        &self.cumulative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_len_stops_at_first_mismatch() {
        assert_eq!(common_prefix_len("", "abc"), 0);
        assert_eq!(common_prefix_len("abc", "abd"), 2);
        assert_eq!(common_prefix_len("abc", "ab"), 2);
        assert_eq!(common_prefix_len("ab", "abc"), 2);
        assert_eq!(common_prefix_len("你好", "你们"), "你".len());
    }

    #[test]
    fn extensions_reconstruct_the_full_text() {
        let mut tracker = DeltaTracker::default();
        let snapshots = ["你", "你好", "你好，世界", "你好，世界。Hello"];
        let mut shown = String::new();
        for snapshot in snapshots {
            if let Some(delta) = tracker.advance(snapshot) {
                shown.push_str(&delta);
            }
            assert_eq!(shown, snapshot);
        }
        assert_eq!(tracker.cumulative(), "你好，世界。Hello");
    }

    #[test]
    fn repeated_snapshot_yields_nothing() {
        let mut tracker = DeltaTracker::default();
        assert_eq!(tracker.advance("same").as_deref(), Some("same"));
        assert_eq!(tracker.advance("same"), None);
        assert_eq!(tracker.advance("sa"), None);
        assert_eq!(tracker.cumulative(), "same");
    }

    #[test]
    fn divergent_snapshot_starts_at_first_difference() {
        let mut tracker = DeltaTracker::default();
        tracker.advance("hello world");
        assert_eq!(tracker.advance("hello there").as_deref(), Some("there"));
        assert_eq!(tracker.cumulative(), "hello there");
    }
}
