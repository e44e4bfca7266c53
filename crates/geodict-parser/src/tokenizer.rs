use std::collections::HashMap;

use geodict_types::{PulledWord, pull_word};

/// Per-scan state: the text as characters plus every word pulled so far,
/// keyed by the index the pull started from.
///
/// One context belongs to one `find_locations` call; matchers re-pull the
/// same positions many times and hit the memo instead of rescanning.
#[derive(Debug)]
pub struct ScanContext {
    chars: Vec<char>,
    memo: HashMap<isize, PulledWord>,
}

impl ScanContext {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            memo: HashMap::new(),
        }
    }

    /// Length of the text in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Pull the word ending at or before `index`, skipping trailing
    /// boundary characters. Repeated calls with the same index are served
    /// from the memo.
    pub fn pull_word_backward(&mut self, index: isize) -> PulledWord {
        if let Some(hit) = self.memo.get(&index) {
            return hit.clone();
        }
        let pulled = pull_word(&self.chars, index);
        self.memo.insert(index, pulled.clone());
        pulled
    }

    /// Characters `start..end` as a string.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}
