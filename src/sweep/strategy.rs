//! Batch planning strategies.
//!
//! Each scanning strategy is a [`BatchPlanner`]: it produces the next
//! batch query, observes each completed batch, and declares whether a
//! failed batch ends the sweep or just skips that batch. The
//! orchestrator owns the loop skeleton; planners own the per-strategy
//! query and termination policy.

use crate::core::types::StrategyKind;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};

/// Page size for full-collection batches (exhaustive and recent-first).
pub(crate) const CURSOR_PAGE_SIZE: u64 = 100;

/// Page size for `name_contains`-filtered batches.
pub(crate) const FILTER_PAGE_SIZE: u64 = 200;

/// The alphabet swept by [`StrategyKind::AlphabetSweep`]: a-z then 0-9.
pub(crate) const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// What a failed batch request means for the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Later batches depend on this one; end the sweep.
    FatalToSweep,
    /// Batches are independent; skip this one and continue.
    SkipBatch,
}

/// A completed batch as seen by a planner.
#[derive(Debug, Clone)]
pub struct BatchView {
    /// Number of records the batch returned.
    pub count: usize,
    /// Server-provided cursor for the next page, when present and
    /// non-falsy.
    pub next_cursor: Option<String>,
}

/// The per-strategy half of the batch loop.
///
/// The orchestrator calls [`next_query`](Self::next_query) until it
/// returns `None` or the batch budget is exhausted, feeding every
/// completed batch back through [`observe`](Self::observe).
pub trait BatchPlanner: Send {
    /// Returns the query for the next batch, or `None` when the
    /// strategy has nothing left to ask.
    fn next_query(&mut self) -> Option<Vec<(String, Value)>>;

    /// Records the outcome of a completed batch.
    fn observe(&mut self, batch: &BatchView);

    /// How a failed batch request is handled.
    fn failure_mode(&self) -> FailureMode;
}

/// Creates the planner for a strategy and search term.
pub fn planner_for(kind: StrategyKind, search_term: &str) -> Box<dyn BatchPlanner> {
    match kind {
        StrategyKind::ExhaustiveScan => Box::new(ExhaustivePlanner::new()),
        StrategyKind::KeywordChunks => Box::new(KeywordChunksPlanner::new(search_term)),
        StrategyKind::AlphabetSweep => Box::new(AlphabetPlanner::new()),
        StrategyKind::RecentFirst => Box::new(RecentFirstPlanner::new()),
    }
}

/// Walks the whole collection by following the server cursor.
///
/// Batches are sequentially dependent, so a failed request ends the
/// sweep.
#[derive(Debug, Default)]
struct ExhaustivePlanner {
    cursor: Option<String>,
    exhausted: bool,
}

impl ExhaustivePlanner {
    fn new() -> Self {
        Self::default()
    }
}

impl BatchPlanner for ExhaustivePlanner {
    fn next_query(&mut self) -> Option<Vec<(String, Value)>> {
        if self.exhausted {
            return None;
        }
        let mut query = vec![("limit".to_string(), json!(CURSOR_PAGE_SIZE))];
        if let Some(cursor) = &self.cursor {
            query.push(("cursor".to_string(), json!(cursor)));
        }
        Some(query)
    }

    fn observe(&mut self, batch: &BatchView) {
        match &batch.next_cursor {
            Some(cursor) => self.cursor = Some(cursor.clone()),
            None => self.exhausted = true,
        }
    }

    fn failure_mode(&self) -> FailureMode {
        FailureMode::FatalToSweep
    }
}

/// Issues one `name_contains` query per derived substring of the term.
#[derive(Debug)]
struct KeywordChunksPlanner {
    chunks: VecDeque<String>,
}

impl KeywordChunksPlanner {
    fn new(search_term: &str) -> Self {
        Self {
            chunks: keyword_chunks(search_term).into(),
        }
    }
}

impl BatchPlanner for KeywordChunksPlanner {
    fn next_query(&mut self) -> Option<Vec<(String, Value)>> {
        let chunk = self.chunks.pop_front()?;
        Some(vec![
            ("name_contains".to_string(), json!(chunk)),
            ("limit".to_string(), json!(FILTER_PAGE_SIZE)),
        ])
    }

    fn observe(&mut self, _batch: &BatchView) {}

    fn failure_mode(&self) -> FailureMode {
        FailureMode::SkipBatch
    }
}

/// Issues one `name_contains` query per alphabet symbol.
#[derive(Debug, Default)]
struct AlphabetPlanner {
    index: usize,
}

impl AlphabetPlanner {
    fn new() -> Self {
        Self::default()
    }
}

impl BatchPlanner for AlphabetPlanner {
    fn next_query(&mut self) -> Option<Vec<(String, Value)>> {
        let symbol = ALPHABET.chars().nth(self.index)?;
        self.index += 1;
        Some(vec![
            ("name_contains".to_string(), json!(symbol.to_string())),
            ("limit".to_string(), json!(FILTER_PAGE_SIZE)),
        ])
    }

    fn observe(&mut self, _batch: &BatchView) {}

    fn failure_mode(&self) -> FailureMode {
        FailureMode::SkipBatch
    }
}

/// Re-fetches the head of the collection up to the batch budget.
///
/// Relies on the upstream API returning most-recent-first by default;
/// that ordering is an assumption about the server, not a contract, and
/// no sort parameter is sent. Batches repeat the same query, so a
/// failed request ends the sweep.
#[derive(Debug, Default)]
struct RecentFirstPlanner {
    done: bool,
}

impl RecentFirstPlanner {
    fn new() -> Self {
        Self::default()
    }
}

impl BatchPlanner for RecentFirstPlanner {
    fn next_query(&mut self) -> Option<Vec<(String, Value)>> {
        if self.done {
            return None;
        }
        Some(vec![("limit".to_string(), json!(CURSOR_PAGE_SIZE))])
    }

    fn observe(&mut self, batch: &BatchView) {
        if batch.count == 0 {
            self.done = true;
        }
    }

    fn failure_mode(&self) -> FailureMode {
        FailureMode::FatalToSweep
    }
}

/// Derives the `name_contains` chunks for a search term: every
/// contiguous 3-character window, then the first and second half
/// (split at the character midpoint, floored). Empty chunks are
/// dropped and duplicates keep their first occurrence.
pub fn keyword_chunks(search_term: &str) -> Vec<String> {
    let chars: Vec<char> = search_term.chars().collect();
    let mut chunks: Vec<String> = Vec::new();

    for window in chars.windows(3) {
        chunks.push(window.iter().collect());
    }
    let mid = chars.len() / 2;
    chunks.push(chars[..mid].iter().collect());
    chunks.push(chars[mid..].iter().collect());

    let mut seen = HashSet::new();
    chunks.retain(|chunk| !chunk.is_empty() && seen.insert(chunk.clone()));
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries(planner: &mut dyn BatchPlanner, budget: usize) -> Vec<Vec<(String, Value)>> {
        let mut out = Vec::new();
        while out.len() < budget {
            match planner.next_query() {
                Some(query) => out.push(query),
                None => break,
            }
        }
        out
    }

    #[test]
    fn test_keyword_chunks_for_odd_length_term() {
        // Windows abc/bcd/cde, halves ab/cde; the duplicate cde is
        // collapsed onto its first occurrence.
        assert_eq!(keyword_chunks("abcde"), vec!["abc", "bcd", "cde", "ab"]);
    }

    #[test]
    fn test_keyword_chunks_for_even_length_term() {
        // Both halves (abc, def) already appear among the windows.
        assert_eq!(keyword_chunks("abcdef"), vec!["abc", "bcd", "cde", "def"]);
    }

    #[test]
    fn test_keyword_chunks_for_short_terms() {
        assert_eq!(keyword_chunks("ab"), vec!["a", "b"]);
        assert_eq!(keyword_chunks("a"), vec!["a"]);
    }

    #[test]
    fn test_keyword_chunks_is_char_based() {
        // Multi-byte characters split on char boundaries, not bytes.
        let chunks = keyword_chunks("héllo");
        assert_eq!(chunks, vec!["hél", "éll", "llo", "hé"]);
    }

    #[test]
    fn test_exhaustive_planner_follows_cursor_then_stops() {
        let mut planner = ExhaustivePlanner::new();

        let first = planner.next_query().unwrap();
        assert!(!first.iter().any(|(k, _)| k == "cursor"));

        planner.observe(&BatchView {
            count: 100,
            next_cursor: Some("p2".to_string()),
        });
        let second = planner.next_query().unwrap();
        assert!(second.contains(&("cursor".to_string(), json!("p2"))));

        planner.observe(&BatchView {
            count: 50,
            next_cursor: None,
        });
        assert!(planner.next_query().is_none());
        assert_eq!(planner.failure_mode(), FailureMode::FatalToSweep);
    }

    #[test]
    fn test_recent_first_planner_stops_on_empty_batch() {
        let mut planner = RecentFirstPlanner::new();
        assert!(planner.next_query().is_some());

        planner.observe(&BatchView {
            count: 100,
            next_cursor: None,
        });
        assert!(planner.next_query().is_some());

        planner.observe(&BatchView {
            count: 0,
            next_cursor: None,
        });
        assert!(planner.next_query().is_none());
    }

    #[test]
    fn test_alphabet_planner_covers_exactly_36_symbols() {
        let mut planner = AlphabetPlanner::new();
        let all = queries(&mut planner, 100);
        assert_eq!(all.len(), 36);
        assert!(all[0].contains(&("name_contains".to_string(), json!("a"))));
        assert!(all[25].contains(&("name_contains".to_string(), json!("z"))));
        assert!(all[26].contains(&("name_contains".to_string(), json!("0"))));
        assert!(all[35].contains(&("name_contains".to_string(), json!("9"))));
        assert_eq!(planner.failure_mode(), FailureMode::SkipBatch);
    }

    #[test]
    fn test_keyword_planner_exhausts_its_chunk_set() {
        let mut planner = KeywordChunksPlanner::new("abcde");
        let all = queries(&mut planner, 100);
        assert_eq!(all.len(), 4);
        assert!(all[0].contains(&("name_contains".to_string(), json!("abc"))));
        assert!(all
            .iter()
            .all(|q| q.contains(&("limit".to_string(), json!(FILTER_PAGE_SIZE)))));
    }
}
