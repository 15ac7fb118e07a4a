//! Suggestion list model.
//!
//! Holds the ranked, deduplicated candidates for the current query plus
//! one synthetic trailing "create new" entry, and a keyboard cursor the
//! host drives with Up/Down/Enter/Escape. Pure state: no timers, no
//! network.
//!
//! Dedup rule when candidates arrive from multiple sources: two records
//! are the same entity if their tax ids match, or (name, locality) match
//! case-insensitively, or their internal ids match. First-seen wins.

use unicode_normalization::UnicodeNormalization;

use crate::types::{Candidate, SourceKind};

/// One row in the suggestion surface.
#[derive(Debug, Clone)]
pub enum SuggestionEntry {
    Candidate(Candidate),
    /// "Create new party using the current query" trailing row.
    CreateNew { query: String },
}

/// What Enter committed.
#[derive(Debug, Clone)]
pub enum Commit {
    Selected(Candidate),
    CreateNew(String),
}

/// Lowercased, Unicode-decomposed, alphanumeric-only key for matching
/// names and localities across sources.
pub fn normalize_match_key(value: &str) -> String {
    value
        .nfkd()
        .filter(char::is_ascii_alphanumeric)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether two candidates refer to the same underlying entity.
pub fn same_entity(a: &Candidate, b: &Candidate) -> bool {
    if !a.tax_id.is_empty() && !b.tax_id.is_empty() && a.tax_id.eq_ignore_ascii_case(&b.tax_id) {
        return true;
    }

    if a.source_kind == SourceKind::Internal
        && b.source_kind == SourceKind::Internal
        && a.id == b.id
    {
        return true;
    }

    let name_a = normalize_match_key(&a.display_name);
    if !name_a.is_empty()
        && name_a == normalize_match_key(&b.display_name)
        && normalize_match_key(&a.locality) == normalize_match_key(&b.locality)
    {
        return true;
    }

    false
}

/// Drop later duplicates, keeping the first occurrence of each entity.
pub fn dedupe_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !kept.iter().any(|k| same_entity(k, &candidate)) {
            kept.push(candidate);
        }
    }
    kept
}

/// Relevance of one candidate to the query. Exact beats prefix beats
/// substring beats fuzzy; contact-field hits score below any name hit;
/// internal parties win ties over external companies.
fn relevance(candidate: &Candidate, query: &str) -> f64 {
    let query_lower = query.to_lowercase();
    let name_lower = candidate.display_name.to_lowercase();

    let mut score = if !name_lower.is_empty() && name_lower == query_lower {
        100.0
    } else if name_lower.starts_with(&query_lower) {
        75.0
    } else if name_lower.contains(&query_lower) {
        50.0
    } else {
        let jw = strsim::jaro_winkler(&name_lower, &query_lower);
        if jw >= 0.85 {
            40.0 * jw
        } else {
            0.0
        }
    };

    if score == 0.0
        && (candidate.phone.contains(&query_lower)
            || candidate.company_name.to_lowercase().contains(&query_lower)
            || candidate.tax_id.to_lowercase().contains(&query_lower))
    {
        score = 30.0;
    }

    if candidate.source_kind == SourceKind::Internal {
        score += 1.0;
    }

    score
}

/// Sort candidates by relevance to the query, best first. Stable, so
/// directory order breaks remaining ties.
pub fn rank_candidates(candidates: &mut [Candidate], query: &str) {
    let mut scored: Vec<(f64, Candidate)> = candidates
        .iter()
        .cloned()
        .map(|c| (relevance(&c, query), c))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    for (slot, (_, candidate)) in candidates.iter_mut().zip(scored) {
        *slot = candidate;
    }
}

/// The list plus its cursor. Cursor -1 means nothing highlighted.
#[derive(Debug)]
pub struct SuggestionList {
    entries: Vec<SuggestionEntry>,
    cursor: isize,
}

impl Default for SuggestionList {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: -1,
        }
    }

    /// Replace the list contents for a fresh lookup result: dedup, rank,
    /// and append the synthetic entry when the query is long enough to
    /// have triggered a lookup. Resets the cursor.
    pub fn rebuild(&mut self, candidates: Vec<Candidate>, query: &str, min_query_len: usize) {
        let mut deduped = dedupe_candidates(candidates);
        rank_candidates(&mut deduped, query);

        self.entries = deduped.into_iter().map(SuggestionEntry::Candidate).collect();
        if query.trim().chars().count() >= min_query_len {
            self.entries.push(SuggestionEntry::CreateNew {
                query: query.trim().to_string(),
            });
        }
        self.cursor = -1;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = -1;
    }

    pub fn entries(&self) -> &[SuggestionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    /// Move the cursor down one row, clamped at the last entry.
    pub fn move_down(&mut self) {
        if self.entries.is_empty() {
            self.cursor = -1;
            return;
        }
        self.cursor = (self.cursor + 1).min(self.entries.len() as isize - 1);
    }

    /// Move the cursor up one row, clamped at the first entry. From -1
    /// (nothing highlighted) Up stays put; there is no wraparound.
    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Enter: commit the entry at the cursor. Committing clears the
    /// list. With no highlight there is nothing to commit.
    pub fn commit(&mut self) -> Option<Commit> {
        if self.cursor < 0 || self.cursor as usize >= self.entries.len() {
            return None;
        }
        let commit = match &self.entries[self.cursor as usize] {
            SuggestionEntry::Candidate(c) => Commit::Selected(c.clone()),
            SuggestionEntry::CreateNew { query } => Commit::CreateNew(query.clone()),
        };
        self.clear();
        Some(commit)
    }

    /// Escape clears without committing.
    pub fn on_escape(&mut self) {
        self.clear();
    }

    /// Blur clears unless focus landed on the suggestion surface itself.
    pub fn on_blur(&mut self, landed_on_surface: bool) {
        if !landed_on_surface {
            self.clear();
        }
    }
}
