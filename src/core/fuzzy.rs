//! Fuzzy ranking of a search query against one field value.
//!
//! Tiers follow the usual match-sorter ladder: exact matches beat prefixes,
//! prefixes beat word starts, word starts beat substrings, substrings beat
//! acronyms, and an ordered subsequence is the weakest passing match.

/// Strength of a match, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// Query characters not found in order.
    NoMatch,
    /// Query characters found in order with gaps.
    Matches,
    /// Query equals the initials of the target's words.
    Acronym,
    /// Query occurs anywhere in the target.
    Contains,
    /// Query starts one of the target's words.
    WordStartsWith,
    /// Target starts with the query.
    StartsWith,
    /// Case-folded equality.
    Equal,
    /// Exact equality.
    CaseSensitiveEqual,
}

/// Result of ranking one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranking {
    /// Matched tier.
    pub tier: MatchTier,
    /// Tier plus a fraction in `[0, 1)` rewarding tight subsequence matches.
    pub score: f64,
    /// True when the tier reaches the passing threshold.
    pub passed: bool,
}

impl Ranking {
    fn at(tier: MatchTier, closeness: f64) -> Self {
        Self {
            tier,
            score: tier as u8 as f64 + closeness,
            passed: tier >= PASS_THRESHOLD,
        }
    }
}

/// Weakest tier that still counts as a match.
pub const PASS_THRESHOLD: MatchTier = MatchTier::Matches;

/// Ranks `target` against `query`. An empty query passes everything.
pub fn rank(target: &str, query: &str) -> Ranking {
    if query.is_empty() {
        return Ranking::at(MatchTier::CaseSensitiveEqual, 0.0);
    }
    if target == query {
        return Ranking::at(MatchTier::CaseSensitiveEqual, 0.0);
    }

    let target_lower = target.to_lowercase();
    let query_lower = query.to_lowercase();

    if target_lower == query_lower {
        return Ranking::at(MatchTier::Equal, 0.0);
    }
    if target_lower.starts_with(&query_lower) {
        return Ranking::at(MatchTier::StartsWith, 0.0);
    }
    if target_lower.contains(&format!(" {query_lower}")) {
        return Ranking::at(MatchTier::WordStartsWith, 0.0);
    }
    if target_lower.contains(&query_lower) {
        return Ranking::at(MatchTier::Contains, 0.0);
    }
    if query_lower.chars().count() > 1 && acronym(&target_lower).contains(&query_lower) {
        return Ranking::at(MatchTier::Acronym, 0.0);
    }

    match subsequence_closeness(&target_lower, &query_lower) {
        Some(closeness) => Ranking::at(MatchTier::Matches, closeness),
        None => Ranking::at(MatchTier::NoMatch, 0.0),
    }
}

fn acronym(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter_map(|word| word.chars().next())
        .collect()
}

/// Greedy ordered match of `query` inside `target`.
///
/// Closeness is in `[0, 1)`: contiguous runs push it up, the spread between
/// the first and last matched character pushes it down.
fn subsequence_closeness(target: &str, query: &str) -> Option<f64> {
    let target: Vec<char> = target.chars().collect();
    let query: Vec<char> = query.chars().collect();
    if query.len() > target.len() {
        return None;
    }

    let mut first = None;
    let mut last = 0usize;
    let mut prev: Option<usize> = None;
    let mut contiguous = 0usize;
    let mut cursor = 0usize;

    for qc in &query {
        let offset = target[cursor..].iter().position(|tc| tc == qc)?;
        let idx = cursor + offset;
        if prev.is_some_and(|p| p + 1 == idx) {
            contiguous += 1;
        }
        first.get_or_insert(idx);
        prev = Some(idx);
        last = idx;
        cursor = idx + 1;
    }

    let first = first?;
    let spread = (last - first + 1) as f64;
    let tightness = query.len() as f64 / spread;
    let run_bonus = if query.len() > 1 {
        contiguous as f64 / (query.len() - 1) as f64
    } else {
        1.0
    };
    Some(((tightness + run_bonus) / 2.0) * 0.99)
}
