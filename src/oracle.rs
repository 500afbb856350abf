//! The piece oracle: the subword model behind word splitting.
//!
//! Any subword model can serve as the oracle; the only contract is that it
//! cuts a word into pieces at byte offsets. Splits are memoized in a bounded
//! cache shared by all encode calls.

use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::pretokenize::WORD_BEG_MARK;

mod unigram;

pub use unigram::*;

/// Byte offsets cutting a word into pieces: `0 = c₀ < c₁ < … < cₖ = len`.
pub type CutList = Vec<usize>;

/// Errors reported when the oracle misbehaves.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    /// The returned cut list does not reconstruct the input word.
    #[error("piece oracle cuts {cuts:?} do not reconstruct {word:?}")]
    Misaligned { word: String, cuts: Vec<usize> },
}

/// A subword model that cuts words into pieces.
///
/// `None` is the compact encoding of "no split", equivalent to `[0, len]`.
/// Characters the model cannot represent must be cut at every code point.
pub trait PieceOracle: Send + Sync {
    fn split(&self, word: &str) -> Option<CutList>;
}

/// Splits a word through the cache and the oracle.
///
/// When `adjust_for_word_beg_prefix` is set, the word is prefixed with U+2581
/// before querying the oracle, and every returned cut point is shifted back
/// so that offsets reference the caller's word.
pub(crate) fn split_cached(
    oracle: &dyn PieceOracle, cache: &SplitCache, word: &str, adjust_for_word_beg_prefix: bool,
) -> Result<Option<CutList>, OracleError> {
    if word.starts_with(' ') || word.chars().take(2).count() <= 1 {
        return Ok(None);
    }
    let query = if adjust_for_word_beg_prefix {
        let mut query = String::with_capacity(word.len() + WORD_BEG_MARK.len_utf8());
        query.push(WORD_BEG_MARK);
        query.push_str(word);
        query
    } else {
        word.to_string()
    };
    let raw = match cache.get(&query) {
        Some(cached) => cached,
        None => {
            let cuts = oracle.split(&query);
            if let Some(cuts) = &cuts {
                validate_cuts(&query, cuts)?;
            }
            cache.insert(query.clone(), cuts.clone());
            cuts
        }
    };
    let cuts = match raw {
        Some(cuts) => cuts,
        None => return Ok(None),
    };
    if !adjust_for_word_beg_prefix {
        return Ok(if cuts.len() <= 2 { None } else { Some(cuts) });
    }
    let prefix = WORD_BEG_MARK.len_utf8();
    let mut adjusted = Vec::with_capacity(cuts.len());
    adjusted.push(0);
    for &cut in &cuts {
        if cut > prefix && cut < query.len() {
            adjusted.push(cut - prefix);
        }
    }
    adjusted.push(word.len());
    Ok(if adjusted.len() <= 2 { None } else { Some(adjusted) })
}

/// Checks that a cut list tiles the word at character boundaries.
fn validate_cuts(word: &str, cuts: &[usize]) -> Result<(), OracleError> {
    let misaligned = || OracleError::Misaligned { word: word.to_string(), cuts: cuts.to_vec() };
    if cuts.first() != Some(&0) || cuts.last() != Some(&word.len()) {
        return Err(misaligned());
    }
    for pair in cuts.windows(2) {
        if pair[0] >= pair[1] {
            return Err(misaligned());
        }
    }
    if cuts.iter().any(|&cut| !word.is_char_boundary(cut)) {
        return Err(misaligned());
    }
    Ok(())
}

/// Bounded memoization of oracle splits, keyed by the exact query string.
///
/// Inserts are insert-if-absent under a write lock. Once the cache reaches its
/// limit it transitions to a full state and never takes the write lock again,
/// so all further accesses are uncontended reads.
#[derive(Debug)]
pub(crate) struct SplitCache {
    map:   RwLock<HashMap<String, Option<CutList>>>,
    limit: usize,
    full:  AtomicBool,
}

impl SplitCache {
    /// Default number of cached splits.
    pub(crate) const DEFAULT_LIMIT: usize = 1 << 20;

    pub(crate) fn new(limit: usize) -> Self {
        Self {
            map:   RwLock::new(HashMap::new()),
            limit: limit.max(1),
            full:  AtomicBool::new(false),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<Option<CutList>> {
        self.map.read().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: String, value: Option<CutList>) {
        if self.full.load(Ordering::Relaxed) {
            return;
        }
        let mut map = self.map.write();
        if map.len() >= self.limit {
            self.full.store(true, Ordering::Relaxed);
            return;
        }
        map.entry(key).or_insert(value);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.map.read().len()
    }
}
