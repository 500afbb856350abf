//! In-crate unigram piece model.
//!
//! A vocabulary of scored pieces plus Viterbi segmentation: the split of a
//! word is the piece sequence with the highest total log-probability. Unknown
//! characters fall back to single-character pieces with a floor score, so
//! every word has a segmentation.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::oracle::{CutList, PieceOracle};

/// Floor log-probability for characters outside the vocabulary.
const OOV_SCORE: f32 = -30.0;

/// A trained unigram piece model.
#[derive(Debug, Clone)]
pub struct UnigramOracle {
    vocab: HashMap<String, f32>,
    max_piece_chars: usize,
}

/// Serialized form of the model: scored pieces in score order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UnigramBlob {
    pieces: Vec<(String, f32)>,
}

impl UnigramOracle {
    /// Builds the model from scored pieces.
    pub fn from_pieces(pieces: impl IntoIterator<Item = (String, f32)>) -> Self {
        let vocab: HashMap<String, f32> = pieces.into_iter().collect();
        let max_piece_chars = vocab.keys().map(|p| p.chars().count()).max().unwrap_or(1).max(1);
        Self { vocab, max_piece_chars }
    }

    /// The scored pieces in canonical order: best score first, ties by piece.
    pub fn pieces(&self) -> Vec<(String, f32)> {
        let mut pieces: Vec<(String, f32)> =
            self.vocab.iter().map(|(piece, score)| (piece.clone(), *score)).collect();
        pieces.sort_by(|(piece_a, score_a), (piece_b, score_b)| {
            score_b.partial_cmp(score_a).unwrap_or(core::cmp::Ordering::Equal).then_with(|| piece_a.cmp(piece_b))
        });
        pieces
    }

    /// The number of pieces in the vocabulary.
    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn contains(&self, piece: &str) -> bool {
        self.vocab.contains_key(piece)
    }

    /// Serializes the model for embedding in a model file.
    pub fn to_blob(&self) -> Vec<u8> {
        postcard::to_allocvec(&UnigramBlob { pieces: self.pieces() }).unwrap()
    }

    /// Deserializes a model embedded in a model file.
    pub fn from_blob(blob: &[u8]) -> Result<Self, postcard::Error> {
        let blob: UnigramBlob = postcard::from_bytes(blob)?;
        Ok(Self::from_pieces(blob.pieces))
    }
}

impl PieceOracle for UnigramOracle {
    /// Viterbi segmentation over character positions.
    #[inline(never)]
    fn split(&self, word: &str) -> Option<CutList> {
        let mut offsets: Vec<usize> = word.char_indices().map(|(i, _)| i).collect();
        offsets.push(word.len());
        let n = offsets.len() - 1;
        if n <= 1 {
            return None;
        }
        let mut best = vec![f32::MAX; n + 1];
        let mut back = vec![0usize; n + 1];
        best[0] = 0.0;
        for end in 1..=n {
            for start in (end.saturating_sub(self.max_piece_chars)..end).rev() {
                if best[start] == f32::MAX {
                    continue;
                }
                let piece = &word[offsets[start]..offsets[end]];
                let cost = match self.vocab.get(piece) {
                    Some(score) => -score,
                    // Single characters always have a path.
                    None if end - start == 1 => -OOV_SCORE,
                    None => continue,
                };
                let total = best[start] + cost;
                if total < best[end] {
                    best[end] = total;
                    back[end] = start;
                }
            }
        }
        let mut cuts = vec![word.len()];
        let mut position = n;
        while position > 0 {
            position = back[position];
            cuts.push(offsets[position]);
        }
        cuts.reverse();
        if cuts.len() <= 2 {
            None
        } else {
            Some(cuts)
        }
    }
}

/// Options for the count-based unigram trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct UnigramTrainerConfig {
    /// Target vocabulary size, single characters included.
    pub vocab_size: usize,
    /// Fraction of character occurrences the alphabet must cover.
    pub character_coverage: f64,
    /// Longest piece considered, in characters.
    pub max_piece_chars: usize,
}

impl Default for UnigramTrainerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 32000,
            character_coverage: 1.0,
            max_piece_chars: 8,
        }
    }
}

/// Trains a unigram model from word counts.
///
/// The alphabet is the smallest set of characters reaching the configured
/// coverage; the remaining vocabulary budget goes to the most frequent
/// substrings. Scores are the log relative frequencies.
pub fn train_unigram<'a>(
    counts: impl IntoIterator<Item = (&'a str, u64)>, config: &UnigramTrainerConfig,
) -> UnigramOracle {
    let mut char_counts: HashMap<String, u64> = HashMap::new();
    let mut piece_counts: HashMap<String, u64> = HashMap::new();
    for (word, count) in counts {
        let offsets: Vec<usize> = word.char_indices().map(|(i, _)| i).collect();
        let n = offsets.len();
        for start in 0..n {
            let start_byte = offsets[start];
            for end in start + 1..=n.min(start + config.max_piece_chars) {
                let end_byte = if end == n { word.len() } else { offsets[end] };
                let piece = &word[start_byte..end_byte];
                if end - start == 1 {
                    *char_counts.entry(piece.to_string()).or_insert(0) += count;
                } else {
                    *piece_counts.entry(piece.to_string()).or_insert(0) += count;
                }
            }
        }
    }

    // Alphabet by coverage: most frequent characters first.
    let mut alphabet: Vec<(String, u64)> = char_counts.into_iter().collect();
    alphabet.sort_by(|(char_a, count_a), (char_b, count_b)| {
        count_b.cmp(count_a).then_with(|| char_a.cmp(char_b))
    });
    let total_chars: u64 = alphabet.iter().map(|(_, count)| count).sum();
    let target = (total_chars as f64 * config.character_coverage).ceil() as u64;
    let mut covered = 0;
    let mut selected: Vec<(String, u64)> = Vec::new();
    for (c, count) in alphabet {
        if covered >= target && !selected.is_empty() {
            break;
        }
        covered += count;
        selected.push((c, count));
    }

    // Fill the remaining budget with the most frequent substrings.
    let budget = config.vocab_size.saturating_sub(selected.len());
    let mut candidates: Vec<(String, u64)> = piece_counts.into_iter().collect();
    candidates.sort_by(|(piece_a, count_a), (piece_b, count_b)| {
        count_b
            .cmp(count_a)
            .then_with(|| piece_b.len().cmp(&piece_a.len()))
            .then_with(|| piece_a.cmp(piece_b))
    });
    candidates.truncate(budget);
    selected.extend(candidates);

    let total: u64 = selected.iter().map(|(_, count)| count).sum::<u64>().max(1);
    let scored = selected
        .into_iter()
        .map(|(piece, count)| (piece, ((count.max(1)) as f64 / total as f64).ln() as f32));
    UnigramOracle::from_pieces(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_prefers_known_pieces() {
        let oracle = UnigramOracle::from_pieces([
            ("HELLO".to_string(), -1.0),
            ("HELL".to_string(), -2.0),
            ("O".to_string(), -3.0),
        ]);
        assert_eq!(oracle.split("HELLO"), None, "whole-word pieces win");
        let cuts = oracle.split("OHELLO").unwrap();
        assert_eq!(cuts, vec![0, 1, 6]);
    }

    #[test]
    fn test_split_oov_breaks_at_chars() {
        let oracle = UnigramOracle::from_pieces([("AB".to_string(), -1.0)]);
        let cuts = oracle.split("XYZ").unwrap();
        assert_eq!(cuts, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_split_multibyte() {
        let oracle = UnigramOracle::from_pieces([("好".to_string(), -1.0)]);
        let cuts = oracle.split("你好").unwrap();
        assert_eq!(cuts, vec![0, 3, 6]);
    }

    #[test]
    fn test_blob_round_trip() {
        let oracle = UnigramOracle::from_pieces([
            ("AB".to_string(), -1.5),
            ("C".to_string(), -0.5),
        ]);
        let restored = UnigramOracle::from_blob(&oracle.to_blob()).unwrap();
        assert_eq!(restored.pieces(), oracle.pieces());
    }

    #[test]
    fn test_trainer_keeps_alphabet() {
        let config = UnigramTrainerConfig { vocab_size: 6, ..UnigramTrainerConfig::default() };
        let oracle = train_unigram([("ABAB", 4), ("CD", 1)], &config);
        assert!(oracle.contains("A"));
        assert!(oracle.contains("B"));
        assert!(oracle.contains("C"));
        assert!(oracle.contains("D"));
        assert!(oracle.len() <= 6);
    }
}
