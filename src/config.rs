//! Configuration for the tokenizer and the trainer.

use serde::{Deserialize, Serialize};

/// A sentence-level annotation type declared for a model, with its closed set
/// of admissible values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceAnnotationType {
    pub name:   String,
    pub values: Vec<String>,
}

/// Model options.
///
/// These are baked into the trained model and control both encoding and
/// decoding; the two sides must agree on every option.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Options {
    /// Mark the last piece of each word with a word-end factor, mirroring the
    /// word-begin factor.
    pub right_word_glue: bool,
    /// Distinguish word-initial pieces (prefixed with U+2581 in the lemma)
    /// from word-internal pieces (carrying the word-internal factor).
    pub distinguish_initial_and_internal_pieces: bool,
    /// Split Han text into single characters before the piece oracle.
    pub split_han: bool,
    /// Give single-letter words a dedicated single-letter case factor instead
    /// of the regular capitalization factor.
    pub single_letter_case_factors: bool,
    /// Promote initial-capital single letters inside all-caps runs to
    /// all-caps.
    pub context_dependent_single_letter_cap: bool,
    /// Serialize class indices and unrepresentable characters as digit token
    /// runs instead of factors.
    pub serialize_indices_and_unrepresentables: bool,
    /// Encode phrase fixes inline as a source run followed by its replacement
    /// run, instead of a single class token.
    pub inline_fixes: bool,
    /// Delimit inline fixes with reserved tag tokens instead of inline-fix
    /// factors.
    pub inline_fix_use_tags: bool,
    /// Declared sentence-level annotation types.
    #[serde(default)]
    pub sentence_annotations: Vec<SentenceAnnotationType>,
}

/// Errors returned when options fail to validate.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum OptionsError {
    #[error("inline_fix_use_tags requires inline_fixes")]
    TagsWithoutInlineFixes,
    #[error("sentence annotation type {0:?} declared twice")]
    DuplicateAnnotationType(String),
}

impl Options {
    /// Validates the options.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.inline_fix_use_tags && !self.inline_fixes {
            return Err(OptionsError::TagsWithoutInlineFixes);
        }
        for (i, annotation) in self.sentence_annotations.iter().enumerate() {
            if self.sentence_annotations[..i].iter().any(|a| a.name == annotation.name) {
                return Err(OptionsError::DuplicateAnnotationType(annotation.name.clone()));
            }
        }
        Ok(())
    }
}

/// Options for training a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerOptions {
    /// Target piece vocabulary size for the oracle.
    pub vocab_size: usize,
    /// Pieces occurring less often than this are dropped from the oracle
    /// vocabulary by retraining with a reduced size.
    pub min_piece_count: u64,
    /// Single-character lemmas observed less often than this become
    /// unrepresentable.
    pub min_char_count: u64,
    /// Fraction of character occurrences the oracle vocabulary must cover.
    pub character_coverage: f64,
    /// Cap on the number of corpus lines consumed; zero means all.
    pub training_sentence_size: usize,
    /// Train a piece oracle. When false the model splits nothing and whole
    /// pre-tokens are pieces.
    pub use_piece_oracle: bool,
    /// Seed for the deterministic parts of training.
    pub seed: u64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            vocab_size: 32000,
            min_piece_count: 0,
            min_char_count: 1,
            character_coverage: 1.0,
            training_sentence_size: 0,
            use_piece_oracle: true,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let mut options = Options::default();
        assert!(options.validate().is_ok());
        options.inline_fix_use_tags = true;
        assert!(options.validate().is_err());
        options.inline_fixes = true;
        assert!(options.validate().is_ok());
        options.sentence_annotations = vec![
            SentenceAnnotationType { name: "domain".into(), values: vec!["news".into()] },
            SentenceAnnotationType { name: "domain".into(), values: vec!["chat".into()] },
        ];
        assert!(options.validate().is_err());
    }
}
