//! Caller-supplied span annotations: phrase fixes and text substitutions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::factor::{ClassKind, MAX_INDEX};

/// What to do with an annotated span.
///
/// `encode_as_if` substitutes the underlying text for the range while keeping
/// the original range; an empty substitute deletes the range. `decode_as` is
/// the surface form the decoder must produce for a class span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanInstructions {
    pub decode_as:    Option<String>,
    pub encode_as_if: Option<String>,
}

/// An annotation over a character range of the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedSpan {
    /// Byte offset of the span start in the line.
    pub start: usize,
    /// Byte length of the span.
    pub length: usize,
    /// The class the span is encoded as; spans without a class only carry
    /// their instructions.
    pub class: Option<ClassKind>,
    pub instructions: SpanInstructions,
}

impl AnnotatedSpan {
    /// A phrase-fix span forcing the decoder to produce `decode_as`.
    pub fn phrase_fix(start: usize, length: usize, decode_as: impl Into<String>) -> Self {
        Self {
            start,
            length,
            class: Some(ClassKind::PhraseFix),
            instructions: SpanInstructions {
                decode_as:    Some(decode_as.into()),
                encode_as_if: None,
            },
        }
    }

    /// A deletion span, e.g. an HTML tag that must not reach the encoder.
    pub fn deletion(start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            class: None,
            instructions: SpanInstructions {
                decode_as:    None,
                encode_as_if: Some(String::new()),
            },
        }
    }

    /// A substitution span encoding the range as if it read `text`.
    pub fn encode_as_if(start: usize, length: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            length,
            class: None,
            instructions: SpanInstructions {
                decode_as:    None,
                encode_as_if: Some(text.into()),
            },
        }
    }

    #[inline(always)]
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Errors for invalid span annotations.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnnotationError {
    /// Two spans overlap.
    #[error("overlapping annotated spans at byte {0}")]
    Overlap(usize),
    /// A class span has no replacement text to decode as.
    #[error("class span at byte {0} has no replacement text")]
    EmptyReplacement(usize),
    /// A span exceeds the line.
    #[error("annotated span {0}..{1} exceeds the line length {2}")]
    OutOfBounds(usize, usize, usize),
    /// A span boundary is not a character boundary.
    #[error("annotated span boundary at byte {0} splits a character")]
    SplitsCharacter(usize),
    /// A sentence annotation type is not declared in the model options.
    #[error("undeclared sentence annotation type {0:?}")]
    UndeclaredAnnotation(String),
}

/// Deterministic assignment of class indices.
///
/// Indices are drawn from a seeded generator with linear probing, so that the
/// source and target sides of a sentence pair assign matching indices when
/// they share a seed. Once all indices are taken, further requests fail and
/// the caller drops the span.
#[derive(Debug)]
pub(crate) struct IndexAllocator {
    taken: [bool; MAX_INDEX as usize],
    rng:   StdRng,
}

impl IndexAllocator {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            taken: [false; MAX_INDEX as usize],
            rng:   StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn allocate(&mut self) -> Option<u8> {
        let candidate = self.rng.gen_range(0..MAX_INDEX as usize);
        for probe in 0..MAX_INDEX as usize {
            let index = (candidate + probe) % MAX_INDEX as usize;
            if !self.taken[index] {
                self.taken[index] = true;
                return Some(index as u8);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_deterministic() {
        let mut a = IndexAllocator::new(42);
        let mut b = IndexAllocator::new(42);
        for _ in 0..8 {
            assert_eq!(a.allocate(), b.allocate());
        }
    }

    #[test]
    fn test_allocator_exhausts() {
        let mut allocator = IndexAllocator::new(7);
        let mut seen = [false; MAX_INDEX as usize];
        for _ in 0..MAX_INDEX {
            let index = allocator.allocate().unwrap();
            assert!(!seen[index as usize], "index {} assigned twice", index);
            seen[index as usize] = true;
        }
        assert_eq!(allocator.allocate(), None);
    }
}
