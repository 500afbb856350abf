//! Tokens as slices of the input line.
//!
//! A token tracks two ranges: the underlying text, which is what gets encoded,
//! and the original range in the input line, which survives substitutions so
//! that alignment consumers can map back to source characters.

use core::ops::Range;

use crate::factor::{ClassKind, Factors, InlineFix};

/// The class lemma a class token stands for, chosen from the nature of its
/// replacement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassLemma {
    Word,
    WordWoCase,
    ContinuousScript,
    Punctuation,
}

impl ClassLemma {
    #[inline(always)]
    pub fn as_str(self) -> &'static str {
        match self {
            ClassLemma::Word => "{word}",
            ClassLemma::WordWoCase => "{word-wo-case}",
            ClassLemma::ContinuousScript => "{continuousScript}",
            ClassLemma::Punctuation => "{punctuation}",
        }
    }
}

/// The underlying text of a token: a range of the input line, or substitute
/// text installed by an annotation or a pseudo token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Underlying {
    Line(Range<usize>),
    Synthetic(String),
}

/// One token of a sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    orig:  Range<usize>,
    under: Underlying,

    /// The factor tuple, filled in by the factorizer.
    pub factors: Factors,
    /// Class information for tokens standing in for an annotated span.
    pub class: Option<(ClassKind, u8, ClassLemma)>,
    /// Which half of an inline fix the token belongs to, if any.
    pub inline: Option<InlineFix>,
    /// Reserved tag lemma emitted verbatim, carrying no factors.
    pub tag: Option<&'static str>,
    /// Whether this is a space token elided by the factorizer.
    pub elided: bool,
}

impl Token {
    /// A token covering a range of the input line.
    pub fn slice(range: Range<usize>) -> Self {
        Self {
            orig:    range.clone(),
            under:   Underlying::Line(range),
            factors: Factors::default(),
            class:   None,
            inline:  None,
            tag:     None,
            elided:  false,
        }
    }

    /// A tag token with a zero-length original range at the given position.
    pub fn tag_at(position: usize, tag: &'static str) -> Self {
        Self {
            orig:    position..position,
            under:   Underlying::Synthetic(String::new()),
            factors: Factors::default(),
            class:   None,
            inline:  None,
            tag:     Some(tag),
            elided:  false,
        }
    }

    /// The original character range of the token in the input line.
    #[inline(always)]
    pub fn orig(&self) -> Range<usize> {
        self.orig.clone()
    }

    /// The underlying text of the token.
    #[inline(always)]
    pub fn text<'a>(&'a self, line: &'a str) -> &'a str {
        match &self.under {
            Underlying::Line(range) => &line[range.clone()],
            Underlying::Synthetic(text) => text,
        }
    }

    #[inline(always)]
    pub fn is_empty(&self, line: &str) -> bool {
        self.text(line).is_empty()
    }

    /// Narrows the token to a byte range of its underlying text.
    ///
    /// The original range narrows along only while the underlying text still
    /// refers to the input line; substituted text keeps the full original
    /// range on every piece.
    pub fn narrow(&self, offset: usize, length: usize) -> Self {
        let mut narrowed = self.clone();
        match &self.under {
            Underlying::Line(range) => {
                let start = range.start + offset;
                narrowed.under = Underlying::Line(start..start + length);
                narrowed.orig = start..start + length;
            }
            Underlying::Synthetic(text) => {
                narrowed.under = Underlying::Synthetic(text[offset..offset + length].to_string());
            }
        }
        narrowed
    }

    /// Installs substitute underlying text, freezing the original range.
    pub fn override_as_if(&self, text: impl Into<String>) -> Self {
        let mut replaced = self.clone();
        replaced.under = Underlying::Synthetic(text.into());
        replaced
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_line() {
        let line = "hello world";
        let token = Token::slice(0..5);
        let narrowed = token.narrow(1, 3);
        assert_eq!(narrowed.text(line), "ell");
        assert_eq!(narrowed.orig(), 1..4);
    }

    #[test]
    fn test_narrow_override() {
        let line = "colour";
        let token = Token::slice(0..6).override_as_if("color");
        assert_eq!(token.text(line), "color");
        assert_eq!(token.orig(), 0..6);
        let narrowed = token.narrow(2, 3);
        assert_eq!(narrowed.text(line), "lor");
        assert_eq!(narrowed.orig(), 0..6, "narrowing substitute text keeps the original range");
    }

    #[test]
    fn test_tag_at() {
        let line = "abc";
        let tag = Token::tag_at(3, "<IOPEN>");
        assert_eq!(tag.orig(), 3..3);
        assert_eq!(tag.text(line), "");
        assert_eq!(tag.tag, Some("<IOPEN>"));
    }
}
