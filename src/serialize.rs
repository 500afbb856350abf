//! The wire format: escaped lemmas with factor suffixes.
//!
//! A token serializes as `LEMMA|F1|F2|…` with the factors in canonical order;
//! tokens are space-separated on a line. Lemmas matching the special-token
//! pattern pass verbatim, everything else escapes the reserved alphabet, so
//! parsing is unambiguous in both directions.

use hashbrown::HashMap;

use crate::annotation::AnnotationError;
use crate::classify::uppercase_exact;
use crate::config::Options;
use crate::factor::{CsBeg, Factors, FactorTypeSet, WordBeg};
use crate::factorize::{nature, Nature};
use crate::pretokenize::WORD_BEG_MARK;
use crate::token::Token;

/// Reserved tags delimiting an inline fix.
pub const TAG_OPEN: &str = "<IOPEN>";
pub const TAG_DELIM: &str = "<IDELIM>";
pub const TAG_CLOSE: &str = "<ICLOSE>";

/// Terminator of a serialized digit run.
pub const DIGIT_TERMINATOR: &str = "<#>";

/// Reserved lemmas of the downstream vocabulary.
pub const LEMMA_UNK: &str = "<unk>";
pub const LEMMA_BOS: &str = "<s>";
pub const LEMMA_EOS: &str = "</s>";

/// Errors for malformed wire tokens.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum WireError {
    #[error("invalid escape in lemma {0:?}")]
    InvalidEscape(String),
    #[error("unknown factor {0:?} on token {1:?}")]
    UnknownFactor(String, String),
    #[error("empty token")]
    EmptyToken,
    #[error("factors of token {0:?} do not match its lemma")]
    InconsistentFactors(String),
}

/// Whether a lemma passes verbatim: reserved tokens in angle brackets and the
/// brace-quoted class and unknown lemmas.
#[inline(always)]
pub(crate) fn is_special_lemma(lemma: &str) -> bool {
    (lemma.starts_with('<') && lemma.chars().take(3).count() > 2) || lemma.starts_with('{')
}

// Surrogate halves U+D800..U+DFFF are also reserved on the wire, but cannot
// occur in a Rust string.
#[inline(always)]
fn needs_escape(c: char) -> bool {
    c <= '\u{20}' || matches!(c, '\\' | '|' | '_' | ':' | '#' | '<' | '>') || c == '\u{ffff}'
}

/// Escapes a lemma for the wire.
pub fn escape_lemma(lemma: &str) -> String {
    if is_special_lemma(lemma) {
        return lemma.to_string();
    }
    let mut escaped = String::with_capacity(lemma.len());
    for c in lemma.chars() {
        if needs_escape(c) {
            if (c as u32) <= 0xff {
                escaped.push_str(&format!("\\x{:02X}", c as u32));
            } else {
                escaped.push_str(&format!("\\u{:04X}", c as u32));
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Reverses [`escape_lemma`].
pub fn unescape_lemma(escaped: &str) -> Result<String, WireError> {
    if is_special_lemma(escaped) {
        return Ok(escaped.to_string());
    }
    let invalid = || WireError::InvalidEscape(escaped.to_string());
    let mut lemma = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            lemma.push(c);
            continue;
        }
        let width = match chars.next() {
            Some('x') => 2,
            Some('u') => 4,
            _ => return Err(invalid()),
        };
        let mut value = 0u32;
        for _ in 0..width {
            let digit = chars.next().and_then(|d| d.to_digit(16)).ok_or_else(invalid)?;
            value = value * 16 + digit;
        }
        lemma.push(char::from_u32(value).ok_or_else(invalid)?);
    }
    Ok(lemma)
}

/// The lemma of a digit pseudo-token, `<0>` through `<9>`.
pub fn digit_lemma(digit: u8) -> String {
    format!("<{}>", digit)
}

/// The digit of a digit pseudo-token lemma.
pub(crate) fn digit_value(lemma: &str) -> Option<u8> {
    let mut chars = lemma.chars();
    match (chars.next(), chars.next(), chars.next(), chars.next()) {
        (Some('<'), Some(digit), Some('>'), None) => digit.to_digit(10).map(|d| d as u8),
        _ => None,
    }
}

/// The `{unk,…}` lemma of an unrepresentable character carrying the given
/// factor types.
pub fn unknown_lemma(types: FactorTypeSet) -> String {
    if types.is_empty() {
        "{unk}".to_string()
    } else {
        format!("{{unk,{}}}", types)
    }
}

/// The lemma of a token, in canonical (case-normalized) form.
pub(crate) fn lemma_of(token: &Token, line: &str, options: &Options) -> String {
    if let Some(tag) = token.tag {
        return tag.to_string();
    }
    if let Some((_, _, class)) = token.class {
        return class.as_str().to_string();
    }
    let text = token.text(line);
    match nature(token, line) {
        Nature::Word | Nature::ContinuousScript => {
            let mut lemma = uppercase_exact(text);
            let begins = token.factors.word_beg == Some(WordBeg::Beg)
                || token.factors.cs_beg == Some(CsBeg::Beg);
            if options.distinguish_initial_and_internal_pieces && begins && !lemma.is_empty() {
                lemma.insert(0, WORD_BEG_MARK);
            }
            lemma
        }
        _ => text.to_string(),
    }
}

/// A serialized token together with its original range and class index.
#[derive(Debug, Clone)]
pub(crate) struct WireToken {
    pub text:  String,
    pub orig:  (usize, usize),
    pub class: Option<u8>,
}

/// Serializes a factorized token stream, sentence annotations first.
pub(crate) fn write_tokens(
    line: &str, tokens: &[Token], options: &Options,
    known: &HashMap<String, FactorTypeSet>, annotations: &[(String, String)],
) -> Result<Vec<WireToken>, AnnotationError> {
    let mut out = Vec::with_capacity(tokens.len() + annotations.len());
    for (name, value) in annotations {
        let declared = options
            .sentence_annotations
            .iter()
            .find(|a| &a.name == name)
            .filter(|a| a.values.contains(value));
        if declared.is_none() {
            return Err(AnnotationError::UndeclaredAnnotation(name.clone()));
        }
        out.push(WireToken {
            text:  format!("<SLA:{}={}>", name, value),
            orig:  (0, 0),
            class: None,
        });
    }
    let digits = options.serialize_indices_and_unrepresentables;
    for token in tokens {
        let lemma = lemma_of(token, line, options);
        let orig = (token.orig().start, token.orig().end);
        if let Some(tag) = token.tag {
            out.push(WireToken { text: tag.to_string(), orig, class: None });
            continue;
        }
        if digits && token.class.is_some() {
            // The index factor becomes a trailing digit run.
            let index = token.factors.index.unwrap_or(0);
            let mut head = token.factors;
            head.index = None;
            out.push(WireToken {
                text:  render(&lemma, &head),
                orig,
                class: Some(index),
            });
            push_digit_run(&mut out, index as u32, orig.1);
            continue;
        }
        let single = {
            let mut chars = token.text(line).chars();
            chars.next().is_some() && chars.next().is_none()
        };
        if digits && single && !known.is_empty() && token.class.is_none() {
            let bare = lemma.trim_start_matches(WORD_BEG_MARK);
            if !is_special_lemma(&lemma) && !known.contains_key(&lemma) {
                // Unrepresentable: a typed unknown head and the scalar value.
                let scalar = bare.chars().next().map(|c| c as u32).unwrap_or(0);
                out.push(WireToken {
                    text:  render(&unknown_lemma(token.factors.types()), &token.factors),
                    orig,
                    class: None,
                });
                push_digit_run(&mut out, scalar, orig.1);
                continue;
            }
        }
        out.push(WireToken {
            text: render(&escape_lemma(&lemma), &token.factors),
            orig,
            class: token.factors.index,
        });
    }
    Ok(out)
}

fn render(lemma: &str, factors: &Factors) -> String {
    let mut text = lemma.to_string();
    for factor in factors.strings() {
        text.push('|');
        text.push_str(&factor);
    }
    text
}

fn push_digit_run(out: &mut Vec<WireToken>, value: u32, position: usize) {
    for digit in value.to_string().bytes() {
        out.push(WireToken {
            text:  digit_lemma(digit - b'0'),
            orig:  (position, position),
            class: None,
        });
    }
    out.push(WireToken {
        text:  DIGIT_TERMINATOR.to_string(),
        orig:  (position, position),
        class: None,
    });
}

/// A parsed wire token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedToken {
    pub lemma:   String,
    pub factors: Factors,
}

/// Parses one wire token.
pub(crate) fn parse_token(text: &str) -> Result<ParsedToken, WireError> {
    if text.is_empty() {
        return Err(WireError::EmptyToken);
    }
    let mut pieces = text.split('|');
    let lemma = unescape_lemma(pieces.next().unwrap_or_default())?;
    let mut factors = Factors::default();
    for piece in pieces {
        if !factors.apply(piece) {
            return Err(WireError::UnknownFactor(piece.to_string(), text.to_string()));
        }
    }
    Ok(ParsedToken { lemma, factors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::{Cap, Glue};

    #[test]
    fn test_escape_round_trip() {
        for lemma in ["HELLO", "DON'T", " ", "_", "a|b", "x:y#z", "<", ">", "\\", "\t"] {
            let escaped = escape_lemma(lemma);
            assert!(!escaped.contains(' '));
            assert!(!escaped.contains('|'));
            assert_eq!(unescape_lemma(&escaped).unwrap(), lemma, "lemma {:?}", lemma);
        }
    }

    #[test]
    fn test_escape_forms() {
        assert_eq!(escape_lemma("_"), "\\x5F");
        assert_eq!(escape_lemma(" "), "\\x20");
        assert_eq!(escape_lemma("\u{ffff}"), "\\uFFFF");
        assert_eq!(escape_lemma("{word}"), "{word}");
        assert_eq!(escape_lemma("<IOPEN>"), "<IOPEN>");
        assert_eq!(escape_lemma("<"), "\\x3C");
    }

    #[test]
    fn test_unescape_rejects_malformed() {
        assert!(unescape_lemma("\\").is_err());
        assert!(unescape_lemma("\\x5").is_err());
        assert!(unescape_lemma("\\q00").is_err());
        assert!(unescape_lemma("\\uD800").is_err());
    }

    #[test]
    fn test_parse_token() {
        let parsed = parse_token("HELLO|ci|wb").unwrap();
        assert_eq!(parsed.lemma, "HELLO");
        assert_eq!(parsed.factors.cap, Some(Cap::Initial));
        let parsed = parse_token("\\x2C|gl+|gr-").unwrap();
        assert_eq!(parsed.lemma, ",");
        assert_eq!(parsed.factors.glue_left, Some(Glue::Glued));
        assert_eq!(parsed.factors.glue_right, Some(Glue::Spaced));
        assert!(parse_token("HELLO|zz").is_err());
        assert!(parse_token("").is_err());
    }

    #[test]
    fn test_digit_lemmas() {
        assert_eq!(digit_lemma(4), "<4>");
        assert_eq!(digit_value("<4>"), Some(4));
        assert_eq!(digit_value("<#>"), None);
        assert_eq!(digit_value("<42>"), None);
    }

    #[test]
    fn test_unknown_lemma_names() {
        use crate::factor::FactorType;
        let mut set = FactorTypeSet::default();
        set.insert(FactorType::WordBeg);
        set.insert(FactorType::Cap);
        assert_eq!(unknown_lemma(set), "{unk,c,wb}");
    }
}
