//! The inverse pipeline: wire tokens back to surface text.
//!
//! Parsing is strict, but digit-serialized tails are not: the downstream
//! model is not trusted to produce well-formed digit runs, so malformed runs
//! are dropped in place and the stream is compacted afterwards, keeping
//! alignment indices valid until projection.

use hashbrown::HashMap;

use crate::align::{Alignment, AlignmentLink};
use crate::classify::lowercase_exact;
use crate::config::Options;
use crate::factor::{
    Cap, ClassKind, CsBeg, CsEnd, Factors, FactorTypeSet, Glue, InlineFix, SingleCap, WordBeg,
    WordEnd, MAX_INDEX,
};
use crate::pretokenize::WORD_BEG_MARK;
use crate::serialize::{
    digit_value, is_special_lemma, parse_token, WireError, DIGIT_TERMINATOR, LEMMA_BOS, LEMMA_EOS,
    LEMMA_UNK, TAG_CLOSE, TAG_DELIM, TAG_OPEN,
};

/// Everything the decoder needs from the encoding side: the original text,
/// per-token source ranges, the forced surface forms and the class indices
/// present on the source side.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecoderPackage {
    pub source_text: String,
    /// Original byte range of every source wire token.
    pub source_segments: Vec<(usize, usize)>,
    /// Class index to forced surface form.
    pub decode_as: Vec<(u8, String)>,
    /// Class indices on the source side and their wire token positions.
    pub source_class_indices: Vec<(u8, usize)>,
}

impl DecoderPackage {
    fn decode_as(&self, index: u8) -> Option<&str> {
        self.decode_as.iter().find(|(i, _)| *i == index).map(|(_, s)| s.as_str())
    }
}

/// One decoded token: its range in the output text and the source character
/// ranges aligned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSegment {
    pub range:         (usize, usize),
    pub source_ranges: Vec<(usize, usize)>,
}

/// The decoded sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text:      String,
    pub segments:  Vec<DecodedSegment>,
    /// The input alignment projected onto the decoded tokens.
    pub alignment: Option<Alignment>,
}

/// Errors encountered during decoding.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    /// A token could not be parsed, or its factors contradict its lemma.
    #[error("malformed wire token: {0}")]
    MalformedWire(#[from] WireError),
}

#[derive(Debug, Clone)]
struct Item {
    lemma:   String,
    factors: Factors,
    /// Position in the incoming wire stream; inserted tokens have none.
    wire: Option<usize>,
    dead: bool,
}

/// Decodes a wire token stream.
pub(crate) fn decode(
    tokens: &[&str], options: &Options, known: &HashMap<String, FactorTypeSet>,
    package: Option<&DecoderPackage>, alignment: Option<&Alignment>,
) -> Result<Decoded, DecodeError> {
    let mut items = Vec::with_capacity(tokens.len());
    for (i, text) in tokens.iter().enumerate() {
        let parsed = parse_token(text)?;
        let dead = parsed.lemma.starts_with("<SLA:")
            || matches!(parsed.lemma.as_str(), LEMMA_UNK | LEMMA_BOS | LEMMA_EOS);
        items.push(Item {
            lemma: parsed.lemma,
            factors: parsed.factors,
            wire: Some(i),
            dead,
        });
    }

    validate_factor_sets(&items, known)?;
    if options.serialize_indices_and_unrepresentables {
        deserialize_digit_runs(&mut items);
    }
    drop_inline_sources(&mut items, options);

    // Compaction: dead items vanish, the rest keep their order.
    let mut wire_to_final: Vec<Option<usize>> = vec![None; tokens.len()];
    let mut final_items = Vec::with_capacity(items.len());
    for item in items {
        if item.dead {
            continue;
        }
        if let Some(wire) = item.wire {
            wire_to_final[wire] = Some(final_items.len());
        }
        final_items.push(item);
    }

    let mut projected = alignment.map(|a| a.project_targets(&wire_to_final));
    if let Some(package) = package {
        insert_missing_phrase_fixes(&mut final_items, package, &mut projected);
    }

    Ok(render_surface(&final_items, options, package, projected.as_ref()))
}

/// Rejects tokens whose factor-type set contradicts the known set of their
/// lemma.
fn validate_factor_sets(
    items: &[Item], known: &HashMap<String, FactorTypeSet>,
) -> Result<(), DecodeError> {
    if known.is_empty() {
        return Ok(());
    }
    for item in items {
        if item.dead || item.factors.types().is_empty() && is_special_lemma(&item.lemma) {
            continue;
        }
        if let Some(expected) = known.get(&item.lemma) {
            if *expected != item.factors.types() {
                return Err(WireError::InconsistentFactors(item.lemma.clone()).into());
            }
        }
    }
    Ok(())
}

/// Replaces `{unk,…}` heads and digit-mode class heads with their
/// reconstructed tokens, consuming the trailing digit runs.
fn deserialize_digit_runs(items: &mut [Item]) {
    let count = items.len();
    let mut i = 0;
    while i < count {
        let unk_head = !items[i].dead && items[i].lemma.starts_with("{unk");
        let class_head = !items[i].dead
            && items[i].factors.class.is_some()
            && items[i].factors.index.is_none();
        if !unk_head && !class_head {
            // Stray digits and terminators are dropped.
            if digit_value(&items[i].lemma).is_some() || items[i].lemma == DIGIT_TERMINATOR {
                items[i].dead = true;
            }
            i += 1;
            continue;
        }
        let mut value: u64 = 0;
        let mut digits = 0;
        let mut j = i + 1;
        while j < count {
            match digit_value(&items[j].lemma) {
                Some(digit) if digits < 8 => {
                    value = value * 10 + digit as u64;
                    digits += 1;
                    j += 1;
                }
                _ => break,
            }
        }
        let terminated = j < count && items[j].lemma == DIGIT_TERMINATOR;
        let valid = digits > 0 && terminated && reconstruct(&mut items[i], value, unk_head);
        if !valid {
            log::debug!("dropping malformed digit run after {:?}", items[i].lemma);
            items[i].dead = true;
        }
        for item in items[i + 1..j].iter_mut() {
            item.dead = true;
        }
        if terminated {
            items[j].dead = true;
            j += 1;
        }
        i = j.max(i + 1);
    }
}

/// Applies a reconstructed digit value to its head token.
fn reconstruct(head: &mut Item, value: u64, unk_head: bool) -> bool {
    if unk_head {
        let c = match u32::try_from(value).ok().and_then(char::from_u32) {
            Some(c) => c,
            None => return false,
        };
        if !head.factors.boundary_valid() {
            return false;
        }
        head.lemma = c.to_string();
        true
    } else {
        if value >= MAX_INDEX as u64 {
            return false;
        }
        head.factors.index = Some(value as u8);
        true
    }
}

/// Removes the source half of inline fixes, and the delimiter tags.
fn drop_inline_sources(items: &mut [Item], options: &Options) {
    if !options.inline_fixes {
        return;
    }
    if options.inline_fix_use_tags {
        let mut in_source = false;
        for item in items.iter_mut() {
            match item.lemma.as_str() {
                TAG_OPEN => {
                    in_source = true;
                    item.dead = true;
                }
                TAG_DELIM => {
                    in_source = false;
                    item.dead = true;
                }
                TAG_CLOSE => {
                    item.dead = true;
                }
                _ if in_source => item.dead = true,
                _ => {}
            }
        }
    } else {
        for item in items.iter_mut() {
            if item.factors.inline_fix == Some(InlineFix::What) {
                item.dead = true;
            }
        }
    }
}

/// Inserts a class token for every source-side class index missing from the
/// decoded stream, at the alignment-suggested position or at the end, and
/// updates the alignment structure correspondingly.
fn insert_missing_phrase_fixes(
    items: &mut Vec<Item>, package: &DecoderPackage, projected: &mut Option<Alignment>,
) {
    for (index, source_position) in &package.source_class_indices {
        let present = items
            .iter()
            .any(|item| item.factors.class.is_some() && item.factors.index == Some(*index));
        if present {
            continue;
        }
        let factors = Factors {
            cap: Some(Cap::None),
            class: Some(ClassKind::PhraseFix),
            index: Some(*index),
            word_beg: Some(WordBeg::Beg),
            ..Factors::default()
        };
        let item = Item {
            lemma: "{word}".to_string(),
            factors,
            wire: None,
            dead: false,
        };
        let position = projected
            .as_ref()
            .and_then(|a| a.targets_of(*source_position).min())
            .unwrap_or(items.len())
            .min(items.len());
        items.insert(position, item);
        if let Some(projected) = projected {
            projected.shift_targets_for_insert(position);
            projected.links.push(AlignmentLink {
                source:     *source_position,
                target:     position,
                confidence: 1.0,
            });
        }
    }
}

/// Whether a token suppresses the space on its left.
fn glues_left(factors: &Factors) -> bool {
    factors.glue_left == Some(Glue::Glued)
        || factors.word_beg == Some(WordBeg::NotBeg)
        || factors.word_int.is_some()
        || factors.cs_beg == Some(CsBeg::NotBeg)
}

/// Whether a token suppresses the space on its right.
fn glues_right(factors: &Factors) -> bool {
    factors.glue_right == Some(Glue::Glued)
        || factors.word_end == Some(WordEnd::NotEnd)
        || factors.cs_end == Some(CsEnd::NotEnd)
}

/// The surface form of one decoded token.
fn surface_of(item: &Item, package: Option<&DecoderPackage>) -> String {
    if item.factors.class.is_some() {
        let forced = item
            .factors
            .index
            .and_then(|index| package.and_then(|p| p.decode_as(index)));
        return forced.unwrap_or_default().to_string();
    }
    if is_special_lemma(&item.lemma) {
        return String::new();
    }
    let lemma = item.lemma.trim_start_matches(WORD_BEG_MARK);
    match (item.factors.cap, item.factors.single_cap) {
        (Some(Cap::All), _) | (_, Some(SingleCap::Upper)) => lemma.to_string(),
        (Some(Cap::Initial), _) => {
            let lower = lowercase_exact(lemma);
            let mut chars = lemma.chars();
            match chars.next() {
                Some(first) => {
                    let rest: String = lower.chars().skip(1).collect();
                    format!("{}{}", first, rest)
                }
                None => lower,
            }
        }
        (Some(Cap::None), _) | (_, Some(SingleCap::Lower)) => lowercase_exact(lemma),
        _ => lemma.to_string(),
    }
}

/// Emits the surface text with reconstructed spacing.
fn render_surface(
    items: &[Item], _options: &Options, package: Option<&DecoderPackage>,
    alignment: Option<&Alignment>,
) -> Decoded {
    let mut text = String::new();
    let mut segments = Vec::with_capacity(items.len());
    let mut prev: Option<&Factors> = None;
    for (position, item) in items.iter().enumerate() {
        let surface = surface_of(item, package);
        let prev_glues = prev.map(glues_right).unwrap_or(true);
        if !prev_glues && !glues_left(&item.factors) {
            text.push(' ');
        }
        let start = text.len();
        text.push_str(&surface);
        let source_ranges = match (alignment, package) {
            (Some(alignment), Some(package)) => alignment
                .sources_of(position)
                .filter_map(|s| package.source_segments.get(s).copied())
                .collect(),
            _ => Vec::new(),
        };
        segments.push(DecodedSegment { range: (start, text.len()), source_ranges });
        prev = Some(&item.factors);
    }
    Decoded { text, segments, alignment: alignment.cloned() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_plain(tokens: &[&str]) -> Decoded {
        decode(tokens, &Options::default(), &HashMap::new(), None, None).unwrap()
    }

    #[test]
    fn test_surface_spacing() {
        let decoded = decode_plain(&["HELLO|ci|wb", "WORLD|ca|wb", "!|gl+|gr+"]);
        assert_eq!(decoded.text, "Hello WORLD!");
        let decoded = decode_plain(&["X|ci|wb", "\\x2C|gl+|gr-", "Y|cn|wb"]);
        assert_eq!(decoded.text, "X, y");
    }

    #[test]
    fn test_word_internal_pieces() {
        let decoded = decode_plain(&["CAMEL|cn|wb", "CASE|ci|wbn"]);
        assert_eq!(decoded.text, "camelCase");
    }

    #[test]
    fn test_continuous_script() {
        let decoded = decode_plain(&["你好|cb", "世界|cb"]);
        assert_eq!(decoded.text, "你好 世界");
        let decoded = decode_plain(&["你|cb", "好|cbn"]);
        assert_eq!(decoded.text, "你好");
    }

    #[test]
    fn test_malformed_rejected() {
        let result = decode(&["HELLO|qq"], &Options::default(), &HashMap::new(), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_unrepresentable_reconstruction() {
        let options = Options {
            serialize_indices_and_unrepresentables: true,
            ..Options::default()
        };
        let tokens = ["{unk,c,wb}|cn|wb", "<9>", "<3>", "<7>", "<#>"];
        let decoded = decode(&tokens, &options, &HashMap::new(), None, None).unwrap();
        assert_eq!(decoded.text, "ω", "U+03A9 lower-cased is omega");
    }

    #[test]
    fn test_malformed_digit_run_dropped() {
        let options = Options {
            serialize_indices_and_unrepresentables: true,
            ..Options::default()
        };
        let tokens = ["A|ca|wb", "{unk,c,wb}|ci|wb", "<9>", "B|ca|wbn"];
        let decoded = decode(&tokens, &options, &HashMap::new(), None, None).unwrap();
        assert_eq!(decoded.text, "AB", "the unterminated run vanishes");
    }

    #[test]
    fn test_phrase_fix_surface() {
        let package = DecoderPackage {
            decode_as: vec![(5, "Bargeld".to_string())],
            ..DecoderPackage::default()
        };
        let tokens = ["PAY|ci|wb", "{word}|cn|classphrasefix|index005|wb"];
        let decoded =
            decode(&tokens, &Options::default(), &HashMap::new(), Some(&package), None).unwrap();
        assert_eq!(decoded.text, "Pay Bargeld");
    }

    #[test]
    fn test_missing_phrase_fix_appended() {
        let package = DecoderPackage {
            decode_as: vec![(3, "Kasse".to_string())],
            source_class_indices: vec![(3, 1)],
            ..DecoderPackage::default()
        };
        let decoded =
            decode(&["HI|ca|wb"], &Options::default(), &HashMap::new(), Some(&package), None)
                .unwrap();
        assert_eq!(decoded.text, "HI Kasse");
    }
}
