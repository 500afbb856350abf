//! The shortlist vocabulary and the factor-spec file.
//!
//! The shortlist addresses lemmas by integer index for the downstream
//! toolkit: reserved tokens first, then every known lemma in escaped form
//! under ordinal order. The factor spec is the line-oriented declarative
//! grammar describing factor types, their values, lemma traits and the
//! conditional factor distributions.

use crate::config::Options;
use crate::factor::FactorTypeSet;
use crate::serialize::{
    digit_lemma, escape_lemma, DIGIT_TERMINATOR, LEMMA_BOS, LEMMA_EOS, LEMMA_UNK, TAG_CLOSE,
    TAG_DELIM, TAG_OPEN,
};

/// The reserved head of the shortlist.
fn reserved_lemmas(options: &Options) -> Vec<String> {
    let mut out = vec![LEMMA_UNK.to_string(), LEMMA_BOS.to_string(), LEMMA_EOS.to_string()];
    if options.inline_fixes && options.inline_fix_use_tags {
        out.push(TAG_OPEN.to_string());
        out.push(TAG_DELIM.to_string());
        out.push(TAG_CLOSE.to_string());
    }
    for annotation in &options.sentence_annotations {
        for value in &annotation.values {
            out.push(format!("<SLA:{}={}>", annotation.name, value));
        }
    }
    if options.serialize_indices_and_unrepresentables {
        for digit in 0..10 {
            out.push(digit_lemma(digit));
        }
        out.push(DIGIT_TERMINATOR.to_string());
    }
    out
}

/// Lemmas escaped and sorted under ordinal comparison, with their factor-type
/// sets.
fn ordered_lemmas(lemmas: &[(String, FactorTypeSet)]) -> Vec<(String, FactorTypeSet)> {
    let mut escaped: Vec<(String, FactorTypeSet)> =
        lemmas.iter().map(|(lemma, set)| (escape_lemma(lemma), *set)).collect();
    escaped.sort_by(|(a, _), (b, _)| a.cmp(b));
    escaped
}

/// Builds the shortlist vocabulary.
pub(crate) fn build_shortlist(lemmas: &[(String, FactorTypeSet)], options: &Options) -> Vec<String> {
    let mut out = reserved_lemmas(options);
    out.extend(ordered_lemmas(lemmas).into_iter().map(|(lemma, _)| lemma));
    out
}

/// Builds the factor-spec file.
pub(crate) fn build_factor_spec(lemmas: &[(String, FactorTypeSet)], options: &Options) -> String {
    let mut used = FactorTypeSet::default();
    for (_, set) in lemmas {
        for t in set.iter() {
            used.insert(t);
        }
    }

    let mut spec = String::new();
    spec.push_str("# factok factor vocabulary\n");
    spec.push_str("\n# factors\n");
    for t in used.iter() {
        spec.push_str(t.prefix());
        spec.push('\n');
        for value in t.value_strings() {
            spec.push_str(&format!("{} : {}\n", value, t.prefix()));
        }
    }
    spec.push_str("\n# traits\n");
    spec.push_str("_lemma\n");
    for t in used.iter() {
        spec.push_str(&format!("_has_{}\n", t.prefix()));
    }
    spec.push_str("\n# lemmas\n");
    for lemma in reserved_lemmas(options) {
        spec.push_str(&format!("{} : _lemma\n", lemma));
    }
    for (lemma, set) in ordered_lemmas(lemmas) {
        spec.push_str(&format!("{} : _lemma", lemma));
        for t in set.iter() {
            spec.push_str(&format!(" _has_{}", t.prefix()));
        }
        spec.push('\n');
    }
    spec.push_str("\n# factor distributions\n");
    for t in used.iter() {
        spec.push_str(&format!("{} <-> _has_{}\n", t.prefix(), t.prefix()));
    }
    spec
}

/// A parsed factor-spec file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactorSpec {
    /// Declared type names, traits included.
    pub types: Vec<String>,
    /// Value declarations: value and its type.
    pub values: Vec<(String, String)>,
    /// Lemma declarations: escaped lemma and its traits.
    pub lemmas: Vec<(String, Vec<String>)>,
    /// Factor distributions: type and its conditioning trait.
    pub distributions: Vec<(String, String)>,
}

/// Errors for malformed factor-spec files.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum FactorSpecError {
    #[error("malformed factor spec line {0}: {1:?}")]
    MalformedLine(usize, String),
}

/// Parses a factor-spec file.
pub fn parse_factor_spec(text: &str) -> Result<FactorSpec, FactorSpecError> {
    let mut spec = FactorSpec::default();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let malformed = || FactorSpecError::MalformedLine(number + 1, line.to_string());
        if let Some((name, trait_name)) = line.split_once("<->") {
            spec.distributions.push((name.trim().to_string(), trait_name.trim().to_string()));
            continue;
        }
        // The separator is space-delimited: annotation lemmas contain colons.
        if let Some((name, types)) = line.split_once(" : ") {
            let name = name.trim().to_string();
            let types: Vec<String> =
                types.split_whitespace().map(|t| t.to_string()).collect();
            if name.is_empty() || types.is_empty() {
                return Err(malformed());
            }
            if types[0] == "_lemma" {
                spec.lemmas.push((name, types[1..].to_vec()));
            } else if types.len() == 1 {
                spec.values.push((name, types[0].clone()));
            } else {
                return Err(malformed());
            }
            continue;
        }
        if line.split_whitespace().count() != 1 {
            return Err(malformed());
        }
        spec.types.push(line.to_string());
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::FactorType;

    fn sample_lemmas() -> Vec<(String, FactorTypeSet)> {
        let word = FactorTypeSet::default().with(FactorType::Cap).with(FactorType::WordBeg);
        let punct =
            FactorTypeSet::default().with(FactorType::GlueLeft).with(FactorType::GlueRight);
        vec![
            ("HELLO".to_string(), word),
            ("!".to_string(), punct),
            ("_".to_string(), FactorTypeSet::default().with(FactorType::WordBeg)),
        ]
    }

    #[test]
    fn test_shortlist_order() {
        let shortlist = build_shortlist(&sample_lemmas(), &Options::default());
        assert_eq!(&shortlist[..3], &["<unk>", "<s>", "</s>"]);
        let tail = &shortlist[3..];
        let mut sorted = tail.to_vec();
        sorted.sort();
        assert_eq!(tail, &sorted[..], "lemmas are in ordinal order");
        assert!(shortlist.contains(&"\\x5F".to_string()), "the underscore is escaped");
    }

    #[test]
    fn test_spec_round_trip() {
        let lemmas = sample_lemmas();
        let options = Options::default();
        let spec_text = build_factor_spec(&lemmas, &options);
        let spec = parse_factor_spec(&spec_text).unwrap();
        let shortlist = build_shortlist(&lemmas, &options);
        let spec_lemmas: Vec<String> = spec.lemmas.iter().map(|(l, _)| l.clone()).collect();
        assert_eq!(spec_lemmas, shortlist, "shortlist equals the lemma section");
        assert!(spec.types.contains(&"_has_c".to_string()));
        assert!(spec.distributions.contains(&("c".to_string(), "_has_c".to_string())));
        assert!(spec.values.contains(&("ca".to_string(), "c".to_string())));
    }

    #[test]
    fn test_digit_mode_reserves_digit_lemmas() {
        let options = Options {
            serialize_indices_and_unrepresentables: true,
            ..Options::default()
        };
        let shortlist = build_shortlist(&[], &options);
        assert!(shortlist.contains(&"<0>".to_string()));
        assert!(shortlist.contains(&"<#>".to_string()));
    }
}
