//! Pre-tokenization: annotated span application and rule-driven splitting.
//!
//! The pre-tokenizer turns a line into an ordered sequence of tokens whose
//! original ranges tile the line exactly. No token crosses a script or
//! designation boundary, numerals and spaces are single-character tokens, and
//! casing transitions inside words are cut so that the piece oracle only ever
//! sees case-normalized material.

use unicode_script::Script;

use crate::annotation::{AnnotatedSpan, AnnotationError, IndexAllocator};
use crate::classify::{
    designation, is_bicameral, is_combiner, is_continuous_script, is_numeral, script, Designation,
};
use crate::config::Options;
use crate::factor::InlineFix;
use crate::token::{ClassLemma, Token};

/// Word-boundary marker of the piece vocabulary; input occurrences are
/// rewritten to a plain underscore.
pub(crate) const WORD_BEG_MARK: char = '\u{2581}';

/// The result of pre-tokenizing one line.
#[derive(Debug)]
pub(crate) struct Pretokenized {
    pub tokens:    Vec<Token>,
    /// Class index to forced surface form, for the decoder package.
    pub decode_as: Vec<(u8, String)>,
}

/// Pre-tokenizes a line with its annotated spans.
pub(crate) fn pretokenize(
    line: &str, spans: &[AnnotatedSpan], options: &Options, seed: u64,
) -> Result<Pretokenized, AnnotationError> {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&i| (spans[i].start, spans[i].length));

    let mut allocator = IndexAllocator::new(seed);
    let mut decode_as = Vec::new();
    let mut seeds: Vec<Token> = Vec::new();
    let mut covered = 0;

    for &i in &order {
        let span = &spans[i];
        if span.end() > line.len() {
            return Err(AnnotationError::OutOfBounds(span.start, span.end(), line.len()));
        }
        if !line.is_char_boundary(span.start) || !line.is_char_boundary(span.end()) {
            return Err(AnnotationError::SplitsCharacter(span.start));
        }
        if span.start < covered {
            return Err(AnnotationError::Overlap(span.start));
        }
        if span.start > covered {
            seeds.push(Token::slice(covered..span.start));
        }
        covered = span.end();

        let range = span.start..span.end();
        if let Some(kind) = span.class {
            let replacement = match span.instructions.decode_as.as_deref() {
                Some(replacement) if !replacement.is_empty() => replacement.to_string(),
                _ => return Err(AnnotationError::EmptyReplacement(span.start)),
            };
            if options.inline_fixes {
                // The source half is a placeholder: it keeps the span's
                // original range but carries no underlying text.
                let mut source = Token::slice(range.clone()).override_as_if("");
                source.inline = Some(InlineFix::What);
                let mut target = Token::slice(range).override_as_if(replacement);
                target.inline = Some(InlineFix::With);
                seeds.push(source);
                seeds.push(target);
            } else {
                let index = match allocator.allocate() {
                    Some(index) => index,
                    None => {
                        log::warn!("class index space exhausted, dropping span at {}", span.start);
                        seeds.push(Token::slice(range));
                        continue;
                    }
                };
                let lemma = class_lemma(&replacement);
                let mut class = Token::slice(range).override_as_if("");
                class.class = Some((kind, index, lemma));
                decode_as.push((index, replacement));
                seeds.push(class);
            }
        } else if let Some(substitute) = span.instructions.encode_as_if.as_deref() {
            seeds.push(Token::slice(range).override_as_if(substitute));
        } else {
            seeds.push(Token::slice(range));
        }
    }
    if covered < line.len() {
        seeds.push(Token::slice(covered..line.len()));
    }

    let mut tokens = Vec::with_capacity(line.len() / 3 + 1);
    for seed in seeds {
        if seed.class.is_some() || seed.inline == Some(InlineFix::What) {
            tokens.push(seed);
            continue;
        }
        let seed = if seed.text(line).contains(WORD_BEG_MARK) {
            let replaced = seed.text(line).replace(WORD_BEG_MARK, "_");
            seed.override_as_if(replaced)
        } else {
            seed
        };
        let text = seed.text(line);
        if text.is_empty() {
            continue;
        }
        for (offset, length) in split_ranges(text, options) {
            tokens.push(seed.narrow(offset, length));
        }
    }

    Ok(Pretokenized { tokens, decode_as })
}

/// Chooses the class lemma of a phrase-fix token from its replacement text.
fn class_lemma(replacement: &str) -> ClassLemma {
    let first = match replacement.chars().next() {
        Some(first) => first,
        None => return ClassLemma::Punctuation,
    };
    if is_continuous_script(first) {
        return ClassLemma::ContinuousScript;
    }
    if designation(first).is_word_nature() {
        if replacement.chars().any(is_bicameral) {
            ClassLemma::Word
        } else {
            ClassLemma::WordWoCase
        }
    } else {
        ClassLemma::Punctuation
    }
}

/// Splits a line into pre-token ranges, without annotations.
///
/// This is the designation/script segmentation alone; spans, factors and the
/// piece oracle do not participate.
pub fn segments(line: &str, options: &Options) -> Vec<(usize, usize)> {
    if line.is_empty() {
        return Vec::new();
    }
    split_ranges(line, options).into_iter().map(|(start, len)| (start, start + len)).collect()
}

/// Computes the split ranges of one span of text as (offset, length) pairs.
fn split_ranges(text: &str, options: &Options) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    if chars.len() <= 1 {
        return vec![(0, text.len())];
    }
    let n = chars.len();

    // Adjusted designation and script: combiners inherit from the left,
    // CJK numeric letters are forced to numerals.
    let mut desig = Vec::with_capacity(n);
    let mut scripts = Vec::with_capacity(n);
    for i in 0..n {
        let c = chars[i].1;
        let mut d = designation(c);
        let mut s = script(c);
        if is_combiner(c) && i > 0 {
            d = desig[i - 1];
            s = scripts[i - 1];
        } else if is_numeral(c) {
            d = Designation::Numeral;
        }
        desig.push(d);
        scripts.push(s);
    }
    // Word-internal punctuation takes the designation of its neighbours:
    // apostrophes and hyphens between letters, decimal separators between
    // numerals.
    for i in 1..n - 1 {
        match chars[i].1 {
            '\'' | '-' | '\u{ad}'
                if desig[i - 1] == Designation::Letter && desig[i + 1] == Designation::Letter =>
            {
                desig[i] = Designation::Letter;
            }
            '.' | ',' | '\u{2009}'
                if desig[i - 1] == Designation::Numeral && desig[i + 1] == Designation::Numeral =>
            {
                desig[i] = Designation::Numeral;
            }
            _ => {}
        }
    }

    let mut ranges = Vec::with_capacity(n / 2 + 1);
    let mut last = 0;
    // The effective script so far, with Common and Inherited absorbed by
    // their neighbours.
    let mut effective: Option<Script> = concrete_script(scripts[0]);
    for i in 1..n {
        if split_between(&chars, &desig, &scripts, effective, i, options) {
            ranges.push((chars[last].0, chars[i].0 - chars[last].0));
            last = i;
        }
        if let Some(s) = concrete_script(scripts[i]) {
            effective = Some(s);
        }
    }
    ranges.push((chars[last].0, text.len() - chars[last].0));
    ranges
}

#[inline(always)]
fn concrete_script(s: Script) -> Option<Script> {
    match s {
        Script::Common | Script::Inherited => None,
        other => Some(other),
    }
}

/// Whether a cut is made between character `i - 1` and character `i`.
fn split_between(
    chars: &[(usize, char)], desig: &[Designation], scripts: &[Script],
    effective: Option<Script>, i: usize, options: &Options,
) -> bool {
    let (prev, cur) = (chars[i - 1].1, chars[i].1);
    // Designation changes.
    if desig[i - 1] != desig[i] {
        return true;
    }
    // Script changes, with Common absorbed by the neighbour.
    if let (Some(effective), Some(cur_script)) = (effective, concrete_script(scripts[i])) {
        if effective != cur_script {
            return true;
        }
    }
    // Numerals stand alone.
    if desig[i - 1] == Designation::Numeral || desig[i] == Designation::Numeral {
        return true;
    }
    // So do spaces and control characters.
    if prev <= ' ' || cur <= ' ' {
        return true;
    }
    // Reserved special-token delimiters.
    if matches!(prev, '<' | '{') || matches!(cur, '<' | '{') {
        return true;
    }
    // Han as single characters, if configured.
    if options.split_han && (scripts[i - 1] == Script::Han || scripts[i] == Script::Han) {
        return true;
    }
    // Casing transitions: camelCase and ALLCaps tails.
    if has_lower(prev) && has_upper(cur) {
        return true;
    }
    if i + 1 < chars.len() && has_upper(prev) && has_upper(cur) && has_lower(chars[i + 1].1) {
        return true;
    }
    false
}

#[inline(always)]
fn has_upper(c: char) -> bool {
    is_bicameral(c) && c.is_uppercase()
}

#[inline(always)]
fn has_lower(c: char) -> bool {
    is_bicameral(c) && c.is_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotatedSpan;

    fn parts(line: &str) -> Vec<&str> {
        segments(line, &Options::default())
            .into_iter()
            .map(|(start, end)| &line[start..end])
            .collect()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(parts("This is"), vec!["This", " ", "is"]);
        assert_eq!(parts("don't stop"), vec!["don't", " ", "stop"]);
        assert_eq!(parts("well-known"), vec!["well-known"]);
    }

    #[test]
    fn test_numerals_single() {
        assert_eq!(parts("3.14"), vec!["3", ".", "1", "4"]);
        assert_eq!(parts("$3"), vec!["$", "3"]);
        assert_eq!(parts("२०१४"), vec!["२", "०", "१", "४"]);
        assert_eq!(parts("二十"), vec!["二", "十"]);
    }

    #[test]
    fn test_casing_transitions() {
        assert_eq!(parts("camelCase"), vec!["camel", "Case"]);
        assert_eq!(parts("iPods"), vec!["i", "Pods"]);
        assert_eq!(parts("NSStrings"), vec!["NS", "Strings"]);
        assert_eq!(parts("ALLCAPS"), vec!["ALLCAPS"]);
    }

    #[test]
    fn test_reserved_delimiters() {
        assert_eq!(parts("-<<<>>>{{{}}}").len(), 9);
        assert_eq!(
            parts("-<<<>>>{{{}}}"),
            vec!["-", "<", "<", "<", ">>>", "{", "{", "{", "}}}"]
        );
    }

    #[test]
    fn test_scripts() {
        assert_eq!(parts("abcの"), vec!["abc", "の"]);
        assert_eq!(parts("नमस्ते"), vec!["नमस्ते"]);
        assert_eq!(parts("你好 abc"), vec!["你好", " ", "abc"]);
    }

    #[test]
    fn test_split_han_option() {
        let options = Options { split_han: true, ..Options::default() };
        let line = "你好";
        let ranges = segments(line, &options);
        assert_eq!(ranges.len(), 2);
    }

    #[test]
    fn test_overlap_rejected() {
        let line = "abcdef";
        let spans = vec![
            AnnotatedSpan::deletion(0, 4),
            AnnotatedSpan::deletion(2, 2),
        ];
        let result = pretokenize(line, &spans, &Options::default(), 0);
        assert!(matches!(result, Err(AnnotationError::Overlap(_))));
    }

    #[test]
    fn test_deletion_span() {
        let line = "a<b>c";
        let spans = vec![AnnotatedSpan::deletion(1, 3)];
        let result = pretokenize(line, &spans, &Options::default(), 0).unwrap();
        let texts: Vec<_> = result.tokens.iter().map(|t| t.text(line).to_string()).collect();
        assert_eq!(texts, vec!["a", "c"]);
    }

    #[test]
    fn test_phrase_fix_span() {
        let line = "pay in cash";
        let spans = vec![AnnotatedSpan::phrase_fix(7, 4, "Bargeld")];
        let result = pretokenize(line, &spans, &Options::default(), 0).unwrap();
        let class = result.tokens.iter().find(|t| t.class.is_some()).unwrap();
        assert!(class.is_empty(line));
        assert_eq!(class.orig(), 7..11);
        assert_eq!(result.decode_as.len(), 1);
        assert_eq!(result.decode_as[0].1, "Bargeld");
    }

    #[test]
    fn test_word_beg_mark_rewritten() {
        let line = "\u{2581}\u{2581}";
        let result = pretokenize(line, &[], &Options::default(), 0).unwrap();
        assert_eq!(result.tokens.len(), 1);
        assert_eq!(result.tokens[0].text(line), "__");
    }
}
