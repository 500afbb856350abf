//! Factor assignment: capitalization, boundary and glue factors, space
//! elision, subword splitting and inline-fix sequencing.
//!
//! The factorizer never mutates underlying text. Its output is the token
//! stream the serializer writes out, with every elidable space removed and
//! the spacing implied by the remaining factors equal to the spacing of the
//! input line.

use crate::classify::{
    combiner_typical_designation, designation, is_bicameral, is_combiner, is_continuous_script,
    uppercase_exact,
};
use crate::config::Options;
use crate::factor::{Cap, CsBeg, CsEnd, Glue, InlineFix, SingleCap, WordBeg, WordEnd, WordInt};
use crate::oracle::{split_cached, OracleError, PieceOracle, SplitCache};
use crate::serialize::{TAG_CLOSE, TAG_DELIM, TAG_OPEN};
use crate::token::{ClassLemma, Token};

/// The nature of a token, deciding which boundary factors it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Nature {
    Word,
    ContinuousScript,
    Punctuation,
    Space,
}

impl Nature {
    #[inline(always)]
    fn is_word_like(self) -> bool {
        matches!(self, Nature::Word | Nature::ContinuousScript)
    }
}

/// Determines the nature of a token.
pub(crate) fn nature(token: &Token, line: &str) -> Nature {
    if let Some((_, _, lemma)) = token.class {
        return match lemma {
            ClassLemma::Word | ClassLemma::WordWoCase => Nature::Word,
            ClassLemma::ContinuousScript => Nature::ContinuousScript,
            ClassLemma::Punctuation => Nature::Punctuation,
        };
    }
    let text = token.text(line);
    if text == " " {
        return Nature::Space;
    }
    let first = match text.chars().next() {
        Some(first) => first,
        None => return Nature::Word,
    };
    let desig =
        if is_combiner(first) { combiner_typical_designation(first) } else { designation(first) };
    if desig.is_word_nature() {
        if is_continuous_script(first) {
            Nature::ContinuousScript
        } else {
            Nature::Word
        }
    } else {
        Nature::Punctuation
    }
}

/// Runs the factorization passes over a pre-tokenized stream.
pub(crate) fn factorize(
    line: &str, tokens: Vec<Token>, oracle: Option<&dyn PieceOracle>, cache: &SplitCache,
    options: &Options,
) -> Result<Vec<Token>, OracleError> {
    let mut tokens = tokens;
    mark_elided_spaces(line, &mut tokens);
    let mut tokens = split_pieces(line, tokens, oracle, cache, options)?;
    assign_capitalization(line, &mut tokens, options);
    if options.context_dependent_single_letter_cap && !options.single_letter_case_factors {
        promote_single_letters(line, &mut tokens);
    }
    assign_boundaries(line, &mut tokens, options);
    let mut tokens = if options.inline_fix_use_tags {
        insert_inline_tags(tokens)
    } else {
        tokens
    };
    tokens.retain(|token| !token.elided);
    Ok(tokens)
}

/// Marks elidable space tokens.
///
/// A space is elided when it has a neighbour on both sides and the previous
/// token was not itself an elided space; line edges and space runs keep
/// explicit space tokens.
fn mark_elided_spaces(line: &str, tokens: &mut [Token]) {
    let count = tokens.len();
    let mut prev_elided = false;
    for i in 0..count {
        if nature(&tokens[i], line) == Nature::Space && i > 0 && i + 1 < count && !prev_elided {
            tokens[i].elided = true;
            prev_elided = true;
        } else {
            prev_elided = false;
        }
    }
}

/// Whether the token at `j` takes part in neighbour checks for the token at
/// `i`: inline-fix halves only see their own side of the stream.
#[inline(always)]
fn visible(tokens: &[Token], j: usize, of: Option<InlineFix>) -> bool {
    match (of, tokens[j].inline) {
        (Some(InlineFix::What), Some(InlineFix::With)) => false,
        (Some(InlineFix::What), _) => true,
        (_, Some(InlineFix::What)) => false,
        _ => true,
    }
}

fn prev_visible(tokens: &[Token], i: usize) -> Option<usize> {
    let of = tokens[i].inline;
    (0..i).rev().find(|&j| visible(tokens, j, of))
}

fn next_visible(tokens: &[Token], i: usize) -> Option<usize> {
    let of = tokens[i].inline;
    (i + 1..tokens.len()).find(|&j| visible(tokens, j, of))
}

/// Splits word, continuous-script and punctuation runs through the oracle.
fn split_pieces(
    line: &str, tokens: Vec<Token>, oracle: Option<&dyn PieceOracle>, cache: &SplitCache,
    options: &Options,
) -> Result<Vec<Token>, OracleError> {
    let oracle = match oracle {
        Some(oracle) => oracle,
        None => return Ok(tokens),
    };
    let mut out = Vec::with_capacity(tokens.len());
    for i in 0..tokens.len() {
        let token = &tokens[i];
        let kind = nature(token, line);
        let text = token.text(line);
        if token.class.is_some() || kind == Nature::Space || text.chars().take(2).count() <= 1 {
            out.push(token.clone());
            continue;
        }
        let begins = match prev_visible(&tokens, i) {
            None => true,
            Some(j) => !nature(&tokens[j], line).is_word_like(),
        };
        let (query, mapped);
        if kind.is_word_like() {
            query = uppercase_exact(text);
            mapped = true;
        } else {
            query = text.to_string();
            mapped = false;
        }
        let adjust =
            options.distinguish_initial_and_internal_pieces && begins && kind.is_word_like();
        let cuts = match split_cached(oracle, cache, &query, adjust)? {
            Some(cuts) => cuts,
            None => {
                out.push(token.clone());
                continue;
            }
        };
        let cuts = if mapped { map_cuts(&query, text, cuts) } else { cuts };
        for pair in cuts.windows(2) {
            out.push(token.narrow(pair[0], pair[1] - pair[0]));
        }
    }
    Ok(out)
}

/// Maps cut offsets from the case-normalized query back onto the surface
/// text. Both strings have the same character count by construction.
fn map_cuts(query: &str, text: &str, cuts: Vec<usize>) -> Vec<usize> {
    let query_offsets: Vec<usize> = query.char_indices().map(|(i, _)| i).collect();
    let text_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let mut mapped = Vec::with_capacity(cuts.len());
    for cut in cuts {
        if cut == query.len() {
            mapped.push(text.len());
        } else if let Ok(char_index) = query_offsets.binary_search(&cut) {
            mapped.push(text_offsets[char_index]);
        }
    }
    mapped
}

/// Assigns capitalization factors.
fn assign_capitalization(line: &str, tokens: &mut [Token], options: &Options) {
    for token in tokens.iter_mut() {
        if token.class.is_some() {
            token.factors.cap = Some(Cap::None);
            continue;
        }
        if token.tag.is_some() || nature(token, line) != Nature::Word {
            continue;
        }
        let text = token.text(line);
        if !text.chars().any(is_bicameral) && text != "ß" {
            continue;
        }
        let mut chars = text.chars();
        let first = chars.next().unwrap_or(' ');
        let count = 1 + chars.count();
        if options.single_letter_case_factors && count == 1 {
            token.factors.single_cap =
                Some(if first.is_uppercase() { SingleCap::Upper } else { SingleCap::Lower });
        } else if count > 1
            && text.chars().filter(|&c| !is_combiner(c) && c != 'ß').all(|c| c.is_uppercase())
        {
            token.factors.cap = Some(Cap::All);
        } else if first.is_uppercase() {
            token.factors.cap = Some(Cap::Initial);
        } else {
            token.factors.cap = Some(Cap::None);
        }
    }
}

/// Promotes initial-capital single letters inside all-caps runs.
///
/// A run is a sequence of cap-carrying tokens, with spaces allowed in
/// between; a run with at least one all-caps token and no lower-case token is
/// all-caps, and its single-letter initial-capital members join it.
fn promote_single_letters(line: &str, tokens: &mut [Token]) {
    let mut run: Vec<usize> = Vec::new();
    let count = tokens.len();
    for i in 0..=count {
        let member = i < count && tokens[i].factors.cap.is_some() && tokens[i].class.is_none();
        let connects = i < count && nature(&tokens[i], line) == Nature::Space;
        if member {
            run.push(i);
        } else if !connects {
            promote_run(line, tokens, &run);
            run.clear();
        }
    }
}

fn promote_run(line: &str, tokens: &mut [Token], run: &[usize]) {
    let caps = |tokens: &[Token], want: Cap| {
        run.iter().any(|&i| tokens[i].factors.cap == Some(want))
    };
    if !caps(tokens, Cap::All) || caps(tokens, Cap::None) {
        return;
    }
    for &i in run {
        if tokens[i].factors.cap == Some(Cap::Initial)
            && tokens[i].text(line).chars().take(2).count() == 1
        {
            tokens[i].factors.cap = Some(Cap::All);
        }
    }
}

/// Assigns boundary and glue factors.
fn assign_boundaries(line: &str, tokens: &mut Vec<Token>, options: &Options) {
    let count = tokens.len();
    for i in 0..count {
        if tokens[i].elided {
            continue;
        }
        let kind = nature(&tokens[i], line);
        let prev = prev_visible(tokens, i);
        let next = next_visible(tokens, i);
        let begins = match prev {
            None => true,
            Some(j) => !nature(&tokens[j], line).is_word_like(),
        };
        let ends = match next {
            None => true,
            Some(j) => !nature(&tokens[j], line).is_word_like(),
        };
        let spaced_left = prev.map(|j| tokens[j].elided).unwrap_or(false);
        let spaced_right = next.map(|j| tokens[j].elided).unwrap_or(false);
        // Class tokens are whole words and never take the word-internal
        // factor, keeping their lemma's factor-type set fixed.
        let distinguish =
            options.distinguish_initial_and_internal_pieces && tokens[i].class.is_none();
        let factors = &mut tokens[i].factors;
        match kind {
            Nature::Word => {
                if begins {
                    factors.word_beg = Some(WordBeg::Beg);
                } else if distinguish {
                    factors.word_int = Some(WordInt::Int);
                } else {
                    factors.word_beg = Some(WordBeg::NotBeg);
                }
                if options.right_word_glue {
                    factors.word_end = Some(if ends { WordEnd::End } else { WordEnd::NotEnd });
                }
            }
            Nature::ContinuousScript => {
                factors.cs_beg = Some(if begins { CsBeg::Beg } else { CsBeg::NotBeg });
                if options.right_word_glue {
                    factors.cs_end = Some(if ends { CsEnd::End } else { CsEnd::NotEnd });
                }
            }
            Nature::Punctuation | Nature::Space => {
                factors.glue_left = Some(if spaced_left { Glue::Spaced } else { Glue::Glued });
                factors.glue_right = Some(if spaced_right { Glue::Spaced } else { Glue::Glued });
            }
        }
        let token = &mut tokens[i];
        if let Some((kind, index, _)) = token.class {
            token.factors.class = Some(kind);
            token.factors.index = Some(index);
        }
        if !options.inline_fix_use_tags {
            token.factors.inline_fix = token.inline;
        }
    }
}

/// Wraps inline-fix pairs in reserved tag tokens.
fn insert_inline_tags(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len() + 4);
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        if token.inline != Some(InlineFix::What) {
            out.push(token);
            continue;
        }
        out.push(Token::tag_at(token.orig().start, TAG_OPEN));
        let mut last_end = token.orig().end;
        out.push(token);
        while let Some(next) = iter.peek() {
            if next.inline != Some(InlineFix::What) {
                break;
            }
            last_end = next.orig().end;
            out.push(iter.next().unwrap());
        }
        out.push(Token::tag_at(last_end, TAG_DELIM));
        while let Some(next) = iter.peek() {
            if next.inline != Some(InlineFix::With) {
                break;
            }
            last_end = next.orig().end;
            out.push(iter.next().unwrap());
        }
        out.push(Token::tag_at(last_end, TAG_CLOSE));
    }
    out
}
