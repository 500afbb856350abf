//! Unicode classification used by the pre-tokenizer.

use icu_properties::props::GeneralCategory;
use icu_properties::CodePointMapData;
use unicode_script::{Script, UnicodeScript};

/// Major Unicode designation of a code point.
///
/// The single-letter forms follow the major general-category classes:
/// `L` letters, `M` marks, `N` numerals, `P` punctuation, `S` symbols,
/// `Z` separators, `C` everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Designation {
    Letter,
    Mark,
    Numeral,
    Punctuation,
    Symbol,
    Separator,
    Other,
}

impl Designation {
    /// The single-letter form of the designation.
    #[inline(always)]
    pub fn as_char(self) -> char {
        match self {
            Designation::Letter => 'L',
            Designation::Mark => 'M',
            Designation::Numeral => 'N',
            Designation::Punctuation => 'P',
            Designation::Symbol => 'S',
            Designation::Separator => 'Z',
            Designation::Other => 'C',
        }
    }

    /// Whether tokens of this designation are word-nature (letters and numerals).
    #[inline(always)]
    pub fn is_word_nature(self) -> bool {
        matches!(self, Designation::Letter | Designation::Numeral)
    }
}

/// Returns the major designation of the given character.
#[inline(never)]
pub fn designation(c: char) -> Designation {
    use GeneralCategory::*;
    match CodePointMapData::<GeneralCategory>::new().get(c) {
        UppercaseLetter | LowercaseLetter | TitlecaseLetter | ModifierLetter | OtherLetter => {
            Designation::Letter
        }
        NonspacingMark | SpacingMark | EnclosingMark => Designation::Mark,
        DecimalNumber | LetterNumber | OtherNumber => Designation::Numeral,
        DashPunctuation | OpenPunctuation | ClosePunctuation | ConnectorPunctuation
        | OtherPunctuation | InitialPunctuation | FinalPunctuation => Designation::Punctuation,
        MathSymbol | CurrencySymbol | ModifierSymbol | OtherSymbol => Designation::Symbol,
        SpaceSeparator | LineSeparator | ParagraphSeparator => Designation::Separator,
        _ => Designation::Other,
    }
}

/// Returns the script of the given character.
///
/// Unassigned code points report [`Script::Unknown`].
#[inline(always)]
pub fn script(c: char) -> Script {
    c.script()
}

/// CJK numeric letters that are treated as numerals despite their letter category.
///
/// Covers zero through ten, the power-of-ten letters up to chō, the formal
/// (banking) variants, the regional compound forms, and the circle used as zero.
const CJK_NUMERAL_LETTERS: &[char] = &[
    '零', '一', '二', '三', '四', '五', '六', '七', '八', '九', '十', '百', '千', '万', '萬',
    '億', '兆', '壱', '弐', '参', '壹', '貳', '贰', '參', '叁', '肆', '伍', '陸', '陆', '柒',
    '捌', '玖', '拾', '佰', '仟', '廿', '卅', '卌', '〇', '○',
];

/// Whether the character is a numeral.
///
/// True for Unicode category N and for the CJK numeric letters.
#[inline(never)]
pub fn is_numeral(c: char) -> bool {
    designation(c) == Designation::Numeral || CJK_NUMERAL_LETTERS.contains(&c)
}

/// Whether the character is a combining mark.
#[inline(always)]
pub fn is_combiner(c: char) -> bool {
    designation(c) == Designation::Mark
}

/// Whether the character has distinct upper-case and lower-case forms.
///
/// Only one-to-one case mappings count. Characters whose case mapping expands
/// to multiple characters, such as the sharp s, are not bicameral.
#[inline(never)]
pub fn is_bicameral(c: char) -> bool {
    let mut lower = c.to_lowercase();
    let mut upper = c.to_uppercase();
    lower.len() == 1 && upper.len() == 1 && lower.next() != upper.next()
}

/// Whether the character is bicameral and in upper case.
#[inline(always)]
pub fn has_and_is_upper(c: char) -> bool {
    is_bicameral(c) && c.is_uppercase()
}

/// Whether the character is bicameral and in lower case.
#[inline(always)]
pub fn has_and_is_lower(c: char) -> bool {
    is_bicameral(c) && c.is_lowercase()
}

/// Whether the character belongs to a script written without inter-word spaces.
#[inline(never)]
pub fn is_continuous_script(c: char) -> bool {
    matches!(c.script(), Script::Han | Script::Hiragana | Script::Katakana | Script::Thai)
}

/// The designation a combining mark contributes when it cannot inherit one.
///
/// A combiner takes the designation of its left context during splitting, but a
/// lemma must settle on a single factor-type set, so combiner-led tokens need a
/// fixed designation: variation selectors act as punctuation, all other
/// combiners as letters.
#[inline(never)]
pub fn combiner_typical_designation(c: char) -> Designation {
    if matches!(c, '\u{fe0e}' | '\u{fe0f}') {
        Designation::Punctuation
    } else {
        Designation::Letter
    }
}

/// Upper-cases a string using only one-to-one character mappings.
///
/// Characters whose upper-case form expands to multiple characters are kept
/// unchanged, so the result always has the same character count as the input.
pub fn uppercase_exact(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        let mut upper = c.to_uppercase();
        match (upper.next(), upper.next()) {
            (Some(u), None) => result.push(u),
            _ => result.push(c),
        }
    }
    result
}

/// Lower-cases a string using only one-to-one character mappings.
pub fn lowercase_exact(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => result.push(l),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_designation() {
        assert_eq!(designation('a'), Designation::Letter);
        assert_eq!(designation('Ж'), Designation::Letter);
        assert_eq!(designation('7'), Designation::Numeral);
        assert_eq!(designation('९'), Designation::Numeral);
        assert_eq!(designation('¾'), Designation::Numeral);
        assert_eq!(designation('.'), Designation::Punctuation);
        assert_eq!(designation('{'), Designation::Punctuation);
        assert_eq!(designation('<'), Designation::Symbol);
        assert_eq!(designation('°'), Designation::Symbol);
        assert_eq!(designation(' '), Designation::Separator);
        assert_eq!(designation('\t'), Designation::Other);
        assert_eq!(designation('\u{301}'), Designation::Mark);
    }

    #[test]
    fn test_numerals() {
        assert!(is_numeral('0'));
        assert!(is_numeral('९'));
        assert!(is_numeral('二'));
        assert!(is_numeral('十'));
        assert!(is_numeral('万'));
        assert!(is_numeral('○'));
        assert!(!is_numeral('x'));
        assert!(!is_numeral('言'));
    }

    #[test]
    fn test_bicameral() {
        assert!(is_bicameral('a'));
        assert!(is_bicameral('Ω'));
        assert!(!is_bicameral('ß'));
        assert!(!is_bicameral('त'));
        assert!(!is_bicameral('1'));
        assert!(has_and_is_upper('A'));
        assert!(!has_and_is_upper('a'));
        assert!(has_and_is_lower('a'));
    }

    #[test]
    fn test_continuous_script() {
        assert!(is_continuous_script('你'));
        assert!(is_continuous_script('あ'));
        assert!(is_continuous_script('カ'));
        assert!(is_continuous_script('ไ'));
        assert!(!is_continuous_script('a'));
        assert!(!is_continuous_script('९'));
    }

    #[test]
    fn test_exact_case() {
        assert_eq!(uppercase_exact("straße"), "STRAßE");
        assert_eq!(lowercase_exact("STRAßE"), "straße");
        assert_eq!(uppercase_exact("ωmega"), "ΩMEGA");
        assert_eq!(uppercase_exact("नमस्ते"), "नमस्ते");
    }
}
