//! Factor types, factor values and factor tuples.
//!
//! Every factor type and value exists exactly once, as a Rust enum variant, so
//! equality is discriminant equality and tuples are plain option fields. The
//! serialized form of a value is the type prefix followed by the value suffix,
//! and the canonical order of factors on the wire is the ordinal order of the
//! type prefixes.

use core::fmt;

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Largest admissible class index, bounded by the downstream factor-id width.
pub const MAX_INDEX: u8 = 40;

/// Capitalization of a word piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cap {
    /// Every cased character is upper case.
    All,
    /// The first character is upper case.
    Initial,
    /// No upper-case information.
    None,
}

/// Capitalization of a single-letter word piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SingleCap {
    Upper,
    Lower,
}

/// Whether the default inter-token space is suppressed on one side of a
/// punctuation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Glue {
    /// No space on this side.
    Glued,
    /// A space on this side.
    Spaced,
}

/// Whether a word piece begins a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordBeg {
    Beg,
    NotBeg,
}

/// Whether a word piece ends a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordEnd {
    End,
    NotEnd,
}

/// Marker for word-internal pieces when initial and internal pieces are
/// distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordInt {
    Int,
}

/// Whether a continuous-script piece begins a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CsBeg {
    Beg,
    NotBeg,
}

/// Whether a continuous-script piece ends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CsEnd {
    End,
    NotEnd,
}

/// Which half of an inline fix a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InlineFix {
    /// The source half that is dropped at decode time.
    What,
    /// The replacement half that is kept at decode time.
    With,
}

/// The kind of an annotated class span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    PhraseFix,
}

impl ClassKind {
    #[inline(always)]
    pub fn suffix(self) -> &'static str {
        match self {
            ClassKind::PhraseFix => "phrasefix",
        }
    }
}

/// A factor type. The discriminant order is the canonical wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FactorType {
    Cap,
    CsBeg,
    CsEnd,
    Class,
    GlueLeft,
    GlueRight,
    InlineFix,
    Index,
    SingleCap,
    WordBeg,
    WordEnd,
    WordInt,
}

impl FactorType {
    /// All factor types in canonical order.
    pub const ALL: [FactorType; 12] = [
        FactorType::Cap,
        FactorType::CsBeg,
        FactorType::CsEnd,
        FactorType::Class,
        FactorType::GlueLeft,
        FactorType::GlueRight,
        FactorType::InlineFix,
        FactorType::Index,
        FactorType::SingleCap,
        FactorType::WordBeg,
        FactorType::WordEnd,
        FactorType::WordInt,
    ];

    /// The serialized prefix of the type.
    #[inline(always)]
    pub fn prefix(self) -> &'static str {
        match self {
            FactorType::Cap => "c",
            FactorType::CsBeg => "cb",
            FactorType::CsEnd => "ce",
            FactorType::Class => "class",
            FactorType::GlueLeft => "gl",
            FactorType::GlueRight => "gr",
            FactorType::InlineFix => "i",
            FactorType::Index => "index",
            FactorType::SingleCap => "sc",
            FactorType::WordBeg => "wb",
            FactorType::WordEnd => "we",
            FactorType::WordInt => "wi",
        }
    }

    /// The number of values the type can take.
    #[inline(always)]
    pub fn value_count(self) -> u64 {
        match self {
            FactorType::Cap => 3,
            FactorType::CsBeg => 2,
            FactorType::CsEnd => 2,
            FactorType::Class => 1,
            FactorType::GlueLeft => 2,
            FactorType::GlueRight => 2,
            FactorType::InlineFix => 2,
            FactorType::Index => MAX_INDEX as u64,
            FactorType::SingleCap => 2,
            FactorType::WordBeg => 2,
            FactorType::WordEnd => 2,
            FactorType::WordInt => 1,
        }
    }

    /// The serialized strings of every value of the type.
    pub fn value_strings(self) -> Vec<String> {
        match self {
            FactorType::Cap => vec!["ca".into(), "ci".into(), "cn".into()],
            FactorType::CsBeg => vec!["cb".into(), "cbn".into()],
            FactorType::CsEnd => vec!["ce".into(), "cen".into()],
            FactorType::Class => vec![format!("class{}", ClassKind::PhraseFix.suffix())],
            FactorType::GlueLeft => vec!["gl+".into(), "gl-".into()],
            FactorType::GlueRight => vec!["gr+".into(), "gr-".into()],
            FactorType::InlineFix => vec!["iw".into(), "ir".into()],
            FactorType::Index => (0..MAX_INDEX).map(|i| format!("index{:03}", i)).collect(),
            FactorType::SingleCap => vec!["scu".into(), "scl".into()],
            FactorType::WordBeg => vec!["wb".into(), "wbn".into()],
            FactorType::WordEnd => vec!["we".into(), "wen".into()],
            FactorType::WordInt => vec!["wi".into()],
        }
    }
}

/// A set of factor types, stored as a bit mask over the canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FactorTypeSet(u16);

impl FactorTypeSet {
    #[inline(always)]
    pub fn insert(&mut self, t: FactorType) {
        self.0 |= 1 << t as u16;
    }

    #[inline(always)]
    pub fn with(mut self, t: FactorType) -> Self {
        self.insert(t);
        self
    }

    #[inline(always)]
    pub fn contains(self, t: FactorType) -> bool {
        self.0 & (1 << t as u16) != 0
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained types in canonical order.
    pub fn iter(self) -> impl Iterator<Item = FactorType> {
        FactorType::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl FromIterator<FactorType> for FactorTypeSet {
    fn from_iter<I: IntoIterator<Item = FactorType>>(iter: I) -> Self {
        let mut set = FactorTypeSet::default();
        for t in iter {
            set.insert(t);
        }
        set
    }
}

impl fmt::Display for FactorTypeSet {
    /// Comma-separated type prefixes in canonical order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for t in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", t.prefix())?;
            first = false;
        }
        Ok(())
    }
}

/// A factor tuple: one slot per factor type, each unset or bound to one value.
///
/// The field order is the canonical wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Factors {
    pub cap:        Option<Cap>,
    pub cs_beg:     Option<CsBeg>,
    pub cs_end:     Option<CsEnd>,
    pub class:      Option<ClassKind>,
    pub glue_left:  Option<Glue>,
    pub glue_right: Option<Glue>,
    pub inline_fix: Option<InlineFix>,
    pub index:      Option<u8>,
    pub single_cap: Option<SingleCap>,
    pub word_beg:   Option<WordBeg>,
    pub word_end:   Option<WordEnd>,
    pub word_int:   Option<WordInt>,
}

impl Factors {
    /// The set of factor types bound in this tuple.
    pub fn types(&self) -> FactorTypeSet {
        let mut set = FactorTypeSet::default();
        if self.cap.is_some() {
            set.insert(FactorType::Cap);
        }
        if self.cs_beg.is_some() {
            set.insert(FactorType::CsBeg);
        }
        if self.cs_end.is_some() {
            set.insert(FactorType::CsEnd);
        }
        if self.class.is_some() {
            set.insert(FactorType::Class);
        }
        if self.glue_left.is_some() {
            set.insert(FactorType::GlueLeft);
        }
        if self.glue_right.is_some() {
            set.insert(FactorType::GlueRight);
        }
        if self.inline_fix.is_some() {
            set.insert(FactorType::InlineFix);
        }
        if self.index.is_some() {
            set.insert(FactorType::Index);
        }
        if self.single_cap.is_some() {
            set.insert(FactorType::SingleCap);
        }
        if self.word_beg.is_some() {
            set.insert(FactorType::WordBeg);
        }
        if self.word_end.is_some() {
            set.insert(FactorType::WordEnd);
        }
        if self.word_int.is_some() {
            set.insert(FactorType::WordInt);
        }
        set
    }

    /// Serializes the bound factors in canonical order.
    pub fn strings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(cap) = self.cap {
            out.push(
                match cap {
                    Cap::All => "ca",
                    Cap::Initial => "ci",
                    Cap::None => "cn",
                }
                .into(),
            );
        }
        if let Some(cs_beg) = self.cs_beg {
            out.push(
                match cs_beg {
                    CsBeg::Beg => "cb",
                    CsBeg::NotBeg => "cbn",
                }
                .into(),
            );
        }
        if let Some(cs_end) = self.cs_end {
            out.push(
                match cs_end {
                    CsEnd::End => "ce",
                    CsEnd::NotEnd => "cen",
                }
                .into(),
            );
        }
        if let Some(class) = self.class {
            out.push(format!("class{}", class.suffix()));
        }
        if let Some(glue) = self.glue_left {
            out.push(
                match glue {
                    Glue::Glued => "gl+",
                    Glue::Spaced => "gl-",
                }
                .into(),
            );
        }
        if let Some(glue) = self.glue_right {
            out.push(
                match glue {
                    Glue::Glued => "gr+",
                    Glue::Spaced => "gr-",
                }
                .into(),
            );
        }
        if let Some(inline) = self.inline_fix {
            out.push(
                match inline {
                    InlineFix::What => "iw",
                    InlineFix::With => "ir",
                }
                .into(),
            );
        }
        if let Some(index) = self.index {
            out.push(format!("index{:03}", index));
        }
        if let Some(single) = self.single_cap {
            out.push(
                match single {
                    SingleCap::Upper => "scu",
                    SingleCap::Lower => "scl",
                }
                .into(),
            );
        }
        if let Some(word_beg) = self.word_beg {
            out.push(
                match word_beg {
                    WordBeg::Beg => "wb",
                    WordBeg::NotBeg => "wbn",
                }
                .into(),
            );
        }
        if let Some(word_end) = self.word_end {
            out.push(
                match word_end {
                    WordEnd::End => "we",
                    WordEnd::NotEnd => "wen",
                }
                .into(),
            );
        }
        if self.word_int.is_some() {
            out.push("wi".into());
        }
        out
    }

    /// Binds the factor described by the given wire string.
    ///
    /// Returns `false` for unknown factor strings.
    pub fn apply(&mut self, factor: &str) -> bool {
        if let Some(rest) = factor.strip_prefix("index") {
            if rest.len() == 3 && rest.bytes().all(|b| b.is_ascii_digit()) {
                let index: u8 = match rest.parse() {
                    Ok(index) => index,
                    Err(_) => return false,
                };
                if index >= MAX_INDEX {
                    return false;
                }
                self.index = Some(index);
                return true;
            }
            return false;
        }
        match FIXED_FACTORS.get(factor) {
            Some(fixed) => {
                fixed(self);
                true
            }
            None => false,
        }
    }

    /// Checks the boundary invariant: exactly one of glue-left, word-begin,
    /// word-internal and continuous-script-begin is bound, and glue factors
    /// come in pairs.
    pub fn boundary_valid(&self) -> bool {
        let bound = [
            self.glue_left.is_some(),
            self.word_beg.is_some(),
            self.word_int.is_some(),
            self.cs_beg.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count();
        bound == 1 && self.glue_left.is_some() == self.glue_right.is_some()
    }
}

type FactorSetter = fn(&mut Factors);

static FIXED_FACTORS: Lazy<HashMap<&'static str, FactorSetter>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, FactorSetter> = HashMap::new();
    map.insert("ca", |f| f.cap = Some(Cap::All));
    map.insert("ci", |f| f.cap = Some(Cap::Initial));
    map.insert("cn", |f| f.cap = Some(Cap::None));
    map.insert("cb", |f| f.cs_beg = Some(CsBeg::Beg));
    map.insert("cbn", |f| f.cs_beg = Some(CsBeg::NotBeg));
    map.insert("ce", |f| f.cs_end = Some(CsEnd::End));
    map.insert("cen", |f| f.cs_end = Some(CsEnd::NotEnd));
    map.insert("classphrasefix", |f| f.class = Some(ClassKind::PhraseFix));
    map.insert("gl+", |f| f.glue_left = Some(Glue::Glued));
    map.insert("gl-", |f| f.glue_left = Some(Glue::Spaced));
    map.insert("gr+", |f| f.glue_right = Some(Glue::Glued));
    map.insert("gr-", |f| f.glue_right = Some(Glue::Spaced));
    map.insert("iw", |f| f.inline_fix = Some(InlineFix::What));
    map.insert("ir", |f| f.inline_fix = Some(InlineFix::With));
    map.insert("scu", |f| f.single_cap = Some(SingleCap::Upper));
    map.insert("scl", |f| f.single_cap = Some(SingleCap::Lower));
    map.insert("wb", |f| f.word_beg = Some(WordBeg::Beg));
    map.insert("wbn", |f| f.word_beg = Some(WordBeg::NotBeg));
    map.insert("we", |f| f.word_end = Some(WordEnd::End));
    map.insert("wen", |f| f.word_end = Some(WordEnd::NotEnd));
    map.insert("wi", |f| f.word_int = Some(WordInt::Int));
    map
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let factors = Factors {
            cap: Some(Cap::None),
            class: Some(ClassKind::PhraseFix),
            index: Some(7),
            word_beg: Some(WordBeg::Beg),
            ..Factors::default()
        };
        assert_eq!(factors.strings(), vec!["cn", "classphrasefix", "index007", "wb"]);
    }

    #[test]
    fn test_apply_round_trip() {
        let factors = Factors {
            cap: Some(Cap::Initial),
            glue_left: Some(Glue::Glued),
            glue_right: Some(Glue::Spaced),
            index: Some(39),
            ..Factors::default()
        };
        let mut parsed = Factors::default();
        for s in factors.strings() {
            assert!(parsed.apply(&s), "factor {:?} must parse", s);
        }
        assert_eq!(parsed, factors);
    }

    #[test]
    fn test_apply_rejects_unknown() {
        let mut factors = Factors::default();
        assert!(!factors.apply("zz"));
        assert!(!factors.apply("index40"));
        assert!(!factors.apply("index123"));
        assert!(!factors.apply(""));
    }

    #[test]
    fn test_boundary_invariant() {
        let mut factors = Factors::default();
        assert!(!factors.boundary_valid());
        factors.word_beg = Some(WordBeg::Beg);
        assert!(factors.boundary_valid());
        factors.glue_left = Some(Glue::Glued);
        assert!(!factors.boundary_valid());
        factors.word_beg = None;
        factors.glue_right = Some(Glue::Glued);
        assert!(factors.boundary_valid());
    }

    #[test]
    fn test_type_set_display() {
        let mut set = FactorTypeSet::default();
        set.insert(FactorType::WordBeg);
        set.insert(FactorType::Cap);
        assert_eq!(set.to_string(), "c,wb");
        assert_eq!(set.iter().count(), 2);
    }
}
