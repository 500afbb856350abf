//! **Reversible factored tokenizer for neural machine translation.**
//!
//! Factok transforms a plain-text sentence into a sequence of factored
//! tokens, each a lemma plus a tuple of orthogonal attributes for
//! capitalization, word boundaries, glue and script continuity, and exactly
//! inverts that sequence back into the original sentence. Subword splitting
//! is delegated to a piece oracle; a trained unigram model ships in-crate.
//!
//! # Overview
//!
//! Encoding pre-tokenizes the line along designation, script, numeral and
//! casing boundaries, splits word pieces through the oracle, assigns factors
//! so that the implied spacing equals the spacing of the input, and
//! serializes each token as `LEMMA|F1|F2|…`. Decoding parses the wire form,
//! restores digit-serialized indices and unrepresentable characters, applies
//! forced phrase-fix surfaces and reconstructs the sentence with its exact
//! spacing and capitalization.
//!
//! # Examples
//!
//! ### Training and round-tripping
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use factok::{train, Factok, Options, TrainerOptions};
//!
//! let corpus = vec!["This is a test text for this module.".to_string()];
//! let model = train(&corpus, Options::default(), TrainerOptions::default())?;
//! model.to_file("test.fsm")?;
//!
//! let tokenizer = Factok::from_file("test.fsm")?;
//! let encoded = tokenizer.encode("Also A Test!")?;
//! let decoded = tokenizer.decode(&encoded.tokens)?;
//! assert_eq!(decoded.text, "Also A Test!");
//! # Ok(())
//! # }
//! ```
//!
//! ### Phrase fixes
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use factok::{AnnotatedSpan, Factok};
//! # let tokenizer = Factok::from_file("test.fsm")?;
//! let spans = vec![AnnotatedSpan::phrase_fix(7, 4, "Bargeld")];
//! let encoded = tokenizer.encode_with("pay in cash", &spans, &[], 0)?;
//! let decoded = tokenizer.decode_with(&encoded.tokens, Some(&encoded.package), None)?;
//! assert_eq!(decoded.text, "pay in Bargeld");
//! # Ok(())
//! # }
//! ```

pub mod classify;

mod align;
mod annotation;
mod config;
mod decode;
mod factor;
mod factorize;
mod model;
mod oracle;
mod pretokenize;
mod serialize;
mod token;
mod trainer;
mod vocab;

use hashbrown::HashMap;

pub use crate::align::*;
pub use crate::annotation::{AnnotatedSpan, AnnotationError, SpanInstructions};
pub use crate::config::*;
pub use crate::decode::{DecodeError, Decoded, DecodedSegment, DecoderPackage};
pub use crate::factor::*;
pub use crate::model::*;
pub use crate::oracle::{
    train_unigram, CutList, OracleError, PieceOracle, UnigramOracle, UnigramTrainerConfig,
};
pub use crate::pretokenize::segments;
pub use crate::serialize::{
    digit_lemma, escape_lemma, unescape_lemma, unknown_lemma, WireError, DIGIT_TERMINATOR,
    LEMMA_BOS, LEMMA_EOS, LEMMA_UNK, TAG_CLOSE, TAG_DELIM, TAG_OPEN,
};
pub use crate::trainer::{train, TrainError};
pub use crate::vocab::{parse_factor_spec, FactorSpec, FactorSpecError};

use crate::oracle::SplitCache;
use crate::token::Token;

/// Errors encountered during initialization.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum InitializationError {
    /// The model options failed to validate.
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),
    /// The embedded oracle blob failed to deserialize.
    #[error("invalid oracle blob: {0}")]
    InvalidOracle(String),
}

/// Errors encountered during encoding.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The annotated spans are invalid.
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    /// The piece oracle misbehaved.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// An encoded sentence: the wire tokens and the package the decoder needs to
/// reconstruct phrase fixes and alignment.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub tokens:  Vec<String>,
    pub package: DecoderPackage,
}

impl Encoded {
    /// The space-separated wire line.
    pub fn line(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Factok tokenizer.
/// Encodes sentences into factored tokens and decodes them back.
pub struct Factok {
    model:  Model,
    lemmas: HashMap<String, FactorTypeSet>,
    oracle: Option<Box<dyn PieceOracle>>,
    cache:  SplitCache,
}

impl Factok {
    /// Creates a tokenizer from the given model.
    ///
    /// Returns an error if the options are invalid or the embedded oracle
    /// blob fails to deserialize.
    pub fn from_model(model: Model) -> Result<Self, InitializationError> {
        model.options.validate()?;
        let oracle: Option<Box<dyn PieceOracle>> = match &model.oracle {
            Some(blob) => Some(Box::new(
                UnigramOracle::from_blob(blob)
                    .map_err(|e| InitializationError::InvalidOracle(e.to_string()))?,
            )),
            None => None,
        };
        let lemmas = model.lemma_map();
        Ok(Self {
            model,
            lemmas,
            oracle,
            cache: SplitCache::new(SplitCache::DEFAULT_LIMIT),
        })
    }

    /// Loads a tokenizer from a model file.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, DeserializationError> {
        let model = Model::from_file(path)?;
        Self::from_model(model)
            .map_err(|e| DeserializationError::InvalidData(e.to_string()))
    }

    /// Replaces the piece oracle, e.g. with an out-of-process subword model.
    pub fn with_oracle(mut self, oracle: Box<dyn PieceOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Bounds the split cache to the given number of entries.
    pub fn with_split_cache_size(mut self, limit: usize) -> Self {
        self.cache = SplitCache::new(limit);
        self
    }

    /// The model this tokenizer was created from.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The model options.
    pub fn options(&self) -> &Options {
        &self.model.options
    }

    /// The pre-token ranges of a line, before the piece oracle.
    pub fn segments(&self, line: &str) -> Vec<(usize, usize)> {
        crate::pretokenize::segments(line, &self.model.options)
    }

    /// Encodes a line into factored wire tokens.
    #[inline(always)]
    pub fn encode(&self, line: &str) -> Result<Encoded, EncodeError> {
        self.encode_with(line, &[], &[], 0)
    }

    /// Encodes a line with annotated spans and sentence annotations.
    ///
    /// The seed drives class index assignment; the source and target sides of
    /// a sentence pair must pass the same seed to obtain matching indices.
    #[inline(never)]
    pub fn encode_with(
        &self, line: &str, spans: &[AnnotatedSpan], annotations: &[(String, String)], seed: u64,
    ) -> Result<Encoded, EncodeError> {
        let (tokens, decode_as) = self.pipeline(line, spans, seed)?;
        let wire = crate::serialize::write_tokens(
            line,
            &tokens,
            &self.model.options,
            &self.lemmas,
            annotations,
        )?;
        let mut texts = Vec::with_capacity(wire.len());
        let mut source_segments = Vec::with_capacity(wire.len());
        let mut source_class_indices = Vec::new();
        for (position, token) in wire.iter().enumerate() {
            source_segments.push(token.orig);
            if let Some(index) = token.class {
                source_class_indices.push((index, position));
            }
        }
        texts.extend(wire.into_iter().map(|token| token.text));
        let package = DecoderPackage {
            source_text: line.to_string(),
            source_segments,
            decode_as,
            source_class_indices,
        };
        Ok(Encoded { tokens: texts, package })
    }

    /// Decodes wire tokens into surface text.
    #[inline(always)]
    pub fn decode<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Decoded, DecodeError> {
        self.decode_with(tokens, None, None)
    }

    /// Decodes wire tokens with the encode-time package and an alignment.
    #[inline(never)]
    pub fn decode_with<S: AsRef<str>>(
        &self, tokens: &[S], package: Option<&DecoderPackage>, alignment: Option<&Alignment>,
    ) -> Result<Decoded, DecodeError> {
        let tokens: Vec<&str> =
            tokens.iter().map(|t| t.as_ref()).filter(|t| !t.is_empty()).collect();
        crate::decode::decode(&tokens, &self.model.options, &self.lemmas, package, alignment)
    }

    /// Decodes a space-separated wire line.
    pub fn decode_line(&self, line: &str) -> Result<Decoded, DecodeError> {
        let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        crate::decode::decode(&tokens, &self.model.options, &self.lemmas, None, None)
    }

    /// Runs pre-tokenization and factorization, the shared front of encoding
    /// and training.
    pub(crate) fn pipeline(
        &self, line: &str, spans: &[AnnotatedSpan], seed: u64,
    ) -> Result<(Vec<Token>, Vec<(u8, String)>), EncodeError> {
        let pre = crate::pretokenize::pretokenize(line, spans, &self.model.options, seed)?;
        let tokens = crate::factorize::factorize(
            line,
            pre.tokens,
            self.oracle.as_deref(),
            &self.cache,
            &self.model.options,
        )?;
        Ok((tokens, pre.decode_as))
    }
}

impl core::fmt::Debug for Factok {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Factok")
            .field("model", &self.model)
            .field("lemmas", &format!("Lemmas({})", self.lemmas.len()))
            .field("oracle", &self.oracle.is_some())
            .finish()
    }
}
