//! Model training: lemma vocabulary, factor-type map, oracle training and
//! model assembly.

use hashbrown::HashMap;

use crate::config::{Options, TrainerOptions};
use crate::factor::{FactorType, FactorTypeSet};
use crate::model::Model;
use crate::oracle::{train_unigram, PieceOracle, UnigramOracle, UnigramTrainerConfig};
use crate::serialize::{is_special_lemma, lemma_of, unknown_lemma};
use crate::token::ClassLemma;
use crate::vocab::{build_factor_spec, build_shortlist};
use crate::{EncodeError, Factok, InitializationError};

/// Largest admissible factor id space of the downstream toolkit.
const MAX_FACTOR_IDS: u128 = 1 << 32;

/// Examples anchoring the factor-type sets of the class lemmas.
const CLASS_EXAMPLES: [(&str, ClassLemma); 4] = [
    ("Hello", ClassLemma::Word),
    ("नमस्ते", ClassLemma::WordWoCase),
    ("你好", ClassLemma::ContinuousScript),
    ("!", ClassLemma::Punctuation),
];

/// Examples anchoring the factor-type sets of the unrepresentable classes.
const UNREPRESENTABLE_EXAMPLES: [char; 7] = ['a', '0', '.', 'त', '超', 'ⓐ', '☺'];

/// Errors encountered during training.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// A lemma was observed with two different factor-type sets.
    #[error("lemma {lemma:?} takes factor types {{{first}}} and {{{second}}}")]
    FactorSetConflict { lemma: String, first: String, second: String },
    /// The factor-id space exceeds what the downstream toolkit addresses.
    #[error("factor space of {0} ids exceeds the 32-bit id space")]
    FactorSpaceTooLarge(u128),
    /// A corpus line failed to encode.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// An intermediate model failed to initialize.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

/// Trains a model over a corpus of lines.
pub fn train(
    corpus: &[String], options: Options, trainer: TrainerOptions,
) -> Result<Model, TrainError> {
    let lines = if trainer.training_sentence_size > 0 {
        &corpus[..corpus.len().min(trainer.training_sentence_size)]
    } else {
        corpus
    };

    // Bootstrap encode without an oracle, producing the normalized piece
    // stream the oracle trains on.
    let bootstrap = Factok::from_model(Model::with_options(options.clone()))?;
    let mut piece_counts: HashMap<String, u64> = HashMap::new();
    for line in lines {
        let (tokens, _) = bootstrap.pipeline(line, &[], trainer.seed)?;
        for token in &tokens {
            if token.text(line).trim().is_empty() {
                continue;
            }
            let lemma = lemma_of(token, line, &options);
            *piece_counts.entry(lemma).or_insert(0) += 1;
        }
    }

    let oracle = if trainer.use_piece_oracle {
        let mut config = UnigramTrainerConfig {
            vocab_size: trainer.vocab_size,
            character_coverage: trainer.character_coverage,
            ..UnigramTrainerConfig::default()
        };
        let mut oracle =
            train_unigram(piece_counts.iter().map(|(piece, count)| (piece.as_str(), *count)), &config);
        // Re-encode the bootstrap stream and count the pieces that survive
        // the count floor; a smaller count than the target size means the
        // vocabulary is oversized and the oracle is retrained once.
        let keep = count_kept_pieces(&oracle, &piece_counts, trainer.min_piece_count);
        if keep < config.vocab_size {
            log::info!("retraining oracle with vocabulary size {}", keep);
            config.vocab_size = keep;
            oracle = train_unigram(
                piece_counts.iter().map(|(piece, count)| (piece.as_str(), *count)),
                &config,
            );
        }
        Some(oracle)
    } else {
        None
    };

    // Factor-type map discovery over the full pipeline.
    let full = Factok::from_model(Model {
        options: options.clone(),
        oracle: oracle.as_ref().map(|o| o.to_blob()),
        ..Model::default()
    })?;
    let mut sets: HashMap<String, FactorTypeSet> = HashMap::new();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for line in lines {
        let (tokens, _) = full.pipeline(line, &[], trainer.seed)?;
        for token in &tokens {
            let lemma = lemma_of(token, line, &options);
            if lemma.is_empty() || token.tag.is_some() {
                continue;
            }
            record(&mut sets, lemma.clone(), token.factors.types())?;
            *counts.entry(lemma).or_insert(0) += 1;
        }
    }

    // Inject the class lemmas, anchored on representative example strings.
    // Every class token carries a capitalization factor.
    for (example, class) in CLASS_EXAMPLES {
        let (tokens, _) = full.pipeline(example, &[], trainer.seed)?;
        let mut set = match tokens.first() {
            Some(token) => token.factors.types(),
            None => continue,
        };
        set.insert(FactorType::Cap);
        set.insert(FactorType::Class);
        if !options.serialize_indices_and_unrepresentables {
            set.insert(FactorType::Index);
        }
        record(&mut sets, class.as_str().to_string(), set)?;
    }

    // In digit-serialized mode, register a lemma for each unrepresentable
    // class, named after its factor types.
    if options.serialize_indices_and_unrepresentables {
        for example in UNREPRESENTABLE_EXAMPLES {
            let line = example.to_string();
            let (tokens, _) = full.pipeline(&line, &[], trainer.seed)?;
            let set = match tokens.first() {
                Some(token) => token.factors.types(),
                None => continue,
            };
            record(&mut sets, unknown_lemma(set), set)?;
        }
    }

    // Rare single characters become unrepresentable at encode time.
    if trainer.min_char_count > 1 {
        sets.retain(|lemma, _| {
            if is_special_lemma(lemma) || lemma.chars().take(2).count() > 1 {
                return true;
            }
            counts.get(lemma).copied().unwrap_or(0) >= trainer.min_char_count
        });
    }

    // The word-id space of the downstream toolkit is bounded.
    let mut used = FactorTypeSet::default();
    for set in sets.values() {
        for t in set.iter() {
            used.insert(t);
        }
    }
    let product: u128 =
        used.iter().map(|t| t.value_count() as u128 + 1).product();
    if product > MAX_FACTOR_IDS {
        return Err(TrainError::FactorSpaceTooLarge(product));
    }

    let mut lemmas: Vec<(String, FactorTypeSet)> =
        sets.into_iter().collect();
    lemmas.sort_by(|(a, _), (b, _)| a.cmp(b));

    let shortlist = build_shortlist(&lemmas, &options);
    let factor_spec = build_factor_spec(&lemmas, &options);
    Ok(Model {
        options,
        oracle: oracle.map(|o| o.to_blob()),
        lemmas,
        shortlist,
        factor_spec,
    })
}

/// Counts the pieces that survive the piece-count floor when the bootstrap
/// stream is re-encoded through the oracle.
fn count_kept_pieces(
    oracle: &UnigramOracle, piece_counts: &HashMap<String, u64>, min_piece_count: u64,
) -> usize {
    let mut used: HashMap<String, u64> = HashMap::new();
    for (word, count) in piece_counts {
        match oracle.split(word) {
            Some(cuts) => {
                for pair in cuts.windows(2) {
                    *used.entry(word[pair[0]..pair[1]].to_string()).or_insert(0) += count;
                }
            }
            None => {
                *used.entry(word.clone()).or_insert(0) += count;
            }
        }
    }
    used.iter()
        .filter(|(piece, count)| piece.chars().take(2).count() == 1 || **count >= min_piece_count)
        .count()
}

/// Records a lemma's factor-type set; disagreement is fatal.
fn record(
    sets: &mut HashMap<String, FactorTypeSet>, lemma: String, set: FactorTypeSet,
) -> Result<(), TrainError> {
    match sets.get(&lemma) {
        Some(existing) if *existing != set => Err(TrainError::FactorSetConflict {
            lemma,
            first: existing.to_string(),
            second: set.to_string(),
        }),
        _ => {
            sets.insert(lemma, set);
            Ok(())
        }
    }
}
