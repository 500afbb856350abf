#![allow(dead_code)]

use std::sync::Once;

use factok::{train, Factok, Model, Options, TrainerOptions};

static INIT_ENV: Once = Once::new();

pub fn init_env() {
    INIT_ENV.call_once(|| {
        simple_logger::SimpleLogger::new()
            .with_level(log::Level::Debug.to_level_filter())
            .env()
            .init()
            .unwrap();
    });
}

/// The three-line corpus the training tests run on.
pub fn tiny_corpus() -> Vec<String> {
    vec![
        "This is a test text for this module.".to_string(),
        "I think it is not very complex. I think.".to_string(),
        "This is mostly for testing that the thing actually runs, and for manual inspection \
         of the generated vocab file."
            .to_string(),
    ]
}

/// Trains a model on the tiny corpus.
pub fn tiny_model(options: Options, trainer: TrainerOptions) -> Model {
    train(&tiny_corpus(), options, trainer).unwrap()
}

/// A tokenizer with the given options and no trained vocabulary or oracle.
pub fn untrained(options: Options) -> Factok {
    Factok::from_model(Model::with_options(options)).unwrap()
}

/// Asserts that a line survives encode and decode unchanged.
pub fn assert_round_trip(tokenizer: &Factok, line: &str) {
    let encoded = tokenizer.encode(line).unwrap();
    let decoded = tokenizer.decode_with(&encoded.tokens, Some(&encoded.package), None).unwrap();
    assert_eq!(decoded.text, line, "round trip of {:?} via {:?}", line, encoded.tokens);
}
