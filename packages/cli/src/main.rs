use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;

use clap::{Args, Parser};
use factok::{train, Factok, Model, Options, TrainerOptions};

#[derive(Args)]
struct ModelOptionArgs {
    #[arg(long, help = "Mark the last piece of each word with a word-end factor")]
    right_word_glue: bool,
    #[arg(long, help = "Distinguish word-initial and word-internal pieces")]
    distinguish_initial_and_internal_pieces: bool,
    #[arg(long, help = "Split Han text into single characters")]
    split_han: bool,
    #[arg(long, help = "Use dedicated case factors for single-letter words")]
    single_letter_case_factors: bool,
    #[arg(long, help = "Promote single-letter capitals inside all-caps runs")]
    context_dependent_single_letter_cap: bool,
    #[arg(long, help = "Serialize class indices and unrepresentables as digit runs")]
    serialize_indices_and_unrepresentables: bool,
    #[arg(long, help = "Encode phrase fixes inline")]
    inline_fixes: bool,
    #[arg(long, help = "Delimit inline fixes with reserved tags")]
    inline_fix_use_tags: bool,
}

impl ModelOptionArgs {
    fn to_options(&self) -> Options {
        Options {
            right_word_glue: self.right_word_glue,
            distinguish_initial_and_internal_pieces: self
                .distinguish_initial_and_internal_pieces,
            split_han: self.split_han,
            single_letter_case_factors: self.single_letter_case_factors,
            context_dependent_single_letter_cap: self.context_dependent_single_letter_cap,
            serialize_indices_and_unrepresentables: self
                .serialize_indices_and_unrepresentables,
            inline_fixes: self.inline_fixes,
            inline_fix_use_tags: self.inline_fix_use_tags,
            ..Options::default()
        }
    }
}

#[derive(Parser)]
enum Command {
    #[clap(name = "train", about = "Train a model from a corpus")]
    Train {
        #[arg(long, help = "Path of the model file to write (.fsm)")]
        model: PathBuf,
        #[arg(long, help = "Path of the factor vocabulary file to write")]
        marian_vocab: Option<PathBuf>,
        #[arg(long, default_value_t = 32000, help = "Piece vocabulary size")]
        vocab_size: usize,
        #[arg(long, default_value_t = 1.0, help = "Character coverage of the piece vocabulary")]
        character_coverage: f64,
        #[arg(long, default_value_t = 0, help = "Cap on the number of training sentences")]
        training_sentence_size: usize,
        #[arg(long, default_value_t = 0, help = "Minimum piece count")]
        min_piece_count: u64,
        #[arg(long, default_value_t = 1, help = "Minimum single-character count")]
        min_char_count: u64,
        #[arg(long, help = "Train without a piece oracle")]
        no_sentence_piece: bool,
        #[command(flatten)]
        options: ModelOptionArgs,
        #[arg(name = "input", help = "Corpus file; stdin when absent")]
        input: Option<PathBuf>,
    },
    #[clap(name = "encode", about = "Encode lines into factored tokens")]
    Encode {
        #[command(flatten)]
        io: IoArgs,
    },
    #[clap(name = "decode", about = "Decode factored tokens back into text")]
    Decode {
        #[command(flatten)]
        io: IoArgs,
    },
}

#[derive(Args)]
struct IoArgs {
    #[arg(long, help = "Path of the model file (.fsm)")]
    model: PathBuf,
    #[arg(short = 'o', help = "Output path; stdout when absent")]
    output: Option<PathBuf>,
    #[arg(short = 'F', help = "Field separator for TSV input")]
    field_separator: Option<String>,
    #[arg(long, help = "Suppress per-line diagnostics")]
    quiet: bool,
    #[arg(name = "input", help = "Input file; stdin when absent")]
    input: Option<PathBuf>,
}

static INIT_ENV: Once = Once::new();

pub fn init_env() {
    INIT_ENV.call_once(|| {
        simple_logger::SimpleLogger::new()
            .with_level(log::Level::Info.to_level_filter())
            .env()
            .init()
            .unwrap();
    });
}

fn main() {
    init_env();

    let command = Command::try_parse().unwrap_or_else(|error| {
        use clap::error::ErrorKind;
        if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            error.exit();
        }
        let _ = error.print();
        std::process::exit(1);
    });
    match command {
        Command::Train {
            model,
            marian_vocab,
            vocab_size,
            character_coverage,
            training_sentence_size,
            min_piece_count,
            min_char_count,
            no_sentence_piece,
            options,
            input,
        } => {
            let corpus = read_lines(input.as_deref()).unwrap_or_else(|error| {
                eprintln!("{}", error);
                std::process::exit(1);
            });
            let trainer = TrainerOptions {
                vocab_size,
                character_coverage,
                training_sentence_size,
                min_piece_count,
                min_char_count,
                use_piece_oracle: !no_sentence_piece,
                ..TrainerOptions::default()
            };
            let trained =
                train(&corpus, options.to_options(), trainer).unwrap_or_else(|error| {
                    eprintln!("{}", error);
                    std::process::exit(1);
                });
            if let Err(error) = trained.to_file(&model) {
                eprintln!("{}", error);
                std::process::exit(1);
            }
            log::info!("model written to {}", model.display());
            if let Some(path) = marian_vocab {
                if let Err(error) = std::fs::write(&path, &trained.factor_spec) {
                    eprintln!("{}", error);
                    std::process::exit(1);
                }
                log::info!("factor vocabulary written to {}", path.display());
            }
        }
        Command::Encode { io } => {
            run_lines(&io, |tokenizer, line| {
                tokenizer.encode(line).map(|encoded| encoded.line()).map_err(|e| e.to_string())
            });
        }
        Command::Decode { io } => {
            run_lines(&io, |tokenizer, line| {
                tokenizer.decode_line(line).map(|decoded| decoded.text).map_err(|e| e.to_string())
            });
        }
    }
}

/// Runs a per-line transformation over the input, substituting an empty line
/// and logging on per-line errors.
fn run_lines(io: &IoArgs, apply: impl Fn(&Factok, &str) -> Result<String, String>) {
    let model = Model::from_file(&io.model).unwrap_or_else(|error| {
        eprintln!("{}", error);
        std::process::exit(1);
    });
    let tokenizer = Factok::from_model(model).unwrap_or_else(|error| {
        eprintln!("{}", error);
        std::process::exit(1);
    });
    let lines = read_lines(io.input.as_deref()).unwrap_or_else(|error| {
        eprintln!("{}", error);
        std::process::exit(1);
    });
    let mut output: Box<dyn Write> = match &io.output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(error) => {
                eprintln!("{}", error);
                std::process::exit(1);
            }
        },
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    for (number, line) in lines.iter().enumerate() {
        let fields: Vec<&str> = match &io.field_separator {
            Some(separator) => line.split(separator.as_str()).collect(),
            None => vec![line.as_str()],
        };
        let mut results = Vec::with_capacity(fields.len());
        for field in fields {
            match apply(&tokenizer, field) {
                Ok(result) => results.push(result),
                Err(error) => {
                    if !io.quiet {
                        log::warn!("line {}: {}", number + 1, error);
                    }
                    results.push(String::new());
                }
            }
        }
        let separator = io.field_separator.as_deref().unwrap_or("");
        if writeln!(output, "{}", results.join(separator)).is_err() {
            std::process::exit(1);
        }
    }
}

fn read_lines(path: Option<&Path>) -> std::io::Result<Vec<String>> {
    match path {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            reader.lines().collect()
        }
        None => std::io::stdin().lock().lines().collect(),
    }
}
