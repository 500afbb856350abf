//! The persisted model.
//!
//! A model bundles everything both sides of the pipeline need: the options,
//! the embedded piece-oracle blob, the known-lemma set with its factor-type
//! map, the shortlist vocabulary and the factor spec. Model files carry the
//! `.fsm` extension so that derived artifact paths can be formed by extension
//! substitution.

use std::fs::File;
use std::io::{Read, Result as IOResult, Write};
use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::factor::FactorTypeSet;

/// Required extension of model files.
pub const MODEL_EXTENSION: &str = "fsm";

const MAGIC: &[u8] = b"factok";
const VERSION: &[u8] = &[0, 2];

/// Errors encountered when reading or writing a model.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DeserializationError {
    /// The data is invalid. See the error message for more information.
    #[error("{0}")]
    InvalidData(String),
    /// Reading the data failed.
    #[error("{0}")]
    IOError(#[from] std::io::Error),
}

/// A trained model.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    /// The model options.
    pub options: Options,
    /// The embedded piece-oracle blob, if the model splits subwords.
    pub oracle: Option<Vec<u8>>,
    /// The known lemmas with their factor-type sets, sorted by lemma.
    pub lemmas: Vec<(String, FactorTypeSet)>,
    /// The shortlist vocabulary: escaped lemmas in canonical order.
    pub shortlist: Vec<String>,
    /// The factor spec consumed by the downstream toolkit.
    pub factor_spec: String,
}

impl Model {
    /// A model with the given options and nothing else; encodes without
    /// subword splitting or representability checks.
    pub fn with_options(options: Options) -> Self {
        Self { options, ..Self::default() }
    }

    /// The known-lemma lookup map.
    pub(crate) fn lemma_map(&self) -> HashMap<String, FactorTypeSet> {
        self.lemmas.iter().cloned().collect()
    }

    /// Deserializes a model from a reader.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self, DeserializationError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_slice(&data)
    }

    /// Deserializes a model from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DeserializationError> {
        let mut file = File::open(path)?;
        Self::from_reader(&mut file)
    }

    /// Deserializes a model from bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, DeserializationError> {
        if slice.len() < MAGIC.len() + VERSION.len() {
            return Err(DeserializationError::InvalidData("invalid size".to_string()));
        }
        if &slice[..MAGIC.len()] != MAGIC {
            return Err(DeserializationError::InvalidData("invalid magic".to_string()));
        }
        if &slice[MAGIC.len()..MAGIC.len() + VERSION.len()] != VERSION {
            return Err(DeserializationError::InvalidData("invalid version".to_string()));
        }
        let model = postcard::from_bytes(&slice[MAGIC.len() + VERSION.len()..])
            .map_err(|e| DeserializationError::InvalidData(e.to_string()))?;
        Ok(model)
    }

    /// Serializes the model to a writer.
    pub fn to_writer<W: Write>(&self, writer: &mut W) -> IOResult<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(VERSION)?;
        let data = postcard::to_allocvec(self).unwrap();
        writer.write_all(&data)?;
        Ok(())
    }

    /// Serializes the model to a file, which must carry the `.fsm` extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> IOResult<()> {
        let path = path.as_ref();
        if path.extension().map_or(true, |e| e != MODEL_EXTENSION) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("model files require the .{} extension", MODEL_EXTENSION),
            ));
        }
        let mut file = File::create(path)?;
        self.to_writer(&mut file)
    }

    /// Serializes the model to bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        let data = postcard::to_allocvec(self).unwrap();
        let mut vec = Vec::with_capacity(MAGIC.len() + VERSION.len() + data.len());
        vec.extend_from_slice(MAGIC);
        vec.extend_from_slice(VERSION);
        vec.extend_from_slice(&data);
        vec
    }
}

impl core::fmt::Debug for Model {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Model")
            .field("options", &self.options)
            .field("oracle", &self.oracle.as_ref().map(|blob| format!("Blob({})", blob.len())))
            .field("lemmas", &format!("Lemmas({})", self.lemmas.len()))
            .field("shortlist", &format!("Shortlist({})", self.shortlist.len()))
            .field("factor_spec", &format!("FactorSpec({})", self.factor_spec.len()))
            .finish()
    }
}
