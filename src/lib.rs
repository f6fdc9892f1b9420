pub mod config;
pub mod distribution;
pub mod error;
pub mod measure;
mod model;
pub mod pipeline;
pub mod types;

pub use config::InfoLmConfig;
pub use distribution::{batch_distribution, data_distribution, token_mask};
pub use error::InfoLmError;
pub use measure::{InformationMeasure, MeasureKind};
pub use pipeline::builder::InfoLmScorerBuilder;
pub use pipeline::defaults::HfSentenceTokenizer;
pub use pipeline::runtime::{compute_score, InfoLmScorer};
pub use pipeline::traits::{MaskedLanguageModel, ProgressObserver, SentenceTokenizer};
pub use types::{InfoLmScores, SentenceDistributionBatch, SpecialTokens, TokenizedSentence};
