use std::path::Path;

use crate::error::InfoLmError;

/// Runtime settings for an [`InfoLmScorer`](crate::InfoLmScorer).
#[derive(Debug, Clone)]
pub struct InfoLmConfig {
    pub model_path: String,
    pub config_path: String,
    pub tokenizer_path: String,
    pub device: String,
    pub temperature: f64,
    /// `None` falls back to the model config's `max_length`.
    pub max_length: Option<usize>,
    pub batch_size: usize,
    /// Reserved for inverse-document-frequency weighting; carried but not applied.
    pub idf: bool,
}

impl InfoLmConfig {
    pub const DEFAULT_TEMPERATURE: f64 = 0.25;
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    /// Paths for a model directory holding `model.safetensors`, `config.json`
    /// and `tokenizer.json`.
    pub fn from_model_dir(model_dir: impl AsRef<Path>) -> Self {
        let dir = model_dir.as_ref();
        let path = |name: &str| dir.join(name).to_string_lossy().to_string();
        Self {
            model_path: path("model.safetensors"),
            config_path: path("config.json"),
            tokenizer_path: path("tokenizer.json"),
            ..Self::default()
        }
    }
}

impl Default for InfoLmConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            config_path: String::new(),
            tokenizer_path: String::new(),
            device: "cpu".to_string(),
            temperature: Self::DEFAULT_TEMPERATURE,
            max_length: None,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            idf: true,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct BertModelConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_eps")]
    pub layer_norm_eps: f64,
    #[serde(default = "default_hidden_act")]
    pub hidden_act: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_type_vocab_size() -> usize {
    2
}
fn default_eps() -> f64 {
    1e-12
}
fn default_hidden_act() -> String {
    "gelu".to_string()
}
fn default_max_length() -> usize {
    20
}

impl BertModelConfig {
    pub(crate) fn load(path: &Path) -> Result<Self, InfoLmError> {
        let data =
            std::fs::read_to_string(path).map_err(|e| InfoLmError::io("read config.json", e))?;
        serde_json::from_str(&data).map_err(|e| InfoLmError::json("parse config.json", e))
    }

    /// Longest sequence the scorer feeds the model.
    pub(crate) fn effective_max_length(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.max_length)
            .min(self.max_position_embeddings)
    }
}
