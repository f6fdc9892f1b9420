use std::path::Path;

use crate::config::{BertModelConfig, InfoLmConfig};
use crate::error::InfoLmError;
use crate::measure::InformationMeasure;
use crate::pipeline::defaults::HfSentenceTokenizer;
use crate::pipeline::model_runtime::CandleMaskedLm;
use crate::pipeline::runtime::{InfoLmScorer, InfoLmScorerParts};
use crate::pipeline::traits::{MaskedLanguageModel, SentenceTokenizer};

pub struct InfoLmScorerBuilder {
    config: InfoLmConfig,
    measure: InformationMeasure,
    model: Option<Box<dyn MaskedLanguageModel>>,
    tokenizer: Option<Box<dyn SentenceTokenizer>>,
}

impl InfoLmScorerBuilder {
    pub fn new(config: InfoLmConfig) -> Self {
        Self {
            config,
            measure: InformationMeasure::KlDivergence,
            model: None,
            tokenizer: None,
        }
    }

    pub fn with_measure(mut self, measure: InformationMeasure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_model(mut self, model: Box<dyn MaskedLanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn SentenceTokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Loads whatever was not injected. `config.json` is only read when the
    /// model must be built or `max_length` must come from it.
    pub fn build(self) -> Result<InfoLmScorer, InfoLmError> {
        validate_config(&self.config)?;

        let model_cfg = if self.model.is_none() || self.config.max_length.is_none() {
            Some(BertModelConfig::load(Path::new(&self.config.config_path))?)
        } else {
            None
        };
        let max_length = match (&model_cfg, self.config.max_length) {
            (Some(cfg), requested) => cfg.effective_max_length(requested),
            (None, Some(requested)) => requested,
            (None, None) => {
                return Err(InfoLmError::invalid_input(
                    "max_length is unset and no model config was loaded",
                ))
            }
        };
        if max_length < 2 {
            return Err(InfoLmError::invalid_input(format!(
                "max_length must be >= 2, got {max_length}"
            )));
        }

        let model: Box<dyn MaskedLanguageModel> = match self.model {
            Some(model) => model,
            None => {
                let cfg = model_cfg.as_ref().ok_or_else(|| {
                    InfoLmError::invalid_input("no model injected and no model config loaded")
                })?;
                Box::new(CandleMaskedLm::load(&self.config, cfg)?)
            }
        };
        let tokenizer: Box<dyn SentenceTokenizer> = match self.tokenizer {
            Some(tokenizer) => tokenizer,
            None => Box::new(HfSentenceTokenizer::from_file(&self.config.tokenizer_path)?),
        };

        if !self.config.idf {
            tracing::debug!("idf weighting disabled");
        }
        tracing::info!(
            measure = %self.measure,
            temperature = self.config.temperature,
            max_length,
            batch_size = self.config.batch_size,
            device = %model.device_label(),
            "InfoLM scorer ready"
        );

        Ok(InfoLmScorer::from_parts(InfoLmScorerParts {
            model,
            tokenizer,
            measure: self.measure,
            temperature: self.config.temperature,
            max_length,
            batch_size: self.config.batch_size,
            idf: self.config.idf,
        }))
    }
}

fn validate_config(config: &InfoLmConfig) -> Result<(), InfoLmError> {
    if !config.temperature.is_finite() || config.temperature <= 0.0 {
        return Err(InfoLmError::invalid_input(format!(
            "temperature must be a positive finite number, got {}",
            config.temperature
        )));
    }
    if config.batch_size == 0 {
        return Err(InfoLmError::invalid_input("batch_size must be >= 1"));
    }
    Ok(())
}
