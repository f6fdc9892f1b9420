use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;

use crate::config::{BertModelConfig, InfoLmConfig};
use crate::error::InfoLmError;
use crate::model::masked_lm::BertForMaskedLm;
use crate::pipeline::traits::MaskedLanguageModel;

/// BERT masked-LM on candle, loaded from a safetensors checkpoint.
pub(crate) struct CandleMaskedLm {
    model: BertForMaskedLm,
    device: Device,
}

impl CandleMaskedLm {
    pub(crate) fn load(
        config: &InfoLmConfig,
        model_cfg: &BertModelConfig,
    ) -> Result<Self, InfoLmError> {
        let device = parse_device(&config.device)?;

        let model_data = std::fs::read(&config.model_path)
            .map_err(|e| InfoLmError::io("read safetensors", e))?;
        let vb = VarBuilder::from_buffered_safetensors(model_data, DType::F32, &device)
            .map_err(|e| InfoLmError::runtime("load safetensors", e))?;
        let model = BertForMaskedLm::load(model_cfg, vb)
            .map_err(|e| InfoLmError::runtime("build model", e))?;

        tracing::info!(
            hidden_size = model_cfg.hidden_size,
            layers = model_cfg.num_hidden_layers,
            vocab = model_cfg.vocab_size,
            ?device,
            "masked language model loaded"
        );

        Ok(Self { model, device })
    }
}

impl MaskedLanguageModel for CandleMaskedLm {
    fn masked_logits(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        masked_position: usize,
    ) -> Result<Tensor, InfoLmError> {
        let (_, seq_len) = input_ids
            .dims2()
            .map_err(|e| InfoLmError::runtime("input_ids dims2", e))?;
        if masked_position >= seq_len {
            return Err(InfoLmError::invalid_input(format!(
                "masked position {masked_position} out of range for sequence length {seq_len}"
            )));
        }
        self.model
            .masked_logits(input_ids, attention_mask, masked_position)
            .map_err(|e| InfoLmError::runtime("forward pass", e))
    }

    fn vocab_size(&self) -> usize {
        self.model.vocab_size()
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

/// Accepts `cpu`, `cuda`, `cuda:N` and `metal`.
pub(crate) fn parse_device(name: &str) -> Result<Device, InfoLmError> {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "cpu" | "" => Ok(Device::Cpu),
        "metal" => Device::new_metal(0).map_err(|e| InfoLmError::runtime("Metal init", e)),
        "cuda" => Device::new_cuda(0).map_err(|e| InfoLmError::runtime("CUDA init", e)),
        other => {
            let ordinal = other
                .strip_prefix("cuda:")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| {
                    InfoLmError::invalid_input(format!(
                        "unsupported device '{other}', expected 'cpu', 'cuda', 'cuda:N' or 'metal'"
                    ))
                })?;
            Device::new_cuda(ordinal).map_err(|e| InfoLmError::runtime("CUDA init", e))
        }
    }
}
