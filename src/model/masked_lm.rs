use candle_core::{Module, Tensor};
use candle_nn::{Linear, VarBuilder};

use crate::config::BertModelConfig;
use crate::model::embeddings::Embeddings;
use crate::model::encoder::Encoder;
use crate::model::layers::{layer_norm, HiddenAct, LayerNorm};

struct PredictionHead {
    dense: Linear,
    act: HiddenAct,
    norm: LayerNorm,
    decoder: Linear,
}

impl PredictionHead {
    fn load(
        cfg: &BertModelConfig,
        vb: VarBuilder,
        tied_embeddings: &Tensor,
    ) -> candle_core::Result<Self> {
        let transform = vb.pp("transform");
        let decoder_vb = vb.pp("decoder");
        // Most exports tie the decoder to the word embeddings and omit its weight.
        let decoder_weight = if decoder_vb.contains_tensor("weight") {
            decoder_vb.get((cfg.vocab_size, cfg.hidden_size), "weight")?
        } else {
            tied_embeddings.clone()
        };
        let decoder_bias = vb.get(cfg.vocab_size, "bias")?;
        Ok(Self {
            dense: candle_nn::linear(cfg.hidden_size, cfg.hidden_size, transform.pp("dense"))?,
            act: HiddenAct::parse(&cfg.hidden_act)?,
            norm: layer_norm(cfg.hidden_size, cfg.layer_norm_eps, transform.pp("LayerNorm"))?,
            decoder: Linear::new(decoder_weight, Some(decoder_bias)),
        })
    }

    fn forward(&self, hidden: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.act.forward(&self.dense.forward(hidden)?)?;
        self.decoder.forward(&self.norm.forward(&h)?)
    }
}

pub(crate) struct BertForMaskedLm {
    embeddings: Embeddings,
    encoder: Encoder,
    head: PredictionHead,
    vocab_size: usize,
}

impl BertForMaskedLm {
    pub(crate) fn load(cfg: &BertModelConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let bert = vb.pp("bert");
        let embeddings = Embeddings::load(cfg, bert.pp("embeddings"))?;
        let encoder = Encoder::load(cfg, bert.pp("encoder"))?;
        let head = PredictionHead::load(
            cfg,
            vb.pp("cls").pp("predictions"),
            embeddings.word_embeddings(),
        )?;
        Ok(Self {
            embeddings,
            encoder,
            head,
            vocab_size: cfg.vocab_size,
        })
    }

    pub(crate) fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Vocabulary logits `[batch, vocab]` at `position` only; the prediction
    /// head is not run for the other positions.
    pub(crate) fn masked_logits(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        position: usize,
    ) -> candle_core::Result<Tensor> {
        let h = self.embeddings.forward(input_ids)?;
        let h = self.encoder.forward(&h, attention_mask)?;
        let at_position = h.narrow(1, position, 1)?.squeeze(1)?;
        self.head.forward(&at_position)
    }
}

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    use super::*;

    fn tiny_config() -> BertModelConfig {
        serde_json::from_str(
            r#"{
                "vocab_size": 11,
                "hidden_size": 8,
                "num_hidden_layers": 2,
                "num_attention_heads": 2,
                "intermediate_size": 16,
                "max_position_embeddings": 16
            }"#,
        )
        .expect("valid tiny config")
    }

    #[test]
    fn masked_logits_shape_matches_batch_and_vocab() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = BertForMaskedLm::load(&tiny_config(), vb).expect("tiny model loads");
        assert_eq!(model.vocab_size(), 11);

        let ids = Tensor::new(&[[1u32, 5, 4, 2, 0], [1, 7, 8, 9, 2]], &device).unwrap();
        let mask = Tensor::new(&[[1u32, 1, 1, 1, 0], [1, 1, 1, 1, 1]], &device).unwrap();
        let logits = model.masked_logits(&ids, &mask, 2).unwrap();
        assert_eq!(logits.dims(), &[2, 11]);
        let values: Vec<Vec<f32>> = logits.to_vec2().unwrap();
        assert!(values.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_indivisible_head_count() {
        let mut cfg = tiny_config();
        cfg.num_attention_heads = 3;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        assert!(BertForMaskedLm::load(&cfg, vb).is_err());
    }
}
