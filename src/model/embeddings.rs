use candle_core::{DType, Module, Tensor};
use candle_nn::{Embedding, VarBuilder};

use crate::config::BertModelConfig;
use crate::model::layers::{layer_norm, LayerNorm};

pub(crate) struct Embeddings {
    word: Embedding,
    position: Embedding,
    token_type: Embedding,
    layer_norm: LayerNorm,
}

impl Embeddings {
    pub(crate) fn load(cfg: &BertModelConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            word: candle_nn::embedding(cfg.vocab_size, cfg.hidden_size, vb.pp("word_embeddings"))?,
            position: candle_nn::embedding(
                cfg.max_position_embeddings,
                cfg.hidden_size,
                vb.pp("position_embeddings"),
            )?,
            token_type: candle_nn::embedding(
                cfg.type_vocab_size,
                cfg.hidden_size,
                vb.pp("token_type_embeddings"),
            )?,
            layer_norm: layer_norm(cfg.hidden_size, cfg.layer_norm_eps, vb.pp("LayerNorm"))?,
        })
    }

    /// `[vocab, hidden]` table, shared with the tied MLM decoder.
    pub(crate) fn word_embeddings(&self) -> &Tensor {
        self.word.embeddings()
    }

    /// `input_ids` is `[batch, seq_len]` u32; single-segment inputs use token type 0.
    pub(crate) fn forward(&self, input_ids: &Tensor) -> candle_core::Result<Tensor> {
        let (_, seq_len) = input_ids.dims2()?;
        let position_ids = Tensor::arange(0u32, seq_len as u32, input_ids.device())?;
        let token_type_ids = input_ids.zeros_like()?.to_dtype(DType::U32)?;

        let h = self.word.forward(input_ids)?;
        let h = h.broadcast_add(&self.position.forward(&position_ids)?)?;
        let h = (h + self.token_type.forward(&token_type_ids)?)?;
        self.layer_norm.forward(&h)
    }
}
