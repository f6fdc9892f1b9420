use candle_core::{Device, Tensor};

use crate::error::InfoLmError;
use crate::types::{SpecialTokens, TokenizedSentence};

pub trait SentenceTokenizer: Send + Sync {
    /// Tokenizes with special tokens, truncating or padding to exactly `max_length`.
    fn tokenize(&self, sentence: &str, max_length: usize)
        -> Result<TokenizedSentence, InfoLmError>;

    fn special_tokens(&self) -> SpecialTokens;
}

pub trait MaskedLanguageModel: Send + Sync {
    /// Logits over the vocabulary at `masked_position` for every sequence in
    /// the batch. `input_ids` and `attention_mask` are `[batch, seq_len]` u32
    /// tensors; the result is `[batch, vocab_size]`.
    fn masked_logits(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        masked_position: usize,
    ) -> Result<Tensor, InfoLmError>;

    fn vocab_size(&self) -> usize;

    fn device(&self) -> &Device;

    fn device_label(&self) -> String {
        let device = self.device();
        if device.is_cuda() {
            "cuda".to_string()
        } else if device.is_metal() {
            "metal".to_string()
        } else {
            "cpu".to_string()
        }
    }
}

/// Receives progress after every processed batch of sentences.
pub trait ProgressObserver {
    fn on_batch(&self, processed: usize, total: usize);
}
