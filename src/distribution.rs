//! Sentence-level vocabulary distributions from masked-position inference.
//!
//! Every position of a sequence is replaced in turn by the mask token; the
//! model's temperature-scaled softmax at that position is accumulated over
//! content positions and divided by their count.

use candle_core::{DType, Tensor, D};

use crate::error::InfoLmError;
use crate::pipeline::traits::{MaskedLanguageModel, ProgressObserver};
use crate::types::{SentenceDistributionBatch, SpecialTokens, TokenizedSentence};

/// Content mask for one sequence: true where the id is not pad/sep/cls.
pub fn token_mask(input_ids: &[u32], special_tokens: &SpecialTokens) -> Vec<bool> {
    input_ids
        .iter()
        .map(|&id| special_tokens.is_content(id))
        .collect()
}

/// Mean masked-prediction distribution for each sentence of one batch.
///
/// A sentence without any content token yields a NaN row; the other rows of
/// the batch are unaffected.
pub fn batch_distribution(
    model: &dyn MaskedLanguageModel,
    batch: &[TokenizedSentence],
    temperature: f64,
    special_tokens: &SpecialTokens,
) -> Result<SentenceDistributionBatch, InfoLmError> {
    validate_temperature(temperature)?;
    let Some(first) = batch.first() else {
        return Ok(SentenceDistributionBatch::default());
    };
    let batch_size = batch.len();
    let seq_len = first.input_ids.len();
    if seq_len == 0 {
        return Err(InfoLmError::invalid_input("token sequences must not be empty"));
    }
    if let Some(bad) = batch
        .iter()
        .find(|s| s.input_ids.len() != seq_len || s.attention_mask.len() != seq_len)
    {
        return Err(InfoLmError::dimension_mismatch(
            "sequence length",
            seq_len,
            bad.input_ids.len().max(bad.attention_mask.len()),
        ));
    }

    let device = model.device();
    let ids: Vec<u32> = batch.iter().flat_map(|s| s.input_ids.iter().copied()).collect();
    let attention: Vec<u32> = batch
        .iter()
        .flat_map(|s| s.attention_mask.iter().copied())
        .collect();
    let content: Vec<f32> = batch
        .iter()
        .flat_map(|s| token_mask(&s.input_ids, special_tokens))
        .map(|keep| if keep { 1.0 } else { 0.0 })
        .collect();

    for (idx, row) in content.chunks(seq_len).enumerate() {
        if row.iter().all(|&w| w == 0.0) {
            tracing::warn!(
                sentence = idx,
                "sentence has no content tokens; its distribution will be NaN"
            );
        }
    }

    let attention_mask = Tensor::from_vec(attention, (batch_size, seq_len), device)
        .map_err(|e| InfoLmError::runtime("attention mask tensor", e))?;
    let content_mask = Tensor::from_vec(content.clone(), (batch_size, seq_len), device)
        .map_err(|e| InfoLmError::runtime("token mask tensor", e))?;

    let mut accumulated: Option<Tensor> = None;
    for position in 0..seq_len {
        // A column without content tokens contributes nothing to any sentence.
        if (0..batch_size).all(|b| content[b * seq_len + position] == 0.0) {
            continue;
        }

        let masked_ids = mask_column(&ids, seq_len, position, special_tokens.mask);
        let input_ids = Tensor::from_vec(masked_ids, (batch_size, seq_len), device)
            .map_err(|e| InfoLmError::runtime("masked input tensor", e))?;
        let logits = model.masked_logits(&input_ids, &attention_mask, position)?;

        let probs = (logits / temperature)
            .and_then(|t| candle_nn::ops::softmax(&t, D::Minus1))
            .map_err(|e| InfoLmError::runtime("temperature softmax", e))?;
        let weighted = content_mask
            .narrow(1, position, 1)
            .and_then(|w| w.to_dtype(probs.dtype()))
            .and_then(|w| probs.broadcast_mul(&w))
            .map_err(|e| InfoLmError::runtime("token mask weighting", e))?;

        accumulated = Some(match accumulated {
            None => weighted,
            Some(acc) => (acc + weighted).map_err(|e| InfoLmError::runtime("accumulate", e))?,
        });
    }

    let summed = match accumulated {
        Some(sum) => sum,
        None => Tensor::zeros((batch_size, model.vocab_size()), DType::F32, device)
            .map_err(|e| InfoLmError::runtime("empty accumulator", e))?,
    };
    let counts = content_mask
        .sum_keepdim(1)
        .and_then(|c| c.to_dtype(summed.dtype()))
        .map_err(|e| InfoLmError::runtime("token mask count", e))?;
    let mean = summed
        .broadcast_div(&counts)
        .map_err(|e| InfoLmError::runtime("distribution mean", e))?;

    SentenceDistributionBatch::from_tensor(&mean)
}

/// Runs [`batch_distribution`] over `sentences` in chunks of `batch_size`,
/// keeping corpus order.
pub fn data_distribution(
    model: &dyn MaskedLanguageModel,
    sentences: &[TokenizedSentence],
    batch_size: usize,
    temperature: f64,
    special_tokens: &SpecialTokens,
    observer: Option<&dyn ProgressObserver>,
) -> Result<SentenceDistributionBatch, InfoLmError> {
    if batch_size == 0 {
        return Err(InfoLmError::invalid_input("batch_size must be >= 1"));
    }
    validate_temperature(temperature)?;

    let total = sentences.len();
    let mut distributions = SentenceDistributionBatch::default();
    let mut processed = 0usize;
    for chunk in sentences.chunks(batch_size) {
        let batch = batch_distribution(model, chunk, temperature, special_tokens)?;
        distributions.extend(batch)?;
        processed += chunk.len();
        tracing::debug!(processed, total, "masked distribution batch done");
        if let Some(observer) = observer {
            observer.on_batch(processed, total);
        }
    }
    Ok(distributions)
}

fn mask_column(ids: &[u32], seq_len: usize, position: usize, mask_id: u32) -> Vec<u32> {
    let mut masked = ids.to_vec();
    for row in masked.chunks_mut(seq_len) {
        row[position] = mask_id;
    }
    masked
}

fn validate_temperature(temperature: f64) -> Result<(), InfoLmError> {
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(InfoLmError::invalid_input(format!(
            "temperature must be a positive finite number, got {temperature}"
        )));
    }
    Ok(())
}
