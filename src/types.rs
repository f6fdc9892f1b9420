use candle_core::Tensor;
use serde::Serialize;

use crate::error::InfoLmError;

/// One sentence after tokenization, truncated or padded to exactly `max_length` ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedSentence {
    pub input_ids: Vec<u32>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<u32>,
}

/// Special token ids of a tokenizer/model pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: u32,
    pub sep: u32,
    pub cls: u32,
    pub mask: u32,
}

impl SpecialTokens {
    /// Whether `id` is a content token, i.e. not pad/sep/cls.
    pub fn is_content(&self, id: u32) -> bool {
        id != self.pad && id != self.sep && id != self.cls
    }
}

/// One averaged vocabulary distribution per sentence, in corpus order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SentenceDistributionBatch {
    rows: Vec<Vec<f32>>,
    vocab_size: usize,
}

impl SentenceDistributionBatch {
    pub fn new(rows: Vec<Vec<f32>>) -> Result<Self, InfoLmError> {
        let vocab_size = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != vocab_size) {
            return Err(InfoLmError::dimension_mismatch(
                "distribution rows",
                vocab_size,
                bad.len(),
            ));
        }
        Ok(Self { rows, vocab_size })
    }

    /// Copies a `[batch, vocab]` tensor to host memory.
    pub fn from_tensor(tensor: &Tensor) -> Result<Self, InfoLmError> {
        let rows: Vec<Vec<f32>> = tensor
            .to_dtype(candle_core::DType::F32)
            .and_then(|t| t.to_vec2())
            .map_err(|e| InfoLmError::runtime("distribution to_vec2", e))?;
        let vocab_size = tensor
            .dims2()
            .map_err(|e| InfoLmError::runtime("distribution dims2", e))?
            .1;
        Ok(Self { rows, vocab_size })
    }

    /// Appends the rows of `other`, which must share this batch's vocabulary size.
    pub fn extend(&mut self, other: SentenceDistributionBatch) -> Result<(), InfoLmError> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.vocab_size != self.vocab_size {
            return Err(InfoLmError::dimension_mismatch(
                "distribution vocabulary",
                self.vocab_size,
                other.vocab_size,
            ));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-sentence InfoLM scores, aligned with the input corpora.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoLmScores {
    pub sentence_scores: Vec<f64>,
}

impl InfoLmScores {
    /// Mean over sentence scores. NaN when there are no sentences.
    pub fn corpus_score(&self) -> f64 {
        if self.sentence_scores.is_empty() {
            return f64::NAN;
        }
        self.sentence_scores.iter().sum::<f64>() / self.sentence_scores.len() as f64
    }
}
