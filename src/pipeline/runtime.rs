use crate::distribution::data_distribution;
use crate::error::InfoLmError;
use crate::measure::InformationMeasure;
use crate::pipeline::traits::{MaskedLanguageModel, ProgressObserver, SentenceTokenizer};
use crate::types::{InfoLmScores, SentenceDistributionBatch, SpecialTokens, TokenizedSentence};

/// Applies `measure` to aligned prediction/reference distributions, one value
/// per sentence pair.
pub fn compute_score(
    preds: &SentenceDistributionBatch,
    target: &SentenceDistributionBatch,
    measure: &InformationMeasure,
) -> Result<Vec<f64>, InfoLmError> {
    measure.compute(preds, target)
}

pub struct InfoLmScorer {
    model: Box<dyn MaskedLanguageModel>,
    tokenizer: Box<dyn SentenceTokenizer>,
    special_tokens: SpecialTokens,
    measure: InformationMeasure,
    temperature: f64,
    max_length: usize,
    batch_size: usize,
    idf: bool,
}

pub(crate) struct InfoLmScorerParts {
    pub model: Box<dyn MaskedLanguageModel>,
    pub tokenizer: Box<dyn SentenceTokenizer>,
    pub measure: InformationMeasure,
    pub temperature: f64,
    pub max_length: usize,
    pub batch_size: usize,
    pub idf: bool,
}

impl InfoLmScorer {
    pub(crate) fn from_parts(parts: InfoLmScorerParts) -> Self {
        let special_tokens = parts.tokenizer.special_tokens();
        Self {
            model: parts.model,
            tokenizer: parts.tokenizer,
            special_tokens,
            measure: parts.measure,
            temperature: parts.temperature,
            max_length: parts.max_length,
            batch_size: parts.batch_size,
            idf: parts.idf,
        }
    }

    pub fn measure(&self) -> &InformationMeasure {
        &self.measure
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn idf(&self) -> bool {
        self.idf
    }

    pub fn device_label(&self) -> String {
        self.model.device_label()
    }

    pub fn tokenize_corpus<S: AsRef<str>>(
        &self,
        sentences: &[S],
    ) -> Result<Vec<TokenizedSentence>, InfoLmError> {
        sentences
            .iter()
            .map(|s| self.tokenizer.tokenize(s.as_ref(), self.max_length))
            .collect()
    }

    pub fn sentence_distributions<S: AsRef<str>>(
        &self,
        sentences: &[S],
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<SentenceDistributionBatch, InfoLmError> {
        let tokenized = self.tokenize_corpus(sentences)?;
        data_distribution(
            self.model.as_ref(),
            &tokenized,
            self.batch_size,
            self.temperature,
            &self.special_tokens,
            observer,
        )
    }

    pub fn score<S: AsRef<str>>(
        &self,
        preds: &[S],
        targets: &[S],
    ) -> Result<InfoLmScores, InfoLmError> {
        self.score_with_observer(preds, targets, None)
    }

    /// Like [`score`](Self::score), reporting progress once per processed batch
    /// of predictions and then of references.
    pub fn score_with_observer<S: AsRef<str>>(
        &self,
        preds: &[S],
        targets: &[S],
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<InfoLmScores, InfoLmError> {
        if preds.len() != targets.len() {
            return Err(InfoLmError::dimension_mismatch(
                "corpus size",
                preds.len(),
                targets.len(),
            ));
        }
        if preds.is_empty() {
            return Ok(InfoLmScores {
                sentence_scores: Vec::new(),
            });
        }

        tracing::debug!(
            sentences = preds.len(),
            measure = %self.measure,
            temperature = self.temperature,
            max_length = self.max_length,
            idf = self.idf,
            "scoring corpus"
        );

        let preds_distribution = self.sentence_distributions(preds, observer)?;
        let target_distribution = self.sentence_distributions(targets, observer)?;
        let sentence_scores = compute_score(&preds_distribution, &target_distribution, &self.measure)?;

        let non_finite = sentence_scores.iter().filter(|s| !s.is_finite()).count();
        if non_finite > 0 {
            tracing::warn!(
                non_finite,
                measure = %self.measure,
                "some sentence scores are not finite"
            );
        }
        Ok(InfoLmScores { sentence_scores })
    }

    pub fn score_pair(&self, pred: &str, target: &str) -> Result<f64, InfoLmError> {
        let scores = self.score(&[pred], &[target])?;
        scores
            .sentence_scores
            .first()
            .copied()
            .ok_or_else(|| InfoLmError::runtime("score pair", "no score produced"))
    }
}
