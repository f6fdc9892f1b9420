use candle_core::{Device, Tensor};
use infolm_rs::{
    compute_score, InfoLmConfig, InfoLmError, InfoLmScorer, InfoLmScorerBuilder,
    InformationMeasure, MaskedLanguageModel, SentenceDistributionBatch, SentenceTokenizer,
    SpecialTokens, TokenizedSentence,
};

const VOCAB: usize = 12;
const SPECIAL: SpecialTokens = SpecialTokens {
    pad: 0,
    cls: 1,
    sep: 2,
    mask: 3,
};

/// Logit for each vocabulary entry is the number of times that id occurs in
/// the (masked) sequence, so the prediction depends on the sentence content.
struct BagOfIdsModel {
    device: Device,
}

impl MaskedLanguageModel for BagOfIdsModel {
    fn masked_logits(
        &self,
        input_ids: &Tensor,
        _attention_mask: &Tensor,
        _masked_position: usize,
    ) -> Result<Tensor, InfoLmError> {
        let rows: Vec<Vec<u32>> = input_ids.to_vec2().expect("u32 ids");
        let batch = rows.len();
        let mut logits = vec![0f32; batch * VOCAB];
        for (b, row) in rows.iter().enumerate() {
            for &id in row {
                logits[b * VOCAB + id as usize] += 1.0;
            }
        }
        Ok(Tensor::from_vec(logits, (batch, VOCAB), &self.device).expect("logits tensor"))
    }

    fn vocab_size(&self) -> usize {
        VOCAB
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

/// One id per whitespace word, derived from the word length.
struct WordLengthTokenizer;

impl SentenceTokenizer for WordLengthTokenizer {
    fn tokenize(&self, sentence: &str, max_length: usize) -> Result<TokenizedSentence, InfoLmError> {
        let mut input_ids = vec![SPECIAL.cls];
        input_ids.extend(
            sentence
                .split_whitespace()
                .take(max_length - 2)
                .map(|w| 4 + (w.len() % (VOCAB - 4)) as u32),
        );
        input_ids.push(SPECIAL.sep);
        let mut attention_mask = vec![1u32; input_ids.len()];
        input_ids.resize(max_length, SPECIAL.pad);
        attention_mask.resize(max_length, 0);
        Ok(TokenizedSentence {
            input_ids,
            attention_mask,
        })
    }

    fn special_tokens(&self) -> SpecialTokens {
        SPECIAL
    }
}

fn scorer(measure: InformationMeasure) -> InfoLmScorer {
    let config = InfoLmConfig {
        max_length: Some(8),
        batch_size: 2,
        ..InfoLmConfig::default()
    };
    InfoLmScorerBuilder::new(config)
        .with_measure(measure)
        .with_model(Box::new(BagOfIdsModel {
            device: Device::Cpu,
        }))
        .with_tokenizer(Box::new(WordLengthTokenizer))
        .build()
        .expect("scorer with injected parts builds")
}

#[test]
fn identical_corpora_score_zero() {
    let corpus = ["the cat sat", "a dog barked loudly", "hello", "birds fly south"];
    // Fisher-Rao is acos near 1, so f32 rounding in the rows shows up as ~1e-4.
    for (measure, tol) in [
        (InformationMeasure::L1Distance, 1e-5),
        (InformationMeasure::FisherRaoDistance, 2e-3),
        (InformationMeasure::KlDivergence, 1e-5),
    ] {
        let scores = scorer(measure).score(&corpus, &corpus).unwrap();
        assert_eq!(scores.sentence_scores.len(), corpus.len());
        for score in &scores.sentence_scores {
            assert!(score.abs() < tol, "expected ~0, got {score}");
        }
        assert!(scores.corpus_score().abs() < tol);
    }
}

#[test]
fn different_sentences_score_positive() {
    let scores = scorer(InformationMeasure::L2Distance)
        .score(&["a bb ccc"], &["dddd eeeee ffffff"])
        .unwrap();
    assert!(scores.sentence_scores[0] > 0.0);
}

#[test]
fn kl_divergence_is_asymmetric_end_to_end() {
    let s = scorer(InformationMeasure::KlDivergence);
    let forward = s.score_pair("a bb bb", "a bb ccc dddd").unwrap();
    let backward = s.score_pair("a bb ccc dddd", "a bb bb").unwrap();
    assert!(forward.is_finite() && backward.is_finite());
    assert!((forward - backward).abs() > 1e-9);
}

#[test]
fn corpus_length_mismatch_is_an_error() {
    let err = scorer(InformationMeasure::L1Distance)
        .score(&["one", "two"], &["one"])
        .unwrap_err();
    assert!(matches!(err, InfoLmError::DimensionMismatch { .. }));
}

#[test]
fn empty_corpora_give_no_scores() {
    let empty: [&str; 0] = [];
    let scores = scorer(InformationMeasure::L1Distance)
        .score(&empty, &empty)
        .unwrap();
    assert!(scores.sentence_scores.is_empty());
    assert!(scores.corpus_score().is_nan());
}

#[test]
fn sentence_without_content_is_nan_only_for_itself() {
    let scores = scorer(InformationMeasure::L1Distance)
        .score(&["", "the cat"], &["the cat", "the cat"])
        .unwrap();
    assert!(scores.sentence_scores[0].is_nan());
    assert!(scores.sentence_scores[1].abs() < 1e-6);
}

#[test]
fn compute_score_reference_values() {
    let p = SentenceDistributionBatch::new(vec![vec![0.5, 0.3, 0.2], vec![1.0, 0.0, 0.0]]).unwrap();
    let q = SentenceDistributionBatch::new(vec![vec![0.5, 0.3, 0.2], vec![0.0, 1.0, 0.0]]).unwrap();

    let l1 = compute_score(&p, &q, &InformationMeasure::L1Distance).unwrap();
    assert!(l1[0].abs() < 1e-12);
    assert!((l1[1] - 2.0).abs() < 1e-12);

    let l2 = compute_score(&p, &q, &InformationMeasure::L2Distance).unwrap();
    assert!((l2[1] - std::f64::consts::SQRT_2).abs() < 1e-12);

    let fr = compute_score(&p, &q, &InformationMeasure::FisherRaoDistance).unwrap();
    assert!(fr[0].abs() < 1e-6);
    assert!((fr[1] - std::f64::consts::PI).abs() < 1e-12);

    let kl = compute_score(&p, &q, &InformationMeasure::KlDivergence).unwrap();
    assert!(kl[0].abs() < 1e-9);
}

#[test]
fn measure_built_by_name_scores_like_the_variant() {
    let by_name = InformationMeasure::new("Renyi_Divergence", Some(0.5), None).unwrap();
    assert_eq!(by_name, InformationMeasure::RenyiDivergence { alpha: 0.5 });
    let s = scorer(by_name);
    assert!(s.score_pair("the cat", "the cat").unwrap().abs() < 1e-5);
}
