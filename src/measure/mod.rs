//! Information measures between discrete distributions.
//!
//! Every measure compares a predicted distribution `P` against a reference
//! distribution `Q` row by row. Zero entries that reach a logarithm or a
//! division are not guarded: the result is NaN or infinite, as with the
//! plain formulas.

mod divergence;

use std::fmt;
use std::str::FromStr;

use crate::error::InfoLmError;
use crate::types::SentenceDistributionBatch;

pub use divergence::{
    ab_divergence, alpha_divergence, fisher_rao_distance, kl_divergence, l1_distance,
    l2_distance, l_infinity_distance, renyi_divergence,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureKind {
    KlDivergence,
    AlphaDivergence,
    BetaDivergence,
    AbDivergence,
    RenyiDivergence,
    L1Distance,
    L2Distance,
    LInfinityDistance,
    FisherRaoDistance,
}

impl MeasureKind {
    pub const ALL: [MeasureKind; 9] = [
        MeasureKind::KlDivergence,
        MeasureKind::AlphaDivergence,
        MeasureKind::BetaDivergence,
        MeasureKind::AbDivergence,
        MeasureKind::RenyiDivergence,
        MeasureKind::L1Distance,
        MeasureKind::L2Distance,
        MeasureKind::LInfinityDistance,
        MeasureKind::FisherRaoDistance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::KlDivergence => "kl_divergence",
            Self::AlphaDivergence => "alpha_divergence",
            Self::BetaDivergence => "beta_divergence",
            Self::AbDivergence => "ab_divergence",
            Self::RenyiDivergence => "renyi_divergence",
            Self::L1Distance => "l1_distance",
            Self::L2Distance => "l2_distance",
            Self::LInfinityDistance => "l_infinity_distance",
            Self::FisherRaoDistance => "fisher_rao_distance",
        }
    }

    fn expected_names() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasureKind {
    type Err = InfoLmError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let trimmed = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| InfoLmError::UnrecognizedMeasure {
                name: name.to_string(),
                expected: Self::expected_names(),
            })
    }
}

/// A validated information measure. Each variant carries exactly the
/// parameters its formula needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InformationMeasure {
    KlDivergence,
    AlphaDivergence { alpha: f64 },
    BetaDivergence { beta: f64 },
    AbDivergence { alpha: f64, beta: f64 },
    RenyiDivergence { alpha: f64 },
    L1Distance,
    L2Distance,
    LInfinityDistance,
    FisherRaoDistance,
}

impl InformationMeasure {
    /// Parses `name` case-insensitively and validates `alpha`/`beta` for it.
    /// Parameters a measure does not use are ignored.
    pub fn new(name: &str, alpha: Option<f64>, beta: Option<f64>) -> Result<Self, InfoLmError> {
        Self::from_kind(name.parse()?, alpha, beta)
    }

    pub fn from_kind(
        kind: MeasureKind,
        alpha: Option<f64>,
        beta: Option<f64>,
    ) -> Result<Self, InfoLmError> {
        let name = kind.as_str();
        let measure = match kind {
            MeasureKind::KlDivergence => Self::KlDivergence,
            MeasureKind::AlphaDivergence => {
                let alpha = require(name, "alpha", alpha)?;
                if alpha == 0.0 || alpha == 1.0 {
                    return Err(InfoLmError::invalid_parameter(
                        name,
                        "alpha",
                        "must differ from 0 and 1",
                    ));
                }
                Self::AlphaDivergence { alpha }
            }
            MeasureKind::BetaDivergence => {
                let beta = require(name, "beta", beta)?;
                if beta == 0.0 || beta == -1.0 {
                    return Err(InfoLmError::invalid_parameter(
                        name,
                        "beta",
                        "must differ from 0 and -1",
                    ));
                }
                Self::BetaDivergence { beta }
            }
            MeasureKind::AbDivergence => {
                let alpha = require(name, "alpha", alpha)?;
                let beta = require(name, "beta", beta)?;
                if alpha == 0.0 {
                    return Err(InfoLmError::invalid_parameter(
                        name,
                        "alpha",
                        "must differ from 0",
                    ));
                }
                if beta == 0.0 {
                    return Err(InfoLmError::invalid_parameter(
                        name,
                        "beta",
                        "must differ from 0",
                    ));
                }
                if alpha + beta == 0.0 {
                    return Err(InfoLmError::invalid_parameter(
                        name,
                        "alpha + beta",
                        "must differ from 0",
                    ));
                }
                Self::AbDivergence { alpha, beta }
            }
            MeasureKind::RenyiDivergence => {
                let alpha = require(name, "alpha", alpha)?;
                if alpha == 1.0 {
                    return Err(InfoLmError::invalid_parameter(
                        name,
                        "alpha",
                        "must differ from 1",
                    ));
                }
                Self::RenyiDivergence { alpha }
            }
            MeasureKind::L1Distance => Self::L1Distance,
            MeasureKind::L2Distance => Self::L2Distance,
            MeasureKind::LInfinityDistance => Self::LInfinityDistance,
            MeasureKind::FisherRaoDistance => Self::FisherRaoDistance,
        };
        Ok(measure)
    }

    pub fn kind(&self) -> MeasureKind {
        match self {
            Self::KlDivergence => MeasureKind::KlDivergence,
            Self::AlphaDivergence { .. } => MeasureKind::AlphaDivergence,
            Self::BetaDivergence { .. } => MeasureKind::BetaDivergence,
            Self::AbDivergence { .. } => MeasureKind::AbDivergence,
            Self::RenyiDivergence { .. } => MeasureKind::RenyiDivergence,
            Self::L1Distance => MeasureKind::L1Distance,
            Self::L2Distance => MeasureKind::L2Distance,
            Self::LInfinityDistance => MeasureKind::LInfinityDistance,
            Self::FisherRaoDistance => MeasureKind::FisherRaoDistance,
        }
    }

    /// Measure value for a single pair of aligned distributions.
    pub fn evaluate(&self, preds: &[f32], target: &[f32]) -> f64 {
        match *self {
            Self::KlDivergence => kl_divergence(preds, target),
            Self::AlphaDivergence { alpha } => alpha_divergence(preds, target, alpha),
            // Beta divergence is the AB divergence with alpha pinned to 1.
            Self::BetaDivergence { beta } => ab_divergence(preds, target, 1.0, beta),
            Self::AbDivergence { alpha, beta } => ab_divergence(preds, target, alpha, beta),
            Self::RenyiDivergence { alpha } => renyi_divergence(preds, target, alpha),
            Self::L1Distance => l1_distance(preds, target),
            Self::L2Distance => l2_distance(preds, target),
            Self::LInfinityDistance => l_infinity_distance(preds, target),
            Self::FisherRaoDistance => fisher_rao_distance(preds, target),
        }
    }

    /// One value per sentence pair. Both batches must have the same number of
    /// rows and the same vocabulary size.
    pub fn compute(
        &self,
        preds: &SentenceDistributionBatch,
        target: &SentenceDistributionBatch,
    ) -> Result<Vec<f64>, InfoLmError> {
        if preds.len() != target.len() {
            return Err(InfoLmError::dimension_mismatch(
                "batch size",
                preds.len(),
                target.len(),
            ));
        }
        if !preds.is_empty() && preds.vocab_size() != target.vocab_size() {
            return Err(InfoLmError::dimension_mismatch(
                "vocabulary size",
                preds.vocab_size(),
                target.vocab_size(),
            ));
        }

        Ok(preds
            .rows()
            .iter()
            .zip(target.rows())
            .map(|(p, q)| self.evaluate(p, q))
            .collect())
    }
}

impl fmt::Display for InformationMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlphaDivergence { alpha } | Self::RenyiDivergence { alpha } => {
                write!(f, "{}(alpha={alpha})", self.kind())
            }
            Self::BetaDivergence { beta } => write!(f, "{}(beta={beta})", self.kind()),
            Self::AbDivergence { alpha, beta } => {
                write!(f, "{}(alpha={alpha}, beta={beta})", self.kind())
            }
            _ => write!(f, "{}", self.kind()),
        }
    }
}

fn require(
    measure: &'static str,
    parameter: &'static str,
    value: Option<f64>,
) -> Result<f64, InfoLmError> {
    match value {
        None => Err(InfoLmError::invalid_parameter(
            measure,
            parameter,
            "is required",
        )),
        Some(v) if !v.is_finite() => Err(InfoLmError::invalid_parameter(
            measure,
            parameter,
            "must be a finite real number",
        )),
        Some(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(rows: Vec<Vec<f32>>) -> SentenceDistributionBatch {
        SentenceDistributionBatch::new(rows).expect("valid batch")
    }

    fn parameter_of(err: InfoLmError) -> &'static str {
        match err {
            InfoLmError::InvalidParameter { parameter, .. } => parameter,
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(
            "KL_Divergence".parse::<MeasureKind>().unwrap(),
            MeasureKind::KlDivergence
        );
        assert_eq!(
            " FISHER_RAO_DISTANCE ".parse::<MeasureKind>().unwrap(),
            MeasureKind::FisherRaoDistance
        );
        for kind in MeasureKind::ALL {
            assert_eq!(kind.as_str().parse::<MeasureKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = InformationMeasure::new("cosine_distance", None, None)
            .expect_err("unknown measure must fail");
        assert!(matches!(err, InfoLmError::UnrecognizedMeasure { .. }));
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("renyi_divergence"));
    }

    #[test]
    fn alpha_divergence_requires_alpha() {
        let err = InformationMeasure::new("alpha_divergence", None, None).unwrap_err();
        assert_eq!(parameter_of(err), "alpha");
    }

    #[test]
    fn alpha_divergence_rejects_zero_and_one() {
        for alpha in [0.0, 1.0] {
            let err = InformationMeasure::new("alpha_divergence", Some(alpha), None).unwrap_err();
            assert_eq!(parameter_of(err), "alpha");
        }
        assert!(InformationMeasure::new("alpha_divergence", Some(0.5), None).is_ok());
    }

    #[test]
    fn beta_divergence_validates_beta() {
        let err = InformationMeasure::new("beta_divergence", None, None).unwrap_err();
        assert_eq!(parameter_of(err), "beta");
        for beta in [0.0, -1.0] {
            let err = InformationMeasure::new("beta_divergence", None, Some(beta)).unwrap_err();
            assert_eq!(parameter_of(err), "beta");
        }
        // alpha plays no part in beta divergence validation.
        assert_eq!(
            InformationMeasure::new("beta_divergence", Some(0.0), Some(0.5)).unwrap(),
            InformationMeasure::BetaDivergence { beta: 0.5 }
        );
    }

    #[test]
    fn ab_divergence_rejects_zero_sum() {
        let err = InformationMeasure::new("ab_divergence", Some(0.5), Some(-0.5)).unwrap_err();
        assert_eq!(parameter_of(err), "alpha + beta");
        let err = InformationMeasure::new("ab_divergence", Some(0.0), Some(0.5)).unwrap_err();
        assert_eq!(parameter_of(err), "alpha");
        let err = InformationMeasure::new("ab_divergence", Some(0.5), Some(0.0)).unwrap_err();
        assert_eq!(parameter_of(err), "beta");
        let err = InformationMeasure::new("ab_divergence", Some(0.5), None).unwrap_err();
        assert_eq!(parameter_of(err), "beta");
    }

    #[test]
    fn renyi_divergence_rejects_one() {
        let err = InformationMeasure::new("renyi_divergence", Some(1.0), None).unwrap_err();
        assert_eq!(parameter_of(err), "alpha");
        assert!(InformationMeasure::new("renyi_divergence", Some(2.0), None).is_ok());
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let err = InformationMeasure::new("renyi_divergence", Some(f64::NAN), None).unwrap_err();
        assert!(err.is_configuration_error());
        let err =
            InformationMeasure::new("ab_divergence", Some(0.5), Some(f64::INFINITY)).unwrap_err();
        assert_eq!(parameter_of(err), "beta");
    }

    #[test]
    fn parameterless_measures_ignore_extra_parameters() {
        assert_eq!(
            InformationMeasure::new("l2_distance", Some(3.0), Some(4.0)).unwrap(),
            InformationMeasure::L2Distance
        );
    }

    #[test]
    fn beta_divergence_matches_ab_with_unit_alpha() {
        let p = [0.6f32, 0.3, 0.1];
        let q = [0.2f32, 0.5, 0.3];
        let beta = InformationMeasure::new("beta_divergence", None, Some(0.7)).unwrap();
        let ab = InformationMeasure::new("ab_divergence", Some(1.0), Some(0.7)).unwrap();
        let lhs = beta.evaluate(&p, &q);
        let rhs = ab.evaluate(&p, &q);
        assert!((lhs - rhs).abs() < 1e-12, "{lhs} vs {rhs}");
        // The stored parameter is untouched by evaluation.
        assert_eq!(beta, InformationMeasure::BetaDivergence { beta: 0.7 });
    }

    #[test]
    fn compute_preserves_row_order() {
        let preds = batch(vec![vec![0.5, 0.3, 0.2], vec![1.0, 0.0, 0.0]]);
        let target = batch(vec![vec![0.5, 0.3, 0.2], vec![0.0, 1.0, 0.0]]);
        let scores = InformationMeasure::L1Distance
            .compute(&preds, &target)
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0].abs() < 1e-12);
        assert!((scores[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn compute_rejects_batch_size_mismatch() {
        let preds = batch(vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
        let target = batch(vec![vec![0.5, 0.5]]);
        let err = InformationMeasure::KlDivergence
            .compute(&preds, &target)
            .unwrap_err();
        assert!(matches!(
            err,
            InfoLmError::DimensionMismatch {
                preds: 2,
                target: 1,
                ..
            }
        ));
    }

    #[test]
    fn compute_rejects_vocab_mismatch() {
        let preds = batch(vec![vec![0.5, 0.5]]);
        let target = batch(vec![vec![0.2, 0.3, 0.5]]);
        assert!(InformationMeasure::L2Distance
            .compute(&preds, &target)
            .is_err());
    }

    #[test]
    fn display_includes_parameters() {
        let m = InformationMeasure::new("AB_divergence", Some(0.5), Some(0.25)).unwrap();
        assert_eq!(m.to_string(), "ab_divergence(alpha=0.5, beta=0.25)");
        assert_eq!(InformationMeasure::KlDivergence.to_string(), "kl_divergence");
    }
}
