//! Row-level formulas. `p` is the predicted distribution, `q` the reference.
//! Sums run in f64 over f32 inputs.

use std::f64::consts::PI;

#[inline]
fn pairs<'a>(p: &'a [f32], q: &'a [f32]) -> impl Iterator<Item = (f64, f64)> + 'a {
    p.iter().zip(q).map(|(&pi, &qi)| (pi as f64, qi as f64))
}

/// Σ P·log(P/Q)
pub fn kl_divergence(p: &[f32], q: &[f32]) -> f64 {
    pairs(p, q).map(|(pi, qi)| pi * (pi / qi).ln()).sum()
}

/// (1 − Σ Qᵅ·P^(1−α)) / (α·(α−1))
pub fn alpha_divergence(p: &[f32], q: &[f32], alpha: f64) -> f64 {
    let mixed: f64 = pairs(p, q)
        .map(|(pi, qi)| qi.powf(alpha) * pi.powf(1.0 - alpha))
        .sum();
    (1.0 - mixed) / (alpha * (alpha - 1.0))
}

/// log(Σ Q^(α+β))/(β(α+β)) + log(Σ P^(α+β))/(α+β) − log(Σ Qᵅ·Pᵝ)/(αβ)
///
/// At `alpha == 1` this is the beta divergence, and only then is it zero for
/// `p == q`.
pub fn ab_divergence(p: &[f32], q: &[f32], alpha: f64, beta: f64) -> f64 {
    let sum_ab = alpha + beta;
    let mut target_pow = 0.0f64;
    let mut preds_pow = 0.0f64;
    let mut mixed = 0.0f64;
    for (pi, qi) in pairs(p, q) {
        target_pow += qi.powf(sum_ab);
        preds_pow += pi.powf(sum_ab);
        mixed += qi.powf(alpha) * pi.powf(beta);
    }
    target_pow.ln() / (beta * sum_ab) + preds_pow.ln() / sum_ab
        - mixed.ln() / (alpha * beta)
}

/// log(Σ Qᵅ·P^(1−α)) / (α−1)
pub fn renyi_divergence(p: &[f32], q: &[f32], alpha: f64) -> f64 {
    let mixed: f64 = pairs(p, q)
        .map(|(pi, qi)| qi.powf(alpha) * pi.powf(1.0 - alpha))
        .sum();
    mixed.ln() / (alpha - 1.0)
}

pub fn l1_distance(p: &[f32], q: &[f32]) -> f64 {
    pairs(p, q).map(|(pi, qi)| (qi - pi).abs()).sum()
}

pub fn l2_distance(p: &[f32], q: &[f32]) -> f64 {
    pairs(p, q)
        .map(|(pi, qi)| {
            let d = qi - pi;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

pub fn l_infinity_distance(p: &[f32], q: &[f32]) -> f64 {
    // f64::max drops NaN, so NaN is folded in explicitly.
    pairs(p, q).fold(0.0f64, |acc, (pi, qi)| {
        let d = (qi - pi).abs();
        if d.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(d)
        }
    })
}

/// 2·arccos(clamp(Σ √(P·Q), 0, 1)), always within [0, π] for finite input.
pub fn fisher_rao_distance(p: &[f32], q: &[f32]) -> f64 {
    let affinity: f64 = pairs(p, q).map(|(pi, qi)| (pi * qi).sqrt()).sum();
    2.0 * affinity.clamp(0.0, 1.0).acos()
}
