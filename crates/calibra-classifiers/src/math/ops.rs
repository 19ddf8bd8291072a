//! Scalar and vector helpers for the logistic objective.

/// Logits are clipped to `[-LOGIT_BOUND, LOGIT_BOUND]` before `exp`.
pub const LOGIT_BOUND: f64 = 30.0;

#[inline]
pub fn clip_logit(z: f64) -> f64 {
    z.clamp(-LOGIT_BOUND, LOGIT_BOUND)
}

/// Logistic sigmoid of a clipped logit.
///
/// With the logit bounded to ±30 the result stays inside
/// `[sigmoid(-30), sigmoid(30)] ≈ [9.4e-14, 1 - 9.4e-14]`, so callers never
/// see exactly 0 or 1 and `ln(p)` / `ln(1 - p)` are always finite.
#[inline]
pub fn sigmoid(z: f64) -> f64 {
    let z = clip_logit(z);
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary cross-entropy of one row, for a probability produced by [`sigmoid`].
#[inline]
pub fn log_loss_term(p: f64, label: f64) -> f64 {
    -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
}

/// Rescale `grad` in place so its L2 norm is at most `max_norm`.
///
/// Returns the norm measured before clipping.
pub fn clip_by_global_norm(grad: &mut [f64], max_norm: f64) -> f64 {
    let norm = crate::math::vector::l2_norm(grad);
    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for g in grad.iter_mut() {
            *g *= scale;
        }
    }
    norm
}
