use anyhow::{bail, Result};

use crate::ops_cpu::encoding::to_one_hot;
use crate::ops_cpu::softmax::softmax;

/// Additive guard on every log argument so a true-class probability
/// that underflows to zero cannot produce -inf.
const LOG_GUARD: f32 = 1e-7;

/// Everything [`cross_entropy_backward`] needs, bundled explicitly by
/// the forward pass instead of stashed as object state. Each cache
/// belongs to one batch; independent batches can be evaluated
/// concurrently without any call-order coupling.
pub struct CrossEntropyCache {
    losses: Vec<f32>,
    probs: Vec<f32>,
    one_hot: Vec<f32>,
    batch_size: usize,
    num_classes: usize,
}

impl CrossEntropyCache {
    /// Per-sample negative log-likelihood of the true class.
    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    /// Softmax probabilities computed by the forward pass.
    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    pub fn mean_loss(&self) -> f32 {
        if self.losses.is_empty() {
            return 0.0;
        }
        self.losses.iter().sum::<f32>() / self.batch_size as f32
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

/// Cross-entropy with logits, forward pass.
///
/// Runs the stable softmax over `logits`, one-hot encodes `targets`,
/// and returns per-sample losses `-sum(one_hot * ln(probs))` along
/// with the intermediates the backward pass consumes. Out-of-range
/// targets and mismatched logits length are input-validation errors.
pub fn cross_entropy_forward(
    logits: &[f32],
    targets: &[usize],
    num_classes: usize,
) -> Result<CrossEntropyCache> {
    let batch_size = targets.len();
    if logits.len() != batch_size * num_classes {
        bail!(
            "logits length {} does not match {} samples x {} classes",
            logits.len(),
            batch_size,
            num_classes
        );
    }

    let (one_hot, _) = to_one_hot(targets, Some(num_classes))?;
    let probs = softmax(logits, batch_size, num_classes);

    let mut losses = vec![0.0; batch_size];
    for b in 0..batch_size {
        let offset = b * num_classes;
        let mut loss = 0.0;
        for c in 0..num_classes {
            loss -= one_hot[offset + c] * (probs[offset + c] + LOG_GUARD).ln();
        }
        losses[b] = loss;
    }

    Ok(CrossEntropyCache {
        losses,
        probs,
        one_hot,
        batch_size,
        num_classes,
    })
}

/// Cross-entropy with logits, backward pass.
///
/// `upstream` carries one gradient scalar per sample (the gradient of
/// the final scalar loss with respect to that sample's loss). Returns
/// the gradient with respect to the logits,
/// `upstream * (probs * rowsum(one_hot) - one_hot)`, and the gradient
/// with respect to the targets treated as reals,
/// `-upstream * ln(probs)`.
pub fn cross_entropy_backward(cache: &CrossEntropyCache, upstream: &[f32]) -> (Vec<f32>, Vec<f32>) {
    assert_eq!(upstream.len(), cache.batch_size);

    let classes = cache.num_classes;
    let mut d_logits = vec![0.0; cache.batch_size * classes];
    let mut d_targets = vec![0.0; cache.batch_size * classes];

    for b in 0..cache.batch_size {
        let offset = b * classes;
        let one_hot_row_sum: f32 = cache.one_hot[offset..offset + classes].iter().sum();

        for c in 0..classes {
            let prob = cache.probs[offset + c];
            d_logits[offset + c] =
                upstream[b] * (prob * one_hot_row_sum - cache.one_hot[offset + c]);
            d_targets[offset + c] = -upstream[b] * (prob + LOG_GUARD).ln();
        }
    }

    (d_logits, d_targets)
}
