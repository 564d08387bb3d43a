use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::nn::optim::Optimizer;
use crate::ops_cpu::{argmax_rows, cross_entropy_backward, cross_entropy_forward, softmax};
use crate::train::{accuracy, Callbacks, Metrics};

/// Linear multiclass classifier (multinomial logistic regression).
///
/// Holds a `(features x classes)` row-major weight matrix, a bias
/// vector, and gradient buffers of the same shapes. Inference
/// (`predict_logits`, `predict_proba`, `predict`) never touches the
/// gradient buffers; only `fit` builds a cross-entropy cache and
/// back-propagates through the affine transform.
pub struct LinearClassifier {
    num_features: usize,
    num_classes: usize,
    w: Vec<f32>,
    b: Vec<f32>,
    dw: Vec<f32>,
    db: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(num_features: usize, num_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let w = (0..num_features * num_classes)
            .map(|_| rng.gen_range(-0.1..0.1))
            .collect();

        Self {
            num_features,
            num_classes,
            w,
            b: vec![0.0; num_classes],
            dw: vec![0.0; num_features * num_classes],
            db: vec![0.0; num_classes],
        }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Affine transform `x W + b`, one logits row per sample.
    pub fn predict_logits(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len() % self.num_features, 0);
        let batch_size = x.len() / self.num_features;

        let mut logits = vec![0.0; batch_size * self.num_classes];
        for i in 0..batch_size {
            for j in 0..self.num_classes {
                let mut sum = self.b[j];
                for k in 0..self.num_features {
                    sum += x[i * self.num_features + k] * self.w[k * self.num_classes + j];
                }
                logits[i * self.num_classes + j] = sum;
            }
        }
        logits
    }

    /// Softmax of the logits. Inference-only path, no intermediates
    /// are cached for backward.
    pub fn predict_proba(&self, x: &[f32]) -> Vec<f32> {
        let logits = self.predict_logits(x);
        let batch_size = logits.len() / self.num_classes;
        softmax(&logits, batch_size, self.num_classes)
    }

    /// Hard class assignment, row-wise argmax of the logits.
    pub fn predict(&self, x: &[f32]) -> Vec<usize> {
        let logits = self.predict_logits(x);
        let batch_size = logits.len() / self.num_classes;
        argmax_rows(&logits, batch_size, self.num_classes)
    }

    pub fn zero_grads(&mut self) {
        self.dw.fill(0.0);
        self.db.fill(0.0);
    }

    // dW = X^T * dY, db = column sums of dY, accumulated into the
    // gradient buffers.
    fn backward(&mut self, x: &[f32], d_logits: &[f32], batch_size: usize) {
        for k in 0..self.num_features {
            for j in 0..self.num_classes {
                let mut sum = 0.0;
                for i in 0..batch_size {
                    sum += x[i * self.num_features + k] * d_logits[i * self.num_classes + j];
                }
                self.dw[k * self.num_classes + j] += sum;
            }
        }

        for j in 0..self.num_classes {
            let mut sum = 0.0;
            for i in 0..batch_size {
                sum += d_logits[i * self.num_classes + j];
            }
            self.db[j] += sum;
        }
    }

    /// Full-batch gradient descent for `epochs` epochs. Each epoch runs
    /// forward, computes the mean cross-entropy loss, resets the
    /// gradient buffers, back-propagates through the loss and the
    /// affine transform, and applies one optimizer step. Returns
    /// per-epoch metrics.
    pub fn fit(
        &mut self,
        x: &[f32],
        y: &[usize],
        epochs: usize,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Vec<Metrics>> {
        self.fit_with(x, y, epochs, optimizer, &mut ())
    }

    pub fn fit_with<C: Callbacks>(
        &mut self,
        x: &[f32],
        y: &[usize],
        epochs: usize,
        optimizer: &mut dyn Optimizer,
        callbacks: &mut C,
    ) -> Result<Vec<Metrics>> {
        ensure!(!y.is_empty(), "cannot fit on an empty batch");
        ensure!(
            x.len() == y.len() * self.num_features,
            "features length {} does not match {} samples x {} features",
            x.len(),
            y.len(),
            self.num_features
        );

        let batch_size = y.len();
        let mut history = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            callbacks.on_epoch_begin(epoch);

            let logits = self.predict_logits(x);
            let cache = cross_entropy_forward(&logits, y, self.num_classes)?;
            let loss = cache.mean_loss();

            // Mean-loss scaling enters through the upstream gradient.
            let upstream = vec![1.0 / batch_size as f32; batch_size];
            let (d_logits, _) = cross_entropy_backward(&cache, &upstream);

            self.zero_grads();
            self.backward(x, &d_logits, batch_size);
            optimizer.step(
                &mut [self.w.as_mut_slice(), self.b.as_mut_slice()],
                &[self.dw.as_slice(), self.db.as_slice()],
            );

            let metrics = Metrics {
                loss,
                accuracy: accuracy(&logits, y, self.num_classes),
                epoch,
            };
            callbacks.on_epoch_end(epoch, &metrics);
            history.push(metrics);
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ToyDataset;
    use crate::nn::optim::Sgd;

    #[test]
    fn logits_are_affine_in_the_input() {
        let mut model = LinearClassifier::new(2, 2, 7);
        model.w = vec![1.0, 0.0, 0.0, 1.0];
        model.b = vec![0.5, -0.5];

        let logits = model.predict_logits(&[2.0, 3.0]);
        assert!((logits[0] - 2.5).abs() < 1e-6);
        assert!((logits[1] - 2.5).abs() < 1e-6);
    }

    #[test]
    fn proba_rows_are_distributions() {
        let model = LinearClassifier::new(3, 4, 0);
        let probs = model.predict_proba(&[0.1, -0.2, 0.3, 1.0, 2.0, -1.0]);

        assert_eq!(probs.len(), 8);
        for row in probs.chunks(4) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|&p| p > 0.0 && p < 1.0));
        }
    }

    #[test]
    fn predict_matches_proba_argmax() {
        let model = LinearClassifier::new(2, 3, 11);
        let x = [0.4, -1.0, 2.0, 0.7, -0.3, 0.0];

        let probs = model.predict_proba(&x);
        let from_probs = argmax_rows(&probs, 3, 3);
        assert_eq!(model.predict(&x), from_probs);
    }

    #[test]
    fn fit_rejects_mismatched_shapes() {
        let mut model = LinearClassifier::new(3, 2, 0);
        let mut sgd = Sgd::new(0.1, None);
        assert!(model.fit(&[1.0, 2.0], &[0], 1, &mut sgd).is_err());
        assert!(model.fit(&[], &[], 1, &mut sgd).is_err());
    }

    #[test]
    fn fit_rejects_out_of_range_labels() {
        let mut model = LinearClassifier::new(2, 2, 0);
        let mut sgd = Sgd::new(0.1, None);
        assert!(model.fit(&[1.0, 0.0], &[2], 1, &mut sgd).is_err());
    }

    #[test]
    fn training_on_separable_blobs_decreases_loss() {
        let data = ToyDataset::blobs(3, 2, 50, 0.4, 42);
        let mut model = LinearClassifier::new(2, 3, 1);
        let mut sgd = Sgd::new(0.5, None);

        let history = model
            .fit(&data.features, &data.labels, 30, &mut sgd)
            .unwrap();

        let first = history.first().unwrap().loss;
        let last = history.last().unwrap().loss;
        assert!(first.is_finite() && last.is_finite());
        assert!(last < first, "loss did not decrease: {} -> {}", first, last);
        assert!(history.last().unwrap().accuracy > 0.9);
    }

    #[test]
    fn repeated_fits_do_not_leak_gradients_between_steps() {
        // One epoch twice must equal two epochs once: grads reset each step.
        let data = ToyDataset::blobs(2, 2, 20, 0.3, 9);

        let mut twice = LinearClassifier::new(2, 2, 5);
        let mut sgd_a = Sgd::new(0.2, None);
        twice.fit(&data.features, &data.labels, 1, &mut sgd_a).unwrap();
        twice.fit(&data.features, &data.labels, 1, &mut sgd_a).unwrap();

        let mut once = LinearClassifier::new(2, 2, 5);
        let mut sgd_b = Sgd::new(0.2, None);
        once.fit(&data.features, &data.labels, 2, &mut sgd_b).unwrap();

        for (a, b) in twice.w.iter().zip(once.w.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in twice.b.iter().zip(once.b.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
