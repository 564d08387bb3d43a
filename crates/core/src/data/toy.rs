use rand::{rngs::StdRng, Rng, SeedableRng};

/// In-memory labeled dataset, features stored row-major with one row
/// per sample.
pub struct ToyDataset {
    pub features: Vec<f32>,
    pub labels: Vec<usize>,
    pub num_samples: usize,
    pub num_features: usize,
    pub num_classes: usize,
}

impl ToyDataset {
    /// Gaussian blobs, one cluster per class. Cluster centers sit on a
    /// fixed circle of radius 3 (phase-shifted per feature dimension),
    /// so small `spread` values give a linearly separable dataset.
    /// Fully determined by `seed`.
    pub fn blobs(
        num_classes: usize,
        num_features: usize,
        samples_per_class: usize,
        spread: f32,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let num_samples = num_classes * samples_per_class;
        let mut features = Vec::with_capacity(num_samples * num_features);
        let mut labels = Vec::with_capacity(num_samples);

        for class in 0..num_classes {
            let angle = std::f32::consts::TAU * class as f32 / num_classes as f32;
            for _ in 0..samples_per_class {
                for d in 0..num_features {
                    let center = 3.0 * (angle + d as f32).cos();
                    features.push(center + spread * normal_draw(&mut rng));
                }
                labels.push(class);
            }
        }

        let mut dataset = Self {
            features,
            labels,
            num_samples,
            num_features,
            num_classes,
        };
        dataset.shuffle(&mut rng);
        dataset
    }

    fn shuffle(&mut self, rng: &mut StdRng) {
        // Fisher-Yates over sample indices, moving whole feature rows.
        for i in (1..self.num_samples).rev() {
            let j = rng.gen_range(0..=i);
            if i == j {
                continue;
            }
            self.labels.swap(i, j);
            for d in 0..self.num_features {
                self.features
                    .swap(i * self.num_features + d, j * self.num_features + d);
            }
        }
    }

    /// Splits off the first `train_fraction` of samples as a training
    /// set and the rest as a held-out set. Rows are already shuffled.
    pub fn split(&self, train_fraction: f32) -> (ToyDataset, ToyDataset) {
        let train_count = ((self.num_samples as f32 * train_fraction) as usize).min(self.num_samples);
        let cut = train_count * self.num_features;

        let train = ToyDataset {
            features: self.features[..cut].to_vec(),
            labels: self.labels[..train_count].to_vec(),
            num_samples: train_count,
            num_features: self.num_features,
            num_classes: self.num_classes,
        };
        let test = ToyDataset {
            features: self.features[cut..].to_vec(),
            labels: self.labels[train_count..].to_vec(),
            num_samples: self.num_samples - train_count,
            num_features: self.num_features,
            num_classes: self.num_classes,
        };
        (train, test)
    }

    pub fn get_batch(&self, batch_start: usize, batch_size: usize) -> (Vec<f32>, Vec<usize>) {
        let end = (batch_start + batch_size).min(self.num_samples);
        let actual_batch_size = end.saturating_sub(batch_start);

        let mut batch_features = Vec::with_capacity(actual_batch_size * self.num_features);
        let mut batch_labels = Vec::with_capacity(actual_batch_size);

        for i in batch_start..end {
            let start_idx = i * self.num_features;
            batch_features.extend_from_slice(&self.features[start_idx..start_idx + self.num_features]);
            batch_labels.push(self.labels[i]);
        }

        (batch_features, batch_labels)
    }
}

// Box-Muller transform over two uniform draws.
fn normal_draw(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blobs_have_expected_shape_and_label_range() {
        let data = ToyDataset::blobs(3, 4, 10, 0.5, 0);

        assert_eq!(data.num_samples, 30);
        assert_eq!(data.features.len(), 30 * 4);
        assert_eq!(data.labels.len(), 30);
        assert!(data.labels.iter().all(|&l| l < 3));
        for class in 0..3 {
            assert_eq!(data.labels.iter().filter(|&&l| l == class).count(), 10);
        }
    }

    #[test]
    fn same_seed_reproduces_the_dataset() {
        let a = ToyDataset::blobs(2, 3, 5, 0.2, 77);
        let b = ToyDataset::blobs(2, 3, 5, 0.2, 77);
        assert_eq!(a.features, b.features);
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn split_partitions_all_samples() {
        let data = ToyDataset::blobs(2, 2, 25, 0.3, 1);
        let (train, test) = data.split(0.8);

        assert_eq!(train.num_samples, 40);
        assert_eq!(test.num_samples, 10);
        assert_eq!(
            train.features.len() + test.features.len(),
            data.features.len()
        );
    }

    #[test]
    fn get_batch_clamps_at_the_end() {
        let data = ToyDataset::blobs(2, 2, 10, 0.3, 2);
        let (features, labels) = data.get_batch(15, 10);

        assert_eq!(labels.len(), 5);
        assert_eq!(features.len(), 5 * 2);
    }
}
