/// Row-wise softmax with the max-subtraction trick: each row is shifted
/// by its maximum before exponentiating, so finite inputs of any
/// magnitude normalize without overflow.
pub fn softmax_forward(logits: &[f32], output: &mut [f32], batch_size: usize, num_classes: usize) {
    for b in 0..batch_size {
        let offset = b * num_classes;
        let logits_row = &logits[offset..offset + num_classes];
        let output_row = &mut output[offset..offset + num_classes];

        let max_logit = logits_row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut sum_exp = 0.0;
        for (i, &logit) in logits_row.iter().enumerate() {
            let exp_val = (logit - max_logit).exp();
            output_row[i] = exp_val;
            sum_exp += exp_val;
        }

        for prob in output_row.iter_mut() {
            *prob /= sum_exp;
        }
    }
}

/// Allocating convenience wrapper around [`softmax_forward`].
pub fn softmax(logits: &[f32], batch_size: usize, num_classes: usize) -> Vec<f32> {
    let mut output = vec![0.0; batch_size * num_classes];
    softmax_forward(logits, &mut output, batch_size, num_classes);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_sum_to_one_and_entries_non_negative() {
        let logits = [0.5, -1.2, 3.0, 0.0, 0.0, 0.0, -7.5, 2.2, 0.1];
        let probs = softmax(&logits, 3, 3);

        for row in probs.chunks(3) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn shift_invariant_per_row() {
        let logits = [1.0, 2.0, 3.0, -0.5, 0.0, 0.5];
        let shifts = [10.0, -3.0];

        let mut shifted = logits.to_vec();
        for (b, row) in shifted.chunks_mut(3).enumerate() {
            for v in row.iter_mut() {
                *v -= shifts[b];
            }
        }

        let base = softmax(&logits, 2, 3);
        let moved = softmax(&shifted, 2, 3);
        for (a, b) in base.iter().zip(moved.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn extreme_logits_do_not_overflow() {
        let probs = softmax(&[1000.0, 9.0, 8.0], 1, 3);

        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs[0] - 1.0).abs() < 1e-6);
        assert!(probs[1].abs() < 1e-6);
        assert!(probs[2].abs() < 1e-6);
    }

    #[test]
    fn uniform_row_for_equal_logits() {
        let probs = softmax(&[0.0, 0.0], 1, 2);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }
}
