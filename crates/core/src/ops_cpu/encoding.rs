use anyhow::{bail, Result};

/// Encodes integer class labels as a one-hot matrix, one row per label.
///
/// When `num_classes` is `None` the class count is inferred as
/// `max(labels) + 1`. An explicit class count that any label falls
/// outside of is an error, never a silently wrong row.
///
/// Returns the row-major `(labels.len(), num_classes)` matrix together
/// with the class count actually used.
pub fn to_one_hot(labels: &[usize], num_classes: Option<usize>) -> Result<(Vec<f32>, usize)> {
    let classes = match num_classes {
        Some(c) => c,
        None => labels.iter().max().map(|&m| m + 1).unwrap_or(0),
    };

    let mut one_hot = vec![0.0; labels.len() * classes];
    for (i, &label) in labels.iter().enumerate() {
        if label >= classes {
            bail!(
                "label {} at sample {} is out of range for {} classes",
                label,
                i,
                classes
            );
        }
        one_hot[i * classes + label] = 1.0;
    }

    Ok((one_hot, classes))
}

/// Decodes a one-hot (or probability) matrix back to labels via
/// row-wise argmax. Inverse of [`to_one_hot`] for valid encodings:
/// the zero-class encoding of an empty label vector decodes back to
/// an empty label vector.
pub fn to_labels(one_hot: &[f32], num_classes: usize) -> Vec<usize> {
    if num_classes == 0 {
        return Vec::new();
    }
    let batch_size = one_hot.len() / num_classes;
    argmax_rows(one_hot, batch_size, num_classes)
}

/// Index of the maximum entry in each row of a row-major matrix.
pub fn argmax_rows(matrix: &[f32], batch_size: usize, num_classes: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(batch_size);
    for b in 0..batch_size {
        let offset = b * num_classes;
        let row = &matrix[offset..offset + num_classes];
        let idx = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        indices.push(idx);
    }
    indices
}
