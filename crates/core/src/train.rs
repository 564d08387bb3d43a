use crate::ops_cpu::argmax_rows;

pub struct Metrics {
    pub loss: f32,
    pub accuracy: f32,
    pub epoch: usize,
}

pub trait Callbacks {
    fn on_epoch_begin(&mut self, _epoch: usize) {}
    fn on_epoch_end(&mut self, _epoch: usize, _metrics: &Metrics) {}
}

/// No-op callbacks for callers that only want the returned history.
impl Callbacks for () {}

/// Fraction of rows whose argmax matches the label. Works on logits or
/// probabilities alike since softmax preserves the row argmax.
pub fn accuracy(scores: &[f32], labels: &[usize], num_classes: usize) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }

    let predicted = argmax_rows(scores, labels.len(), num_classes);
    let correct = predicted
        .iter()
        .zip(labels.iter())
        .filter(|(p, l)| p == l)
        .count();

    correct as f32 / labels.len() as f32
}
