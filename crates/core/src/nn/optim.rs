pub trait Optimizer {
    /// Applies one update step to each parameter slice from its paired
    /// gradient slice. Callers pass the same parameters in the same
    /// order on every step.
    fn step(&mut self, params: &mut [&mut [f32]], grads: &[&[f32]]);
}

pub struct Sgd {
    lr: f32,
    momentum: Option<f32>,
    velocities: Vec<Option<Vec<f32>>>,
}

impl Sgd {
    pub fn new(lr: f32, momentum: Option<f32>) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }

    pub fn lr(&self) -> f32 {
        self.lr
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [&mut [f32]], grads: &[&[f32]]) {
        assert_eq!(params.len(), grads.len());

        if self.velocities.is_empty() {
            self.velocities
                .resize_with(params.len(), || self.momentum.map(|_| Vec::new()));
        }

        for (i, (param, grad)) in params.iter_mut().zip(grads.iter()).enumerate() {
            match (self.momentum, self.velocities[i].as_mut()) {
                (Some(mom), Some(velocity)) => {
                    if velocity.is_empty() {
                        velocity.resize(param.len(), 0.0);
                    }
                    for ((p, &g), v) in param.iter_mut().zip(grad.iter()).zip(velocity.iter_mut()) {
                        *v = mom * *v + self.lr * g;
                        *p -= *v;
                    }
                }
                _ => {
                    for (p, &g) in param.iter_mut().zip(grad.iter()) {
                        *p -= self.lr * g;
                    }
                }
            }
        }
    }
}
