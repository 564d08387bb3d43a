pub mod classifier;
pub mod optim;

pub use classifier::*;
pub use optim::*;
