pub mod softmax;
pub mod encoding;
pub mod cross_entropy;

pub use softmax::*;
pub use encoding::*;
pub use cross_entropy::*;
