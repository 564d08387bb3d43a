pub mod toy;

pub use toy::*;
