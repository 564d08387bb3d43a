pub mod ops_cpu;
pub mod nn;
pub mod data;
pub mod train;
