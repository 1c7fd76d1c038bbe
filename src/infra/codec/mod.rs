pub mod bits;
pub mod engine;
