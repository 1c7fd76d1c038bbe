//! Low-level infrastructure: bit access and the descriptor-driven decoder.
pub mod codec;
