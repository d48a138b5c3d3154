//! Optimization layer for pila programs.
//!
//! - **Optimizer**: local constant folding with warnings for folds that
//!   would change or fault at runtime

pub mod optimizer;

pub use optimizer::{OptLevel, OptStats, Optimizer};
