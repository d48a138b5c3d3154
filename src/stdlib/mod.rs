//! Host-implemented procedures.
//!
//! The registry of names and signatures lives in
//! [`Builtins`](crate::core::Builtins); this module holds their behaviour.

pub mod builtins;

pub use builtins::{invoke, render, OutputItem};
