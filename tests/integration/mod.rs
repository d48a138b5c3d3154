//! Integration tests for pila.
//!
//! This module organises integration tests by component.

pub mod backend;
pub mod lexer;
pub mod optimizer;
pub mod pipeline;
pub mod resolver;
pub mod synthesizer;
pub mod vm;
