//! Main module for veil library functionality

pub mod ast;
pub mod dialect;
pub mod error;
pub mod formats;
pub mod lexing;
pub mod naming;
pub mod parsing;
pub mod pipeline;
pub mod token;
pub mod transforms;
