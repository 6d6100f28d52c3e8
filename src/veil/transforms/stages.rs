//! Canonical transformation steps
//!
//! Each step is constructed from its settings with `from_settings` and implements
//! [`Step`](super::Step).

pub mod constant_array;
pub mod encrypt_strings;
pub mod numbers_to_expressions;
pub mod split_strings;
pub mod watermark;
pub mod wrap_in_function;

pub use constant_array::ConstantArray;
pub use encrypt_strings::EncryptStrings;
pub use numbers_to_expressions::NumbersToExpressions;
pub use split_strings::SplitStrings;
pub use watermark::Watermark;
pub use wrap_in_function::WrapInFunction;
