//! Output formats
//!
//!     Turning a tree back into Lua source. The [`emitter`] owns whitespace decisions and the
//!     [`unparser`] owns syntax.

pub mod emitter;
pub mod unparser;

pub use emitter::Mode;
pub use unparser::{unparse, UnparseError};
