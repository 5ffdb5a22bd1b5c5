pub mod ast;
pub mod diagnostics;
pub mod gotos;
pub mod lower;
pub mod merge;
pub mod order;
pub mod pipeline;
pub mod rewrite;
pub mod visit;

pub use diagnostics::{Diagnostics, TranslateError};
pub use pipeline::translate;

#[cfg(test)]
#[path = "tests/util.rs"]
pub mod test_util;
