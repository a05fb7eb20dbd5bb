//! Splits a multi-clip COLLADA document into one document per animation clip.

pub mod document;
pub mod error;
pub mod splitter;
pub mod xml;

pub use error::{Result, SplitError};
pub use splitter::SplitContext;
