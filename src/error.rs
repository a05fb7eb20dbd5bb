use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::xml::XmlError;

pub type Result<T> = std::result::Result<T, SplitError>;

/// Failure modes of one split run. Nothing is caught or retried
/// internally; every variant propagates to the caller.
#[derive(Error, Debug)]
pub enum SplitError {
    /// Input file missing or unreadable.
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Input is not well-formed XML.
    #[error("malformed XML in {}: {source}", .path.display())]
    Parse { path: PathBuf, source: XmlError },

    /// One of the two required libraries is not a direct child of the root.
    #[error("document root has no <{element}> library")]
    MissingLibrary { element: &'static str },

    /// A clip without a name attribute cannot be mapped to a file name.
    #[error("animation clip '{}' has no name attribute", .id.as_deref().unwrap_or("<no id>"))]
    UnnamedClip { id: Option<String> },

    /// The clips reference more joints than the animation library has
    /// entries; raised at the append step for the offending clip.
    #[error("animation library exhausted at entry {index} while filling clip '{clip}'")]
    AnimationsExhausted { clip: String, index: usize },

    /// Output file could not be created or written.
    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}
