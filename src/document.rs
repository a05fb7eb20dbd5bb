use std::fs;
use std::path::Path;

use crate::error::{Result, SplitError};
use crate::xml::XmlDocument;

/// Default namespace declared by the 2008/03 COLLADA schema.
pub const COLLADA_NS: &str = "https://www.collada.org/2008/03/COLLADASchema/";

pub const CLIP_LIBRARY: &str = "library_animation_clips";
pub const ANIMATION_LIBRARY: &str = "library_animations";

/// Parses a COLLADA file into a mutable element tree. The namespace
/// declaration on the root survives as a plain attribute, so the tree
/// re-serializes under the same default namespace as the input.
pub fn load(path: &Path) -> Result<XmlDocument> {
    let text = fs::read_to_string(path).map_err(|source| SplitError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    XmlDocument::parse(&text).map_err(|source| SplitError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
