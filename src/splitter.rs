use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::document::{ANIMATION_LIBRARY, CLIP_LIBRARY, COLLADA_NS};
use crate::error::{Result, SplitError};
use crate::xml::{Element, XmlDocument};

/// Working state for one split run: the live document, immutable snapshots
/// of both libraries taken before the first mutation, and the cursor into
/// the animation snapshot. Built once per invocation.
#[derive(Debug)]
pub struct SplitContext {
    doc: XmlDocument,
    clips: Vec<Element>,
    animations: Vec<Element>,
    cursor: usize,
}

impl SplitContext {
    pub fn new(doc: XmlDocument) -> Result<Self> {
        let clips = snapshot(&doc, CLIP_LIBRARY)?;
        let animations = snapshot(&doc, ANIMATION_LIBRARY)?;
        debug!(
            "found {} animation clips and {} animation entries",
            clips.len(),
            animations.len()
        );
        Ok(Self {
            doc,
            clips,
            animations,
            cursor: 0,
        })
    }

    /// Writes one `<name>.dae` document per clip into `out_dir`, in the
    /// clips' original document order, and returns the paths written.
    /// Clips sharing a name overwrite each other's file.
    pub fn split_into(&mut self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.clips.len());
        for clip in &self.clips {
            clear_libraries(&mut self.doc)?;

            let name = clip.attr("name").ok_or_else(|| SplitError::UnnamedClip {
                id: clip.attr("id").map(str::to_string),
            })?;
            let joint_count = clip.child_elements().count();
            library_mut(&mut self.doc, CLIP_LIBRARY)?.push_element(clip.clone());

            // Entries are associated with clips purely by consumption
            // order: one entry per joint reference, cursor never rewinds.
            for _ in 0..joint_count {
                let entry = self.animations.get(self.cursor).cloned().ok_or_else(|| {
                    SplitError::AnimationsExhausted {
                        clip: name.to_string(),
                        index: self.cursor,
                    }
                })?;
                library_mut(&mut self.doc, ANIMATION_LIBRARY)?.push_element(entry);
                self.cursor += 1;
            }

            let path = out_dir.join(format!("{name}.dae"));
            self.doc.save(&path).map_err(|source| SplitError::Write {
                path: path.clone(),
                source,
            })?;
            info!("wrote {} ({} animation entries)", path.display(), joint_count);
            written.push(path);

            clear_libraries(&mut self.doc)?;
        }
        Ok(written)
    }
}

fn snapshot(doc: &XmlDocument, element: &'static str) -> Result<Vec<Element>> {
    let library = doc
        .root
        .find(COLLADA_NS, element)
        .ok_or(SplitError::MissingLibrary { element })?;
    Ok(library.child_elements().cloned().collect())
}

fn library_mut<'doc>(doc: &'doc mut XmlDocument, element: &'static str) -> Result<&'doc mut Element> {
    doc.root
        .find_mut(COLLADA_NS, element)
        .ok_or(SplitError::MissingLibrary { element })
}

fn clear_libraries(doc: &mut XmlDocument) -> Result<()> {
    library_mut(doc, CLIP_LIBRARY)?.clear_children();
    library_mut(doc, ANIMATION_LIBRARY)?.clear_children();
    Ok(())
}
