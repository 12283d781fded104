//! Depth-first discovery of definition files.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mmbake_common::error::{MmbakeError, MmbakeResult};
use walkdir::WalkDir;

use crate::definition::Definition;
use crate::shortcode::extract_shortcodes;

/// Markdown suffix scanned for shortcode blocks.
const MARKDOWN_SUFFIX: &str = ".md";

/// What the scanner recognises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Definition file suffix, without the dot.
    pub extension: String,

    /// Also extract `{{< mermaid >}}` blocks from Markdown files.
    pub shortcodes: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: "mermaid".to_string(),
            shortcodes: false,
        }
    }
}

/// Lazy, single-pass sequence of definitions under a root directory.
///
/// Subdirectories are visited in directory-listing order, which is not
/// stable across filesystems. After the first error the scanner is
/// exhausted.
pub struct DefinitionScanner {
    root: PathBuf,
    walker: walkdir::IntoIter,
    suffix: String,
    shortcodes: bool,
    pending: VecDeque<Definition>,
    finished: bool,
}

impl DefinitionScanner {
    /// Open a scan rooted at `root`.
    ///
    /// Fails immediately when the root is missing, not a directory, or
    /// cannot be listed.
    pub fn new(root: impl AsRef<Path>, options: ScanOptions) -> MmbakeResult<Self> {
        let root = root.as_ref().to_path_buf();
        let metadata = fs::metadata(&root).map_err(|e| MmbakeError::filesystem(&root, e))?;
        if !metadata.is_dir() {
            return Err(MmbakeError::filesystem(
                &root,
                io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }
        fs::read_dir(&root).map_err(|e| MmbakeError::filesystem(&root, e))?;

        tracing::debug!(
            root = %root.display(),
            extension = %options.extension,
            shortcodes = options.shortcodes,
            "Scanning for definitions"
        );

        Ok(Self {
            walker: WalkDir::new(&root).follow_links(true).into_iter(),
            root,
            suffix: format!(".{}", options.extension),
            shortcodes: options.shortcodes,
            pending: VecDeque::new(),
            finished: false,
        })
    }

    /// Root directory of this scan.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn visit(&mut self, path: &Path) -> MmbakeResult<()> {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return Ok(());
        };

        if name.ends_with(&self.suffix) {
            let bytes = read_source(path)?;
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(
                        source = %path.display(),
                        valid_up_to = err.utf8_error().valid_up_to(),
                        "Definition is not valid UTF-8; invalid bytes replaced"
                    );
                    String::from_utf8_lossy(err.as_bytes()).into_owned()
                }
            };
            tracing::debug!(source = %path.display(), bytes = text.len(), "Discovered definition");
            self.pending.push_back(Definition::from_file(path, text));
        } else if self.shortcodes && name.ends_with(MARKDOWN_SUFFIX) {
            let Ok(content) = String::from_utf8(read_source(path)?) else {
                tracing::warn!(
                    source = %path.display(),
                    "Skipping Markdown file that is not valid UTF-8"
                );
                return Ok(());
            };
            let blocks = extract_shortcodes(path, &content);
            if !blocks.is_empty() {
                tracing::debug!(
                    source = %path.display(),
                    blocks = blocks.len(),
                    "Discovered shortcode definitions"
                );
            }
            self.pending.extend(blocks);
        }
        Ok(())
    }
}

impl Iterator for DefinitionScanner {
    type Item = MmbakeResult<Definition>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(definition) = self.pending.pop_front() {
                return Some(Ok(definition));
            }
            if self.finished {
                return None;
            }

            let entry = match self.walker.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    self.finished = true;
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    let message = err.to_string();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other(message));
                    return Some(Err(MmbakeError::filesystem(path, source)));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Err(err) = self.visit(entry.path()) {
                self.finished = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}

fn read_source(path: &Path) -> MmbakeResult<Vec<u8>> {
    fs::read(path).map_err(|e| MmbakeError::filesystem(path, e))
}
