//! Platform template override detection
//!
//! A project template that reuses the path (or the file name) of a template
//! shipped by the platform shadows it. Those overrides have to be reviewed
//! by hand after a migration since the platform version may already have
//! been migrated upstream.

use crate::rules::TemplateSet;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error loading a template list
#[derive(Debug, Error)]
pub enum TemplateListError {
    #[error("Failed to read template list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Set of platform template paths such as `nuxeo.war/incl/tabs/view.xhtml`
#[derive(Debug, Clone, Default)]
pub struct TemplateIndex {
    paths: HashSet<String>,
    names: HashSet<String>,
}

impl TemplateIndex {
    /// Build an index from a newline separated list.
    ///
    /// Blank lines and `#` comments are ignored.
    pub fn from_lines(content: &str) -> Self {
        let mut index = Self::default();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let path = line.replace('\\', "/");
            if let Some(name) = path.rsplit('/').next() {
                index.names.insert(name.to_string());
            }
            index.paths.insert(path);
        }
        index
    }

    pub fn load(path: &Path) -> Result<Self, TemplateListError> {
        let content = std::fs::read_to_string(path).map_err(|source| TemplateListError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_lines(&content);
        debug!("loaded {} template(s) from {}", index.len(), path.display());
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether a template collides with a listed platform template.
    ///
    /// In complete-path mode the comparison uses the path relative to the
    /// nearest `root_marker` ancestor; a file with no such ancestor never
    /// collides. Otherwise only the file name is compared.
    pub fn is_override(&self, file: &Path, root_marker: &str, complete_path: bool) -> bool {
        if complete_path {
            relative_template_path(file, root_marker)
                .map(|rel| self.contains_path(&rel))
                .unwrap_or(false)
        } else {
            file.file_name()
                .map(|name| self.contains_name(&name.to_string_lossy()))
                .unwrap_or(false)
        }
    }
}

/// Path of a template relative to its `root_marker` ancestor, starting with
/// the marker itself (`nuxeo.war/incl/x.xhtml`)
pub fn relative_template_path(file: &Path, root_marker: &str) -> Option<String> {
    let name = file.file_name()?.to_string_lossy().to_string();
    let mut segments = vec![name];

    for dir in file.parent()?.ancestors() {
        let dir_name = dir.file_name()?.to_string_lossy().to_string();
        let found = dir_name == root_marker;
        segments.push(dir_name);
        if found {
            segments.reverse();
            return Some(segments.join("/"));
        }
    }
    None
}

/// Current and compat template lists, loaded once per run
#[derive(Debug, Clone, Default)]
pub struct OverrideIndex {
    current: TemplateIndex,
    compat: TemplateIndex,
}

impl OverrideIndex {
    pub fn new(current: TemplateIndex, compat: TemplateIndex) -> Self {
        Self { current, compat }
    }

    /// Load both lists; a missing or unreadable list is logged and left empty
    pub fn load(current: Option<&Path>, compat: Option<&Path>) -> Self {
        Self::new(load_or_empty(current), load_or_empty(compat))
    }

    pub fn index(&self, set: TemplateSet) -> &TemplateIndex {
        match set {
            TemplateSet::Current => &self.current,
            TemplateSet::Compat => &self.compat,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.compat.is_empty()
    }
}

fn load_or_empty(path: Option<&Path>) -> TemplateIndex {
    match path.map(TemplateIndex::load) {
        Some(Ok(index)) => index,
        Some(Err(e)) => {
            warn!("{}", e);
            TemplateIndex::default()
        }
        None => TemplateIndex::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIST: &str = "
# platform templates
nuxeo.war/incl/tabs/document_view.xhtml
nuxeo.war/view_documents.xhtml

nuxeo.war\\incl\\footer.xhtml
";

    #[test]
    fn test_from_lines() {
        let index = TemplateIndex::from_lines(LIST);
        assert_eq!(index.len(), 3);
        assert!(index.contains_path("nuxeo.war/incl/tabs/document_view.xhtml"));
        assert!(index.contains_path("nuxeo.war/incl/footer.xhtml"));
        assert!(index.contains_name("view_documents.xhtml"));
        assert!(!index.contains_name("# platform templates"));
    }

    #[test]
    fn test_relative_template_path() {
        let file = Path::new("/p/src/main/resources/web/nuxeo.war/incl/tabs/document_view.xhtml");
        assert_eq!(
            relative_template_path(file, "nuxeo.war").as_deref(),
            Some("nuxeo.war/incl/tabs/document_view.xhtml")
        );
        assert_eq!(
            relative_template_path(Path::new("/p/web/nuxeo.war/x.xhtml"), "nuxeo.war").as_deref(),
            Some("nuxeo.war/x.xhtml")
        );
        assert_eq!(relative_template_path(Path::new("/p/other/x.xhtml"), "nuxeo.war"), None);
    }

    #[test]
    fn test_complete_path_mode() {
        let index = TemplateIndex::from_lines(LIST);
        let hit = Path::new("/p/nuxeo.war/incl/tabs/document_view.xhtml");
        let moved = Path::new("/p/nuxeo.war/incl/document_view.xhtml");
        let outside = Path::new("/p/elsewhere/incl/tabs/document_view.xhtml");

        assert!(index.is_override(hit, "nuxeo.war", true));
        assert!(!index.is_override(moved, "nuxeo.war", true));
        assert!(!index.is_override(outside, "nuxeo.war", true));
    }

    #[test]
    fn test_bare_name_mode() {
        let index = TemplateIndex::from_lines(LIST);
        let moved = Path::new("/p/nuxeo.war/incl/document_view.xhtml");
        let outside = Path::new("/anywhere/document_view.xhtml");
        assert!(index.is_override(moved, "nuxeo.war", false));
        assert!(index.is_override(outside, "nuxeo.war", false));
        assert!(!index.is_override(Path::new("/p/mine.xhtml"), "nuxeo.war", false));
    }

    #[test]
    fn test_load_missing_list_is_empty() {
        let index = OverrideIndex::load(Some(Path::new("/nonexistent/list.txt")), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_lists() {
        let temp = TempDir::new().unwrap();
        let current = temp.path().join("current.txt");
        let compat = temp.path().join("compat.txt");
        std::fs::write(&current, "nuxeo.war/a.xhtml\n").unwrap();
        std::fs::write(&compat, "nuxeo.war/b.xhtml\nnuxeo.war/c.xhtml\n").unwrap();

        let index = OverrideIndex::load(Some(&current), Some(&compat));
        assert_eq!(index.index(TemplateSet::Current).len(), 1);
        assert_eq!(index.index(TemplateSet::Compat).len(), 2);
    }

    #[test]
    fn test_load_error_names_the_file() {
        let err = TemplateIndex::load(Path::new("/nonexistent/list.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/list.txt"));
    }
}
