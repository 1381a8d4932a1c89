//! Template and project discovery

use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Template root of a project, relative to the project directory
pub const DEFAULT_TEMPLATE_ROOT: &str = "src/main/resources/web/nuxeo.war";

/// Collect all files with the given extension below `root`, sorted
pub fn collect_templates(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == extension)
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    debug!("found {} template(s) under {}", files.len(), root.display());
    files
}

pub fn project_template_root(project: &Path, template_root: &Path) -> PathBuf {
    project.join(template_root)
}

/// A project directory holds a template root
pub fn is_project_dir(dir: &Path, template_root: &Path) -> bool {
    project_template_root(dir, template_root).is_dir()
}

/// Every project below `start`, in path order.
///
/// The subtree of a project is not searched for nested projects.
pub fn find_projects(start: &Path, template_root: &Path) -> Vec<PathBuf> {
    let mut projects = Vec::new();
    let mut it = WalkDir::new(start).sort_by_file_name().into_iter();

    while let Some(entry) = it.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_project_dir(entry.path(), template_root) {
            debug!("project found: {}", entry.path().display());
            projects.push(entry.into_path());
            it.skip_current_dir();
        }
    }

    projects
}
