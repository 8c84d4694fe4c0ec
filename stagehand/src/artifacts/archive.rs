//! Packaging a stage's working tree for upload.
//!
//! The orchestrator's own state directory is excluded wherever it
//! appears under the project root; state files must never travel as
//! build artifacts.

use crate::errors::OrchestratorError;
use crate::state::STATE_DIR_NAME;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn contains_state_dir(path: &Path) -> bool {
    path.components()
        .any(|component| matches!(component, Component::Normal(name) if name == STATE_DIR_NAME))
}

/// Packages the tree under `root` into a zip archive at `dest_zip`.
///
/// Any path with a component equal to the reserved state directory name
/// is skipped, as is the destination archive itself if it lives inside
/// the tree. Entry names are relative to `root` with forward slashes.
///
/// # Errors
///
/// Returns an error on IO or archive-write failure.
pub fn pack(root: &Path, dest_zip: &Path) -> Result<PathBuf, OrchestratorError> {
    if let Some(parent) = dest_zip.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(dest_zip)?;
    let mut zip = ZipWriter::new(file);
    // Fixed entry timestamp: archives of identical trees must be
    // byte-identical or content-hash dedup never hits.
    let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if path == dest_zip || path.is_dir() {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        if contains_state_dir(rel) {
            continue;
        }
        let name = rel.to_string_lossy().replace('\\', "/");

        zip.start_file(name, options)?;
        let mut source = std::fs::File::open(path)?;
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer)?;
        zip.write_all(&buffer)?;
    }

    zip.finish()?;
    Ok(dest_zip.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn entry_names(zip_path: &Path) -> Vec<String> {
        let file = fs::File::open(zip_path).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        archive.file_names().map(String::from).collect()
    }

    #[test]
    fn test_pack_includes_project_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("README.md"), "readme").unwrap();

        let zip_path = dir.path().join("out.zip");
        pack(&root, &zip_path).unwrap();

        let mut names = entry_names(&zip_path);
        names.sort();
        assert_eq!(names, vec!["README.md".to_string(), "src/main.rs".to_string()]);
    }

    #[test]
    fn test_pack_excludes_state_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        let state_dir = root.join(STATE_DIR_NAME).join("default").join("state");
        fs::create_dir_all(&state_dir).unwrap();
        fs::write(state_dir.join("state.yml"), "this_should_not_be_in_zip").unwrap();

        let zip_path = dir.path().join("out.zip");
        pack(&root, &zip_path).unwrap();

        assert!(entry_names(&zip_path).is_empty());
    }

    #[test]
    fn test_pack_excludes_nested_state_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(root.join("sub").join(STATE_DIR_NAME)).unwrap();
        fs::write(root.join("sub").join(STATE_DIR_NAME).join("state.yml"), "x").unwrap();
        fs::write(root.join("sub").join("kept.txt"), "kept").unwrap();

        let zip_path = dir.path().join("out.zip");
        pack(&root, &zip_path).unwrap();

        assert_eq!(entry_names(&zip_path), vec!["sub/kept.txt".to_string()]);
    }

    #[test]
    fn test_pack_skips_destination_inside_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("file.txt"), "data").unwrap();

        let zip_path = root.join("bundle.zip");
        pack(&root, &zip_path).unwrap();

        assert_eq!(entry_names(&zip_path), vec!["file.txt".to_string()]);
    }
}
