//! Common assertions for esdl testing

use anyhow::Result;
use std::path::Path;
use walkdir::WalkDir;

/// Regular files beneath `dir`, relative to it, with `/` separators, sorted
pub fn relative_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.push(parts.join("/"));
    }
    files.sort();
    Ok(files)
}

/// Asserts that `dir` holds exactly the given relative files
pub fn assert_tree_eq(dir: &Path, expected: &[&str]) -> Result<()> {
    let actual = relative_files(dir)?;
    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();

    assert_eq!(
        actual,
        expected,
        "Directory {} does not hold the expected files",
        dir.display()
    );
    Ok(())
}

/// Asserts that a local file holds exactly `content`
pub fn assert_file_content(path: &Path, content: &[u8]) -> Result<()> {
    let actual = std::fs::read(path)?;
    assert_eq!(
        actual.len(),
        content.len(),
        "Size mismatch for {}",
        path.display()
    );
    assert!(actual == content, "Content mismatch for {}", path.display());
    Ok(())
}
