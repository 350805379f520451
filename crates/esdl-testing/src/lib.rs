//! Testing utilities and fixtures for esdl
//!
//! This crate provides an in-memory stand-in for the archive bucket, seeded
//! with a small Zarr v2 cube laid out the way the regional cubes are, plus
//! helpers for inspecting what a download left on disk.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;

/// Creates a temporary test directory with cleanup on drop
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary test directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Returns the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the test directory, without creating it
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates a file with the given name and content in the test directory
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
