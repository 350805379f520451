//! Copying objects to the local filesystem

use crate::{CloudError, CloudStore, Result};
use futures_util::TryStreamExt;
use glob::Pattern;
use object_store::path::{Path, PathPart};
use object_store::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Options for [`CloudStore::download`]
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Expand each source to every object beneath it
    pub recursive: bool,
    /// Glob patterns matched against the local relative path; empty copies everything
    pub include: Vec<String>,
}

/// What a download produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferSummary {
    /// Number of objects copied
    pub objects: usize,
    /// Total bytes written
    pub bytes: u64,
    /// Local files written, in copy order
    pub files: Vec<PathBuf>,
}

/// Reported after each object is written
#[derive(Debug)]
pub struct TransferEvent<'a> {
    /// Remote key
    pub key: &'a Path,
    /// Local file it was written to
    pub local: &'a std::path::Path,
    /// Bytes in this object
    pub bytes: u64,
    /// Zero-based position in the copy plan
    pub index: usize,
    /// Number of objects in the copy plan
    pub total: usize,
}

impl CloudStore {
    /// Copy `sources` into the local directory `dest`.
    ///
    /// Local paths mirror the remote keys relative to the longest common
    /// prefix of the sources, so copying the children of a cube (or the cube
    /// itself, recursively) places the cube's contents directly under `dest`.
    /// A single object lands as `dest/<file name>`.
    pub fn download(
        &self,
        sources: &[Path],
        dest: &std::path::Path,
        options: &DownloadOptions,
    ) -> Result<TransferSummary> {
        self.download_with_progress(sources, dest, options, |_| {})
    }

    /// [`download`](Self::download), calling `progress` after every object
    pub fn download_with_progress<F>(
        &self,
        sources: &[Path],
        dest: &std::path::Path,
        options: &DownloadOptions,
        mut progress: F,
    ) -> Result<TransferSummary>
    where
        F: FnMut(&TransferEvent<'_>),
    {
        let patterns = options
            .include
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let base = common_prefix(sources);
        let plan: Vec<(ObjectMeta, Vec<String>)> = self
            .plan(sources, options.recursive)?
            .into_iter()
            .map(|meta| {
                let relative = relative_parts(&base, &meta.location);
                (meta, relative)
            })
            .filter(|(_, relative)| {
                patterns.is_empty() || patterns.iter().any(|p| p.matches(&relative.join("/")))
            })
            .collect();

        info!(
            "Copying {} object(s) from {}/{} to {}",
            plan.len(),
            self.bucket(),
            base,
            dest.display()
        );

        fs::create_dir_all(dest)?;

        let total = plan.len();
        let mut summary = TransferSummary::default();
        for (index, (meta, relative)) in plan.iter().enumerate() {
            let local = relative.iter().fold(dest.to_path_buf(), |acc, p| acc.join(p));
            if let Some(parent) = local.parent() {
                fs::create_dir_all(parent)?;
            }

            let bytes = self.copy_object(&meta.location, &local)?;
            progress(&TransferEvent {
                key: &meta.location,
                local: &local,
                bytes,
                index,
                total,
            });

            summary.objects += 1;
            summary.bytes += bytes;
            summary.files.push(local);
        }

        Ok(summary)
    }

    /// Resolve sources to the objects to copy, deduplicated and sorted by key
    fn plan(&self, sources: &[Path], recursive: bool) -> Result<Vec<ObjectMeta>> {
        let mut plan = BTreeMap::new();

        for source in sources {
            if !recursive {
                let meta = self.head(source)?;
                plan.insert(meta.location.to_string(), meta);
                continue;
            }

            match self.list_recursive(source) {
                Ok(objects) => {
                    for meta in objects {
                        plan.insert(meta.location.to_string(), meta);
                    }
                }
                Err(e) if e.is_not_found() => {
                    warn!("Nothing to copy under {}/{}", self.bucket(), source);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(plan.into_values().collect())
    }

    /// Stream one object to a local file, returning the bytes written
    fn copy_object(&self, key: &Path, local: &std::path::Path) -> Result<u64> {
        debug!("GET {}/{} -> {}", self.bucket(), key, local.display());

        self.block_on(async {
            let mut stream = self.store().get(key).await?.into_stream();
            let mut file = BufWriter::new(fs::File::create(local)?);
            let mut written = 0u64;

            while let Some(chunk) = stream.try_next().await? {
                file.write_all(&chunk)?;
                written += chunk.len() as u64;
            }
            file.flush()?;

            Ok::<u64, CloudError>(written)
        })
    }
}

/// Longest run of leading key parts shared by every source
fn common_prefix(sources: &[Path]) -> Path {
    let mut iter = sources.iter();
    let Some(first) = iter.next() else {
        return Path::default();
    };

    let mut shared: Vec<PathPart<'_>> = first.parts().collect();
    for source in iter {
        let len = shared
            .iter()
            .zip(source.parts())
            .take_while(|(a, b)| *a == b)
            .count();
        shared.truncate(len);
    }

    Path::from_iter(shared)
}

/// Key parts below `base`; an object that is itself the base keeps its file name
fn relative_parts(base: &Path, key: &Path) -> Vec<String> {
    let relative: Vec<String> = match key.prefix_match(base) {
        Some(parts) => parts.map(|p| p.as_ref().to_string()).collect(),
        None => key.parts().map(|p| p.as_ref().to_string()).collect(),
    };

    if relative.is_empty() {
        key.filename().map(str::to_string).into_iter().collect()
    } else {
        relative
    }
}
