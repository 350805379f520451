//! Subcommand implementations
//!
//! Each command connects, then hands the store or dataset to a `*_to` /
//! `*_with` part that does the work against any writer.

use crate::output::{entry_line, format_size, ChunkStats};
use anyhow::{Context, Result};
use esdl_cloud::{
    CloudError, CloudStore, DownloadOptions, Entry, Location, ObjectPath, StoreOptions,
    TransferEvent, TransferSummary,
};
use esdl_core::{open_dataset, Config, Dataset};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// `esdl ls`
pub fn list(
    location: &str,
    options: &StoreOptions,
    recursive: bool,
    long: bool,
    json: bool,
) -> Result<()> {
    let location = Location::parse(location)?;
    let store = CloudStore::connect(&location, options)?;
    list_to(&store, &location, recursive, long, json, &mut io::stdout().lock())
}

/// Write the listing of `location` to `out`
pub fn list_to<W: Write>(
    store: &CloudStore,
    location: &Location,
    recursive: bool,
    long: bool,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let entries: Vec<Entry> = if recursive {
        store
            .list_recursive(&location.prefix)?
            .into_iter()
            .map(Entry::from)
            .collect()
    } else {
        store.list(&location.prefix)?
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        for entry in &entries {
            writeln!(out, "{}", entry_line(location, entry, long))?;
        }
    }

    info!("Listed {} entries under {}", entries.len(), location);
    Ok(())
}

/// Parse every source and require them to share one bucket
fn parse_sources(sources: &[String]) -> Result<(Location, Vec<ObjectPath>)> {
    let locations = sources
        .iter()
        .map(|s| Location::parse(s))
        .collect::<esdl_cloud::Result<Vec<_>>>()?;

    let Some(first) = locations.first().cloned() else {
        return Err(CloudError::InvalidLocation("no source given".to_string()).into());
    };

    if let Some(other) = locations.iter().find(|l| l.bucket != first.bucket) {
        return Err(CloudError::InvalidLocation(format!(
            "sources span buckets {} and {}",
            first.bucket, other.bucket
        ))
        .into());
    }

    let prefixes = locations.into_iter().map(|l| l.prefix).collect();
    Ok((first, prefixes))
}

fn progress_bar(enabled: bool) -> Result<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// `esdl get`
pub fn get(
    sources: &[String],
    dest: &Path,
    options: &StoreOptions,
    download: DownloadOptions,
    show_progress: bool,
) -> Result<()> {
    let (location, prefixes) = parse_sources(sources)?;
    let store = CloudStore::connect(&location, options)?;

    let pb = progress_bar(show_progress)?;
    let summary = get_with(&store, &prefixes, dest, &download, &pb)?;
    pb.finish_and_clear();

    info!(
        "Copied {} object(s), {} to {}",
        summary.objects,
        format_size(summary.bytes),
        dest.display()
    );
    Ok(())
}

/// Copy `prefixes` into `dest`, advancing `pb` once per object
pub fn get_with(
    store: &CloudStore,
    prefixes: &[ObjectPath],
    dest: &Path,
    download: &DownloadOptions,
    pb: &ProgressBar,
) -> Result<TransferSummary> {
    let summary = store.download_with_progress(prefixes, dest, download, |event: &TransferEvent<'_>| {
        pb.set_length(event.total as u64);
        pb.set_position(event.index as u64 + 1);
        pb.set_message(event.key.to_string());
    })?;
    Ok(summary)
}

/// `esdl open`
pub fn open(url: &str, options: &StoreOptions, json: bool) -> Result<()> {
    let ds = open_dataset(url, options)?;
    open_to(&ds, json, &mut io::stdout().lock())
}

/// Write the description of `ds` to `out`
pub fn open_to<W: Write>(ds: &Dataset, json: bool, out: &mut W) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&ds.summary())?)?;
    } else {
        write!(out, "{}", ds)?;
    }
    Ok(())
}

/// `esdl read`
pub fn read(
    url: &str,
    variable: &str,
    chunk: &[u64],
    options: &StoreOptions,
    json: bool,
) -> Result<()> {
    let ds = open_dataset(url, options)?;
    read_to(&ds, variable, chunk, json, &mut io::stdout().lock())
}

/// Summarize one chunk of `variable` into `out`
pub fn read_to<W: Write>(
    ds: &Dataset,
    variable: &str,
    chunk: &[u64],
    json: bool,
    out: &mut W,
) -> Result<()> {
    let values = ds
        .read_chunk_f64(variable, chunk)
        .with_context(|| format!("Failed to read chunk {:?} of {}", chunk, variable))?;

    let stats = ChunkStats::from_values(&values);
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        writeln!(out, "{}", stats)?;
    }
    Ok(())
}

/// `esdl config`
pub fn config(show: bool, path: bool) -> Result<()> {
    if show {
        let config = Config::load()?;
        let toml_str = toml::to_string_pretty(&config)?;
        println!("{}", toml_str);
    } else if path {
        let config_path = Config::config_path()
            .map_err(|e| anyhow::anyhow!("Failed to get config path: {}", e))?;
        println!("{}", config_path.display());
    } else {
        eprintln!("Please specify --show or --path");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use esdl_testing::fixtures::{cube_object_count, seeded_store, BUCKET, CUBE, GPP};
    use esdl_testing::TestDir;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn cube() -> Dataset {
        Dataset::open_at(seeded_store(true).unwrap(), Location::new(BUCKET, CUBE)).unwrap()
    }

    #[test]
    fn test_list_bucket_root() {
        let store = seeded_store(false).unwrap();
        let root = Location::new(BUCKET, "");

        let text = render(|out| list_to(&store, &root, false, false, false, out));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "esdl-test/Cube_empty.zarr",
                "esdl-test/Cube_test_4x3x2.zarr",
                "esdl-test/README.md"
            ]
        );

        let long = render(|out| list_to(&store, &root, false, true, false, out));
        assert!(long.lines().next().unwrap().contains("PRE"));
        assert!(long.lines().last().unwrap().contains("28 B"));
    }

    #[test]
    fn test_list_json_and_recursive() {
        let store = seeded_store(true).unwrap();

        let root = Location::new(BUCKET, "");
        let json = render(|out| list_to(&store, &root, false, false, true, out));
        let entries: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(entries[0]["type"], "prefix");
        assert_eq!(entries[2]["type"], "object");

        let cube = Location::new(BUCKET, CUBE);
        let text = render(|out| list_to(&store, &cube, true, false, false, out));
        assert_eq!(text.lines().count(), cube_object_count(true));
    }

    #[test]
    fn test_list_missing_prefix() {
        let store = seeded_store(false).unwrap();
        let missing = Location::new(BUCKET, "Cube_missing.zarr");
        let mut out = Vec::new();

        assert!(list_to(&store, &missing, false, false, false, &mut out).is_err());
        assert!(list_to(&store, &missing, true, false, false, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_get_with_include_advances_progress() {
        let store = seeded_store(false).unwrap();
        let dest = TestDir::new().unwrap();
        let download = DownloadOptions {
            recursive: true,
            include: vec![format!("{}/[0-9]*", GPP)],
        };
        let pb = ProgressBar::hidden();

        let summary =
            get_with(&store, &[ObjectPath::from(CUBE)], dest.path(), &download, &pb).unwrap();

        assert_eq!(summary.objects, 2);
        assert_eq!(summary.bytes, 96);
        assert_eq!(pb.length(), Some(2));
        assert_eq!(pb.position(), 2);
        assert!(dest.path().join(GPP).join("1.0.0").is_file());
    }

    #[test]
    fn test_open_text_and_json() {
        let ds = cube();

        let text = render(|out| open_to(&ds, false, out));
        assert!(text.contains("Dimensions:  (lat: 3, lon: 2, time: 4)"));

        let json = render(|out| open_to(&ds, true, out));
        let summary: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(summary["dims"]["time"], 4);
    }

    #[test]
    fn test_read_summarizes_chunk() {
        let ds = cube();

        let text = render(|out| read_to(&ds, GPP, &[1, 0, 0], false, out));
        assert!(text.contains("count:   12"));
        assert!(text.contains("missing: 0"));
        assert!(text.contains("min:     12"));
        assert!(text.contains("max:     23"));
        assert!(text.contains("mean:    17.5"));

        let json = render(|out| read_to(&ds, GPP, &[0, 0, 0], true, out));
        let stats: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(stats["max"], 11.0);

        let mut out = Vec::new();
        assert!(read_to(&ds, GPP, &[2, 0, 0], false, &mut out).is_err());
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_sources_same_bucket() {
        let (location, prefixes) =
            parse_sources(&strings(&["b/cube.zarr/lat", "s3://b/cube.zarr/lon"])).unwrap();
        assert_eq!(location.bucket, "b");
        assert_eq!(prefixes[1].as_ref(), "cube.zarr/lon");
    }

    #[test]
    fn test_parse_sources_rejects_mixed_buckets() {
        let err = parse_sources(&strings(&["a/x", "b/y"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CloudError>(),
            Some(CloudError::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_parse_sources_empty() {
        assert!(parse_sources(&[]).is_err());
    }
}
