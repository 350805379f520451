//! Rendering results for the terminal

use chrono::{DateTime, Utc};
use esdl_cloud::{Entry, Location};
use serde::Serialize;

/// Format a byte count in human-readable form
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One listing row: `bucket/key`, or with `long` size and modification time first
pub fn entry_line(location: &Location, entry: &Entry, long: bool) -> String {
    let name = format!("{}/{}", location.bucket, entry.key());
    if !long {
        return name;
    }

    match entry {
        Entry::Prefix { .. } => format!("{:>12} {:>19} {}", "PRE", "", name),
        Entry::Object {
            size,
            last_modified,
            ..
        } => format!(
            "{:>12} {:>19} {}",
            format_size(*size),
            format_time(last_modified),
            name
        ),
    }
}

/// Summary statistics of the finite values in a chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkStats {
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl ChunkStats {
    /// NaN counts as missing
    pub fn from_values(values: &[f64]) -> Self {
        let mut count = 0;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &v in values.iter().filter(|v| !v.is_nan()) {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        let (min, max, mean) = if count == 0 {
            (None, None, None)
        } else {
            (Some(min), Some(max), Some(sum / count as f64))
        };

        Self {
            count,
            missing: values.len() - count,
            min,
            max,
            mean,
        }
    }
}

impl std::fmt::Display for ChunkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        writeln!(f, "count:   {}", self.count)?;
        writeln!(f, "missing: {}", self.missing)?;
        writeln!(f, "min:     {}", show(self.min))?;
        writeln!(f, "max:     {}", show(self.max))?;
        write!(f, "mean:    {}", show(self.mean))
    }
}
