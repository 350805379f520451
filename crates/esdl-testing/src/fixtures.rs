//! A miniature archive bucket
//!
//! The bucket holds two cubes and a loose object:
//!
//! ```text
//! README.md
//! Cube_test_4x3x2.zarr/   time=4, lat=3, lon=2
//!     .zgroup .zattrs [.zmetadata]
//!     time/ lat/ lon/                      coordinates
//!     gross_primary_productivity/          (time, lat, lon) f4, chunks (2, 3, 2)
//!     water_mask/                          (lat, lon) u1
//! Cube_empty.zarr/
//!     .zgroup
//! ```

use anyhow::Result;
use bytes::Bytes;
use esdl_cloud::{CloudStore, ObjectPath, ObjectStore};
use object_store::memory::InMemory;
use serde_json::{json, Value};
use std::sync::Arc;

/// Bucket name the in-memory store is registered under
pub const BUCKET: &str = "esdl-test";

/// The populated cube
pub const CUBE: &str = "Cube_test_4x3x2.zarr";

/// A cube holding only its group marker
pub const EMPTY_CUBE: &str = "Cube_empty.zarr";

/// The chunked data variable
pub const GPP: &str = "gross_primary_productivity";

/// Values of [`GPP`] in C order; element `[t, y, x]` equals `t * 6 + y * 2 + x`
pub fn gpp_values() -> Vec<f32> {
    (0..24).map(|v| v as f32).collect()
}

fn zarray(shape: &[u64], chunks: &[u64], dtype: &str, fill_value: Value) -> Value {
    json!({
        "zarr_format": 2,
        "shape": shape,
        "chunks": chunks,
        "dtype": dtype,
        "compressor": null,
        "fill_value": fill_value,
        "filters": null,
        "order": "C",
    })
}

fn le_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn le_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Zarr metadata documents of the populated cube, keyed relative to the cube root
fn cube_metadata() -> Vec<(String, Value)> {
    vec![
        (".zgroup".into(), json!({ "zarr_format": 2 })),
        (
            ".zattrs".into(),
            json!({
                "title": "Regional ESDL test cube",
                "Conventions": "CF-1.7",
                "geospatial_lat_resolution": 0.25,
            }),
        ),
        ("time/.zarray".into(), zarray(&[4], &[4], "<f8", json!("NaN"))),
        (
            "time/.zattrs".into(),
            json!({
                "_ARRAY_DIMENSIONS": ["time"],
                "units": "days since 2019-01-01",
                "calendar": "gregorian",
            }),
        ),
        ("lat/.zarray".into(), zarray(&[3], &[3], "<f4", json!("NaN"))),
        (
            "lat/.zattrs".into(),
            json!({ "_ARRAY_DIMENSIONS": ["lat"], "units": "degrees_north" }),
        ),
        ("lon/.zarray".into(), zarray(&[2], &[2], "<f4", json!("NaN"))),
        (
            "lon/.zattrs".into(),
            json!({ "_ARRAY_DIMENSIONS": ["lon"], "units": "degrees_east" }),
        ),
        (
            format!("{}/.zarray", GPP),
            zarray(&[4, 3, 2], &[2, 3, 2], "<f4", json!("NaN")),
        ),
        (
            format!("{}/.zattrs", GPP),
            json!({
                "_ARRAY_DIMENSIONS": ["time", "lat", "lon"],
                "units": "gC m-2 day-1",
                "long_name": "Gross Primary Productivity",
            }),
        ),
        (
            "water_mask/.zarray".into(),
            zarray(&[3, 2], &[3, 2], "|u1", json!(0)),
        ),
        (
            "water_mask/.zattrs".into(),
            json!({ "_ARRAY_DIMENSIONS": ["lat", "lon"] }),
        ),
    ]
}

/// Every object of the bucket as `(key, bytes)`.
///
/// With `consolidated` the populated cube also carries a `.zmetadata` document.
pub fn bucket_objects(consolidated: bool) -> Vec<(String, Vec<u8>)> {
    let metadata = cube_metadata();
    let mut objects: Vec<(String, Vec<u8>)> = metadata
        .iter()
        .map(|(key, doc)| (format!("{}/{}", CUBE, key), doc.to_string().into_bytes()))
        .collect();

    if consolidated {
        let documents: serde_json::Map<String, Value> = metadata.into_iter().collect();
        let zmetadata = json!({
            "metadata": documents,
            "zarr_consolidated_format": 1,
        });
        objects.push((format!("{}/.zmetadata", CUBE), zmetadata.to_string().into_bytes()));
    }

    let values = gpp_values();
    objects.push((format!("{}/{}/0.0.0", CUBE, GPP), le_f32(&values[..12])));
    objects.push((format!("{}/{}/1.0.0", CUBE, GPP), le_f32(&values[12..])));
    objects.push((format!("{}/time/0", CUBE), le_f64(&[0.0, 8.0, 16.0, 24.0])));
    objects.push((format!("{}/lat/0", CUBE), le_f32(&[10.0, 9.75, 9.5])));
    objects.push((format!("{}/lon/0", CUBE), le_f32(&[-75.0, -74.75])));
    objects.push((format!("{}/water_mask/0.0", CUBE), vec![1, 0, 1, 1, 0, 0]));

    objects.push((
        format!("{}/.zgroup", EMPTY_CUBE),
        json!({ "zarr_format": 2 }).to_string().into_bytes(),
    ));
    objects.push(("README.md".into(), b"# Regional ESDL test bucket\n".to_vec()));

    objects
}

/// Number of objects stored beneath [`CUBE`]
pub fn cube_object_count(consolidated: bool) -> usize {
    bucket_objects(consolidated)
        .iter()
        .filter(|(key, _)| key.starts_with(&format!("{}/", CUBE)))
        .count()
}

/// Write objects into the store behind a handle
pub fn put_objects(store: &CloudStore, objects: Vec<(String, Vec<u8>)>) -> Result<()> {
    for (key, data) in objects {
        let path = ObjectPath::from(key.as_str());
        store.block_on(store.store().put(&path, Bytes::from(data).into()))?;
    }
    Ok(())
}

/// A handle to an in-memory bucket seeded with [`bucket_objects`]
pub fn seeded_store(consolidated: bool) -> Result<CloudStore> {
    let store = CloudStore::from_store(BUCKET, Arc::new(InMemory::new()))?;
    put_objects(&store, bucket_objects(consolidated))?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_object_count() {
        // 12 metadata documents and 6 chunks
        assert_eq!(cube_object_count(false), 18);
        assert_eq!(cube_object_count(true), 19);
    }

    #[test]
    fn test_consolidated_metadata_lists_every_document() {
        let objects = bucket_objects(true);
        let (_, zmetadata) = objects
            .iter()
            .find(|(key, _)| key.ends_with(".zmetadata"))
            .unwrap();
        let doc: Value = serde_json::from_slice(zmetadata).unwrap();
        assert_eq!(doc["zarr_consolidated_format"], 1);
        assert_eq!(doc["metadata"].as_object().unwrap().len(), 12);
        assert_eq!(
            doc["metadata"][format!("{}/.zarray", GPP)]["chunks"],
            json!([2, 3, 2])
        );
    }

    #[test]
    fn test_seeded_store_holds_everything() {
        let store = seeded_store(false).unwrap();
        let all = store.list_recursive(&ObjectPath::default()).unwrap();
        assert_eq!(all.len(), bucket_objects(false).len());
    }
}
