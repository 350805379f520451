//! Zarr v2 metadata documents and the xarray conventions layered on them

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use zarrs::metadata::v2::ArrayMetadataV2;

/// Attribute xarray stores dimension names under
pub const DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";

/// Group marker document
pub const ZGROUP: &str = ".zgroup";
/// Attributes document of a group or array
pub const ZATTRS: &str = ".zattrs";
/// Array metadata document
pub const ZARRAY: &str = ".zarray";
/// Consolidated metadata document
pub const ZMETADATA: &str = ".zmetadata";

/// Codec id of the compressor (`blosc`, `zlib`, ...)
pub fn compressor_id(metadata: &ArrayMetadataV2) -> Option<String> {
    metadata.compressor.as_ref().map(|c| c.id().to_string())
}

/// The NumPy type string as stored, or the JSON of a structured type
pub fn type_string(metadata: &ArrayMetadataV2) -> String {
    match serde_json::to_value(&metadata.dtype) {
        Ok(Value::String(typestr)) => typestr,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

/// Contents of a `.zmetadata` document
#[derive(Debug, Clone, Deserialize)]
pub struct ConsolidatedMetadata {
    /// Every document of the hierarchy, keyed relative to its root
    pub metadata: BTreeMap<String, Value>,
    /// Envelope version, always 1
    pub zarr_consolidated_format: u32,
}

/// The root group of a hierarchy and its direct child arrays
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// Attributes of the root group
    pub attrs: Map<String, Value>,
    /// Array metadata and attributes by array name
    pub arrays: BTreeMap<String, (ArrayMetadataV2, Map<String, Value>)>,
}

impl Hierarchy {
    /// Assemble from documents keyed relative to the root (`.zattrs`,
    /// `var/.zarray`, ...). Arrays below nested groups are not part of the
    /// root dataset and are left out.
    pub fn from_documents(documents: &BTreeMap<String, Value>) -> Result<Self> {
        let mut hierarchy = Hierarchy::default();

        if let Some(attrs) = documents.get(ZATTRS) {
            hierarchy.attrs = attrs_of(ZATTRS, attrs)?;
        }

        for (key, doc) in documents {
            let Some(name) = key.strip_suffix(ZARRAY).and_then(|k| k.strip_suffix('/')) else {
                continue;
            };
            if name.contains('/') {
                continue;
            }

            let metadata: ArrayMetadataV2 = serde_json::from_value(doc.clone())
                .map_err(|source| Error::Metadata {
                    path: key.clone(),
                    source,
                })?;

            let attrs_key = format!("{}/{}", name, ZATTRS);
            let attrs = match documents.get(&attrs_key) {
                Some(doc) => attrs_of(&attrs_key, doc)?,
                None => Map::new(),
            };

            hierarchy.arrays.insert(name.to_string(), (metadata, attrs));
        }

        Ok(hierarchy)
    }
}

fn attrs_of(path: &str, doc: &Value) -> Result<Map<String, Value>> {
    match doc {
        Value::Object(map) => Ok(map.clone()),
        _ => Err(Error::Dataset(format!("{} is not a JSON object", path))),
    }
}

/// Decode one metadata document
pub fn parse_document(path: &str, bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|source| Error::Metadata {
        path: path.to_string(),
        source,
    })
}

/// Decode a `.zmetadata` document into its per-key documents
pub fn parse_consolidated(path: &str, bytes: &[u8]) -> Result<BTreeMap<String, Value>> {
    let consolidated: ConsolidatedMetadata =
        serde_json::from_slice(bytes).map_err(|source| Error::Metadata {
            path: path.to_string(),
            source,
        })?;

    if consolidated.zarr_consolidated_format != 1 {
        return Err(Error::Dataset(format!(
            "{}: unsupported consolidated format {}",
            path, consolidated.zarr_consolidated_format
        )));
    }

    Ok(consolidated.metadata)
}

/// Dimension names from `_ARRAY_DIMENSIONS`, `None` when the attribute is absent
pub fn dimension_names(name: &str, attrs: &Map<String, Value>) -> Result<Option<Vec<String>>> {
    let Some(dims) = attrs.get(DIMENSIONS_ATTR) else {
        return Ok(None);
    };

    let names = dims
        .as_array()
        .and_then(|dims| {
            dims.iter()
                .map(|d| d.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| {
            Error::Dataset(format!("{}: {} must be a list of names", name, DIMENSIONS_ATTR))
        })?;

    Ok(Some(names))
}
