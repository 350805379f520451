//! Remote dataset access
//!
//! Opens a Zarr v2 cube where it lives, following the conventions xarray
//! writes: the root group holds one array per variable and each array names
//! its dimensions in `_ARRAY_DIMENSIONS`. Only metadata is fetched on open;
//! values are read chunk by chunk on request (see [`Dataset::read_chunk`]).
//!
//! ```no_run
//! use esdl_core::cloud::StoreOptions;
//!
//! # fn main() -> esdl_core::Result<()> {
//! let ds = esdl_core::open_dataset(
//!     "https://s3.eu-central-1.amazonaws.com/esdl-esdc-v2.0.1/Cube_2019highColombiaCube_184x120x120.zarr",
//!     &StoreOptions::default(),
//! )?;
//! println!("{}", ds);
//! # Ok(())
//! # }
//! ```

mod array;
mod dtype;
pub mod metadata;

pub use dtype::DataKind;

use crate::{Error, Result};
use esdl_cloud::{CloudStore, Location, ObjectPath, StoreOptions};
use array::{Arrays, RemoteArray};
use metadata::{Hierarchy, ZARRAY, ZATTRS, ZGROUP, ZMETADATA};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zarrs::array::Array;
use zarrs::metadata::v2::ArrayMetadataV2;
use zarrs::metadata::ArrayMetadata;

/// One array of the dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    /// Array name, relative to the dataset root
    pub name: String,
    /// Dimension names, one per axis
    pub dims: Vec<String>,
    /// Length of each axis
    pub shape: Vec<u64>,
    /// Chunk length along each axis
    pub chunks: Vec<u64>,
    /// NumPy type string as stored (`<f4`)
    pub dtype: String,
    /// Element type, `None` for types that do not widen to `f64`
    pub kind: Option<DataKind>,
    /// Compressor codec id
    pub compressor: Option<String>,
    /// Fill value as stored
    pub fill_value: Value,
    /// Attributes other than the dimension list
    pub attrs: Map<String, Value>,
}

impl Variable {
    fn from_metadata(
        name: &str,
        dims: Vec<String>,
        metadata: &ArrayMetadataV2,
        mut attrs: Map<String, Value>,
        kind: Option<DataKind>,
    ) -> Result<Self> {
        if dims.len() != metadata.shape.len() || metadata.chunks.len() != metadata.shape.len() {
            return Err(Error::Dataset(format!(
                "{}: {} dimension name(s) and {} chunk length(s) for a {}-dimensional array",
                name,
                dims.len(),
                metadata.chunks.len(),
                metadata.shape.len()
            )));
        }

        attrs.remove(metadata::DIMENSIONS_ATTR);

        Ok(Self {
            name: name.to_string(),
            dims,
            shape: metadata.shape.clone(),
            chunks: metadata.chunks.iter().map(|c| c.get()).collect(),
            dtype: metadata::type_string(metadata),
            kind,
            compressor: metadata::compressor_id(metadata),
            fill_value: serde_json::to_value(&metadata.fill_value).unwrap_or_default(),
            attrs,
        })
    }

    /// Number of axes
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements
    pub fn len(&self) -> u64 {
        self.shape.iter().product()
    }

    /// True if any axis has length zero
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uncompressed size in bytes, when the element type is known
    pub fn nbytes(&self) -> Option<u64> {
        self.kind.map(|k| self.len() * k.size() as u64)
    }

    /// Number of chunks along each axis
    pub fn chunk_grid(&self) -> Vec<u64> {
        self.shape
            .iter()
            .zip(&self.chunks)
            .map(|(len, chunk)| if *chunk == 0 { 0 } else { len.div_ceil(*chunk) })
            .collect()
    }

    /// A coordinate variable indexes the dimension it is named after
    pub fn is_coordinate(&self) -> bool {
        self.dims.len() == 1 && self.dims[0] == self.name
    }
}

/// A remote dataset opened in place
#[derive(Debug, Clone)]
pub struct Dataset {
    store: CloudStore,
    location: Location,
    consolidated: bool,
    attrs: Map<String, Value>,
    dims: BTreeMap<String, u64>,
    variables: BTreeMap<String, Variable>,
    arrays: Arrays,
}

/// Serializable description of a [`Dataset`]
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary<'a> {
    /// Dataset URL
    pub location: String,
    /// Whether metadata came from `.zmetadata`
    pub consolidated: bool,
    /// Dimension lengths by name
    pub dims: &'a BTreeMap<String, u64>,
    /// Variables in name order
    pub variables: Vec<&'a Variable>,
    /// Global attributes
    pub attrs: &'a Map<String, Value>,
}

/// Open the dataset rooted at `url` without downloading it
pub fn open_dataset(url: &str, options: &StoreOptions) -> Result<Dataset> {
    let location = Location::parse(url)?;
    let store = CloudStore::connect(&location, options)?;
    Dataset::open_at(store, location)
}

impl Dataset {
    /// Open the dataset rooted at `location` through an existing handle
    pub fn open_at(store: CloudStore, location: Location) -> Result<Self> {
        info!("Opening dataset {}", location);

        let (documents, consolidated) = match read_consolidated(&store, &location)? {
            Some(documents) => (documents, true),
            None => (read_unconsolidated(&store, &location)?, false),
        };

        let hierarchy = Hierarchy::from_documents(&documents)?;
        let storage = array::storage(&store, &location);
        let mut dims: BTreeMap<String, u64> = BTreeMap::new();
        let mut variables = BTreeMap::new();
        let mut arrays = Arrays::default();

        for (name, (metadata, attrs)) in hierarchy.arrays {
            let Some(names) = metadata::dimension_names(&name, &attrs)? else {
                warn!(
                    "Skipping {}: no {} attribute",
                    name,
                    metadata::DIMENSIONS_ATTR
                );
                continue;
            };

            // Built once from the metadata already fetched; reads reuse it
            let remote: RemoteArray = Array::new_with_metadata(
                storage.clone(),
                &format!("/{}", name),
                ArrayMetadata::V2(metadata.clone()),
            )
            .map_err(|e| Error::Zarr(format!("{}: {}", name, e)))?;
            let kind = DataKind::from_data_type(remote.data_type());

            let variable = Variable::from_metadata(&name, names, &metadata, attrs, kind)?;
            for (dim, len) in variable.dims.iter().zip(&variable.shape) {
                match dims.get(dim) {
                    Some(existing) if existing != len => {
                        return Err(Error::Dataset(format!(
                            "conflicting sizes for dimension {}: {} and {} (in {})",
                            dim, existing, len, name
                        )));
                    }
                    Some(_) => {}
                    None => {
                        dims.insert(dim.clone(), *len);
                    }
                }
            }
            arrays.insert(name.clone(), Arc::new(remote));
            variables.insert(name, variable);
        }

        debug!(
            "Dataset {} has {} variable(s) over {} dimension(s)",
            location,
            variables.len(),
            dims.len()
        );

        Ok(Self {
            store,
            location,
            consolidated,
            attrs: hierarchy.attrs,
            dims,
            variables,
            arrays,
        })
    }

    /// Where the dataset lives
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Whether metadata came from a single `.zmetadata` document
    pub fn is_consolidated(&self) -> bool {
        self.consolidated
    }

    /// Global attributes
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// Dimension lengths by name
    pub fn dims(&self) -> &BTreeMap<String, u64> {
        &self.dims
    }

    /// All variables by name
    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    /// Look up a variable
    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("variable {} in {}", name, self.location)))
    }

    /// Coordinate variables
    pub fn coords(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values().filter(|v| v.is_coordinate())
    }

    /// Data variables (everything that is not a coordinate)
    pub fn data_vars(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values().filter(|v| !v.is_coordinate())
    }

    /// Serializable description
    pub fn summary(&self) -> DatasetSummary<'_> {
        DatasetSummary {
            location: self.location.to_url(),
            consolidated: self.consolidated,
            dims: &self.dims,
            variables: self.variables.values().collect(),
            attrs: &self.attrs,
        }
    }
}

fn document_path(location: &Location, key: &str) -> ObjectPath {
    location.join(key).prefix
}

/// Fetch a document, `None` if it does not exist
fn fetch_document(store: &CloudStore, location: &Location, key: &str) -> Result<Option<Vec<u8>>> {
    match store.get_bytes(&document_path(location, key)) {
        Ok(bytes) => Ok(Some(bytes.to_vec())),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_consolidated(
    store: &CloudStore,
    location: &Location,
) -> Result<Option<BTreeMap<String, Value>>> {
    let Some(bytes) = fetch_document(store, location, ZMETADATA)? else {
        debug!("No consolidated metadata at {}", location);
        return Ok(None);
    };
    metadata::parse_consolidated(ZMETADATA, &bytes).map(Some)
}

fn read_unconsolidated(store: &CloudStore, location: &Location) -> Result<BTreeMap<String, Value>> {
    let mut documents = BTreeMap::new();

    let group = fetch_document(store, location, ZGROUP)?
        .ok_or_else(|| Error::NotFound(format!("Zarr group at {}", location)))?;
    documents.insert(ZGROUP.to_string(), metadata::parse_document(ZGROUP, &group)?);

    if let Some(attrs) = fetch_document(store, location, ZATTRS)? {
        documents.insert(ZATTRS.to_string(), metadata::parse_document(ZATTRS, &attrs)?);
    }

    for entry in store.list(&location.prefix)? {
        if !entry.is_prefix() {
            continue;
        }
        let name = entry.name();

        for suffix in [ZARRAY, ZATTRS] {
            let key = format!("{}/{}", name, suffix);
            if let Some(bytes) = fetch_document(store, location, &key)? {
                documents.insert(key.clone(), metadata::parse_document(&key, &bytes)?);
            }
        }
    }

    Ok(documents)
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<esdl.Dataset> {}", self.location.to_url())?;

        let dims: Vec<String> = self
            .dims
            .iter()
            .map(|(name, len)| format!("{}: {}", name, len))
            .collect();
        writeln!(f, "Dimensions:  ({})", dims.join(", "))?;

        let width = self
            .variables
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0);

        let line = |f: &mut fmt::Formatter<'_>, marker: &str, v: &Variable| {
            let kind = v.kind.map(|k| k.name().to_string()).unwrap_or_else(|| v.dtype.clone());
            let chunks: Vec<String> = v.chunks.iter().map(u64::to_string).collect();
            writeln!(
                f,
                "  {} {:<width$}  ({}) {} chunks=({})",
                marker,
                v.name,
                v.dims.join(", "),
                kind,
                chunks.join(", "),
                width = width
            )
        };

        writeln!(f, "Coordinates:")?;
        for v in self.coords() {
            line(f, "*", v)?;
        }
        writeln!(f, "Data variables:")?;
        for v in self.data_vars() {
            line(f, " ", v)?;
        }

        if !self.attrs.is_empty() {
            writeln!(f, "Attributes:")?;
            for (key, value) in &self.attrs {
                match value {
                    Value::String(s) => writeln!(f, "    {}: {}", key, s)?,
                    other => writeln!(f, "    {}: {}", key, other)?,
                }
            }
        }

        Ok(())
    }
}
