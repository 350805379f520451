//! Reading values through `zarrs` on top of the dataset's object store

use super::{DataKind, Dataset, Variable};
use crate::{Error, Result};
use esdl_cloud::{CloudStore, Location};
use object_store::prefix::PrefixStore;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut, Range};
use std::sync::Arc;
use tracing::debug;
use zarrs::array::{Array, ElementOwned};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::{AsyncReadableListableStorage, AsyncReadableListableStorageTraits};
use zarrs_object_store::AsyncObjectStore;

pub(super) type RemoteArray = Array<dyn AsyncReadableListableStorageTraits>;

/// Arrays of a dataset by variable name, built once on open
#[derive(Clone, Default)]
pub(super) struct Arrays(BTreeMap<String, Arc<RemoteArray>>);

impl Deref for Arrays {
    type Target = BTreeMap<String, Arc<RemoteArray>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Arrays {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Debug for Arrays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Storage rooted at the dataset, so array paths are `/<variable>`
pub(super) fn storage(store: &CloudStore, location: &Location) -> AsyncReadableListableStorage {
    let prefixed = PrefixStore::new(store.store().clone(), location.prefix.clone());
    Arc::new(AsyncObjectStore::new(prefixed))
}

impl Dataset {
    fn array(&self, variable: &Variable) -> Result<&RemoteArray> {
        self.arrays
            .get(&variable.name)
            .map(Arc::as_ref)
            .ok_or_else(|| Error::NotFound(format!("array {} in {}", variable.name, self.location)))
    }

    /// Values of one chunk in C order.
    ///
    /// Chunks on the upper edge of the array come back at full chunk size,
    /// padded with the fill value, the way they are stored.
    pub fn read_chunk<T>(&self, variable: &str, chunk_indices: &[u64]) -> Result<Vec<T>>
    where
        T: ElementOwned + Send + Sync,
    {
        let var = self.variable(variable)?;
        check_chunk_indices(var, chunk_indices)?;

        let array = self.array(var)?;
        debug!("Reading {} chunk {:?}", variable, chunk_indices);
        self.store
            .block_on(array.async_retrieve_chunk_elements::<T>(chunk_indices))
            .map_err(|e| Error::Zarr(format!("{} chunk {:?}: {}", variable, chunk_indices, e)))
    }

    /// Values of a hyperrectangle in C order
    pub fn read_subset<T>(&self, variable: &str, ranges: &[Range<u64>]) -> Result<Vec<T>>
    where
        T: ElementOwned + Send + Sync,
    {
        let var = self.variable(variable)?;
        check_ranges(var, ranges)?;

        let array = self.array(var)?;
        let subset = ArraySubset::new_with_ranges(ranges);
        self.store
            .block_on(array.async_retrieve_array_subset_elements::<T>(&subset))
            .map_err(|e| Error::Zarr(format!("{} {:?}: {}", variable, ranges, e)))
    }

    /// Every value of a variable in C order
    pub fn read_all<T>(&self, variable: &str) -> Result<Vec<T>>
    where
        T: ElementOwned + Send + Sync,
    {
        let ranges: Vec<Range<u64>> = self
            .variable(variable)?
            .shape
            .iter()
            .map(|len| 0..*len)
            .collect();
        self.read_subset(variable, &ranges)
    }

    /// One chunk widened to `f64`, whatever the stored numeric type
    pub fn read_chunk_f64(&self, variable: &str, chunk_indices: &[u64]) -> Result<Vec<f64>> {
        let kind = self.variable(variable)?.kind.ok_or_else(|| {
            Error::Dataset(format!("{}: unsupported element type", variable))
        })?;

        // 64-bit integers may lose precision above 2^53
        let values = match kind {
            DataKind::Bool => widen(self.read_chunk::<bool>(variable, chunk_indices)?, |v| {
                f64::from(u8::from(v))
            }),
            DataKind::Int8 => widen(self.read_chunk::<i8>(variable, chunk_indices)?, f64::from),
            DataKind::Int16 => widen(self.read_chunk::<i16>(variable, chunk_indices)?, f64::from),
            DataKind::Int32 => widen(self.read_chunk::<i32>(variable, chunk_indices)?, f64::from),
            DataKind::Int64 => widen(self.read_chunk::<i64>(variable, chunk_indices)?, |v| v as f64),
            DataKind::UInt8 => widen(self.read_chunk::<u8>(variable, chunk_indices)?, f64::from),
            DataKind::UInt16 => widen(self.read_chunk::<u16>(variable, chunk_indices)?, f64::from),
            DataKind::UInt32 => widen(self.read_chunk::<u32>(variable, chunk_indices)?, f64::from),
            DataKind::UInt64 => widen(self.read_chunk::<u64>(variable, chunk_indices)?, |v| v as f64),
            DataKind::Float32 => widen(self.read_chunk::<f32>(variable, chunk_indices)?, f64::from),
            DataKind::Float64 => self.read_chunk::<f64>(variable, chunk_indices)?,
        };
        Ok(values)
    }
}

fn widen<T>(values: Vec<T>, f: impl Fn(T) -> f64) -> Vec<f64> {
    values.into_iter().map(f).collect()
}

fn check_chunk_indices(var: &Variable, chunk_indices: &[u64]) -> Result<()> {
    let grid = var.chunk_grid();
    if chunk_indices.len() != grid.len() {
        return Err(Error::Dataset(format!(
            "{}: {} chunk index(es) given for a {}-dimensional array",
            var.name,
            chunk_indices.len(),
            grid.len()
        )));
    }
    if let Some((axis, (index, count))) = chunk_indices
        .iter()
        .zip(&grid)
        .enumerate()
        .find(|(_, (index, count))| index >= count)
    {
        return Err(Error::Dataset(format!(
            "{}: chunk index {} out of bounds on axis {} ({} chunk(s))",
            var.name, index, axis, count
        )));
    }
    Ok(())
}

fn check_ranges(var: &Variable, ranges: &[Range<u64>]) -> Result<()> {
    if ranges.len() != var.ndim() {
        return Err(Error::Dataset(format!(
            "{}: {} range(s) given for a {}-dimensional array",
            var.name,
            ranges.len(),
            var.ndim()
        )));
    }
    for (axis, (range, len)) in ranges.iter().zip(&var.shape).enumerate() {
        if range.start > range.end || range.end > *len {
            return Err(Error::Dataset(format!(
                "{}: range {:?} out of bounds on axis {} (length {})",
                var.name, range, axis, len
            )));
        }
    }
    Ok(())
}
