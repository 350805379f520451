//! esdl - access to the regional Earth System Data Lab
//!
//! This library provides the configuration layer and in-place access to the
//! archive's Zarr data cubes. Object-store listing and copying live in
//! [`esdl_cloud`], which is re-exported as [`cloud`].

pub mod config;
pub mod dataset;
pub mod error;

pub use error::{Error, Result};

pub use esdl_cloud as cloud;

// Re-export commonly used types
pub use config::Config;
pub use dataset::{open_dataset, DataKind, Dataset, Variable};
