//! Element kinds the dataset can widen to `f64`

use serde::Serialize;
use std::fmt;
use zarrs::array::DataType;

/// Numeric element type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DataKind {
    /// Kind of a data type as `zarrs` decodes it; `None` for types without
    /// a plain numeric reading (complex, strings, raw bytes, ...)
    pub fn from_data_type(data_type: &DataType) -> Option<Self> {
        let kind = match data_type {
            DataType::Bool => DataKind::Bool,
            DataType::Int8 => DataKind::Int8,
            DataType::Int16 => DataKind::Int16,
            DataType::Int32 => DataKind::Int32,
            DataType::Int64 => DataKind::Int64,
            DataType::UInt8 => DataKind::UInt8,
            DataType::UInt16 => DataKind::UInt16,
            DataType::UInt32 => DataKind::UInt32,
            DataType::UInt64 => DataKind::UInt64,
            DataType::Float32 => DataKind::Float32,
            DataType::Float64 => DataKind::Float64,
            _ => return None,
        };
        Some(kind)
    }

    /// Bytes per element
    pub fn size(self) -> usize {
        match self {
            DataKind::Bool | DataKind::Int8 | DataKind::UInt8 => 1,
            DataKind::Int16 | DataKind::UInt16 => 2,
            DataKind::Int32 | DataKind::UInt32 | DataKind::Float32 => 4,
            DataKind::Int64 | DataKind::UInt64 | DataKind::Float64 => 8,
        }
    }

    /// Name in the NumPy spelling (`float32`)
    pub fn name(self) -> &'static str {
        match self {
            DataKind::Bool => "bool",
            DataKind::Int8 => "int8",
            DataKind::Int16 => "int16",
            DataKind::Int32 => "int32",
            DataKind::Int64 => "int64",
            DataKind::UInt8 => "uint8",
            DataKind::UInt16 => "uint16",
            DataKind::UInt32 => "uint32",
            DataKind::UInt64 => "uint64",
            DataKind::Float32 => "float32",
            DataKind::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
