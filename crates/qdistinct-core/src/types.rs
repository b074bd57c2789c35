//! Lightweight logical values, rows, and the distinct key derived from them.
//!
//! Rows are row-major here: DISTINCT sees one row at a time and compares a
//! prefix of it, so a `Vec<Scalar>` per row is the natural shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, Hash256};
use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Null => DataType::Utf8, // TODO: carry an explicit Null type once schemas need it
            Scalar::Bool(_) => DataType::Boolean,
            Scalar::I32(_) => DataType::Int32,
            Scalar::I64(_) => DataType::Int64,
            Scalar::F32(_) => DataType::Float32,
            Scalar::F64(_) => DataType::Float64,
            Scalar::Str(_) => DataType::Utf8,
            Scalar::Bin(_) => DataType::Binary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Type discriminant written ahead of every encoded value.
    fn tag(&self) -> u8 {
        use Scalar::*;
        match self {
            Null => 0,
            Bool(_) => 1,
            I32(_) => 2,
            I64(_) => 3,
            F32(_) => 4,
            F64(_) => 5,
            Str(_) => 6,
            Bin(_) => 7,
        }
    }

    /// Append the key encoding of this value to `out`.
    ///
    /// Variable-length payloads are length-prefixed so that adjacent values
    /// can never run into each other. Floats are encoded by bit pattern.
    fn encode_into(&self, out: &mut Vec<u8>) {
        use Scalar::*;

        out.push(self.tag());
        match self {
            Null => {}
            Bool(b) => out.push(*b as u8),
            I32(i) => out.extend_from_slice(&i.to_be_bytes()),
            I64(i) => out.extend_from_slice(&i.to_be_bytes()),
            F32(f) => out.extend_from_slice(&f.to_bits().to_be_bytes()),
            F64(f) => out.extend_from_slice(&f.to_bits().to_be_bytes()),
            Str(s) => {
                out.extend_from_slice(&(s.len() as u64).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Bin(b) => {
                out.extend_from_slice(&(b.len() as u64).to_be_bytes());
                out.extend_from_slice(b);
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Scalar::*;
        match self {
            Null => write!(f, "NULL"),
            Bool(b) => write!(f, "{b}"),
            I32(i) => write!(f, "{i}"),
            I64(i) => write!(f, "{i}"),
            F32(v) => write!(f, "{v}"),
            F64(v) => write!(f, "{v}"),
            Str(s) => write!(f, "{s}"),
            Bin(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// One row flowing between operators.
///
/// The first `hidden_field_offset` values are the visible columns; anything
/// after that is bookkeeping appended by the planner (row handles and the
/// like) and is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub data: Vec<Scalar>,
}

impl Row {
    pub fn new(data: Vec<Scalar>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Scalar> {
        self.data.get(idx)
    }

    /// Visible prefix `data[0..hidden_field_offset]`.
    pub fn visible(&self, hidden_field_offset: usize) -> Result<&[Scalar]> {
        self.data.get(..hidden_field_offset).ok_or_else(|| {
            Error::Invariant(format!(
                "hidden field offset {} exceeds row width {}",
                hidden_field_offset,
                self.data.len()
            ))
        })
    }

    /// Key used by DISTINCT to decide whether this row starts a new group.
    pub fn distinct_key(&self, hidden_field_offset: usize) -> Result<DistinctKey> {
        Ok(DistinctKey::from_values(self.visible(hidden_field_offset)?))
    }
}

impl From<Vec<Scalar>> for Row {
    fn from(data: Vec<Scalar>) -> Self {
        Row::new(data)
    }
}

/// Encoded visible prefix of a row.
///
/// Two keys are equal iff the values they were built from are element-wise
/// equal, with floats compared by bit pattern and values of different types
/// never equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistinctKey {
    arity: usize,
    bytes: Vec<u8>,
}

impl DistinctKey {
    pub fn from_values(values: &[Scalar]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 9);
        for v in values {
            v.encode_into(&mut bytes);
        }
        Self {
            arity: values.len(),
            bytes,
        }
    }

    /// Number of values the key was built from.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Stable content digest, used to name storage-backed entries.
    pub fn digest(&self) -> Hash256 {
        hash_bytes(&self.bytes)
    }
}
