//! CSV reader producing `Row`s with inferred scalar types.
//!
//! The header row names the fields. Each cell is typed on its own: empty →
//! `Null`, then `I64`, `F64`, `Bool`, falling back to `Str`. A field's data
//! type is taken from its first non-null cell.

use std::fs::File;
use std::io::Read;

use qdistinct_core::schema::{DataType, Field, Schema};
use qdistinct_core::types::{Row, Scalar};

use crate::error::Result;

pub struct CsvReader<R: Read> {
    inner: csv::Reader<R>,
}

impl CsvReader<File> {
    pub fn from_path(path: &str) -> Result<Self> {
        let f = File::open(path)?;
        Ok(Self::from_reader(f))
    }
}

impl<R: Read> CsvReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            inner: csv::ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_reader(reader),
        }
    }

    /// Read every record. Returns the inferred schema and the rows in file order.
    pub fn read_rows(&mut self) -> Result<(Schema, Vec<Row>)> {
        let names: Vec<String> = self.inner.headers()?.iter().map(|h| h.to_string()).collect();
        let mut types: Vec<Option<DataType>> = vec![None; names.len()];
        let mut rows = Vec::new();

        for record in self.inner.records() {
            let record = record?;
            let data: Vec<Scalar> = record.iter().map(infer_scalar).collect();
            for (slot, v) in types.iter_mut().zip(&data) {
                if slot.is_none() && !v.is_null() {
                    *slot = Some(v.data_type());
                }
            }
            rows.push(Row::new(data));
        }

        let fields = names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| Field::new(name, ty.unwrap_or(DataType::Utf8), true))
            .collect();
        Ok((Schema::new(fields), rows))
    }
}

fn infer_scalar(cell: &str) -> Scalar {
    if cell.is_empty() {
        return Scalar::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Scalar::I64(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        return Scalar::F64(f);
    }
    match cell {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        _ => Scalar::Str(cell.to_string()),
    }
}
