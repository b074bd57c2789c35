//! Streaming NDJSON writer.

use std::io::{BufWriter, Write};

use serde_json::{Map, Value};

use crate::error::Result;
use qdistinct_core::types::{Row, Scalar};

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    // keys for the leading row values; extra values are written as `_hiddenN`
    columns: Vec<String>,
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W, columns: Vec<String>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            columns,
        }
    }

    /// Write one row as one JSON object per line, keys in column order.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        let mut obj = Map::new();
        for (i, val) in row.data.iter().enumerate() {
            let key = match self.columns.get(i) {
                Some(name) => name.clone(),
                None => format!("_hidden{}", i - self.columns.len()),
            };
            obj.insert(key, scalar_to_json(val));
        }
        let line = serde_json::to_string(&Value::Object(obj))?;
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn scalar_to_json(v: &Scalar) -> Value {
    use Scalar::*;
    match v {
        Null => Value::Null,
        Bool(b) => Value::Bool(*b),
        I32(i) => Value::from(*i),
        I64(i) => Value::from(*i),
        F32(f) => Value::from(*f as f64),
        F64(f) => Value::from(*f),
        Str(s) => Value::String(s.clone()),
        Bin(b) => Value::String(format!("[binary {} bytes]", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_named_and_hidden_values() {
        let mut out = Vec::new();
        {
            let mut w = JsonlWriter::to_writer(&mut out, vec!["id".into()]);
            w.write_row(&Row::new(vec![Scalar::I64(1), Scalar::I64(99)])).unwrap();
            w.flush().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.trim(), r#"{"id":1,"_hidden0":99}"#);
    }
}
