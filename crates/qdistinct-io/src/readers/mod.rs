//! Row readers feeding in-memory sources.

pub mod csv;
