//! Purpose: Convert records returned by the store into the caller's bin mapping.
//! Exports: `demarshal_bins`, `metadata_json`, `RecordBins`.
//! Role: Last stage of every reading entry point.
//! Invariants: Absent bins are omitted; a null bin maps to JSON null.
//! Invariants: On failure nothing is returned, so caller output stays untouched.
use serde_json::{Map, Value as Json, json};

use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Metadata, Record};

/// Bins plus metadata, as `get` returns them.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordBins {
    pub bins: Map<String, Json>,
    pub metadata: Metadata,
}

impl RecordBins {
    pub fn to_json(&self) -> Json {
        json!({
            "bins": Json::Object(self.bins.clone()),
            "metadata": metadata_json(&self.metadata),
        })
    }
}

/// Bins keep the order the store returned them in.
pub fn demarshal_bins(record: &Record) -> Result<Map<String, Json>, Error> {
    let mut bins = Map::with_capacity(record.len());
    for (name, value) in record.bins() {
        if bins.insert(name.clone(), value.to_json()).is_some() {
            return Err(Error::new(ErrorKind::Demarshal)
                .with_hint("record lists the same bin more than once")
                .with_bin(name.clone()));
        }
    }
    Ok(bins)
}

pub fn demarshal_record(record: &Record) -> Result<RecordBins, Error> {
    Ok(RecordBins {
        bins: demarshal_bins(record)?,
        metadata: record.metadata(),
    })
}

/// Exactly `{generation, ttl}`.
pub fn metadata_json(metadata: &Metadata) -> Json {
    json!({
        "generation": metadata.generation,
        "ttl": metadata.ttl,
    })
}
