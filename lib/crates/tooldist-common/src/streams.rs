//! Catalog wire documents.
//!
//! Every document carries a `format` tag and is one of a closed set of
//! schemas. Decoding goes through [`StreamDocument`], so an unknown format or
//! datatype is rejected instead of being coerced into some record shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::ArtifactDescriptor;

/// Errors produced while encoding or decoding catalog documents.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {expected} document, found {found}")]
    UnexpectedFormat {
        expected: &'static str,
        found: &'static str,
    },
}

/// Kind of payload the items of a stream describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "content-download")]
    ContentDownload,
}

/// Tagged union of all catalog documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format")]
pub enum StreamDocument {
    #[serde(rename = "index:1.0")]
    Index(IndexDocument),
    #[serde(rename = "products:1.0")]
    Products(ProductsDocument),
}

impl StreamDocument {
    fn format_name(&self) -> &'static str {
        match self {
            Self::Index(_) => "index:1.0",
            Self::Products(_) => "products:1.0",
        }
    }

    /// Encode as pretty-printed JSON.
    pub fn encode(&self) -> Result<Vec<u8>, StreamError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Enumerates the product streams of a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub updated: DateTime<Utc>,
    pub content_id: String,
    pub datatype: DataType,
    pub products: BTreeMap<String, ProductRef>,
}

/// Pointer from the index to a listing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Path of the listing, relative to the tools prefix.
    pub path: String,
}

/// Lists every artifact of one product stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsDocument {
    pub updated: DateTime<Utc>,
    pub product: String,
    pub datatype: DataType,
    pub items: Vec<ArtifactDescriptor>,
}

/// Decode an index document.
pub fn decode_index(data: &[u8]) -> Result<IndexDocument, StreamError> {
    match serde_json::from_slice::<StreamDocument>(data)? {
        StreamDocument::Index(doc) => Ok(doc),
        other => Err(StreamError::UnexpectedFormat {
            expected: "index:1.0",
            found: other.format_name(),
        }),
    }
}

/// Decode a product listing document.
pub fn decode_products(data: &[u8]) -> Result<ProductsDocument, StreamError> {
    match serde_json::from_slice::<StreamDocument>(data)? {
        StreamDocument::Products(doc) => Ok(doc),
        other => Err(StreamError::UnexpectedFormat {
            expected: "products:1.0",
            found: other.format_name(),
        }),
    }
}
