//! Pure catalog transformations: building descriptors from known artifacts,
//! merging catalogs, and encoding them into wire documents.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tooldist_common::store_keys::{artifact_path, content_id, listing_path};
use tooldist_common::{
    Artifact, ArtifactDescriptor, Binary, DataType, IndexDocument, ProductRef, ProductsDocument,
    StreamDocument,
};

use crate::domain::error::ToolsError;

/// File type recorded for every published tarball.
pub const FILE_TYPE: &str = "tar.gz";

/// A document to be written, keyed relative to the tools prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFile {
    pub path: String,
    pub data: Vec<u8>,
}

/// One descriptor per known artifact, at its canonical path.
#[must_use]
pub fn from_artifacts(artifacts: &[Artifact]) -> Vec<ArtifactDescriptor> {
    artifacts
        .iter()
        .map(|a| ArtifactDescriptor {
            release: a.version.series.clone(),
            version: a.version.number.clone(),
            arch: a.version.arch.clone(),
            size: a.size,
            path: artifact_path(&a.version),
            resolved_url: None,
            file_type: FILE_TYPE.to_string(),
            sha256: a.sha256.clone(),
        })
        .collect()
}

/// Merge two catalogs keyed by binary version.
///
/// Entries of `new` are taken first. An entry of `old` fills a missing key
/// or replaces an unresolved (`size == 0`) entry. The result is sorted by
/// binary version and carries no resolved URLs.
#[must_use]
pub fn merge(
    new: Vec<ArtifactDescriptor>,
    old: Vec<ArtifactDescriptor>,
) -> Vec<ArtifactDescriptor> {
    let mut by_binary: BTreeMap<Binary, ArtifactDescriptor> = BTreeMap::new();
    for desc in new {
        by_binary.insert(desc.binary(), desc);
    }
    for desc in old {
        let key = desc.binary();
        let replace = by_binary.get(&key).is_none_or(|existing| existing.size == 0);
        if replace {
            by_binary.insert(key, desc);
        }
    }
    by_binary
        .into_values()
        .map(|mut d| {
            d.resolved_url = None;
            d
        })
        .collect()
}

/// Encode a catalog into its listing documents followed by the index.
///
/// The index is always last so a writer that stops midway never leaves an
/// index pointing at listings that were not written.
///
/// # Errors
///
/// Returns a precondition error for a descriptor with an unknown series and
/// a malformed error if a document fails to encode.
pub fn encode_catalog(
    namespace: &str,
    descriptors: &[ArtifactDescriptor],
    updated: DateTime<Utc>,
) -> Result<Vec<MetadataFile>, ToolsError> {
    let mut streams: BTreeMap<String, Vec<ArtifactDescriptor>> = BTreeMap::new();
    for desc in descriptors {
        let id = desc.product_id(namespace)?;
        let mut item = desc.clone();
        item.resolved_url = None;
        streams.entry(id).or_default().push(item);
    }

    let mut files = Vec::with_capacity(streams.len() + 1);
    let mut products = BTreeMap::new();
    for (id, items) in streams {
        let path = listing_path(&id);
        let doc = StreamDocument::Products(ProductsDocument {
            updated,
            product: id.clone(),
            datatype: DataType::ContentDownload,
            items,
        });
        let data = doc.encode().map_err(|e| ToolsError::stream(&path, &e))?;
        products.insert(id, ProductRef { path: path.clone() });
        files.push(MetadataFile { path, data });
    }

    let index_path = tooldist_common::store_keys::INDEX_PATH;
    let index = StreamDocument::Index(IndexDocument {
        updated,
        content_id: content_id(namespace),
        datatype: DataType::ContentDownload,
        products,
    });
    let data = index
        .encode()
        .map_err(|e| ToolsError::stream(index_path, &e))?;
    files.push(MetadataFile {
        path: index_path.to_string(),
        data,
    });
    Ok(files)
}

/// Check that a listing only holds descriptors of the product stream it is
/// filed under.
///
/// # Errors
///
/// Returns a malformed error naming the first offending item.
pub fn check_listing(
    doc: &ProductsDocument,
    namespace: &str,
    expected_product: &str,
    path: &str,
) -> Result<(), ToolsError> {
    if doc.product != expected_product {
        return Err(ToolsError::malformed(
            format!("listing {path}"),
            format!(
                "names product {} but is indexed as {expected_product}",
                doc.product
            ),
        ));
    }
    for item in &doc.items {
        let id = item
            .product_id(namespace)
            .map_err(|e| ToolsError::malformed(format!("listing {path}"), e))?;
        if id != expected_product {
            return Err(ToolsError::malformed(
                format!("listing {path}"),
                format!("{} belongs to {id}", item.binary()),
            ));
        }
    }
    Ok(())
}
