//! Shared types for tooldist: version numbers, artifact descriptors, store
//! key layout, and catalog wire documents.

pub mod descriptor;
pub mod series;
pub mod store_keys;
pub mod streams;
pub mod version;

pub use descriptor::{Artifact, ArtifactDescriptor, product_id};
pub use series::series_version;
pub use streams::{
    DataType, IndexDocument, ProductRef, ProductsDocument, StreamDocument, StreamError,
    decode_index, decode_products,
};
pub use version::{Binary, Number, VersionError};
