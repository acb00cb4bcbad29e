//! Notion integration: REST client, data source resolution, collection
//! gateway and the image relay.

pub mod api;
pub mod collection;
pub mod config;
pub mod error;
pub mod image;
pub mod source;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use collection::{Collection, NotionGateway};
pub use config::{CollectionKind, NotionConfig};
pub use error::NotionError;
pub use image::ImageProxy;
