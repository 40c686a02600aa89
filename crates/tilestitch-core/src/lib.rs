//! Core types for stitching overlapping microscope tiles.
//!
//! This crate holds the data model shared by the pairwise shift estimation
//! and the global optimization: view and group identifiers, pixel regions,
//! bounding boxes, affine transforms and the content hash used to detect
//! stale pairwise results. It also defines the narrow contracts through which
//! pixels and acquisition metadata are obtained ([`ImageLoader`],
//! [`TileMetadata`]); it does not read any file format itself.

mod aggregate;
mod bbox;
mod collab;
mod error;
mod hash;
mod ids;
mod region;
mod transform;

pub use aggregate::Aggregation;
pub use bbox::{BoundingBox, RasterBox};
pub use collab::{ImageLoader, InMemoryImages, InMemoryMetadata, TileMetadata};
pub use error::CoreError;
pub use hash::ContentHash;
pub use ids::{canonical_pair, Group, ViewId};
pub use region::PixelRegion;
pub use transform::AffineTransform;
