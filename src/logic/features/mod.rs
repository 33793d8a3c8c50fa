//! Features Module - classifier input schema
//!
//! `layout` pins the feature order and light scale; `vector` maps a
//! reading onto that layout.

pub mod layout;
pub mod vector;

#[cfg(test)]
mod tests;

pub use layout::{LayoutInfo, LightScale, FEATURE_COUNT};
pub use vector::{FeatureVector, MissingFeature};
