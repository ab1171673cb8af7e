//! Binary morphology for cloud masks
//!
//! - **Erosion**: a set cell survives only if its whole neighborhood is set
//! - **Dilation**: a cell becomes set if any neighbor is set
//! - **Cleaning**: erosion then dilation with independent radii

mod binary;
mod element;

pub use binary::{clean_mask, dilate, erode, Dilate, Erode, MorphologyParams};
pub use element::StructuringElement;
