//! Cloud and cloud-shadow detection for Sentinel-2 scenes
//!
//! - **CDI**: cloud displacement index from the B7/B8/B8A parallax
//! - **Cloud condition**: probability, CDI and cirrus tests combined per pixel
//! - **Shadow projection**: directional distance transform toward the sun

mod cdi;
mod condition;
mod shadow;

pub use cdi::{cloud_displacement_index, CdiParams, CloudDisplacementIndex};
pub use condition::{cloud_condition, CloudParams};
pub use shadow::{directional_distance, shadow_projection_angle};
