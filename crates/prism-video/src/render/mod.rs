//! wgpu rendering internals.
//!
//! - [`color`] - fixed YCbCr→RGB conversion constants
//! - [`texture`] - plane texture sets with geometry-keyed reuse
//! - [`renderer`] - pipeline selection and draw/clear entry points

pub mod color;
pub mod renderer;
pub mod texture;
