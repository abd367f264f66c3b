//! Bladefield - GPU-driven streaming blade field renderer

pub mod core;
pub mod math;
pub mod field;
pub mod render;
