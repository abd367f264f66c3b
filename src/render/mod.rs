//! Rendering system and GPU interfaces

pub mod buffers;
pub mod context;
pub mod mesh;
pub mod pipeline;

pub use buffers::FieldBuffers;
pub use context::{GpuContext, HeadlessContext};
pub use mesh::BladeMesh;
