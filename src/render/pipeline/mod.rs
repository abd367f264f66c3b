//! Render pipelines

pub mod cut;
pub mod draw;

pub use cut::{CutParams, CutPipeline, CUT_WORKGROUP_SIZE};
pub use draw::{CameraUniform, DrawPipeline, DEPTH_FORMAT};
