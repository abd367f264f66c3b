//! Blade field: cells, generation, cut persistence, streaming.

pub mod blade;
pub mod cache;
pub mod cell;
pub mod cutter;
pub mod field;
pub mod streamer;

pub use blade::{Blade, BladeId, BLADE_STRIDE, CUT_FULL};
pub use cache::CutCache;
pub use cell::{Cell, CellId};
pub use cutter::CutEngine;
pub use field::BladeField;
pub use streamer::CellStreamer;
