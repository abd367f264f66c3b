//! Field configuration: numeric tunables for cells, cutting, and streaming.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How a cell's blade count is expressed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BladeDensity {
    /// Flat blade count per cell.
    PerCell(u32),
    /// Blades per square meter of cell footprint.
    PerArea(f32),
}

impl BladeDensity {
    /// Resolve to a blade count for a cell of the given footprint.
    pub fn count_for(&self, width: f32, length: f32) -> u32 {
        match *self {
            BladeDensity::PerCell(count) => count,
            BladeDensity::PerArea(rate) => (rate * width * length).round() as u32,
        }
    }

    /// Blades per square meter for the given footprint.
    pub fn per_area(&self, width: f32, length: f32) -> f32 {
        match *self {
            BladeDensity::PerCell(count) => {
                let area = width * length;
                if area > 0.0 { count as f32 / area } else { 0.0 }
            }
            BladeDensity::PerArea(rate) => rate,
        }
    }
}

/// Numeric tunables consumed by the field, cutter, and streamer.
///
/// Load with [`FieldConfig::load_sync`] or start from [`Default`] and adjust.
/// [`FieldConfig::validated`] applies the clamps; constructors that accept a
/// config expect a validated one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Cell footprint along x, meters.
    pub cell_width: f32,
    /// Cell footprint along z, meters.
    pub cell_length: f32,
    /// Blades per cell.
    pub density: BladeDensity,
    /// Vertical placement offset for blade roots.
    pub y_origin: f32,
    /// Lower bound of the blade yaw range, radians.
    pub rotation_min: f32,
    /// Upper bound of the blade yaw range, radians.
    pub rotation_max: f32,
    /// Cut sphere radius, meters.
    pub cut_radius: f32,
    /// Viewer travel distance that triggers the next cut, meters.
    pub cut_distance: f32,
    /// Slot ceiling: maximum simultaneously drawn cells.
    pub max_cells: u32,
    /// Cells the streamer keeps active ahead of the viewer.
    pub visible_cells: u32,
    /// Cell containers to pre-allocate in the pool.
    pub pool_prewarm: u32,
    /// Draw-bounds growth per side, sized to cover the tallest blade.
    pub bounds_margin: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            cell_width: 20.0,
            cell_length: 20.0,
            density: BladeDensity::PerCell(500),
            y_origin: 0.0,
            // Restrict yaw to the back half-turn so blades never face the
            // camera edge-on.
            rotation_min: 0.75 * std::f32::consts::PI,
            rotation_max: 1.25 * std::f32::consts::PI,
            cut_radius: 1.0,
            cut_distance: 0.5,
            max_cells: 5,
            visible_cells: 3,
            pool_prewarm: 10,
            bounds_margin: 20.0,
        }
    }
}

impl FieldConfig {
    /// Apply monotonic clamps to every tunable and return the result.
    pub fn validated(mut self) -> Self {
        const TWO_PI: f32 = 2.0 * std::f32::consts::PI;

        self.cell_width = self.cell_width.max(1.0);
        self.cell_length = self.cell_length.max(1.0);
        self.density = match self.density {
            BladeDensity::PerCell(count) => BladeDensity::PerCell(count.max(1)),
            BladeDensity::PerArea(rate) => BladeDensity::PerArea(rate.max(0.01)),
        };
        self.rotation_min = self.rotation_min.clamp(0.0, TWO_PI);
        self.rotation_max = self.rotation_max.clamp(self.rotation_min, TWO_PI);
        self.cut_radius = self.cut_radius.max(0.1);
        self.cut_distance = self.cut_distance.max(0.1);
        self.max_cells = self.max_cells.max(1);
        self.visible_cells = self.visible_cells.clamp(1, self.max_cells);
        self.bounds_margin = self.bounds_margin.max(0.0);
        self
    }

    /// Blade count one cell generates under this config.
    pub fn blades_per_cell(&self) -> u32 {
        self.density.count_for(self.cell_width, self.cell_length)
    }

    /// Blades per square meter under this config.
    pub fn blades_per_area(&self) -> f32 {
        self.density.per_area(self.cell_width, self.cell_length)
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)
    }

    /// Load from file (sync), applying validation clamps.
    pub fn load_sync(path: &Path) -> Result<Self, io::Error> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(config.validated())
    }
}
