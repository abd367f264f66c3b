//! GPU blade record and its identity key.
//!
//! `Blade` is the fixed-stride element stored in the GPU blade buffer.
//! `BladeId` is the quantized key that matches a blade across independent
//! regenerations and buffer snapshots, so cut state survives rebuilds.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Bytes per blade in the GPU buffer. Must match `Blade` in the WGSL shaders.
pub const BLADE_STRIDE: usize = 32;

/// Terminal value the cut kernel writes. `cut` is continuous by layout but
/// cutting always writes this.
pub const CUT_FULL: f32 = 1.0;

/// One blade instance as laid out in the GPU buffer (32 bytes).
///
/// Field order and padding are a shader contract; the WGSL `Blade` struct
/// packs `seed` into the slot after the vec3 position.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Blade {
    /// Position relative to the owning cell's local frame.
    pub position: [f32; 3],
    /// Randomness token in [0,1), also drives shading variation.
    pub seed: f32,
    // -- 16 bytes --
    /// 0 = uncut; the cut kernel writes [`CUT_FULL`].
    pub cut: f32,
    /// Index into the cell transform table.
    pub cell_slot: u32,
    /// Yaw in radians, applied in-shader.
    pub rotation: f32,
    pub _pad: f32,
    // -- 32 bytes --
}

/// Quantized structural key for a blade.
///
/// Positions quantize to millimeters so float round-trips through the GPU
/// buffer compare safely. `seed` and `rotation` compare by bit pattern: both
/// are copied verbatim between host and GPU, never recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BladeId {
    cell_slot: u32,
    qx: i32,
    qy: i32,
    qz: i32,
    seed_bits: u32,
    rotation_bits: u32,
}

fn quantize(v: f32) -> i32 {
    (v * 1000.0).round() as i32
}

impl BladeId {
    /// Key from generation parameters.
    pub fn from_parts(cell_slot: u32, position: Vec3, seed: f32, rotation: f32) -> Self {
        Self {
            cell_slot,
            qx: quantize(position.x),
            qy: quantize(position.y),
            qz: quantize(position.z),
            seed_bits: seed.to_bits(),
            rotation_bits: rotation.to_bits(),
        }
    }

    /// Key from a stored or read-back blade.
    pub fn from_blade(blade: &Blade) -> Self {
        Self::from_parts(
            blade.cell_slot,
            Vec3::from(blade.position),
            blade.seed,
            blade.rotation,
        )
    }

    pub fn cell_slot(&self) -> u32 {
        self.cell_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blade_size() {
        assert_eq!(std::mem::size_of::<Blade>(), BLADE_STRIDE);
    }

    #[test]
    fn test_blade_alignment() {
        assert_eq!(std::mem::size_of::<Blade>() % 16, 0);
    }

    #[test]
    fn test_bytemuck_cast() {
        let b = Blade::zeroed();
        let bytes = bytemuck::bytes_of(&b);
        assert_eq!(bytes.len(), BLADE_STRIDE);
    }

    #[test]
    fn test_identity_matches_generation_and_readback() {
        let blade = Blade {
            position: [1.25, 0.0, -3.5],
            seed: 0.62,
            cut: 0.0,
            cell_slot: 3,
            rotation: 2.9,
            _pad: 0.0,
        };

        let from_blade = BladeId::from_blade(&blade);
        let from_parts =
            BladeId::from_parts(3, Vec3::new(1.25, 0.0, -3.5), 0.62, 2.9);
        assert_eq!(from_blade, from_parts);
    }

    #[test]
    fn test_identity_tolerates_sub_millimeter_drift() {
        let a = BladeId::from_parts(0, Vec3::new(0.1234, 0.0, 7.7), 0.5, 1.0);
        let b = BladeId::from_parts(0, Vec3::new(0.12341, 0.0, 7.70004), 0.5, 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_separates_millimeters() {
        let a = BladeId::from_parts(0, Vec3::new(0.123, 0.0, 0.0), 0.5, 1.0);
        let b = BladeId::from_parts(0, Vec3::new(0.124, 0.0, 0.0), 0.5, 1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_separates_slots() {
        let pos = Vec3::new(1.0, 0.0, 1.0);
        let a = BladeId::from_parts(0, pos, 0.5, 1.0);
        let b = BladeId::from_parts(1, pos, 0.5, 1.0);
        assert_ne!(a, b);
        assert_eq!(a.cell_slot(), 0);
        assert_eq!(b.cell_slot(), 1);
    }

    #[test]
    fn test_identity_hash_usable_as_map_key() {
        use std::collections::HashMap;

        let mut cuts = HashMap::new();
        let key = BladeId::from_parts(2, Vec3::new(5.0, 0.0, -2.0), 0.9, 3.0);
        cuts.insert(key, CUT_FULL);

        let again = BladeId::from_parts(2, Vec3::new(5.0, 0.0, -2.0), 0.9, 3.0);
        assert_eq!(cuts.get(&again), Some(&CUT_FULL));
    }
}
