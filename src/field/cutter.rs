//! Movement-gated blade cutting.
//!
//! The engine watches viewer positions and fires a GPU cut dispatch whenever
//! the viewer has moved further than the cut distance since the last cut.
//! Cut results live only in the blade buffer; nothing here reads them back.

use glam::Vec3;

use crate::core::config::FieldConfig;
use crate::core::events::{BladeCutEvent, EventBus};
use crate::core::session::SessionState;
use crate::render::buffers::FieldBuffers;
use crate::render::pipeline::cut::CutPipeline;

pub struct CutEngine {
    /// None when pipeline creation failed or the engine runs headless.
    pipeline: Option<CutPipeline>,
    enabled: bool,
    cut_radius: f32,
    cut_distance: f32,
    /// Density used for the estimated-blades figure on cut events.
    blades_per_area: f32,
    last_cut_position: Vec3,
    session: SessionState,
}

impl CutEngine {
    /// Build the engine with its compute pipeline. A pipeline failure is a
    /// setup problem, not a frame problem: it is logged once and the engine
    /// stays permanently inert.
    pub fn new(device: &wgpu::Device, config: &FieldConfig) -> Self {
        let pipeline = match CutPipeline::new(device) {
            Ok(p) => Some(p),
            Err(e) => {
                log::error!("cut pipeline unavailable, cutting disabled: {}", e);
                None
            }
        };
        Self::with_pipeline(pipeline, config)
    }

    /// Engine without a pipeline, for hosts that only need the gating logic.
    pub fn headless(config: &FieldConfig) -> Self {
        Self::with_pipeline(None, config)
    }

    fn with_pipeline(pipeline: Option<CutPipeline>, config: &FieldConfig) -> Self {
        Self {
            pipeline,
            enabled: true,
            cut_radius: config.cut_radius,
            cut_distance: config.cut_distance,
            blades_per_area: config.blades_per_area(),
            last_cut_position: Vec3::ZERO,
            session: SessionState::default(),
        }
    }

    /// Gate a viewer position against the cut distance. Returns the cut
    /// center when a cut should fire and advances the anchor point. The
    /// anchor moves whether or not the dispatch that follows succeeds.
    pub fn register_movement(&mut self, position: Vec3) -> Option<Vec3> {
        if !self.can_cut() {
            return None;
        }
        if position.distance(self.last_cut_position) > self.cut_distance {
            self.last_cut_position = position;
            return Some(position);
        }
        None
    }

    /// Viewer moved. Fires a cut dispatch and publishes the cut event when
    /// the gate opens; otherwise does nothing.
    pub fn on_position_update(
        &mut self,
        position: Vec3,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        buffers: Option<&FieldBuffers>,
        bus: &EventBus,
    ) {
        if let Some(center) = self.register_movement(position) {
            self.cut_at(center, device, queue, buffers, bus);
        }
    }

    fn cut_at(
        &self,
        center: Vec3,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        buffers: Option<&FieldBuffers>,
        bus: &EventBus,
    ) {
        let Some(pipeline) = self.pipeline.as_ref() else {
            log::debug!("cut skipped, no pipeline");
            return;
        };
        let Some(buffers) = buffers else {
            log::warn!("cut skipped, no blade buffers resident");
            return;
        };
        if buffers.blade_count() == 0 {
            log::warn!("cut skipped, blade buffer is empty");
            return;
        }

        pipeline.dispatch(device, queue, buffers, center, self.cut_radius);

        // Area estimate only; the exact count never leaves the GPU.
        let estimated = (std::f32::consts::PI * self.cut_radius * self.cut_radius
            * self.blades_per_area)
            .round() as u32;
        bus.publish(&BladeCutEvent {
            position: center,
            radius: self.cut_radius,
            estimated_blades: estimated,
        });
    }

    pub fn set_cut_radius(&mut self, radius: f32) {
        self.cut_radius = radius.max(0.1);
    }

    pub fn cut_radius(&self) -> f32 {
        self.cut_radius
    }

    pub fn set_cut_distance(&mut self, distance: f32) {
        self.cut_distance = distance.max(0.1);
    }

    pub fn cut_distance(&self) -> f32 {
        self.cut_distance
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_session(&mut self, session: SessionState) {
        self.session = session;
    }

    /// True when cutting is enabled and the session allows it. The pipeline
    /// is not consulted; gating runs the same headless.
    pub fn can_cut(&self) -> bool {
        self.enabled && self.session.allows_cutting()
    }

    pub fn last_cut_position(&self) -> Vec3 {
        self.last_cut_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CutEngine {
        CutEngine::headless(&FieldConfig::default())
    }

    #[test]
    fn test_gate_stays_closed_within_cut_distance() {
        let mut engine = engine();
        // Default cut distance is 0.5
        assert_eq!(engine.register_movement(Vec3::ZERO), None);
        assert_eq!(engine.register_movement(Vec3::new(0.25, 0.0, 0.0)), None);
    }

    #[test]
    fn test_gate_opens_past_cut_distance() {
        let mut engine = engine();
        let target = Vec3::new(0.55, 0.0, 0.0);
        assert_eq!(engine.register_movement(target), Some(target));
        assert_eq!(engine.last_cut_position(), target);

        // Anchor advanced, small follow-up motion gates again
        assert_eq!(engine.register_movement(Vec3::new(0.7, 0.0, 0.0)), None);
    }

    #[test]
    fn test_gate_accumulates_from_last_cut() {
        let mut engine = engine();
        assert_eq!(engine.register_movement(Vec3::new(0.3, 0.0, 0.0)), None);
        // 0.6 from origin, which is still the anchor
        let target = Vec3::new(0.6, 0.0, 0.0);
        assert_eq!(engine.register_movement(target), Some(target));
    }

    #[test]
    fn test_disabled_engine_never_cuts() {
        let mut engine = engine();
        engine.set_enabled(false);
        assert_eq!(engine.register_movement(Vec3::new(10.0, 0.0, 0.0)), None);
        assert!(!engine.can_cut());
    }

    #[test]
    fn test_paused_session_blocks_cutting() {
        let mut engine = engine();
        engine.set_session(SessionState::Paused);
        assert_eq!(engine.register_movement(Vec3::new(10.0, 0.0, 0.0)), None);

        engine.set_session(SessionState::Playing);
        let target = Vec3::new(10.0, 0.0, 0.0);
        assert_eq!(engine.register_movement(target), Some(target));
    }

    #[test]
    fn test_setters_floor_at_minimum() {
        let mut engine = engine();
        engine.set_cut_radius(0.0);
        assert_eq!(engine.cut_radius(), 0.1);
        engine.set_cut_distance(-3.0);
        assert_eq!(engine.cut_distance(), 0.1);

        engine.set_cut_radius(2.5);
        assert_eq!(engine.cut_radius(), 2.5);
    }
}
