//! Globe auto-rotation as a pure state machine.
//!
//! The map controller feeds it three inputs (`start`, `stop`, `on_settle`) and
//! performs whatever [`RotationStep`] comes back as one linear pan. The next step
//! is only requested from the renderer's `moveend` event, so a slow frame simply
//! delays the following pan instead of stacking them.

/// One full turn per minute.
pub(crate) const DEGREES_PER_SECOND: f64 = 360.0 / 60.0;
/// Rotation pauses at or above this zoom while running.
pub(crate) const MAX_SPIN_ZOOM: f64 = 5.0;
pub(crate) const RUNNING_STEP_MS: u32 = 1_000;
pub(crate) const EASE_STEP_MS: u32 = 100;

const EASE_IN: [f64; 3] = [0.2, 0.6, 1.0];
const EASE_OUT: [f64; 3] = [0.8, 0.4, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RotationState {
    Off,
    EasingIn,
    Running,
    EasingOut,
}

/// A linear pan of the camera center by `delta_longitude` degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RotationStep {
    pub delta_longitude: f64,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GlobeRotation {
    state: RotationState,
    ease_index: usize,
}

impl Default for GlobeRotation {
    fn default() -> Self {
        Self {
            state: RotationState::Off,
            ease_index: 0,
        }
    }
}

impl GlobeRotation {
    pub(crate) fn state(&self) -> RotationState {
        self.state
    }

    /// Rotation is wanted (the toggle shows pressed) while easing in or running.
    pub(crate) fn is_engaged(&self) -> bool {
        matches!(self.state, RotationState::EasingIn | RotationState::Running)
    }

    pub(crate) fn start(&mut self, zoom: f64) -> Option<RotationStep> {
        if self.is_engaged() {
            return None;
        }
        self.state = RotationState::EasingIn;
        self.ease_index = 0;
        self.next_step(zoom)
    }

    pub(crate) fn stop(&mut self, zoom: f64) -> Option<RotationStep> {
        if !self.is_engaged() {
            return None;
        }
        self.state = RotationState::EasingOut;
        self.ease_index = 0;
        self.next_step(zoom)
    }

    pub(crate) fn toggle(&mut self, zoom: f64) -> Option<RotationStep> {
        if self.is_engaged() {
            self.stop(zoom)
        } else {
            self.start(zoom)
        }
    }

    /// Drop straight to `Off`, for camera moves that take over the view.
    pub(crate) fn halt(&mut self) {
        self.state = RotationState::Off;
        self.ease_index = 0;
    }

    /// Called once per settled camera move.
    pub(crate) fn on_settle(&mut self, zoom: f64) -> Option<RotationStep> {
        if self.state == RotationState::Off {
            return None;
        }
        self.next_step(zoom)
    }

    fn multiplier(&self) -> f64 {
        match self.state {
            RotationState::EasingIn => EASE_IN[self.ease_index.min(EASE_IN.len() - 1)],
            RotationState::EasingOut => EASE_OUT[self.ease_index.min(EASE_OUT.len() - 1)],
            RotationState::Running => 1.0,
            RotationState::Off => 0.0,
        }
    }

    fn next_step(&mut self, zoom: f64) -> Option<RotationStep> {
        // Easing out ignores the zoom pause so it always reaches `Off`.
        if zoom >= MAX_SPIN_ZOOM && self.state != RotationState::EasingOut {
            return None;
        }

        let multiplier = self.multiplier();
        if self.state == RotationState::EasingOut && multiplier <= 0.0 {
            self.state = RotationState::Off;
            self.ease_index = 0;
            return None;
        }

        let duration_ms = match self.state {
            RotationState::EasingIn | RotationState::EasingOut => EASE_STEP_MS,
            _ => RUNNING_STEP_MS,
        };
        let delta_longitude = -DEGREES_PER_SECOND * multiplier * f64::from(duration_ms) / 1000.0;

        match self.state {
            RotationState::EasingIn => {
                self.ease_index += 1;
                if self.ease_index >= EASE_IN.len() {
                    self.state = RotationState::Running;
                    self.ease_index = 0;
                }
            }
            RotationState::EasingOut => self.ease_index += 1,
            _ => {}
        }

        Some(RotationStep {
            delta_longitude,
            duration_ms,
        })
    }
}

/// Wrap a longitude back into `[-180, 180)`.
pub(crate) fn wrap_longitude(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn eases_in_then_runs_at_six_degrees_per_second() {
        let mut rotation = GlobeRotation::default();
        let first = rotation.start(1.0).expect("first ramp step");
        assert_eq!(first.duration_ms, EASE_STEP_MS);
        assert!(approx(first.delta_longitude, -0.6 * 0.2));
        assert_eq!(rotation.state(), RotationState::EasingIn);

        let second = rotation.on_settle(1.0).expect("second ramp step");
        assert!(approx(second.delta_longitude, -0.6 * 0.6));
        let third = rotation.on_settle(1.0).expect("third ramp step");
        assert!(approx(third.delta_longitude, -0.6));
        assert_eq!(rotation.state(), RotationState::Running);

        let running = rotation.on_settle(1.0).expect("running step");
        assert_eq!(running.duration_ms, RUNNING_STEP_MS);
        assert!(approx(running.delta_longitude, -6.0));
    }

    #[test]
    fn start_then_immediate_stop_still_terminates_off() {
        let mut rotation = GlobeRotation::default();
        rotation.start(1.0);
        let first = rotation.stop(1.0).expect("ramp-down step");
        assert!(approx(first.delta_longitude, -0.6 * 0.8));
        assert_eq!(rotation.state(), RotationState::EasingOut);

        rotation.on_settle(1.0).expect("0.4 step");
        assert_eq!(rotation.on_settle(1.0), None);
        assert_eq!(rotation.state(), RotationState::Off);
        assert_eq!(rotation.on_settle(1.0), None);
    }

    #[test]
    fn high_zoom_pauses_running_without_changing_state() {
        let mut rotation = GlobeRotation::default();
        rotation.start(1.0);
        rotation.on_settle(1.0);
        rotation.on_settle(1.0);
        assert_eq!(rotation.state(), RotationState::Running);

        assert_eq!(rotation.on_settle(MAX_SPIN_ZOOM), None);
        assert_eq!(rotation.state(), RotationState::Running);
        assert!(rotation.on_settle(4.9).is_some());
    }

    #[test]
    fn easing_out_ignores_zoom_pause() {
        let mut rotation = GlobeRotation::default();
        rotation.start(1.0);
        rotation.on_settle(1.0);
        rotation.on_settle(1.0);

        assert!(rotation.stop(12.0).is_some());
        assert!(rotation.on_settle(12.0).is_some());
        assert_eq!(rotation.on_settle(12.0), None);
        assert_eq!(rotation.state(), RotationState::Off);
    }

    #[test]
    fn stop_while_off_and_start_while_engaged_are_ignored() {
        let mut rotation = GlobeRotation::default();
        assert_eq!(rotation.stop(1.0), None);
        assert_eq!(rotation.state(), RotationState::Off);

        rotation.start(1.0);
        assert_eq!(rotation.start(1.0), None);
        assert_eq!(rotation.state(), RotationState::EasingIn);
    }

    #[test]
    fn toggle_flips_between_start_and_stop() {
        let mut rotation = GlobeRotation::default();
        rotation.toggle(1.0);
        assert!(rotation.is_engaged());
        rotation.toggle(1.0);
        assert_eq!(rotation.state(), RotationState::EasingOut);
        assert!(!rotation.is_engaged());
    }

    #[test]
    fn halt_skips_the_ramp_down() {
        let mut rotation = GlobeRotation::default();
        rotation.start(1.0);
        rotation.halt();
        assert_eq!(rotation.state(), RotationState::Off);
        assert_eq!(rotation.on_settle(1.0), None);
    }

    #[test]
    fn longitude_wraps_around_antimeridian() {
        assert!(approx(wrap_longitude(-183.0), 177.0));
        assert!(approx(wrap_longitude(10.0), 10.0));
        assert!(approx(wrap_longitude(180.0), -180.0));
    }
}
