//! Flight data derived from a published frame, for the on-screen overlay.
//!
//! Angles are in degrees, everything else in SI units.

use aerosync_core::math::{body_to_fixed, quat_to_euler};
use aerosync_core::{ControlSettings, StateFrame};

/// Equatorial circumference of the earth, m.
const EQUATORIAL_CIRCUMFERENCE: f64 = 40_075_016.8;

/// Meridional circumference of the earth, m.
const MERIDIONAL_CIRCUMFERENCE: f64 = 40_007_863.9;

/// Values shown by the flight-data overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlightData {
    /// Render frame time, s.
    pub graphics_dt: f64,
    /// Physics step of the frame, s.
    pub physics_dt: f64,
    /// Airspeed, m/s.
    pub airspeed: f64,
    /// Angle of attack.
    pub angle_of_attack: f64,
    /// Sideslip.
    pub sideslip: f64,
    /// Altitude above ground, m.
    pub altitude: f64,
    /// Latitude from north displacement.
    pub latitude: f64,
    /// Longitude from east displacement.
    pub longitude: f64,
    /// Physics time, s.
    pub time: f64,
    /// Bank angle.
    pub bank: f64,
    /// Elevation angle.
    pub elevation: f64,
    /// Heading.
    pub heading: f64,
    /// Horizontal inertial speed, m/s.
    pub ground_speed: f64,
    /// Direction of horizontal motion.
    pub ground_track: f64,
    /// Climb rate, m/s.
    pub climb_rate: f64,
    /// Control-surface settings.
    pub controls: ControlSettings,
    /// Roll rate.
    pub roll_rate: f64,
    /// Pitch rate.
    pub pitch_rate: f64,
    /// Yaw rate.
    pub yaw_rate: f64,
}

impl FlightData {
    /// Derives overlay values from `frame`.
    #[must_use]
    pub fn from_frame(frame: &StateFrame, graphics_dt: f64, controls: ControlSettings) -> Self {
        let s = &frame.state;
        let e = s.quaternion();
        let [bank, elevation, heading] = quat_to_euler(e).map(f64::to_degrees);
        let [vn, ve, vd] = body_to_fixed(s.velocity(), e);

        Self {
            graphics_dt,
            physics_dt: frame.dt_physics,
            airspeed: s.airspeed(),
            angle_of_attack: s.w.atan2(s.u).to_degrees(),
            sideslip: s.v.atan2(s.u).to_degrees(),
            altitude: -s.z,
            latitude: s.x / EQUATORIAL_CIRCUMFERENCE * 360.0,
            longitude: s.y / MERIDIONAL_CIRCUMFERENCE * 360.0,
            time: frame.t_physics,
            bank,
            elevation,
            heading,
            ground_speed: vn.hypot(ve),
            ground_track: ve.atan2(vn).to_degrees(),
            climb_rate: -vd,
            controls,
            roll_rate: s.p.to_degrees(),
            pitch_rate: s.q.to_degrees(),
            yaw_rate: s.r.to_degrees(),
        }
    }

    /// True when the airspeed cannot be shown (physics produced NaN).
    #[inline]
    #[must_use]
    pub fn has_physics_error(&self) -> bool {
        self.airspeed.is_nan()
    }
}
