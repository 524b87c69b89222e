use crate::physics::CelestialBody;

use super::elements::OrbitSummary;

/// Circular orbit velocity at a given radius (not altitude).
pub fn circular_orbit_speed(body: &CelestialBody, radius: f64) -> f64 {
    (body.mu / radius).sqrt()
}

/// Prograde delta-v needed at apoapsis to circularise.
///
/// At apoapsis the velocity is purely horizontal, so the burn is the
/// difference between circular speed there and the speed we will have.
pub fn delta_v_to_circularize(body: &CelestialBody, orbit: &OrbitSummary) -> f64 {
    if !orbit.apoapsis_altitude.is_finite() {
        return 0.0;
    }
    let r_ap = body.radius + orbit.apoapsis_altitude;
    circular_orbit_speed(body, r_ap) - orbit.speed_at_apoapsis
}

/// Compass heading (deg, 0 = north, 90 = east) to launch at so the final
/// orbit reaches `inclination_deg`, accounting for the surface rotation speed
/// at the launch latitude.
///
/// `orbit_speed` is the inertial speed at which the correction is evaluated.
/// Unreachable inclinations (below the launch latitude) fall back to due east
/// or due west.
pub fn heading_for_launch_inclination(
    body: &CelestialBody,
    inclination_deg: f64,
    latitude_deg: f64,
    orbit_speed: f64,
) -> f64 {
    let cos_lat = latitude_deg.to_radians().cos();
    let cos_surface_angle = inclination_deg.to_radians().cos() / cos_lat;
    if cos_surface_angle.abs() > 1.0 {
        let inc = (inclination_deg + 180.0).rem_euclid(360.0) - 180.0;
        return if inc.abs() < 90.0 { 90.0 } else { 270.0 };
    }

    let beta = cos_surface_angle.asin();
    let surface_speed = body.equatorial_surface_speed() * cos_lat;
    let vx = orbit_speed * beta.sin() - surface_speed;
    let vy = orbit_speed * beta.cos();
    let mut heading = vx.atan2(vy).to_degrees();
    if inclination_deg < 0.0 {
        heading = 180.0 - heading;
    }
    heading.rem_euclid(360.0)
}
