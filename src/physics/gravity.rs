use nalgebra::Vector3;

use super::atmosphere::Atmosphere;

/// Standard gravity, used to convert GeeASL into m/s^2.
pub const G0: f64 = 9.80665;

/// A celestial body the vessel is launching from.
#[derive(Debug, Clone)]
pub struct CelestialBody {
    pub name: String,
    pub mu: f64,                // gravitational parameter, m^3/s^2
    pub radius: f64,            // equatorial radius, m
    pub gee_asl: f64,           // surface gravity in multiples of G0
    pub rotation_period: f64,   // sidereal rotation period, s (0 = not rotating)
    pub max_terrain_height: f64,
    pub atmosphere: Option<Atmosphere>,
}

impl CelestialBody {
    pub fn has_atmosphere(&self) -> bool {
        self.atmosphere.is_some()
    }

    /// Top of the atmosphere, or 0 for airless bodies.
    pub fn atmosphere_depth(&self) -> f64 {
        self.atmosphere.as_ref().map_or(0.0, |a| a.depth)
    }

    /// Lowest altitude at which an orbit neither re-enters the atmosphere
    /// nor clips terrain.
    pub fn stable_orbit_height(&self) -> f64 {
        self.atmosphere_depth().max(self.max_terrain_height)
    }

    /// Rotational surface speed at the equator, m/s.
    pub fn equatorial_surface_speed(&self) -> f64 {
        if self.rotation_period > 0.0 {
            2.0 * std::f64::consts::PI * self.radius / self.rotation_period
        } else {
            0.0
        }
    }

    /// Start-speed scale used by the settings heuristic:
    /// GeeASL*10 rounded to one decimal (Kerbin = 10.0).
    pub fn base_gravity_factor(&self) -> f64 {
        (self.gee_asl * 100.0).round() / 10.0
    }

    /// Inverse-square gravitational acceleration at a position relative to
    /// the body centre.
    pub fn gravity_accel(&self, pos: &Vector3<f64>) -> Vector3<f64> {
        let r = pos.norm();
        if r < 1.0 {
            return Vector3::zeros();
        }
        -self.mu / (r * r * r) * pos
    }
}

pub mod presets {
    use super::*;

    pub fn kerbin() -> CelestialBody {
        CelestialBody {
            name: "Kerbin".into(),
            mu: 3.5316e12,
            radius: 600_000.0,
            gee_asl: 1.0,
            rotation_period: 21_549.425,
            max_terrain_height: 6_767.0,
            atmosphere: Some(Atmosphere {
                depth: 70_000.0,
                surface_density: 1.225,
                scale_height: 5_600.0,
            }),
        }
    }

    pub fn mun() -> CelestialBody {
        CelestialBody {
            name: "Mun".into(),
            mu: 6.5138398e10,
            radius: 200_000.0,
            gee_asl: 0.166_3,
            rotation_period: 138_984.38,
            max_terrain_height: 7_061.0,
            atmosphere: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kerbin_stable_orbit_is_atmosphere_top() {
        let k = presets::kerbin();
        assert!((k.stable_orbit_height() - 70_000.0).abs() < 1e-9);
        assert!((k.base_gravity_factor() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn airless_body_uses_terrain() {
        let m = presets::mun();
        assert!(!m.has_atmosphere());
        assert_eq!(m.atmosphere_depth(), 0.0);
        assert!((m.stable_orbit_height() - 7_061.0).abs() < 1e-9);
        // 0.1663 * 100 = 16.63 -> 17 -> 1.7
        assert!((m.base_gravity_factor() - 1.7).abs() < 1e-9);
    }

    #[test]
    fn surface_gravity_matches_gee_asl() {
        let k = presets::kerbin();
        let g = k.gravity_accel(&Vector3::new(k.radius, 0.0, 0.0));
        assert!((g.norm() - 9.81).abs() < 0.01, "got {}", g.norm());
        assert!(g.x < 0.0);
    }
}
