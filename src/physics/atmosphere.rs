// ---------------------------------------------------------------------------
// Exponential body atmosphere (reference simulation only)
// ---------------------------------------------------------------------------

/// Isothermal exponential atmosphere that ends at `depth`.
#[derive(Debug, Clone, Copy)]
pub struct Atmosphere {
    pub depth: f64,           // m, top of atmosphere
    pub surface_density: f64, // kg/m^3
    pub scale_height: f64,    // m
}

impl Atmosphere {
    /// Density at a geometric altitude. Negative altitudes clamp to the
    /// surface; above `depth` the atmosphere is vacuum.
    pub fn density(&self, altitude: f64) -> f64 {
        let h = altitude.max(0.0);
        if h >= self.depth {
            return 0.0;
        }
        self.surface_density * (-h / self.scale_height).exp()
    }

    /// Dynamic pressure q = 1/2 rho v^2, Pa.
    pub fn dynamic_pressure(&self, altitude: f64, speed: f64) -> f64 {
        0.5 * self.density(altitude) * speed * speed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
