use crate::fracture::NoiseParameters;
use crate::math::{Point, Real, Vector};
use crate::utils::SeededRng;

struct Mode {
    direction: Vector<Real>,
    wave_number: Real,
    phase: Real,
}

/// A procedural displacement field built by superposing sinusoidal modes in
/// random directions, with frequencies drawn from a band around the requested
/// frequency.
///
/// The field is bounded by the requested amplitude and entirely determined by
/// the random stream it was built from, so slice surfaces are reproducible.
pub struct SurfaceNoise {
    modes: Vec<Mode>,
    amplitude_per_mode: Real,
}

impl SurfaceNoise {
    /// Builds the field for a mesh of size `scale` (bounding-box diagonal).
    pub fn new(params: &NoiseParameters, scale: Real, rng: &mut SeededRng) -> Self {
        let scale = scale.max(crate::math::DEFAULT_EPSILON);
        let mode_count = params.mode_count.max(1) as usize;
        let base = params.frequency / scale;
        let mut modes = Vec::with_capacity(mode_count);

        for _ in 0..mode_count {
            // A random direction from two angles; poles are fine here since
            // the modes only need to be uncorrelated, not uniform.
            let theta = rng.range(0.0, std::f64::consts::PI as Real);
            let phi = rng.range(0.0, 2.0 * std::f64::consts::PI as Real);
            let direction = Vector::new(
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            );
            modes.push(Mode {
                direction,
                wave_number: 2.0 * std::f64::consts::PI as Real * base * rng.range(0.5, 1.5),
                phase: rng.range(0.0, 2.0 * std::f64::consts::PI as Real),
            });
        }

        SurfaceNoise {
            modes,
            amplitude_per_mode: params.amplitude * scale / mode_count as Real,
        }
    }

    /// Samples the displacement at `point`.
    pub fn sample(&self, point: &Point<Real>) -> Real {
        let mut displacement = 0.0;
        for mode in &self.modes {
            let projected = point.coords.dot(&mode.direction);
            displacement += (projected * mode.wave_number + mode.phase).sin();
        }
        displacement * self.amplitude_per_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_and_deterministic() {
        let params = NoiseParameters {
            amplitude: 0.25,
            ..Default::default()
        };
        let mut rng_a = SeededRng::new(99);
        let mut rng_b = SeededRng::new(99);
        let noise_a = SurfaceNoise::new(&params, 2.0, &mut rng_a);
        let noise_b = SurfaceNoise::new(&params, 2.0, &mut rng_b);

        for i in 0..32 {
            let pt = Point::new(i as Real * 0.1, -(i as Real) * 0.05, 0.3);
            let sample = noise_a.sample(&pt);
            assert_eq!(sample, noise_b.sample(&pt));
            assert!(sample.abs() <= 0.25 * 2.0 + 1.0e-5);
        }
    }
}
