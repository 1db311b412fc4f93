use crate::math::Real;

/// A small deterministic random source.
///
/// Fracture operations must reproduce identical plane/site sequences for
/// identical `(mesh, descriptor, seed)` inputs, so all of the planner's
/// randomness is drawn from this PCG stream, seeded once per operation and
/// consumed in a stable order.
#[derive(Clone)]
pub struct SeededRng(oorandom::Rand32);

impl SeededRng {
    /// Initializes the stream from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        SeededRng(oorandom::Rand32::new(seed))
    }

    /// A uniform sample from `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> Real {
        self.0.rand_float() as Real
    }

    /// A uniform sample from `[-1, 1)`.
    #[inline]
    pub fn symmetric_unit(&mut self) -> Real {
        self.unit() * 2.0 - 1.0
    }

    /// A uniform sample from `[a, b)`.
    #[inline]
    pub fn range(&mut self, a: Real, b: Real) -> Real {
        a + self.unit() * (b - a)
    }

    /// A uniform integer from `0..n`.
    #[inline]
    pub fn index(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        self.0.rand_range(0..n as u32) as usize
    }
}
