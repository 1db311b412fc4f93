use crate::math::{Point, Real, Vector, DIM};

/// An Axis Aligned Bounding Box.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// The minimum of the Aabb along each coordinate axis.
    pub mins: Point<Real>,
    /// The maximum of the Aabb along each coordinate axis.
    pub maxs: Point<Real>,
}

impl Aabb {
    /// Creates a new Aabb.
    ///
    /// `mins` must be smaller than `maxs` element-wise.
    #[inline]
    pub fn new(mins: Point<Real>, maxs: Point<Real>) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Creates an invalid Aabb with `mins` components set to `Real::MAX` and `maxs` components set
    /// to `-Real::MAX`.
    ///
    /// This is often used as the initial value of some Aabb merging algorithms.
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::repeat(Real::MAX).into(),
            Vector::repeat(-Real::MAX).into(),
        )
    }

    /// Computes the Aabb of a set of points.
    pub fn from_points<'a, I>(pts: I) -> Self
    where
        I: IntoIterator<Item = &'a Point<Real>>,
    {
        let mut result = Aabb::new_invalid();

        for pt in pts {
            result.take_point(*pt);
        }

        result
    }

    /// The center of this Aabb.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    /// The half extents of this Aabb.
    #[inline]
    pub fn half_extents(&self) -> Vector<Real> {
        (self.maxs - self.mins) * 0.5
    }

    /// The extents of this Aabb.
    #[inline]
    pub fn extents(&self) -> Vector<Real> {
        self.maxs - self.mins
    }

    /// The length of this Aabb's diagonal.
    ///
    /// Geometric tolerances throughout this crate are expressed relative to
    /// this length, which makes the fracture algorithms scale-invariant.
    #[inline]
    pub fn diagonal_length(&self) -> Real {
        self.extents().norm()
    }

    /// The volume of this Aabb.
    #[inline]
    pub fn volume(&self) -> Real {
        let extents = self.extents();
        extents.x * extents.y * extents.z
    }

    /// Enlarges this Aabb so it also contains the point `pt`.
    #[inline]
    pub fn take_point(&mut self, pt: Point<Real>) {
        self.mins = self.mins.coords.inf(&pt.coords).into();
        self.maxs = self.maxs.coords.sup(&pt.coords).into();
    }

    /// Returns an Aabb with the same center as `self`, with its extents grown
    /// by `amount` on each side.
    #[inline]
    pub fn loosened(&self, amount: Real) -> Aabb {
        Aabb {
            mins: self.mins - Vector::repeat(amount),
            maxs: self.maxs + Vector::repeat(amount),
        }
    }

    /// The smallest Aabb containing both `self` and `other`.
    #[inline]
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.coords.inf(&other.mins.coords).into(),
            maxs: self.maxs.coords.sup(&other.maxs.coords).into(),
        }
    }

    /// Checks whether `self` and `other` intersect.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        for i in 0..DIM {
            if self.mins[i] > other.maxs[i] || other.mins[i] > self.maxs[i] {
                return false;
            }
        }
        true
    }

    /// Checks whether `point` lies inside of this Aabb.
    #[inline]
    pub fn contains_local_point(&self, point: &Point<Real>) -> bool {
        for i in 0..DIM {
            if point[i] < self.mins[i] || point[i] > self.maxs[i] {
                return false;
            }
        }
        true
    }

    /// Checks whether `other` is fully contained in `self`, within `epsilon`.
    #[inline]
    pub fn contains(&self, other: &Aabb, epsilon: Real) -> bool {
        for i in 0..DIM {
            if other.mins[i] < self.mins[i] - epsilon || other.maxs[i] > self.maxs[i] + epsilon {
                return false;
            }
        }
        true
    }
}
