use crate::math::{Point, Real, UnitVector, Vector};
use crate::utils;

/// The side of a plane a point lies on, within tolerance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaneSide {
    /// The point lies on the half-space the plane normal points into.
    Front,
    /// The point lies on the half-space opposite to the plane normal.
    Back,
    /// The point lies on the plane, within the classification tolerance.
    On,
}

/// A splitting plane `{ p | normal · p = bias }`.
///
/// Fracture noise perturbs vertices off their original planes, so point
/// classification is never exact: it takes an explicit linear tolerance,
/// generally derived from the mesh bounding-box diagonal (see
/// [`crate::csg::Tolerances`]).
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Plane {
    /// The plane's unit normal.
    pub normal: UnitVector<Real>,
    /// The plane's offset along its normal.
    pub bias: Real,
}

impl Plane {
    /// Creates a plane from its unit normal and offset.
    pub fn new(normal: UnitVector<Real>, bias: Real) -> Self {
        Plane { normal, bias }
    }

    /// Creates the plane containing `point` with the given unit normal.
    pub fn from_point_and_normal(point: &Point<Real>, normal: UnitVector<Real>) -> Self {
        Plane {
            normal,
            bias: point.coords.dot(&normal),
        }
    }

    /// Creates the supporting plane of a counter-clock-wise triangle.
    ///
    /// Returns `None` if the triangle is degenerate.
    pub fn from_triangle(a: &Point<Real>, b: &Point<Real>, c: &Point<Real>) -> Option<Self> {
        let normal = utils::ccw_face_normal([a, b, c])?;
        Some(Plane {
            normal,
            bias: a.coords.dot(&normal),
        })
    }

    /// The perpendicular bisector plane of the segment `[a, b]`, with its
    /// normal pointing from `a` toward `b`.
    pub fn bisector(a: &Point<Real>, b: &Point<Real>) -> Option<Self> {
        let normal = UnitVector::try_new(b - a, crate::math::DEFAULT_EPSILON)?;
        let mid = na::center(a, b);
        Some(Plane::from_point_and_normal(&mid, normal))
    }

    /// The signed distance from `point` to this plane.
    ///
    /// Positive on the front side (the side the normal points into).
    #[inline]
    pub fn signed_distance(&self, point: &Point<Real>) -> Real {
        point.coords.dot(&self.normal) - self.bias
    }

    /// Classifies `point` against this plane with the given linear tolerance.
    #[inline]
    pub fn classify(&self, point: &Point<Real>, tolerance: Real) -> PlaneSide {
        let dist = self.signed_distance(point);
        if dist > tolerance {
            PlaneSide::Front
        } else if dist < -tolerance {
            PlaneSide::Back
        } else {
            PlaneSide::On
        }
    }

    /// This plane with its orientation reversed.
    #[inline]
    pub fn flipped(&self) -> Plane {
        Plane {
            normal: UnitVector::new_unchecked(-self.normal.into_inner()),
            bias: -self.bias,
        }
    }

    /// This plane translated by `shift` along its normal.
    #[inline]
    pub fn shifted(&self, shift: Real) -> Plane {
        Plane {
            normal: self.normal,
            bias: self.bias + shift,
        }
    }

    /// The projection of `point` onto this plane.
    #[inline]
    pub fn project_point(&self, point: &Point<Real>) -> Point<Real> {
        point - *self.normal * self.signed_distance(point)
    }

    /// Two unit vectors spanning this plane.
    pub fn basis(&self) -> [Vector<Real>; 2] {
        let n = self.normal.into_inner();
        let tangent = if n.x.abs() > n.y.abs() {
            Vector::new(-n.z, 0.0, n.x) / (n.x * n.x + n.z * n.z).sqrt()
        } else {
            Vector::new(0.0, n.z, -n.y) / (n.y * n.y + n.z * n.z).sqrt()
        };
        [tangent, n.cross(&tangent)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;

    #[test]
    fn classification_uses_tolerance() {
        let plane = Plane::new(UnitVector::new_normalize(Vector::z()), 1.0);
        assert_eq!(
            plane.classify(&Point::new(0.0, 0.0, 1.0 + 1.0e-6), 1.0e-5),
            PlaneSide::On
        );
        assert_eq!(
            plane.classify(&Point::new(0.0, 0.0, 2.0), 1.0e-5),
            PlaneSide::Front
        );
        assert_eq!(
            plane.classify(&Point::new(0.0, 0.0, 0.0), 1.0e-5),
            PlaneSide::Back
        );
    }

    #[test]
    fn bisector_is_equidistant() {
        let a = Point::new(1.0, 2.0, 3.0);
        let b = Point::new(-2.0, 0.5, 1.0);
        let plane = Plane::bisector(&a, &b).unwrap();
        assert_relative_eq!(
            plane.signed_distance(&a),
            -plane.signed_distance(&b),
            epsilon = 1.0e-5
        );
    }
}
