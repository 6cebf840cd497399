use crate::conventions::AxesConvention;
use crate::solver::SolverError;
use crate::{Matrix3, Point3, Vector3};
use uom::si::angle::radian;
use uom::si::f64::Angle;

#[cfg(any(feature = "approx", test))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How far past ±1 the pitch `asin` operand may stray before the rotation block is considered
/// not decomposable (anything closer is floating rounding and gets clamped).
const DECOMPOSITION_TOLERANCE: f64 = 1e-6;

/// The rigid pose of the tracked body in the reference frame: an orthonormal 3×3 rotation block
/// plus a 3-D translation.
///
/// A transform is tagged with the [`AxesConvention`] its components are expressed in, so angle
/// extraction always knows which axis is "down" and in which order to peel off yaw, pitch, and
/// roll. Use [`BodyTransform::to_convention`] to re-express it; the permutation/sign mapping is
/// exact, so converting there and back reproduces the transform bit-for-bit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyTransform {
    rotation: Matrix3,
    translation: Vector3,
    convention: AxesConvention,
}

impl BodyTransform {
    pub(crate) fn from_parts(
        rotation: Matrix3,
        translation: Vector3,
        convention: AxesConvention,
    ) -> Self {
        Self {
            rotation,
            translation,
            convention,
        }
    }

    /// The identity pose (aligned with the frame axes, at the frame origin) in `convention`.
    #[must_use]
    pub fn identity(convention: AxesConvention) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
            convention,
        }
    }

    /// The orthonormal rotation block; its columns are the body axes expressed in the reference
    /// frame.
    #[must_use]
    pub fn rotation(&self) -> &Matrix3 {
        &self.rotation
    }

    /// The position of the body origin (marker A) in the reference frame.
    #[must_use]
    pub fn translation(&self) -> Vector3 {
        self.translation
    }

    /// The axes convention this transform's components are expressed in.
    #[must_use]
    pub fn convention(&self) -> AxesConvention {
        self.convention
    }

    /// Re-expresses this transform in another axes convention.
    ///
    /// The mapping is applied to the rotation columns and the translation vector alike;
    /// `t.to_convention(b).to_convention(a)` with `a = t.convention()` is exactly `t`.
    #[must_use]
    pub fn to_convention(&self, to: AxesConvention) -> Self {
        let map = self.convention.map_to(to);
        Self {
            rotation: map.apply_rotation(&self.rotation),
            translation: map.apply_vector(&self.translation),
            convention: to,
        }
    }

    /// Maps a point given in body coordinates to reference-frame coordinates.
    #[must_use]
    pub fn transform_point(&self, point: Point3) -> Point3 {
        Point3::from(self.rotation * point.coords + self.translation)
    }

    /// Returns the intrinsic yaw, pitch, and roll of this pose, decomposed under the convention
    /// the transform is expressed in (yaw about the vertical axis first, then pitch, then roll).
    ///
    /// Near pitch ±90° the decomposition is singular: yaw and roll become correlated and only
    /// their sum (or difference) is well-defined. The operand of the inner `asin` is clamped to
    /// `[-1, 1]` to absorb floating rounding, but no other correction is attempted; callers that
    /// expect to operate near the singularity should treat yaw and roll with suspicion there.
    /// For a fallible variant that can override the convention tag, see [`yaw_pitch_roll_in`].
    #[must_use]
    pub fn yaw_pitch_roll(&self) -> (Angle, Angle, Angle) {
        let ned = self.to_convention(AxesConvention::Ned);
        extract_ned_angles(&ned.rotation)
    }
}

/// Yaw/pitch/roll from a rotation block already expressed in NED, via the standard Z-Y'-X''
/// element extraction.
fn extract_ned_angles(r: &Matrix3) -> (Angle, Angle, Angle) {
    let yaw = r[(1, 0)].atan2(r[(0, 0)]);
    let pitch = (-r[(2, 0)]).clamp(-1., 1.).asin();
    let roll = r[(2, 1)].atan2(r[(2, 2)]);
    (
        Angle::new::<radian>(yaw),
        Angle::new::<radian>(pitch),
        Angle::new::<radian>(roll),
    )
}

/// Returns yaw, pitch, and roll of `transform` decomposed as if its raw components were
/// expressed in `convention`, reporting a structured error instead of panicking.
///
/// Unlike [`BodyTransform::yaw_pitch_roll`], this *reinterprets* the transform's matrix under
/// the given convention rather than trusting the transform's own tag, for callers that receive
/// a matrix whose convention is asserted out-of-band. It fails with
/// [`SolverError::InvalidAxesConvention`] when the rotation block does not decompose under that
/// convention: non-finite entries, or a pitch operand beyond ±1 by more than rounding tolerance
/// (i.e. the block is not a pure rotation). The gimbal singularity at pitch ±90° is documented
/// on [`BodyTransform::yaw_pitch_roll`] and is deliberately not treated as an error.
pub fn yaw_pitch_roll_in(
    transform: &BodyTransform,
    convention: AxesConvention,
) -> Result<(Angle, Angle, Angle), SolverError> {
    let reinterpreted = BodyTransform {
        rotation: transform.rotation,
        translation: transform.translation,
        convention,
    };
    let ned = reinterpreted.to_convention(AxesConvention::Ned);

    let finite = ned.rotation.iter().all(|v| v.is_finite());
    if !finite || ned.rotation[(2, 0)].abs() > 1. + DECOMPOSITION_TOLERANCE {
        return Err(SolverError::InvalidAxesConvention);
    }
    Ok(extract_ned_angles(&ned.rotation))
}

#[cfg(any(feature = "approx", test))]
impl AbsDiffEq for BodyTransform {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.convention == other.convention
            && self.rotation.abs_diff_eq(&other.rotation, epsilon)
            && self.translation.abs_diff_eq(&other.translation, epsilon)
    }
}

#[cfg(any(feature = "approx", test))]
impl RelativeEq for BodyTransform {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.convention == other.convention
            && self
                .rotation
                .relative_eq(&other.rotation, epsilon, max_relative)
            && self
                .translation
                .relative_eq(&other.translation, epsilon, max_relative)
    }
}
