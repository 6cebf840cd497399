use crate::conventions::AxesConvention;
use crate::transform::BodyTransform;
use crate::{Matrix3, Point3, Vector3};
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Two markers of a triple closer than this (in frame units) count as coincident.
const MIN_MARKER_SEPARATION: f64 = 1e-6;

/// A triple is collinear when the sine of the angle at marker A drops below this.
const COLLINEARITY_FLOOR: f64 = 1e-6;

/// What went wrong in a [`PoseSolver`] operation.
///
/// Geometry errors are fully recoverable by supplying new, valid points; the solver never
/// retries on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolverError {
    /// The reference triple was degenerate (coincident or collinear markers), or no valid
    /// reference triple has been supplied yet.
    InvalidReferencePoints,
    /// The live triple was degenerate, or no valid live triple has been supplied yet.
    InvalidPoints,
    /// A rotation block did not decompose under the requested axes convention (non-finite
    /// entries or not a pure rotation).
    InvalidAxesConvention,
}

impl Display for SolverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReferencePoints => write!(f, "invalid reference points"),
            Self::InvalidPoints => write!(f, "invalid points"),
            Self::InvalidAxesConvention => write!(f, "invalid axes convention"),
        }
    }
}

impl std::error::Error for SolverError {}

/// An orthonormal frame derived from a marker triple: columns of `axes` are the basis vectors,
/// `anchor` is marker A.
#[derive(Clone, Copy, Debug)]
struct Basis {
    axes: Matrix3,
    anchor: Vector3,
}

/// The cached reference frame plus the pairwise marker distances it was validated with.
#[derive(Clone, Copy, Debug)]
struct ReferenceBasis {
    basis: Basis,
    dist_ab: f64,
    dist_ac: f64,
    dist_bc: f64,
}

/// Builds the orthonormal basis anchored at `a`: X along `b - a`, Z along `(b - a) × (c - a)`,
/// Y completing the right-handed frame. `None` if the triple is degenerate.
fn orthonormal_basis(a: Point3, b: Point3, c: Point3) -> Option<Basis> {
    let ab = b - a;
    let ac = c - a;
    let bc = c - b;
    if ab.norm() < MIN_MARKER_SEPARATION
        || ac.norm() < MIN_MARKER_SEPARATION
        || bc.norm() < MIN_MARKER_SEPARATION
    {
        return None;
    }

    let normal = ab.cross(&ac);
    if normal.norm() < COLLINEARITY_FLOOR * ab.norm() * ac.norm() {
        return None;
    }

    let x = ab.normalize();
    let z = normal.normalize();
    let y = z.cross(&x);
    Some(Basis {
        axes: Matrix3::from_columns(&[x, y, z]),
        anchor: a.coords,
    })
}

/// Reconstructs a rigid 6-DOF pose from two matched triples of marker positions.
///
/// The solver is configured once with three *reference* points (where the markers sit on the
/// body, in the capture frame, in some canonical attitude) and then fed the three *currently
/// observed* positions every cycle. Marker roles are fixed: the first argument is always
/// physical marker A, the second B, the third C; the solver never reorders them. The derived
/// [`BodyTransform`] maps reference-basis coordinates to live-basis coordinates, i.e. it is the
/// estimated pose of the tracked body in the reference frame.
///
/// The live triangle is *not* required to be congruent to the reference triangle — only rigid
/// rotation/translation between the corresponding basis frames is assumed, so a badly-shaped
/// live triple still yields a (possibly noisy but defined) pose as long as it is non-degenerate.
///
/// Every fallible operation returns a `Result` and also records the error for later retrieval
/// via [`PoseSolver::last_error`]; errors are permanent until the offending input is replaced.
#[derive(Clone, Debug)]
pub struct PoseSolver {
    convention: AxesConvention,
    reference: Option<ReferenceBasis>,
    live: Option<Basis>,
    last_error: Option<SolverError>,
}

impl PoseSolver {
    /// Creates a solver for marker coordinates expressed in the given axes convention.
    ///
    /// Produced transforms carry this convention tag; re-express them with
    /// [`BodyTransform::to_convention`] as needed (the autopilot steers in NED).
    #[must_use]
    pub fn new(convention: AxesConvention) -> Self {
        Self {
            convention,
            reference: None,
            live: None,
            last_error: None,
        }
    }

    /// The convention the capture frame (and thus every produced transform) is expressed in.
    #[must_use]
    pub fn convention(&self) -> AxesConvention {
        self.convention
    }

    /// The most recent error, if any operation has failed. Sticky: it stays observable across
    /// further calls until the offending input is successfully replaced (or, for solve
    /// failures, until a solve succeeds); it is never cleared by unrelated successes.
    #[must_use]
    pub fn last_error(&self) -> Option<SolverError> {
        self.last_error
    }

    /// Whether a valid reference basis is currently cached.
    #[must_use]
    pub fn reference_points_valid(&self) -> bool {
        self.reference.is_some()
    }

    /// The pairwise distances `(|AB|, |AC|, |BC|)` of the cached reference triple, for rig
    /// sanity displays.
    #[must_use]
    pub fn reference_distances(&self) -> Option<(f64, f64, f64)> {
        self.reference
            .as_ref()
            .map(|r| (r.dist_ab, r.dist_ac, r.dist_bc))
    }

    /// Caches the reference basis built from the three reference marker positions.
    ///
    /// Rejects the triple (with [`SolverError::InvalidReferencePoints`], clearing any previously
    /// cached reference) if any two markers are closer than a numeric floor or the three are
    /// collinear within tolerance. On success the basis persists across any number of
    /// [`set_points`](PoseSolver::set_points) calls, until reference points are set again.
    pub fn set_reference_points(
        &mut self,
        a: Point3,
        b: Point3,
        c: Point3,
    ) -> Result<(), SolverError> {
        match orthonormal_basis(a, b, c) {
            Some(basis) => {
                self.reference = Some(ReferenceBasis {
                    basis,
                    dist_ab: (b - a).norm(),
                    dist_ac: (c - a).norm(),
                    dist_bc: (c - b).norm(),
                });
                if self.last_error == Some(SolverError::InvalidReferencePoints) {
                    self.last_error = None;
                }
                Ok(())
            }
            None => {
                self.reference = None;
                self.last_error = Some(SolverError::InvalidReferencePoints);
                Err(SolverError::InvalidReferencePoints)
            }
        }
    }

    /// Caches the live basis built from the three currently observed marker positions, using
    /// the identical construction as the reference basis.
    ///
    /// Fails with [`SolverError::InvalidPoints`] (clearing any previous live basis) if the live
    /// triple itself is degenerate; congruence with the reference triangle is not checked.
    pub fn set_points(&mut self, a: Point3, b: Point3, c: Point3) -> Result<(), SolverError> {
        match orthonormal_basis(a, b, c) {
            Some(basis) => {
                self.live = Some(basis);
                if self.last_error == Some(SolverError::InvalidPoints) {
                    self.last_error = None;
                }
                Ok(())
            }
            None => {
                self.live = None;
                self.last_error = Some(SolverError::InvalidPoints);
                Err(SolverError::InvalidPoints)
            }
        }
    }

    /// Derives the rigid transform from the cached reference basis to the last live basis.
    ///
    /// Rotation is `live · referenceᵀ` (both bases are orthonormal, so the inverse is the
    /// transpose); translation is chosen so that reference marker A maps exactly onto live
    /// marker A. Fails with [`SolverError::InvalidReferencePoints`] if no valid reference basis
    /// is cached, or [`SolverError::InvalidPoints`] if no valid live basis is.
    pub fn transform_matrix(&mut self) -> Result<BodyTransform, SolverError> {
        self.solve().map(|(transform, _)| transform)
    }

    /// Like [`transform_matrix`](PoseSolver::transform_matrix), but also returns the raw
    /// live-basis orientation alone (origin-centered), useful for visualizing the unrotated
    /// basis independent of translation.
    pub fn transform_matrix_with_debug(
        &mut self,
    ) -> Result<(BodyTransform, BodyTransform), SolverError> {
        self.solve()
    }

    fn solve(&mut self) -> Result<(BodyTransform, BodyTransform), SolverError> {
        let Some(reference) = self.reference else {
            self.last_error = Some(SolverError::InvalidReferencePoints);
            return Err(SolverError::InvalidReferencePoints);
        };
        let Some(live) = self.live else {
            self.last_error = Some(SolverError::InvalidPoints);
            return Err(SolverError::InvalidPoints);
        };

        self.last_error = None;
        let rotation = live.axes * reference.basis.axes.transpose();
        let translation = live.anchor - rotation * reference.basis.anchor;

        let transform = BodyTransform::from_parts(rotation, translation, self.convention);
        let orientation_debug =
            BodyTransform::from_parts(live.axes, Vector3::zeros(), self.convention);
        Ok((transform, orientation_debug))
    }
}

impl Default for PoseSolver {
    /// A solver for the East-Up-South capture frame most optical rigs report.
    fn default() -> Self {
        Self::new(AxesConvention::Eus)
    }
}
