use crate::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A fixed labeling of the three spatial axes of a Cartesian frame.
///
/// Conversion between any two conventions is a pure axis permutation plus per-axis sign flip,
/// applied identically to the rotation columns and the translation vector of a transform, so a
/// round trip `A → B → A` reproduces the input exactly (no numerical loss beyond floating
/// rounding, of which the mapping itself introduces none).
///
/// Both supported conventions are right-handed, so conversion always maps proper rotations to
/// proper rotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AxesConvention {
    /// North-East-Down:
    ///
    /// - Positive X is North.
    /// - Positive Y is East.
    /// - Positive Z is towards the center of the earth ("Down").
    ///
    /// The convention the autopilot steers in: yaw about Down is a compass heading.
    Ned,
    /// East-Up-South:
    ///
    /// - Positive X is East.
    /// - Positive Y is away from the center of the earth ("Up").
    /// - Positive Z is South.
    ///
    /// Common for graphics-oriented capture rigs (Y-up); the default frame of [`PoseSolver`].
    ///
    /// [`PoseSolver`]: crate::PoseSolver
    Eus,
}

/// Axis permutation + per-axis sign for one ordered convention pair:
/// `out[i] = sign[i] * in[index[i]]`.
///
/// Entries are ±1 only, which is what makes round trips exact.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AxesMap {
    index: [usize; 3],
    sign: [f64; 3],
}

const IDENTITY: AxesMap = AxesMap {
    index: [0, 1, 2],
    sign: [1., 1., 1.],
};

// (east, up, south) = (e, -d, -n)
const NED_TO_EUS: AxesMap = AxesMap {
    index: [1, 2, 0],
    sign: [1., -1., -1.],
};

// (north, east, down) = (-s, e, -u)
const EUS_TO_NED: AxesMap = AxesMap {
    index: [2, 0, 1],
    sign: [-1., 1., -1.],
};

impl AxesConvention {
    /// Returns the mapping that re-expresses components of `self` in `to`.
    ///
    /// One literal table per ordered pair; nothing is inverted or composed at call time, so the
    /// full set stays exhaustively testable.
    pub(crate) fn map_to(self, to: AxesConvention) -> AxesMap {
        use AxesConvention::{Eus, Ned};
        match (self, to) {
            (Ned, Ned) | (Eus, Eus) => IDENTITY,
            (Ned, Eus) => NED_TO_EUS,
            (Eus, Ned) => EUS_TO_NED,
        }
    }
}

impl AxesMap {
    pub(crate) fn apply_vector(&self, v: &Vector3) -> Vector3 {
        Vector3::new(
            self.sign[0] * v[self.index[0]],
            self.sign[1] * v[self.index[1]],
            self.sign[2] * v[self.index[2]],
        )
    }

    /// Conjugates a rotation block by this mapping (`M · R · Mᵀ` for the mapping matrix `M`),
    /// i.e. re-labels both the frame the rotation acts on and the frame it produces.
    pub(crate) fn apply_rotation(&self, r: &Matrix3) -> Matrix3 {
        let mut out = Matrix3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                out[(i, j)] = self.sign[i] * self.sign[j] * r[(self.index[i], self.index[j])];
            }
        }
        out
    }
}

/// Re-expresses a bare 3-D vector from one axes convention in another, for callers that only
/// need point/vector remapping without a full transform.
#[must_use]
pub fn convert_vector(v: Vector3, from: AxesConvention, to: AxesConvention) -> Vector3 {
    from.map_to(to).apply_vector(&v)
}
