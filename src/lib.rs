//! This library turns three tracked reference markers into a rigid-body pose and turns that pose
//! into steering commands for a two-thruster vessel.
//!
//! It has two tightly coupled halves:
//!
//! - a [`PoseSolver`] that reconstructs a 6-DOF [`BodyTransform`] from two matched triples of
//!   marker positions (a fixed *reference* triple and the *currently observed* triple), with
//!   degenerate-geometry detection and axis-convention-safe yaw/pitch/roll extraction; and
//! - an [`Autopilot`] that consumes that transform plus a [`Destination`] once per control cycle
//!   and produces per-thruster direction/propulsion commands through a two-mode control law:
//!   coarse proportional bearing steering while far from the target ([`Mode::Cruising`]), and
//!   cascaded PID station-keeping once within a distance threshold ([`Mode::Near`]).
//!
//! Marker coordinates live in whatever Cartesian frame the tracking rig reports; the frame's
//! axis labeling is captured by [`AxesConvention`] (North-East-Down or East-Up-South), and
//! transforms carry the convention they are expressed in so they cannot silently be decomposed
//! under the wrong one. Linear quantities are plain `f64` in frame units (metres only if your
//! capture frame's unit is one metre); angles are [`uom`] [`Angle`](uom::si::f64::Angle)s.
//!
//! The whole crate is synchronous and cycle-driven: one caller invokes
//! [`Autopilot::update`] once per fixed period with an explicit cycle time, so identical input
//! sequences replay identically. A failed pose solve should make the caller skip that cycle's
//! autopilot update rather than feed a stale transform.
//!
//! # Example
//!
//! ```
//! use luotsi::{
//!     Autopilot, AxesConvention, Destination, PidSettings, Point3, PoseSolver, Settings,
//! };
//! use uom::si::angle::radian;
//! use uom::si::f64::Angle;
//!
//! // the capture rig reports marker coordinates in an East-Up-South frame
//! let mut solver = PoseSolver::new(AxesConvention::Eus);
//!
//! // where the three markers sit on the vessel (fixed roles A, B, C)
//! solver
//!     .set_reference_points(
//!         Point3::new(0., 0., 0.),
//!         Point3::new(2., 0., 0.),
//!         Point3::new(0., 0., -2.),
//!     )
//!     .expect("reference markers are well-separated and not collinear");
//!
//! let mut autopilot = Autopilot::new(Settings {
//!     near_limit: 20.,
//!     cruise_propulsion: 50_000.,
//!     cruise_direction_gain: 0.2,
//!     position: PidSettings {
//!         p: 20_000.,
//!         i: 200.,
//!         d: 200_000.,
//!         f: 0.,
//!         max_i_output: 50_000.,
//!         max_output: 20_000.,
//!         remember_i: true,
//!     },
//!     heading: PidSettings {
//!         p: 80_000.,
//!         i: 1_000.,
//!         d: 500_000.,
//!         f: 0.,
//!         max_i_output: 50_000.,
//!         max_output: 20_000.,
//!         remember_i: false,
//!     },
//! });
//! autopilot.set_destination(Destination {
//!     north: 100.,
//!     east: 40.,
//!     heading: Angle::new::<radian>(0.),
//! });
//!
//! // each control cycle: feed the currently observed marker positions...
//! solver
//!     .set_points(
//!         Point3::new(5., 0., 1.),
//!         Point3::new(7., 0., 1.),
//!         Point3::new(5., 0., -1.),
//!     )
//!     .expect("live markers are well-separated and not collinear");
//!
//! // ...solve the pose, and only steer on a successful solve
//! let pose = solver.transform_matrix().expect("both bases are valid");
//! let steering = autopilot.update(&pose, 0.125);
//!
//! println!(
//!     "front thruster: {:.0} units at {:?} rad ({:?})",
//!     steering.front.propulsion,
//!     steering.front.direction.get::<radian>(),
//!     steering.diagnostics.mode,
//! );
//! ```

mod autopilot;
mod conventions;
mod pid;
mod solver;
mod transform;
mod util;

pub use autopilot::{
    Autopilot, Destination, Diagnostics, Mode, PidSettings, Settings, Steering, ThrusterCommand,
};
pub use conventions::{convert_vector, AxesConvention};
pub use pid::PidController;
pub use solver::{PoseSolver, SolverError};
pub use transform::{yaw_pitch_roll_in, BodyTransform};

/// A 3-D marker coordinate in the capture frame.
pub type Point3 = nalgebra::Point3<f64>;

pub(crate) type Matrix3 = nalgebra::Matrix3<f64>;
pub(crate) type Vector2 = nalgebra::Vector2<f64>;
pub(crate) type Vector3 = nalgebra::Vector3<f64>;
