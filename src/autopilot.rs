use crate::conventions::AxesConvention;
use crate::pid::PidController;
use crate::transform::BodyTransform;
use crate::util::BoundedAngle;
use crate::Vector2;
use nalgebra::Rotation2;
use std::f64::consts::FRAC_PI_2;
use uom::si::angle::radian;
use uom::si::f64::Angle;
use uom::ConstZero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Gains and limits for one [`PidController`] inside the autopilot.
///
/// Gains are per-cycle (the fixed control period is assumed to be baked into them).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidSettings {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
    /// Symmetric clamp on the integral contribution; non-positive means unclamped.
    pub max_i_output: f64,
    /// Symmetric clamp on the controller output; non-positive means unclamped.
    pub max_output: f64,
    /// Whether the accumulated integral survives a fall back to cruising. When `false` the
    /// controller is reset every time the vessel re-enters [`Mode::Near`].
    pub remember_i: bool,
}

/// Tuning for the whole autopilot.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Settings {
    /// Distance to the target below which the autopilot switches from cruising to PID
    /// station-keeping, in frame units.
    pub near_limit: f64,
    /// Fixed propulsion applied to both thrusters while cruising.
    pub cruise_propulsion: f64,
    /// Extra steering gain applied on top of the relative bearing while cruising.
    pub cruise_direction_gain: f64,
    /// Shared settings for the two position controllers (North and East).
    pub position: PidSettings,
    /// Settings for the heading controller.
    pub heading: PidSettings,
}

/// Where the vessel should go and which way it should point once there, in NED.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Destination {
    pub north: f64,
    pub east: f64,
    /// Desired compass heading at the destination.
    pub heading: Angle,
}

impl Default for Destination {
    fn default() -> Self {
        Self {
            north: 0.,
            east: 0.,
            heading: Angle::ZERO,
        }
    }
}

/// Which control law produced the most recent steering output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// No update has run yet.
    Unknown,
    /// Far from the target: fixed propulsion, bearing-proportional steering.
    Cruising,
    /// Within [`Settings::near_limit`] of the target: cascaded PID station-keeping.
    Near,
}

/// One thruster's command for this cycle.
///
/// `direction` is the azimuth the thruster is swiveled to, measured in the vessel's body frame
/// with zero pointing astern (so a zero-direction thrust pushes the vessel forward); positive is
/// towards starboard.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThrusterCommand {
    pub direction: Angle,
    pub propulsion: f64,
}

/// Intermediate quantities of one control cycle, exposed for display and logging.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    /// Compass bearing from the vessel to the target.
    pub absolute_bearing: Angle,
    /// Bearing to the target relative to the vessel's heading, in [-180°, 180°).
    pub relative_bearing: Angle,
    pub distance_to_target: f64,
    /// North/East velocity over the last cycle, in frame units per second. Zero on the first
    /// cycle, when there is no previous position to difference against.
    pub velocity: Vector2,
    pub speed: f64,
    /// Compass direction of the velocity vector.
    pub direction_of_travel: Angle,
    /// Signed error between the destination heading and the current heading, in [-180°, 180°).
    pub heading_error: Angle,
    pub mode: Mode,
}

/// The full output of one [`Autopilot::update`] cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Steering {
    pub front: ThrusterCommand,
    pub back: ThrusterCommand,
    pub diagnostics: Diagnostics,
}

/// Drives a vessel with one fore and one aft swiveling thruster towards a [`Destination`].
///
/// Call [`update`](Autopilot::update) once per fixed control period with the latest solved pose.
/// Far from the target the autopilot cruises: both thrusters at a fixed propulsion, steered
/// towards the target bearing. Within [`Settings::near_limit`] it switches to station-keeping:
/// two PID controllers null the North/East position error in the world frame, the result is
/// rotated into the body frame, and a third PID adds a differential component that nulls the
/// heading error.
#[derive(Clone, Debug)]
pub struct Autopilot {
    settings: Settings,
    destination: Destination,
    last_origin: Option<Vector2>,
    mode: Mode,
    pid_north: PidController,
    pid_east: PidController,
    pid_heading: PidController,
}

fn configured(settings: &PidSettings) -> PidController {
    let mut pid = PidController::new(settings.p, settings.i, settings.d, settings.f);
    pid.set_max_i_output(settings.max_i_output);
    pid.set_output_limit(settings.max_output);
    pid
}

fn reconfigure(pid: &mut PidController, settings: &PidSettings) {
    pid.set_gains(settings.p, settings.i, settings.d, settings.f);
    pid.set_max_i_output(settings.max_i_output);
    pid.set_output_limit(settings.max_output);
}

impl Autopilot {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            destination: Destination::default(),
            last_origin: None,
            mode: Mode::Unknown,
            pid_north: configured(&settings.position),
            pid_east: configured(&settings.position),
            pid_heading: configured(&settings.heading),
        }
    }

    /// Applies new tuning. Integral state is kept (controllers with `remember_i` unset are
    /// reset anyway on the next entry into [`Mode::Near`]), but the mode is cleared so the next
    /// update re-decides it from scratch.
    pub fn reconfigure(&mut self, settings: Settings) {
        self.settings = settings;
        reconfigure(&mut self.pid_north, &settings.position);
        reconfigure(&mut self.pid_east, &settings.position);
        reconfigure(&mut self.pid_heading, &settings.heading);
        self.mode = Mode::Unknown;
    }

    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    #[must_use]
    pub fn destination(&self) -> Destination {
        self.destination
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Runs one control cycle against the latest solved pose and returns the thruster commands.
    ///
    /// The pose may be expressed in any [`AxesConvention`]; it is re-expressed in NED
    /// internally. `cycle_time` is the elapsed time since the previous update in seconds and
    /// only affects the reported velocity, not the control law itself.
    pub fn update(&mut self, pose: &BodyTransform, cycle_time: f64) -> Steering {
        let pose = pose.to_convention(AxesConvention::Ned);
        let (yaw, _, _) = pose.yaw_pitch_roll();
        let heading = yaw.get::<radian>();

        let translation = pose.translation();
        let origin = Vector2::new(translation[0], translation[1]);
        let target = Vector2::new(self.destination.north, self.destination.east);
        let relative = target - origin;

        let distance = relative.norm();
        let absolute_bearing = relative[1].atan2(relative[0]);
        let relative_bearing =
            BoundedAngle::new(Angle::new::<radian>(absolute_bearing - heading)).to_signed_range();
        let heading_error =
            -BoundedAngle::new(self.destination.heading - Angle::new::<radian>(heading))
                .to_signed_range();

        let velocity = match self.last_origin {
            Some(last) => (origin - last) / cycle_time,
            None => Vector2::zeros(),
        };
        self.last_origin = Some(origin);

        let (front, back) = if distance > self.settings.near_limit {
            self.cruise(relative_bearing)
        } else {
            self.station_keep(origin, heading, heading_error)
        };

        Steering {
            front,
            back,
            diagnostics: Diagnostics {
                absolute_bearing: Angle::new::<radian>(absolute_bearing),
                relative_bearing: Angle::new::<radian>(relative_bearing),
                distance_to_target: distance,
                velocity,
                speed: velocity.norm(),
                direction_of_travel: Angle::new::<radian>(velocity[1].atan2(velocity[0])),
                heading_error: Angle::new::<radian>(heading_error),
                mode: self.mode,
            },
        }
    }

    /// Fixed-propulsion steering towards the target bearing. Both thrusters push at
    /// `cruise_propulsion`; the aft one mirrors the fore one so the pair turns the hull instead
    /// of translating it sideways.
    fn cruise(&mut self, relative_bearing: f64) -> (ThrusterCommand, ThrusterCommand) {
        let direction = if relative_bearing < -FRAC_PI_2 {
            -FRAC_PI_2
        } else if relative_bearing > FRAC_PI_2 {
            FRAC_PI_2
        } else {
            // overshoot the bearing by the tuned gain, fold by a half turn, then cap the swivel
            let boosted = relative_bearing + relative_bearing * self.settings.cruise_direction_gain;
            (boosted % std::f64::consts::PI).clamp(-FRAC_PI_2, FRAC_PI_2)
        };

        self.mode = Mode::Cruising;
        (
            ThrusterCommand {
                direction: Angle::new::<radian>(direction),
                propulsion: self.settings.cruise_propulsion,
            },
            ThrusterCommand {
                direction: Angle::new::<radian>(-direction),
                propulsion: self.settings.cruise_propulsion,
            },
        )
    }

    /// Cascaded PID station-keeping: world-frame position nulling rotated into the body frame,
    /// plus a differential heading component split across the two thrusters.
    fn station_keep(
        &mut self,
        origin: Vector2,
        heading: f64,
        heading_error: f64,
    ) -> (ThrusterCommand, ThrusterCommand) {
        if self.mode != Mode::Near {
            if !self.settings.position.remember_i {
                self.pid_north.reset();
                self.pid_east.reset();
            }
            if !self.settings.heading.remember_i {
                self.pid_heading.reset();
            }
        }

        self.pid_north.set_setpoint(self.destination.north);
        let out_north = self.pid_north.next_output(origin[0]);
        self.pid_east.set_setpoint(self.destination.east);
        let out_east = self.pid_east.next_output(origin[1]);

        // thrust vectors use x pointing astern, so the northward component flips sign
        let world = Vector2::new(-out_north, out_east);
        let body = Rotation2::new(heading) * world;

        self.pid_heading.set_setpoint(0.);
        let differential = self.pid_heading.next_output(heading_error);

        let front_vector = body + Vector2::new(0., differential);
        let back_vector = body - Vector2::new(0., differential);

        self.mode = Mode::Near;
        (thruster_command(front_vector), thruster_command(back_vector))
    }
}

/// Converts a body-frame thrust vector into a swivel azimuth and propulsion magnitude.
fn thruster_command(vector: Vector2) -> ThrusterCommand {
    ThrusterCommand {
        direction: Angle::new::<radian>(vector[1].atan2(-vector[0])),
        propulsion: vector.norm(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Autopilot, Destination, Mode, PidSettings, Settings};
    use crate::conventions::AxesConvention;
    use crate::transform::BodyTransform;
    use crate::Vector3;
    use approx::assert_abs_diff_eq;
    use nalgebra::Rotation3;
    use std::f64::consts::FRAC_PI_2;
    use uom::si::angle::{degree, radian};
    use uom::si::f64::Angle;
    use uom::ConstZero;

    const CYCLE_TIME: f64 = 0.125;

    fn settings() -> Settings {
        Settings {
            near_limit: 20.,
            cruise_propulsion: 50_000.,
            cruise_direction_gain: 0.2,
            position: PidSettings {
                p: 20_000.,
                i: 200.,
                d: 200_000.,
                f: 0.,
                max_i_output: 50_000.,
                max_output: 20_000.,
                remember_i: true,
            },
            heading: PidSettings {
                p: 80_000.,
                i: 1_000.,
                d: 500_000.,
                f: 0.,
                max_i_output: 50_000.,
                max_output: 20_000.,
                remember_i: false,
            },
        }
    }

    /// Settings gentle enough that nothing saturates in the integral-memory tests.
    fn gentle_settings(remember_position_i: bool) -> Settings {
        let pid = PidSettings {
            p: 0.5,
            i: 0.01,
            d: 0.,
            f: 0.,
            max_i_output: 100.,
            max_output: 1_000.,
            remember_i: remember_position_i,
        };
        Settings {
            near_limit: 20.,
            cruise_propulsion: 10.,
            cruise_direction_gain: 0.2,
            position: pid,
            heading: pid,
        }
    }

    fn ned_pose(north: f64, east: f64, heading: f64) -> BodyTransform {
        BodyTransform::from_parts(
            *Rotation3::from_euler_angles(0., 0., heading).matrix(),
            Vector3::new(north, east, 0.),
            AxesConvention::Ned,
        )
    }

    #[test]
    fn starts_in_unknown_mode() {
        let autopilot = Autopilot::new(settings());
        assert_eq!(autopilot.mode(), Mode::Unknown);
    }

    #[test]
    fn cruises_when_far_from_the_target() {
        let mut autopilot = Autopilot::new(settings());
        autopilot.set_destination(Destination {
            north: 25.,
            east: 0.,
            heading: Angle::ZERO,
        });

        let steering = autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);

        assert_eq!(autopilot.mode(), Mode::Cruising);
        assert_eq!(steering.diagnostics.mode, Mode::Cruising);
        assert_abs_diff_eq!(steering.diagnostics.distance_to_target, 25.);
        assert_abs_diff_eq!(steering.front.propulsion, 50_000.);
        assert_abs_diff_eq!(steering.back.propulsion, 50_000.);
        // aft swivel mirrors the fore one
        assert_abs_diff_eq!(
            steering.back.direction.get::<radian>(),
            -steering.front.direction.get::<radian>()
        );
        assert!(steering.front.direction.get::<radian>().abs() <= FRAC_PI_2 + 1e-12);
    }

    #[test]
    fn cruise_steering_is_bearing_proportional_and_capped() {
        let mut autopilot = Autopilot::new(settings());
        autopilot.set_destination(Destination {
            north: 100.,
            east: 30.,
            heading: Angle::ZERO,
        });

        // heading already points North; the target sits atan2(30, 100) to starboard
        let steering = autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
        let bearing = 30_f64.atan2(100.);
        assert_abs_diff_eq!(
            steering.front.direction.get::<radian>(),
            bearing * 1.2,
            epsilon = 1e-12
        );

        // a target dead astern caps the swivel at 90°
        let mut astern = Autopilot::new(settings());
        astern.set_destination(Destination {
            north: -100.,
            east: 0.,
            heading: Angle::ZERO,
        });
        let steering = astern.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
        assert_abs_diff_eq!(
            steering.front.direction.get::<radian>().abs(),
            FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn switches_to_near_mode_inside_the_limit() {
        let mut autopilot = Autopilot::new(settings());
        autopilot.set_destination(Destination {
            north: 5.,
            east: 0.,
            heading: Angle::ZERO,
        });

        let steering = autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
        assert_eq!(autopilot.mode(), Mode::Near);
        assert_eq!(steering.diagnostics.mode, Mode::Near);
    }

    #[test]
    fn at_the_destination_everything_nulls_out() {
        let mut autopilot = Autopilot::new(settings());
        autopilot.set_destination(Destination {
            north: 3.,
            east: -4.,
            heading: Angle::new::<degree>(45.),
        });

        let pose = ned_pose(3., -4., 45_f64.to_radians());
        let steering = autopilot.update(&pose, CYCLE_TIME);

        assert_eq!(autopilot.mode(), Mode::Near);
        assert_abs_diff_eq!(steering.diagnostics.distance_to_target, 0., epsilon = 1e-12);
        assert_abs_diff_eq!(
            steering.diagnostics.heading_error.get::<radian>(),
            0.,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(steering.front.propulsion, 0., epsilon = 1e-9);
        assert_abs_diff_eq!(steering.back.propulsion, 0., epsilon = 1e-9);
    }

    #[test]
    fn heading_error_is_wrap_aware() {
        let mut autopilot = Autopilot::new(settings());
        autopilot.set_destination(Destination {
            north: 0.,
            east: 0.,
            heading: Angle::new::<degree>(10.),
        });

        // 350° to 10° is a 20° starboard turn, not a 340° port one
        let steering = autopilot.update(&ned_pose(0., 0., 350_f64.to_radians()), CYCLE_TIME);
        assert_abs_diff_eq!(
            steering.diagnostics.heading_error.get::<degree>(),
            -20.,
            epsilon = 1e-9
        );
    }

    #[test]
    fn velocity_is_zero_on_the_first_cycle_then_differenced() {
        let mut autopilot = Autopilot::new(settings());
        autopilot.set_destination(Destination {
            north: 100.,
            east: 0.,
            heading: Angle::ZERO,
        });

        let steering = autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
        assert_abs_diff_eq!(steering.diagnostics.speed, 0.);

        let steering = autopilot.update(&ned_pose(1., 2., 0.), CYCLE_TIME);
        assert_abs_diff_eq!(steering.diagnostics.velocity[0], 8., epsilon = 1e-12);
        assert_abs_diff_eq!(steering.diagnostics.velocity[1], 16., epsilon = 1e-12);
        assert_abs_diff_eq!(
            steering.diagnostics.direction_of_travel.get::<radian>(),
            16_f64.atan2(8.),
            epsilon = 1e-12
        );
    }

    #[test]
    fn pose_convention_does_not_matter() {
        let mut ned = Autopilot::new(settings());
        let mut eus = Autopilot::new(settings());
        let destination = Destination {
            north: 40.,
            east: -10.,
            heading: Angle::new::<degree>(30.),
        };
        ned.set_destination(destination);
        eus.set_destination(destination);

        let pose = ned_pose(12., 7., 0.6);
        let a = ned.update(&pose, CYCLE_TIME);
        let b = eus.update(&pose.to_convention(AxesConvention::Eus), CYCLE_TIME);

        assert_abs_diff_eq!(
            a.front.direction.get::<radian>(),
            b.front.direction.get::<radian>(),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(a.front.propulsion, b.front.propulsion, epsilon = 1e-6);
        assert_eq!(a.diagnostics.mode, b.diagnostics.mode);
    }

    #[test]
    fn integral_memory_follows_the_remember_flag() {
        let destination = Destination {
            north: 10.,
            east: 0.,
            heading: Angle::ZERO,
        };

        let mut forgetful = Autopilot::new(gentle_settings(false));
        let mut retentive = Autopilot::new(gentle_settings(true));
        forgetful.set_destination(destination);
        retentive.set_destination(destination);

        for autopilot in [&mut forgetful, &mut retentive] {
            // two near cycles accumulate a north error sum of 20
            autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
            autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
            assert_abs_diff_eq!(autopilot.pid_north.error_sum(), 20.);

            // wander out of the near zone
            autopilot.update(&ned_pose(-50., 0., 0.), CYCLE_TIME);
            assert_eq!(autopilot.mode(), Mode::Cruising);

            // and come back
            autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
            assert_eq!(autopilot.mode(), Mode::Near);
        }

        // the reset controller starts over from the current error; the retentive one keeps going
        assert_abs_diff_eq!(forgetful.pid_north.error_sum(), 10.);
        assert_abs_diff_eq!(retentive.pid_north.error_sum(), 30.);
    }

    #[test]
    fn reconfigure_clears_the_mode_but_keeps_the_destination() {
        let mut autopilot = Autopilot::new(settings());
        let destination = Destination {
            north: 5.,
            east: 5.,
            heading: Angle::ZERO,
        };
        autopilot.set_destination(destination);
        autopilot.update(&ned_pose(0., 0., 0.), CYCLE_TIME);
        assert_eq!(autopilot.mode(), Mode::Near);

        autopilot.reconfigure(gentle_settings(true));
        assert_eq!(autopilot.mode(), Mode::Unknown);
        assert_eq!(autopilot.destination(), destination);
    }
}
