/// A single-input single-output controller with proportional, integral, derivative, and
/// feed-forward terms.
///
/// Design points, matching the controller the autopilot was tuned against:
///
/// - the derivative acts on the *measurement*, not the error, so a setpoint step produces no
///   derivative kick (and the first call after a [`reset`](PidController::reset) contributes
///   zero derivative);
/// - the feed-forward term is proportional to the setpoint;
/// - the integral contribution is clamped to `max_i_output`, and the stored error sum is
///   bounded so it cannot wind up past what that clamp can ever use;
/// - when the clamped total output saturates, the error sum is restarted from the current error
///   instead of accumulating further (anti-windup);
/// - there is no time-step parameter: gains are per-cycle, and the caller's fixed control
///   period is assumed to be absorbed into them.
#[derive(Clone, Debug)]
pub struct PidController {
    p: f64,
    i: f64,
    d: f64,
    f: f64,
    setpoint: f64,
    /// Symmetric clamp on the I contribution; non-positive means unclamped.
    max_i_output: f64,
    /// Symmetric clamp on the total output; non-positive means unclamped.
    output_limit: f64,
    error_sum: f64,
    last_actual: f64,
    last_output: f64,
    first_run: bool,
}

impl PidController {
    #[must_use]
    pub fn new(p: f64, i: f64, d: f64, f: f64) -> Self {
        Self {
            p,
            i,
            d,
            f,
            setpoint: 0.,
            max_i_output: 0.,
            output_limit: 0.,
            error_sum: 0.,
            last_actual: 0.,
            last_output: 0.,
            first_run: true,
        }
    }

    pub fn set_gains(&mut self, p: f64, i: f64, d: f64, f: f64) {
        self.p = p;
        self.i = i;
        self.d = d;
        self.f = f;
    }

    /// Clamps the total output to `[-limit, limit]`. Non-positive disables the clamp.
    pub fn set_output_limit(&mut self, limit: f64) {
        self.output_limit = limit;
    }

    /// Clamps the integral contribution to `[-max, max]` and bounds the stored error sum
    /// accordingly. Non-positive disables the clamp.
    pub fn set_max_i_output(&mut self, max: f64) {
        self.max_i_output = max;
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    #[must_use]
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// The accumulated (bounded) error sum behind the integral term.
    #[must_use]
    pub fn error_sum(&self) -> f64 {
        self.error_sum
    }

    /// The previous cycle's clamped output.
    #[must_use]
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// Runs one controller cycle against the measured value and returns the clamped output.
    pub fn next_output(&mut self, actual: f64) -> f64 {
        let error = self.setpoint - actual;

        let f_output = self.f * self.setpoint;
        let p_output = self.p * error;

        if self.first_run {
            self.last_actual = actual;
            self.first_run = false;
        }
        let d_output = -self.d * (actual - self.last_actual);
        self.last_actual = actual;

        let mut i_output = self.i * self.error_sum;
        if self.max_i_output > 0. {
            i_output = i_output.clamp(-self.max_i_output, self.max_i_output);
        }

        let mut output = f_output + p_output + i_output + d_output;

        if self.output_limit > 0. && output.abs() > self.output_limit {
            // saturated: restart the sum from the current error rather than winding up
            self.error_sum = error;
        } else if self.max_i_output > 0. && self.i != 0. {
            let max_error = (self.max_i_output / self.i).abs();
            self.error_sum = (self.error_sum + error).clamp(-max_error, max_error);
        } else {
            self.error_sum += error;
        }

        if self.output_limit > 0. {
            output = output.clamp(-self.output_limit, self.output_limit);
        }

        self.last_output = output;
        output
    }

    /// Clears the integral and the derivative history. The setpoint and gains are kept.
    pub fn reset(&mut self) {
        self.error_sum = 0.;
        self.first_run = true;
    }
}
