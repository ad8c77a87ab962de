use serde::{Deserialize, Serialize};

/// A value paired with the time (ms) it applies to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringState {
    pub value: f64,
    pub time: f64,
}

impl SpringState {
    pub fn new(value: f64, time: f64) -> Self {
        Self { value, time }
    }
}

/// Damped animation of a single scalar.
///
/// `current` eases from `start` towards `target` along
/// `(1 - e^(-k t)) / (1 - e^(-k))` where `t` is the elapsed fraction of the
/// animation interval, landing exactly on the target once the interval ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    stiffness: f64,
    /// Seconds
    animation_time: f64,
    start: SpringState,
    target: SpringState,
    current: SpringState,
}

impl Spring {
    pub fn new(initial: f64, stiffness: f64, animation_time: f64, now: f64) -> Self {
        let state = SpringState::new(initial, now);
        Self {
            stiffness,
            animation_time,
            start: state,
            target: state,
            current: state,
        }
    }

    pub fn start(&self) -> SpringState {
        self.start
    }

    pub fn target(&self) -> SpringState {
        self.target
    }

    pub fn current(&self) -> SpringState {
        self.current
    }

    pub fn value(&self) -> f64 {
        self.current.value
    }

    pub fn target_value(&self) -> f64 {
        self.target.value
    }

    pub fn is_at_rest(&self) -> bool {
        self.current.value == self.target.value
    }

    /// Snaps to `target` without animating; `current` follows on the next update
    pub fn reset_to(&mut self, target: f64) {
        self.target = SpringState::new(target, self.current.time);
        self.start = self.target;
    }

    /// Starts animating from the current value towards `target`
    pub fn spring_to(&mut self, target: f64) {
        self.start = self.current;
        self.target = SpringState::new(target, self.start.time + 1000.0 * self.animation_time);
    }

    /// Translates the whole animation by `delta`, keeping its timing
    pub fn shift_by(&mut self, delta: f64) {
        self.start.value += delta;
        self.target.value += delta;
    }

    pub fn update(&mut self, now: f64) {
        self.current.time = now;

        let span = self.target.time - self.start.time;
        self.current.value = if now >= self.target.time || span <= 0.0 {
            self.target.value
        } else {
            let t = ((now - self.start.time) / span).clamp(0.0, 1.0);
            self.start.value + (self.target.value - self.start.value) * ease(self.stiffness, t)
        };
    }
}

fn ease(stiffness: f64, t: f64) -> f64 {
    if stiffness == 0.0 {
        return t;
    }
    (1.0 - (-stiffness * t).exp()) / (1.0 - (-stiffness).exp())
}
