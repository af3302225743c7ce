use std::ops::{Add, Sub};

/// A timestamp on the virtual simulation clock, in seconds.
///
/// The crate never reads a wall clock; every time-sensitive operation takes a
/// `SimTime` argument so tests (and replays) can drive the clock explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct SimTime(f64);

impl SimTime {
    pub const ZERO: Self = Self(0.0);

    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(&self) -> f64 {
        self.0
    }
}

impl Add<SimDuration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimDuration) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl Sub for SimTime {
    type Output = SimDuration;

    fn sub(self, rhs: SimTime) -> SimDuration {
        SimDuration(self.0 - rhs.0)
    }
}

/// A span of virtual simulation time, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct SimDuration(f64);

impl SimDuration {
    pub const ZERO: Self = Self(0.0);

    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(&self) -> f64 {
        self.0
    }
}
