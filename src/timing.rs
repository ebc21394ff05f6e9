//! Busy-wait timing.
//!
//! Every wait here is a lower bound. The bit clock is paced by a periodic
//! count-down timer started at the half-period; longer waits go through a
//! millisecond delay provider and are rounded up.

use core::time::Duration;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::timer::{CountDown, Periodic};
use nb::block;

/// Periodic timer ticking once per clock half-period
pub struct ClockTimer<Timer>
where
    Timer: CountDown + Periodic,
{
    timer: Timer,
    half_period: Duration,
}

impl<Timer> ClockTimer<Timer>
where
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    /// Start `timer` with a period of `half_period`.
    pub fn new(mut timer: Timer, half_period: Duration) -> Self {
        timer.start(half_period);
        ClockTimer { timer, half_period }
    }

    /// Start a fresh period, dropping any expiry latched while idle.
    pub fn restart(&mut self) {
        self.timer.start(self.half_period);
    }
}

impl<Timer> ClockTimer<Timer>
where
    Timer: CountDown + Periodic,
{
    pub fn half_period(&self) -> Duration {
        self.half_period
    }

    /// Wait one half-period.
    #[inline]
    pub fn tick(&mut self) {
        block!(self.timer.wait()).ok();
    }

    /// Wait for the peripheral to settle after a control-line transition.
    #[inline]
    pub fn settle(&mut self) {
        self.tick();
    }

    pub fn free(self) -> Timer {
        self.timer
    }
}

/// Milliseconds covering `duration`, rounded up.
pub fn ceil_millis(duration: Duration) -> u32 {
    let millis = duration.as_millis();
    let extra = if duration.subsec_nanos() % 1_000_000 != 0 { 1 } else { 0 };
    u32::try_from(millis + extra).unwrap_or(u32::MAX)
}

/// Wait at least `duration`.
pub fn pause<D>(delay: &mut D, duration: Duration)
where
    D: DelayMs<u32>,
{
    let millis = ceil_millis(duration);
    if millis > 0 {
        delay.delay_ms(millis);
    }
}
