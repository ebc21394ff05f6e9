//! Level meters.
//!
//! Maps an ADC reading onto a row pattern through a threshold table and
//! paints it on every row of the matrix ([`run_meter`]), or onto one LED
//! of a [`LedBank`] ([`run_led_meter`]). The thresholds are data, so a
//! board with a different reference or a different bar shape only needs
//! another table.

use core::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::hc595::{Hc595, LedBank};
use crate::max7219::Max7219;
use crate::mcp3201::Mcp3201;

/// Number of threshold steps in a table
pub const STEPS: usize = 8;

/// Pattern shown while the level is below `below`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step {
    /// Exclusive upper bound, as a fraction of full scale
    pub below: f32,
    pub pattern: u8,
}

/// Ordered thresholds, checked from the lowest
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelTable {
    pub steps: [Step; STEPS],
    /// Pattern at or above the last threshold
    pub above: u8,
}

impl Default for LevelTable {
    /// A full bar that loses one column per ninth of the range and goes
    /// dark in the top ninth.
    fn default() -> Self {
        const BOUNDS: [f32; STEPS] = [0.111, 0.222, 0.333, 0.444, 0.555, 0.666, 0.777, 0.888];

        let mut steps = [Step {
            below: 0.0,
            pattern: 0,
        }; STEPS];
        for (k, step) in steps.iter_mut().enumerate() {
            step.below = BOUNDS[k];
            step.pattern = 0xff >> k;
        }
        LevelTable { steps, above: 0x00 }
    }
}

impl LevelTable {
    /// Pattern for a level given as a fraction of full scale
    pub fn pattern(&self, fraction: f32) -> u8 {
        self.steps
            .iter()
            .find(|step| fraction < step.below)
            .map_or(self.above, |step| step.pattern)
    }

    /// Pattern for `voltage` measured against `reference_voltage`
    pub fn pattern_for_voltage(&self, voltage: f32, reference_voltage: f32) -> u8 {
        self.pattern(voltage / reference_voltage)
    }
}

/// LED shown while the level is below `below`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LedStep {
    pub below: f32,
    /// Index into the [`LedBank`]
    pub led: u8,
}

/// Thresholds selecting one LED of a bank
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LedLevels {
    pub steps: [LedStep; 2],
    /// LED at or above the last threshold
    pub above: u8,
}

impl Default for LedLevels {
    /// LED4 in the low third, LED3 in the middle, LED2 in the top third
    fn default() -> Self {
        LedLevels {
            steps: [LedStep { below: 0.33, led: 2 }, LedStep { below: 0.66, led: 1 }],
            above: 0,
        }
    }
}

impl LedLevels {
    /// LED index for a level given as a fraction of full scale
    pub fn led(&self, fraction: f32) -> u8 {
        self.steps
            .iter()
            .find(|step| fraction < step.below)
            .map_or(self.above, |step| step.led)
    }
}

/// Sample the ADC and redraw the display until `token` is cancelled, then
/// clear the display. `pace` runs between iterations.
///
/// Returns the number of samples shown.
pub fn run_meter<DIN, CLK, LOAD, MT, DOUT, ACLK, CS, AT, E, F>(
    display: &mut Max7219<DIN, CLK, LOAD, MT>,
    adc: &mut Mcp3201<DOUT, ACLK, CS, AT>,
    table: &LevelTable,
    token: &CancelToken,
    mut pace: F,
) -> Result<u32, Error<E>>
where
    DIN: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    LOAD: OutputPin<Error = E>,
    MT: CountDown + Periodic,
    MT::Time: From<Duration>,
    DOUT: InputPin<Error = E>,
    ACLK: OutputPin<Error = E>,
    CS: OutputPin<Error = E>,
    AT: CountDown + Periodic,
    AT::Time: From<Duration>,
    F: FnMut(),
{
    let mut shown = 0;
    while !token.is_cancelled() {
        let sample = adc.sample()?;
        let fraction = sample.fraction(adc.calibration());
        let pattern = table.pattern(fraction);
        log::debug!("{}V ({}) -> {:#04x}", sample.voltage, fraction, pattern);

        display.fill(pattern)?;
        shown += 1;
        pace();
    }
    display.clear_display()?;
    Ok(shown)
}

/// Sample the ADC and light the matching LED of `bank` until `token` is
/// cancelled, then switch the register off. `pace` runs between iterations.
///
/// Returns the number of samples shown.
pub fn run_led_meter<DS, SHCP, STCP, LT, DOUT, ACLK, CS, AT, E, F>(
    leds: &mut Hc595<DS, SHCP, STCP, LT>,
    adc: &mut Mcp3201<DOUT, ACLK, CS, AT>,
    bank: &LedBank,
    levels: &LedLevels,
    token: &CancelToken,
    mut pace: F,
) -> Result<u32, Error<E>>
where
    DS: OutputPin<Error = E>,
    SHCP: OutputPin<Error = E>,
    STCP: OutputPin<Error = E>,
    LT: CountDown + Periodic,
    LT::Time: From<Duration>,
    DOUT: InputPin<Error = E>,
    ACLK: OutputPin<Error = E>,
    CS: OutputPin<Error = E>,
    AT: CountDown + Periodic,
    AT::Time: From<Duration>,
    F: FnMut(),
{
    let mut shown = 0;
    while !token.is_cancelled() {
        let sample = adc.sample()?;
        let fraction = sample.fraction(adc.calibration());
        let led = levels.led(fraction);
        log::debug!("{}V ({}) -> led {}", sample.voltage, fraction, led);

        bank.show(leds, led)?;
        shown += 1;
        pace();
    }
    leds.clear()?;
    Ok(shown)
}
