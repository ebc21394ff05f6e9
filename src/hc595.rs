/*!
  # 74HC595 output register

  Bits are shifted in on DS, MSB first, one per rising edge of SHCP. A
  rising edge on STCP copies the shift stages to the outputs, so the
  outputs only ever show complete bytes. After a write, bit `n` of the
  byte drives output `Qn`.
*/

use core::time::Duration;

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::timer::{CountDown, Periodic};

use crate::clock::{BitClock, Transfer};
use crate::config::Config;
use crate::error::Error;
use crate::timing::ClockTimer;

/// Bit-banged 74HC595
pub struct Hc595<DS, SHCP, STCP, Timer>
where
    DS: OutputPin,
    SHCP: OutputPin,
    STCP: OutputPin,
    Timer: CountDown + Periodic,
{
    ds: DS,
    shcp: SHCP,
    stcp: STCP,
    clock: BitClock<Timer>,
    outputs: u8,
}

impl<DS, SHCP, STCP, Timer, E> Hc595<DS, SHCP, STCP, Timer>
where
    DS: OutputPin<Error = E>,
    SHCP: OutputPin<Error = E>,
    STCP: OutputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    /// Create instance
    pub fn new(ds: DS, shcp: SHCP, stcp: STCP, timer: Timer, config: &Config) -> Self {
        let timer = ClockTimer::new(timer, config.calibration.half_period);
        Hc595 {
            ds,
            shcp,
            stcp,
            clock: BitClock::new(timer),
            outputs: 0,
        }
    }

    /// Shift `byte` in and latch it onto the outputs.
    pub fn write(&mut self, byte: u8) -> Result<(), Error<E>> {
        self.stcp.set_low().map_err(Error::Bus)?;
        self.clock
            .transmit(&mut self.ds, &mut self.shcp, byte as u16, Transfer::BYTE)?;
        self.stcp.set_high().map_err(Error::Bus)?;
        self.clock.settle();

        self.outputs = byte;
        Ok(())
    }

    /// Last latched byte
    pub fn outputs(&self) -> u8 {
        self.outputs
    }

    pub fn clear(&mut self) -> Result<(), Error<E>> {
        self.write(0x00)
    }

    /// Switch all outputs off and return the lines and timer.
    pub fn release(mut self) -> Result<(DS, SHCP, STCP, Timer), Error<E>> {
        self.clear()?;
        Ok((self.ds, self.shcp, self.stcp, self.clock.free()))
    }
}

/// A run of LEDs on consecutive outputs
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedBank {
    /// Output driving the first LED
    pub first: u8,
    pub count: u8,
}

impl Default for LedBank {
    /// LED2 to LED4 of the HAT, on Q1 to Q3
    fn default() -> Self {
        LedBank { first: 1, count: 3 }
    }
}

impl LedBank {
    /// Output byte lighting only LED `index`
    pub fn pattern(&self, index: u8) -> Option<u8> {
        if index >= self.count {
            return None;
        }
        1u8.checked_shl(self.first as u32 + index as u32)
    }

    /// Light LED `index` alone.
    pub fn show<DS, SHCP, STCP, Timer, E>(
        &self,
        register: &mut Hc595<DS, SHCP, STCP, Timer>,
        index: u8,
    ) -> Result<(), Error<E>>
    where
        DS: OutputPin<Error = E>,
        SHCP: OutputPin<Error = E>,
        STCP: OutputPin<Error = E>,
        Timer: CountDown + Periodic,
        Timer::Time: From<Duration>,
    {
        let pattern = self.pattern(index).ok_or(Error::InvalidData)?;
        register.write(pattern)
    }

    /// Index after `index`, wrapping.
    pub fn next(&self, index: u8) -> u8 {
        if index.saturating_add(1) >= self.count {
            0
        } else {
            index + 1
        }
    }
}
