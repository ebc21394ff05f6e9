/*!
  # MCP3201 successive-approximation ADC

  A conversion starts when CS falls. The converter spends the first three
  clock cycles sampling and emitting its null bit, then produces the result
  MSB first, one bit per rising edge. The driver clocks the whole window,
  drops those three leading bits and keeps the following `adc_width` bits.

  Every call to [`Mcp3201::sample`] is one independent conversion; no
  history is kept.
*/

use core::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};

use crate::clock::{BitClock, Transfer};
use crate::config::{Calibration, Config};
use crate::error::Error;
use crate::timing::ClockTimer;

/// Edges clocked before the first result bit
pub const SETTLING_EDGES: u8 = 3;

/// One conversion result
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcSample {
    /// Raw code, 0 to full scale
    pub raw: u16,
    /// Input voltage derived from the reference
    pub voltage: f32,
}

impl AdcSample {
    pub fn new(raw: u16, calibration: &Calibration) -> Self {
        AdcSample {
            raw,
            voltage: calibration.to_voltage(raw),
        }
    }

    /// Position of the reading within the reference range, 0.0 to 1.0
    pub fn fraction(&self, calibration: &Calibration) -> f32 {
        self.raw as f32 / calibration.full_scale() as f32
    }
}

/// Bit-banged MCP3201
pub struct Mcp3201<DOUT, CLK, CS, Timer>
where
    DOUT: InputPin,
    CLK: OutputPin,
    CS: OutputPin,
    Timer: CountDown + Periodic,
{
    dout: DOUT,
    clk: CLK,
    cs: CS,
    clock: BitClock<Timer>,
    calibration: Calibration,
}

impl<DOUT, CLK, CS, Timer, E> Mcp3201<DOUT, CLK, CS, Timer>
where
    DOUT: InputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    CS: OutputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    /// Create instance
    pub fn new(dout: DOUT, clk: CLK, cs: CS, timer: Timer, config: &Config) -> Self {
        let timer = ClockTimer::new(timer, config.calibration.half_period);
        Mcp3201 {
            dout,
            clk,
            cs,
            clock: BitClock::new(timer),
            calibration: config.calibration,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Run one conversion.
    pub fn sample(&mut self) -> Result<AdcSample, Error<E>> {
        let transfer = Transfer::new(self.calibration.adc_width).skip_leading(SETTLING_EDGES);

        self.clock.restart();

        // CS
        self.cs.set_low().map_err(Error::Bus)?;
        self.clock.settle();

        let raw = self.clock.receive(&mut self.dout, &mut self.clk, transfer);

        // CS always returns high
        let end = self.cs.set_high().map_err(Error::Bus);
        let raw = raw?;
        end?;

        let sample = AdcSample::new(raw, &self.calibration);
        log::trace!("mcp3201 raw {} -> {}V", sample.raw, sample.voltage);
        Ok(sample)
    }

    pub fn release(self) -> (DOUT, CLK, CS, Timer) {
        (self.dout, self.clk, self.cs, self.clock.free())
    }
}
