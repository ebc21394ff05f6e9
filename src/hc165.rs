/*!
  # 74HC165 switch capture

  Parallel-loads the switch inputs into the register, then clocks the eight
  stages out of Q7. The first bit read comes from the last stage of the
  chain, so index 0 of a [`SwitchWord`] is stage 7.

  Control lines, all outputs:
  - `PL`: parallel load, active low
  - `CE`: clock enable, active low
  - `CP`: clock, rising-edge triggered

  Capture must not be repeated faster than the switches settle; the caller
  owns the polling cadence.
*/

use core::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};

use crate::clock::BitClock;
use crate::config::Config;
use crate::error::Error;
use crate::timing::ClockTimer;

/// Stages in one register
pub const WIDTH: usize = 8;

/// Switch states in capture order
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchWord([bool; WIDTH]);

impl SwitchWord {
    pub const fn new(bits: [bool; WIDTH]) -> Self {
        SwitchWord(bits)
    }

    /// Bit captured at position `index`
    pub fn get(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }

    pub fn bits(&self) -> [bool; WIDTH] {
        self.0
    }

    /// Packed with the first captured bit as the MSB
    pub fn to_byte(&self) -> u8 {
        self.0
            .iter()
            .fold(0u8, |byte, bit| (byte << 1) | *bit as u8)
    }

    /// State of switch `SWn` on the board, where SW2 to SW4 are wired to
    /// the last three captured positions.
    pub fn switch(&self, n: usize) -> Option<bool> {
        match n {
            2..=4 => self.get(9 - n),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }
}

/// Bit-banged 74HC165
pub struct Hc165<PL, Q7, CE, CP, Timer>
where
    PL: OutputPin,
    Q7: InputPin,
    CE: OutputPin,
    CP: OutputPin,
    Timer: CountDown + Periodic,
{
    pl: PL,
    q7: Q7,
    ce: CE,
    cp: CP,
    clock: BitClock<Timer>,
}

impl<PL, Q7, CE, CP, Timer, E> Hc165<PL, Q7, CE, CP, Timer>
where
    PL: OutputPin<Error = E>,
    Q7: InputPin<Error = E>,
    CE: OutputPin<Error = E>,
    CP: OutputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    /// Create instance
    pub fn new(pl: PL, q7: Q7, ce: CE, cp: CP, timer: Timer, config: &Config) -> Self {
        let timer = ClockTimer::new(timer, config.calibration.half_period);
        Hc165 {
            pl,
            q7,
            ce,
            cp,
            clock: BitClock::new(timer),
        }
    }

    /// Latch the switch inputs and read all eight stages.
    pub fn capture(&mut self) -> Result<SwitchWord, Error<E>> {
        self.clock.restart();

        // disable clock, load parallel inputs
        self.ce.set_high().map_err(Error::Bus)?;
        self.pl.set_low().map_err(Error::Bus)?;
        self.clock.settle();

        // hold, then enable serial clock
        self.pl.set_high().map_err(Error::Bus)?;
        self.clock.settle();
        self.ce.set_low().map_err(Error::Bus)?;

        let mut bits = [false; WIDTH];
        for bit in bits.iter_mut() {
            self.cp.set_low().map_err(Error::Bus)?;
            self.clock.wait_for_clk();

            *bit = self.q7.is_high().map_err(Error::Bus)?;

            self.cp.set_high().map_err(Error::Bus)?;
            self.clock.wait_for_clk();
        }
        self.cp.set_low().map_err(Error::Bus)?;

        let word = SwitchWord(bits);
        log::trace!("hc165 captured {:#010b}", word.to_byte());
        Ok(word)
    }

    pub fn release(self) -> (PL, Q7, CE, CP, Timer) {
        (self.pl, self.q7, self.ce, self.cp, self.clock.free())
    }
}
