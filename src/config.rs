//! Board configuration
//!
//! Pin numbers, calibration constants and display settings. The defaults
//! describe the UP board HAT the drivers were brought up on.

use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::hc595::LedBank;
use crate::line::LineId;
use crate::meter::{LedLevels, LevelTable};
use crate::morse::Representation;

/// Calibration constants shared by the bit-clock and the converters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Calibration {
    /// Voltage at full scale
    pub reference_voltage: f32,
    /// Result bits per ADC conversion
    pub adc_width: u8,
    /// Minimum clock half-period
    pub half_period: Duration,
    /// Morse timing unit
    pub morse_unit: Duration,
}

impl Calibration {
    /// Largest raw code for `adc_width` bits
    pub fn full_scale(&self) -> u16 {
        match self.adc_width {
            0 => 0,
            w if w >= 16 => u16::MAX,
            w => (1u16 << w) - 1,
        }
    }

    /// Voltage for a raw code, `raw / full_scale * reference_voltage`
    pub fn to_voltage(&self, raw: u16) -> f32 {
        let full_scale = self.full_scale();
        if full_scale == 0 {
            return 0.0;
        }
        raw.min(full_scale) as f32 / full_scale as f32 * self.reference_voltage
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            reference_voltage: 3.3,
            adc_width: 12,
            half_period: Duration::from_micros(1),
            morse_unit: Duration::from_secs(1),
        }
    }
}

/// MAX7219 lines
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayPins {
    pub din: LineId,
    pub clk: LineId,
    pub load: LineId,
}

/// 74HC165 lines
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwitchPins {
    pub pl: LineId,
    pub q7: LineId,
    pub ce: LineId,
    pub cp: LineId,
}

/// MCP3201 lines
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdcPins {
    pub clk: LineId,
    pub dout: LineId,
    pub cs: LineId,
}

/// 74HC595 lines
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LedPins {
    pub ds: LineId,
    pub shcp: LineId,
    pub stcp: LineId,
}

/// Line numbers for every peripheral
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinMap {
    pub display: DisplayPins,
    pub switches: SwitchPins,
    pub adc: AdcPins,
    pub leds: LedPins,
}

impl Default for PinMap {
    fn default() -> Self {
        PinMap {
            display: DisplayPins {
                din: 19,
                clk: 23,
                load: 24,
            },
            switches: SwitchPins {
                pl: 35,
                q7: 37,
                ce: 31,
                cp: 29,
            },
            adc: AdcPins {
                clk: 12,
                dout: 38,
                cs: 40,
            },
            leds: LedPins {
                ds: 13,
                shcp: 6,
                stcp: 15,
            },
        }
    }
}

/// Morse indicator settings
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MorseConfig {
    pub representation: Representation,
    /// Matrix rows lit for a mark
    pub rows: [u8; 2],
}

impl Default for MorseConfig {
    fn default() -> Self {
        MorseConfig {
            representation: Representation::Dot,
            rows: [4, 5],
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    pub pins: PinMap,
    pub calibration: Calibration,
    /// MAX7219 intensity register value, 0x00 to 0x0f
    pub brightness: u8,
    pub morse: MorseConfig,
    pub levels: LevelTable,
    /// LEDs on the 74HC595
    pub led_bank: LedBank,
    pub led_levels: LedLevels,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pins: PinMap::default(),
            calibration: Calibration::default(),
            brightness: 0x01,
            morse: MorseConfig::default(),
            levels: LevelTable::default(),
            led_bank: LedBank::default(),
            led_levels: LedLevels::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lsb(calibration: &Calibration) -> f32 {
        calibration.reference_voltage / calibration.full_scale() as f32
    }

    #[test]
    fn test_voltage_endpoints() {
        let cal = Calibration::default();
        assert_eq!(cal.full_scale(), 4095);
        assert_eq!(cal.to_voltage(0), 0.0);
        assert!((cal.to_voltage(4095) - 3.3).abs() < 1e-6);
    }

    #[test]
    fn test_voltage_midpoint_within_one_lsb() {
        let cal = Calibration::default();
        let half = cal.reference_voltage / 2.0;
        assert!((cal.to_voltage(2047) - half).abs() <= lsb(&cal));
        assert!((cal.to_voltage(2048) - half).abs() <= lsb(&cal));
    }

    #[test]
    fn test_voltage_is_monotonic() {
        let cal = Calibration::default();
        let mut last = -1.0;
        for raw in 0..=cal.full_scale() {
            let v = cal.to_voltage(raw);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn test_voltage_follows_reference() {
        let cal = Calibration {
            reference_voltage: 5.0,
            adc_width: 10,
            ..Calibration::default()
        };
        assert_eq!(cal.full_scale(), 1023);
        assert!((cal.to_voltage(1023) - 5.0).abs() < 1e-6);
        assert!((cal.to_voltage(u16::MAX) - 5.0).abs() < 1e-6);
    }
}
