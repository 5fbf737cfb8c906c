//! Driver for the STM32F0 ADC as an [`AnalogSampler`].
//!
//! Like the rest of the register-level drivers here, `Adc::new` takes the ADC
//! registers directly rather than accepting a PAC peripheral from the caller,
//! so that the HAL and this crate do not have to agree on a PAC version. Don't
//! touch the ADC registers elsewhere in the application while an `Adc` is
//! alive.
//!
//! Conversions are single-shot and blocking. The analog pins themselves must
//! be put in analog mode by the application.

use stm32f0::stm32f0x1 as pac;

use crate::AnalogSampler;

/// Highest external channel number on the F0 ADC
const MAX_CHANNEL: usize = 15;

#[derive(Clone, Copy, Debug)]
pub enum Resolution {
    Bits12 = 0b00,
    Bits10 = 0b01,
    Bits8 = 0b10,
    Bits6 = 0b11,
}

impl Resolution {
    /// The largest code a conversion can return
    pub fn full_scale(&self) -> i32 {
        match self {
            Self::Bits12 => 4095,
            Self::Bits10 => 1023,
            Self::Bits8 => 255,
            Self::Bits6 => 63,
        }
    }
}

#[derive(Clone, Copy, Debug)]
/// How many ADC clock cycles the input is sampled for
pub enum SampleTime {
    T1_5 = 0b000,
    T7_5 = 0b001,
    T13_5 = 0b010,
    T28_5 = 0b011,
    T41_5 = 0b100,
    T55_5 = 0b101,
    T71_5 = 0b110,
    T239_5 = 0b111,
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub resolution: Option<Resolution>,
    pub sample_time: Option<SampleTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcError {
    InvalidChannel(usize),
}

/// Default resolution if not provided
const DEFAULT_RESOLUTION: Resolution = Resolution::Bits12;
/// Default sampling time if not provided. Electrode sources are high impedance,
/// so err on the long side.
const DEFAULT_SAMPLE_TIME: SampleTime = SampleTime::T71_5;

pub struct Adc {
    adc: &'static pac::adc::RegisterBlock,
    full_scale: i32,
    selected: Option<usize>,
}

impl Adc {
    pub fn new(config: Option<Config>) -> Self {
        // Enable the ADC periph clock
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adcen().set_bit());
        rcc.apb2rstr.modify(|_, w| w.adcrst().set_bit());
        rcc.apb2rstr.modify(|_, w| w.adcrst().clear_bit());

        let config = config.unwrap_or(Config {
            resolution: None,
            sample_time: None,
        });
        let resolution = config.resolution.unwrap_or(DEFAULT_RESOLUTION);
        let adc = unsafe { &*pac::ADC::ptr() };

        // Clock from PCLK/2 so the HSI14 oscillator isn't needed
        adc.cfgr2.write(|w| unsafe { w.bits(0b01 << 30) });

        // Calibrate while disabled
        adc.cr.modify(|_, w| w.adcal().set_bit());
        while adc.cr.read().adcal().bit_is_set() {}

        // Single conversion, right aligned
        adc.cfgr1.write(|w| unsafe { w.bits((resolution as u32) << 3) });
        adc.smpr.write(|w| unsafe {
            w.bits(config.sample_time.unwrap_or(DEFAULT_SAMPLE_TIME) as u32)
        });

        // Clear ADRDY, enable, and wait until ready
        adc.isr.write(|w| unsafe { w.bits(1) });
        adc.cr.modify(|_, w| w.aden().set_bit());
        while adc.isr.read().adrdy().bit_is_clear() {}

        Self {
            adc,
            full_scale: resolution.full_scale(),
            selected: None,
        }
    }

    /// Code corresponding to VDDA
    pub fn full_scale(&self) -> i32 {
        self.full_scale
    }

    /// Start a conversion and block until it is complete
    fn convert(&mut self) -> u16 {
        self.adc.cr.modify(|_, w| w.adstart().set_bit());
        while self.adc.isr.read().eoc().bit_is_clear() {}
        // Reading DR clears EOC
        self.adc.dr.read().bits() as u16
    }
}

impl AnalogSampler for Adc {
    type Error = AdcError;

    fn select_channel(&mut self, channel: usize) -> Result<(), AdcError> {
        if channel > MAX_CHANNEL {
            return Err(AdcError::InvalidChannel(channel));
        }
        // CHSELR may only be written while no conversion is running, which
        // always holds here since conversions block.
        self.adc.chselr.write(|w| unsafe { w.bits(1 << channel) });
        self.selected = Some(channel);
        Ok(())
    }

    fn read(&mut self, channel: usize) -> Result<i32, AdcError> {
        if self.selected != Some(channel) {
            self.select_channel(channel)?;
        }
        Ok(self.convert() as i32)
    }
}
