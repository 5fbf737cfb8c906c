#![no_main]
#![no_std]

use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};
use cortex_m;
use cortex_m_rt::{entry, exception};
use panic_halt as _;

use stm32f0xx_hal as hal;

use prbs_touch::adc::{self, Adc};
use prbs_touch::{JitterConfig, OnComplete, SenseConfig, SensingEngine};

use crate::hal::pac;
use crate::hal::pac::interrupt;
use crate::hal::prelude::*;

use drive::DriveLines;
use report::Command;

mod drive;
mod report;
mod serial;

/// Capacity of the sequence buffers; must hold 2^prbs_length - 1 samples
const SEQ_CAPACITY: usize = 31;
const SENSE_CHANNELS: usize = 7;
const DRIVE_LINES: usize = 5;

static SENSE_CONFIG: SenseConfig = SenseConfig {
    prbs_length: 5,
    seed: 1,
    phase: 0,
    vref: 3.3,
    // Overwritten with the ADC's own full scale at startup
    full_scale_code: 4095,
    noise_threshold: 0.5,
    // ~10us at 48MHz
    settle_ticks: 480,
    calibration_passes: 4,
    jitter: JitterConfig {
        enabled: true,
        samples: 1000,
        settle_ms: 5000,
        on_complete: OnComplete::Stop,
    },
};

/// Time after reset before the baseline is captured. Keep hands off the panel.
const CALIBRATION_DELAY_MS: u32 = 500;
/// Minimum time between the start of two frames
const FRAME_PERIOD_MS: u32 = 50;

static TIME: AtomicU32 = AtomicU32::new(0);

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut flash = dp.FLASH;
    let mut rcc = dp.RCC.configure().sysclk(48.mhz()).freeze(&mut flash);
    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);

    // A library requiring a critical section to set a gpio mode register is bad and I just won't.
    let fake_cs = unsafe { cortex_m::interrupt::CriticalSection::new() };

    // Sense electrodes, ADC channels 0 through 6
    let _sense0 = gpioa.pa0.into_analog(&fake_cs);
    let _sense1 = gpioa.pa1.into_analog(&fake_cs);
    let _sense2 = gpioa.pa2.into_analog(&fake_cs);
    let _sense3 = gpioa.pa3.into_analog(&fake_cs);
    let _sense4 = gpioa.pa4.into_analog(&fake_cs);
    let _sense5 = gpioa.pa5.into_analog(&fake_cs);
    let _sense6 = gpioa.pa6.into_analog(&fake_cs);

    // Drive electrodes, in drive line order
    let lines: DriveLines<DRIVE_LINES> = DriveLines::new([
        gpiob.pb8.into_push_pull_output(&fake_cs).downgrade(),
        gpiob.pb9.into_push_pull_output(&fake_cs).downgrade(),
        gpiob.pb10.into_push_pull_output(&fake_cs).downgrade(),
        gpiob.pb11.into_push_pull_output(&fake_cs).downgrade(),
        gpiob.pb12.into_push_pull_output(&fake_cs).downgrade(),
    ]);

    let mut syst = hal::timers::Timer::syst(cp.SYST, 1.khz(), &mut rcc);
    syst.listen(&hal::timers::Event::TimeOut);

    let tx_pin = gpiob.pb6.into_alternate_af0(&fake_cs);
    let rx_pin = gpiob.pb7.into_alternate_af0(&fake_cs);
    let uart = hal::serial::Serial::usart1(dp.USART1, (tx_pin, rx_pin), 115200.bps(), &mut rcc);
    serial::uart1::init(uart, 4);
    let mut writer = serial::uart1::writer();

    let adc = Adc::new(Some(adc::Config {
        resolution: Some(adc::Resolution::Bits12),
        sample_time: None,
    }));

    let mut config = SENSE_CONFIG;
    config.full_scale_code = adc.full_scale();
    let mut engine: SensingEngine<_, _, SEQ_CAPACITY, SENSE_CHANNELS, DRIVE_LINES> =
        SensingEngine::new(config, lines, adc).unwrap();

    while TIME.load(Ordering::Relaxed) < CALIBRATION_DELAY_MS {}
    report::calibration(&mut writer, &engine.calibrate()).ok();

    let mut next_time = 0;

    loop {
        match serial::uart1::next_command() {
            Some(Command::Calibrate) => {
                report::calibration(&mut writer, &engine.calibrate()).ok();
            }
            Some(Command::ResetJitter) => engine.reset_jitter(),
            Some(Command::Shutdown) => break,
            None => (),
        }

        let time = TIME.load(Ordering::Relaxed);
        if time >= next_time {
            next_time = time + FRAME_PERIOD_MS;

            match engine.cycle(time) {
                Ok(frame) => report::frame(&mut writer, &frame).ok(),
                Err(err) => report::error(&mut writer, &err).ok(),
            };
        }
    }

    // Electrodes are parked low before the hardware is let go
    match engine.release() {
        Ok(_hw) => writer.write_str("SHUTDOWN\r\n").ok(),
        Err((err, _engine)) => report::error(&mut writer, &err).ok(),
    };

    // The USART interrupt keeps draining the TX queue
    loop {
        cortex_m::asm::wfi();
    }
}

#[exception]
fn SysTick() {
    let time = TIME.load(Ordering::Relaxed);
    TIME.store(time + 1, Ordering::Relaxed);
}
