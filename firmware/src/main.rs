#![no_main]
#![no_std]
#![cfg(target_arch = "arm")]

// Libcore
use core::fmt::Write;

// Third party
use panic_persist as _;
use rtic::app;
use stm32l0xx_hal::gpio::{
    gpiob::{PB3, PB4, PB5},
    Analog,
};
use stm32l0xx_hal::prelude::*;
use stm32l0xx_hal::{self as hal, pac, serial, spi, time};

// Modules
mod channel;
mod dispatch;
mod gpio_bridge;
mod tick_timer;
mod trigger_bus;

// Crate-internal
use channel::{HostLink, MAX_FRAME_LEN};
use dispatch::Dispatcher;
use gpio_bridge::RawGpioBridge;
use tick_timer::{ExtendedTim2, TIMER_CONFIG};
use trigger_bus::SpiTriggerBus;

type TriggerSpi = spi::Spi<pac::SPI1, (PB3<Analog>, PB4<Analog>, PB5<Analog>)>;

const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[app(device = stm32l0xx_hal::pac, peripherals = true)]
const APP: () = {
    struct Resources {
        // Serial debug output
        debug: hal::serial::Serial<pac::USART1>,

        // Framed request/reply link to the host
        link: HostLink<hal::serial::Serial<pac::LPUART1>>,

        // Timing services behind the hardware capabilities
        dispatcher: Dispatcher<RawGpioBridge, ExtendedTim2, SpiTriggerBus<TriggerSpi>>,
    }

    #[init]
    fn init(ctx: init::Context) -> init::LateResources {
        let _p: rtic::Peripherals = ctx.core;
        let dp: pac::Peripherals = ctx.device;

        // Clock configuration. Use HSI at 16 MHz; the tick scale constants
        // assume this core clock.
        let mut rcc = dp.RCC.freeze(hal::rcc::Config::hsi16());

        // Get access to GPIOs
        let gpioa = dp.GPIOA.split(&mut rcc);
        let gpiob = dp.GPIOB.split(&mut rcc);

        // Initialize serial port(s)
        let mut debug = serial::Serial::usart1(
            dp.USART1,
            gpiob.pb6.into_floating_input(),
            gpiob.pb7.into_floating_input(),
            serial::Config {
                baudrate: time::Bps(57_600),
                wordlength: serial::WordLength::DataBits8,
                parity: serial::Parity::ParityNone,
                stopbits: serial::StopBits::STOP1,
            },
            &mut rcc,
        )
        .unwrap();
        let host = serial::Serial::lpuart1(
            dp.LPUART1,
            gpioa.pa2.into_floating_input(),
            gpioa.pa3.into_floating_input(),
            serial::Config {
                baudrate: time::Bps(57_600),
                wordlength: serial::WordLength::DataBits8,
                parity: serial::Parity::ParityNone,
                stopbits: serial::StopBits::STOP1,
            },
            &mut rcc,
        )
        .unwrap();

        // Show version
        writeln!(
            debug,
            "Booting: Pulsebridge firmware={} tick_scale={}",
            FIRMWARE_VERSION,
            TIMER_CONFIG.ticks_per_ms,
        )
        .unwrap();

        // Check whether we just woke up after a panic
        if let Some(msg) = panic_persist::get_panic_message_utf8() {
            // If yes, send backtrace via serial
            writeln!(debug, "=== 🔥 FOUND PANIC 🔥 ===").ok();
            writeln!(debug, "{}", msg.trim_end()).ok();
            writeln!(debug, "==== 🚒 END PANIC 🚒 ====").ok();
        }

        // Initialize the trigger bus. Mode 3 per the register-map SPI
        // convention of the evaluated devices.
        writeln!(debug, "Initialize SPI trigger bus").unwrap();
        let trigger_spi = dp.SPI1.spi(
            (gpiob.pb3, gpiob.pb4, gpiob.pb5),
            spi::MODE_3,
            2.mhz(),
            &mut rcc,
        );

        // Initialize the tick counter
        writeln!(debug, "Initialize tick counter (TIM2)").unwrap();
        let timer = ExtendedTim2::new(dp.TIM2);

        // Take over the header pins.
        //
        // Correctness: All pins the HAL still owns at this point (host
        // link, debug console, trigger bus) are in the bridge's reserved
        // set, so the raw driver and the HAL never touch the same pad.
        let gpio = unsafe { RawGpioBridge::new() };

        let dispatcher = Dispatcher::new(gpio, timer, SpiTriggerBus::new(trigger_spi), TIMER_CONFIG);

        writeln!(debug, "Initialization done").unwrap();

        init::LateResources {
            debug,
            link: HostLink::new(host),
            dispatcher,
        }
    }

    /// Request pump: one frame in, one operation run to completion, one
    /// reply frame out. Requests are serialized by construction.
    #[idle(resources = [debug, link, dispatcher])]
    fn idle(ctx: idle::Context) -> ! {
        let debug = ctx.resources.debug;
        let link = ctx.resources.link;
        let dispatcher = ctx.resources.dispatcher;

        let mut frame_buf = [0u8; MAX_FRAME_LEN];
        let mut reply_buf = [0u8; MAX_FRAME_LEN];

        loop {
            let frame = link.read_frame(&mut frame_buf);
            if cfg!(feature = "dev") {
                writeln!(
                    debug,
                    "Request: command=0x{:02x} len={}",
                    frame.first().copied().unwrap_or(0),
                    frame.len(),
                )
                .ok();
            }
            let reply_len = dispatcher.handle(frame, &mut reply_buf);
            link.write_frame(&reply_buf[..reply_len]);
        }
    }
};
