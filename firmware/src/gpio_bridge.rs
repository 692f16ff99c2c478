//! Register-level GPIO driver for the bridge header pins.
//!
//! Header pins are addressed by a flat index: 0..=15 map to PA0..PA15 and
//! 16..=31 map to PB0..PB15. Pins claimed by the debug console, the host
//! link and the trigger bus are reserved and rejected with `InvalidPin`.
//!
//! The driver goes through the raw port registers instead of the HAL pin
//! types because an operation may reconfigure the same pin between input,
//! output and waveform mode several times, and the HAL's move-based type
//! states cannot express that from behind a trait object.

use pulsebridge_common::gpio::GpioBridge;
use pulsebridge_common::status::Status;
use stm32l0xx_hal::pac;

/// Reserved indices: PA2/PA3 (host link), PB3/PB4/PB5 (trigger bus),
/// PB6/PB7 (debug console).
const RESERVED_MASK: u32 = (1 << 2) | (1 << 3) | (1 << 19) | (1 << 20) | (1 << 21) | (1 << 22) | (1 << 23);

/// The only index with a timer channel routed to it (PA6, TIM22_CH1).
const WAVEFORM_PIN: u16 = 6;

/// MODER field values.
const MODE_INPUT: u32 = 0b00;
const MODE_OUTPUT: u32 = 0b01;
const MODE_ALTERNATE: u32 = 0b10;
const MODE_ANALOG: u32 = 0b11;

pub struct RawGpioBridge {
    _private: (),
}

impl RawGpioBridge {
    /// Take ownership of the header pins.
    ///
    /// Correctness: The caller must guarantee that no other code touches
    /// GPIOA/GPIOB pins outside `RESERVED_MASK` after this point. The HAL
    /// keeps the reserved pins; everything else belongs to this driver.
    pub unsafe fn new() -> Self {
        let rcc = &*pac::RCC::ptr();
        rcc.iopenr
            .modify(|_, w| w.iopaen().set_bit().iopben().set_bit());
        Self { _private: () }
    }

    fn port_and_line(pin: u16) -> Result<(&'static pac::gpioa::RegisterBlock, u8), Status> {
        if pin >= 32 || RESERVED_MASK & (1 << pin) != 0 {
            return Err(Status::InvalidPin);
        }
        // Correctness: `new` took ownership of all non-reserved pins on
        // both ports, and the timing core runs one operation at a time.
        // GPIOB shares the GPIOA register layout.
        let port = unsafe {
            if pin < 16 {
                &*pac::GPIOA::ptr()
            } else {
                &*(pac::GPIOB::ptr() as *const pac::gpioa::RegisterBlock)
            }
        };
        Ok((port, (pin % 16) as u8))
    }

    fn mode(port: &pac::gpioa::RegisterBlock, line: u8) -> u32 {
        (port.moder.read().bits() >> (line * 2)) & 0b11
    }

    fn set_mode(port: &pac::gpioa::RegisterBlock, line: u8, mode: u32) {
        let shift = line * 2;
        port.moder.modify(|r, w| unsafe {
            w.bits((r.bits() & !(0b11 << shift)) | (mode << shift))
        });
    }

    fn set_floating(port: &pac::gpioa::RegisterBlock, line: u8) {
        let shift = line * 2;
        port.pupdr
            .modify(|r, w| unsafe { w.bits(r.bits() & !(0b11 << shift)) });
    }
}

impl GpioBridge for RawGpioBridge {
    fn configure_input(&mut self, pin: u16) -> Result<(), Status> {
        let (port, line) = Self::port_and_line(pin)?;
        Self::set_floating(port, line);
        Self::set_mode(port, line, MODE_INPUT);
        Ok(())
    }

    fn configure_output(&mut self, pin: u16, level: bool) -> Result<(), Status> {
        let (port, line) = Self::port_and_line(pin)?;
        // A pin still owned by the waveform unit must be released first.
        if Self::mode(port, line) == MODE_ALTERNATE {
            return Err(Status::ConfigFailed);
        }
        // Preload the output latch so the pin never glitches through the
        // opposite level when the mode switches.
        self.write_level(pin, level)?;
        Self::set_mode(port, line, MODE_OUTPUT);
        Ok(())
    }

    fn read_level(&mut self, pin: u16) -> Result<bool, Status> {
        let (port, line) = Self::port_and_line(pin)?;
        // The input data register only tracks the pad in input mode; a
        // released (analog) or waveform pin is not readable.
        match Self::mode(port, line) {
            MODE_INPUT | MODE_OUTPUT => Ok(port.idr.read().bits() & (1 << line) != 0),
            _ => Err(Status::InvalidPin),
        }
    }

    fn write_level(&mut self, pin: u16, level: bool) -> Result<(), Status> {
        let (port, line) = Self::port_and_line(pin)?;
        let bit = if level { 1 << line } else { 1 << (line + 16) };
        port.bsrr.write(|w| unsafe { w.bits(bit) });
        Ok(())
    }

    fn release(&mut self, pin: u16) -> Result<(), Status> {
        let (port, line) = Self::port_and_line(pin)?;
        if pin == WAVEFORM_PIN && Self::mode(port, line) == MODE_ALTERNATE {
            stop_waveform_timer();
        }
        Self::set_floating(port, line);
        Self::set_mode(port, line, MODE_ANALOG);
        Ok(())
    }

    fn configure_waveform(&mut self, pin: u16, period: u32, threshold: u32) -> Result<(), Status> {
        let (port, line) = Self::port_and_line(pin)?;
        if pin != WAVEFORM_PIN {
            return Err(Status::ConfigFailed);
        }
        if period == 0 || period > 0xffff || threshold > period {
            return Err(Status::InvalidArgument);
        }
        start_waveform_timer(period as u16, threshold as u16);

        // Route TIM22_CH1 to PA6 (AF5), then hand the pad to the timer.
        let shift = line * 4;
        port.afrl.modify(|r, w| unsafe {
            w.bits((r.bits() & !(0b1111 << shift)) | (5 << shift))
        });
        Self::set_mode(port, line, MODE_ALTERNATE);
        Ok(())
    }
}

/// Drive TIM22 channel 1 as a PWM source in high-frequency (core clock)
/// mode: counts to `period`, output active below `threshold`.
fn start_waveform_timer(period: u16, threshold: u16) {
    // Correctness: TIM22 is used exclusively for waveform output, and only
    // one operation runs at a time.
    unsafe {
        let rcc = &*pac::RCC::ptr();
        rcc.apb2enr.modify(|_, w| w.tim22en().set_bit());
        rcc.apb2rstr.modify(|_, w| w.tim22rst().set_bit());
        rcc.apb2rstr.modify(|_, w| w.tim22rst().clear_bit());

        let tim = &*pac::TIM22::ptr();
        tim.psc.write(|w| w.psc().bits(0));
        tim.arr.write(|w| w.bits(period as u32));
        tim.ccr1.write(|w| w.bits(threshold as u32));
        // PWM mode 1 with preload on channel 1
        tim.ccmr1_output().modify(|_, w| w.oc1m().bits(0b110).oc1pe().set_bit());
        tim.ccer.modify(|_, w| w.cc1e().set_bit());
        tim.egr.write(|w| w.ug().set_bit());
        tim.cr1.modify(|_, w| w.cen().set_bit());
    }
}

fn stop_waveform_timer() {
    // Correctness: see `start_waveform_timer`.
    unsafe {
        let tim = &*pac::TIM22::ptr();
        tim.ccer.modify(|_, w| w.cc1e().clear_bit());
        tim.cr1.modify(|_, w| w.cen().clear_bit());
    }
}
