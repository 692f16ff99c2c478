//! Tick counter implementation using TIM2.
//!
//! The 16-bit timer is software-extended to 32 bit by incrementing an
//! overflow counter every time the update flag is seen set during a sample.
//! Running from HSI16 with no prescaler, one tick is 62.5 ns and an
//! overflow happens every ~4 ms, so any polling loop in the timing core
//! samples far more often than once per wrap.

use pulsebridge_common::timer::{TickTimer, TimerConfig};
use stm32l0xx_hal::pac;

/// Tick counter increments per millisecond at 16 MHz.
pub const TICKS_PER_MS: u32 = 16_000;

/// Fixed overhead of the microsecond stall helper. Measured experimentally
/// using a cheap logic analyzer, might be slightly off.
pub const STALL_OFFSET_US: u32 = 3;

pub const TIMER_CONFIG: TimerConfig = TimerConfig::new(TICKS_PER_MS, STALL_OFFSET_US);

/// Software-extended TIM2.
pub struct ExtendedTim2 {
    timer: pac::TIM2,
    overflow: u16,
}

impl ExtendedTim2 {
    pub fn new(timer: pac::TIM2) -> Self {
        // Enable and reset TIM2 in RCC
        //
        // Correctness: Since we only modify TIM2 related registers in the
        // RCC register block, and since we own pac::TIM2, we should be safe.
        unsafe {
            let rcc = &*pac::RCC::ptr();

            // Enable timer clock
            rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

            // Reset timer
            rcc.apb1rstr.modify(|_, w| w.tim2rst().set_bit());
            rcc.apb1rstr.modify(|_, w| w.tim2rst().clear_bit());
        }

        // Count the full 16-bit range at the core clock, no prescaler
        timer.psc.write(|w| w.psc().bits(0));
        timer.arr.write(|w| unsafe { w.bits(0xffff) });

        // Trigger update event (UEV) in the event generation register (EGR)
        // in order to immediately apply the config
        timer.egr.write(|w| w.ug().set_bit());

        // The UG write above sets the update flag; clear it so it does not
        // read as a spurious overflow on the first sample.
        timer.sr.modify(|_, w| w.uif().clear_bit());

        // Start counting
        timer.cr1.modify(|_, w| w.cen().set_bit());

        Self { timer, overflow: 0 }
    }
}

impl TickTimer for ExtendedTim2 {
    /// Latch the extended counter value.
    ///
    /// The update flag is folded into the overflow count, then the counter
    /// register is read. If the flag shows set again afterwards the timer
    /// wrapped between the two accesses and the low counter would be paired
    /// with a stale overflow count, so the sample is taken again. With a
    /// wrap only every ~4 ms the loop runs at most twice.
    #[inline(always)]
    fn sample_now(&mut self) -> u32 {
        loop {
            if self.timer.sr.read().uif().bit_is_set() {
                self.timer.sr.modify(|_, w| w.uif().clear_bit());
                self.overflow = self.overflow.wrapping_add(1);
            }
            let counter = self.timer.cnt.read().bits() as u16;
            if self.timer.sr.read().uif().bit_is_clear() {
                return ((self.overflow as u32) << 16) | counter as u32;
            }
        }
    }

    fn reset(&mut self) {
        // All waiting in the timing core is by polling, so the update
        // interrupt stays masked.
        self.timer.dier.modify(|_, w| w.uie().clear_bit());
        self.timer.cnt.write(|w| unsafe { w.bits(0) });
        self.timer.sr.modify(|_, w| w.uif().clear_bit());
        self.overflow = 0;
    }
}
