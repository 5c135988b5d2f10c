//! Tracker-tick timer.
//!
//! A pre-settable down-counter clocked once per audio sample. When it runs
//! out it reloads and bumps a fire counter; the foreground polls
//! [`TickTimer::is_fired`] to learn that one or more tracker ticks elapsed.
//! New periods are staged by the foreground and installed by the next
//! interrupt clock, so the counter and period never tear.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

/// Audio-clock divider marking tracker ticks.
#[derive(Debug)]
pub struct TickTimer {
    // Written and read from the interrupt only.
    counter: u16,
    period: u16,

    // Foreground stages a period, the interrupt installs it.
    new_period: AtomicU16,
    load_new_period: AtomicBool,

    fire_counter: AtomicU8,
    fire_counter_last: u8,
}

impl TickTimer {
    /// Create a timer with the given initial period.
    pub fn new(period: u16) -> Self {
        Self {
            counter: period,
            period,
            new_period: AtomicU16::new(period),
            load_new_period: AtomicBool::new(false),
            fire_counter: AtomicU8::new(0),
            fire_counter_last: 0,
        }
    }

    /// Restart the countdown from `period` and drop pending fires.
    pub fn reset(&mut self, period: u16) {
        self.counter = period;
        self.period = period;
        self.new_period.store(period, Ordering::Relaxed);
        self.load_new_period.store(false, Ordering::Release);
        self.fire_counter.store(0, Ordering::Relaxed);
        self.fire_counter_last = 0;
    }

    /// Most recently requested period.
    #[inline]
    pub fn period(&self) -> u16 {
        self.new_period.load(Ordering::Relaxed)
    }

    /// Stage a new period for the next interrupt clock.
    ///
    /// At most one change is in flight: a second call waits until the
    /// interrupt has consumed the previous one.
    pub fn set_period(&self, new_period: u16) {
        while self.load_new_period.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }

        self.new_period.store(new_period, Ordering::Relaxed);
        self.load_new_period.store(true, Ordering::Release);
    }

    /// Advance one audio sample. Called from the interrupt.
    #[inline]
    pub fn clock(&mut self) {
        if self.load_new_period.load(Ordering::Acquire) {
            let period = self.new_period.load(Ordering::Relaxed);
            self.period = period;
            self.counter = period;
            self.load_new_period.store(false, Ordering::Release);
        }

        self.counter = self.counter.wrapping_sub(1);
        if self.counter == 0 {
            self.counter = self.period;
            let fired = self.fire_counter.load(Ordering::Relaxed);
            self.fire_counter
                .store(fired.wrapping_add(1), Ordering::Release);
        }
    }

    /// True once per fire since the previous call.
    pub fn is_fired(&mut self) -> bool {
        let counter = self.fire_counter.load(Ordering::Acquire);

        if counter == self.fire_counter_last {
            return false;
        }

        self.fire_counter_last = counter;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_period() {
        let mut timer = TickTimer::new(4);

        for _ in 0..3 {
            timer.clock();
            assert!(!timer.is_fired());
        }

        timer.clock();
        assert!(timer.is_fired());
        // Only reported once per fire.
        assert!(!timer.is_fired());

        for _ in 0..4 {
            timer.clock();
        }
        assert!(timer.is_fired());
    }

    #[test]
    fn test_staged_period_applies_on_next_clock() {
        let mut timer = TickTimer::new(10);
        timer.clock();

        timer.set_period(2);
        assert_eq!(timer.period(), 2);

        // The staged value replaces both counter and period.
        timer.clock();
        timer.clock();
        assert!(timer.is_fired());

        timer.clock();
        timer.clock();
        assert!(timer.is_fired());
    }

    #[test]
    fn test_reset_drops_pending_fire() {
        let mut timer = TickTimer::new(1);
        timer.clock();
        timer.reset(5);
        assert!(!timer.is_fired());
        assert_eq!(timer.period(), 5);
    }
}
