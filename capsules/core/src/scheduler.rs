// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Arbitrary length timeouts and intervals on top of a narrow hardware
//! counter.
//!
//! `DeadlineScheduler` owns one [`TimebaseDriver`] and provides a single
//! [`DeadlineTimer`] slot on it. A request is resolved to a timebase and
//! split into full counter periods plus a final partial period (see
//! [`crate::deadline`]). Each elapsed-tick event then counts down one period.
//! When no periods remain the partial period is loaded, and the event after
//! that is the deadline.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let sched = static_init!(
//!     DeadlineScheduler<'static, Timer2<'static, Freq16MHz>>,
//!     DeadlineScheduler::new(&peripherals.timer2)
//! );
//! peripherals.timer2.set_tick_client(sched);
//! sched.set_interval_us(blinker, 500_000)?;
//! ```
//!
//! All state changes from the main thread happen with the driver's events
//! disabled, so the interrupt handler never sees a half written schedule.
//! Callbacks run in interrupt context, after the schedule has already been
//! cleared (timeout) or reloaded (interval), so a callback may freely clear
//! or re-arm the timer.

use core::cell::Cell;

use kernel::config::CONFIG;
use kernel::debug;
use kernel::hil::time::{
    DeadlineClient, DeadlineTimer, Mode, TickClient, TimeUnit, Timebase, TimebaseDriver,
};
use kernel::ErrorCode;

use crate::deadline::{self, Decomposition};

/// One timeout or interval slot on top of a [`TimebaseDriver`].
pub struct DeadlineScheduler<'a, T: TimebaseDriver<'a>> {
    driver: &'a T,
    mode: Cell<Mode>,
    client: Cell<Option<&'a dyn DeadlineClient>>,
    timebase: Cell<Option<Timebase>>,
    /// Full periods still to elapse before the remainder is loaded.
    overflows: Cell<u32>,
    /// Ticks of the final period not yet loaded, `0` once loaded.
    remainder: Cell<u32>,
    /// Decomposition of the armed request, replayed on every interval.
    saved: Cell<Decomposition>,
}

impl<'a, T: TimebaseDriver<'a>> DeadlineScheduler<'a, T> {
    pub const fn new(driver: &'a T) -> DeadlineScheduler<'a, T> {
        DeadlineScheduler {
            driver,
            mode: Cell::new(Mode::Off),
            client: Cell::new(None),
            timebase: Cell::new(None),
            overflows: Cell::new(0),
            remainder: Cell::new(0),
            saved: Cell::new(Decomposition::ZERO),
        }
    }

    /// Full periods left before the final partial period.
    pub fn overflows_remaining(&self) -> u32 {
        self.overflows.get()
    }

    /// Ticks of the final partial period that have not been loaded yet.
    pub fn remainder(&self) -> u32 {
        self.remainder.get()
    }

    /// Decomposition of the most recently armed request. It survives `clear`.
    pub fn saved_decomposition(&self) -> Decomposition {
        self.saved.get()
    }

    /// Timebase the driver was last configured with.
    pub fn timebase(&self) -> Option<Timebase> {
        self.timebase.get()
    }

    /// Run `f` with the driver's events masked. Events are unmasked again
    /// only if `f` leaves a deadline armed.
    fn with_events_suppressed<R>(&self, f: impl FnOnce() -> R) -> R {
        self.driver.disable_events();
        let result = f();
        if self.mode.get() != Mode::Off {
            self.driver.enable_events();
        }
        result
    }

    /// Reset the live schedule. The client, timebase and saved decomposition
    /// are kept.
    fn reset(&self) {
        self.mode.set(Mode::Off);
        self.overflows.set(0);
        self.remainder.set(0);
    }

    fn arm(
        &self,
        mode: Mode,
        client: &'a dyn DeadlineClient,
        duration: u64,
        unit: TimeUnit,
    ) -> Result<(), ErrorCode> {
        self.with_events_suppressed(|| {
            // Whatever was armed before is replaced, even if this request
            // turns out to be invalid.
            self.reset();
            let plan = deadline::plan(self.driver.timebases(), duration, unit)?;
            let decomposition = plan.decomposition;

            self.client.set(Some(client));
            self.driver.configure(&plan.timebase);
            self.timebase.set(Some(plan.timebase));
            let compensate = self.driver.raises_event_on_arm();
            self.saved.set(decomposition);
            self.overflows.set(decomposition.armed_overflows(compensate));
            self.remainder.set(decomposition.remainder());

            if decomposition.fits_single_period() {
                self.driver.load_partial(decomposition.remainder());
                if !compensate {
                    self.remainder.set(0);
                }
                // Otherwise the stale event consumes the extra overflow unit
                // and reloads the partial period.
            } else {
                self.driver.arm_period();
            }

            if CONFIG.trace_deadlines {
                debug!(
                    "deadline: {:?} {} overflows + {} ticks, /{} of {}Hz",
                    mode,
                    decomposition.overflows(),
                    decomposition.remainder(),
                    plan.timebase.divisor(),
                    plan.timebase.clock_hz()
                );
            }

            self.mode.set(mode);
            Ok(())
        })
    }

    /// Start the next interval from the saved decomposition. No extra
    /// overflow unit is added, the counter is already running.
    fn rearm_interval(&self) {
        let saved = self.saved.get();
        if saved.fits_single_period() {
            self.driver.load_partial(saved.remainder());
            self.overflows.set(0);
            self.remainder.set(0);
        } else {
            self.overflows.set(saved.overflows());
            self.remainder.set(saved.remainder());
            // The period that just ended was a partial one.
            if saved.remainder() > 0 {
                self.driver.arm_period();
            }
        }
    }

    fn fire(&self, mode: Mode) {
        if CONFIG.trace_deadlines {
            debug!("deadline: {:?} fired", mode);
        }
        if let Some(client) = self.client.get() {
            client.fired();
        }
    }
}

impl<'a, T: TimebaseDriver<'a>> TickClient for DeadlineScheduler<'a, T> {
    fn tick_elapsed(&self) {
        if self.mode.get() == Mode::Off {
            // Late event from a cleared schedule.
            if CONFIG.trace_deadlines {
                debug!("deadline: stale tick ignored");
            }
            return;
        }

        let overflows = self.overflows.get();
        if overflows > 0 {
            self.overflows.set(overflows - 1);
        }

        if self.overflows.get() > 0 {
            // The counter has already started another full period.
            return;
        }

        let remainder = self.remainder.get();
        if remainder > 0 {
            self.driver.load_partial(remainder);
            self.remainder.set(0);
            return;
        }

        match self.mode.get() {
            Mode::Timeout => {
                self.driver.disable_events();
                self.reset();
                self.fire(Mode::Timeout);
            }
            Mode::Interval => {
                self.rearm_interval();
                self.fire(Mode::Interval);
            }
            Mode::Off => {}
        }
    }
}

impl<'a, T: TimebaseDriver<'a>> DeadlineTimer<'a> for DeadlineScheduler<'a, T> {
    fn set_interval(
        &self,
        client: &'a dyn DeadlineClient,
        duration: u64,
        unit: TimeUnit,
    ) -> Result<(), ErrorCode> {
        self.arm(Mode::Interval, client, duration, unit)
    }

    fn set_timeout(
        &self,
        client: &'a dyn DeadlineClient,
        duration: u64,
        unit: TimeUnit,
    ) -> Result<(), ErrorCode> {
        self.arm(Mode::Timeout, client, duration, unit)
    }

    fn clear(&self) {
        if CONFIG.trace_deadlines && self.mode.get() != Mode::Off {
            debug!("deadline: {:?} cleared", self.mode.get());
        }
        self.with_events_suppressed(|| self.reset());
    }

    fn mode(&self) -> Mode {
        self.mode.get()
    }
}
