// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! TC3 in 16-bit match frequency mode as a compare timebase.
//!
//! In MFRQ waveform mode CC0 is the top value: the counter runs from zero to
//! CC0, raises MC0, and starts over. A full period uses a top of 0xFFFF, the
//! final partial period of `r` ticks a top of `r - 1`. Only `configure` clears
//! COUNT. Later reloads just move CC0, so ticks counted while the MC0
//! interrupt was pending stay in the period.
//!
//! TC3 is clocked from generic clock generator 0 through the shared
//! TCC2/TC3 clock channel. Writes to CTRLA and COUNT are synchronized to that
//! clock domain, so every such write waits for STATUS.SYNCBUSY to drop.

use core::cell::Cell;
use core::marker::PhantomData;

use kernel::hil::time::{Frequency, Reload, TickClient, Timebase, TimebaseDriver};
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{register_bitfields, register_structs, ReadOnly, ReadWrite};
use kernel::utilities::StaticRef;

register_structs! {
    pub TcCount16Registers {
        (0x00 => ctrla: ReadWrite<u16, CTRLA::Register>),
        (0x02 => readreq: ReadWrite<u16, READREQ::Register>),
        (0x04 => ctrlbclr: ReadWrite<u8, CTRLB::Register>),
        (0x05 => ctrlbset: ReadWrite<u8, CTRLB::Register>),
        (0x06 => ctrlc: ReadWrite<u8>),
        (0x07 => _reserved0),
        (0x08 => dbgctrl: ReadWrite<u8>),
        (0x09 => _reserved1),
        (0x0A => evctrl: ReadWrite<u16>),
        (0x0C => intenclr: ReadWrite<u8, INT::Register>),
        (0x0D => intenset: ReadWrite<u8, INT::Register>),
        /// Write a one to clear a flag.
        (0x0E => intflag: ReadWrite<u8, INT::Register>),
        (0x0F => status: ReadOnly<u8, STATUS::Register>),
        (0x10 => count: ReadWrite<u16>),
        (0x12 => _reserved2),
        (0x18 => cc0: ReadWrite<u16>),
        (0x1A => cc1: ReadWrite<u16>),
        (0x1C => @END),
    },

    pub GclkRegisters {
        (0x00 => ctrl: ReadWrite<u8>),
        (0x01 => status: ReadOnly<u8, STATUS::Register>),
        (0x02 => clkctrl: ReadWrite<u16, CLKCTRL::Register>),
        (0x04 => genctrl: ReadWrite<u32>),
        (0x08 => gendiv: ReadWrite<u32>),
        (0x0C => @END),
    },

    pub PmApbcMask {
        (0x00 => apbcmask: ReadWrite<u32, APBCMASK::Register>),
        (0x04 => @END),
    }
}

register_bitfields![u16,
    CTRLA [
        PRESCSYNC OFFSET(12) NUMBITS(2) [
            Gclk = 0,
            Prescaler = 1,
            Resync = 2
        ],
        RUNSTDBY OFFSET(11) NUMBITS(1) [],
        PRESCALER OFFSET(8) NUMBITS(3) [],
        WAVEGEN OFFSET(5) NUMBITS(2) [
            NormalFrequency = 0,
            MatchFrequency = 1,
            NormalPwm = 2,
            MatchPwm = 3
        ],
        MODE OFFSET(2) NUMBITS(2) [
            Count16 = 0,
            Count8 = 1,
            Count32 = 2
        ],
        ENABLE OFFSET(1) NUMBITS(1) [],
        SWRST OFFSET(0) NUMBITS(1) []
    ],
    READREQ [
        RREQ OFFSET(15) NUMBITS(1) [],
        RCONT OFFSET(14) NUMBITS(1) [],
        ADDR OFFSET(0) NUMBITS(5) []
    ],
    CLKCTRL [
        WRTLOCK OFFSET(15) NUMBITS(1) [],
        CLKEN OFFSET(14) NUMBITS(1) [],
        GEN OFFSET(8) NUMBITS(4) [
            Gclk0 = 0
        ],
        ID OFFSET(0) NUMBITS(6) [
            Tcc2Tc3 = 0x1B
        ]
    ]
];

register_bitfields![u8,
    CTRLB [
        CMD OFFSET(6) NUMBITS(2) [
            NoAction = 0,
            Retrigger = 1,
            Stop = 2
        ],
        ONESHOT OFFSET(2) NUMBITS(1) [],
        DIR OFFSET(0) NUMBITS(1) []
    ],
    INT [
        MC1 OFFSET(5) NUMBITS(1) [],
        MC0 OFFSET(4) NUMBITS(1) [],
        SYNCRDY OFFSET(3) NUMBITS(1) [],
        ERR OFFSET(1) NUMBITS(1) [],
        OVF OFFSET(0) NUMBITS(1) []
    ],
    STATUS [
        SYNCBUSY OFFSET(7) NUMBITS(1) []
    ]
];

register_bitfields![u32,
    APBCMASK [
        TC3 OFFSET(11) NUMBITS(1) []
    ]
];

pub const TC3_BASE: StaticRef<TcCount16Registers> =
    unsafe { StaticRef::new(0x4200_2C00 as *const TcCount16Registers) };
pub const GCLK_BASE: StaticRef<GclkRegisters> =
    unsafe { StaticRef::new(0x4000_0C00 as *const GclkRegisters) };
pub const PM_APBCMASK_BASE: StaticRef<PmApbcMask> =
    unsafe { StaticRef::new(0x4000_0420 as *const PmApbcMask) };

/// Generic clock generator 0 running from the 48MHz DFLL.
#[derive(Debug)]
pub struct Freq48MHz;
impl Frequency for Freq48MHz {
    fn frequency() -> u32 {
        48_000_000
    }
}

/// Prescaler divisors in CTRLA.PRESCALER order.
const PRESCALERS: [u32; 8] = [1, 2, 4, 8, 16, 64, 256, 1024];

const COUNTER_BITS: u8 = 16;

pub struct Tc3<'a, F: Frequency> {
    registers: StaticRef<TcCount16Registers>,
    gclk: StaticRef<GclkRegisters>,
    pm: StaticRef<PmApbcMask>,
    timebases: [Timebase; 8],
    timebase: Cell<Timebase>,
    client: Cell<Option<&'a dyn TickClient>>,
    _frequency: PhantomData<F>,
}

impl<'a, F: Frequency> Tc3<'a, F> {
    pub fn new(
        registers: StaticRef<TcCount16Registers>,
        gclk: StaticRef<GclkRegisters>,
        pm: StaticRef<PmApbcMask>,
    ) -> Tc3<'a, F> {
        let clock = F::frequency();
        let timebases =
            PRESCALERS.map(|divisor| Timebase::new(clock, divisor, COUNTER_BITS, Reload::Compare));
        Tc3 {
            registers,
            gclk,
            pm,
            timebases,
            timebase: Cell::new(timebases[0]),
            client: Cell::new(None),
            _frequency: PhantomData,
        }
    }

    fn sync(&self) {
        while self.registers.status.is_set(STATUS::SYNCBUSY) {}
    }

    /// Route GCLK0 to TC3 and ungate its bus clock.
    pub fn enable_clock(&self) {
        self.pm.apbcmask.modify(APBCMASK::TC3::SET);
        self.gclk
            .clkctrl
            .write(CLKCTRL::ID::Tcc2Tc3 + CLKCTRL::GEN::Gclk0 + CLKCTRL::CLKEN::SET);
        while self.gclk.status.is_set(STATUS::SYNCBUSY) {}
    }

    fn set_top(&self, top: u32) {
        self.registers.cc0.set(top as u16);
        self.sync();
    }

    pub fn handle_interrupt(&self) {
        self.registers.intflag.write(INT::MC0::SET);
        if let Some(client) = self.client.get() {
            client.tick_elapsed();
        }
    }
}

impl<'a, F: Frequency> TimebaseDriver<'a> for Tc3<'a, F> {
    fn set_tick_client(&self, client: &'a dyn TickClient) {
        self.client.set(Some(client));
    }

    fn timebases(&self) -> &[Timebase] {
        &self.timebases
    }

    fn configure(&self, timebase: &Timebase) {
        let Some(index) = PRESCALERS.iter().position(|&d| d == timebase.divisor()) else {
            return;
        };
        let regs = self.registers;
        self.timebase.set(*timebase);

        self.enable_clock();
        regs.ctrla.modify(CTRLA::ENABLE::CLEAR);
        self.sync();
        regs.ctrla.write(
            CTRLA::MODE::Count16
                + CTRLA::WAVEGEN::MatchFrequency
                + CTRLA::PRESCSYNC::Prescaler
                + CTRLA::PRESCALER.val(index as u16),
        );
        self.sync();

        regs.intenclr
            .write(INT::MC1::SET + INT::MC0::SET + INT::SYNCRDY::SET + INT::ERR::SET + INT::OVF::SET);
        regs.intflag
            .write(INT::MC1::SET + INT::MC0::SET + INT::SYNCRDY::SET + INT::ERR::SET + INT::OVF::SET);
        self.set_top(timebase.full_period_top());
        regs.count.set(0);
        self.sync();

        regs.ctrla.modify(CTRLA::ENABLE::SET);
        self.sync();
    }

    fn arm_period(&self) {
        self.set_top(self.timebase.get().full_period_top());
    }

    fn load_partial(&self, ticks: u32) {
        self.set_top(self.timebase.get().compare_top(ticks));
    }

    fn disable_events(&self) {
        self.registers.intenclr.write(INT::MC0::SET);
    }

    fn enable_events(&self) {
        self.registers.intenset.write(INT::MC0::SET);
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use capsules_core::scheduler::DeadlineScheduler;
    use capsules_core::test::fake_timebase::FiredCounter;
    use kernel::hil::time::{DeadlineTimer, Mode};

    struct Io {
        tc: Cell<[u32; 7]>,
        gclk: Cell<[u32; 3]>,
        pm: Cell<u32>,
    }

    impl Io {
        fn new() -> Io {
            Io {
                tc: Cell::new([0; 7]),
                gclk: Cell::new([0; 3]),
                pm: Cell::new(0),
            }
        }
    }

    fn tc3<'a>(io: &Io) -> Tc3<'a, Freq48MHz> {
        unsafe {
            Tc3::new(
                StaticRef::new(io.tc.as_ptr() as *const TcCount16Registers),
                StaticRef::new(io.gclk.as_ptr() as *const GclkRegisters),
                StaticRef::new(io.pm.as_ptr() as *const PmApbcMask),
            )
        }
    }

    #[test]
    fn prescalers_at_48mhz() {
        let io = Io::new();
        let tc = tc3(&io);
        assert_eq!(tc.timebases().len(), 8);
        assert_eq!(tc.timebases()[4].divisor(), 16);
        for tb in tc.timebases() {
            assert_eq!(tb.period_ticks(), 65_536);
            assert_eq!(tb.reload(), Reload::Compare);
        }
    }

    #[test]
    fn configure_enables_match_frequency_mode() {
        let io = Io::new();
        let tc = tc3(&io);

        tc.configure(&tc.timebases()[7]);
        let regs = tc.registers;
        assert!(regs.ctrla.is_set(CTRLA::ENABLE));
        assert!(regs.ctrla.matches_all(CTRLA::MODE::Count16 + CTRLA::WAVEGEN::MatchFrequency));
        assert_eq!(regs.ctrla.read(CTRLA::PRESCALER), 7);
        assert_eq!(regs.cc0.get(), 0xFFFF);
        assert_eq!(regs.count.get(), 0);

        assert!(tc.pm.apbcmask.is_set(APBCMASK::TC3));
        assert_eq!(tc.gclk.clkctrl.read(CLKCTRL::ID), 0x1B);
        assert!(tc.gclk.clkctrl.is_set(CLKCTRL::CLKEN));
    }

    #[test]
    fn partial_period_sets_top() {
        let io = Io::new();
        let tc = tc3(&io);

        tc.load_partial(3392);
        assert_eq!(tc.registers.cc0.get(), 3391);
        tc.load_partial(1);
        assert_eq!(tc.registers.cc0.get(), 0);
        tc.arm_period();
        assert_eq!(tc.registers.cc0.get(), 0xFFFF);

        tc.enable_events();
        assert!(tc.registers.intenset.is_set(INT::MC0));
        tc.disable_events();
        assert!(tc.registers.intenclr.is_set(INT::MC0));
    }

    #[test]
    fn short_interval_reloads_every_period() {
        let client = FiredCounter::new();
        let io = Io::new();
        let tc = tc3(&io);
        let sched = DeadlineScheduler::new(&tc);
        tc.set_tick_client(&sched);

        // 18750 ticks at /256
        sched.set_interval_us(&client, 100_000).unwrap();
        assert_eq!(tc.registers.ctrla.read(CTRLA::PRESCALER), 6);
        assert_eq!(tc.registers.cc0.get(), 18_749);

        for round in 1..=4 {
            tc.registers.cc0.set(0);
            tc.handle_interrupt();
            assert_eq!(client.count(), round);
            assert_eq!(tc.registers.cc0.get(), 18_749);
        }
    }

    #[test]
    fn overflow_keeps_ticks_counted_since_match() {
        let client = FiredCounter::new();
        let io = Io::new();
        let tc = tc3(&io);
        let sched = DeadlineScheduler::new(&tc);
        tc.set_tick_client(&sched);

        // 234375 ticks at /1024: three full periods and 37767 ticks
        sched.set_timeout_s(&client, 5).unwrap();
        assert_eq!(sched.overflows_remaining(), 3);

        // COUNT has wrapped at the top and kept counting until the handler
        // ran. Neither a full period nor the partial one may restart it.
        tc.registers.count.set(7);
        tc.handle_interrupt();
        assert_eq!(
            (sched.overflows_remaining(), tc.registers.cc0.get(), tc.registers.count.get()),
            (2, 0xFFFF, 7)
        );

        tc.handle_interrupt();
        tc.registers.count.set(12);
        tc.handle_interrupt();
        assert_eq!(tc.registers.cc0.get(), 37_766);
        assert_eq!(tc.registers.count.get(), 12);
        assert_eq!(client.count(), 0);

        tc.handle_interrupt();
        assert_eq!(client.count(), 1);
    }

    #[test]
    fn long_timeout_restores_top_then_fires() {
        let client = FiredCounter::new();
        let io = Io::new();
        let tc = tc3(&io);
        let sched = DeadlineScheduler::new(&tc);
        tc.set_tick_client(&sched);

        // 93750 ticks at /1024: one full period and 28214 ticks
        sched.set_timeout_s(&client, 2).unwrap();
        assert_eq!(tc.registers.ctrla.read(CTRLA::PRESCALER), 7);
        assert_eq!(tc.registers.cc0.get(), 0xFFFF);

        tc.handle_interrupt();
        assert_eq!(tc.registers.cc0.get(), 28_213);
        assert_eq!(client.count(), 0);

        tc.handle_interrupt();
        assert_eq!(client.count(), 1);
        assert_eq!(sched.mode(), Mode::Off);
    }
}
