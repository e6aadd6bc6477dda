// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Timer Counter 1, channel 0 (peripheral TC3) as a 32-bit compare timebase.
//!
//! The channel runs in waveform mode with WAVSEL = UP_RC: it counts up from
//! zero, sets CPCS when it reaches RC and restarts. A full period has RC at
//! `u32::MAX`. This channel has no I/O pins on the Arduino Due, so it can be
//! used as a system timebase without losing any outputs.
//!
//! Reading SR acknowledges every pending status flag.

use core::cell::Cell;
use core::marker::PhantomData;

use kernel::hil::time::{Frequency, Reload, TickClient, Timebase, TimebaseDriver};
use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, ReadOnly, ReadWrite, WriteOnly,
};
use kernel::utilities::StaticRef;

register_structs! {
    pub TcChannelRegisters {
        /// Channel control
        (0x00 => ccr: WriteOnly<u32, CCR::Register>),
        /// Channel mode, waveform mode layout
        (0x04 => cmr: ReadWrite<u32, CMR::Register>),
        /// Stepper motor mode
        (0x08 => smmr: ReadWrite<u32>),
        (0x0C => _reserved0),
        /// Counter value
        (0x10 => cv: ReadOnly<u32>),
        (0x14 => ra: ReadWrite<u32>),
        (0x18 => rb: ReadWrite<u32>),
        (0x1C => rc: ReadWrite<u32>),
        /// Status, cleared on read
        (0x20 => sr: ReadOnly<u32, SR::Register>),
        (0x24 => ier: WriteOnly<u32, SR::Register>),
        (0x28 => idr: WriteOnly<u32, SR::Register>),
        (0x2C => imr: ReadOnly<u32, SR::Register>),
        (0x30 => @END),
    },

    pub PmcRegisters {
        (0x00 => _reserved0),
        /// Peripheral clock enable 0
        (0x10 => pcer0: WriteOnly<u32>),
        /// Peripheral clock disable 0
        (0x14 => pcdr0: WriteOnly<u32>),
        /// Peripheral clock status 0
        (0x18 => pcsr0: ReadOnly<u32>),
        (0x1C => _reserved1),
        /// Write protect mode
        (0xE4 => wpmr: ReadWrite<u32, WPMR::Register>),
        (0xE8 => @END),
    }
}

register_bitfields![u32,
    CCR [
        SWTRG OFFSET(2) NUMBITS(1) [],
        CLKDIS OFFSET(1) NUMBITS(1) [],
        CLKEN OFFSET(0) NUMBITS(1) []
    ],
    CMR [
        WAVE OFFSET(15) NUMBITS(1) [],
        WAVSEL OFFSET(13) NUMBITS(2) [
            Up = 0,
            UpDown = 1,
            UpRc = 2,
            UpDownRc = 3
        ],
        ENETRG OFFSET(12) NUMBITS(1) [],
        CPCDIS OFFSET(7) NUMBITS(1) [],
        CPCSTOP OFFSET(6) NUMBITS(1) [],
        CLKI OFFSET(3) NUMBITS(1) [],
        /// MCK/2, MCK/8, MCK/32, MCK/128, SLCK, then external clocks
        TCCLKS OFFSET(0) NUMBITS(3) []
    ],
    SR [
        MTIOB OFFSET(19) NUMBITS(1) [],
        MTIOA OFFSET(18) NUMBITS(1) [],
        CLKSTA OFFSET(16) NUMBITS(1) [],
        ETRGS OFFSET(7) NUMBITS(1) [],
        LDRBS OFFSET(6) NUMBITS(1) [],
        LDRAS OFFSET(5) NUMBITS(1) [],
        CPCS OFFSET(4) NUMBITS(1) [],
        CPBS OFFSET(3) NUMBITS(1) [],
        CPAS OFFSET(2) NUMBITS(1) [],
        LOVRS OFFSET(1) NUMBITS(1) [],
        COVFS OFFSET(0) NUMBITS(1) []
    ],
    WPMR [
        WPKEY OFFSET(8) NUMBITS(24) [
            Passwd = 0x504D43
        ],
        WPEN OFFSET(0) NUMBITS(1) []
    ]
];

pub const TC1_CHANNEL0_BASE: StaticRef<TcChannelRegisters> =
    unsafe { StaticRef::new(0x4008_4000 as *const TcChannelRegisters) };
pub const PMC_BASE: StaticRef<PmcRegisters> =
    unsafe { StaticRef::new(0x400E_0600 as *const PmcRegisters) };

/// Peripheral identifier of TC1 channel 0.
const PID_TC3: u32 = 30;

/// Master clock of an Arduino Due.
#[derive(Debug)]
pub struct Freq84MHz;
impl Frequency for Freq84MHz {
    fn frequency() -> u32 {
        84_000_000
    }
}

/// MCK divisors in TCCLKS order, TIMER_CLOCK1 to TIMER_CLOCK4.
const PRESCALERS: [u32; 4] = [2, 8, 32, 128];

const COUNTER_BITS: u8 = 32;

pub struct Tc3<'a, F: Frequency> {
    registers: StaticRef<TcChannelRegisters>,
    pmc: StaticRef<PmcRegisters>,
    timebases: [Timebase; 4],
    timebase: Cell<Timebase>,
    client: Cell<Option<&'a dyn TickClient>>,
    _frequency: PhantomData<F>,
}

impl<'a, F: Frequency> Tc3<'a, F> {
    pub fn new(registers: StaticRef<TcChannelRegisters>, pmc: StaticRef<PmcRegisters>) -> Self {
        let clock = F::frequency();
        let timebases =
            PRESCALERS.map(|divisor| Timebase::new(clock, divisor, COUNTER_BITS, Reload::Compare));
        Tc3 {
            registers,
            pmc,
            timebases,
            timebase: Cell::new(timebases[0]),
            client: Cell::new(None),
            _frequency: PhantomData,
        }
    }

    pub fn enable_clock(&self) {
        self.pmc.wpmr.write(WPMR::WPKEY::Passwd + WPMR::WPEN::CLEAR);
        self.pmc.pcer0.set(1 << PID_TC3);
    }

    pub fn handle_interrupt(&self) {
        let status = self.registers.sr.extract();
        if status.is_set(SR::CPCS) {
            if let Some(client) = self.client.get() {
                client.tick_elapsed();
            }
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
        regs.ccr.write(CCR::CLKDIS::SET);
        regs.idr.set(u32::MAX);
        regs.cmr
            .write(CMR::WAVE::SET + CMR::WAVSEL::UpRc + CMR::TCCLKS.val(index as u32));
        // Drop anything left pending by the previous configuration.
        let _ = regs.sr.get();
        regs.rc.set(timebase.full_period_top());
        regs.ccr.write(CCR::CLKEN::SET + CCR::SWTRG::SET);
    }

    // RC can be moved while the counter runs, so no software trigger here.
    fn arm_period(&self) {
        self.registers.rc.set(self.timebase.get().full_period_top());
    }

    fn load_partial(&self, ticks: u32) {
        self.registers.rc.set(self.timebase.get().compare_top(ticks));
    }

    fn disable_events(&self) {
        self.registers.idr.write(SR::CPCS::SET);
    }

    fn enable_events(&self) {
        self.registers.ier.write(SR::CPCS::SET);
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use capsules_core::scheduler::DeadlineScheduler;
    use capsules_core::test::fake_timebase::FiredCounter;
    use kernel::hil::time::{DeadlineTimer, Mode};

    const CCR: usize = 0x00 / 4;
    const IER: usize = 0x24 / 4;
    const IDR: usize = 0x28 / 4;
    const SR_WORD: usize = 0x20 / 4;
    const PCER0: usize = 0x10 / 4;
    const WPMR_WORD: usize = 0xE4 / 4;

    struct Io {
        tc: Cell<[u32; 12]>,
        pmc: Cell<[u32; 58]>,
    }

    impl Io {
        fn new() -> Io {
            Io {
                tc: Cell::new([0; 12]),
                pmc: Cell::new([0; 58]),
            }
        }

        fn tc_word(&self, index: usize) -> u32 {
            self.tc.get()[index]
        }

        /// Latch a compare match in SR, as the counter reaching RC would.
        fn compare_match(&self) {
            let mut words = self.tc.get();
            words[SR_WORD] |= 1 << 4;
            self.tc.set(words);
        }
    }

    fn tc3<'a>(io: &Io) -> Tc3<'a, Freq84MHz> {
        unsafe {
            Tc3::new(
                StaticRef::new(io.tc.as_ptr() as *const TcChannelRegisters),
                StaticRef::new(io.pmc.as_ptr() as *const PmcRegisters),
            )
        }
    }

    #[test]
    fn prescalers_at_84mhz() {
        let io = Io::new();
        let tc = tc3(&io);
        assert_eq!(tc.timebases().len(), 4);
        assert_eq!(tc.timebases()[2].divisor(), 32);
        assert_eq!(tc.timebases()[0].period_ticks(), 1 << 32);
        assert_eq!(tc.timebases()[3].reload(), Reload::Compare);
    }

    #[test]
    fn configure_selects_waveform_up_rc() {
        let io = Io::new();
        let tc = tc3(&io);

        tc.configure(&tc.timebases()[2]);
        let regs = tc.registers;
        assert!(regs.cmr.matches_all(CMR::WAVE::SET + CMR::WAVSEL::UpRc));
        assert_eq!(regs.cmr.read(CMR::TCCLKS), 2);
        assert_eq!(regs.rc.get(), u32::MAX);
        assert_eq!(io.tc_word(CCR), 0b101);
        assert_eq!(io.tc_word(IDR), u32::MAX);

        assert_eq!(io.pmc.get()[PCER0], 1 << 30);
        assert_eq!(io.pmc.get()[WPMR_WORD], 0x504D_4300);
    }

    #[test]
    fn partial_period_sets_rc() {
        let io = Io::new();
        let tc = tc3(&io);

        tc.load_partial(42_000);
        assert_eq!(tc.registers.rc.get(), 41_999);
        tc.arm_period();
        assert_eq!(tc.registers.rc.get(), u32::MAX);

        tc.enable_events();
        assert_eq!(io.tc_word(IER), 1 << 4);
        tc.disable_events();
        assert_eq!(io.tc_word(IDR), 1 << 4);
    }

    #[test]
    fn interrupt_without_compare_match_is_ignored() {
        let client = FiredCounter::new();
        let io = Io::new();
        let tc = tc3(&io);
        let sched = DeadlineScheduler::new(&tc);
        tc.set_tick_client(&sched);

        sched.set_timeout_us(&client, 1000).unwrap();
        tc.handle_interrupt();
        assert_eq!(client.count(), 0);
        assert_eq!(sched.mode(), Mode::Timeout);
    }

    #[test]
    fn one_second_fits_a_single_period() {
        let client = FiredCounter::new();
        let io = Io::new();
        let tc = tc3(&io);
        let sched = DeadlineScheduler::new(&tc);
        tc.set_tick_client(&sched);

        // 42MHz ticks at MCK/2
        sched.set_timeout_s(&client, 1).unwrap();
        assert_eq!(tc.registers.cmr.read(CMR::TCCLKS), 0);
        assert_eq!(tc.registers.rc.get(), 41_999_999);

        io.compare_match();
        tc.handle_interrupt();
        assert_eq!(client.count(), 1);
        assert_eq!(sched.mode(), Mode::Off);
    }

    #[test]
    fn long_timeout_counts_one_overflow() {
        let client = FiredCounter::new();
        let io = Io::new();
        let tc = tc3(&io);
        let sched = DeadlineScheduler::new(&tc);
        tc.set_tick_client(&sched);

        // 656250Hz at MCK/128: 4593750000 ticks, one full period and
        // 298782704 ticks
        sched.set_timeout_s(&client, 7000).unwrap();
        assert_eq!(tc.registers.cmr.read(CMR::TCCLKS), 3);
        assert_eq!(tc.registers.rc.get(), u32::MAX);

        // Only configure may trigger a counter reset.
        let mut words = io.tc.get();
        words[CCR] = 0;
        io.tc.set(words);

        io.compare_match();
        tc.handle_interrupt();
        assert_eq!(tc.registers.rc.get(), 298_782_703);
        assert_eq!(io.tc_word(CCR), 0);
        assert_eq!(client.count(), 0);

        io.compare_match();
        tc.handle_interrupt();
        assert_eq!(client.count(), 1);
    }
}
