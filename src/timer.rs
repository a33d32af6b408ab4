//! Timer
//!
//! This module implements the Game Boy timer registers and timing logic.
//!
//! Timer registers:
//! - DIV (0xFF04): upper byte of a 16-bit counter, so it steps every 256 T-cycles
//! - TIMA (0xFF05): timer counter
//! - TMA (0xFF06): timer modulo (reload value)
//! - TAC (0xFF07): timer control (enable and frequency select)
//!
//! TIMA counts falling edges of the counter bit picked by TAC. When it
//! overflows it reads 0x00 for one machine cycle, then reloads from TMA and
//! raises the Timer interrupt. A TIMA write inside that window cancels both.

use crate::common::{Byte, Word, T_CYCLES_PER_M_CYCLE};
use crate::interrupts::{InterruptController, InterruptType};
use serde::{Deserialize, Serialize};

pub const DIV_ADDR: Word = 0xFF04;
pub const TIMA_ADDR: Word = 0xFF05;
pub const TMA_ADDR: Word = 0xFF06;
pub const TAC_ADDR: Word = 0xFF07;

/// Timer frequencies based on TAC bits 0-1
/// Values are in T-cycles per TIMA increment
pub const TIMER_FREQUENCIES: [u16; 4] = [
    1024, // 00: 4096 Hz
    16,   // 01: 262144 Hz
    64,   // 10: 65536 Hz
    256,  // 11: 16384 Hz
];

/// Internal counter value once the boot ROM hands over (DIV reads 0xAB).
const POST_BOOT_COUNTER: u16 = 0xABCC;

/// Game Boy Timer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// Internal divider; DIV is its upper byte
    counter: u16,
    /// TIMA register (0xFF05)
    tima: Byte,
    /// TMA register (0xFF06)
    tma: Byte,
    /// TAC register (0xFF07), low three bits
    tac: Byte,
    /// TIMA overflowed during the last machine cycle; reload is due
    overflow_pending: bool,
    /// T-cycles handed to `tick` that did not fill a machine cycle yet
    leftover: u32,
}

impl Timer {
    /// Create a timer at power-on state (everything zero)
    pub fn new() -> Self {
        Self::default()
    }

    /// Timer state the boot ROM leaves behind
    pub fn post_boot() -> Self {
        Self {
            counter: POST_BOOT_COUNTER,
            ..Self::default()
        }
    }

    /// Current DIV value
    pub fn div(&self) -> Byte {
        (self.counter >> 8) as Byte
    }

    pub fn tima(&self) -> Byte {
        self.tima
    }

    pub fn tma(&self) -> Byte {
        self.tma
    }

    pub fn tac(&self) -> Byte {
        self.tac
    }

    /// Whether a TIMA reload is waiting for the next machine cycle
    pub fn overflow_pending(&self) -> bool {
        self.overflow_pending
    }

    /// A restored timer never holds a whole machine cycle in `leftover`
    pub fn is_well_formed(&self) -> bool {
        self.leftover < T_CYCLES_PER_M_CYCLE
    }

    /// Read timer register
    pub fn read(&self, address: Word) -> Byte {
        match address {
            DIV_ADDR => self.div(),
            TIMA_ADDR => self.tima,
            TMA_ADDR => self.tma,
            TAC_ADDR => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    /// Write timer register
    pub fn write(&mut self, address: Word, value: Byte) {
        match address {
            DIV_ADDR => {
                // Any write clears the whole counter. If the selected bit was
                // high this is a falling edge and TIMA steps once.
                let before = self.input();
                self.counter = 0;
                if before {
                    self.increment_tima();
                }
            }
            TIMA_ADDR => {
                self.overflow_pending = false;
                self.tima = value;
            }
            TMA_ADDR => {
                self.tma = value;
            }
            TAC_ADDR => {
                let before = self.input();
                self.tac = value & 0x07;
                if before && !self.input() {
                    self.increment_tima();
                }
            }
            _ => {}
        }
    }

    /// Check if timer is enabled
    fn timer_enabled(&self) -> bool {
        (self.tac & 0x04) != 0
    }

    /// Counter bit whose falling edge clocks TIMA
    fn selected_bit(&self) -> u16 {
        match self.tac & 0x03 {
            0 => 9,
            1 => 3,
            2 => 5,
            _ => 7,
        }
    }

    /// Current level of the TIMA clock input
    fn input(&self) -> bool {
        self.timer_enabled() && (self.counter >> self.selected_bit()) & 1 == 1
    }

    fn increment_tima(&mut self) {
        let (next, overflow) = self.tima.overflowing_add(1);
        self.tima = next;
        if overflow {
            self.overflow_pending = true;
        }
    }

    /// Advance by `cycles` T-cycles, whole machine cycles at a time
    pub fn tick(&mut self, cycles: u32, interrupts: &mut InterruptController) {
        let total = self.leftover.saturating_add(cycles);
        self.leftover = total % T_CYCLES_PER_M_CYCLE;
        for _ in 0..total / T_CYCLES_PER_M_CYCLE {
            self.tick_m_cycle(interrupts);
        }
    }

    fn tick_m_cycle(&mut self, interrupts: &mut InterruptController) {
        if self.overflow_pending {
            self.overflow_pending = false;
            self.tima = self.tma;
            interrupts.request(InterruptType::Timer);
        }

        for _ in 0..T_CYCLES_PER_M_CYCLE {
            let before = self.input();
            self.counter = self.counter.wrapping_add(1);
            if before && !self.input() {
                self.increment_tima();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_timer(tac: Byte, tima: Byte, tma: Byte) -> Timer {
        let mut timer = Timer::new();
        timer.write(TAC_ADDR, tac);
        timer.write(TIMA_ADDR, tima);
        timer.write(TMA_ADDR, tma);
        timer
    }

    #[test]
    fn test_post_boot_div() {
        let timer = Timer::post_boot();
        assert_eq!(timer.read(DIV_ADDR), 0xAB);
        assert_eq!(timer.read(TAC_ADDR), 0xF8);
    }

    #[test]
    fn test_div_increments_every_256_cycles() {
        let mut ic = InterruptController::new();
        let mut timer = Timer::new();
        timer.tick(252, &mut ic);
        assert_eq!(timer.div(), 0);
        timer.tick(4, &mut ic);
        assert_eq!(timer.div(), 1);
        timer.tick(256 * 255, &mut ic);
        assert_eq!(timer.div(), 0, "DIV wraps at 8 bits");
    }

    #[test]
    fn test_div_write_resets() {
        for value in [0x00, 0x42, 0xFF] {
            let mut timer = Timer::post_boot();
            timer.write(DIV_ADDR, value);
            assert_eq!(timer.read(DIV_ADDR), 0);
        }
    }

    #[test]
    fn test_tima_tma_tac_read_write() {
        let mut timer = Timer::new();
        timer.write(TIMA_ADDR, 0x12);
        timer.write(TMA_ADDR, 0x34);
        timer.write(TAC_ADDR, 0x05);
        assert_eq!(timer.read(TIMA_ADDR), 0x12);
        assert_eq!(timer.read(TMA_ADDR), 0x34);
        assert_eq!(timer.read(TAC_ADDR), 0xFD);
    }

    #[test]
    fn test_timer_disabled() {
        let mut ic = InterruptController::new();
        let mut timer = enabled_timer(0x01, 0, 0);
        timer.tick(4000, &mut ic);
        assert_eq!(timer.tima(), 0);
    }

    #[test]
    fn test_each_frequency() {
        for (select, &period) in TIMER_FREQUENCIES.iter().enumerate() {
            let mut ic = InterruptController::new();
            let mut timer = enabled_timer(0x04 | select as Byte, 0, 0);
            timer.tick(period as u32 * 3, &mut ic);
            assert_eq!(timer.tima(), 3, "TAC select {select}");
        }
    }

    #[test]
    fn test_overflow_reload_is_delayed_one_m_cycle() {
        let mut ic = InterruptController::new();
        let mut timer = enabled_timer(0x05, 0xFF, 0x42);

        timer.tick(16, &mut ic);
        assert_eq!(timer.read(TIMA_ADDR), 0x00);
        assert!(timer.overflow_pending());
        assert_eq!(ic.flags & InterruptType::Timer.bit(), 0);

        timer.tick(4, &mut ic);
        assert_eq!(timer.read(TIMA_ADDR), 0x42);
        assert!(!timer.overflow_pending());
        assert_ne!(ic.flags & InterruptType::Timer.bit(), 0);
    }

    #[test]
    fn test_tima_write_cancels_pending_reload() {
        let mut ic = InterruptController::new();
        let mut timer = enabled_timer(0x05, 0xFF, 0x42);

        timer.tick(16, &mut ic);
        timer.write(TIMA_ADDR, 0x10);
        timer.tick(4, &mut ic);

        assert_eq!(timer.tima(), 0x10);
        assert_eq!(ic.flags, 0);
    }

    #[test]
    fn test_tma_write_before_reload_is_used() {
        let mut ic = InterruptController::new();
        let mut timer = enabled_timer(0x05, 0xFF, 0x42);

        timer.tick(16, &mut ic);
        timer.write(TMA_ADDR, 0x99);
        timer.tick(4, &mut ic);
        assert_eq!(timer.tima(), 0x99);
    }

    #[test]
    fn test_div_write_falling_edge_clocks_tima() {
        let mut ic = InterruptController::new();
        let mut timer = enabled_timer(0x05, 0x00, 0x00);
        // Bit 3 is high after 8 T-cycles.
        timer.tick(8, &mut ic);
        assert_eq!(timer.tima(), 0);
        timer.write(DIV_ADDR, 0);
        assert_eq!(timer.tima(), 1);
    }

    #[test]
    fn test_tac_disable_falling_edge_clocks_tima() {
        let mut ic = InterruptController::new();
        let mut timer = enabled_timer(0x05, 0x00, 0x00);
        timer.tick(8, &mut ic);
        timer.write(TAC_ADDR, 0x01);
        assert_eq!(timer.tima(), 1);
    }

    #[test]
    fn test_partial_machine_cycles_accumulate() {
        let mut ic = InterruptController::new();
        let mut timer = Timer::new();
        for _ in 0..128 {
            timer.tick(2, &mut ic);
        }
        assert_eq!(timer.div(), 1);
    }

    #[test]
    fn test_well_formed_rejects_whole_leftover_cycle() {
        let mut ic = InterruptController::new();
        let mut timer = Timer::new();
        timer.tick(3, &mut ic);
        assert!(timer.is_well_formed());
        timer.leftover = T_CYCLES_PER_M_CYCLE;
        assert!(!timer.is_well_formed());
        timer.leftover = u32::MAX;
        assert!(!timer.is_well_formed());
    }
}
