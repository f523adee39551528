//! Jumps, calls, returns, and restarts.
//!
//! On the 8080 a conditional jump always costs 10 t-states; conditional
//! calls and returns pay extra only when taken (17/11 and 11/5).

use crate::core::Bus;

use super::I8080;

impl I8080 {
    /// JMP nn — 10 t.
    pub(crate) fn op_jmp<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.pc = self.fetch16(bus);
        10
    }

    /// Jcc nn — 10 t taken or not.
    pub(crate) fn op_jcc<B: Bus + ?Sized>(&mut self, bus: &mut B, op: u8) -> u32 {
        let addr = self.fetch16(bus);
        if self.cond((op >> 3) & 7) {
            self.pc = addr;
        }
        10
    }

    /// CALL nn — 17 t.
    pub(crate) fn op_call<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        let pc = self.pc;
        self.push16(bus, pc);
        self.pc = addr;
        17
    }

    /// Ccc nn — 17 t taken, 11 t not taken.
    pub(crate) fn op_ccc<B: Bus + ?Sized>(&mut self, bus: &mut B, op: u8) -> u32 {
        let addr = self.fetch16(bus);
        if self.cond((op >> 3) & 7) {
            let pc = self.pc;
            self.push16(bus, pc);
            self.pc = addr;
            17
        } else {
            11
        }
    }

    /// RET — 10 t.
    pub(crate) fn op_ret<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.pc = self.pop16(bus);
        10
    }

    /// Rcc — 11 t taken, 5 t not taken.
    pub(crate) fn op_rcc<B: Bus + ?Sized>(&mut self, bus: &mut B, op: u8) -> u32 {
        if self.cond((op >> 3) & 7) {
            self.pc = self.pop16(bus);
            11
        } else {
            5
        }
    }

    /// RST n — push PC, jump to n*8. 11 t.
    pub(crate) fn op_rst<B: Bus + ?Sized>(&mut self, bus: &mut B, op: u8) -> u32 {
        let n = (op >> 3) & 7;
        let pc = self.pc;
        self.push16(bus, pc);
        self.pc = u16::from(n) * 8;
        11
    }
}
