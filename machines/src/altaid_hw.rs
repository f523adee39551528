//! Altaid 8800 board hardware: banked ROM/RAM memory map, I/O port decode,
//! and the device input lines the firmware samples.
//!
//! Port map (single-bit latches unless noted; bit 0 selects the state):
//!
//! * OUT 0xC0 — output port: bits 0..3 panel LED nibble, bits 4..6 panel
//!   scan row, bit 7 TXDATA (bit-serial UART, idle high).
//! * IN 0x40 — input port: bits 0..3 panel switch columns (active-low),
//!   bit 5 timer line (1 idle, 0 pulse), bit 6 cassette input level,
//!   bit 7 RXDATA. Undriven bits read 1 (pull-ups).
//! * OUT 0x40 ROM_HI — nonzero maps ROM into 0x8000-0xBFFF, zero maps RAM.
//! * OUT 0x41 ROM_LOW — zero maps ROM into 0x0000-0x7FFF, nonzero RAM.
//! * OUT 0x45 B15 — ROM half select.
//! * OUT 0x42 B16, 0x47 B17, 0x43 B18 — RAM bank bits, one of 8 x 64 KiB.
//! * OUT 0x46 TIMER — timer enable.
//! * OUT 0x44 CASSETTE — cassette output latch.
//!
//! All other OUT ports are ignored; all other IN ports read 0xFF.

use altaid_core::core::Bus;

use crate::panel::FrontPanel;
use crate::rom_loader::RomImage;

pub const PORT_INPUT: u8 = 0x40;
pub const PORT_ROM_HI: u8 = 0x40;
pub const PORT_ROM_LOW: u8 = 0x41;
pub const PORT_RAM_A16: u8 = 0x42;
pub const PORT_RAM_A18: u8 = 0x43;
pub const PORT_CASSETTE: u8 = 0x44;
pub const PORT_ROM_HALF: u8 = 0x45;
pub const PORT_TIMER: u8 = 0x46;
pub const PORT_RAM_A17: u8 = 0x47;
pub const PORT_OUTPUT: u8 = 0xC0;

pub const ROM_HALF_LEN: usize = 0x8000;
pub const RAM_BANK_LEN: usize = 0x10000;
pub const RAM_BANK_COUNT: usize = 8;

pub struct AltaidHw {
    /// 64 KiB ROM image as 2 x 32 KiB halves, selected by `rom_half`.
    pub rom: Box<[u8]>,
    /// 512 KiB RAM as 8 x 64 KiB banks, selected by `ram_bank`.
    pub ram: Box<[u8]>,

    // RAM bank select (A16..A18)
    pub ram_a16: u8,
    pub ram_a17: u8,
    pub ram_a18: u8,
    /// Composed bank index 0..7.
    pub ram_bank: u8,

    // ROM controls
    pub rom_half: u8,
    /// Reads at 0x0000-0x7FFF come from ROM.
    pub rom_low_mapped: bool,
    /// Reads at 0x8000-0xBFFF come from ROM (offset by 0x8000).
    pub rom_hi_mapped: bool,

    /// Last value written to the output port.
    pub out_c0: u8,

    // Bit-serial lines
    /// Derived from out_c0 bit 7.
    pub tx_line: bool,
    /// Driven by the serial device each batch iteration.
    pub rx_level: bool,

    // Timer input
    pub timer_en: bool,
    /// 1 idle, 0 pulse.
    pub timer_level: bool,

    // Cassette I/O (digital line model)
    pub cassette_out_level: bool,
    /// One-shot: set when a write to the cassette latch changed the level.
    pub cassette_out_dirty: bool,
    /// Sampled into the input port bit 6.
    pub cassette_in_level: bool,

    pub panel: FrontPanel,
}

impl AltaidHw {
    pub fn new() -> Self {
        Self {
            rom: vec![0; 2 * ROM_HALF_LEN].into_boxed_slice(),
            ram: vec![0; RAM_BANK_COUNT * RAM_BANK_LEN].into_boxed_slice(),
            ram_a16: 0,
            ram_a17: 0,
            ram_a18: 0,
            ram_bank: 0,
            rom_half: 0,
            // Power-on: output latches cleared, so ROM_LOW (active-low)
            // maps ROM at 0x0000 and ROM_HI leaves RAM at 0x8000.
            rom_low_mapped: true,
            rom_hi_mapped: false,
            out_c0: 0,
            tx_line: true, // idle high
            rx_level: true,
            timer_en: false,
            timer_level: true,
            cassette_out_level: false,
            cassette_out_dirty: false,
            cassette_in_level: true, // idle high
            panel: FrontPanel::new(),
        }
    }

    /// Reset CPU-visible hardware to power-on defaults, preserving ROM and
    /// RAM contents (hardware RESET does not clear the SRAM).
    pub fn reset_runtime(&mut self) {
        self.ram_a16 = 0;
        self.ram_a17 = 0;
        self.ram_a18 = 0;
        self.recompute_ram_bank();
        self.rom_half = 0;
        self.rom_low_mapped = true;
        self.rom_hi_mapped = false;
        self.out_c0 = 0;
        self.tx_line = true;
        self.rx_level = true;
        self.timer_en = false;
        self.timer_level = true;
        self.cassette_out_level = false;
        self.cassette_out_dirty = false;
        self.cassette_in_level = true;
        self.panel.reset();
    }

    pub fn load_rom(&mut self, image: &RomImage) {
        self.rom.copy_from_slice(image.bytes());
    }

    fn recompute_ram_bank(&mut self) {
        self.ram_bank = self.ram_a18 << 2 | self.ram_a17 << 1 | self.ram_a16;
    }

    fn ram_index(&self, addr: u16) -> usize {
        self.ram_bank as usize * RAM_BANK_LEN + addr as usize
    }

    fn rom_index(&self, offset: u16) -> usize {
        self.rom_half as usize * ROM_HALF_LEN + offset as usize
    }

    /// Read a byte from a specific RAM bank, ignoring the mapping latches.
    pub fn ram_peek(&self, bank: u8, addr: u16) -> u8 {
        self.ram[(bank as usize & 7) * RAM_BANK_LEN + addr as usize]
    }

    /// Write a byte into a specific RAM bank, ignoring the mapping latches.
    pub fn ram_poke(&mut self, bank: u8, addr: u16, v: u8) {
        self.ram[(bank as usize & 7) * RAM_BANK_LEN + addr as usize] = v;
    }

    /// TX line as a sample level for the serial decoder.
    pub fn tx_level(&self) -> u8 {
        u8::from(self.tx_line)
    }
}

impl Default for AltaidHw {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for AltaidHw {
    fn mem_read(&mut self, addr: u16) -> u8 {
        // Low 32K: optionally ROM
        if addr < 0x8000 {
            if self.rom_low_mapped {
                return self.rom[self.rom_index(addr)];
            }
            return self.ram[self.ram_index(addr)];
        }

        // Upper 32K: ROM_HI maps only the first 16K (0x8000-0xBFFF)
        if addr < 0xC000 {
            if self.rom_hi_mapped {
                return self.rom[self.rom_index(addr - 0x8000)];
            }
            return self.ram[self.ram_index(addr)];
        }

        // Top 16K always RAM
        self.ram[self.ram_index(addr)]
    }

    fn mem_write(&mut self, addr: u16, v: u8) {
        // Shadow ROM: writes always land in RAM, even while reads come
        // from ROM over the same region.
        let i = self.ram_index(addr);
        self.ram[i] = v;
    }

    fn io_in(&mut self, port: u8) -> u8 {
        // The input port shares its address with the ROM_HI latch; only
        // reads arrive here.
        if port == PORT_INPUT {
            let mut v = 0xF0u8;

            // Switch columns for the current scan row.
            v |= self.panel.switch_nibble(self.panel.scan_row & 7) & 0x0F;

            // Bit 5: timer line
            if !self.timer_level {
                v &= !0x20;
            }
            // Bit 6: cassette input
            if !self.cassette_in_level {
                v &= !0x40;
            }
            // Bit 7: RX
            if !self.rx_level {
                v &= !0x80;
            }

            return v;
        }

        0xFF
    }

    fn io_out(&mut self, port: u8, v: u8) {
        match port {
            PORT_OUTPUT => {
                self.out_c0 = v;
                // TXDATA is bit 7; the rest drives the panel matrix.
                self.tx_line = v & 0x80 != 0;
                self.panel.drive(v);
            }

            PORT_ROM_HI => self.rom_hi_mapped = v != 0,
            PORT_ROM_LOW => self.rom_low_mapped = v == 0,
            PORT_ROM_HALF => self.rom_half = v & 1,

            PORT_RAM_A16 => {
                self.ram_a16 = v & 1;
                self.recompute_ram_bank();
            }
            PORT_RAM_A17 => {
                self.ram_a17 = v & 1;
                self.recompute_ram_bank();
            }
            PORT_RAM_A18 => {
                self.ram_a18 = v & 1;
                self.recompute_ram_bank();
            }

            PORT_TIMER => self.timer_en = v & 1 != 0,

            PORT_CASSETTE => {
                let new_level = v & 1 != 0;
                if new_level != self.cassette_out_level {
                    self.cassette_out_level = new_level;
                    self.cassette_out_dirty = true;
                }
            }

            // Unknown ports are ignored.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_maps_rom_low() {
        let mut hw = AltaidHw::new();
        hw.rom[0x0123] = 0xAB;
        hw.ram_poke(0, 0x0123, 0xCD);
        assert!(hw.rom_low_mapped);
        assert_eq!(hw.mem_read(0x0123), 0xAB, "reads come from ROM");
    }

    #[test]
    fn rom_low_latch_is_active_low() {
        let mut hw = AltaidHw::new();
        hw.io_out(PORT_ROM_LOW, 1);
        assert!(!hw.rom_low_mapped, "nonzero write maps RAM");
        hw.io_out(PORT_ROM_LOW, 0);
        assert!(hw.rom_low_mapped, "zero write maps ROM");
    }

    #[test]
    fn rom_hi_maps_only_middle_16k() {
        let mut hw = AltaidHw::new();
        hw.rom[0x0000] = 0x11; // ROM offset for address 0x8000
        hw.rom[0x3FFF] = 0x22; // ROM offset for address 0xBFFF
        hw.ram_poke(0, 0xC000, 0x33);
        hw.io_out(PORT_ROM_HI, 1);
        assert_eq!(hw.mem_read(0x8000), 0x11);
        assert_eq!(hw.mem_read(0xBFFF), 0x22);
        assert_eq!(hw.mem_read(0xC000), 0x33, "top 16K stays RAM");
    }

    #[test]
    fn writes_land_in_ram_under_mapped_rom() {
        let mut hw = AltaidHw::new();
        assert!(hw.rom_low_mapped);
        hw.mem_write(0x4000, 0x77);
        assert_eq!(hw.ram_peek(0, 0x4000), 0x77);
        assert_eq!(hw.mem_read(0x4000), 0x00, "read still sees ROM");
        hw.io_out(PORT_ROM_LOW, 1); // RAM visible
        assert_eq!(hw.mem_read(0x4000), 0x77);
    }

    #[test]
    fn ram_bank_bits_compose_index() {
        let mut hw = AltaidHw::new();
        hw.io_out(PORT_RAM_A16, 1);
        assert_eq!(hw.ram_bank, 1);
        hw.io_out(PORT_RAM_A17, 1);
        assert_eq!(hw.ram_bank, 3);
        hw.io_out(PORT_RAM_A18, 1);
        assert_eq!(hw.ram_bank, 7);
        hw.io_out(PORT_RAM_A16, 0);
        assert_eq!(hw.ram_bank, 6);
    }

    #[test]
    fn banked_ram_isolation() {
        let mut hw = AltaidHw::new();
        hw.io_out(PORT_ROM_LOW, 1); // RAM at 0x0000-0x7FFF

        hw.io_out(PORT_RAM_A16, 1);
        hw.io_out(PORT_RAM_A17, 1); // bank 3
        hw.mem_write(0x4000, 0x77);
        assert_eq!(hw.mem_read(0x4000), 0x77);

        hw.io_out(PORT_RAM_A16, 0);
        hw.io_out(PORT_RAM_A17, 0); // bank 0
        assert_eq!(hw.mem_read(0x4000), 0x00);

        hw.io_out(PORT_RAM_A16, 1);
        hw.io_out(PORT_RAM_A17, 1); // back to bank 3
        assert_eq!(hw.mem_read(0x4000), 0x77);
    }

    #[test]
    fn rom_half_select() {
        let mut hw = AltaidHw::new();
        hw.rom[0x0100] = 0xAA;
        hw.rom[ROM_HALF_LEN + 0x0100] = 0xBB;
        assert_eq!(hw.mem_read(0x0100), 0xAA);
        hw.io_out(PORT_ROM_HALF, 1);
        assert_eq!(hw.mem_read(0x0100), 0xBB);
    }

    #[test]
    fn input_port_pull_ups() {
        let mut hw = AltaidHw::new();
        // Idle: switches high, timer high, cassette high, RX high.
        assert_eq!(hw.io_in(PORT_INPUT), 0xFF);
    }

    #[test]
    fn input_port_lines_pull_low() {
        let mut hw = AltaidHw::new();
        hw.timer_level = false;
        assert_eq!(hw.io_in(PORT_INPUT) & 0x20, 0);
        hw.timer_level = true;
        hw.cassette_in_level = false;
        assert_eq!(hw.io_in(PORT_INPUT) & 0x40, 0);
        hw.cassette_in_level = true;
        hw.rx_level = false;
        assert_eq!(hw.io_in(PORT_INPUT) & 0x80, 0);
    }

    #[test]
    fn input_port_switch_column_tracks_scan_row() {
        let mut hw = AltaidHw::new();
        hw.panel.press_key(0, 0, 100); // D0 lives in row 4
        hw.io_out(PORT_OUTPUT, 0x80 | 4 << 4);
        assert_eq!(hw.io_in(PORT_INPUT) & 0x0F, 0x0E);
        hw.io_out(PORT_OUTPUT, 0x80 | 5 << 4);
        assert_eq!(hw.io_in(PORT_INPUT) & 0x0F, 0x0F);
    }

    #[test]
    fn unknown_ports_are_total() {
        let mut hw = AltaidHw::new();
        hw.io_out(0x99, 0xFF); // ignored
        assert_eq!(hw.io_in(0x99), 0xFF);
    }

    #[test]
    fn cassette_latch_flags_level_changes_only() {
        let mut hw = AltaidHw::new();
        hw.io_out(PORT_CASSETTE, 0);
        assert!(!hw.cassette_out_dirty, "no change, no flag");
        hw.io_out(PORT_CASSETTE, 1);
        assert!(hw.cassette_out_dirty);
        assert!(hw.cassette_out_level);
        hw.cassette_out_dirty = false;
        hw.io_out(PORT_CASSETTE, 1);
        assert!(!hw.cassette_out_dirty, "same level again, no flag");
    }

    #[test]
    fn output_port_drives_tx_and_panel() {
        let mut hw = AltaidHw::new();
        hw.io_out(PORT_OUTPUT, 2 << 4 | 0x0A); // TX bit low
        assert!(!hw.tx_line, "bit 7 low drives TX low");
        assert_eq!(hw.panel.scan_row, 2);
        assert_eq!(hw.panel.led_row_nibble[2], 0x0A);
        assert_eq!(hw.out_c0, 0x2A);
    }

    #[test]
    fn reset_runtime_preserves_memory() {
        let mut hw = AltaidHw::new();
        hw.rom[5] = 0x12;
        hw.io_out(PORT_RAM_A18, 1); // bank 4
        hw.mem_write(0x9000, 0x34);
        hw.io_out(PORT_ROM_HI, 1);
        hw.io_out(PORT_TIMER, 1);

        hw.reset_runtime();
        assert!(hw.rom_low_mapped);
        assert!(!hw.rom_hi_mapped);
        assert_eq!(hw.ram_bank, 0);
        assert!(!hw.timer_en);
        assert_eq!(hw.rom[5], 0x12, "ROM preserved");
        assert_eq!(hw.ram_peek(4, 0x9000), 0x34, "RAM preserved");
    }
}
