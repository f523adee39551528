//! Altaid 8800 single-board computer (2 MHz Intel 8080, banked ROM/RAM,
//! bit-serial console, multiplexed front panel, 1 kHz timer, cassette).
//!
//! The system advances in fixed-quantum batches. Each inner iteration
//! refreshes the input lines the firmware samples, executes one
//! instruction, advances the shared tick counter by its cycle count, and
//! then runs the devices that react to the instruction's side effects.
//! Two events landing on the same tick always resolve in that order.

use altaid_core::core::machine::{InputKey, Machine, PanelView};
use altaid_core::cpu::I8080;
use altaid_core::device::{Cassette, IntervalTimer, Serial};

use crate::altaid_hw::AltaidHw;
use crate::registry::MachineEntry;
use crate::rom_loader::{RomImage, RomLoadError};

/// Decoded-TX ring capacity.
pub const TX_RING_LEN: usize = 4096;

/// Bounded ring of serial bytes decoded from the TX line, drained by the
/// host. One producer (the batch loop), one consumer (`pop`); the newest
/// byte is dropped when the ring is full.
pub struct TxRing {
    pub buf: [u8; TX_RING_LEN],
    pub read: u32,
    pub write: u32,
}

impl TxRing {
    pub fn new() -> Self {
        Self {
            buf: [0; TX_RING_LEN],
            read: 0,
            write: 0,
        }
    }

    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    pub fn push(&mut self, byte: u8) {
        let next = (self.write + 1) % TX_RING_LEN as u32;
        if next == self.read {
            // Drop on overflow (best-effort).
            return;
        }
        self.buf[self.write as usize] = byte;
        self.write = next;
    }

    /// Drain up to `dst.len()` bytes, returning the count moved.
    pub fn pop(&mut self, dst: &mut [u8]) -> usize {
        let mut n = 0;
        while self.read != self.write && n < dst.len() {
            dst[n] = self.buf[self.read as usize];
            n += 1;
            self.read = (self.read + 1) % TX_RING_LEN as u32;
        }
        n
    }
}

impl Default for TxRing {
    fn default() -> Self {
        Self::new()
    }
}

const ALTAID_KEY_MAP: &[InputKey] = &[
    InputKey { id: 0, name: "D0" },
    InputKey { id: 1, name: "D1" },
    InputKey { id: 2, name: "D2" },
    InputKey { id: 3, name: "D3" },
    InputKey { id: 4, name: "D4" },
    InputKey { id: 5, name: "D5" },
    InputKey { id: 6, name: "D6" },
    InputKey { id: 7, name: "D7" },
    InputKey { id: 8, name: "RUN" },
    InputKey { id: 9, name: "MODE" },
    InputKey { id: 10, name: "NEXT" },
];

pub struct AltaidSystem {
    pub cpu_hz: u32,
    pub baud: u32,

    pub cpu: I8080,
    pub hw: AltaidHw,
    /// Owns the canonical tick counter.
    pub serial: Serial,
    pub timer: IntervalTimer,

    pub cassette: Cassette,
    pub cassette_attached: bool,

    pub tx_ring: TxRing,
}

impl AltaidSystem {
    pub fn new(cpu_hz: u32, baud: u32) -> Self {
        let serial = Serial::new(cpu_hz, baud);
        // The serial device substitutes defaults for zero parameters; use
        // the effective values everywhere.
        let (cpu_hz, baud) = (serial.cpu_hz, serial.baud);
        Self {
            cpu_hz,
            baud,
            cpu: I8080::new(),
            hw: AltaidHw::new(),
            serial,
            timer: IntervalTimer::new(cpu_hz),
            cassette: Cassette::new(cpu_hz),
            cassette_attached: false,
            tx_ring: TxRing::new(),
        }
    }

    /// Load a 64 KiB ROM image into the two ROM halves.
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), RomLoadError> {
        let image = RomImage::from_bytes(bytes)?;
        self.hw.load_rom(&image);
        Ok(())
    }

    pub fn load_rom_image(&mut self, image: &RomImage) {
        self.hw.load_rom(image);
    }

    // ── Cassette transport ────────────────────────────────────────────

    /// Attach a tape image (loads it if present, else attaches blank).
    pub fn cassette_attach(&mut self, path: impl AsRef<std::path::Path>) {
        self.cassette.open(path);
        self.cassette_attached = true;
    }

    pub fn cassette_start_play(&mut self) {
        self.cassette.start_play(self.serial.tick);
    }

    pub fn cassette_start_record(&mut self) {
        self.cassette.start_record(self.serial.tick);
    }

    pub fn cassette_stop(&mut self) {
        self.cassette.stop();
    }

    pub fn cassette_rewind(&mut self) {
        self.cassette.rewind();
    }

    pub fn cassette_fast_forward(&mut self, seconds: u32) {
        self.cassette.fast_forward(seconds, self.serial.tick);
    }

    // ── Batch execution ───────────────────────────────────────────────

    /// Refresh the input lines the firmware samples through the input
    /// port: serial RX, cassette input, and the timer pulse.
    fn update_input_lines(&mut self) {
        self.hw.rx_level = self.serial.current_rx_level() != 0;

        self.hw.cassette_in_level = if self.cassette_attached {
            self.cassette.level_at(self.serial.tick)
        } else {
            true // idle high with nothing attached
        };

        // The schedule always advances so long batches never leave the
        // next pulse in the past; the line only shows it when enabled.
        let pulse = self.timer.poll(self.serial.tick);
        self.hw.timer_level = if self.hw.timer_en { !pulse } else { true };
    }

    /// Advance emulation until the tick counter has grown by at least
    /// `batch_cycles`.
    pub fn run_batch(&mut self, batch_cycles: u64) {
        let batch_end = self.serial.tick + batch_cycles;
        while self.serial.tick < batch_end {
            self.update_input_lines();

            let t = self.cpu.step(&mut self.hw);
            self.serial.advance(t);

            // Service the pending RX interrupt (RST 7) on the start-bit
            // edge, once the firmware has interrupts enabled.
            if self.serial.rx_irq_latched && self.cpu.inte {
                self.serial.rx_irq_latched = false;
                self.cpu.service_interrupt(&mut self.hw, 7);
            }

            // Decode the TX line into the host-visible ring.
            let tx_level = self.hw.tx_level();
            let (serial, ring) = (&mut self.serial, &mut self.tx_ring);
            serial.tick_tx(tx_level, |byte| ring.push(byte));

            // Cassette record: capture edges driven by the output latch.
            if self.cassette_attached && self.hw.cassette_out_dirty {
                self.hw.cassette_out_dirty = false;
                self.cassette
                    .on_out_change(self.serial.tick, self.hw.cassette_out_level);
            }

            // Front panel key auto-release.
            self.hw.panel.tick(self.serial.tick);
        }
    }

    /// Reset the machine. ROM and RAM contents persist; everything else
    /// returns to power-on defaults and the tick counter restarts.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.hw.reset_runtime();
        self.serial = Serial::new(self.cpu_hz, self.baud);
        self.tx_ring.clear();
        self.timer.restart();
        if self.cassette_attached {
            self.cassette.stop();
        }
    }

    // ── Host-facing I/O ───────────────────────────────────────────────

    /// Drain decoded TX bytes into `dst`, returning the count.
    pub fn tx_pop(&mut self, dst: &mut [u8]) -> usize {
        self.tx_ring.pop(dst)
    }

    /// Queue a host byte for serial transmission to the firmware.
    pub fn rx_enqueue(&mut self, byte: u8) {
        self.serial.host_enqueue(byte);
    }

    /// Press a momentary front-panel key (indices 0..10).
    pub fn press_key(&mut self, key_index: u8, hold_cycles: u64) {
        self.hw
            .panel
            .press_key(key_index, self.serial.tick, hold_cycles);
    }

    /// Current decoded panel state (latched when a full refresh cycle has
    /// been observed, best-effort before that).
    pub fn panel_view(&self) -> PanelView {
        PanelView {
            addr: self.hw.panel.addr16(),
            data: self.hw.panel.data8(),
            stat: self.hw.panel.stat4(),
            seq: self.hw.panel.latched_seq,
            valid: self.hw.panel.latched_valid,
        }
    }

    /// FNV-1a hash over both ROM halves; hosts use it to label save files.
    pub fn rom_hash(&self) -> u32 {
        crate::stateio::rom_hash32(&self.hw)
    }
}

impl Machine for AltaidSystem {
    fn run_batch(&mut self, batch_cycles: u64) {
        AltaidSystem::run_batch(self, batch_cycles);
    }

    fn reset(&mut self) {
        AltaidSystem::reset(self);
    }

    fn tx_pop(&mut self, dst: &mut [u8]) -> usize {
        AltaidSystem::tx_pop(self, dst)
    }

    fn rx_enqueue(&mut self, byte: u8) {
        AltaidSystem::rx_enqueue(self, byte);
    }

    fn press_key(&mut self, key: u8, hold_cycles: u64) {
        AltaidSystem::press_key(self, key, hold_cycles);
    }

    fn key_map(&self) -> &[InputKey] {
        ALTAID_KEY_MAP
    }

    fn panel(&self) -> PanelView {
        self.panel_view()
    }

    fn tick(&self) -> u64 {
        self.serial.tick
    }
}

// ---------------------------------------------------------------------------
// Machine registry
// ---------------------------------------------------------------------------

fn create_machine(rom: &RomImage) -> Result<Box<dyn Machine>, RomLoadError> {
    let mut sys = AltaidSystem::new(0, 0); // defaults: 2 MHz / 9600
    sys.load_rom_image(rom);
    Ok(Box::new(sys))
}

inventory::submit! {
    MachineEntry::new("altaid", create_machine)
}
