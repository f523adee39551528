//! Binary save/load of machine state and RAM images.
//!
//! Two file kinds share a 24-byte header:
//!
//! ```text
//! STATE: magic "ALTAIDST" + u32 version + u32 rom_hash + u32 cpu_hz + u32 baud
//! RAM:   magic "ALTAIDRM" + u32 version + u32 rom_hash + u32 cpu_hz + u32 baud
//! ```
//!
//! All multi-byte integers are little-endian; booleans are a single 0/1
//! byte. The ROM hash is FNV-1a-32 over both ROM halves, so a state saved
//! against one monitor ROM refuses to load against another, and loads also
//! refuse when the machine's clock or baud configuration differs from the
//! saver's.
//!
//! The codec works on byte buffers; `*_file` wrappers read/write whole
//! files at the given path.

use std::fmt;
use std::path::PathBuf;

use altaid_core::cpu::I8080;
use altaid_core::device::cassette::Cassette;
use altaid_core::device::serial::{Serial, RX_QUEUE_LEN};

use crate::altaid::{AltaidSystem, TX_RING_LEN};
use crate::altaid_hw::AltaidHw;
use crate::panel::{KEY_COUNT, LED_ROWS};

const STATE_MAGIC: [u8; 8] = *b"ALTAIDST";
const RAM_MAGIC: [u8; 8] = *b"ALTAIDRM";
const STATEIO_VERSION: u32 = 1;

/// Fixed length of the cassette path field inside a state file.
const CASSETTE_PATH_LEN: usize = 512;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StateIoError {
    /// Underlying file I/O error.
    Io(std::io::Error),

    /// Bad magic, unknown version, or a truncated/corrupt body.
    Invalid(String),

    /// Well-formed file for a different ROM or clock configuration.
    Incompatible(String),
}

impl fmt::Display for StateIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Invalid(msg) => write!(f, "invalid file: {msg}"),
            Self::Incompatible(msg) => write!(f, "incompatible file: {msg}"),
        }
    }
}

impl std::error::Error for StateIoError {}

impl From<std::io::Error> for StateIoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// ROM hash
// ---------------------------------------------------------------------------

const FNV_SEED: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a32(bytes: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    for &b in bytes {
        h ^= u32::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// FNV-1a-32 over both ROM halves (the whole 64 KiB image).
pub fn rom_hash32(hw: &AltaidHw) -> u32 {
    fnv1a32(&hw.rom, FNV_SEED)
}

// ---------------------------------------------------------------------------
// Little-endian byte cursors
// ---------------------------------------------------------------------------

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn bool(&mut self, v: bool) {
        self.u8(u8::from(v));
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], StateIoError> {
        if self.pos + n > self.data.len() {
            return Err(StateIoError::Invalid(format!("truncated at {what}")));
        }
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u8(&mut self, what: &str) -> Result<u8, StateIoError> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32, StateIoError> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, what: &str) -> Result<u64, StateIoError> {
        let b = self.take(8, what)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn bool(&mut self, what: &str) -> Result<bool, StateIoError> {
        Ok(self.u8(what)? != 0)
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

fn write_header(w: &mut Writer, magic: &[u8; 8], sys: &AltaidSystem) {
    w.bytes(magic);
    w.u32(STATEIO_VERSION);
    w.u32(rom_hash32(&sys.hw));
    w.u32(sys.cpu_hz);
    w.u32(sys.baud);
}

fn check_header(
    r: &mut Reader<'_>,
    magic: &[u8; 8],
    sys: &AltaidSystem,
) -> Result<(), StateIoError> {
    let m = r.take(8, "magic")?;
    if m != magic {
        return Err(StateIoError::Invalid("bad magic".into()));
    }
    let ver = r.u32("version")?;
    if ver != STATEIO_VERSION {
        return Err(StateIoError::Invalid(format!("unsupported version {ver}")));
    }
    let rom_hash = r.u32("rom hash")?;
    let want = rom_hash32(&sys.hw);
    if rom_hash != want {
        return Err(StateIoError::Incompatible(format!(
            "ROM hash mismatch (file {rom_hash:#010x}, loaded ROM {want:#010x})"
        )));
    }
    let cpu_hz = r.u32("cpu_hz")?;
    let baud = r.u32("baud")?;
    if cpu_hz != sys.cpu_hz || baud != sys.baud {
        return Err(StateIoError::Incompatible(format!(
            "clock mismatch (file {cpu_hz} Hz / {baud} baud, machine {} Hz / {} baud)",
            sys.cpu_hz, sys.baud
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CPU
// ---------------------------------------------------------------------------

// Flags byte layout: bit0=Z bit1=S bit2=P bit3=CY bit4=AC bit5=INTE
// bit6=EI-pending bit7=HALT.

fn write_cpu(w: &mut Writer, cpu: &I8080) {
    let flags = u8::from(cpu.z)
        | u8::from(cpu.s) << 1
        | u8::from(cpu.p) << 2
        | u8::from(cpu.cy) << 3
        | u8::from(cpu.ac) << 4
        | u8::from(cpu.inte) << 5
        | u8::from(cpu.ei_pending) << 6
        | u8::from(cpu.halted) << 7;

    w.u8(cpu.a);
    w.u8(cpu.b);
    w.u8(cpu.c);
    w.u8(cpu.d);
    w.u8(cpu.e);
    w.u8(cpu.h);
    w.u8(cpu.l);
    w.u32(u32::from(cpu.pc));
    w.u32(u32::from(cpu.sp));
    w.u8(flags);
}

fn read_cpu(r: &mut Reader<'_>, cpu: &mut I8080) -> Result<(), StateIoError> {
    cpu.a = r.u8("cpu.a")?;
    cpu.b = r.u8("cpu.b")?;
    cpu.c = r.u8("cpu.c")?;
    cpu.d = r.u8("cpu.d")?;
    cpu.e = r.u8("cpu.e")?;
    cpu.h = r.u8("cpu.h")?;
    cpu.l = r.u8("cpu.l")?;
    cpu.pc = r.u32("cpu.pc")? as u16;
    cpu.sp = r.u32("cpu.sp")? as u16;

    let flags = r.u8("cpu.flags")?;
    cpu.z = flags & 1 << 0 != 0;
    cpu.s = flags & 1 << 1 != 0;
    cpu.p = flags & 1 << 2 != 0;
    cpu.cy = flags & 1 << 3 != 0;
    cpu.ac = flags & 1 << 4 != 0;
    cpu.inte = flags & 1 << 5 != 0;
    cpu.ei_pending = flags & 1 << 6 != 0;
    cpu.halted = flags & 1 << 7 != 0;
    Ok(())
}

// ---------------------------------------------------------------------------
// Serial
// ---------------------------------------------------------------------------

fn write_serial(w: &mut Writer, s: &Serial) {
    w.u32(s.cpu_hz);
    w.u32(s.baud);
    w.u32(s.ticks_per_bit);
    w.u64(s.tick);
    w.u8(s.last_tx);
    w.bool(s.tx_active);
    w.u64(s.tx_next_sample);
    w.u8(s.tx_bit_index);
    w.u8(s.tx_byte);
    w.u32(s.rx_head);
    w.u32(s.rx_tail);
    w.bool(s.rx_active);
    w.u64(s.rx_frame_start);
    w.u8(s.rx_byte);
    w.bool(s.rx_irq_latched);
    w.bytes(&s.rx_queue);
}

fn read_serial(r: &mut Reader<'_>, s: &mut Serial) -> Result<(), StateIoError> {
    s.cpu_hz = r.u32("serial.cpu_hz")?;
    s.baud = r.u32("serial.baud")?;
    s.ticks_per_bit = r.u32("serial.ticks_per_bit")?;
    s.tick = r.u64("serial.tick")?;
    s.last_tx = r.u8("serial.last_tx")?;
    s.tx_active = r.bool("serial.tx_active")?;
    s.tx_next_sample = r.u64("serial.tx_next_sample")?;
    s.tx_bit_index = r.u8("serial.tx_bit_index")?;
    s.tx_byte = r.u8("serial.tx_byte")?;
    s.rx_head = r.u32("serial.rx_head")?;
    s.rx_tail = r.u32("serial.rx_tail")?;
    s.rx_active = r.bool("serial.rx_active")?;
    s.rx_frame_start = r.u64("serial.rx_frame_start")?;
    s.rx_byte = r.u8("serial.rx_byte")?;
    s.rx_irq_latched = r.bool("serial.rx_irq_latched")?;
    s.rx_queue
        .copy_from_slice(r.take(RX_QUEUE_LEN, "serial.rx_queue")?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Hardware (RAM, banking latches, panel)
// ---------------------------------------------------------------------------

fn write_hw(w: &mut Writer, hw: &AltaidHw) {
    w.bytes(&hw.ram);

    w.u8(hw.ram_a16);
    w.u8(hw.ram_a17);
    w.u8(hw.ram_a18);
    w.u8(hw.ram_bank);
    w.u8(hw.rom_half);
    w.bool(hw.rom_low_mapped);
    w.bool(hw.rom_hi_mapped);
    w.u8(hw.out_c0);
    w.bool(hw.tx_line);
    w.bool(hw.rx_level);
    w.bool(hw.timer_en);
    w.bool(hw.timer_level);
    w.bool(hw.cassette_out_level);
    w.bool(hw.cassette_out_dirty);
    w.bool(hw.cassette_in_level);
    w.u8(hw.panel.scan_row);
    w.u8(hw.panel.led_row_mask);
    w.bool(hw.panel.latched_valid);
    w.u32(hw.panel.latched_seq);
    w.u32(u32::from(hw.panel.latched_addr));
    w.u8(hw.panel.latched_data);
    w.u8(hw.panel.latched_stat);
    w.bytes(&hw.panel.led_row_nibble);

    for i in 0..KEY_COUNT {
        w.bool(hw.panel.key_down[i]);
        w.u64(hw.panel.key_until[i]);
    }
}

fn read_hw(r: &mut Reader<'_>, hw: &mut AltaidHw) -> Result<(), StateIoError> {
    let ram_len = hw.ram.len();
    hw.ram.copy_from_slice(r.take(ram_len, "ram")?);

    hw.ram_a16 = r.u8("hw.ram_a16")?;
    hw.ram_a17 = r.u8("hw.ram_a17")?;
    hw.ram_a18 = r.u8("hw.ram_a18")?;
    hw.ram_bank = r.u8("hw.ram_bank")?;
    hw.rom_half = r.u8("hw.rom_half")?;
    hw.rom_low_mapped = r.bool("hw.rom_low_mapped")?;
    hw.rom_hi_mapped = r.bool("hw.rom_hi_mapped")?;
    hw.out_c0 = r.u8("hw.out_c0")?;
    hw.tx_line = r.bool("hw.tx_line")?;
    hw.rx_level = r.bool("hw.rx_level")?;
    hw.timer_en = r.bool("hw.timer_en")?;
    hw.timer_level = r.bool("hw.timer_level")?;
    hw.cassette_out_level = r.bool("hw.cassette_out_level")?;
    hw.cassette_out_dirty = r.bool("hw.cassette_out_dirty")?;
    hw.cassette_in_level = r.bool("hw.cassette_in_level")?;
    hw.panel.scan_row = r.u8("panel.scan_row")?;
    hw.panel.led_row_mask = r.u8("panel.led_row_mask")?;
    hw.panel.latched_valid = r.bool("panel.latched_valid")?;
    hw.panel.latched_seq = r.u32("panel.latched_seq")?;
    hw.panel.latched_addr = r.u32("panel.latched_addr")? as u16;
    hw.panel.latched_data = r.u8("panel.latched_data")?;
    hw.panel.latched_stat = r.u8("panel.latched_stat")?;
    hw.panel
        .led_row_nibble
        .copy_from_slice(r.take(LED_ROWS, "panel.led_row_nibble")?);

    for i in 0..KEY_COUNT {
        hw.panel.key_down[i] = r.bool("panel.key_down")?;
        hw.panel.key_until[i] = r.u64("panel.key_until")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Cassette
// ---------------------------------------------------------------------------

fn write_cassette(w: &mut Writer, c: &Cassette) {
    w.bool(c.attached);

    // Fixed-length, null-padded path field.
    let mut path_field = [0u8; CASSETTE_PATH_LEN];
    let p = c.path.to_string_lossy();
    let bytes = p.as_bytes();
    let n = bytes.len().min(CASSETTE_PATH_LEN - 1);
    path_field[..n].copy_from_slice(&bytes[..n]);
    w.bytes(&path_field);

    w.u32(c.cpu_hz);
    w.bool(c.idle_level);
    w.bool(c.in_level);
    w.bool(c.playing);
    w.bool(c.play_level);
    w.u64(c.play_index as u64);
    w.u64(c.play_next_edge_tick);
    w.bool(c.recording);
    w.u64(c.rec_last_edge_tick);
    w.bool(c.rec_last_level);
    w.u64(c.durations.len() as u64);
    for &d in &c.durations {
        w.u32(d);
    }
}

fn read_cassette(r: &mut Reader<'_>, c: &mut Cassette) -> Result<(), StateIoError> {
    c.attached = r.bool("cassette.attached")?;

    let path_field = r.take(CASSETTE_PATH_LEN, "cassette.path")?;
    let end = path_field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(CASSETTE_PATH_LEN);
    c.path = PathBuf::from(String::from_utf8_lossy(&path_field[..end]).into_owned());

    c.cpu_hz = r.u32("cassette.cpu_hz")?;
    c.idle_level = r.bool("cassette.idle_level")?;
    c.in_level = r.bool("cassette.in_level")?;
    c.playing = r.bool("cassette.playing")?;
    c.play_level = r.bool("cassette.play_level")?;
    c.play_index = r.u64("cassette.play_index")? as usize;
    c.play_next_edge_tick = r.u64("cassette.play_next_edge_tick")?;
    c.recording = r.bool("cassette.recording")?;
    c.rec_last_edge_tick = r.u64("cassette.rec_last_edge_tick")?;
    c.rec_last_level = r.bool("cassette.rec_last_level")?;

    let count = r.u64("cassette.dur_count")? as usize;
    c.durations.clear();
    c.durations.reserve(count.min(1 << 20));
    for _ in 0..count {
        c.durations.push(r.u32("cassette.duration")?);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize the complete machine state.
pub fn save_state(sys: &AltaidSystem) -> Vec<u8> {
    let mut w = Writer::new();
    write_header(&mut w, &STATE_MAGIC, sys);

    w.u64(sys.timer.period);
    w.u64(sys.timer.next_tick);
    w.u32(sys.tx_ring.read);
    w.u32(sys.tx_ring.write);
    w.bytes(&sys.tx_ring.buf);

    write_cpu(&mut w, &sys.cpu);
    write_serial(&mut w, &sys.serial);
    write_hw(&mut w, &sys.hw);
    w.bool(sys.cassette_attached);
    write_cassette(&mut w, &sys.cassette);

    w.buf
}

/// Restore a complete machine state saved by [`save_state`].
///
/// Refuses with a descriptive reason on a magic/version mismatch, a
/// truncated body, a different ROM, or a different clock configuration.
pub fn load_state(sys: &mut AltaidSystem, bytes: &[u8]) -> Result<(), StateIoError> {
    let mut r = Reader::new(bytes);
    check_header(&mut r, &STATE_MAGIC, sys)?;

    sys.timer.period = r.u64("timer.period")?;
    sys.timer.next_tick = r.u64("timer.next_tick")?;
    // Re-reduce the ring indices so a hand-edited file cannot put them
    // outside the ring.
    sys.tx_ring.read = r.u32("tx_ring.read")? % TX_RING_LEN as u32;
    sys.tx_ring.write = r.u32("tx_ring.write")? % TX_RING_LEN as u32;
    sys.tx_ring
        .buf
        .copy_from_slice(r.take(TX_RING_LEN, "tx_ring.buf")?);

    read_cpu(&mut r, &mut sys.cpu)?;
    read_serial(&mut r, &mut sys.serial)?;
    read_hw(&mut r, &mut sys.hw)?;
    sys.cassette_attached = r.bool("cassette_attached")?;
    read_cassette(&mut r, &mut sys.cassette)?;

    Ok(())
}

/// Serialize all eight RAM banks.
pub fn save_ram(sys: &AltaidSystem) -> Vec<u8> {
    let mut w = Writer::new();
    write_header(&mut w, &RAM_MAGIC, sys);
    w.bytes(&sys.hw.ram);
    w.buf
}

/// Restore RAM contents saved by [`save_ram`].
pub fn load_ram(sys: &mut AltaidSystem, bytes: &[u8]) -> Result<(), StateIoError> {
    let mut r = Reader::new(bytes);
    check_header(&mut r, &RAM_MAGIC, sys)?;
    let len = sys.hw.ram.len();
    sys.hw.ram.copy_from_slice(r.take(len, "ram")?);
    Ok(())
}

pub fn save_state_file(
    sys: &AltaidSystem,
    path: impl AsRef<std::path::Path>,
) -> Result<(), StateIoError> {
    std::fs::write(path.as_ref(), save_state(sys))?;
    log::debug!("saved machine state to {}", path.as_ref().display());
    Ok(())
}

pub fn load_state_file(
    sys: &mut AltaidSystem,
    path: impl AsRef<std::path::Path>,
) -> Result<(), StateIoError> {
    let bytes = std::fs::read(path.as_ref())?;
    load_state(sys, &bytes)
}

pub fn save_ram_file(
    sys: &AltaidSystem,
    path: impl AsRef<std::path::Path>,
) -> Result<(), StateIoError> {
    std::fs::write(path.as_ref(), save_ram(sys))?;
    Ok(())
}

pub fn load_ram_file(
    sys: &mut AltaidSystem,
    path: impl AsRef<std::path::Path>,
) -> Result<(), StateIoError> {
    let bytes = std::fs::read(path.as_ref())?;
    load_ram(sys, &bytes)
}
