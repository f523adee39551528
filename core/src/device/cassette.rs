//! Digital cassette line, recorded as edge timings.
//!
//! The firmware drives the cassette output by writing a level to its latch
//! port and samples the input as a digital level on the input port. Rather
//! than assuming a bit rate or encoding, the tape stores the durations (in
//! CPU ticks) between level changes; polarity is implicit in the
//! alternation from the initial level. Any firmware that produces or
//! consumes a digital waveform on those lines round-trips.
//!
//! Tape image format (`ALTAP001`, version 1, all integers little-endian):
//!
//! | Offset | Size | Field                  |
//! |--------|------|------------------------|
//! | 0      | 8    | magic `ALTAP001`       |
//! | 8      | 4    | version (=1)           |
//! | 12     | 4    | cpu_hz                 |
//! | 16     | 1    | initial level (0/1)    |
//! | 17     | 3    | reserved               |
//! | 20     | 4    | duration count         |
//!
//! followed by that many u32 durations. No trailer.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const TAPE_MAGIC: [u8; 8] = *b"ALTAP001";
pub const TAPE_VERSION: u32 = 1;
const TAPE_HEADER_LEN: usize = 24;

/// Failure to read or write an attached tape image.
#[derive(Debug)]
pub enum CassetteError {
    Io(std::io::Error),
    /// No tape attached (or the attached path is empty).
    NotAttached,
}

impl fmt::Display for CassetteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cassette I/O error: {e}"),
            Self::NotAttached => write!(f, "no cassette attached"),
        }
    }
}

impl std::error::Error for CassetteError {}

impl From<std::io::Error> for CassetteError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub struct Cassette {
    pub attached: bool,
    pub path: PathBuf,

    pub cpu_hz: u32,

    /// Idle / "no tape" level.
    pub idle_level: bool,
    /// Current level presented to the machine.
    pub in_level: bool,

    // Playback
    pub playing: bool,
    pub play_level: bool,
    /// Next duration index.
    pub play_index: usize,
    pub play_next_edge_tick: u64,

    // Recording
    pub recording: bool,
    pub rec_last_edge_tick: u64,
    pub rec_last_level: bool,

    /// Durations between consecutive edges, in CPU ticks.
    pub durations: Vec<u32>,
}

fn read_u32le(d: &[u8], o: usize) -> u32 {
    u32::from_le_bytes([d[o], d[o + 1], d[o + 2], d[o + 3]])
}

impl Cassette {
    pub fn new(cpu_hz: u32) -> Self {
        Self {
            attached: false,
            path: PathBuf::new(),
            cpu_hz,
            // Idle high matches the input comparator's resting state.
            idle_level: true,
            in_level: true,
            playing: false,
            play_level: true,
            play_index: 0,
            play_next_edge_tick: 0,
            recording: false,
            rec_last_edge_tick: 0,
            rec_last_level: false,
            durations: Vec::new(),
        }
    }

    fn clear_tape(&mut self) {
        self.durations.clear();
        self.play_index = 0;
        self.play_next_edge_tick = 0;
        self.play_level = self.idle_level;
        self.in_level = self.idle_level;
    }

    /// Attach a tape image. Loads the image when the file exists and has a
    /// recognized header; otherwise attaches a blank tape (ready for
    /// recording a fresh image at that path).
    pub fn open(&mut self, path: impl AsRef<Path>) {
        self.path = path.as_ref().to_path_buf();

        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(_) => {
                self.clear_tape();
                self.attached = true;
                return;
            }
        };

        if bytes.len() < TAPE_HEADER_LEN
            || bytes[0..8] != TAPE_MAGIC
            || read_u32le(&bytes, 8) != TAPE_VERSION
        {
            log::warn!(
                "cassette image {}: unrecognized header, attaching blank tape",
                self.path.display()
            );
            self.clear_tape();
            self.attached = true;
            return;
        }

        self.clear_tape();
        let cpu_hz = read_u32le(&bytes, 12);
        if cpu_hz != 0 {
            self.cpu_hz = cpu_hz;
        }
        self.idle_level = bytes[16] != 0;
        self.play_level = self.idle_level;
        self.in_level = self.idle_level;

        let count = read_u32le(&bytes, 20) as usize;
        let mut off = TAPE_HEADER_LEN;
        self.durations.reserve(count);
        for _ in 0..count {
            // A truncated body keeps whatever loaded cleanly.
            if off + 4 > bytes.len() {
                break;
            }
            self.durations.push(read_u32le(&bytes, off));
            off += 4;
        }

        self.attached = true;
    }

    /// Persist the current tape contents to the attached image path.
    pub fn save(&self) -> Result<(), CassetteError> {
        if !self.attached || self.path.as_os_str().is_empty() {
            return Err(CassetteError::NotAttached);
        }

        let mut out = Vec::with_capacity(TAPE_HEADER_LEN + self.durations.len() * 4);
        out.extend_from_slice(&TAPE_MAGIC);
        out.extend_from_slice(&TAPE_VERSION.to_le_bytes());
        out.extend_from_slice(&self.cpu_hz.to_le_bytes());
        out.push(u8::from(self.idle_level));
        out.extend_from_slice(&[0; 3]);
        out.extend_from_slice(&(self.durations.len() as u32).to_le_bytes());
        for &d in &self.durations {
            out.extend_from_slice(&d.to_le_bytes());
        }

        fs::write(&self.path, out)?;
        Ok(())
    }

    /// Stop the transport. A recording in progress is persisted first.
    pub fn stop(&mut self) {
        self.playing = false;
        if self.recording {
            self.recording = false;
            if let Err(e) = self.save() {
                log::warn!("cassette save failed: {e}");
            }
        }
        self.in_level = self.idle_level;
    }

    pub fn rewind(&mut self) {
        self.play_index = 0;
        self.play_level = self.idle_level;
        self.in_level = self.idle_level;
        self.play_next_edge_tick = 0;
    }

    /// Skip `seconds` of tape time by simulating edges from `now_tick`.
    pub fn fast_forward(&mut self, seconds: u32, now_tick: u64) {
        if !self.playing || self.durations.is_empty() {
            return;
        }
        let target = now_tick + u64::from(self.cpu_hz) * u64::from(seconds);

        let mut t = now_tick;
        while self.play_index < self.durations.len() {
            let dt = u64::from(self.durations[self.play_index]);
            if t + dt >= target {
                break;
            }
            t += dt;
            self.play_index += 1;
            self.play_level = !self.play_level;
        }

        let next = self
            .durations
            .get(self.play_index)
            .copied()
            .unwrap_or(0);
        self.play_next_edge_tick = t + u64::from(next);
        self.in_level = self.play_level;
    }

    pub fn start_play(&mut self, now_tick: u64) {
        if !self.attached {
            return;
        }
        self.recording = false;
        self.playing = true;
        self.play_level = self.idle_level;
        self.in_level = self.play_level;
        self.play_index = 0;
        let first = self.durations.first().copied().unwrap_or(0);
        self.play_next_edge_tick = now_tick + u64::from(first);
    }

    pub fn start_record(&mut self, now_tick: u64) {
        if !self.attached {
            return;
        }
        self.clear_tape();
        self.recording = true;
        self.playing = false;
        self.rec_last_edge_tick = now_tick;
        self.rec_last_level = false;
        self.idle_level = true;
        self.in_level = self.idle_level;
    }

    /// Record an output-latch edge while recording. The stored value is
    /// the duration since the previous edge, saturated to u32.
    pub fn on_out_change(&mut self, tick: u64, new_level: bool) {
        if !self.recording {
            return;
        }
        let dt64 = tick - self.rec_last_edge_tick;
        let dt = u32::try_from(dt64).unwrap_or(u32::MAX);
        self.durations.push(dt);
        self.rec_last_edge_tick = tick;
        self.rec_last_level = new_level;
    }

    /// Input level at `tick` during playback; idle level otherwise.
    /// Advances the play cursor through every edge scheduled at or before
    /// `tick`, flipping the level per edge.
    pub fn level_at(&mut self, tick: u64) -> bool {
        if !self.playing || self.durations.is_empty() {
            self.in_level = self.idle_level;
            return self.in_level;
        }

        while self.play_index < self.durations.len() && tick >= self.play_next_edge_tick {
            self.play_level = !self.play_level;
            self.play_index += 1;
            if self.play_index < self.durations.len() {
                self.play_next_edge_tick += u64::from(self.durations[self.play_index]);
            }
        }

        self.in_level = self.play_level;
        self.in_level
    }

    /// One-line transport status for host status lines.
    pub fn status(&self) -> &'static str {
        if !self.attached {
            "cassette: (none)"
        } else if self.recording {
            "cassette: REC"
        } else if self.playing {
            "cassette: PLAY"
        } else {
            "cassette: STOP"
        }
    }
}
