/// Describes a single front-panel key that a machine accepts.
pub struct InputKey {
    /// Machine-defined key identifier, passed to `press_key()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "RUN", "D3").
    pub name: &'static str,
}

/// Stable decoded view of the front-panel display.
///
/// `valid` is false until the firmware has refreshed every LED row at least
/// once since the last latch; until then the fields hold a best-effort
/// decoding that may mix nibbles from different scan cycles. `seq`
/// increments each time a fresh snapshot is latched, so callers can detect
/// panel changes without comparing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelView {
    pub addr: u16,
    pub data: u8,
    pub stat: u8,
    pub seq: u32,
    pub valid: bool,
}

/// Machine-agnostic interface for emulated boards.
///
/// The front end is a pure host shell: it moves serial bytes in and out,
/// forwards key presses, and renders panel snapshots. It does not know
/// about banking latches, scan rows, or interrupt wiring.
pub trait Machine {
    /// Advance emulation until the tick counter has grown by at least
    /// `batch_cycles`. Completes synchronously; the host interleaves
    /// rendering, input polling, and throttling between batches.
    fn run_batch(&mut self, batch_cycles: u64);

    /// Reset to power-on defaults. ROM and RAM contents persist.
    fn reset(&mut self);

    /// Drain decoded serial output into `dst`, returning the byte count.
    fn tx_pop(&mut self, dst: &mut [u8]) -> usize;

    /// Queue a host byte for serial transmission to the machine.
    fn rx_enqueue(&mut self, byte: u8);

    /// Press a momentary panel key for `hold_cycles` ticks (minimum 1).
    fn press_key(&mut self, key: u8, hold_cycles: u64);

    /// The list of panel keys this machine accepts.
    fn key_map(&self) -> &[InputKey];

    /// Current decoded panel state.
    fn panel(&self) -> PanelView;

    /// Monotonic CPU tick counter (t-states since construction or load).
    fn tick(&self) -> u64;
}
