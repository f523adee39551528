/// Memory and I/O port access as seen from a bus master (the CPU).
///
/// The 8080 has a 64 KiB memory space and a separate 256-port I/O space;
/// both are total: every address and every port has a defined response
/// (unmapped reads float high, unmapped writes are ignored). The CPU takes
/// the bus by mutable reference for the duration of a single instruction,
/// so the concrete machine can implement this directly on its hardware
/// state without any back-pointers.
pub trait Bus {
    fn mem_read(&mut self, addr: u16) -> u8;
    fn mem_write(&mut self, addr: u16, data: u8);

    /// Read from the I/O port space (IN instruction).
    fn io_in(&mut self, port: u8) -> u8;

    /// Write to the I/O port space (OUT instruction).
    fn io_out(&mut self, port: u8, data: u8);
}
