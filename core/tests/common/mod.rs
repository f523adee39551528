use altaid_core::core::Bus;

/// Minimal bus for CPU testing: flat 64 KiB memory plus a recording I/O
/// port surface (every port reads a preset value, writes are logged).
pub struct TestBus {
    pub memory: [u8; 0x10000],
    pub in_ports: [u8; 256],
    pub out_log: Vec<(u8, u8)>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            in_ports: [0xFF; 256],
            out_log: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn mem_write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn io_in(&mut self, port: u8) -> u8 {
        self.in_ports[port as usize]
    }

    fn io_out(&mut self, port: u8, data: u8) {
        self.out_log.push((port, data));
    }
}
