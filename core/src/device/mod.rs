pub mod cassette;
pub mod serial;
pub mod timer;

pub use cassette::Cassette;
pub use serial::Serial;
pub use timer::IntervalTimer;
