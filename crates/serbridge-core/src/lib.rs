//! Core functionalities: serial session, stdin probing, the bridge loop.

pub mod bridge;
pub mod encoding;
pub mod error;
pub mod serial_session;
pub mod stdin;
pub mod traffic;

pub use bridge::{Bridge, BridgeConfig, Report, CHUNK_SIZE};
pub use error::BridgeError;
pub use serial_session::{
    list_ports, Device, PortInfo, SerialConfig, SerialPortDevice, SerialSession, DEFAULT_BAUD_RATE,
    DEFAULT_DEVICE,
};
pub use stdin::{Input, Stdin};
pub use traffic::{Direction, Traffic};
