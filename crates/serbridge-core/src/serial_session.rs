use crate::encoding::preview;
use crate::traffic::{Direction, Traffic};
use log::{debug, info, log_enabled, trace, warn, Level};
use serialport::{SerialPort, SerialPortInfo};
use std::fmt;
use std::io::{self, Read, Write};
use std::time::Duration;

#[cfg(target_os = "windows")]
pub const DEFAULT_DEVICE: &str = "COM1";
#[cfg(target_os = "macos")]
pub const DEFAULT_DEVICE: &str = "/dev/tty.usbserial";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long a single driver call may wait before it is silently reissued.
/// Callers never observe this; reads and writes block until they complete.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (port_type, vid, pid, serial_number, manufacturer, product) = match &info.port_type {
            serialport::SerialPortType::UsbPort(usb) => (
                "USB".to_string(),
                Some(usb.vid),
                Some(usb.pid),
                usb.serial_number.clone(),
                usb.manufacturer.clone(),
                usb.product.clone(),
            ),
            serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None, None),
            serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None, None, None, None, None),
            serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None, None, None, None),
        };
        Self {
            port_name: info.port_name,
            port_type,
            vid,
            pid,
            serial_number,
            manufacturer,
            product,
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.port_name, self.port_type)?;
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, "\t{vid:04x}:{pid:04x}")?;
            if let Some(product) = &self.product {
                write!(f, " {product}")?;
            }
        }
        Ok(())
    }
}

pub fn list_ports() -> serialport::Result<Vec<PortInfo>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(PortInfo::from)
        .collect())
}

/// Which device to open and how fast to talk to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// The operations the bridge needs from an open character device.
pub trait Device {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn close(self) -> io::Result<()>;
}

/// A real serial port: 8 data bits, no parity, one stop bit, no flow control.
pub struct SerialPortDevice {
    port: Box<dyn SerialPort>,
}

impl SerialPortDevice {
    pub fn open(cfg: &SerialConfig) -> serialport::Result<Self> {
        let port = serialport::new(&cfg.device, cfg.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()?;
        Ok(Self { port })
    }
}

fn until_ready<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match op() {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            other => return other,
        }
    }
}

impl Device for SerialPortDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        until_ready(|| self.port.read(buf))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        until_ready(|| self.port.write(buf))
    }

    // Drains pending output; the handle itself is released on drop.
    fn close(mut self) -> io::Result<()> {
        self.port.flush()
    }
}

/// The one open device of a bridge run.
///
/// [`SerialSession::close`] is the normal way out. If the session is dropped
/// without it, for instance while unwinding, the device is closed from
/// `Drop` instead, so it is released exactly once either way.
pub struct SerialSession<D: Device> {
    config: SerialConfig,
    device: Option<D>,
    traffic: Traffic,
}

impl<D: Device> SerialSession<D> {
    pub fn open<F>(config: &SerialConfig, open: F) -> serialport::Result<Self>
    where
        F: FnOnce(&SerialConfig) -> serialport::Result<D>,
    {
        let device = open(config)?;
        info!("Opened {} at {} baud", config.device, config.baud_rate);
        Ok(Self {
            config: config.clone(),
            device: Some(device),
            traffic: Traffic::new(),
        })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn traffic(&self) -> &Traffic {
        &self.traffic
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.device()?.read(buf)?;
        self.traffic.push(Direction::Rx, n);
        if log_enabled!(Level::Debug) {
            debug!("RX {n} bytes: {}", preview(&buf[..n]));
        }
        Ok(n)
    }

    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.device()?.write(buf)?;
        self.traffic.push(Direction::Tx, n);
        if log_enabled!(Level::Debug) {
            debug!("TX {n}/{} bytes: {}", buf.len(), preview(&buf[..n]));
        }
        Ok(n)
    }

    pub fn close(mut self) -> io::Result<()> {
        match self.device.take() {
            Some(device) => {
                trace!("Closing {}", self.config.device);
                device.close()?;
                info!("Closed {} ({})", self.config.device, self.traffic);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn device(&mut self) -> io::Result<&mut D> {
        self.device
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial session is closed"))
    }
}

impl<D: Device> Drop for SerialSession<D> {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            warn!("Serial session for {} dropped while open, closing", self.config.device);
            if let Err(e) = device.close() {
                warn!("Failed to close {}: {e}", self.config.device);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingDevice {
        closes: Rc<Cell<u32>>,
        fail_close: bool,
    }

    impl Device for CountingDevice {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            buf[..3].copy_from_slice(b"abc");
            Ok(3)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn close(self) -> io::Result<()> {
            self.closes.set(self.closes.get() + 1);
            if self.fail_close {
                Err(io::Error::new(io::ErrorKind::Other, "drain failed"))
            } else {
                Ok(())
            }
        }
    }

    fn open_counting(closes: &Rc<Cell<u32>>, fail_close: bool) -> SerialSession<CountingDevice> {
        let closes = closes.clone();
        SerialSession::open(&SerialConfig::default(), move |_| {
            Ok(CountingDevice { closes, fail_close })
        })
        .unwrap()
    }

    #[test]
    fn timeouts_are_reissued_until_data_arrives() {
        let mut calls = 0;
        let result = until_ready(|| {
            calls += 1;
            if calls < 3 {
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data yet"))
            } else {
                Ok(3)
            }
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn other_errors_are_returned_immediately() {
        let mut calls = 0;
        let result: io::Result<usize> = until_ready(|| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        });
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(calls, 1);
    }

    #[test]
    fn default_config_uses_115200() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.device, DEFAULT_DEVICE);
    }

    #[test]
    fn open_failure_is_passed_through() {
        let result = SerialSession::<CountingDevice>::open(&SerialConfig::default(), |_| {
            Err(serialport::Error::new(serialport::ErrorKind::NoDevice, "missing"))
        });
        let err = result.err().unwrap();
        assert_eq!(err.kind(), serialport::ErrorKind::NoDevice);
    }

    #[test]
    fn explicit_close_runs_once() {
        let closes = Rc::new(Cell::new(0));
        let session = open_counting(&closes, false);
        session.close().unwrap();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn drop_closes_an_open_session() {
        let closes = Rc::new(Cell::new(0));
        drop(open_counting(&closes, false));
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn failed_close_is_not_retried_on_drop() {
        let closes = Rc::new(Cell::new(0));
        let session = open_counting(&closes, true);
        assert!(session.close().is_err());
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn transfers_are_tallied() {
        let closes = Rc::new(Cell::new(0));
        let mut session = open_counting(&closes, false);
        let mut buf = [0u8; 8];
        assert_eq!(session.read(&mut buf).unwrap(), 3);
        assert_eq!(session.write(b"hello").unwrap(), 5);
        assert_eq!(session.traffic().bytes(Direction::Rx), 3);
        assert_eq!(session.traffic().bytes(Direction::Tx), 5);
    }

    #[test]
    fn port_info_line_includes_usb_ids() {
        let info = PortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: "USB".to_string(),
            vid: Some(0x0403),
            pid: Some(0x6001),
            serial_number: None,
            manufacturer: None,
            product: Some("FT232R".to_string()),
        };
        assert_eq!(info.to_string(), "/dev/ttyUSB0\tUSB\t0403:6001 FT232R");
    }
}
