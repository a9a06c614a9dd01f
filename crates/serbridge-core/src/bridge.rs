//! The stdin/stdout to serial port bridge.
//!
//! A run opens the device, forwards at most one chunk of piped standard
//! input to it, then copies device reads to the output until something
//! fails. Every failure is written to the error stream as it happens and
//! collected into the returned [`Report`]; deciding the exit status is left
//! to the caller.

use crate::error::{BridgeError, Result};
use crate::serial_session::{Device, SerialConfig, SerialSession};
use crate::stdin::Input;
use log::{debug, trace, warn};
use std::convert::Infallible;
use std::fmt;
use std::io::Write;

/// Size of the single stdin read and of each device read.
pub const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    pub verbose: bool,
}

/// How a run ended.
#[derive(Debug, Default)]
pub struct Report {
    errors: Vec<BridgeError>,
    closed: bool,
}

impl Report {
    /// Errors in the order they were reported.
    pub fn errors(&self) -> &[BridgeError] {
        &self.errors
    }

    /// Whether the session was closed successfully.
    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

pub struct Bridge<I, O, E> {
    config: BridgeConfig,
    stdin: I,
    out: O,
    err: E,
}

impl<I: Input, O: Write, E: Write> Bridge<I, O, E> {
    pub fn new(config: BridgeConfig, stdin: I, out: O, err: E) -> Self {
        Self {
            config,
            stdin,
            out,
            err,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Runs the bridge against the device produced by `open`.
    ///
    /// Only returns once something has failed, since the read loop has no
    /// other way out. If the device opened, it has been closed by the time
    /// this returns.
    pub fn run<D, F>(&mut self, open: F) -> Report
    where
        D: Device,
        F: FnOnce(&SerialConfig) -> serialport::Result<D>,
    {
        let mut report = Report::default();

        if self.config.verbose {
            let serial = &self.config.serial;
            let line = format!(
                "Connecting to serial device '{}' at baud rate {}...",
                serial.device, serial.baud_rate
            );
            self.status(line);
        }

        let mut session = match SerialSession::open(&self.config.serial, open) {
            Ok(session) => session,
            Err(e) => {
                self.fail(&mut report, BridgeError::Open(e));
                return report;
            }
        };

        match self.pump(&mut session) {
            Ok(never) => match never {},
            Err(e) => self.fail(&mut report, e),
        }

        match session.close() {
            Ok(()) => {
                report.closed = true;
                self.status("Closed serial port");
            }
            Err(e) => self.fail(&mut report, BridgeError::Close(e)),
        }

        report
    }

    fn pump<D: Device>(&mut self, session: &mut SerialSession<D>) -> Result<Infallible> {
        self.forward_stdin(session)?;

        if self.config.verbose {
            self.status("Reading from serial port...");
        }

        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = session.read(&mut buf).map_err(BridgeError::DeviceRead)?;
            self.out
                .write_all(&buf[..n])
                .and_then(|()| self.out.flush())
                .map_err(BridgeError::Output)?;
        }
    }

    fn forward_stdin<D: Device>(&mut self, session: &mut SerialSession<D>) -> Result<()> {
        if !self.stdin.is_pipe().map_err(BridgeError::StdinInfo)? {
            trace!("stdin is not a pipe, nothing to forward");
            return Ok(());
        }

        let mut buf = [0u8; CHUNK_SIZE];
        let n = self.stdin.read(&mut buf).map_err(BridgeError::StdinRead)?;
        if self.config.verbose {
            self.status(format_args!("Got {n} bytes on stdin."));
        }

        let written = session.write(&buf[..n]).map_err(BridgeError::DeviceWrite)?;
        if written < n {
            debug!("Short write: {written} of {n} stdin bytes accepted");
        }
        Ok(())
    }

    // Status lines share the data stream, so they are flushed in order with it.
    fn status(&mut self, msg: impl fmt::Display) {
        if let Err(e) = writeln!(self.out, "{msg}").and_then(|()| self.out.flush()) {
            warn!("Failed to write status line {:?}: {e}", msg.to_string());
        }
    }

    fn fail(&mut self, report: &mut Report, e: BridgeError) {
        debug!("Bridge stopped: {e:?}");
        let _ = writeln!(self.err, "{e}").and_then(|()| self.err.flush());
        report.errors.push(e);
    }
}
