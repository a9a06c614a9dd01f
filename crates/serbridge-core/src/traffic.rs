use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    Rx,
    Tx,
}

/// Running byte and chunk totals for one serial session.
#[derive(Debug, Clone)]
pub struct Traffic {
    started: Instant,
    rx_bytes: u64,
    rx_chunks: u64,
    tx_bytes: u64,
    tx_chunks: u64,
}

impl Traffic {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            rx_bytes: 0,
            rx_chunks: 0,
            tx_bytes: 0,
            tx_chunks: 0,
        }
    }

    pub fn push(&mut self, direction: Direction, len: usize) {
        let len = len as u64;
        match direction {
            Direction::Rx => {
                self.rx_bytes += len;
                self.rx_chunks += 1;
            }
            Direction::Tx => {
                self.tx_bytes += len;
                self.tx_chunks += 1;
            }
        }
    }

    pub fn bytes(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Rx => self.rx_bytes,
            Direction::Tx => self.tx_bytes,
        }
    }

    pub fn chunks(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Rx => self.rx_chunks,
            Direction::Tx => self.tx_chunks,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for Traffic {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Traffic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RX: {} bytes in {} reads, TX: {} bytes in {} writes, {:.1}s",
            self.rx_bytes,
            self.rx_chunks,
            self.tx_bytes,
            self.tx_chunks,
            self.elapsed().as_secs_f64()
        )
    }
}
