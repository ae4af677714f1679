//! In-memory WS2300 stand-in for protocol tests

use std::collections::{HashMap, VecDeque};
use std::io;

use crate::station::channel::ByteChannel;
use crate::station::protocol::{checksum, RESET_ACK, RESET_REQUEST};

/// Answers the station command set from a byte-per-address memory map.
///
/// Faults can be injected to exercise the retry paths, and every channel
/// call is counted.
pub struct SimulatedStation {
    memory: HashMap<u16, u8>,
    pending: VecDeque<u8>,
    nibbles: Vec<u8>,
    writes: Vec<u8>,
    discards: usize,
    reads_served: usize,
    reset_reply: u8,
    silent: bool,
    silent_after_reads: Option<usize>,
    corrupt_checksums: usize,
    drop_data: usize,
    drop_checksums: usize,
    fail_io_after_reads: Option<usize>,
    garble_acks: bool,
}

impl SimulatedStation {
    pub fn new() -> Self {
        SimulatedStation {
            memory: HashMap::new(),
            pending: VecDeque::new(),
            nibbles: Vec::with_capacity(4),
            writes: Vec::new(),
            discards: 0,
            reads_served: 0,
            reset_reply: RESET_ACK,
            silent: false,
            silent_after_reads: None,
            corrupt_checksums: 0,
            drop_data: 0,
            drop_checksums: 0,
            fail_io_after_reads: None,
            garble_acks: false,
        }
    }

    pub fn set_memory(&mut self, address: u16, bytes: &[u8]) {
        for (offset, &byte) in bytes.iter().enumerate() {
            self.memory.insert(address.wrapping_add(offset as u16), byte);
        }
    }

    pub fn set_reset_reply(&mut self, reply: u8) {
        self.reset_reply = reply;
    }

    /// Never answer anything
    pub fn go_silent(&mut self) {
        self.silent = true;
    }

    /// Stop answering once `reads` memory reads have been served
    pub fn go_silent_after(&mut self, reads: usize) {
        self.silent_after_reads = Some(reads);
    }

    /// Send a wrong checksum for the next `count` reads
    pub fn corrupt_checksums(&mut self, count: usize) {
        self.corrupt_checksums = count;
    }

    /// Acknowledge the next `count` read requests without sending data
    pub fn drop_data(&mut self, count: usize) {
        self.drop_data = count;
    }

    /// Send the data but no checksum byte for the next `count` reads
    pub fn drop_checksums(&mut self, count: usize) {
        self.drop_checksums = count;
    }

    /// Fail every channel write once `reads` memory reads have been served
    pub fn fail_io_after(&mut self, reads: usize) {
        self.fail_io_after_reads = Some(reads);
    }

    /// Answer address and read requests with off-by-one acknowledgements
    pub fn garble_acks(&mut self) {
        self.garble_acks = true;
    }

    pub fn writes(&self) -> &[u8] {
        &self.writes
    }

    pub fn discards(&self) -> usize {
        self.discards
    }

    pub fn reads_served(&self) -> usize {
        self.reads_served
    }

    fn is_silent(&self) -> bool {
        self.silent
            || self
                .silent_after_reads
                .is_some_and(|limit| self.reads_served >= limit)
    }

    fn ack(&self, value: u8) -> u8 {
        if self.garble_acks {
            value.wrapping_add(1)
        } else {
            value
        }
    }

    fn handle(&mut self, byte: u8) {
        match byte {
            RESET_REQUEST => {
                self.nibbles.clear();
                self.pending.push_back(self.reset_reply);
            }
            0x82..=0xBE if (byte - 0x82) % 4 == 0 && self.nibbles.len() < 4 => {
                let nibble = (byte - 0x82) / 4;
                let index = self.nibbles.len() as u8;
                self.nibbles.push(nibble);
                let ack = self.ack(index * 0x10 + nibble);
                self.pending.push_back(ack);
            }
            0xC6 | 0xCA | 0xCE | 0xD2 if self.nibbles.len() == 4 => {
                let length = ((byte - 0xC2) / 4) as u16;
                self.serve_read(length);
            }
            _ => {}
        }
    }

    fn serve_read(&mut self, length: u16) {
        let address = self
            .nibbles
            .drain(..)
            .fold(0u16, |acc, nibble| (acc << 4) | u16::from(nibble));

        self.reads_served += 1;
        let ack = self.ack(0x30 + length as u8);
        self.pending.push_back(ack);

        if self.drop_data > 0 {
            self.drop_data -= 1;
            return;
        }

        let data: Vec<u8> = (0..length)
            .map(|offset| {
                self.memory
                    .get(&address.wrapping_add(offset))
                    .copied()
                    .unwrap_or(0)
            })
            .collect();

        let mut sum = checksum(&data);
        if self.corrupt_checksums > 0 {
            self.corrupt_checksums -= 1;
            sum = sum.wrapping_add(0x55);
        }

        self.pending.extend(data);

        if self.drop_checksums > 0 {
            self.drop_checksums -= 1;
            return;
        }
        self.pending.push_back(sum);
    }
}

impl ByteChannel for SimulatedStation {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        if self
            .fail_io_after_reads
            .is_some_and(|limit| self.reads_served >= limit)
        {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
        }
        self.writes.push(byte);
        if !self.is_silent() {
            self.handle(byte);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.pending.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no byte pending"))
    }

    fn discard_buffered(&mut self) -> io::Result<()> {
        self.discards += 1;
        self.pending.clear();
        Ok(())
    }
}
