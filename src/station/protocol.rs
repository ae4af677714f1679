/// WS2300 serial protocol: reset, byte transactions and memory reads
use log::{debug, trace, warn};
use std::thread::sleep;
use std::time::Duration;

use crate::station::channel::ByteChannel;
use crate::station::error::ProtocolError;

// Command bytes and acknowledgement bases
pub const RESET_REQUEST: u8 = 0x06;
pub const RESET_ACK: u8 = 0x02;
const ADDRESS_REQUEST_BASE: u8 = 0x82;
const READ_REQUEST_BASE: u8 = 0xC2;
const READ_ACK_BASE: u8 = 0x30;

/// Largest number of bytes a single memory read may request
pub const MAX_READ_LENGTH: usize = 4;

/// Default retry bound for transactions, resets and reads
pub const DEFAULT_ATTEMPTS: u32 = 50;

/// Delays used while talking to the station.
///
/// The station gives no feedback besides echoed bytes, so every step is paced
/// by these waits. All of them are blocking sleeps.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolTiming {
    /// Pause between checks for a response byte
    pub response_poll_interval: Duration,
    /// Number of checks before a transaction counts as unanswered
    pub response_polls: u32,
    /// Pause between reset attempts
    pub reset_delay: Duration,
    /// Time the station needs to prepare data after a read request
    pub read_prepare_delay: Duration,
    /// Pause between the last data byte and the checksum byte
    pub checksum_delay: Duration,
    /// Backoff after a failed read attempt
    pub error_backoff: Duration,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        ProtocolTiming {
            response_poll_interval: Duration::from_millis(100),
            response_polls: 20,
            reset_delay: Duration::from_millis(200),
            read_prepare_delay: Duration::from_millis(300),
            checksum_delay: Duration::from_millis(50),
            error_backoff: Duration::from_millis(100),
        }
    }
}

impl ProtocolTiming {
    /// Timing with every delay set to zero, for simulated stations.
    #[cfg(test)]
    pub fn immediate() -> Self {
        ProtocolTiming {
            response_poll_interval: Duration::ZERO,
            response_polls: 20,
            reset_delay: Duration::ZERO,
            read_prepare_delay: Duration::ZERO,
            checksum_delay: Duration::ZERO,
            error_backoff: Duration::ZERO,
        }
    }

    /// Spread a total response timeout over the configured number of polls.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_poll_interval = timeout / self.response_polls.max(1);
        self
    }
}

/// Attempt bounds for each retrying operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub transaction_attempts: u32,
    pub reset_attempts: u32,
    pub read_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::uniform(DEFAULT_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Same bound for every operation. A bound of zero is raised to one.
    pub fn uniform(attempts: u32) -> Self {
        let attempts = attempts.max(1);
        RetryPolicy {
            transaction_attempts: attempts,
            reset_attempts: attempts,
            read_attempts: attempts,
        }
    }
}

/// Split a station address into its four nibbles, most significant first
pub fn nibble_address(address: u16) -> [u8; 4] {
    let mut nibbles = [0u8; 4];
    for (i, nibble) in nibbles.iter_mut().enumerate() {
        *nibble = ((address >> (4 * (3 - i))) & 0x0F) as u8;
    }
    nibbles
}

/// Sum of all bytes modulo 256, as transmitted after a memory read
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// True when every byte is zero, which the station uses for "no value stored"
pub fn is_no_data(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0x00)
}

fn address_request(nibble: u8) -> u8 {
    ADDRESS_REQUEST_BASE + nibble * 0x04
}

fn address_ack(index: usize, nibble: u8) -> u8 {
    (index as u8) * 0x10 + nibble
}

fn read_request(length: usize) -> u8 {
    READ_REQUEST_BASE + (length as u8) * 0x04
}

fn read_ack(length: usize) -> u8 {
    READ_ACK_BASE + length as u8
}

/// One exclusive conversation with the station over a byte channel.
///
/// A session is created for a single poll and borrows the channel for that time.
/// Every operation runs to completion before the next one starts.
pub struct StationSession<C: ByteChannel> {
    channel: C,
    timing: ProtocolTiming,
    retries: RetryPolicy,
    strict_acks: bool,
}

impl<C: ByteChannel> StationSession<C> {
    pub fn new(channel: C, timing: ProtocolTiming, retries: RetryPolicy) -> Self {
        StationSession {
            channel,
            timing,
            retries,
            strict_acks: false,
        }
    }

    /// Treat unexpected acknowledgement bytes as a failed read attempt
    /// instead of only logging them.
    pub fn with_strict_acks(mut self, strict: bool) -> Self {
        self.strict_acks = strict;
        self
    }

    /// Reset the station's command state. Required before every memory read.
    pub fn reset(&mut self) -> Result<(), ProtocolError> {
        let attempts = self.retries.reset_attempts;

        for attempt in 1..=attempts {
            let response = self.send_and_receive(RESET_REQUEST)?;
            if response == RESET_ACK {
                return Ok(());
            }

            warn!(
                "Reset failed ({}/{}). Expected: 0x{:02X}, Received: 0x{:02X}",
                attempt, attempts, RESET_ACK, response
            );

            if attempt < attempts {
                sleep(self.timing.reset_delay);
            }
        }

        Err(ProtocolError::ResetFailed { attempts })
    }

    /// Send one byte and return the station's one-byte answer.
    ///
    /// An unanswered request triggers a resynchronisation and is sent again,
    /// up to the transaction attempt bound.
    pub fn send_and_receive(&mut self, request: u8) -> Result<u8, ProtocolError> {
        let attempts = self.retries.transaction_attempts;

        for attempt in 1..=attempts {
            if let Some(response) = self.exchange(request)? {
                return Ok(response);
            }

            if attempt < attempts {
                debug!(
                    "No response to 0x{:02X} ({}/{}). Retry triggered.",
                    request, attempt, attempts
                );
                self.resynchronise()?;
            }
        }

        warn!(
            "Station did not answer 0x{:02X} after {} attempts",
            request, attempts
        );
        Err(ProtocolError::NoResponse { request, attempts })
    }

    /// Read `N` bytes (1 to 4) of station memory starting at `address`.
    ///
    /// Returns `Ok(None)` when the station answers with all-zero bytes.
    pub fn read_memory<const N: usize>(
        &mut self,
        address: u16,
    ) -> Result<Option<[u8; N]>, ProtocolError> {
        const { assert!(N >= 1 && N <= MAX_READ_LENGTH, "read length must be 1..=4") };

        let attempts = self.retries.read_attempts;

        for attempt in 1..=attempts {
            if let Some(data) = self.read_attempt::<N>(address)? {
                if is_no_data(&data) {
                    debug!("No data stored at 0x{:04X}", address);
                    return Ok(None);
                }
                return Ok(Some(data));
            }

            debug!(
                "Read of {} byte(s) at 0x{:04X} failed ({}/{})",
                N, address, attempt, attempts
            );
            sleep(self.timing.error_backoff);
        }

        warn!(
            "Giving up on {} byte(s) at 0x{:04X} after {} attempts",
            N, address, attempts
        );
        Err(ProtocolError::ReadFailed { address, length: N })
    }

    /// A single pass of reset, address walk, read request and data transfer.
    /// `Ok(None)` marks a retryable failure.
    ///
    /// A timeout during the address walk resynchronises with a reset byte, which
    /// clears the nibbles the station has already received. The walk then goes on
    /// with the remaining nibbles, so with lenient acks the station can end up at
    /// the wrong address. Strict acks catch this through the index in each ack.
    fn read_attempt<const N: usize>(
        &mut self,
        address: u16,
    ) -> Result<Option<[u8; N]>, ProtocolError> {
        self.reset()?;

        for (index, nibble) in nibble_address(address).into_iter().enumerate() {
            let request = address_request(nibble);
            let response = self.send_and_receive(request)?;
            let ack = address_ack(index, nibble);

            debug!("Req: {:02x}, Res: {:02x}, Ack: {:02x}", request, response, ack);

            if response != ack && self.strict_acks {
                debug!(
                    "Address acknowledgement mismatch for nibble {}: expected {:02x}, received {:02x}",
                    index, ack, response
                );
                return Ok(None);
            }
        }

        let request = read_request(N);
        let response = self.send_and_receive(request)?;
        let ack = read_ack(N);

        debug!(
            "ReadReq: {:02x}, ReadRes: {:02x}, ReadAck: {:02x}",
            request, response, ack
        );

        if response != ack && self.strict_acks {
            debug!(
                "Read acknowledgement mismatch: expected {:02x}, received {:02x}",
                ack, response
            );
            return Ok(None);
        }

        sleep(self.timing.read_prepare_delay);

        let mut data = [0u8; N];
        for (i, slot) in data.iter_mut().enumerate() {
            if self.channel.bytes_available()? == 0 {
                debug!("No response received after {} of {} bytes", i, N);
                return Ok(None);
            }
            *slot = self.channel.read_byte()?;
        }

        let expected = checksum(&data);

        sleep(self.timing.checksum_delay);

        if self.channel.bytes_available()? == 0 {
            debug!("No checksum byte received");
            return Ok(None);
        }

        let received = self.channel.read_byte()?;
        if received != expected {
            debug!(
                "Checksum of data does not match: Expected: {:02x}, Received: {:02x}",
                expected, received
            );
            return Ok(None);
        }

        Ok(Some(data))
    }

    /// Clear stale input, send the request and wait a bounded time for one byte.
    fn exchange(&mut self, request: u8) -> Result<Option<u8>, ProtocolError> {
        self.channel.discard_buffered()?;
        self.channel.write_byte(request)?;
        self.channel.flush()?;

        if self.wait_for_data()? {
            Ok(Some(self.channel.read_byte()?))
        } else {
            Ok(None)
        }
    }

    fn wait_for_data(&mut self) -> Result<bool, ProtocolError> {
        let polls = self.timing.response_polls;

        for i in 0..polls {
            if self.channel.bytes_available()? > 0 {
                return Ok(true);
            }
            trace!("Waiting for data ({}/{})...", i + 1, polls);
            sleep(self.timing.response_poll_interval);
        }

        Ok(self.channel.bytes_available()? > 0)
    }

    // Single reset exchange after a timeout; the answer is not checked and the
    // exchange is not retried.
    fn resynchronise(&mut self) -> Result<(), ProtocolError> {
        match self.exchange(RESET_REQUEST)? {
            Some(response) => trace!("Resync answered with 0x{:02X}", response),
            None => trace!("Resync unanswered"),
        }
        Ok(())
    }
}
