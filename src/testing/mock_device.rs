//! In-memory stream device
//!
//! Decodes every command like the driver does, keeps the stream tables
//! and answers telemetry reads from canned reports.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use byteorder::{ByteOrder, LittleEndian};

use crate::device::ControlChannel;
use crate::protocol::stream::command::{RX_DESCRIPTOR_SIZE, TX_DESCRIPTOR_SIZE};
use crate::protocol::stream::{
    Command, DeviceInfo, RxStreamDescriptor, RxTelemetry, TxStreamDescriptor, TxTelemetry,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message.to_string())
}

fn index_at(payload: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&payload[offset..offset + 4])
}

/// One command as seen by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    /// The command issued
    pub command: Command,
    /// The payload as submitted, before any reply was written
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct DeviceState {
    info: DeviceInfo,
    rx_streams: Vec<Option<RxStreamDescriptor>>,
    tx_streams: Vec<Option<TxStreamDescriptor>>,
    rx_telemetry: HashMap<u32, RxTelemetry>,
    tx_telemetry: HashMap<u32, TxTelemetry>,
    failures: HashMap<Command, io::ErrorKind>,
    log: Vec<RecordedCommand>,
}

fn slot_index(index: usize) -> io::Result<u32> {
    u32::try_from(index).map_err(|_| invalid("stream index overflow"))
}

impl DeviceState {
    fn take_failure(&mut self, command: Command) -> io::Result<()> {
        match self.failures.remove(&command) {
            Some(kind) => Err(io::Error::from(kind)),
            None => Ok(()),
        }
    }

    fn execute(&mut self, command: Command, payload: &mut [u8]) -> io::Result<u32> {
        if payload.len() != command.payload_len() {
            return Err(invalid("payload length does not match command"));
        }
        self.log.push(RecordedCommand {
            command,
            payload: payload.to_vec(),
        });
        self.take_failure(command)?;

        match command {
            Command::DeviceInfo => {
                payload.copy_from_slice(&self.info.encode());
                Ok(0)
            }
            Command::AddRxStream => {
                let descriptor = decode_rx(&payload[4..])?;
                let index = self
                    .rx_streams
                    .iter()
                    .position(Option::is_none)
                    .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOSPC))?;
                self.rx_streams[index] = Some(descriptor);
                slot_index(index)
            }
            Command::UpdateRxStream => {
                let descriptor = decode_rx(&payload[8..])?;
                let slot = self.rx_slot(index_at(payload, 4))?;
                *slot = Some(descriptor);
                Ok(0)
            }
            Command::DeleteRxStream => {
                self.rx_slot(index_at(payload, 4))?.take();
                Ok(0)
            }
            Command::ReadRxTelemetry => {
                let index = index_at(payload, 0);
                self.rx_slot(index)?;
                let report = self.rx_telemetry.get(&index).copied().unwrap_or_default();
                payload[8..].copy_from_slice(&report.encode());
                Ok(0)
            }
            Command::AddTxStream => {
                let descriptor = decode_tx(&payload[4..])?;
                let index = self
                    .tx_streams
                    .iter()
                    .position(Option::is_none)
                    .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOSPC))?;
                self.tx_streams[index] = Some(descriptor);
                slot_index(index)
            }
            Command::UpdateTxStream => {
                let descriptor = decode_tx(&payload[8..])?;
                let slot = self.tx_slot(index_at(payload, 4))?;
                *slot = Some(descriptor);
                Ok(0)
            }
            Command::DeleteTxStream => {
                self.tx_slot(index_at(payload, 4))?.take();
                Ok(0)
            }
            Command::ReadTxTelemetry => {
                let index = index_at(payload, 0);
                self.tx_slot(index)?;
                let report = self.tx_telemetry.get(&index).copied().unwrap_or_default();
                payload[8..].copy_from_slice(&report.encode());
                Ok(0)
            }
        }
    }

    fn rx_slot(&mut self, index: u32) -> io::Result<&mut Option<RxStreamDescriptor>> {
        self.rx_streams
            .get_mut(index as usize)
            .filter(|slot| slot.is_some())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
    }

    fn tx_slot(&mut self, index: u32) -> io::Result<&mut Option<TxStreamDescriptor>> {
        self.tx_streams
            .get_mut(index as usize)
            .filter(|slot| slot.is_some())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
    }
}

fn decode_rx(bytes: &[u8]) -> io::Result<RxStreamDescriptor> {
    let data: &[u8; RX_DESCRIPTOR_SIZE] = bytes
        .try_into()
        .map_err(|_| invalid("bad RX descriptor length"))?;
    RxStreamDescriptor::decode(data).map_err(|e| invalid(&e.to_string()))
}

fn decode_tx(bytes: &[u8]) -> io::Result<TxStreamDescriptor> {
    let data: &[u8; TX_DESCRIPTOR_SIZE] = bytes
        .try_into()
        .map_err(|_| invalid("bad TX descriptor length"))?;
    TxStreamDescriptor::decode(data).map_err(|e| invalid(&e.to_string()))
}

/// Control channel backed by in-memory stream tables.
///
/// Clones share state, so a test can keep one clone for inspection while
/// a [`StreamDevice`](crate::device::StreamDevice) owns another.
#[derive(Debug, Clone)]
pub struct MockControlChannel {
    state: Arc<Mutex<DeviceState>>,
}

impl Default for MockControlChannel {
    fn default() -> Self {
        Self::new(DeviceInfo {
            max_tracks: 64,
            max_rx_streams: 4,
            max_tx_streams: 4,
        })
    }
}

impl MockControlChannel {
    /// Create a device with the given capabilities
    #[must_use]
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                info,
                rx_streams: vec![None; info.max_rx_streams as usize],
                tx_streams: vec![None; info.max_tx_streams as usize],
                rx_telemetry: HashMap::new(),
                tx_telemetry: HashMap::new(),
                failures: HashMap::new(),
                log: Vec::new(),
            })),
        }
    }

    /// Fail the next `command` with `kind`
    pub fn fail_next(&self, command: Command, kind: io::ErrorKind) {
        lock(&self.state).failures.insert(command, kind);
    }

    /// Answer RX telemetry reads for `index` with `report`
    pub fn set_rx_telemetry(&self, index: u32, report: RxTelemetry) {
        lock(&self.state).rx_telemetry.insert(index, report);
    }

    /// Answer TX telemetry reads for `index` with `report`
    pub fn set_tx_telemetry(&self, index: u32, report: TxTelemetry) {
        lock(&self.state).tx_telemetry.insert(index, report);
    }

    /// Descriptor currently stored at RX `index`
    #[must_use]
    pub fn rx_stream(&self, index: u32) -> Option<RxStreamDescriptor> {
        lock(&self.state)
            .rx_streams
            .get(index as usize)
            .cloned()
            .flatten()
    }

    /// Descriptor currently stored at TX `index`
    #[must_use]
    pub fn tx_stream(&self, index: u32) -> Option<TxStreamDescriptor> {
        lock(&self.state)
            .tx_streams
            .get(index as usize)
            .cloned()
            .flatten()
    }

    /// Every command received, in order
    #[must_use]
    pub fn commands(&self) -> Vec<RecordedCommand> {
        lock(&self.state).log.clone()
    }
}

impl ControlChannel for MockControlChannel {
    fn execute(&mut self, command: Command, payload: &mut [u8]) -> io::Result<u32> {
        lock(&self.state).execute(command, payload)
    }
}
