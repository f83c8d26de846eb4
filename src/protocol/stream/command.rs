//! Stream device control command codes.
//!
//! Commands are addressed with Linux `_IOC`-style codes:
//!
//! ```text
//!  31 30 29          16 15      8 7        0
//! +-----+--------------+---------+----------+
//! | dir |  size (14b)  | type 'r'|  number  |
//! +-----+--------------+---------+----------+
//! ```

use std::fmt;

use super::types::MAX_CHANNELS;

/// Type tag shared by every stream device command.
pub const COMMAND_TYPE: u8 = b'r';

/// Largest payload a command code can describe.
pub const MAX_COMMAND_PAYLOAD: usize = (1 << 14) - 1;

/// Encoded RX interface size.
pub const RX_INTERFACE_SIZE: usize = 8;
/// Encoded RX descriptor size.
pub const RX_DESCRIPTOR_SIZE: usize = 2 * RX_INTERFACE_SIZE + 8 + 14 + MAX_CHANNELS * 2 + 2;
/// Encoded TX interface size.
pub const TX_INTERFACE_SIZE: usize = 20;
/// Encoded TX descriptor size.
pub const TX_DESCRIPTOR_SIZE: usize = 2 * TX_INTERFACE_SIZE + 12 + 4 + 8 + MAX_CHANNELS * 2;
/// Encoded device info size.
pub const DEVICE_INFO_SIZE: usize = 16;
/// Encoded RX telemetry size.
pub const RX_TELEMETRY_SIZE: usize = 12 + 2 * 36;
/// Encoded TX telemetry size.
pub const TX_TELEMETRY_SIZE: usize = 4 + 2 * 8;

/// Transfer direction, seen from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// No payload.
    None = 0,
    /// Payload is written to the device.
    Write = 1,
    /// Payload is read from the device.
    Read = 2,
    /// Payload is written, then overwritten with the reply.
    ReadWrite = 3,
}

impl Direction {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Self::None,
            1 => Self::Write,
            2 => Self::Read,
            _ => Self::ReadWrite,
        }
    }
}

/// Packed 32-bit command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode(u32);

impl CommandCode {
    /// Pack a command code.
    ///
    /// # Panics
    /// Panics if `size` exceeds [`MAX_COMMAND_PAYLOAD`]; all codes in this
    /// crate are evaluated at compile time.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "size is asserted to fit 14 bits"
    )]
    pub const fn pack(direction: Direction, type_tag: u8, number: u8, size: usize) -> Self {
        assert!(size <= MAX_COMMAND_PAYLOAD, "command payload too large");
        Self(
            ((direction as u32) << 30)
                | ((size as u32) << 16)
                | ((type_tag as u32) << 8)
                | number as u32,
        )
    }

    /// Raw code as passed to the kernel.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Direction bits.
    #[must_use]
    pub fn direction(self) -> Direction {
        Direction::from_bits(self.0 >> 30)
    }

    /// Payload size bits.
    #[must_use]
    pub const fn size(self) -> usize {
        ((self.0 >> 16) & 0x3fff) as usize
    }

    /// Type tag byte.
    #[must_use]
    pub const fn type_tag(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    /// Command number byte.
    #[must_use]
    pub const fn number(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Stream device commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Read device capabilities.
    DeviceInfo,
    /// Read RX stream telemetry.
    ReadRxTelemetry,
    /// Read TX stream telemetry.
    ReadTxTelemetry,
    /// Create a TX stream.
    AddTxStream,
    /// Replace a TX stream's descriptor.
    UpdateTxStream,
    /// Remove a TX stream.
    DeleteTxStream,
    /// Create an RX stream.
    AddRxStream,
    /// Replace an RX stream's descriptor.
    UpdateRxStream,
    /// Remove an RX stream.
    DeleteRxStream,
}

impl Command {
    /// Every command.
    pub const ALL: [Self; 9] = [
        Self::DeviceInfo,
        Self::ReadRxTelemetry,
        Self::ReadTxTelemetry,
        Self::AddTxStream,
        Self::UpdateTxStream,
        Self::DeleteTxStream,
        Self::AddRxStream,
        Self::UpdateRxStream,
        Self::DeleteRxStream,
    ];

    /// Command number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::DeviceInfo => 0x00,
            Self::ReadRxTelemetry => 0x10,
            Self::ReadTxTelemetry => 0x11,
            Self::AddTxStream => 0x20,
            Self::UpdateTxStream => 0x21,
            Self::DeleteTxStream => 0x22,
            Self::AddRxStream => 0x30,
            Self::UpdateRxStream => 0x31,
            Self::DeleteRxStream => 0x32,
        }
    }

    /// Transfer direction.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::DeviceInfo | Self::ReadRxTelemetry | Self::ReadTxTelemetry => {
                Direction::ReadWrite
            }
            _ => Direction::Write,
        }
    }

    /// Exact payload length, including the version or index prefix.
    #[must_use]
    pub const fn payload_len(self) -> usize {
        match self {
            Self::DeviceInfo => DEVICE_INFO_SIZE,
            // index, timeout, data
            Self::ReadRxTelemetry => 8 + RX_TELEMETRY_SIZE,
            Self::ReadTxTelemetry => 8 + TX_TELEMETRY_SIZE,
            // version, descriptor
            Self::AddTxStream => 4 + TX_DESCRIPTOR_SIZE,
            Self::AddRxStream => 4 + RX_DESCRIPTOR_SIZE,
            // version, index, descriptor
            Self::UpdateTxStream => 8 + TX_DESCRIPTOR_SIZE,
            Self::UpdateRxStream => 8 + RX_DESCRIPTOR_SIZE,
            // version, index
            Self::DeleteTxStream | Self::DeleteRxStream => 8,
        }
    }

    /// Packed command code.
    #[must_use]
    pub const fn code(self) -> CommandCode {
        CommandCode::pack(
            self.direction(),
            COMMAND_TYPE,
            self.number(),
            self.payload_len(),
        )
    }

    /// Look up a command by its packed code.
    #[must_use]
    pub fn from_code(code: CommandCode) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DeviceInfo => "device-info",
            Self::ReadRxTelemetry => "read-rx-telemetry",
            Self::ReadTxTelemetry => "read-tx-telemetry",
            Self::AddTxStream => "add-tx-stream",
            Self::UpdateTxStream => "update-tx-stream",
            Self::DeleteTxStream => "delete-tx-stream",
            Self::AddRxStream => "add-rx-stream",
            Self::UpdateRxStream => "update-rx-stream",
            Self::DeleteRxStream => "delete-rx-stream",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
