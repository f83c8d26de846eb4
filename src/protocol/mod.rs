//! Pure protocol logic
//!
//! Nothing here performs I/O: [`clock`] turns timestamp readings into
//! offset corrections and [`stream`] encodes the stream device's
//! command payloads.

pub mod clock;
pub mod stream;
