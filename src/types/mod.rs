//! Core types module

mod config;

#[cfg(test)]
mod tests;

pub use config::{
    StreamDeviceConfig, StreamDeviceConfigBuilder, SyncConfig, SyncConfigBuilder,
};
