//! In-memory timestamp source and offset register

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::RavennaError;
use crate::protocol::clock::TimestampPair;
use crate::sync::{RegisterChannel, TimestampSource};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct SourceState {
    queue: VecDeque<Result<TimestampPair, RavennaError>>,
    repeat_last: Option<TimestampPair>,
    reads: usize,
}

/// Timestamp source replaying scripted readings.
///
/// Each read pops the next scripted result. Once the script runs out the
/// last successful pair is repeated; before any pair was scripted, reads
/// fail with a transient error.
#[derive(Debug, Clone, Default)]
pub struct MockTimestampSource {
    state: Arc<Mutex<SourceState>>,
}

impl MockTimestampSource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source scripted with `pairs`
    #[must_use]
    pub fn with_pairs(pairs: impl IntoIterator<Item = TimestampPair>) -> Self {
        let source = Self::new();
        for pair in pairs {
            source.push(pair);
        }
        source
    }

    /// Script a successful reading
    pub fn push(&self, pair: TimestampPair) {
        lock(&self.state).queue.push_back(Ok(pair));
    }

    /// Script a failed read
    pub fn push_io_error(&self, kind: io::ErrorKind) {
        lock(&self.state)
            .queue
            .push_back(Err(RavennaError::TransientRead {
                what: "mock rtp_timestamp".to_string(),
                source: io::Error::from(kind),
            }));
    }

    /// Script a reading whose raw text is malformed
    pub fn push_malformed(&self, text: &str) {
        let err = TimestampPair::parse_attribute(text, "mock rtp_timestamp")
            .err()
            .unwrap_or_else(|| RavennaError::MalformedPayload {
                what: "mock rtp_timestamp".to_string(),
                payload: text.to_string(),
            });
        lock(&self.state).queue.push_back(Err(err));
    }

    /// Number of reads so far
    #[must_use]
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    /// Number of scripted results not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.state).queue.len()
    }
}

#[async_trait]
impl TimestampSource for MockTimestampSource {
    async fn read_timestamp_pair(&self) -> Result<TimestampPair, RavennaError> {
        let mut state = lock(&self.state);
        state.reads += 1;
        match state.queue.pop_front() {
            Some(Ok(pair)) => {
                state.repeat_last = Some(pair);
                Ok(pair)
            }
            Some(Err(e)) => Err(e),
            None => state.repeat_last.ok_or_else(|| RavennaError::TransientRead {
                what: "mock rtp_timestamp".to_string(),
                source: io::Error::from(io::ErrorKind::WouldBlock),
            }),
        }
    }
}

#[derive(Debug, Default)]
struct RegisterState {
    value: u32,
    writes: Vec<u32>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Offset register recording every write.
#[derive(Debug, Clone, Default)]
pub struct MockRegister {
    state: Arc<Mutex<RegisterState>>,
}

impl MockRegister {
    /// Create a register holding `value`
    #[must_use]
    pub fn new(value: u32) -> Self {
        let register = Self::default();
        lock(&register.state).value = value;
        register
    }

    /// Current value
    #[must_use]
    pub fn value(&self) -> u32 {
        lock(&self.state).value
    }

    /// Every value written, in order
    #[must_use]
    pub fn writes(&self) -> Vec<u32> {
        lock(&self.state).writes.clone()
    }

    /// Make subsequent reads fail
    pub fn fail_reads(&self, fail: bool) {
        lock(&self.state).fail_reads = fail;
    }

    /// Make subsequent writes fail
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

#[async_trait]
impl RegisterChannel for MockRegister {
    async fn read_global_offset(&self) -> Result<u32, RavennaError> {
        let state = lock(&self.state);
        if state.fail_reads {
            return Err(RavennaError::TransientRead {
                what: "mock rtp_global_offset".to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        Ok(state.value)
    }

    async fn write_global_offset(&self, offset: u32) -> Result<(), RavennaError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(RavennaError::HardwareWrite {
                what: "mock rtp_global_offset".to_string(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        state.value = offset;
        state.writes.push(offset);
        Ok(())
    }
}
