use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RavennaError;
use crate::protocol::clock::TimestampPair;

/// Source of paired PTP / media clock readings
#[async_trait]
pub trait TimestampSource: Send + Sync {
    /// Read the current (PTP nanoseconds, media samples) pair
    async fn read_timestamp_pair(&self) -> Result<TimestampPair, RavennaError>;
}

/// The hardware's global sample offset register
#[async_trait]
pub trait RegisterChannel: Send + Sync {
    /// Read the offset the hardware currently runs with
    async fn read_global_offset(&self) -> Result<u32, RavennaError>;

    /// Write a new offset
    async fn write_global_offset(&self, offset: u32) -> Result<(), RavennaError>;
}

#[async_trait]
impl<T: TimestampSource + ?Sized> TimestampSource for Arc<T> {
    async fn read_timestamp_pair(&self) -> Result<TimestampPair, RavennaError> {
        (**self).read_timestamp_pair().await
    }
}

#[async_trait]
impl<T: RegisterChannel + ?Sized> RegisterChannel for Arc<T> {
    async fn read_global_offset(&self) -> Result<u32, RavennaError> {
        (**self).read_global_offset().await
    }

    async fn write_global_offset(&self, offset: u32) -> Result<(), RavennaError> {
        (**self).write_global_offset(offset).await
    }
}
