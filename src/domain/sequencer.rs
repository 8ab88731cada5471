//! Ordered reads over a single connection.
//!
//! A physical link cannot service overlapping protocol exchanges, so the
//! devices are read one after another and the link is closed once at the
//! end, whether or not every read succeeded.

use crate::domain::error::BridgeError;
use crate::domain::models::{Stage, VirtualDevice};
use crate::domain::ports::{EventSink, SensorLink};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Await `future`, failing with [`BridgeError::Timeout`] once `limit` passes.
pub async fn within<T, F>(limit: Duration, stage: Stage, future: F) -> Result<T, BridgeError>
where
    F: Future<Output = Result<T, BridgeError>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| BridgeError::Timeout { stage })?
}

pub struct ReadSequencer {
    read_timeout: Duration,
}

impl ReadSequencer {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }

    /// Read every device in order, publish each value, then disconnect.
    ///
    /// Returns the number of readings published. A failed or timed out read
    /// abandons the rest of the sequence; the link is still closed.
    pub async fn run<L, S>(
        &self,
        link: &mut L,
        devices: &mut [VirtualDevice],
        sink: &mut S,
    ) -> Result<usize, BridgeError>
    where
        L: SensorLink,
        S: EventSink,
    {
        let result = self.read_all(link, devices, sink).await;

        match within(self.read_timeout, Stage::Disconnect, link.disconnect()).await {
            Ok(()) => debug!("Link closed"),
            Err(e) => warn!("Failed to close link: {}", e),
        }

        result
    }

    async fn read_all<L, S>(
        &self,
        link: &mut L,
        devices: &mut [VirtualDevice],
        sink: &mut S,
    ) -> Result<usize, BridgeError>
    where
        L: SensorLink,
        S: EventSink,
    {
        for device in devices.iter_mut() {
            let kind = device.kind();
            let value = within(self.read_timeout, Stage::Read(kind), link.read(kind)).await?;
            debug!("{} got {}", device.name(), value);

            let reading = device.record(value);
            sink.data(&reading);
        }

        if let Some(first) = devices.first() {
            info!("Finished updating {}", first.peripheral());
        }
        Ok(devices.len())
    }
}
