use btleplug::{
    api::{BDAddr, Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType},
    platform::{Adapter, Manager, Peripheral},
};
use futures::{future::BoxFuture, stream::StreamExt, FutureExt};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{sleep, Instant},
};
use tracing::{debug, info};

use crate::{
    error::{Result, TreadmillError},
    NOTIFY_CHARACTERISTIC_UUID, SERVICE_UUID, WRITE_CHARACTERISTIC_UUID,
};

/// Callback invoked once per inbound GATT notification with the raw frame
pub type NotificationHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Abstract GATT link to the treadmill
///
/// The session only needs three operations from the link, so they are kept
/// behind an object-safe trait. The production implementation is
/// [`BleTransport`]; tests drive the session with an in-memory fake.
pub trait Transport: Send + Sync {
    /// Write one encoded frame to the device
    fn write<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Register the notification callback and start delivering frames to it
    fn subscribe(&self, handler: NotificationHandler) -> BoxFuture<'_, Result<()>>;

    /// Clear subscriptions and disconnect
    fn close(&self) -> BoxFuture<'_, Result<()>>;
}

/// Factory producing a fresh [`Transport`] for each connection attempt
///
/// The workout bring-up ritual tears the link down and reconnects, so the
/// session holds a connector rather than a single transport.
pub trait Connector: Send + Sync {
    /// Establish a new link to the device
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>>;
}

/// [`Connector`] that finds the treadmill by Bluetooth address
#[derive(Debug)]
pub struct BleConnector {
    address: BDAddr,
    scan_timeout: Duration,
}

impl BleConnector {
    /// Create a connector for the device at `address`
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::InvalidAddress`] if the address string is
    /// not a valid Bluetooth device address.
    pub fn new(address: &str, scan_timeout: Duration) -> Result<Self> {
        let address = address
            .parse::<BDAddr>()
            .map_err(|e| TreadmillError::InvalidAddress(format!("{address}: {e}")))?;

        Ok(Self {
            address,
            scan_timeout,
        })
    }

    /// The address this connector looks for
    #[must_use]
    pub const fn address(&self) -> BDAddr {
        self.address
    }

    async fn find_peripheral(&self, central: &Adapter) -> Result<Peripheral> {
        let deadline = Instant::now() + self.scan_timeout;

        loop {
            for peripheral in central.peripherals().await? {
                if peripheral.address() == self.address {
                    return Ok(peripheral);
                }
            }

            if Instant::now() >= deadline {
                return Err(TreadmillError::DeviceNotFound);
            }

            sleep(Duration::from_millis(200)).await;
        }
    }
}

impl Connector for BleConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>> {
        async move {
            info!("connecting to treadmill at {}", self.address);

            let manager = Manager::new().await?;
            let central = manager
                .adapters()
                .await?
                .into_iter()
                .next()
                .ok_or(TreadmillError::DeviceNotFound)?;

            central
                .start_scan(ScanFilter {
                    services: vec![SERVICE_UUID],
                })
                .await?;

            let found = self.find_peripheral(&central).await;
            central.stop_scan().await?;
            let peripheral = found?;

            peripheral.connect().await?;
            peripheral.discover_services().await?;

            let services = peripheral.services();
            let service = services
                .iter()
                .find(|s| s.uuid == SERVICE_UUID)
                .ok_or(TreadmillError::MissingService(SERVICE_UUID))?;

            let write_characteristic = service
                .characteristics
                .iter()
                .find(|c| c.uuid == WRITE_CHARACTERISTIC_UUID)
                .ok_or(TreadmillError::MissingCharacteristic(
                    WRITE_CHARACTERISTIC_UUID,
                ))?
                .clone();

            let notify_characteristic = service
                .characteristics
                .iter()
                .find(|c| c.uuid == NOTIFY_CHARACTERISTIC_UUID)
                .ok_or(TreadmillError::MissingCharacteristic(
                    NOTIFY_CHARACTERISTIC_UUID,
                ))?
                .clone();

            // The console signals notification support through the client
            // configuration descriptor; a bare characteristic means the
            // firmware will never push telemetry.
            if notify_characteristic.descriptors.is_empty() {
                return Err(TreadmillError::MissingDescriptor);
            }

            info!("connected to treadmill at {}", self.address);

            Ok(Box::new(BleTransport {
                peripheral,
                write_characteristic,
                notify_characteristic,
                pump: Mutex::new(None),
            }) as Box<dyn Transport>)
        }
        .boxed()
    }
}

/// Live btleplug-backed GATT link
pub struct BleTransport {
    peripheral: Peripheral,
    write_characteristic: Characteristic,
    notify_characteristic: Characteristic,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Transport for BleTransport {
    fn write<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        async move {
            self.peripheral
                .write(&self.write_characteristic, data, WriteType::WithoutResponse)
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn subscribe(&self, handler: NotificationHandler) -> BoxFuture<'_, Result<()>> {
        async move {
            self.peripheral.subscribe(&self.notify_characteristic).await?;

            let mut notifications = self.peripheral.notifications().await?;
            let notify_uuid = self.notify_characteristic.uuid;

            let task = tokio::spawn(async move {
                while let Some(notification) = notifications.next().await {
                    if notification.uuid == notify_uuid {
                        handler(&notification.value);
                    }
                }

                debug!("notification stream ended");
            });

            *self.pump.lock().await = Some(task);

            Ok(())
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        async move {
            if let Some(task) = self.pump.lock().await.take() {
                task.abort();
            }

            self.peripheral.unsubscribe(&self.notify_characteristic).await?;
            self.peripheral.disconnect().await?;

            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_parses_address() {
        let connector = BleConnector::new("AA:BB:CC:DD:EE:FF", Duration::from_secs(1)).unwrap();
        assert_eq!(connector.address().to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_connector_rejects_bad_address() {
        let err = BleConnector::new("not-an-address", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TreadmillError::InvalidAddress(_)));
    }
}
