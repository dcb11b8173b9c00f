use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use uuid::Uuid;

use crate::error::DeviceError;

/**
 * The seam between session bookkeeping and btleplug, so the session logic
 * can be exercised against an in-process transport in tests.
 *
 * Every method that touches the radio is asynchronous and may fail; the
 * session decides which failures are fatal (discovery) and which are
 * logged and swallowed (reads, writes, notification changes).
 */
pub trait GattTransport {
    type Char: Clone + Send + Sync;

    /** Populates the service/characteristic table of the peripheral. */
    async fn discover_services(&self) -> Result<(), DeviceError>;

    fn has_service(&self, service: Uuid) -> bool;

    fn characteristic(&self, service: Uuid, characteristic: Uuid) -> Option<Self::Char>;

    async fn read(&self, characteristic: &Self::Char) -> Result<Vec<u8>, DeviceError>;

    async fn write(&self, characteristic: &Self::Char, payload: &[u8]) -> Result<(), DeviceError>;

    async fn subscribe(&self, characteristic: &Self::Char) -> Result<(), DeviceError>;

    async fn unsubscribe(&self, characteristic: &Self::Char) -> Result<(), DeviceError>;

    async fn is_connected(&self) -> Result<bool, DeviceError>;

    async fn disconnect(&self) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone)]
pub struct BtleTransport {
    peripheral: Peripheral,
}

impl BtleTransport {
    pub fn new(peripheral: Peripheral) -> Self {
        BtleTransport { peripheral }
    }

    /** The notification stream lives on the peripheral, not on this trait. */
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }
}

impl GattTransport for BtleTransport {
    type Char = Characteristic;

    async fn discover_services(&self) -> Result<(), DeviceError> {
        self.peripheral.discover_services().await?;
        Ok(())
    }

    fn has_service(&self, service: Uuid) -> bool {
        self.peripheral.services().iter().any(|s| s.uuid == service)
    }

    fn characteristic(&self, service: Uuid, characteristic: Uuid) -> Option<Characteristic> {
        let services = self.peripheral.services();
        let service = services.iter().find(|s| s.uuid == service)?;

        service
            .characteristics
            .iter()
            .find(|c| c.uuid == characteristic)
            .cloned()
    }

    async fn read(&self, characteristic: &Characteristic) -> Result<Vec<u8>, DeviceError> {
        Ok(self.peripheral.read(characteristic).await?)
    }

    async fn write(&self, characteristic: &Characteristic, payload: &[u8]) -> Result<(), DeviceError> {
        self.peripheral.write(characteristic, payload, WriteType::WithResponse).await?;
        Ok(())
    }

    async fn subscribe(&self, characteristic: &Characteristic) -> Result<(), DeviceError> {
        self.peripheral.subscribe(characteristic).await?;
        Ok(())
    }

    async fn unsubscribe(&self, characteristic: &Characteristic) -> Result<(), DeviceError> {
        self.peripheral.unsubscribe(characteristic).await?;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool, DeviceError> {
        Ok(self.peripheral.is_connected().await?)
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
