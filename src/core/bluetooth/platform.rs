//! [`BleDevice`] implementation on top of the bluest library
//! bluest streams borrow the adapter or characteristic they come from, so every
//! stream is pumped by its own task into a channel, stopped by a cancel token.

use std::sync::LazyLock;

use async_trait::async_trait;
use bluest::{Adapter, AdapterEvent, AdvertisingDevice, Characteristic, Device, Service};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use regex::Regex;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::constants::EVENT_QUEUE_CAPACITY;
use crate::core::bluetooth::device::{BleDevice, BlePeripheral};
use crate::core::bluetooth::error::BleError;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::types::{Advertisement, CharProperties, PowerState};

static MAC_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9A-Fa-f]{2}[:_-]){5}([0-9A-Fa-f]{2})").expect("MAC address pattern is valid")
});

struct ScanTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The default system adapter
pub struct BluestDevice {
    adapter: Adapter,
    scan: Mutex<Option<ScanTask>>,
}

impl BluestDevice {
    /// Opens the default adapter. A missing radio is fatal.
    pub async fn open() -> Result<Self, BleError> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| BleError::Adapter("No Bluetooth adapter found".to_string()))?;
        info!("Bluetooth adapter opened.");
        Ok(Self {
            adapter,
            scan: Mutex::new(None),
        })
    }

    async fn internal_scan_task(
        adapter: Adapter,
        tx: mpsc::Sender<Advertisement<BluestPeripheral>>,
        ready: oneshot::Sender<Result<(), BleError>>,
        cancel: CancellationToken,
    ) {
        let mut scan_stream = match adapter.scan(&[]).await {
            Ok(stream) => {
                let _ = ready.send(Ok(()));
                stream
            }
            Err(e) => {
                let _ = ready.send(Err(BleError::Adapter(e.to_string())));
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = scan_stream.next() => match result {
                    Some(discovered) => {
                        debug!("Found device - Device: {:?}, RSSI: {:?}", discovered.device, discovered.rssi);
                        if !forward(&tx, BluestPeripheral::from_advertising(discovered), cancel.cancelled()).await {
                            break;
                        }
                    }
                    None => {
                        info!("Bluetooth scan stream has ended.");
                        break;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl BleDevice for BluestDevice {
    type Peripheral = BluestPeripheral;

    async fn power_state(&self) -> Result<PowerState, BleError> {
        match self.adapter.is_available().await {
            Ok(true) => Ok(PowerState::PoweredOn),
            Ok(false) => Ok(PowerState::PoweredOff),
            Err(e) => Err(BleError::Adapter(e.to_string())),
        }
    }

    async fn power_events(&self) -> Result<mpsc::Receiver<PowerState>, BleError> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let adapter = self.adapter.clone();

        tokio::spawn(async move {
            let mut events = match adapter.events().await {
                Ok(events) => {
                    let _ = ready_tx.send(Ok(()));
                    events
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(BleError::Adapter(e.to_string())));
                    return;
                }
            };
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    event = events.next() => {
                        let state = match event {
                            Some(Ok(AdapterEvent::Available)) => PowerState::PoweredOn,
                            Some(Ok(AdapterEvent::Unavailable)) => PowerState::PoweredOff,
                            Some(Err(e)) => {
                                error!("Error in adapter event stream: {}", e);
                                break;
                            }
                            None => break,
                        };
                        if !forward(&tx, state, tx.closed()).await {
                            break;
                        }
                    }
                }
            }
            debug!("Adapter event task finished");
        });

        ready_rx
            .await
            .map_err(|_| BleError::Adapter("adapter event task ended".to_string()))??;
        Ok(rx)
    }

    async fn start_scan(&self) -> Result<mpsc::Receiver<Advertisement<BluestPeripheral>>, BleError> {
        self.stop_scan().await?;

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::internal_scan_task(
            self.adapter.clone(),
            tx,
            ready_tx,
            cancel.clone(),
        ));
        *self.scan.lock().await = Some(ScanTask { cancel, handle });

        ready_rx
            .await
            .map_err(|_| BleError::Adapter("scan task ended".to_string()))??;
        info!("Device scan task started.");
        Ok(rx)
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        let Some(task) = self.scan.lock().await.take() else {
            return Ok(());
        };
        info!("Stopping Bluetooth scan.");
        task.cancel.cancel();
        match task.handle.await {
            Ok(()) => info!("Scan task finished."),
            Err(e) if e.is_cancelled() => info!("Scan task was cancelled."),
            Err(e) => error!("Scan task finished with an unexpected join error: {:?}", e),
        }
        Ok(())
    }

    async fn connect(&self, peripheral: &BluestPeripheral) -> Result<(), BleError> {
        if peripheral.device.is_connected().await {
            info!("Device {} already connected.", peripheral.id);
            return Ok(());
        }
        self.adapter
            .connect_device(&peripheral.device)
            .await
            .map_err(|e| BleError::Connect(e.to_string()))
    }

    async fn cancel_connection(&self, peripheral: &BluestPeripheral) -> Result<(), BleError> {
        peripheral.subscriptions.cancel();
        if peripheral.device.is_connected().await {
            info!("Disconnecting from device {}", peripheral.id);
            self.adapter
                .disconnect_device(&peripheral.device)
                .await
                .map_err(|e| BleError::Connect(e.to_string()))?;
        } else {
            info!("Device {} not connected", peripheral.id);
        }
        Ok(())
    }
}

/// A peripheral found by a bluest scan
#[derive(Clone)]
pub struct BluestPeripheral {
    device: Device,
    id: String,
    name: String,
    /// Cancelled on disconnect, ends every notification task of this connection
    subscriptions: CancellationToken,
}

impl BluestPeripheral {
    fn from_advertising(discovered: AdvertisingDevice) -> Advertisement<Self> {
        let device = discovered.device;
        let adv_data = discovered.adv_data;
        let rssi = discovered.rssi;

        let platform_id = device.id().to_string();
        let id = extract_mac_address(&platform_id).unwrap_or(platform_id);
        let name = device
            .name()
            .ok()
            .or_else(|| adv_data.local_name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Advertisement {
            peripheral: Self {
                device,
                id,
                name,
                subscriptions: CancellationToken::new(),
            },
            local_name: adv_data.local_name,
            rssi,
            tx_power_level: adv_data.tx_power_level,
            manufacturer_data: adv_data
                .manufacturer_data
                .map(|m| (m.company_id, m.data.to_vec())),
            service_data: adv_data
                .service_data
                .iter()
                .map(|(uuid, data)| (*uuid, data.to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl BlePeripheral for BluestPeripheral {
    type Service = Service;
    type Characteristic = Characteristic;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn set_mtu(&self, _mtu: u16) -> Result<(), BleError> {
        Err(BleError::Unsupported("MTU negotiation"))
    }

    async fn discover_services(&self) -> Result<Vec<Service>, BleError> {
        self.device
            .discover_services()
            .await
            .map_err(|e| BleError::Discovery(e.to_string()))
    }

    async fn discover_characteristics(&self, service: &Service) -> Result<Vec<Characteristic>, BleError> {
        debug!("Discovering characteristics of service {}", service.uuid());
        service
            .discover_characteristics()
            .await
            .map_err(|e| BleError::Discovery(e.to_string()))
    }

    async fn characteristic_properties(&self, characteristic: &Characteristic) -> Result<CharProperties, BleError> {
        let properties = characteristic
            .properties()
            .await
            .map_err(|e| BleError::Discovery(e.to_string()))?;
        Ok(CharProperties {
            read: properties.read,
            notify: properties.notify,
            indicate: properties.indicate,
        })
    }

    async fn discover_descriptors(&self, characteristic: &Characteristic) -> Result<usize, BleError> {
        characteristic
            .discover_descriptors()
            .await
            .map(|descriptors| descriptors.len())
            .map_err(|e| BleError::Discovery(e.to_string()))
    }

    async fn subscribe(&self, characteristic: &Characteristic, handler: NotificationHandler) -> Result<(), BleError> {
        let characteristic = characteristic.clone();
        let cancel = self.subscriptions.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        tokio::spawn(async move {
            let uuid = characteristic.uuid();
            let mut notification_stream = match characteristic.notify().await {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(BleError::Subscribe(e.to_string())));
                    return;
                }
            };
            info!("Listening for notifications on {} from {}", uuid, handler.device_id());

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = notification_stream.next() => match result {
                        Some(Ok(value)) => {
                            handler.handle(&value).await;
                        }
                        Some(Err(e)) => {
                            warn!("Error in notification stream: {}", e);
                            break;
                        }
                        None => break,
                    }
                }
            }
            info!("Notification stream on {} ended", uuid);
        });

        ready_rx
            .await
            .map_err(|_| BleError::Subscribe("notification task ended".to_string()))?
    }
}

/// Queues `item` unless `stop` resolves first, so a full queue never pins a
/// pump task. Returns `false` once the pump should end.
async fn forward<T>(tx: &mpsc::Sender<T>, item: T, stop: impl Future<Output = ()>) -> bool {
    tokio::select! {
        _ = stop => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

/// Pulls a MAC address out of a platform device id, normalised to `AA:BB:..`
fn extract_mac_address(device_id_str: &str) -> Option<String> {
    MAC_ADDRESS
        .find_iter(device_id_str)
        .last()
        .map(|m| m.as_str().replace(['_', '-'], ":").to_uppercase())
}
