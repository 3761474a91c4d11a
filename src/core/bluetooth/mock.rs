//! Scripted BLE stack used by the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::bluetooth::constants::EVENT_QUEUE_CAPACITY;
use crate::core::bluetooth::device::{BleDevice, BlePeripheral};
use crate::core::bluetooth::error::BleError;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::types::{Advertisement, CharProperties, PowerState};

#[derive(Clone, Debug)]
pub struct MockCharacteristic {
    properties: Result<CharProperties, BleError>,
    descriptors: Result<usize, BleError>,
    subscribe: Result<(), BleError>,
    notifications: Vec<Vec<u8>>,
}

impl MockCharacteristic {
    pub fn readable() -> Self {
        Self {
            properties: Ok(CharProperties {
                read: true,
                ..Default::default()
            }),
            descriptors: Ok(0),
            subscribe: Ok(()),
            notifications: Vec::new(),
        }
    }

    pub fn notifying(notifications: Vec<Vec<u8>>) -> Self {
        Self {
            properties: Ok(CharProperties {
                notify: true,
                ..Default::default()
            }),
            descriptors: Ok(1),
            subscribe: Ok(()),
            notifications,
        }
    }

    pub fn indicating() -> Self {
        Self {
            properties: Ok(CharProperties {
                indicate: true,
                ..Default::default()
            }),
            ..Self::notifying(Vec::new())
        }
    }

    pub fn failing_properties() -> Self {
        Self {
            properties: Err(BleError::Discovery("properties unavailable".to_string())),
            ..Self::readable()
        }
    }

    pub fn failing_descriptors(mut self) -> Self {
        self.descriptors = Err(BleError::Discovery("descriptors unavailable".to_string()));
        self
    }

    pub fn failing_subscribe(mut self, err: BleError) -> Self {
        self.subscribe = Err(err);
        self
    }
}

#[derive(Clone, Debug)]
pub struct MockService {
    characteristics: Result<Vec<MockCharacteristic>, BleError>,
}

impl MockService {
    pub fn new(characteristics: Vec<MockCharacteristic>) -> Self {
        Self {
            characteristics: Ok(characteristics),
        }
    }

    pub fn failing(err: BleError) -> Self {
        Self {
            characteristics: Err(err),
        }
    }
}

/// Behaviour and call log of one peripheral, shared by all its clones
#[derive(Debug, Default)]
pub struct PeripheralScript {
    services: Vec<MockService>,
    services_error: Mutex<Option<BleError>>,
    mtu_error: Mutex<Option<BleError>>,
    connect_error: Mutex<Option<BleError>>,
    link_lost_before_subscribe: Mutex<bool>,
    mtu_requests: Mutex<Vec<u16>>,
    subscriptions: AtomicUsize,
}

impl PeripheralScript {
    pub fn fail_services(&self, err: BleError) {
        *self.services_error.lock().unwrap() = Some(err);
    }

    pub fn fail_mtu(&self, err: BleError) {
        *self.mtu_error.lock().unwrap() = Some(err);
    }

    pub fn fail_connect(&self, err: BleError) {
        *self.connect_error.lock().unwrap() = Some(err);
    }

    /// Peripheral drops the link after service discovery, before any subscribe.
    pub fn lose_link_before_subscribe(&self) {
        *self.link_lost_before_subscribe.lock().unwrap() = true;
    }

    pub fn mtu_requests(&self) -> Vec<u16> {
        self.mtu_requests.lock().unwrap().clone()
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct MockPeripheral {
    id: String,
    name: String,
    script: Arc<PeripheralScript>,
}

impl MockPeripheral {
    pub fn new(id: &str, name: &str, services: Vec<MockService>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            script: Arc::new(PeripheralScript {
                services,
                ..Default::default()
            }),
        }
    }

    /// A sensor with a generic access service and one notifying characteristic.
    pub fn sensor(id: &str, notifications: Vec<Vec<u8>>) -> Self {
        Self::new(
            id,
            "MJ_HT_V1",
            vec![
                MockService::new(vec![MockCharacteristic::readable(), MockCharacteristic::readable()]),
                MockService::new(vec![MockCharacteristic::notifying(notifications)]),
            ],
        )
    }

    pub fn script(&self) -> &PeripheralScript {
        &self.script
    }

    /// An advertisement carrying only a local name.
    pub fn advertised_as(self, local_name: &str) -> Advertisement<Self> {
        Advertisement {
            peripheral: self,
            local_name: Some(local_name.to_string()),
            rssi: None,
            tx_power_level: None,
            manufacturer_data: None,
            service_data: HashMap::new(),
        }
    }
}

#[async_trait]
impl BlePeripheral for MockPeripheral {
    type Service = MockService;
    type Characteristic = MockCharacteristic;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn set_mtu(&self, mtu: u16) -> Result<(), BleError> {
        self.script.mtu_requests.lock().unwrap().push(mtu);
        match self.script.mtu_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn discover_services(&self) -> Result<Vec<MockService>, BleError> {
        match self.script.services_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.script.services.clone()),
        }
    }

    async fn discover_characteristics(&self, service: &MockService) -> Result<Vec<MockCharacteristic>, BleError> {
        service.characteristics.clone()
    }

    async fn characteristic_properties(&self, characteristic: &MockCharacteristic) -> Result<CharProperties, BleError> {
        characteristic.properties.clone()
    }

    async fn discover_descriptors(&self, characteristic: &MockCharacteristic) -> Result<usize, BleError> {
        characteristic.descriptors.clone()
    }

    async fn subscribe(
        &self,
        characteristic: &MockCharacteristic,
        handler: NotificationHandler,
    ) -> Result<(), BleError> {
        if *self.script.link_lost_before_subscribe.lock().unwrap() {
            return Err(BleError::Disconnected);
        }
        characteristic.subscribe.clone()?;
        self.script.subscriptions.fetch_add(1, Ordering::SeqCst);
        for payload in &characteristic.notifications {
            handler.handle(payload).await;
        }
        Ok(())
    }
}

/// Scripted adapter. Every scan replays the configured advertisements.
#[derive(Debug)]
pub struct MockDevice {
    power: Mutex<PowerState>,
    power_tx: Mutex<Option<mpsc::Sender<PowerState>>>,
    advertisements: Mutex<Vec<Advertisement<MockPeripheral>>>,
    scan_tx: Mutex<Option<mpsc::Sender<Advertisement<MockPeripheral>>>>,
    scan_error: Mutex<Option<BleError>>,
    connect_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    scans_started: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
}

impl MockDevice {
    pub fn new(power: PowerState) -> Self {
        Self {
            power: Mutex::new(power),
            power_tx: Mutex::new(None),
            advertisements: Mutex::new(Vec::new()),
            scan_tx: Mutex::new(None),
            scan_error: Mutex::new(None),
            connect_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            scans_started: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn advertise(&self, advertisement: Advertisement<MockPeripheral>) {
        self.advertisements.lock().unwrap().push(advertisement);
    }

    pub fn fail_scan(&self, err: BleError) {
        *self.scan_error.lock().unwrap() = Some(err);
    }

    /// Changes the power state and notifies the current listener.
    pub fn set_power(&self, state: PowerState) {
        *self.power.lock().unwrap() = state;
        if let Some(tx) = self.power_tx.lock().unwrap().as_ref() {
            let _ = tx.try_send(state);
        }
    }

    /// Changes the power state without telling the listener.
    pub fn set_power_silently(&self, state: PowerState) {
        *self.power.lock().unwrap() = state;
    }

    /// Ends the current scan stream without a stop request, as a platform
    /// stack does when it drops discovery on its own.
    pub fn end_scan(&self) {
        self.scan_tx.lock().unwrap().take();
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_tx.lock().unwrap().is_some()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn scans_started(&self) -> usize {
        self.scans_started.load(Ordering::SeqCst)
    }

    /// Ordered log of `scan`, `connect` and `cancel` calls
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BleDevice for MockDevice {
    type Peripheral = MockPeripheral;

    async fn power_state(&self) -> Result<PowerState, BleError> {
        Ok(*self.power.lock().unwrap())
    }

    async fn power_events(&self) -> Result<mpsc::Receiver<PowerState>, BleError> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        *self.power_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn start_scan(&self) -> Result<mpsc::Receiver<Advertisement<MockPeripheral>>, BleError> {
        if let Some(err) = self.scan_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.scans_started.fetch_add(1, Ordering::SeqCst);
        self.record("scan");
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        for advertisement in self.advertisements.lock().unwrap().iter() {
            let _ = tx.try_send(advertisement.clone());
        }
        *self.scan_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.scan_tx.lock().unwrap().take();
        Ok(())
    }

    async fn connect(&self, peripheral: &MockPeripheral) -> Result<(), BleError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.record("connect");
        match peripheral.script.connect_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn cancel_connection(&self, _peripheral: &MockPeripheral) -> Result<(), BleError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.record("cancel");
        Ok(())
    }
}
