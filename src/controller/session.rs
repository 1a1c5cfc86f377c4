//! Per-device session
//!
//! A session owns the cached [`Device`] state and runs two threads:
//!
//! 1. **recv**: drains the bounded inbox and applies state mutations to
//!    the device under the session's write lock.
//! 2. **run**: performs the preflight handshake, then drives the
//!    high/low-frequency probe tickers and the liveness watchdog.
//!
//! Both threads stop when the session's done channel is dropped. The run
//! thread reports completion through a waitgroup guard so the controller
//! can bound its shutdown wait.

use crate::client::LanClient;
use crate::config::Config;
use crate::device::{self, Color, Device, LightType, Serial, WifiRssi};
use crate::error::Result;
use crate::protocol::{Message, Payload};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Capacity of the session inbox. The controller's router drops frames
/// when it is full rather than blocking.
pub const DEFAULT_INBOX_CAPACITY: usize = 10;

/// Callback invoked when the device has not been heard from within the
/// liveness window.
pub type OnTimeout = Box<dyn Fn(Serial) + Send + Sync>;

/// Drop guard counting a live session task. The controller holds the
/// matching receiver and waits for disconnection on shutdown.
pub struct TaskGuard(#[allow(dead_code)] Sender<()>);

impl TaskGuard {
    pub fn new(tx: Sender<()>) -> Self {
        TaskGuard(tx)
    }
}

/// Shared message sender stamping target and sequence for one device.
#[derive(Clone)]
struct SessionSender {
    client: Arc<dyn LanClient>,
    address: SocketAddr,
    serial: Serial,
    seq: Arc<AtomicU8>,
}

impl SessionSender {
    /// Stamps target and the next sequence on each message and hands it
    /// to the client. Every message is attempted; the first error is
    /// returned after the loop.
    fn send(&self, msgs: Vec<Message>) -> Result<()> {
        let mut first_err = None;
        for mut msg in msgs {
            msg.set_target(self.serial.0);
            msg.set_sequence(self.next_seq());
            if let Err(e) = self.client.send(self.address, &mut msg) {
                log::debug!(
                    "Failed to send message to device {}: {}",
                    self.serial,
                    e
                );
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Increments the sequence number and returns the new value,
    /// wrapping after 255.
    fn next_seq(&self) -> u8 {
        self.seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

/// A session for a specific device.
pub struct DeviceSession {
    sender: SessionSender,
    inbound_tx: Sender<Message>,
    device: Arc<RwLock<Device>>,
    done_tx: Mutex<Option<Sender<()>>>,
}

impl DeviceSession {
    /// Creates a new session for the given device and spawns its recv
    /// and run threads.
    pub fn new(
        address: SocketAddr,
        serial: Serial,
        client: Arc<dyn LanClient>,
        cfg: Arc<Config>,
        task_guard: TaskGuard,
        on_timeout: OnTimeout,
    ) -> DeviceSession {
        let device = Arc::new(RwLock::new(Device::new(address, serial)));
        let (inbound_tx, inbound_rx) = bounded(DEFAULT_INBOX_CAPACITY);
        let (done_tx, done_rx) = bounded::<()>(0);

        let sender = SessionSender {
            client,
            address,
            serial,
            seq: Arc::new(AtomicU8::new(0)),
        };

        {
            let device = Arc::clone(&device);
            let done_rx = done_rx.clone();
            thread::Builder::new()
                .name(format!("lifx-recv-{}", serial))
                .spawn(move || recv_loop(device, inbound_rx, done_rx, serial))
                .expect("failed to spawn session recv thread");
        }

        {
            let device = Arc::clone(&device);
            let sender = sender.clone();
            thread::Builder::new()
                .name(format!("lifx-run-{}", serial))
                .spawn(move || run_loop(device, sender, cfg, done_rx, on_timeout, task_guard))
                .expect("failed to spawn session run thread");
        }

        DeviceSession {
            sender,
            inbound_tx,
            device,
            done_tx: Mutex::new(Some(done_tx)),
        }
    }

    /// Sends one or more messages to the device, stamping target and
    /// sequence on each.
    pub fn send(&self, msgs: Vec<Message>) -> Result<()> {
        self.sender.send(msgs)
    }

    /// Returns a copy of the device with its current state.
    pub fn device_snapshot(&self) -> Device {
        self.device.read().clone()
    }

    /// Offers a frame to the session inbox without blocking.
    /// Returns false when the inbox is full.
    pub fn offer_inbound(&self, msg: Message) -> bool {
        self.inbound_tx.try_send(msg).is_ok()
    }

    /// Signals both session threads to stop. Idempotent.
    pub fn close(&self) {
        self.done_tx.lock().take();
    }
}

fn recv_loop(
    device: Arc<RwLock<Device>>,
    inbound: Receiver<Message>,
    done: Receiver<()>,
    serial: Serial,
) {
    loop {
        select! {
            recv(inbound) -> msg => {
                let Ok(msg) = msg else { return };
                process_inbound(&device, msg);
            }
            recv(done) -> _ => {
                log::info!("Exiting device recv loop for {}", serial);
                return;
            }
        }
    }
}

/// Applies one inbound frame to the device state. Every frame, handled
/// or not, refreshes the liveness timestamp.
fn process_inbound(device: &RwLock<Device>, msg: Message) {
    let now = Instant::now();
    let mut d = device.write();
    let mut updated = true;
    match &msg.payload {
        Payload::StateLabel(p) => d.label = device::parse_label(&p.label),
        Payload::LightState(p) => {
            d.color = Color::from_device(p.color);
            d.powered_on = p.power > 0;
        }
        Payload::StateVersion(p) => d.set_product_info(p.product),
        Payload::StateHostFirmware(p) => {
            d.firmware_version = format!("{}.{}", p.version_major, p.version_minor);
        }
        Payload::StateLocation(p) => d.location = device::parse_label(&p.label),
        Payload::StateGroup(p) => d.group = device::parse_label(&p.label),
        Payload::TileStateDeviceChain(p) => updated = d.set_matrix_properties(p),
        Payload::TileState64(p) => updated = d.set_matrix_state(p),
        Payload::StatePower(p) => d.powered_on = p.level > 0,
        Payload::StateWifiInfo(p) => {
            d.wifi_rssi = WifiRssi((10.0 * f64::from(p.signal).log10() + 0.5).floor() as i16);
        }
        Payload::MultiZoneExtendedStateMultiZone(p) => updated = d.set_multizone_properties(p),
        Payload::StateService(_) | Payload::StateUnhandled(_) => updated = false,
        _ => {
            updated = false;
            log::debug!(
                "Session {}: unhandled message type {}",
                d.serial,
                msg.payload_type()
            );
        }
    }
    if updated {
        d.last_updated_at = Some(now);
    }
    d.last_seen_at = Some(now);
}

fn run_loop(
    device: Arc<RwLock<Device>>,
    sender: SessionSender,
    cfg: Arc<Config>,
    done: Receiver<()>,
    on_timeout: OnTimeout,
    _task_guard: TaskGuard,
) {
    if !preflight_handshake(&device, &sender, &cfg, &done) {
        return;
    }

    let hf_tick = crossbeam_channel::tick(cfg.high_freq_period);
    let lf_tick = crossbeam_channel::tick(cfg.low_freq_period);
    // Check twice inside the liveness timeout window.
    let liveness_tick = crossbeam_channel::tick(cfg.device_liveness_timeout / 2);

    loop {
        select! {
            recv(done) -> _ => return,
            recv(hf_tick) -> _ => {
                let msgs = device.read().high_freq_messages();
                let _ = sender.send(msgs);
            }
            recv(lf_tick) -> _ => {
                let msgs = device.read().low_freq_messages();
                let _ = sender.send(msgs);
            }
            recv(liveness_tick) -> _ => {
                let last = device.read().last_seen_at;
                let expired = match last {
                    Some(t) => t.elapsed() > cfg.device_liveness_timeout,
                    None => true,
                };
                if expired {
                    log::warn!(
                        "Device {} not seen for too long, terminating session",
                        sender.serial
                    );
                    on_timeout(sender.serial);
                    return;
                }
            }
        }
    }
}

/// Gathers a minimal known-good device state before the periodic refresh
/// loop starts.
///
/// Sends the required state requests, waits for the recv loop to update
/// the device, and retries the unfulfilled ones until all are satisfied
/// or the deadline expires. A timeout is logged but not fatal: the loop
/// proceeds with partial state.
///
/// Returns false when the session was closed mid-handshake.
fn preflight_handshake(
    device: &RwLock<Device>,
    sender: &SessionSender,
    cfg: &Config,
    done: &Receiver<()>,
) -> bool {
    let deadline = Instant::now() + cfg.preflight_timeout;
    let mut required = required_state_messages();

    while !required.is_empty() {
        let _ = sender.send(required.clone());

        select! {
            recv(done) -> _ => return false,
            default(cfg.preflight_wait) => {}
        }

        {
            let d = device.read();
            required.retain(|m| !message_fulfilled(m, &d));
        }

        if Instant::now() > deadline {
            if !required.is_empty() {
                log::warn!(
                    "Preflight for {} timed out with {} missing messages",
                    sender.serial,
                    required.len()
                );
            }
            return true;
        }
    }
    true
}

/// The messages gathering critical information about a device's state.
pub fn required_state_messages() -> Vec<Message> {
    vec![
        Message::new(Payload::GetLabel),
        Message::new(Payload::GetVersion),
        Message::new(Payload::LightGet),
        Message::new(Payload::GetHostFirmware),
        Message::new(Payload::GetLocation),
        Message::new(Payload::GetGroup),
        Message::new(Payload::GetWifiInfo),
        Message::new(Payload::TileGetDeviceChain),
    ]
}

/// Whether the state request carried by `msg` has been answered.
fn message_fulfilled(msg: &Message, d: &Device) -> bool {
    match msg.payload {
        Payload::GetLabel => !d.label.is_empty(),
        Payload::GetVersion => d.product_id > 0,
        Payload::GetHostFirmware => !d.firmware_version.is_empty(),
        Payload::GetLocation => !d.location.is_empty(),
        Payload::GetGroup => !d.group.is_empty(),
        Payload::GetWifiInfo => d.wifi_rssi.0 != 0,
        Payload::TileGetDeviceChain => {
            d.light_type != LightType::Matrix || d.matrix_properties.chain_length > 0
        }
        // LightGet has no reliable emptiness predicate; one round trip
        // is assumed sufficient.
        _ => true,
    }
}
