//! Controller: discovery and message routing for devices on the LAN
//!
//! The controller owns the UDP client and runs two threads of its own:
//!
//! 1. **receive**: blocks on the socket, decodes frames and routes them.
//!    A `StateService`/UDP frame from an unknown serial admits a new
//!    [`DeviceSession`]; any other frame is offered to the owning
//!    session's bounded inbox (and dropped with a warning when full).
//! 2. **periodic discovery**: broadcasts a `GetService` on a fixed
//!    period. Failures are logged and the loop continues.
//!
//! Sessions terminate themselves through the liveness watchdog, are
//! removed on demand, and are all torn down on [`Controller::close`],
//! which waits a bounded time for their tasks to finish.

pub mod session;

pub use session::DeviceSession;

use crate::client::{ClientConfig, LanClient, UdpClient};
use crate::config::Config;
use crate::device::{self, Device, Serial};
use crate::error::Result;
use crate::protocol::{packets, Message, Payload};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use session::{OnTimeout, TaskGuard};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type SessionMap = Arc<RwLock<HashMap<Serial, DeviceSession>>>;

/// Options for building a [`Controller`].
#[derive(Default)]
pub struct Options {
    client: Option<Arc<dyn LanClient>>,
    config: Option<Config>,
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Injects a client instead of binding a UDP socket. Used in tests.
    pub fn with_client(mut self, client: Arc<dyn LanClient>) -> Options {
        self.client = Some(client);
        self
    }

    pub fn with_config(mut self, config: Config) -> Options {
        self.config = Some(config);
        self
    }

    pub fn with_discovery_period(mut self, d: Duration) -> Options {
        self.config_mut().discovery_period = d;
        self
    }

    pub fn with_high_freq_period(mut self, d: Duration) -> Options {
        let cfg = self.config_mut();
        cfg.high_freq_period = d;
        cfg.device_liveness_timeout = Duration::ZERO;
        self
    }

    pub fn with_low_freq_period(mut self, d: Duration) -> Options {
        let cfg = self.config_mut();
        cfg.low_freq_period = d;
        cfg.device_liveness_timeout = Duration::ZERO;
        self
    }

    pub fn with_preflight_timeout(mut self, d: Duration) -> Options {
        self.config_mut().preflight_timeout = d;
        self
    }

    fn config_mut(&mut self) -> &mut Config {
        self.config.get_or_insert_with(Config::default)
    }
}

/// Manages discovery and message routing for multiple devices on the LAN.
pub struct Controller {
    client: Arc<dyn LanClient>,
    cfg: Arc<Config>,
    sessions: SessionMap,
    shutdown: Arc<AtomicBool>,
    discovery_stop_tx: Option<Sender<()>>,
    recv_handle: Option<JoinHandle<()>>,
    discovery_handle: Option<JoinHandle<()>>,
    // Waitgroup over session run tasks: every session holds a sender
    // clone, dropped when its run thread exits.
    wg_tx: Option<Sender<()>>,
    wg_rx: Receiver<()>,
    closed: AtomicBool,
}

impl Controller {
    /// Creates a Controller that periodically discovers LIFX devices on
    /// the LAN and creates individual sessions for message routing.
    ///
    /// Fails if the socket cannot be created or the initial discovery
    /// broadcast fails.
    pub fn new(opts: Options) -> Result<Controller> {
        let cfg = Arc::new(opts.config.unwrap_or_default().normalized());
        let client: Arc<dyn LanClient> = match opts.client {
            Some(c) => c,
            None => Arc::new(UdpClient::new(ClientConfig::default())?),
        };

        let sessions: SessionMap = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (wg_tx, wg_rx) = bounded::<()>(0);
        let (discovery_stop_tx, discovery_stop_rx) = bounded::<()>(0);

        let recv_handle = {
            let client = Arc::clone(&client);
            let cfg = Arc::clone(&cfg);
            let sessions = Arc::clone(&sessions);
            let shutdown = Arc::clone(&shutdown);
            let wg_tx = wg_tx.clone();
            thread::Builder::new()
                .name("lifx-recv".to_string())
                .spawn(move || recv_loop(client, cfg, sessions, shutdown, wg_tx))
                .expect("failed to spawn receive thread")
        };

        let controller = Controller {
            client,
            cfg,
            sessions,
            shutdown,
            discovery_stop_tx: Some(discovery_stop_tx),
            recv_handle: Some(recv_handle),
            discovery_handle: None,
            wg_tx: Some(wg_tx),
            wg_rx,
            closed: AtomicBool::new(false),
        };

        // Perform an initial discovery and fail early, if needed.
        controller.discover()?;

        let discovery_handle = {
            let client = Arc::clone(&controller.client);
            let period = controller.cfg.discovery_period;
            thread::Builder::new()
                .name("lifx-discovery".to_string())
                .spawn(move || discovery_loop(client, period, discovery_stop_rx))
                .expect("failed to spawn discovery thread")
        };

        let mut controller = controller;
        controller.discovery_handle = Some(discovery_handle);
        Ok(controller)
    }

    /// Broadcasts a LIFX discovery packet.
    pub fn discover(&self) -> Result<()> {
        let mut msg = Message::new(Payload::GetService);
        self.client.send_broadcast(&mut msg)
    }

    /// Sends the given message to the device with the given serial, if a
    /// session exists. A missing session is not an error.
    pub fn send(&self, serial: Serial, msg: Message) -> Result<()> {
        let sessions = self.sessions.read();
        if let Some(session) = sessions.get(&serial) {
            return session.send(vec![msg]);
        }
        Ok(())
    }

    /// Returns a snapshot of every device that has a session, sorted by
    /// label and serial.
    pub fn get_devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = {
            let sessions = self.sessions.read();
            sessions.values().map(|s| s.device_snapshot()).collect()
        };
        device::sort_devices(&mut devices);
        devices
    }

    /// The configuration in effect.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Closes the Controller: stops the receive loop, stops periodic
    /// discovery, terminates all sessions and waits up to
    /// `sessions_termination_timeout` for their tasks to finish.
    /// Idempotent.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shutdown.store(true, Ordering::SeqCst);
        self.discovery_stop_tx.take();

        if let Some(handle) = self.recv_handle.take() {
            if handle.join().is_err() {
                log::error!("Receive thread panicked");
            }
        }
        if let Some(handle) = self.discovery_handle.take() {
            if handle.join().is_err() {
                log::error!("Discovery thread panicked");
            }
        }

        terminate_all_sessions(&self.sessions);

        // Drop our own waitgroup sender so disconnection means "all
        // session tasks finished".
        self.wg_tx.take();
        match self.wg_rx.recv_timeout(self.cfg.sessions_termination_timeout) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Timed out waiting for session tasks to finish");
            }
        }

        log::info!("Controller closed");
    }

    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    #[cfg(test)]
    fn add_session_for_test(&self, addr: SocketAddr, serial: Serial) {
        let wg_tx = self.wg_tx.clone().expect("controller closed");
        add_session(
            &self.sessions,
            &self.cfg,
            &self.client,
            addr,
            serial,
            wg_tx,
        );
    }

    #[cfg(test)]
    fn terminate_session_for_test(&self, serial: Serial) {
        terminate_session(&self.sessions, serial);
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.close();
    }
}

/// Removes the session from the map, then closes it outside the lock to
/// avoid holding the lock across task teardown.
fn terminate_session(sessions: &SessionMap, serial: Serial) {
    let removed = sessions.write().remove(&serial);
    if let Some(session) = removed {
        session.close();
        log::info!("Terminated session for {}", serial);
    }
}

fn terminate_all_sessions(sessions: &SessionMap) {
    let drained: Vec<(Serial, DeviceSession)> = sessions.write().drain().collect();
    for (_, session) in &drained {
        session.close();
    }
}

/// Creates and registers a session for a newly discovered device.
fn add_session(
    sessions: &SessionMap,
    cfg: &Arc<Config>,
    client: &Arc<dyn LanClient>,
    addr: SocketAddr,
    serial: Serial,
    wg_tx: Sender<()>,
) {
    let on_timeout: OnTimeout = {
        let sessions: Weak<RwLock<HashMap<Serial, DeviceSession>>> = Arc::downgrade(sessions);
        Box::new(move |serial| {
            if let Some(sessions) = sessions.upgrade() {
                terminate_session(&sessions, serial);
            }
        })
    };

    let session = DeviceSession::new(
        addr,
        serial,
        Arc::clone(client),
        Arc::clone(cfg),
        TaskGuard::new(wg_tx),
        on_timeout,
    );
    sessions.write().insert(serial, session);
    log::info!("Started session for {} at {}", serial, addr);
}

/// Listens for incoming frames and dispatches them to the appropriate
/// session. Read timeouts are benign; any other socket error shuts the
/// controller down.
fn recv_loop(
    client: Arc<dyn LanClient>,
    cfg: Arc<Config>,
    sessions: SessionMap,
    shutdown: Arc<AtomicBool>,
    wg_tx: Sender<()>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match client.recv_from() {
            Ok(Some((msg, addr))) => {
                route_message(&sessions, &cfg, &client, &wg_tx, msg, addr);
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("Fatal receive error, shutting down: {}", e);
                shutdown.store(true, Ordering::SeqCst);
                terminate_all_sessions(&sessions);
                return;
            }
        }
    }
}

fn route_message(
    sessions: &SessionMap,
    cfg: &Arc<Config>,
    client: &Arc<dyn LanClient>,
    wg_tx: &Sender<()>,
    msg: Message,
    addr: SocketAddr,
) {
    let serial = Serial(msg.target());
    let has_session = sessions.read().contains_key(&serial);

    if let Payload::StateService(state) = &msg.payload {
        if !has_session && state.service == packets::SERVICE_UDP {
            add_session(sessions, cfg, client, addr, serial, wg_tx.clone());
        }
        return;
    }

    if has_session {
        let sessions = sessions.read();
        if let Some(session) = sessions.get(&serial) {
            if !session.offer_inbound(msg) {
                // Never block the router on a slow session.
                log::warn!("Inbox full for {}, skipping message", serial);
            }
        }
    }
}

/// Periodically looks for new devices on the network.
fn discovery_loop(client: Arc<dyn LanClient>, period: Duration, stop: Receiver<()>) {
    loop {
        match stop.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => {
                let mut msg = Message::new(Payload::GetService);
                if let Err(e) = client.send_broadcast(&mut msg) {
                    log::warn!("Discovery broadcast failed: {}", e);
                }
            }
            _ => return,
        }
    }
}
