//! Mock LAN client for testing
//!
//! Records every unicast send, counts broadcasts and lets tests inject
//! inbound frames that the controller's receive loop will pick up.

use super::LanClient;
use crate::error::Result;
use crate::protocol::Message;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const RECV_POLL: Duration = Duration::from_millis(5);

/// Mock client backed by channels.
pub struct MockClient {
    sends_tx: Sender<Message>,
    sends_rx: Receiver<Message>,
    inbound_tx: Sender<(Message, SocketAddr)>,
    inbound_rx: Receiver<(Message, SocketAddr)>,
    broadcasts: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        let (sends_tx, sends_rx) = unbounded();
        let (inbound_tx, inbound_rx) = unbounded();
        MockClient {
            sends_tx,
            sends_rx,
            inbound_tx,
            inbound_rx,
            broadcasts: AtomicUsize::new(0),
        }
    }

    /// Injects a frame for the receive loop to pick up.
    pub fn push_inbound(&self, msg: Message, addr: SocketAddr) {
        let _ = self.inbound_tx.send((msg, addr));
    }

    /// A receiver over every message sent so far (and later).
    pub fn sends(&self) -> Receiver<Message> {
        self.sends_rx.clone()
    }

    /// Number of broadcast frames sent.
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::Relaxed)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LanClient for MockClient {
    fn send(&self, _dst: SocketAddr, msg: &mut Message) -> Result<()> {
        let _ = self.sends_tx.send(msg.clone());
        Ok(())
    }

    fn send_broadcast(&self, _msg: &mut Message) -> Result<()> {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn recv_from(&self) -> Result<Option<(Message, SocketAddr)>> {
        match self.inbound_rx.recv_timeout(RECV_POLL) {
            Ok((msg, addr)) => Ok(Some((msg, addr))),
            Err(_) => Ok(None),
        }
    }
}
