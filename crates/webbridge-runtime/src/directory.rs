use crate::bridge::{Bridge, BridgeInner};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use webbridge_format::RawPayload;

static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate the next id in this process.
    pub(crate) fn allocate() -> Self {
        Self(INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id received from an adapter. Does not allocate.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// One message the embedded context sent, as extracted by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Bridge the message is addressed to.
    pub instance_id: InstanceId,
    /// Event name, possibly the reserved response event.
    pub event_name: String,
    /// Undecoded payload.
    pub payload: RawPayload,
}

impl InboundMessage {
    /// Create a new inbound message.
    pub fn new(
        instance_id: InstanceId,
        event_name: impl Into<String>,
        payload: impl Into<RawPayload>,
    ) -> Self {
        Self {
            instance_id,
            event_name: event_name.into(),
            payload: payload.into(),
        }
    }
}

/// Directory mapping instance ids to live bridges.
///
/// Adapters only know the instance id carried by a platform signal; the
/// directory turns it back into the bridge. Entries are added when a bridge
/// is attached and removed when it is destroyed or dropped. Cloning yields
/// another handle to the same directory.
#[derive(Clone, Default)]
pub struct InstanceDirectory {
    entries: Rc<RefCell<HashMap<InstanceId, Weak<BridgeInner>>>>,
}

impl InstanceDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: InstanceId, bridge: Weak<BridgeInner>) {
        self.entries.borrow_mut().insert(id, bridge);
    }

    pub(crate) fn unregister(&self, id: InstanceId) -> bool {
        match self.entries.try_borrow_mut() {
            Ok(mut entries) => entries.remove(&id).is_some(),
            Err(_) => {
                log::warn!("instance directory busy, could not unregister {}", id);
                false
            }
        }
    }

    /// Find the live bridge registered under `id`.
    pub fn lookup(&self, id: InstanceId) -> Option<Bridge> {
        let inner = self.entries.borrow().get(&id).and_then(Weak::upgrade);
        inner.map(Bridge::from_inner)
    }

    /// Route an inbound message to its bridge.
    ///
    /// Returns `false` when no live bridge owns the id; the message is
    /// dropped, which is expected for callbacks racing a teardown.
    pub fn deliver(&self, message: InboundMessage) -> bool {
        match self.lookup(message.instance_id) {
            Some(bridge) => {
                bridge.dispatch(&message.event_name, message.payload);
                true
            }
            None => {
                log::debug!(
                    "dropping {:?} for unknown instance {}",
                    message.event_name,
                    message.instance_id
                );
                false
            }
        }
    }

    /// Whether `id` resolves to a live bridge.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.lookup(id).is_some()
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no instance is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl fmt::Debug for InstanceDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<InstanceId> = self.entries.borrow().keys().copied().collect();
        ids.sort();
        f.debug_struct("InstanceDirectory")
            .field("instances", &ids)
            .finish()
    }
}
