use crate::{BridgeError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;
use webbridge_format::ProtocolConfig;

/// Whether dispatch continues to later handlers of the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Hand the event to the next handler.
    Continue,
    /// Skip the remaining handlers for this event.
    Stop,
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Propagation::Continue
    }
}

/// `false` stops dispatch, `true` continues.
impl From<bool> for Propagation {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Propagation::Continue
        } else {
            Propagation::Stop
        }
    }
}

/// Token identifying one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A registered event handler.
pub type EventHandler = Rc<dyn Fn(&Value) -> Propagation>;

/// Where an inbound event goes.
pub enum Route {
    /// The reserved response event; resolve a pending call.
    Response,
    /// Ordinary event; these handlers, in registration order.
    Listeners(Vec<EventHandler>),
}

/// Per-event ordered handler lists.
pub struct EventRouter {
    config: ProtocolConfig,
    next_listener: u64,
    listeners: HashMap<String, Vec<(ListenerId, EventHandler)>>,
}

impl EventRouter {
    /// Create a router that reserves `config.response_event`.
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            config: config.clone(),
            next_listener: 1,
            listeners: HashMap::new(),
        }
    }

    /// Fail with a usage error if `event_name` is reserved.
    pub fn check_event_name(&self, event_name: &str) -> Result<()> {
        if self.config.is_reserved(event_name) {
            return Err(BridgeError::ReservedEventName(event_name.to_string()));
        }
        Ok(())
    }

    /// Append `handler` to the list for `event_name`.
    pub fn register<F, R>(&mut self, event_name: &str, handler: F) -> Result<ListenerId>
    where
        F: Fn(&Value) -> R + 'static,
        R: Into<Propagation>,
    {
        self.check_event_name(event_name)?;

        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        let handler: EventHandler = Rc::new(move |data: &Value| handler(data).into());
        self.listeners
            .entry(event_name.to_string())
            .or_default()
            .push((id, handler));
        Ok(id)
    }

    /// Remove one handler, or every handler when `listener` is `None`.
    ///
    /// Returns how many handlers were removed. The order of the remaining
    /// handlers is preserved.
    pub fn unregister(&mut self, event_name: &str, listener: Option<ListenerId>) -> Result<usize> {
        self.check_event_name(event_name)?;

        let removed = match listener {
            None => self
                .listeners
                .remove(event_name)
                .map(|handlers| handlers.len())
                .unwrap_or(0),
            Some(target) => {
                let Some(handlers) = self.listeners.get_mut(event_name) else {
                    return Ok(0);
                };
                let before = handlers.len();
                handlers.retain(|(id, _)| *id != target);
                let removed = before - handlers.len();
                if handlers.is_empty() {
                    self.listeners.remove(event_name);
                }
                removed
            }
        };
        Ok(removed)
    }

    /// Resolve where `event_name` should be delivered.
    ///
    /// Handler lists are cloned so handlers may register or unregister
    /// while dispatch is in progress.
    pub fn route(&self, event_name: &str) -> Route {
        if self.config.is_reserved(event_name) {
            return Route::Response;
        }
        let handlers = self
            .listeners
            .get(event_name)
            .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        Route::Listeners(handlers)
    }

    /// Number of handlers registered for `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners.get(event_name).map_or(0, Vec::len)
    }

    /// Drop every handler for every event.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
