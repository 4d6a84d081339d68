use crate::Result;
use std::cell::{Cell, RefCell};
use webbridge_runtime::{Bridge, BridgeState, ExecutionError};

type RegisterHook = Box<dyn Fn() -> std::result::Result<(), ExecutionError>>;

/// Turns the platform's "load finished" notifications into bridge readiness.
///
/// Platforms that can only install their native channel after the first
/// document has loaded attach the bridge with
/// [`awaiting_ready`](webbridge_runtime::BridgeBuilder::awaiting_ready) and
/// feed every load notification through this gate. On the first one the
/// registration hook runs, then the bridge is marked ready, which loads the
/// initial URL and flushes queued scripts. Later notifications are ignored.
pub struct ReadinessGate {
    bridge: Bridge,
    register: RefCell<Option<RegisterHook>>,
    opened: Cell<bool>,
}

impl ReadinessGate {
    /// Gate `bridge` with no registration step.
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            register: RefCell::new(None),
            opened: Cell::new(false),
        }
    }

    /// Run `register` (typically installing the native callable) before
    /// the bridge becomes ready.
    pub fn with_registration<F>(self, register: F) -> Self
    where
        F: Fn() -> std::result::Result<(), ExecutionError> + 'static,
    {
        *self.register.borrow_mut() = Some(Box::new(register));
        self
    }

    /// Whether the gate has opened.
    pub fn is_open(&self) -> bool {
        self.opened.get()
    }

    /// Handle a load-finished notification for `url`.
    ///
    /// Returns `true` when this call opened the gate. A failed registration
    /// or initial load leaves the gate closed so the next notification
    /// retries.
    pub fn on_load_finished(&self, url: &str) -> Result<bool> {
        if self.opened.get() || self.bridge.state() == BridgeState::Destroyed {
            return Ok(false);
        }

        let hook = self.register.borrow_mut().take();
        if let Some(hook) = hook {
            if let Err(err) = hook() {
                log::warn!(
                    "bridge {}: native registration failed after loading {}: {}",
                    self.bridge.id(),
                    url,
                    err
                );
                *self.register.borrow_mut() = Some(hook);
                return Err(err.into());
            }
        }

        self.bridge.mark_ready()?;
        self.opened.set(true);
        log::debug!("bridge {}: ready after loading {}", self.bridge.id(), url);
        Ok(true)
    }
}
