//! In-process stand-in for an embedded script context.
//!
//! [`LoopbackContext`] executes the scripts a bridge generates by decoding
//! them instead of evaluating them: events go to embedded-side listeners,
//! calls go to embedded-side functions defined in Rust. Everything the
//! embedded side sends back is queued and only crosses the boundary when
//! the host pumps it through a [`PushChannel`] or a [`PullChannel`], the
//! way a real context answers asynchronously.

use crate::pull::SignalUrl;
use crate::{Interception, PullChannel, PushChannel, Result};
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use webbridge_format::{parse_script, serialize_payload, OutboundScript, ProtocolConfig, ResponseEnvelope};
use webbridge_runtime::{ContentLoader, ExecutionError, InstanceId, ScriptExecutor};

type EmbeddedFunction = Rc<dyn Fn(&[Value]) -> std::result::Result<Value, Value>>;
type EmbeddedListener = Rc<dyn Fn(&LoopbackContext, &Value)>;

struct Outgoing {
    event_name: String,
    payload: String,
}

/// Simulated embedded context.
pub struct LoopbackContext {
    config: ProtocolConfig,
    instance_id: Cell<Option<InstanceId>>,
    functions: RefCell<HashMap<String, EmbeddedFunction>>,
    listeners: RefCell<HashMap<String, EmbeddedListener>>,
    received: RefCell<Vec<(String, Value)>>,
    outbox: RefCell<VecDeque<Outgoing>>,
    stash: RefCell<HashMap<String, String>>,
    next_key: Cell<u64>,
    location: RefCell<Option<String>>,
    available: Cell<bool>,
}

impl LoopbackContext {
    /// Create an empty context speaking `config`.
    pub fn new(config: ProtocolConfig) -> Rc<Self> {
        Rc::new(Self {
            config,
            instance_id: Cell::new(None),
            functions: RefCell::new(HashMap::new()),
            listeners: RefCell::new(HashMap::new()),
            received: RefCell::new(Vec::new()),
            outbox: RefCell::new(VecDeque::new()),
            stash: RefCell::new(HashMap::new()),
            next_key: Cell::new(1),
            location: RefCell::new(None),
            available: Cell::new(true),
        })
    }

    /// Address outgoing messages to `instance_id`.
    pub fn bind(&self, instance_id: InstanceId) {
        self.instance_id.set(Some(instance_id));
    }

    /// Define a function callable through remote function calls.
    ///
    /// `Err` values are reported back as remote errors.
    pub fn define_function<F>(&self, name: &str, function: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Value, Value> + 'static,
    {
        self.functions
            .borrow_mut()
            .insert(name.to_string(), Rc::new(function));
    }

    /// Handle host-emitted `event_name` on the embedded side.
    pub fn on_event<F>(&self, event_name: &str, listener: F)
    where
        F: Fn(&LoopbackContext, &Value) + 'static,
    {
        self.listeners
            .borrow_mut()
            .insert(event_name.to_string(), Rc::new(listener));
    }

    /// Queue an embedded-originated event for the host.
    pub fn post<T: Serialize + ?Sized>(&self, event_name: &str, data: &T) {
        self.outbox.borrow_mut().push_back(Outgoing {
            event_name: event_name.to_string(),
            payload: serialize_payload(data),
        });
    }

    /// Queue a raw, possibly non-JSON, payload for the host.
    pub fn post_text(&self, event_name: &str, text: &str) {
        self.outbox.borrow_mut().push_back(Outgoing {
            event_name: event_name.to_string(),
            payload: text.to_string(),
        });
    }

    /// Events the embedded side has received, in order.
    pub fn received(&self) -> Vec<(String, Value)> {
        self.received.borrow().clone()
    }

    /// Currently loaded URL.
    pub fn location(&self) -> Option<String> {
        self.location.borrow().clone()
    }

    /// Simulate the script engine becoming unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Messages waiting to cross to the host.
    pub fn pending_outbound(&self) -> usize {
        self.outbox.borrow().len()
    }

    /// Deliver queued messages through a push channel.
    ///
    /// Only messages queued before the call are delivered; replies they
    /// provoke wait for the next pump. Returns how many reached a bridge.
    pub fn pump_push(&self, channel: &PushChannel) -> Result<usize> {
        let Some(instance_id) = self.bound_instance() else {
            return Ok(0);
        };
        let instance_id = instance_id.to_string();

        let mut delivered = 0;
        for _ in 0..self.pending_outbound() {
            let next = self.outbox.borrow_mut().pop_front();
            let Some(message) = next else { break };
            if channel.receive(&instance_id, &message.event_name, Some(message.payload))? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Deliver queued messages by signalling URLs to a pull channel.
    ///
    /// Payloads are stashed under a fresh key and fetched back by the
    /// channel through this context's executor.
    pub fn pump_pull(&self, channel: &PullChannel) -> Result<usize> {
        let Some(instance_id) = self.bound_instance() else {
            return Ok(0);
        };

        let mut delivered = 0;
        for _ in 0..self.pending_outbound() {
            let next = self.outbox.borrow_mut().pop_front();
            let Some(message) = next else { break };

            let key = format!("m{}", self.next_key.get());
            self.next_key.set(self.next_key.get() + 1);
            self.stash.borrow_mut().insert(key.clone(), message.payload);

            let url = SignalUrl {
                instance_id,
                event_name: message.event_name,
                message_key: key.clone(),
            }
            .to_url(&self.config);

            let outcome = channel.intercept(&url);
            // Unfetched payloads would otherwise linger for dropped signals.
            self.stash.borrow_mut().remove(&key);
            if outcome? == Interception::Delivered {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    fn bound_instance(&self) -> Option<InstanceId> {
        let bound = self.instance_id.get();
        if bound.is_none() {
            log::warn!("loopback context is not bound to a bridge instance");
        }
        bound
    }

    fn run_call(&self, request_id: String, function: &str, args: &[Value]) {
        let found = self.functions.borrow().get(function).cloned();
        let envelope = match found {
            Some(function) => match function(args) {
                Ok(value) => ResponseEnvelope::success(request_id, value),
                Err(value) => ResponseEnvelope::failure(request_id, value),
            },
            None => ResponseEnvelope::failure(
                request_id,
                Value::String(format!("{} is not a function", function)),
            ),
        };
        self.post(&self.config.response_event, &envelope);
    }
}

impl ScriptExecutor for LoopbackContext {
    fn execute(&self, script: &str) -> std::result::Result<Option<String>, ExecutionError> {
        if !self.available.get() {
            return Err(ExecutionError::new("script engine unavailable"));
        }

        let parsed = parse_script(&self.config, script)
            .map_err(|e| ExecutionError::new(format!("loopback cannot run script: {}", e)))?;

        match parsed {
            OutboundScript::Event {
                event_name,
                payload,
            } => {
                let listener = self.listeners.borrow().get(&event_name).cloned();
                self.received
                    .borrow_mut()
                    .push((event_name, payload.clone()));
                if let Some(listener) = listener {
                    listener(self, &payload);
                }
                Ok(None)
            }
            OutboundScript::Call {
                request_id,
                function,
                args,
            } => {
                self.run_call(request_id, &function, &args);
                Ok(None)
            }
            OutboundScript::Fetch { message_key } => {
                let body = self.stash.borrow_mut().remove(&message_key);
                Ok(Some(match body {
                    Some(body) => Value::String(body).to_string(),
                    None => Value::Null.to_string(),
                }))
            }
        }
    }
}

impl ContentLoader for LoopbackContext {
    fn load_url(&self, url: &str) -> std::result::Result<(), ExecutionError> {
        if !self.available.get() {
            return Err(ExecutionError::new("script engine unavailable"));
        }
        // A new document starts with nothing in flight.
        self.outbox.borrow_mut().clear();
        self.stash.borrow_mut().clear();
        *self.location.borrow_mut() = Some(url.to_string());
        Ok(())
    }
}
