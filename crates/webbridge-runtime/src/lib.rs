//! # webbridge-runtime
//!
//! Bridge instances for talking to an embedded script context.
//!
//! This crate provides:
//! - [`Bridge`]: `emit`, `call_remote_function`, `on`/`off`, `destroy`
//! - Request/response correlation for remote function calls
//! - Per-event handler lists with early-stop dispatch
//! - [`InstanceDirectory`]: routes inbound messages back to their bridge
//! - The [`ScriptExecutor`] and [`ContentLoader`] capabilities a platform supplies
//!
//! Everything runs on one thread. Adapters must deliver inbound messages on
//! the thread that owns the bridges.
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use webbridge_runtime::{Bridge, ExecutionError, InboundMessage, InstanceDirectory};
//!
//! let directory = InstanceDirectory::new();
//! let executor = Rc::new(|_script: &str| -> Result<Option<String>, ExecutionError> { Ok(None) });
//! let bridge = Bridge::attach(&directory, executor).unwrap();
//!
//! bridge.on("ping", |data| println!("ping: {}", data)).unwrap();
//! directory.deliver(InboundMessage::new(bridge.id(), "ping", r#"{"n":1}"#));
//!
//! let request_id = bridge
//!     .call_remote_function("sum", serde_json::json!([2, 3]), |v| println!("sum = {}", v), |_| {})
//!     .unwrap();
//! assert!(request_id.starts_with(&format!("{}_", bridge.id())));
//!
//! bridge.destroy();
//! assert!(!directory.contains(bridge.id()));
//! ```

mod bridge;
mod directory;
mod error;
mod executor;
mod registry;
mod router;

pub use bridge::{Bridge, BridgeBuilder, BridgeState, RemoteCall};
pub use directory::{InboundMessage, InstanceDirectory, InstanceId};
pub use error::{BridgeError, CallError, ExecutionError, Result};
pub use executor::{ContentLoader, ScriptExecutor};
pub use registry::{CorrelationRegistry, PendingCall};
pub use router::{EventHandler, EventRouter, ListenerId, Propagation, Route};

// Re-export the wire types callers need alongside the runtime
pub use webbridge_format::{CallArgs, ProtocolConfig, RawPayload, ResponseEnvelope};
