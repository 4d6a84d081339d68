//! # webbridge-adapter
//!
//! Platform adapter contract for webbridge.
//!
//! A platform supplies two things to the core: a
//! [`ScriptExecutor`](webbridge_runtime::ScriptExecutor) and a way to turn
//! the signals the embedded context raises into inbound messages. This
//! crate provides the second half in both shapes platforms use:
//!
//! - [`PushChannel`]: the embedded context calls a registered native function
//! - [`PullChannel`]: the embedded context requests a pseudo-URL and the
//!   payload is pulled back with a second script
//!
//! plus [`ReadinessGate`] for platforms that cannot register their channel
//! until the first document has loaded, and [`LoopbackContext`], an
//! in-process embedded context for tests and demos.
//!
//! ## Example
//!
//! ```
//! use webbridge_adapter::{LoopbackContext, PushChannel};
//! use webbridge_runtime::{Bridge, InstanceDirectory, ProtocolConfig};
//!
//! let directory = InstanceDirectory::new();
//! let context = LoopbackContext::new(ProtocolConfig::default());
//! context.define_function("sum", |args| {
//!     Ok(args.iter().filter_map(|v| v.as_i64()).sum::<i64>().into())
//! });
//!
//! let bridge = Bridge::attach(&directory, context.clone()).unwrap();
//! context.bind(bridge.id());
//! let channel = PushChannel::new(directory.clone());
//!
//! bridge
//!     .call_remote_function("sum", serde_json::json!([2, 3]), |v| assert_eq!(v, 5), |_| {})
//!     .unwrap();
//! assert_eq!(context.pump_push(&channel).unwrap(), 1);
//! ```

mod error;
mod loopback;
mod pull;
mod push;
mod ready;

pub use error::{AdapterError, Result};
pub use loopback::LoopbackContext;
pub use pull::{Interception, PullChannel, SignalUrl};
pub use push::PushChannel;
pub use ready::ReadinessGate;
