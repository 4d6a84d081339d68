use crate::InstanceId;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use webbridge_format::ResponseEnvelope;

type ResponseHandler = Box<dyn FnOnce(Value)>;

/// Handlers waiting for the reply to one remote call.
pub struct PendingCall {
    on_success: ResponseHandler,
    on_error: ResponseHandler,
}

impl PendingCall {
    /// Invoke the handler matching the outcome, consuming the entry.
    pub fn complete(self, is_error: bool, response: Value) {
        if is_error {
            (self.on_error)(response)
        } else {
            (self.on_success)(response)
        }
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall").finish_non_exhaustive()
    }
}

/// Pending remote calls of one bridge instance, keyed by request id.
///
/// Request ids are `"<instanceId>_<seq>"`; the instance prefix keeps them
/// unique across every bridge in the process.
#[derive(Debug)]
pub struct CorrelationRegistry {
    instance_id: InstanceId,
    next_seq: u64,
    pending: HashMap<String, PendingCall>,
}

impl CorrelationRegistry {
    /// Create an empty registry for `instance_id`.
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            next_seq: 1,
            pending: HashMap::new(),
        }
    }

    /// Store both handlers under a fresh request id.
    pub fn register<S, E>(&mut self, on_success: S, on_error: E) -> String
    where
        S: FnOnce(Value) + 'static,
        E: FnOnce(Value) + 'static,
    {
        let request_id = format!("{}_{}", self.instance_id, self.next_seq);
        self.next_seq += 1;
        self.pending.insert(
            request_id.clone(),
            PendingCall {
                on_success: Box::new(on_success),
                on_error: Box::new(on_error),
            },
        );
        request_id
    }

    /// Remove and return the entry for `request_id`.
    ///
    /// A second take for the same id returns `None`, which is what makes
    /// duplicate deliveries harmless.
    pub fn take(&mut self, request_id: &str) -> Option<PendingCall> {
        self.pending.remove(request_id)
    }

    /// Resolve the entry named by `envelope`, if it is still pending.
    ///
    /// The borrow on `registry` is released before the handler runs, so a
    /// handler may issue new calls through the same registry. Returns
    /// whether a handler ran. Unknown ids are dropped silently.
    pub fn resolve(registry: &RefCell<Self>, envelope: ResponseEnvelope) -> bool {
        let pending = registry.borrow_mut().take(&envelope.req_id);
        match pending {
            Some(call) => {
                call.complete(envelope.is_error, envelope.response);
                true
            }
            None => {
                log::debug!("dropping response for unknown request {}", envelope.req_id);
                false
            }
        }
    }

    /// Forget one entry without invoking either handler.
    pub fn discard(&mut self, request_id: &str) -> bool {
        self.pending.remove(request_id).is_some()
    }

    /// Forget every entry without invoking any handler.
    pub fn discard_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Whether `request_id` is still awaiting a reply.
    pub fn contains(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Number of calls awaiting a reply.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no call is awaiting a reply.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> Box<dyn FnOnce(Value)>)
    {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &'static str| -> Box<dyn FnOnce(Value)> {
            let sink = sink.clone();
            Box::new(move |value: Value| sink.borrow_mut().push(format!("{}:{}", tag, value)))
        };
        (log, make)
    }

    #[test]
    fn request_ids_are_prefixed_and_sequential() {
        let mut registry = CorrelationRegistry::new(InstanceId::from_raw(42));
        let first = registry.register(|_| {}, |_| {});
        let second = registry.register(|_| {}, |_| {});

        assert_eq!(first, "42_1");
        assert_eq!(second, "42_2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn resolve_runs_matching_handler_once() {
        let (log, make) = recorder();
        let registry = RefCell::new(CorrelationRegistry::new(InstanceId::from_raw(1)));
        let id = registry.borrow_mut().register(make("ok"), make("err"));

        let failed = ResponseEnvelope::failure(id.clone(), json!("boom"));
        assert!(CorrelationRegistry::resolve(&registry, failed));
        let duplicate = ResponseEnvelope::success(id, json!(1));
        assert!(!CorrelationRegistry::resolve(&registry, duplicate));

        assert_eq!(*log.borrow(), vec!["err:\"boom\"".to_string()]);
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn handler_can_register_follow_up_call() {
        let registry = Rc::new(RefCell::new(CorrelationRegistry::new(InstanceId::from_raw(3))));
        let follow_up = Rc::new(RefCell::new(None));

        let inner = registry.clone();
        let slot = follow_up.clone();
        let id = registry.borrow_mut().register(
            move |_| *slot.borrow_mut() = Some(inner.borrow_mut().register(|_| {}, |_| {})),
            |_| {},
        );

        assert!(CorrelationRegistry::resolve(
            &registry,
            ResponseEnvelope::success(id, json!(null))
        ));
        assert_eq!(*follow_up.borrow(), Some("3_2".to_string()));
        assert_eq!(registry.borrow().len(), 1);
    }

    #[test]
    fn discard_all_invokes_nothing() {
        let (log, make) = recorder();
        let mut registry = CorrelationRegistry::new(InstanceId::from_raw(1));
        registry.register(make("ok"), make("err"));
        registry.register(make("ok"), make("err"));

        assert_eq!(registry.discard_all(), 2);
        assert!(log.borrow().is_empty());
    }
}
