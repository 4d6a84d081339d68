use crate::registry::CorrelationRegistry;
use crate::router::{EventRouter, ListenerId, Propagation, Route};
use crate::{
    BridgeError, CallError, ContentLoader, InstanceDirectory, InstanceId, Result, ScriptExecutor,
};
use futures::channel::oneshot;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use webbridge_format::{
    call_script, event_script, CallArgs, ProtocolConfig, RawPayload, ResponseEnvelope,
};

/// Lifecycle of a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Attached, but the adapter has not signalled readiness; outbound
    /// scripts are queued.
    AwaitingReady,
    /// Every operation is live.
    Active,
    /// Terminal. Nothing is dispatched and nothing is sent.
    Destroyed,
}

struct QueuedScript {
    script: String,
    request_id: Option<String>,
}

pub(crate) struct BridgeInner {
    id: InstanceId,
    config: ProtocolConfig,
    executor: Rc<dyn ScriptExecutor>,
    loader: Option<Rc<dyn ContentLoader>>,
    directory: InstanceDirectory,
    state: Cell<BridgeState>,
    initial_url: RefCell<Option<String>>,
    router: RefCell<EventRouter>,
    registry: RefCell<CorrelationRegistry>,
    queue: RefCell<VecDeque<QueuedScript>>,
    flushing: Cell<bool>,
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        if self.state.get() != BridgeState::Destroyed {
            self.directory.unregister(self.id);
        }
    }
}

/// Builder for attaching a [`Bridge`] to an embedded context.
pub struct BridgeBuilder {
    executor: Rc<dyn ScriptExecutor>,
    loader: Option<Rc<dyn ContentLoader>>,
    config: ProtocolConfig,
    initial_url: Option<String>,
    require_ready: bool,
}

impl BridgeBuilder {
    /// Start a builder around the platform's executor.
    pub fn new(executor: Rc<dyn ScriptExecutor>) -> Self {
        Self {
            executor,
            loader: None,
            config: ProtocolConfig::default(),
            initial_url: None,
            require_ready: false,
        }
    }

    /// Set the loader used for the initial navigation and for unloading on destroy.
    pub fn with_loader(mut self, loader: Rc<dyn ContentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the protocol identifiers.
    pub fn with_config(mut self, config: ProtocolConfig) -> Self {
        self.config = config;
        self
    }

    /// Load `url` once the bridge is ready.
    pub fn with_initial_url(mut self, url: impl Into<String>) -> Self {
        self.initial_url = Some(url.into());
        self
    }

    /// Queue outbound scripts until [`Bridge::mark_ready`] is called.
    pub fn awaiting_ready(mut self) -> Self {
        self.require_ready = true;
        self
    }

    /// Create the bridge and register it in `directory`.
    ///
    /// Without [`awaiting_ready`](Self::awaiting_ready) the bridge is active
    /// immediately and the initial URL, if any, is loaded now. An initial
    /// URL without a loader is rejected.
    pub fn attach(self, directory: &InstanceDirectory) -> Result<Bridge> {
        if let (Some(url), None) = (&self.initial_url, &self.loader) {
            return Err(BridgeError::MissingLoader(url.clone()));
        }

        let id = InstanceId::allocate();
        let inner = Rc::new(BridgeInner {
            id,
            router: RefCell::new(EventRouter::new(&self.config)),
            registry: RefCell::new(CorrelationRegistry::new(id)),
            config: self.config,
            executor: self.executor,
            loader: self.loader,
            directory: directory.clone(),
            state: Cell::new(BridgeState::AwaitingReady),
            initial_url: RefCell::new(self.initial_url),
            queue: RefCell::new(VecDeque::new()),
            flushing: Cell::new(false),
        });
        directory.register(id, Rc::downgrade(&inner));
        log::debug!("bridge {} attached", id);

        let bridge = Bridge { inner };
        if !self.require_ready {
            bridge.mark_ready()?;
        }
        Ok(bridge)
    }
}

/// Messaging endpoint for one embedded script context.
///
/// Cloning yields another handle to the same instance. All handles must
/// stay on the thread that delivers inbound messages.
#[derive(Clone)]
pub struct Bridge {
    inner: Rc<BridgeInner>,
}

impl Bridge {
    /// Attach a bridge with default options.
    pub fn attach(
        directory: &InstanceDirectory,
        executor: Rc<dyn ScriptExecutor>,
    ) -> Result<Self> {
        BridgeBuilder::new(executor).attach(directory)
    }

    /// Start configuring a bridge.
    pub fn builder(executor: Rc<dyn ScriptExecutor>) -> BridgeBuilder {
        BridgeBuilder::new(executor)
    }

    pub(crate) fn from_inner(inner: Rc<BridgeInner>) -> Self {
        Self { inner }
    }

    /// This instance's process-unique id.
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.inner.state.get()
    }

    /// Protocol identifiers in use.
    pub fn config(&self) -> &ProtocolConfig {
        &self.inner.config
    }

    /// Number of remote calls awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Number of handlers registered for `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.inner.router.borrow().listener_count(event_name)
    }

    /// Number of outbound scripts waiting for readiness.
    pub fn queued_scripts(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Signal that the adapter can now run scripts.
    ///
    /// Loads the initial URL, then flushes queued scripts in order. If the
    /// initial load fails the bridge stays in
    /// [`BridgeState::AwaitingReady`] and the call may be retried.
    pub fn mark_ready(&self) -> Result<()> {
        match self.state() {
            BridgeState::Destroyed => return Err(BridgeError::Destroyed(self.id())),
            BridgeState::Active => return Ok(()),
            BridgeState::AwaitingReady => {}
        }

        // Taken up front: a loader may report the load synchronously and re-enter.
        let initial_url = self.inner.initial_url.borrow_mut().take();
        if let (Some(url), Some(loader)) = (initial_url, &self.inner.loader) {
            if let Err(err) = loader.load_url(&url) {
                *self.inner.initial_url.borrow_mut() = Some(url);
                return Err(err.into());
            }
        }

        self.inner.state.set(BridgeState::Active);
        log::debug!("bridge {} ready", self.id());

        // Scripts issued while flushing go behind the ones already queued.
        self.inner.flushing.set(true);
        loop {
            // Scripts may run handlers that queue more work; never hold the borrow.
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(queued) = next else { break };
            if self.state() == BridgeState::Destroyed {
                break;
            }
            if let Err(err) = self.inner.executor.execute(&queued.script) {
                log::warn!("bridge {}: queued script failed: {}", self.id(), err);
                if let Some(request_id) = queued.request_id {
                    self.inner.registry.borrow_mut().discard(&request_id);
                }
            }
        }
        self.inner.flushing.set(false);
        Ok(())
    }

    /// Send `(event_name, data)` to the embedded context. Fire-and-forget.
    pub fn emit<T: Serialize + ?Sized>(&self, event_name: &str, data: &T) -> Result<()> {
        self.ensure_live()?;
        self.inner.router.borrow().check_event_name(event_name)?;

        let script = event_script(&self.inner.config, event_name, data);
        log::debug!("bridge {}: emit {:?}", self.id(), event_name);
        self.run(script, None)
    }

    /// Invoke `function` in the embedded context.
    ///
    /// Returns the request id once the script has been handed to the
    /// executor. Exactly one of the handlers runs later when the reply
    /// arrives; neither runs if the bridge is destroyed first. If injection
    /// fails the entry is discarded and the error is returned here instead.
    pub fn call_remote_function<S, E>(
        &self,
        function: &str,
        args: impl Into<CallArgs>,
        on_success: S,
        on_error: E,
    ) -> Result<String>
    where
        S: FnOnce(Value) + 'static,
        E: FnOnce(Value) + 'static,
    {
        self.ensure_live()?;

        let args = args.into();
        let request_id = self
            .inner
            .registry
            .borrow_mut()
            .register(on_success, on_error);
        let script = call_script(&self.inner.config, &request_id, function, &args);
        log::debug!("bridge {}: call {} as {}", self.id(), function, request_id);

        self.run(script, Some(request_id.clone()))?;
        Ok(request_id)
    }

    /// Invoke `function` and await its reply.
    ///
    /// There is no timeout; wrap the future if one is needed. A reply that
    /// lands after the future is dropped is discarded.
    pub fn call(&self, function: &str, args: impl Into<CallArgs>) -> RemoteCall {
        let (tx, rx) = oneshot::channel();
        let tx = Rc::new(RefCell::new(Some(tx)));
        let on_error_tx = tx.clone();

        let issued = self.call_remote_function(
            function,
            args,
            move |value| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(Ok(value));
                }
            },
            move |value| {
                if let Some(tx) = on_error_tx.borrow_mut().take() {
                    let _ = tx.send(Err(CallError::Remote(value)));
                }
            },
        );

        match issued {
            Ok(request_id) => RemoteCall {
                request_id: Some(request_id),
                state: RemoteCallState::Waiting(rx),
            },
            Err(err) => RemoteCall {
                request_id: None,
                state: RemoteCallState::Failed(Some(err)),
            },
        }
    }

    /// Register `handler` for `event_name`.
    ///
    /// The handler may return `()`, a `bool` (`false` stops dispatch to
    /// later handlers) or a [`Propagation`].
    pub fn on<F, R>(&self, event_name: &str, handler: F) -> Result<ListenerId>
    where
        F: Fn(&Value) -> R + 'static,
        R: Into<Propagation>,
    {
        self.ensure_live()?;
        self.inner.router.borrow_mut().register(event_name, handler)
    }

    /// Remove one handler, or every handler for `event_name` when `listener` is `None`.
    pub fn off(&self, event_name: &str, listener: Option<ListenerId>) -> Result<()> {
        self.ensure_live()?;
        let removed = self
            .inner
            .router
            .borrow_mut()
            .unregister(event_name, listener)?;
        log::debug!(
            "bridge {}: removed {} handler(s) for {:?}",
            self.id(),
            removed,
            event_name
        );
        Ok(())
    }

    /// Deliver an inbound message to this instance.
    ///
    /// The reserved response event resolves a pending call; any other event
    /// goes to its handlers in registration order. Unknown events and
    /// unknown request ids are dropped.
    pub fn dispatch(&self, event_name: &str, payload: impl Into<RawPayload>) {
        if self.state() == BridgeState::Destroyed {
            log::debug!("bridge {}: destroyed, dropping {:?}", self.id(), event_name);
            return;
        }

        let data = payload.into().decode();
        let route = self.inner.router.borrow().route(event_name);
        match route {
            Route::Response => self.resolve_response(data),
            Route::Listeners(handlers) if handlers.is_empty() => {
                log::debug!("bridge {}: no handler for {:?}", self.id(), event_name);
            }
            Route::Listeners(handlers) => {
                for handler in handlers {
                    if self.state() == BridgeState::Destroyed {
                        break;
                    }
                    if handler(&data) == Propagation::Stop {
                        break;
                    }
                }
            }
        }
    }

    /// Tear the instance down. Idempotent.
    ///
    /// Removes the directory entry, drops every handler and pending call
    /// without invoking them, and unloads the embedded content so a stale
    /// context cannot reattach to the native channel.
    pub fn destroy(&self) {
        if self.state() == BridgeState::Destroyed {
            return;
        }
        self.inner.state.set(BridgeState::Destroyed);
        self.inner.directory.unregister(self.id());

        self.inner.router.borrow_mut().clear();
        let abandoned = self.inner.registry.borrow_mut().discard_all();
        self.inner.queue.borrow_mut().clear();
        self.inner.initial_url.borrow_mut().take();

        if let Some(loader) = &self.inner.loader {
            if let Err(err) = loader.load_url(&self.inner.config.blank_url) {
                log::warn!("bridge {}: failed to unload content: {}", self.id(), err);
            }
        }
        log::debug!(
            "bridge {} destroyed, {} pending call(s) abandoned",
            self.id(),
            abandoned
        );
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state() == BridgeState::Destroyed {
            return Err(BridgeError::Destroyed(self.id()));
        }
        Ok(())
    }

    fn run(&self, script: String, request_id: Option<String>) -> Result<()> {
        if self.state() == BridgeState::AwaitingReady || self.inner.flushing.get() {
            self.inner
                .queue
                .borrow_mut()
                .push_back(QueuedScript { script, request_id });
            return Ok(());
        }

        log::trace!("bridge {}: execute {}", self.id(), script);
        // The completion value is ignored; call replies arrive as inbound events.
        match self.inner.executor.execute(&script) {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(request_id) = request_id {
                    self.inner.registry.borrow_mut().discard(&request_id);
                }
                Err(err.into())
            }
        }
    }

    fn resolve_response(&self, data: Value) {
        let envelope = match ResponseEnvelope::from_value(data) {
            Ok(envelope) => envelope,
            Err(err) => {
                log::warn!("bridge {}: dropping response: {}", self.id(), err);
                return;
            }
        };

        let request_id = envelope.req_id.clone();
        if CorrelationRegistry::resolve(&self.inner.registry, envelope) {
            log::debug!("bridge {}: resolved {}", self.id(), request_id);
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("pending_calls", &self.pending_calls())
            .finish()
    }
}

enum RemoteCallState {
    Waiting(oneshot::Receiver<std::result::Result<Value, CallError>>),
    Failed(Option<BridgeError>),
}

/// Future returned by [`Bridge::call`].
pub struct RemoteCall {
    request_id: Option<String>,
    state: RemoteCallState,
}

impl RemoteCall {
    /// Request id of the issued call, or `None` if it could not be issued.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl Future for RemoteCall {
    type Output = std::result::Result<Value, CallError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            RemoteCallState::Failed(err) => match err.take() {
                Some(err) => Poll::Ready(Err(CallError::Bridge(err))),
                None => panic!("RemoteCall polled after completion"),
            },
            RemoteCallState::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(CallError::Abandoned)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}
