#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use webbridge_format::{parse_script, OutboundScript, ProtocolConfig};
use webbridge_runtime::{ContentLoader, ExecutionError, ScriptExecutor};

/// Executor and loader that records everything it is asked to do.
#[derive(Default)]
pub struct RecordingContext {
    pub scripts: RefCell<Vec<String>>,
    pub loads: RefCell<Vec<String>>,
    pub fail_scripts: Cell<bool>,
    pub fail_loads: Cell<bool>,
}

impl RecordingContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn last_script(&self) -> OutboundScript {
        let scripts = self.scripts.borrow();
        let script = scripts.last().expect("no script executed");
        parse_script(&ProtocolConfig::default(), script).expect("script should parse")
    }

    pub fn last_request_id(&self) -> String {
        match self.last_script() {
            OutboundScript::Call { request_id, .. } => request_id,
            other => panic!("expected call script, got {:?}", other),
        }
    }
}

impl ScriptExecutor for RecordingContext {
    fn execute(&self, script: &str) -> Result<Option<String>, ExecutionError> {
        if self.fail_scripts.get() {
            return Err(ExecutionError::new("engine unavailable"));
        }
        self.scripts.borrow_mut().push(script.to_string());
        Ok(None)
    }
}

impl ContentLoader for RecordingContext {
    fn load_url(&self, url: &str) -> Result<(), ExecutionError> {
        if self.fail_loads.get() {
            return Err(ExecutionError::new("navigation refused"));
        }
        self.loads.borrow_mut().push(url.to_string());
        Ok(())
    }
}

/// Shared log that handlers append to.
pub fn event_log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}
