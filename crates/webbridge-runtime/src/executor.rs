use crate::ExecutionError;

/// Runs a script inside the embedded context.
///
/// Each platform supplies one implementation. The returned string is the
/// script's completion value when the platform exposes one.
pub trait ScriptExecutor {
    /// Execute `script` and return its result, if any.
    fn execute(&self, script: &str) -> Result<Option<String>, ExecutionError>;
}

impl<F> ScriptExecutor for F
where
    F: Fn(&str) -> Result<Option<String>, ExecutionError>,
{
    fn execute(&self, script: &str) -> Result<Option<String>, ExecutionError> {
        self(script)
    }
}

/// Navigates the embedded context to new content.
pub trait ContentLoader {
    /// Replace the current document with `url`.
    fn load_url(&self, url: &str) -> Result<(), ExecutionError>;
}
