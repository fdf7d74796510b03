use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Terminal for the engine instance; later loads fail without prompting.
    #[error("Photo library access denied")]
    AuthorizationDenied,
    #[error("Photo library access still pending after {0} prompts")]
    AuthorizationPending(u32),
    #[error("Engine has not completed its initial load")]
    NotLoaded,
    #[error("Engine task has stopped")]
    Stopped,
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}
