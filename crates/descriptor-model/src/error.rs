use thiserror::Error;

/// Every way the online descriptor-generation subsystem can fail.
///
/// Fallible entry points return `Result<bool, DescriptorError>` rather than a
/// bare `bool`: a handled, expected failure (a hook returning `false`, a
/// safety-validation failure, a dispatch failure) is `Ok(false)` with the
/// reason logged at the call site, while conditions that prevent the call
/// from even running are `Err`.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("configuration rejected: {0}")]
    Configuration(String),

    #[error("hook failed: {0}")]
    Hook(String),

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("descriptor validation failed: {0}")]
    Validation(String),

    #[error("worker crashed: {0}")]
    WorkerCrash(String),

    #[error("teardown interrupted")]
    TeardownInterrupt,
}
