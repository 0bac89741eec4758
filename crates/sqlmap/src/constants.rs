/// Global runtime and default values for sqlmap
///
/// The execution core is synchronous; every LibSQL future is driven to completion on
/// this shared runtime through `block_on`.
use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

/// Global Tokio runtime for LibSQL operations
///
/// IMPORTANT: This panics if Tokio runtime creation fails, which can only happen in
/// extremely rare circumstances (e.g., system has no available threads).
pub static TOKIO_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Runtime::new()
        .expect("Failed to initialize Tokio runtime - check system resources and thread limits")
});

/// Default timeout for establishing a connection (in seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default capacity of a bounded result cache
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Value returned by a mutation queued on a batch executor, before the batch runs
pub const BATCH_UPDATE_RETURN_VALUE: i32 = i32::MIN + 1002;

/// Positional fallback prefix for parameters without a declared name (`arg0`, `arg1`, ...)
pub const POSITIONAL_PARAM_PREFIX: &str = "arg";

/// Generic parameter name prefix published for every value (`param1`, `param2`, ...)
pub const GENERIC_PARAM_PREFIX: &str = "param";
