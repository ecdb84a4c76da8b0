//! Exit code constants for the relay CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, template errors)
//! - 2: Transport failure talking to the remote service
//! - 3: Remote rate limit exhausted
//! - 4: Artifact or attachment not found
//! - 5: Local cache failure
//! - 6: Poll deadline reached while the session was still running
//! - 7: Lost contact with the session while polling
//! - 8: The remote session itself failed or expired

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or template errors.
pub const USER_ERROR: i32 = 1;

/// Network or HTTP failure talking to the remote service.
pub const TRANSPORT_FAILURE: i32 = 2;

/// Remote service kept answering 429 after local backoff.
pub const RATE_LIMITED: i32 = 3;

/// No artifact matched, or an attachment is gone.
pub const NOT_FOUND: i32 = 4;

/// Reading or writing the artifact cache failed.
pub const CACHE_FAILURE: i32 = 5;

/// The session was still running when the poll deadline passed.
pub const TIMED_OUT: i32 = 6;

/// Too many consecutive transport errors while polling.
pub const UNREACHABLE: i32 = 7;

/// The remote session ended in `failed` or `expired`.
pub const REMOTE_FAILED: i32 = 8;
