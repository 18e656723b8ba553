//! Domain values for the distributed single-flight protocol.

#![forbid(unsafe_code)]

mod identity;
mod keys;

pub use identity::{EXECUTION_ID_ENCODED_LEN, ExecutionId};
pub use keys::{DEFAULT_NAMESPACE, KEY_SCHEME_PREFIX, LockKey, Namespace, ResultKey};
