pub mod identity;
pub mod keyed_lock;
pub mod retry;

pub use identity::{ContentIdentity, IdentityGenerator};
pub use keyed_lock::KeyedLock;
pub use retry::{RetryPolicy, with_retry};
