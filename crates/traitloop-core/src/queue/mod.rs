//! Queue module: keyed work queue and retry backoff.
//!
//! WorkQueue は同じキーを同時に 2 つの worker に渡さない。
//! これが「同一 Trait に対する pass は直列」という前提を支えます。

mod retry;
mod work;

pub use retry::RetryPolicy;
pub use work::WorkQueue;
