//! Request execution: one composed projection per top-level field, evaluated
//! against the host context. Queries are single-threaded over one call path;
//! mutations run sequentially in document order.

mod coordinator;

pub use tokio_util::sync::CancellationToken;
