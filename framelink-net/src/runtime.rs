//! Worker pool construction.
//!
//! All socket operations complete on this runtime's worker threads. Each
//! connection and datagram endpoint serializes its own state by owning it
//! inside dedicated tasks fed by channels, so no locks guard per-connection
//! state.

use std::io;
use tokio::runtime::Runtime;

/// Builds a multi-threaded runtime with the configured worker count.
///
/// `thread_count == 0` leaves the worker count at the runtime default
/// (hardware concurrency).
pub fn build(thread_count: usize) -> io::Result<Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if thread_count > 0 {
        builder.worker_threads(thread_count);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_single_worker() {
        let runtime = build(1).unwrap();
        let value = runtime.block_on(async { 41 + 1 });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_build_default_workers() {
        let runtime = build(0).unwrap();
        let value = runtime.block_on(async { "ok" });
        assert_eq!(value, "ok");
    }
}
