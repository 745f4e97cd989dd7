//! RT-safe garbage collection for user sample buffers
//!
//! A global `basedrop` collector defers deallocation of sample buffers handed
//! to the audio thread. When the last `Shared<UserSample>` is dropped there
//! (a snapshot is replaced, or the staged sample is cleared), the pointer is
//! only enqueued; the memory is freed on the `sample-gc` thread.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc::gc_handle;
//!
//! let sample = Shared::new(&gc_handle(), user_sample);
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Global handle for creating `Shared<T>` allocations
static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// How often the collector thread frees deferred drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn the collector thread and return a handle to it
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("sample-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("Failed to send GC handle");

            log::info!("Sample GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn sample GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Get a handle for creating `Shared<T>` allocations
///
/// The collector thread is started on first use.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Shared;

    #[test]
    fn test_shared_clone_and_drop() {
        let a = Shared::new(&gc_handle(), vec![0.5f32; 1024]);
        let b = a.clone();
        assert_eq!(b.len(), 1024);
        drop(a);
        assert_eq!(b[1023], 0.5);
        drop(b);
    }
}
