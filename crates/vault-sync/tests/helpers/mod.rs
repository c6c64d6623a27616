#![allow(dead_code)]

pub mod fixtures;
pub mod transport;

use std::sync::{Arc, Mutex};

pub use fixtures::{catalog, entry, image};
pub use transport::FakeTransport;

/// Shared call log for hook assertions
pub type Recorder<T> = Arc<Mutex<Vec<T>>>;

pub fn recorder<T>() -> Recorder<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Let spawned tasks and joined futures run until they block.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
