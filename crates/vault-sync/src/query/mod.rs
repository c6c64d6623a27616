//! Paginated query cache and the display session built on it.

mod cache;
mod session;

pub use cache::PageCache;
pub use session::{PageSession, QueryStatus, SessionSnapshot};
