use std::sync::{Arc, Mutex};

use vault_core::{AppResult, ErrorMetadata, PageKey, PageResult, SortDirection};

use super::cache::PageCache;
use crate::lock;

/// Fetch state of a [`PageSession`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Fetching with nothing to show
    Loading,
    Ready,
    /// Fetching while an older page stays on display
    Revalidating,
    /// The last fetch failed; any previously shown page is kept
    Error { message: String },
}

impl QueryStatus {
    /// Data is on display. After an `Error`, check [`SessionSnapshot::page`].
    pub fn has_data(&self) -> bool {
        matches!(self, QueryStatus::Ready | QueryStatus::Revalidating)
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, QueryStatus::Loading | QueryStatus::Revalidating)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    key: PageKey,
    displayed: Option<(PageKey, Arc<PageResult>)>,
    status: QueryStatus,
    /// Only the most recent load may write its result
    latest_load: u64,
}

/// What a gallery view renders
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Key the session is currently asking for
    pub key: PageKey,
    /// Page on display; may belong to an earlier key while a fetch is running
    pub page: Option<Arc<PageResult>>,
    pub status: QueryStatus,
    /// The displayed page is not a fresh result for `key`
    pub is_stale: bool,
}

/// One gallery view over a shared [`PageCache`].
///
/// Navigation methods only move the key; call [`PageSession::load`] to fetch it.
#[derive(Debug, Clone)]
pub struct PageSession {
    cache: PageCache,
    state: Arc<Mutex<SessionState>>,
}

impl PageSession {
    pub fn new(cache: PageCache, initial: PageKey) -> Self {
        Self {
            cache,
            state: Arc::new(Mutex::new(SessionState {
                key: initial,
                ..SessionState::default()
            })),
        }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn key(&self) -> PageKey {
        lock(&self.state).key.clone()
    }

    /// Page on display, if any
    pub fn current_page(&self) -> Option<Arc<PageResult>> {
        lock(&self.state)
            .displayed
            .as_ref()
            .map(|(_, page)| Arc::clone(page))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = lock(&self.state);
        let is_stale = match &state.displayed {
            Some((shown, _)) => *shown != state.key || !self.cache.is_fresh(&state.key),
            None => false,
        };
        SessionSnapshot {
            key: state.key.clone(),
            page: state.displayed.as_ref().map(|(_, page)| Arc::clone(page)),
            status: state.status.clone(),
            is_stale,
        }
    }

    /// Fetch the current key through the cache and put it on display.
    ///
    /// A stale cached copy of the key is shown immediately while the fetch
    /// runs. The result is dropped if the key moved or a newer load started
    /// in the meantime.
    pub async fn load(&self) -> AppResult<Arc<PageResult>> {
        let (key, load_id) = {
            let mut state = lock(&self.state);
            state.latest_load += 1;
            if let Some(stale) = self.cache.peek(&state.key) {
                state.displayed = Some((state.key.clone(), stale));
            }
            state.status = if state.displayed.is_some() {
                QueryStatus::Revalidating
            } else {
                QueryStatus::Loading
            };
            (state.key.clone(), state.latest_load)
        };

        let result = self.cache.fetch_page(&key).await;

        let mut state = lock(&self.state);
        let latest = state.latest_load == load_id;
        let current = latest && state.key == key;
        match &result {
            Ok(page) if current => {
                state.displayed = Some((key, Arc::clone(page)));
                state.status = QueryStatus::Ready;
            }
            Err(err) if current => {
                tracing::warn!(page = %key, error = %err, "Keeping previous page after failed load");
                state.status = QueryStatus::Error {
                    message: err.client_message(),
                };
            }
            _ => {
                tracing::debug!(page = %key, "Discarding result for superseded load");
                // Key moved with no newer load running
                if latest {
                    state.status = if state.displayed.is_some() {
                        QueryStatus::Ready
                    } else {
                        QueryStatus::Idle
                    };
                }
            }
        }
        result
    }

    /// Move to `target` if the last known result has such a page.
    pub fn change_page(&self, target: u32) -> bool {
        let mut state = lock(&self.state);
        let in_range = state
            .displayed
            .as_ref()
            .is_some_and(|(_, page)| page.contains_page(target));
        if !in_range {
            tracing::debug!(target, "Ignoring page change outside known range");
            return false;
        }
        state.key.page_number = target;
        true
    }

    pub fn next_page(&self) -> bool {
        let target = lock(&self.state).key.page_number.saturating_add(1);
        self.change_page(target)
    }

    pub fn previous_page(&self) -> bool {
        let current = lock(&self.state).key.page_number;
        match current.checked_sub(1) {
            Some(target) => self.change_page(target),
            None => false,
        }
    }

    /// New sort order, back on the first page.
    pub fn set_sort(&self, sort_by: impl Into<String>, direction: SortDirection) {
        let mut state = lock(&self.state);
        state.key.sort_by = sort_by.into();
        state.key.sort_direction = direction;
        state.key.page_number = 0;
    }

    /// New page size, back on the first page. Zero is refused.
    pub fn set_page_size(&self, page_size: u32) -> bool {
        if page_size == 0 {
            return false;
        }
        let mut state = lock(&self.state);
        state.key.page_size = page_size;
        state.key.page_number = 0;
        true
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}
