//! Catalog store: the item feed and the selected item.
//!
//! The list and the detail view are separate resources with their own
//! status and request sequence. A completion is applied only if no newer
//! request for the same resource has begun; otherwise it is dropped and the
//! call returns [`StoreError::Superseded`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, instrument};

use itemdeck_core::{FetchStatus, Item, ItemId, ItemsPage};

use super::sequence::RequestSequence;
use super::transform::ItemTransform;
use crate::api::CatalogApi;
use crate::error::{Result, StoreError, add_breadcrumb, messages};

/// Page size before the first list fetch.
const DEFAULT_LIMIT: usize = 20;

/// Snapshot of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    /// The current feed, replaced wholesale by every successful list fetch.
    pub items: Vec<Item>,
    /// Item shown in the detail view. Need not be in `items`.
    pub selected_item: Option<Item>,
    pub list_status: FetchStatus,
    pub detail_status: FetchStatus,
    /// Last user-facing error.
    pub error: Option<String>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected_item: None,
            list_status: FetchStatus::Idle,
            detail_status: FetchStatus::Idle,
            error: None,
            total: 0,
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl CatalogState {
    /// Whether either resource is loading.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.list_status.is_loading() || self.detail_status.is_loading()
    }
}

/// Transitions of [`CatalogState`].
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    ListStarted,
    ListLoaded(ItemsPage),
    ListFailed(String),
    DetailStarted,
    DetailLoaded(Item),
    DetailFailed(String),
    ErrorCleared,
    SelectedItemSet(Option<Item>),
    ItemsCleared,
}

/// Apply `event` to `state`.
pub fn reduce(state: &mut CatalogState, event: CatalogEvent) {
    match event {
        CatalogEvent::ListStarted => {
            state.list_status = FetchStatus::Loading;
            state.error = None;
        }
        CatalogEvent::ListLoaded(page) => {
            state.items = page.items;
            state.total = page.total;
            state.skip = page.skip;
            state.limit = page.limit;
            state.list_status = FetchStatus::Succeeded;
            state.error = None;
        }
        CatalogEvent::ListFailed(message) => {
            state.list_status = FetchStatus::Failed;
            state.error = Some(message);
        }
        CatalogEvent::DetailStarted => {
            state.detail_status = FetchStatus::Loading;
            state.error = None;
        }
        CatalogEvent::DetailLoaded(item) => {
            state.selected_item = Some(item);
            state.detail_status = FetchStatus::Succeeded;
            state.error = None;
        }
        CatalogEvent::DetailFailed(message) => {
            state.detail_status = FetchStatus::Failed;
            state.error = Some(message);
        }
        CatalogEvent::ErrorCleared => state.error = None,
        CatalogEvent::SelectedItemSet(item) => state.selected_item = item,
        CatalogEvent::ItemsCleared => {
            state.items.clear();
            state.selected_item = None;
            state.error = None;
        }
    }
}

/// Catalog store over a record source `C`.
pub struct CatalogStore<C> {
    inner: Arc<CatalogStoreInner<C>>,
}

struct CatalogStoreInner<C> {
    api: C,
    transform: ItemTransform,
    state: watch::Sender<CatalogState>,
    list_seq: RequestSequence,
    detail_seq: RequestSequence,
}

impl<C> Clone for CatalogStore<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: CatalogApi> CatalogStore<C> {
    /// Create an empty store.
    #[must_use]
    pub fn new(api: C, transform: ItemTransform) -> Self {
        let state = CatalogState {
            limit: transform.limit(),
            ..CatalogState::default()
        };
        Self {
            inner: Arc::new(CatalogStoreInner {
                api,
                transform,
                state: watch::Sender::new(state),
                list_seq: RequestSequence::default(),
                detail_seq: RequestSequence::default(),
            }),
        }
    }

    /// The record source.
    #[must_use]
    pub fn api(&self) -> &C {
        &self.inner.api
    }

    // =========================================================================
    // State access
    // =========================================================================

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> CatalogState {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.inner.state.borrow().items.clone()
    }

    #[must_use]
    pub fn selected_item(&self) -> Option<Item> {
        self.inner.state.borrow().selected_item.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.inner.state.borrow().total
    }

    // =========================================================================
    // Plain reducers
    // =========================================================================

    pub fn clear_error(&self) {
        self.apply(CatalogEvent::ErrorCleared);
    }

    pub fn set_selected_item(&self, item: Option<Item>) {
        self.apply(CatalogEvent::SelectedItemSet(item));
    }

    /// Drop the feed, the selected item and the error.
    pub fn clear_items(&self) {
        self.apply(CatalogEvent::ItemsCleared);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the first page of items, replacing the current feed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Rejected` if the records could not be fetched,
    /// or `StoreError::Superseded` if a newer list fetch began first.
    #[instrument(skip(self))]
    pub async fn fetch_items(&self) -> Result<ItemsPage> {
        let ticket = self.begin(&self.inner.list_seq, CatalogEvent::ListStarted);

        match self.inner.api.list_records().await {
            Ok(records) => {
                let page = self.inner.transform.page(records);
                if !self.complete(
                    &self.inner.list_seq,
                    ticket,
                    CatalogEvent::ListLoaded(page.clone()),
                ) {
                    return Err(StoreError::Superseded);
                }
                info!(count = page.items.len(), "Items loaded");
                Ok(page)
            }
            Err(e) => {
                error!(error = %e, request_id = ?e.request_id, "Failed to fetch items");
                add_breadcrumb("catalog", "Item list fetch failed", None);
                let message = messages::FETCH_ITEMS_FAILED.to_string();
                if self.complete(
                    &self.inner.list_seq,
                    ticket,
                    CatalogEvent::ListFailed(message.clone()),
                ) {
                    Err(StoreError::Rejected(message))
                } else {
                    Err(StoreError::Superseded)
                }
            }
        }
    }

    /// Fetch one item into `selected_item`. The feed is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Rejected` if the record could not be fetched,
    /// or `StoreError::Superseded` if a newer detail fetch began first.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn fetch_item_by_id(&self, id: ItemId) -> Result<Item> {
        let ticket = self.begin(&self.inner.detail_seq, CatalogEvent::DetailStarted);

        match self.inner.api.get_record(id).await {
            Ok(record) => {
                let item = self.inner.transform.detail(record);
                if !self.complete(
                    &self.inner.detail_seq,
                    ticket,
                    CatalogEvent::DetailLoaded(item.clone()),
                ) {
                    return Err(StoreError::Superseded);
                }
                Ok(item)
            }
            Err(e) => {
                error!(error = %e, request_id = ?e.request_id, "Failed to fetch item");
                let item_id = id.to_string();
                add_breadcrumb(
                    "catalog",
                    "Item fetch failed",
                    Some(&[("item_id", item_id.as_str())]),
                );
                let message = messages::FETCH_ITEM_FAILED.to_string();
                if self.complete(
                    &self.inner.detail_seq,
                    ticket,
                    CatalogEvent::DetailFailed(message.clone()),
                ) {
                    Err(StoreError::Rejected(message))
                } else {
                    Err(StoreError::Superseded)
                }
            }
        }
    }

    fn apply(&self, event: CatalogEvent) {
        self.inner.state.send_modify(|state| reduce(state, event));
    }

    fn begin(&self, seq: &RequestSequence, event: CatalogEvent) -> u64 {
        let mut ticket = 0;
        self.inner.state.send_modify(|state| {
            ticket = seq.issue();
            reduce(state, event);
        });
        ticket
    }

    fn complete(&self, seq: &RequestSequence, ticket: u64, event: CatalogEvent) -> bool {
        self.inner.state.send_if_modified(|state| {
            if !seq.is_current(ticket) {
                return false;
            }
            reduce(state, event);
            true
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::sync::Semaphore;

    use itemdeck_core::RawRecord;

    use super::*;
    use crate::api::{ApiError, ApiErrorKind};
    use crate::config::CatalogConfig;

    fn record(id: i32) -> RawRecord {
        RawRecord {
            id: ItemId::new(id),
            title: format!("title {id}"),
            body: format!("body {id}"),
        }
    }

    /// Serves `versions[n]` on the n-th list call (last one repeats).
    /// When `gate_first` is set, the first list call and the first detail
    /// call each wait for a permit on their gate.
    struct FakeCatalog {
        versions: Vec<Vec<RawRecord>>,
        calls: AtomicUsize,
        detail_calls: AtomicUsize,
        gate_first: bool,
        gate: Semaphore,
        detail_gate: Semaphore,
        failing: AtomicBool,
    }

    impl FakeCatalog {
        fn new(versions: Vec<Vec<RawRecord>>) -> Self {
            Self {
                versions,
                calls: AtomicUsize::new(0),
                detail_calls: AtomicUsize::new(0),
                gate_first: false,
                gate: Semaphore::new(0),
                detail_gate: Semaphore::new(0),
                failing: AtomicBool::new(false),
            }
        }

        fn gated(mut self) -> Self {
            self.gate_first = true;
            self
        }

        fn check(&self) -> std::result::Result<(), ApiError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ApiError::new(ApiErrorKind::Server(500), "boom"));
            }
            Ok(())
        }
    }

    impl CatalogApi for FakeCatalog {
        async fn list_records(&self) -> std::result::Result<Vec<RawRecord>, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 && self.gate_first {
                let _permit = self.gate.acquire().await.unwrap();
            }
            self.check()?;
            let version = call.min(self.versions.len() - 1);
            Ok(self.versions.get(version).cloned().unwrap_or_default())
        }

        async fn get_record(&self, id: ItemId) -> std::result::Result<RawRecord, ApiError> {
            let call = self.detail_calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 && self.gate_first {
                let _permit = self.detail_gate.acquire().await.unwrap();
            }
            self.check()?;
            if id.as_i32() > 100 {
                return Err(ApiError::new(ApiErrorKind::Client(404), "not found"));
            }
            Ok(record(id.as_i32()))
        }
    }

    fn store(api: FakeCatalog) -> CatalogStore<FakeCatalog> {
        CatalogStore::new(api, ItemTransform::new(&CatalogConfig::default()))
    }

    #[test]
    fn test_reducer_list_failure_keeps_items() {
        let mut state = CatalogState::default();
        let transform = ItemTransform::new(&CatalogConfig::default());
        reduce(
            &mut state,
            CatalogEvent::ListLoaded(transform.page(vec![record(1)])),
        );
        reduce(&mut state, CatalogEvent::ListStarted);
        assert!(state.is_loading());
        reduce(&mut state, CatalogEvent::ListFailed("x".into()));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.list_status, FetchStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_fetch_items_replaces_wholesale() {
        let store = store(FakeCatalog::new(vec![
            (1..=30).map(record).collect(),
            (101..=103).map(record).collect(),
        ]));

        let first = store.fetch_items().await.unwrap();
        assert_eq!(first.items.len(), 20);
        assert_eq!(store.total(), 20);

        store.fetch_items().await.unwrap();
        let ids: Vec<i32> = store.items().iter().map(|i| i.id.as_i32()).collect();
        assert_eq!(ids, vec![101, 102, 103]);

        let state = store.snapshot();
        assert_eq!(state.total, 3);
        assert_eq!(state.skip, 0);
        assert_eq!(state.limit, 20);
        assert_eq!(state.list_status, FetchStatus::Succeeded);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_categories_are_reproducible() {
        let store = store(FakeCatalog::new(vec![(1..=10).map(record).collect()]));
        let a = store.fetch_items().await.unwrap();
        let b = store.fetch_items().await.unwrap();
        assert_eq!(a.items, b.items);
        assert_eq!(
            a.items.get(7).map(|i| i.category.as_str()),
            Some("Books")
        );
    }

    #[tokio::test]
    async fn test_fetch_items_failure() {
        let api = FakeCatalog::new(vec![vec![record(1)]]);
        let store = store(api);
        store.fetch_items().await.unwrap();

        store.api().failing.store(true, Ordering::SeqCst);
        let err = store.fetch_items().await.unwrap_err();

        assert_eq!(err.user_message(), Some(messages::FETCH_ITEMS_FAILED));
        assert_eq!(store.error().as_deref(), Some(messages::FETCH_ITEMS_FAILED));
        assert_eq!(store.items().len(), 1);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_fetch_item_by_id_leaves_items() {
        let store = store(FakeCatalog::new(vec![(1..=3).map(record).collect()]));
        store.fetch_items().await.unwrap();
        let before = store.items();

        let item = store.fetch_item_by_id(ItemId::new(5)).await.unwrap();
        assert_eq!(item.id, ItemId::new(5));
        assert_eq!(store.selected_item().map(|i| i.id), Some(ItemId::new(5)));
        assert_eq!(store.items(), before);
    }

    #[tokio::test]
    async fn test_fetch_item_twice_is_identical() {
        let store = store(FakeCatalog::new(vec![vec![]]));
        let a = store.fetch_item_by_id(ItemId::new(3)).await.unwrap();
        let b = store.fetch_item_by_id(ItemId::new(3)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_fetch_item_failure_keeps_selection() {
        let store = store(FakeCatalog::new(vec![vec![]]));
        store.fetch_item_by_id(ItemId::new(1)).await.unwrap();

        let err = store.fetch_item_by_id(ItemId::new(404)).await.unwrap_err();
        assert_eq!(err.user_message(), Some(messages::FETCH_ITEM_FAILED));
        assert_eq!(store.snapshot().detail_status, FetchStatus::Failed);
        assert_eq!(store.selected_item().map(|i| i.id), Some(ItemId::new(1)));
    }

    #[tokio::test]
    async fn test_stale_list_response_is_dropped() {
        let store = store(
            FakeCatalog::new(vec![
                (1..=3).map(record).collect(),
                (50..=51).map(record).collect(),
            ])
            .gated(),
        );
        let mut rx = store.subscribe();

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_items().await })
        };
        rx.wait_for(|s| s.list_status.is_loading()).await.unwrap();

        store.fetch_items().await.unwrap();
        store.api().gate.add_permits(1);

        assert_eq!(slow.await.unwrap(), Err(StoreError::Superseded));
        let ids: Vec<i32> = store.items().iter().map(|i| i.id.as_i32()).collect();
        assert_eq!(ids, vec![50, 51]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_stale_detail_response_is_dropped() {
        let store = store(FakeCatalog::new(vec![vec![]]).gated());
        let mut rx = store.subscribe();

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_item_by_id(ItemId::new(1)).await })
        };
        rx.wait_for(|s| s.detail_status.is_loading()).await.unwrap();

        let newer = store.fetch_item_by_id(ItemId::new(2)).await.unwrap();
        store.api().detail_gate.add_permits(1);

        assert_eq!(slow.await.unwrap(), Err(StoreError::Superseded));
        assert_eq!(store.selected_item(), Some(newer));
        let state = store.snapshot();
        assert_eq!(state.detail_status, FetchStatus::Succeeded);
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_plain_reducers() {
        let store = store(FakeCatalog::new(vec![(1..=2).map(record).collect()]));
        store.fetch_items().await.unwrap();
        store.fetch_item_by_id(ItemId::new(9)).await.unwrap();

        store.set_selected_item(None);
        assert!(store.selected_item().is_none());

        store.api().failing.store(true, Ordering::SeqCst);
        store.fetch_items().await.unwrap_err();
        store.clear_error();
        assert!(store.error().is_none());

        store.set_selected_item(store.items().first().cloned());
        store.clear_items();
        let state = store.snapshot();
        assert!(state.items.is_empty());
        assert!(state.selected_item.is_none());
        assert!(state.error.is_none());
    }
}
