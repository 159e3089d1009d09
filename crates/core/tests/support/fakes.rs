//! In-memory port implementations

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use overtrakt_core::{ListItemsApi, Notifier, SyncLedger};
use overtrakt_domain::{
    ListItemsRequest, ListItemsResponse, MediaKind, OvertraktError, Result as DomainResult,
    SyncRequest,
};
use parking_lot::Mutex;

type LedgerKey = (MediaKind, String, String, String);

fn key(request: &SyncRequest) -> LedgerKey {
    (
        request.request_type,
        request.imdb_id.clone(),
        request.tmdb_id.clone(),
        request.tvdb_id.clone(),
    )
}

/// Ledger keyed like the SQLite table, with the same monotonic `added` rule.
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<HashMap<LedgerKey, SyncRequest>>,
    fail_writes: Mutex<bool>,
    fail_reads: Mutex<bool>,
}

impl MemoryLedger {
    pub fn seeded(rows: impl IntoIterator<Item = SyncRequest>) -> Self {
        let ledger = Self::default();
        for row in rows {
            ledger.rows.lock().insert(key(&row), row);
        }
        ledger
    }

    pub fn failing_writes() -> Self {
        let ledger = Self::default();
        *ledger.fail_writes.lock() = true;
        ledger
    }

    pub fn failing_reads() -> Self {
        let ledger = Self::default();
        *ledger.fail_reads.lock() = true;
        ledger
    }

    pub fn rows(&self) -> Vec<SyncRequest> {
        self.rows.lock().values().cloned().collect()
    }
}

#[async_trait]
impl SyncLedger for MemoryLedger {
    async fn upsert(&self, request: &SyncRequest) -> DomainResult<()> {
        if *self.fail_writes.lock() {
            return Err(OvertraktError::Ledger("ledger offline".into()));
        }
        let mut rows = self.rows.lock();
        rows.entry(key(request))
            .and_modify(|row| row.added |= request.added)
            .or_insert_with(|| request.clone());
        Ok(())
    }

    async fn list_pending(&self) -> DomainResult<Vec<SyncRequest>> {
        if *self.fail_reads.lock() {
            return Err(OvertraktError::Ledger("ledger offline".into()));
        }
        Ok(self.rows.lock().values().filter(|row| !row.added).cloned().collect())
    }
}

/// Records submitted bodies and replays scripted responses in order.
#[derive(Default)]
pub struct ScriptedListApi {
    responses: Mutex<VecDeque<DomainResult<ListItemsResponse>>>,
    pub calls: Mutex<Vec<(String, String, ListItemsRequest)>>,
}

impl ScriptedListApi {
    pub fn respond(self, response: DomainResult<ListItemsResponse>) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ListItemsApi for ScriptedListApi {
    async fn add_list_items(
        &self,
        user_id: &str,
        list_id: &str,
        items: &ListItemsRequest,
    ) -> DomainResult<ListItemsResponse> {
        self.calls.lock().push((user_id.to_string(), list_id.to_string(), items.clone()));
        self.responses.lock().pop_front().unwrap_or_else(|| Ok(ListItemsResponse::default()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
