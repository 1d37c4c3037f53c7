//! Shared helpers for the verb integration tests.

#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use docrest::{memory::InMemoryStore, prelude::*};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn memory_store() -> DocumentStore<InMemoryStore> {
    init_logging();
    DocumentStore::new(InMemoryStore::new())
}

pub fn users() -> Schema {
    Schema::builder("users").build()
}

/// Posts `count` users named `user-00`, `user-01`, ... with an increasing `rank`.
pub async fn seed_users<B: StoreBackend>(model: &Model<'_, B>, count: usize) -> Vec<Record> {
    let mut created = Vec::with_capacity(count);

    for rank in 0..count as i32 {
        let name = format!("user-{rank:02}");
        let record = model
            .post(doc! { "name": name, "rank": rank })
            .await
            .expect("seed user");
        created.push(record);
    }

    created
}

/// Records the order in which hooks ran.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<std::sync::Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Which backend operation a [`FailingStore`] refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Count,
    Query,
    Insert,
}

/// A backend delegating to an in-memory store, except for one operation that fails with
/// the configured error.
#[derive(Debug, Clone)]
pub struct FailingStore {
    inner: InMemoryStore,
    fail_on: FailOn,
    status: u16,
    pub calls: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new(fail_on: FailOn, status: u16) -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_on,
            status,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn check(&self, op: FailOn) -> DocumentStoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if op != self.fail_on {
            return Ok(());
        }

        Err(match self.status {
            0 => DocumentStoreError::Backend(format!("{op:?} unavailable")),
            status => DocumentStoreError::Rejected {
                status,
                message: format!("{op:?} refused"),
            },
        })
    }
}

#[async_trait]
impl StoreBackend for FailingStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        self.check(FailOn::Insert)?;
        self.inner.insert_documents(documents, collection).await
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        self.inner.update_documents(documents, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        self.inner.delete_documents(ids, collection).await
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.inner.get_documents(ids, collection).await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.check(FailOn::Query)?;
        self.inner.query_documents(query, collection).await
    }

    async fn count_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<usize> {
        self.check(FailOn::Count)?;
        self.inner.count_documents(query, collection).await
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.inner.add_index(collection, field, unique).await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.inner.drop_index(collection, field).await
    }
}
