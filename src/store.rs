// Progress records keyed by (learner_id, course_id). All mutation goes
// through atomic_update: the mutator runs on a copy under the per-key lock
// and the result is swapped in only on success, so concurrent updates to one
// key serialize and an error never leaves a partial write.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::EngineError;
use crate::models::ProgressRecord;

pub type Mutator =
    Box<dyn FnOnce(ProgressRecord) -> BoxFuture<'static, Result<ProgressRecord, EngineError>> + Send>;

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(
        &self,
        learner_id: &str,
        course_id: &str,
    ) -> Result<Option<ProgressRecord>, EngineError>;

    // creates the record lazily on first update for the key
    async fn atomic_update(
        &self,
        learner_id: &str,
        course_id: &str,
        mutator: Mutator,
    ) -> Result<ProgressRecord, EngineError>;
}

#[derive(Default)]
pub struct MemoryProgressStore {
    // key -> record cell; the tokio mutex is the per-key serialization point
    records: DashMap<(String, String), Arc<Mutex<ProgressRecord>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, learner_id: &str, course_id: &str) -> Arc<Mutex<ProgressRecord>> {
        let key = (learner_id.to_string(), course_id.to_string());
        // clone the Arc out so the dashmap shard guard drops before any await
        Arc::clone(
            self.records
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(ProgressRecord::new(learner_id, course_id))))
                .value(),
        )
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get(
        &self,
        learner_id: &str,
        course_id: &str,
    ) -> Result<Option<ProgressRecord>, EngineError> {
        let key = (learner_id.to_string(), course_id.to_string());
        let cell = match self.records.get(&key) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Ok(None),
        };
        let record = cell.lock().await.clone();
        Ok(Some(record))
    }

    async fn atomic_update(
        &self,
        learner_id: &str,
        course_id: &str,
        mutator: Mutator,
    ) -> Result<ProgressRecord, EngineError> {
        let cell = self.cell(learner_id, course_id);
        let mut current = cell.lock().await;
        let next = mutator(current.clone()).await?;
        *current = next.clone();
        Ok(next)
    }
}
