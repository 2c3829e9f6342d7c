use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::derive::derive_cycles;
use crate::error::StoreError;
use crate::models::{Cycle, NewPeriodLog, PeriodLog, PeriodLogPatch};
use crate::storage::Storage;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("a log entry already exists on {0}")]
    DateTaken(NaiveDate),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TrackResult<T> = Result<T, TrackError>;

#[derive(Debug)]
pub enum Logged {
    Created(PeriodLog),
    Updated(PeriodLog),
}

// A log mutation and the derivation pass after it run under the user's lock.
#[derive(Clone)]
pub struct CycleTracker {
    store: Arc<dyn Storage>,
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl CycleTracker {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(user_id).or_default())
    }

    /// A second entry for the same user and date replaces the first.
    pub async fn log_period(&self, new: NewPeriodLog) -> TrackResult<Logged> {
        let user_id = new.user_id;
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let existing = self.store.get_period_log_by_date(user_id, new.date).await?;
        let (logged, was_bleeding, is_bleeding) = match existing {
            Some(before) => {
                let after = self
                    .store
                    .update_period_log(before.id, new.into_replacement())
                    .await?
                    .unwrap_or_else(|| before.clone());
                let is_bleeding = after.is_bleeding();
                (Logged::Updated(after), before.is_bleeding(), is_bleeding)
            }
            None => {
                let created = self.store.create_period_log(new).await?;
                let is_bleeding = created.is_bleeding();
                (Logged::Created(created), false, is_bleeding)
            }
        };

        if was_bleeding || is_bleeding {
            derive_cycles(self.store.as_ref(), user_id).await?;
        }
        Ok(logged)
    }

    pub async fn update_period_log(
        &self,
        id: i64,
        patch: PeriodLogPatch,
    ) -> TrackResult<Option<PeriodLog>> {
        let Some(current) = self.store.get_period_log(id).await? else {
            return Ok(None);
        };
        let user_id = current.user_id;
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let Some(before) = self.store.get_period_log(id).await? else {
            return Ok(None);
        };
        if let Some(date) = patch.date.filter(|date| *date != before.date) {
            if self.store.get_period_log_by_date(user_id, date).await?.is_some() {
                return Err(TrackError::DateTaken(date));
            }
        }

        let Some(after) = self.store.update_period_log(id, patch).await? else {
            return Ok(None);
        };
        if before.is_bleeding() || after.is_bleeding() {
            derive_cycles(self.store.as_ref(), user_id).await?;
        }
        Ok(Some(after))
    }

    pub async fn delete_period_log(&self, id: i64) -> TrackResult<Option<PeriodLog>> {
        let Some(current) = self.store.get_period_log(id).await? else {
            return Ok(None);
        };
        let lock = self.user_lock(current.user_id);
        let _guard = lock.lock().await;

        let Some(removed) = self.store.delete_period_log(id).await? else {
            return Ok(None);
        };
        if removed.is_bleeding() {
            derive_cycles(self.store.as_ref(), removed.user_id).await?;
        }
        Ok(Some(removed))
    }

    pub async fn rederive(&self, user_id: Uuid) -> TrackResult<Option<Vec<Cycle>>> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        Ok(derive_cycles(self.store.as_ref(), user_id).await?)
    }
}
