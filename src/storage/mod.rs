mod memory;
mod postgres;

pub use memory::MemStorage;
pub use postgres::PgStorage;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Cycle, CycleDraft, CyclePatch, NewPeriodLog, NewReminder, PeriodLog, PeriodLogPatch,
    Reminder, ReminderPatch,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// All log entries of a user, newest date first.
    async fn list_period_logs(&self, user_id: Uuid) -> StoreResult<Vec<PeriodLog>>;

    async fn get_period_log(&self, id: i64) -> StoreResult<Option<PeriodLog>>;

    async fn get_period_log_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<PeriodLog>>;

    async fn create_period_log(&self, log: NewPeriodLog) -> StoreResult<PeriodLog>;

    async fn update_period_log(
        &self,
        id: i64,
        patch: PeriodLogPatch,
    ) -> StoreResult<Option<PeriodLog>>;

    /// Removes an entry and hands it back, so callers know whose cycles to redo.
    async fn delete_period_log(&self, id: i64) -> StoreResult<Option<PeriodLog>>;

    /// Entries with light, medium or heavy flow. Order is unspecified.
    async fn list_qualifying_log_entries(&self, user_id: Uuid) -> StoreResult<Vec<PeriodLog>>;

    /// All cycles of a user, latest start first.
    async fn list_cycles(&self, user_id: Uuid) -> StoreResult<Vec<Cycle>>;

    async fn get_cycle(&self, id: i64) -> StoreResult<Option<Cycle>>;

    async fn update_cycle(&self, id: i64, patch: CyclePatch) -> StoreResult<Option<Cycle>>;

    async fn delete_cycle(&self, id: i64) -> StoreResult<bool>;

    /// Deletes every cycle of `user_id` and inserts `drafts` in order, as one
    /// atomic step. Each inserted cycle gets a fresh id.
    async fn replace_cycles(
        &self,
        user_id: Uuid,
        drafts: Vec<CycleDraft>,
    ) -> StoreResult<Vec<Cycle>>;

    async fn list_reminders(&self, user_id: Uuid) -> StoreResult<Vec<Reminder>>;

    async fn get_reminder(&self, id: i64) -> StoreResult<Option<Reminder>>;

    async fn create_reminder(&self, reminder: NewReminder) -> StoreResult<Reminder>;

    async fn update_reminder(
        &self,
        id: i64,
        patch: ReminderPatch,
    ) -> StoreResult<Option<Reminder>>;

    async fn delete_reminder(&self, id: i64) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_is_object_safe() {
        fn _accepts_dyn(_store: &dyn Storage) {}
    }
}
