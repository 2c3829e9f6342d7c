use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Storage, StoreResult};
use crate::models::{
    Cycle, CycleDraft, CyclePatch, NewPeriodLog, NewReminder, PeriodLog, PeriodLogPatch,
    Reminder, ReminderPatch,
};

#[derive(Debug)]
pub struct MemStorage {
    period_logs: RwLock<BTreeMap<i64, PeriodLog>>,
    // Immutable snapshot, replaced wholesale by every cycle write.
    cycles: RwLock<Arc<BTreeMap<i64, Cycle>>>,
    reminders: RwLock<BTreeMap<i64, Reminder>>,
    next_period_log_id: AtomicI64,
    next_cycle_id: AtomicI64,
    next_reminder_id: AtomicI64,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            period_logs: RwLock::new(BTreeMap::new()),
            cycles: RwLock::new(Arc::new(BTreeMap::new())),
            reminders: RwLock::new(BTreeMap::new()),
            next_period_log_id: AtomicI64::new(1),
            next_cycle_id: AtomicI64::new(1),
            next_reminder_id: AtomicI64::new(1),
        }
    }

    async fn cycle_snapshot(&self) -> Arc<BTreeMap<i64, Cycle>> {
        Arc::clone(&*self.cycles.read().await)
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn list_period_logs(&self, user_id: Uuid) -> StoreResult<Vec<PeriodLog>> {
        let mut logs: Vec<PeriodLog> = self
            .period_logs
            .read()
            .await
            .values()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(logs)
    }

    async fn get_period_log(&self, id: i64) -> StoreResult<Option<PeriodLog>> {
        Ok(self.period_logs.read().await.get(&id).cloned())
    }

    async fn get_period_log_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<PeriodLog>> {
        Ok(self
            .period_logs
            .read()
            .await
            .values()
            .find(|log| log.user_id == user_id && log.date == date)
            .cloned())
    }

    async fn create_period_log(&self, log: NewPeriodLog) -> StoreResult<PeriodLog> {
        let id = self.next_period_log_id.fetch_add(1, Ordering::SeqCst);
        let log = log.into_log(id);
        self.period_logs.write().await.insert(id, log.clone());
        Ok(log)
    }

    async fn update_period_log(
        &self,
        id: i64,
        patch: PeriodLogPatch,
    ) -> StoreResult<Option<PeriodLog>> {
        let mut logs = self.period_logs.write().await;
        Ok(logs.get_mut(&id).map(|log| {
            log.apply(patch);
            log.clone()
        }))
    }

    async fn delete_period_log(&self, id: i64) -> StoreResult<Option<PeriodLog>> {
        Ok(self.period_logs.write().await.remove(&id))
    }

    async fn list_qualifying_log_entries(&self, user_id: Uuid) -> StoreResult<Vec<PeriodLog>> {
        Ok(self
            .period_logs
            .read()
            .await
            .values()
            .filter(|log| log.user_id == user_id && log.is_bleeding())
            .cloned()
            .collect())
    }

    async fn list_cycles(&self, user_id: Uuid) -> StoreResult<Vec<Cycle>> {
        let snapshot = self.cycle_snapshot().await;
        let mut cycles: Vec<Cycle> = snapshot
            .values()
            .filter(|cycle| cycle.user_id == user_id)
            .cloned()
            .collect();
        cycles.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(cycles)
    }

    async fn get_cycle(&self, id: i64) -> StoreResult<Option<Cycle>> {
        Ok(self.cycle_snapshot().await.get(&id).cloned())
    }

    async fn update_cycle(&self, id: i64, patch: CyclePatch) -> StoreResult<Option<Cycle>> {
        let mut guard = self.cycles.write().await;
        if !guard.contains_key(&id) {
            return Ok(None);
        }
        let mut next: BTreeMap<i64, Cycle> = (**guard).clone();
        let updated = next.get_mut(&id).map(|cycle| {
            cycle.apply(patch);
            cycle.clone()
        });
        *guard = Arc::new(next);
        Ok(updated)
    }

    async fn delete_cycle(&self, id: i64) -> StoreResult<bool> {
        let mut guard = self.cycles.write().await;
        if !guard.contains_key(&id) {
            return Ok(false);
        }
        let mut next: BTreeMap<i64, Cycle> = (**guard).clone();
        next.remove(&id);
        *guard = Arc::new(next);
        Ok(true)
    }

    async fn replace_cycles(
        &self,
        user_id: Uuid,
        drafts: Vec<CycleDraft>,
    ) -> StoreResult<Vec<Cycle>> {
        let mut guard = self.cycles.write().await;
        let mut next: BTreeMap<i64, Cycle> = guard
            .iter()
            .filter(|(_, cycle)| cycle.user_id != user_id)
            .map(|(id, cycle)| (*id, cycle.clone()))
            .collect();

        let created: Vec<Cycle> = drafts
            .into_iter()
            .map(|draft| draft.into_cycle(self.next_cycle_id.fetch_add(1, Ordering::SeqCst)))
            .collect();
        for cycle in &created {
            next.insert(cycle.id, cycle.clone());
        }

        *guard = Arc::new(next);
        Ok(created)
    }

    async fn list_reminders(&self, user_id: Uuid) -> StoreResult<Vec<Reminder>> {
        Ok(self
            .reminders
            .read()
            .await
            .values()
            .filter(|reminder| reminder.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_reminder(&self, id: i64) -> StoreResult<Option<Reminder>> {
        Ok(self.reminders.read().await.get(&id).cloned())
    }

    async fn create_reminder(&self, reminder: NewReminder) -> StoreResult<Reminder> {
        let id = self.next_reminder_id.fetch_add(1, Ordering::SeqCst);
        let reminder = reminder.into_reminder(id);
        self.reminders.write().await.insert(id, reminder.clone());
        Ok(reminder)
    }

    async fn update_reminder(
        &self,
        id: i64,
        patch: ReminderPatch,
    ) -> StoreResult<Option<Reminder>> {
        let mut reminders = self.reminders.write().await;
        Ok(reminders.get_mut(&id).map(|reminder| {
            reminder.apply(patch);
            reminder.clone()
        }))
    }

    async fn delete_reminder(&self, id: i64) -> StoreResult<bool> {
        Ok(self.reminders.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flow;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn new_log(user_id: Uuid, date: NaiveDate, flow: Option<Flow>) -> NewPeriodLog {
        NewPeriodLog {
            user_id,
            date,
            flow,
            symptoms: vec![],
            mood: None,
            notes: None,
        }
    }

    fn draft(user_id: Uuid, start: u32) -> CycleDraft {
        CycleDraft {
            user_id,
            start_date: day(start),
            end_date: day(start + 1),
            period_length: 2,
            cycle_length: None,
        }
    }

    #[tokio::test]
    async fn assigns_sequential_ids_and_lists_newest_first() {
        let store = MemStorage::new();
        let user = Uuid::new_v4();

        let first = store.create_period_log(new_log(user, day(1), Some(Flow::Light))).await.unwrap();
        let second = store.create_period_log(new_log(user, day(5), None)).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let logs = store.list_period_logs(user).await.unwrap();
        assert_eq!(logs.iter().map(|l| l.date).collect::<Vec<_>>(), vec![day(5), day(1)]);
    }

    #[tokio::test]
    async fn qualifying_entries_skip_none_and_absent_flow() {
        let store = MemStorage::new();
        let user = Uuid::new_v4();
        store.create_period_log(new_log(user, day(1), Some(Flow::Heavy))).await.unwrap();
        store.create_period_log(new_log(user, day(2), Some(Flow::None))).await.unwrap();
        store.create_period_log(new_log(user, day(3), None)).await.unwrap();
        store
            .create_period_log(new_log(Uuid::new_v4(), day(4), Some(Flow::Light)))
            .await
            .unwrap();

        let qualifying = store.list_qualifying_log_entries(user).await.unwrap();
        assert_eq!(qualifying.len(), 1);
        assert_eq!(qualifying[0].date, day(1));
    }

    #[tokio::test]
    async fn finds_entry_by_date() {
        let store = MemStorage::new();
        let user = Uuid::new_v4();
        store.create_period_log(new_log(user, day(9), Some(Flow::Medium))).await.unwrap();

        assert!(store.get_period_log_by_date(user, day(9)).await.unwrap().is_some());
        assert!(store.get_period_log_by_date(user, day(10)).await.unwrap().is_none());
        assert!(store.get_period_log_by_date(Uuid::new_v4(), day(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_and_delete_period_log() {
        let store = MemStorage::new();
        let user = Uuid::new_v4();
        let log = store.create_period_log(new_log(user, day(1), None)).await.unwrap();

        let patch = PeriodLogPatch {
            flow: Some(Some(Flow::Heavy)),
            notes: Some(Some("cramps".into())),
            ..Default::default()
        };
        let updated = store.update_period_log(log.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.flow, Some(Flow::Heavy));
        assert_eq!(updated.notes.as_deref(), Some("cramps"));

        assert!(store.update_period_log(99, PeriodLogPatch::default()).await.unwrap().is_none());

        let removed = store.delete_period_log(log.id).await.unwrap().unwrap();
        assert_eq!(removed.id, log.id);
        assert!(store.delete_period_log(log.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_cycles_only_touches_one_user() {
        let store = MemStorage::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.replace_cycles(alice, vec![draft(alice, 1), draft(alice, 20)]).await.unwrap();
        store.replace_cycles(bob, vec![draft(bob, 3)]).await.unwrap();

        let replaced = store.replace_cycles(alice, vec![draft(alice, 5)]).await.unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].id, 4);

        let alice_cycles = store.list_cycles(alice).await.unwrap();
        assert_eq!(alice_cycles.len(), 1);
        assert_eq!(alice_cycles[0].start_date, day(5));
        assert_eq!(store.list_cycles(bob).await.unwrap().len(), 1);
        assert!(store.get_cycle(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn held_snapshot_is_unaffected_by_replacement() {
        let store = MemStorage::new();
        let user = Uuid::new_v4();
        store.replace_cycles(user, vec![draft(user, 1)]).await.unwrap();

        let before = store.cycle_snapshot().await;
        store.replace_cycles(user, vec![draft(user, 10), draft(user, 20)]).await.unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(store.cycle_snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn cycles_list_latest_start_first() {
        let store = MemStorage::new();
        let user = Uuid::new_v4();
        store
            .replace_cycles(user, vec![draft(user, 1), draft(user, 10), draft(user, 20)])
            .await
            .unwrap();

        let starts: Vec<_> = store
            .list_cycles(user)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.start_date)
            .collect();
        assert_eq!(starts, vec![day(20), day(10), day(1)]);
    }

    #[tokio::test]
    async fn update_and_delete_cycle() {
        let store = MemStorage::new();
        let user = Uuid::new_v4();
        let cycles = store.replace_cycles(user, vec![draft(user, 1)]).await.unwrap();
        let id = cycles[0].id;

        let patch = CyclePatch {
            cycle_length: Some(Some(31)),
            ..Default::default()
        };
        let updated = store.update_cycle(id, patch).await.unwrap().unwrap();
        assert_eq!(updated.cycle_length, Some(31));

        let reopen = CyclePatch {
            cycle_length: Some(None),
            ..Default::default()
        };
        let reopened = store.update_cycle(id, reopen).await.unwrap().unwrap();
        assert_eq!(reopened.cycle_length, None);
        assert_eq!(reopened.period_length, 2);
        assert!(store.update_cycle(42, CyclePatch::default()).await.unwrap().is_none());

        assert!(store.delete_cycle(id).await.unwrap());
        assert!(!store.delete_cycle(id).await.unwrap());
    }
}
