use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Storage, StoreResult};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::models::{
    Cycle, CycleDraft, CyclePatch, Flow, NewPeriodLog, NewReminder, PeriodLog, PeriodLogPatch,
    Reminder, ReminderPatch, ReminderTiming,
};

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        if config.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("📦 Migrations applied");
        }

        Ok(Self::new(pool))
    }
}

const PERIOD_LOG_COLUMNS: &str = "id, user_id, date, flow, symptoms, mood, notes";
const CYCLE_COLUMNS: &str = "id, user_id, start_date, end_date, period_length, cycle_length";
const REMINDER_COLUMNS: &str =
    "id, user_id, kind, timing_days, timing_when, time, message, enabled";

#[derive(FromRow)]
struct PeriodLogRow {
    id: i64,
    user_id: Uuid,
    date: NaiveDate,
    flow: Option<String>,
    symptoms: Vec<String>,
    mood: Option<String>,
    notes: Option<String>,
}

impl TryFrom<PeriodLogRow> for PeriodLog {
    type Error = StoreError;

    fn try_from(row: PeriodLogRow) -> Result<Self, Self::Error> {
        let flow = row
            .flow
            .map(|f| f.parse::<Flow>())
            .transpose()
            .map_err(StoreError::Corrupt)?;
        Ok(PeriodLog {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            flow,
            symptoms: row.symptoms,
            mood: row.mood,
            notes: row.notes,
        })
    }
}

#[derive(FromRow)]
struct CycleRow {
    id: i64,
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    period_length: i32,
    cycle_length: Option<i32>,
}

impl From<CycleRow> for Cycle {
    fn from(row: CycleRow) -> Self {
        Cycle {
            id: row.id,
            user_id: row.user_id,
            start_date: row.start_date,
            end_date: row.end_date,
            period_length: row.period_length,
            cycle_length: row.cycle_length,
        }
    }
}

#[derive(FromRow)]
struct ReminderRow {
    id: i64,
    user_id: Uuid,
    kind: String,
    timing_days: i32,
    timing_when: String,
    time: String,
    message: String,
    enabled: bool,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = StoreError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let days = u32::try_from(row.timing_days)
            .map_err(|_| StoreError::Corrupt(format!("negative reminder days {}", row.timing_days)))?;
        Ok(Reminder {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse().map_err(StoreError::Corrupt)?,
            timing: ReminderTiming {
                days,
                when: row.timing_when.parse().map_err(StoreError::Corrupt)?,
            },
            time: row.time,
            message: row.message,
            enabled: row.enabled,
        })
    }
}

fn collect_logs(rows: Vec<PeriodLogRow>) -> StoreResult<Vec<PeriodLog>> {
    rows.into_iter().map(PeriodLog::try_from).collect()
}

fn collect_reminders(rows: Vec<ReminderRow>) -> StoreResult<Vec<Reminder>> {
    rows.into_iter().map(Reminder::try_from).collect()
}

async fn write_period_log(
    tx: &mut Transaction<'_, Postgres>,
    log: &PeriodLog,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE period_logs
         SET date = $2, flow = $3, symptoms = $4, mood = $5, notes = $6
         WHERE id = $1",
    )
    .bind(log.id)
    .bind(log.date)
    .bind(log.flow.map(Flow::as_str))
    .bind(&log.symptoms)
    .bind(&log.mood)
    .bind(&log.notes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl Storage for PgStorage {
    async fn list_period_logs(&self, user_id: Uuid) -> StoreResult<Vec<PeriodLog>> {
        let rows = sqlx::query_as::<_, PeriodLogRow>(&format!(
            "SELECT {PERIOD_LOG_COLUMNS} FROM period_logs
             WHERE user_id = $1
             ORDER BY date DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect_logs(rows)
    }

    async fn get_period_log(&self, id: i64) -> StoreResult<Option<PeriodLog>> {
        sqlx::query_as::<_, PeriodLogRow>(&format!(
            "SELECT {PERIOD_LOG_COLUMNS} FROM period_logs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(PeriodLog::try_from)
        .transpose()
    }

    async fn get_period_log_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<PeriodLog>> {
        sqlx::query_as::<_, PeriodLogRow>(&format!(
            "SELECT {PERIOD_LOG_COLUMNS} FROM period_logs WHERE user_id = $1 AND date = $2"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .map(PeriodLog::try_from)
        .transpose()
    }

    async fn create_period_log(&self, log: NewPeriodLog) -> StoreResult<PeriodLog> {
        let row = sqlx::query_as::<_, PeriodLogRow>(&format!(
            "INSERT INTO period_logs (user_id, date, flow, symptoms, mood, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PERIOD_LOG_COLUMNS}"
        ))
        .bind(log.user_id)
        .bind(log.date)
        .bind(log.flow.map(Flow::as_str))
        .bind(&log.symptoms)
        .bind(&log.mood)
        .bind(&log.notes)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update_period_log(
        &self,
        id: i64,
        patch: PeriodLogPatch,
    ) -> StoreResult<Option<PeriodLog>> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, PeriodLogRow>(&format!(
            "SELECT {PERIOD_LOG_COLUMNS} FROM period_logs WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let mut log = PeriodLog::try_from(row)?;
        log.apply(patch);
        write_period_log(&mut tx, &log).await?;
        tx.commit().await?;

        Ok(Some(log))
    }

    async fn delete_period_log(&self, id: i64) -> StoreResult<Option<PeriodLog>> {
        sqlx::query_as::<_, PeriodLogRow>(&format!(
            "DELETE FROM period_logs WHERE id = $1 RETURNING {PERIOD_LOG_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(PeriodLog::try_from)
        .transpose()
    }

    async fn list_qualifying_log_entries(&self, user_id: Uuid) -> StoreResult<Vec<PeriodLog>> {
        let rows = sqlx::query_as::<_, PeriodLogRow>(&format!(
            "SELECT {PERIOD_LOG_COLUMNS} FROM period_logs
             WHERE user_id = $1 AND flow IN ('light', 'medium', 'heavy')"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect_logs(rows)
    }

    async fn list_cycles(&self, user_id: Uuid) -> StoreResult<Vec<Cycle>> {
        let rows = sqlx::query_as::<_, CycleRow>(&format!(
            "SELECT {CYCLE_COLUMNS} FROM cycles
             WHERE user_id = $1
             ORDER BY start_date DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Cycle::from).collect())
    }

    async fn get_cycle(&self, id: i64) -> StoreResult<Option<Cycle>> {
        let row = sqlx::query_as::<_, CycleRow>(&format!(
            "SELECT {CYCLE_COLUMNS} FROM cycles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Cycle::from))
    }

    async fn update_cycle(&self, id: i64, patch: CyclePatch) -> StoreResult<Option<Cycle>> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, CycleRow>(&format!(
            "SELECT {CYCLE_COLUMNS} FROM cycles WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let mut cycle = Cycle::from(row);
        cycle.apply(patch);
        sqlx::query(
            "UPDATE cycles
             SET start_date = $2, end_date = $3, period_length = $4, cycle_length = $5
             WHERE id = $1",
        )
        .bind(cycle.id)
        .bind(cycle.start_date)
        .bind(cycle.end_date)
        .bind(cycle.period_length)
        .bind(cycle.cycle_length)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(cycle))
    }

    async fn delete_cycle(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cycles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_cycles(
        &self,
        user_id: Uuid,
        drafts: Vec<CycleDraft>,
    ) -> StoreResult<Vec<Cycle>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cycles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let row = sqlx::query_as::<_, CycleRow>(&format!(
                "INSERT INTO cycles (user_id, start_date, end_date, period_length, cycle_length)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING {CYCLE_COLUMNS}"
            ))
            .bind(draft.user_id)
            .bind(draft.start_date)
            .bind(draft.end_date)
            .bind(draft.period_length)
            .bind(draft.cycle_length)
            .fetch_one(&mut *tx)
            .await?;
            created.push(Cycle::from(row));
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list_reminders(&self, user_id: Uuid) -> StoreResult<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = $1 ORDER BY id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect_reminders(rows)
    }

    async fn get_reminder(&self, id: i64) -> StoreResult<Option<Reminder>> {
        sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Reminder::try_from)
        .transpose()
    }

    async fn create_reminder(&self, reminder: NewReminder) -> StoreResult<Reminder> {
        let row = sqlx::query_as::<_, ReminderRow>(&format!(
            "INSERT INTO reminders (user_id, kind, timing_days, timing_when, time, message, enabled)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(reminder.user_id)
        .bind(reminder.kind.as_str())
        .bind(timing_days(reminder.timing.days)?)
        .bind(reminder.timing.when.as_str())
        .bind(&reminder.time)
        .bind(&reminder.message)
        .bind(reminder.enabled)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update_reminder(
        &self,
        id: i64,
        patch: ReminderPatch,
    ) -> StoreResult<Option<Reminder>> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let mut reminder = Reminder::try_from(row)?;
        reminder.apply(patch);

        sqlx::query(
            "UPDATE reminders
             SET kind = $2, timing_days = $3, timing_when = $4, time = $5, message = $6, enabled = $7
             WHERE id = $1",
        )
        .bind(reminder.id)
        .bind(reminder.kind.as_str())
        .bind(timing_days(reminder.timing.days)?)
        .bind(reminder.timing.when.as_str())
        .bind(&reminder.time)
        .bind(&reminder.message)
        .bind(reminder.enabled)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(reminder))
    }

    async fn delete_reminder(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn timing_days(days: u32) -> StoreResult<i32> {
    i32::try_from(days).map_err(|_| StoreError::Corrupt(format!("reminder days {days} out of range")))
}
