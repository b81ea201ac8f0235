use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::nullable::deserialize_nullable;

pub use crate::types::TaskStatus;

use crate::entities::task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl CreateTask {
    pub fn from_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            status: None,
        }
    }
}

/// Partial update. `description` and `due_date` are tri-state: an omitted
/// key leaves the column alone, `null` clears it, a value overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub status: Option<TaskStatus>,
}

impl UpdateTask {
    /// The request a column drop issues: only `status` is present.
    pub fn status_only(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct DeleteTaskResponse {
    pub success: bool,
    pub id: i64,
}

impl Task {
    fn from_model(model: task::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            due_date: model.due_date,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// Overdue when the due date falls on a calendar day before `today`.
    /// A task due today is never overdue, whatever the time of day.
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.due_date
            .is_some_and(|due_date| due_date.date_naive() < today)
    }

    /// Tasks ordered by creation time, oldest first. Rows created within the
    /// same clock tick keep insertion order through the id tiebreak.
    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = task::Entity::find();
        if let Some(status) = status {
            query = query.filter(task::Column::Status.eq(status));
        }

        let records = query
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateTask) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = task::ActiveModel {
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            due_date: Set(data.due_date),
            status: Set(data.status.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Applies the present fields of `data` and stamps `updated_at`.
    ///
    /// Returns `Ok(None)` when no row has this id; nothing is written then.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        data: &UpdateTask,
    ) -> Result<Option<Self>, DbErr> {
        let Some(record) = task::Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };

        let updated_at = next_updated_at(record.updated_at);
        let mut active: task::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        if let Some(description) = data.description.clone() {
            active.description = Set(description);
        }
        if let Some(due_date) = data.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(status) = data.status {
            active.status = Set(status);
        }
        active.updated_at = Set(updated_at);

        let updated = active.update(db).await?;
        Ok(Some(Self::from_model(updated)))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = task::Entity::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected)
    }
}

// Every update must move `updated_at` forward, even when two writes land in
// the same clock tick.
fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn create(title: &str, status: TaskStatus) -> CreateTask {
        CreateTask {
            status: Some(status),
            ..CreateTask::from_title(title)
        }
    }

    #[tokio::test]
    async fn create_stamps_identical_timestamps_and_defaults_status() {
        let db = setup_db().await;

        let task = Task::create(&db, &CreateTask::from_title("Draft release notes"))
            .await
            .unwrap();

        assert!(task.id > 0);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.description, None);
        assert_eq!(task.due_date, None);
    }

    #[tokio::test]
    async fn find_all_orders_by_creation_and_filters_by_status() {
        let db = setup_db().await;
        let first = Task::create(&db, &create("first", TaskStatus::Done))
            .await
            .unwrap();
        let second = Task::create(&db, &create("second", TaskStatus::Todo))
            .await
            .unwrap();
        let third = Task::create(&db, &create("third", TaskStatus::Done))
            .await
            .unwrap();

        let all = Task::find_all(&db, None).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);

        let done = Task::find_all(&db, Some(TaskStatus::Done)).await.unwrap();
        let done_ids: Vec<i64> = done.iter().map(|t| t.id).collect();
        assert_eq!(done_ids, vec![first.id, third.id]);

        assert!(
            Task::find_all(&db, Some(TaskStatus::InProgress))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn ties_on_created_at_fall_back_to_insertion_order() {
        let db = setup_db().await;
        let stamp = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        for title in ["a", "b", "c"] {
            let active = task::ActiveModel {
                title: Set(title.to_string()),
                description: Set(None),
                due_date: Set(None),
                status: Set(TaskStatus::Todo),
                created_at: Set(stamp),
                updated_at: Set(stamp),
                ..Default::default()
            };
            active.insert(&db).await.unwrap();
        }

        let titles: Vec<String> = Task::find_all(&db, None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn update_distinguishes_omitted_from_cleared_fields() {
        let db = setup_db().await;
        let due = Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap();
        let task = Task::create(
            &db,
            &CreateTask {
                title: "keep".to_string(),
                description: Some("notes".to_string()),
                due_date: Some(due),
                status: None,
            },
        )
        .await
        .unwrap();

        let untouched = Task::update(&db, task.id, &UpdateTask::status_only(TaskStatus::Done))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.description.as_deref(), Some("notes"));
        assert_eq!(untouched.due_date, Some(due));
        assert_eq!(untouched.status, TaskStatus::Done);
        assert_eq!(untouched.title, "keep");

        let cleared = Task::update(
            &db,
            task.id,
            &UpdateTask {
                description: Some(None),
                due_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.due_date, None);
        assert_eq!(cleared.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn empty_update_still_moves_updated_at_forward() {
        let db = setup_db().await;
        let task = Task::create(&db, &CreateTask::from_title("idle"))
            .await
            .unwrap();

        let first = Task::update(&db, task.id, &UpdateTask::default())
            .await
            .unwrap()
            .unwrap();
        let second = Task::update(&db, task.id, &UpdateTask::default())
            .await
            .unwrap()
            .unwrap();

        assert!(first.updated_at > task.updated_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.created_at, task.created_at);
        assert_eq!(second.title, task.title);
    }

    #[tokio::test]
    async fn update_missing_id_writes_nothing() {
        let db = setup_db().await;
        let task = Task::create(&db, &CreateTask::from_title("only"))
            .await
            .unwrap();

        let result = Task::update(&db, task.id + 100, &UpdateTask::status_only(TaskStatus::Done))
            .await
            .unwrap();
        assert!(result.is_none());

        let all = Task::find_all(&db, None).await.unwrap();
        assert_eq!(all, vec![task]);
    }

    #[tokio::test]
    async fn delete_removes_one_row_and_ids_are_not_reused() {
        let db = setup_db().await;
        let a = Task::create(&db, &CreateTask::from_title("a")).await.unwrap();
        let b = Task::create(&db, &CreateTask::from_title("b")).await.unwrap();
        let c = Task::create(&db, &CreateTask::from_title("c")).await.unwrap();

        assert_eq!(Task::delete(&db, c.id).await.unwrap(), 1);
        assert_eq!(Task::delete(&db, c.id).await.unwrap(), 0);
        assert_eq!(Task::find_all(&db, None).await.unwrap(), vec![a, b]);

        let d = Task::create(&db, &CreateTask::from_title("d")).await.unwrap();
        assert!(d.id > c.id);
    }

    #[tokio::test]
    async fn storage_rejects_unknown_status_values() {
        let db = setup_db().await;
        let result = db
            .execute_unprepared(
                "INSERT INTO tasks (title, status, created_at, updated_at) \
                 VALUES ('rogue', 'archived', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP);",
            )
            .await;
        assert!(result.is_err());

        let ok = db
            .execute_unprepared(
                "INSERT INTO tasks (title, status, created_at, updated_at) \
                 VALUES ('fine', 'in_progress', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP);",
            )
            .await;
        assert!(ok.is_ok());
    }

    #[test]
    fn overdue_uses_calendar_days() {
        let now = Utc::now();
        let today = now.date_naive();
        let task = |due_date| Task {
            id: 1,
            title: "t".to_string(),
            description: None,
            due_date,
            status: TaskStatus::Todo,
            created_at: now,
            updated_at: now,
        };

        let start_of_today = today.and_hms_opt(0, 0, 0).unwrap().and_utc();
        assert!(!task(None).is_overdue_on(today));
        assert!(!task(Some(start_of_today)).is_overdue_on(today));
        assert!(!task(Some(now)).is_overdue_on(today));
        assert!(task(Some(start_of_today - Duration::seconds(1))).is_overdue_on(today));
        assert!(task(Some(now - Duration::days(1))).is_overdue_on(today));
    }

    #[test]
    fn update_payload_keeps_omitted_and_null_apart() {
        let omitted: UpdateTask = serde_json::from_str(r#"{"status":"done"}"#).unwrap();
        assert_eq!(omitted, UpdateTask::status_only(TaskStatus::Done));

        let cleared: UpdateTask =
            serde_json::from_str(r#"{"description":null,"due_date":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert_eq!(cleared.due_date, Some(None));
        assert!(cleared.title.is_none());

        let wire = serde_json::to_value(UpdateTask::status_only(TaskStatus::InProgress)).unwrap();
        assert_eq!(wire, serde_json::json!({ "status": "in_progress" }));
        let wire = serde_json::to_value(UpdateTask {
            description: Some(None),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(wire, serde_json::json!({ "description": null }));
    }
}
