use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use db::models::task::{CreateTask, DeleteTaskResponse, Task, TaskStatus, UpdateTask};

use crate::{
    api::{TaskApi, TaskApiError},
    drag::{DragState, StatusChange},
};

/// One rendered column: tasks of a single status in load order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

impl BoardColumn<'_> {
    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}

/// Client-side board state.
///
/// Holds a possibly stale copy of the server's tasks. The copy changes only
/// through `load`, appending a created task, replacing an updated one by id
/// and removing a deleted one by id. Counts, columns and overdue flags are
/// derived on every read.
pub struct BoardController<A> {
    api: A,
    tasks: Vec<Task>,
    drag: DragState,
    in_flight: HashSet<i64>,
    draft: Option<CreateTask>,
}

impl<A: TaskApi> BoardController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            drag: DragState::default(),
            in_flight: HashSet::new(),
            draft: None,
        }
    }

    /// Replaces local state with the full, unfiltered task list. On failure
    /// the previous state is kept.
    pub async fn load(&mut self) -> Result<(), TaskApiError> {
        match self.api.list_tasks(None).await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "Loaded board");
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to load tasks");
                Err(err)
            }
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn column(&self, status: TaskStatus) -> BoardColumn<'_> {
        BoardColumn {
            status,
            tasks: self
                .tasks
                .iter()
                .filter(|task| task.status == status)
                .collect(),
        }
    }

    /// The three columns in board order: todo, in progress, done.
    pub fn columns(&self) -> [BoardColumn<'_>; 3] {
        TaskStatus::ALL.map(|status| self.column(status))
    }

    pub fn counts(&self) -> [(TaskStatus, usize); 3] {
        TaskStatus::ALL.map(|status| {
            let count = self
                .tasks
                .iter()
                .filter(|task| task.status == status)
                .count();
            (status, count)
        })
    }

    /// Overdue against today's date in UTC.
    pub fn is_overdue(&self, task: &Task) -> bool {
        self.is_overdue_on(task, Utc::now().date_naive())
    }

    pub fn is_overdue_on(&self, task: &Task, today: NaiveDate) -> bool {
        task.is_overdue_on(today)
    }

    pub fn draft(&self) -> Option<&CreateTask> {
        self.draft.as_ref()
    }

    pub fn set_draft(&mut self, draft: CreateTask) {
        self.draft = Some(draft);
    }

    pub fn discard_draft(&mut self) {
        self.draft = None;
    }

    /// Submits the pending draft. The draft is cleared only once the server
    /// accepted it; a failed submit leaves it in place for another attempt.
    pub async fn submit_draft(&mut self) -> Result<Option<&Task>, TaskApiError> {
        let Some(draft) = self.draft.clone() else {
            return Ok(None);
        };

        self.create_task(&draft).await?;
        self.draft = None;
        Ok(self.tasks.last())
    }

    pub async fn create_task(&mut self, payload: &CreateTask) -> Result<&Task, TaskApiError> {
        match self.api.create_task(payload).await {
            Ok(task) => {
                tracing::debug!(task_id = task.id, "Task created");
                self.tasks.push(task);
                Ok(&self.tasks[self.tasks.len() - 1])
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to create task");
                Err(err)
            }
        }
    }

    pub async fn update_task(&mut self, id: i64, payload: &UpdateTask) -> Result<Task, TaskApiError> {
        self.in_flight.insert(id);
        let result = self.api.update_task(id, payload).await;
        self.in_flight.remove(&id);

        match result {
            Ok(task) => {
                self.replace_task(task.clone());
                Ok(task)
            }
            Err(err) => {
                tracing::error!(task_id = id, error = %err, "Failed to update task");
                Err(err)
            }
        }
    }

    pub async fn delete_task(&mut self, id: i64) -> Result<DeleteTaskResponse, TaskApiError> {
        self.in_flight.insert(id);
        let result = self.api.delete_task(id).await;
        self.in_flight.remove(&id);

        match result {
            Ok(deleted) => {
                self.tasks.retain(|task| task.id != deleted.id);
                Ok(deleted)
            }
            Err(err) => {
                tracing::error!(task_id = id, error = %err, "Failed to delete task");
                Err(err)
            }
        }
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_in_flight(&self, id: i64) -> bool {
        self.in_flight.contains(&id)
    }

    /// Picks up a card. Refused for unknown tasks and for tasks whose last
    /// mutation has not resolved yet; the machine then stays idle.
    pub fn drag_start(&mut self, id: i64) -> bool {
        if self.in_flight.contains(&id) {
            tracing::debug!(task_id = id, "Drag refused, mutation pending");
            return false;
        }
        let Some(status) = self.task(id).map(|task| task.status) else {
            return false;
        };
        self.drag.start(id, status)
    }

    pub fn drag_enter(&mut self, column: TaskStatus) {
        self.drag.enter(column);
    }

    pub fn drag_leave(&mut self, column: TaskStatus) {
        self.drag.leave(column);
    }

    pub fn drag_end(&mut self) {
        self.drag.end();
    }

    /// First half of a drop: returns to idle and, when the card changes
    /// column, marks the task in flight and hands back the change to send.
    pub fn begin_drop(&mut self, column: TaskStatus) -> Option<StatusChange> {
        let change = self.drag.drop_on(column)?;
        self.in_flight.insert(change.task_id);
        Some(change)
    }

    /// Second half of a drop, applied when the response arrives. A failed
    /// update leaves the card where it was.
    pub fn finish_drop(
        &mut self,
        change: StatusChange,
        result: Result<Task, TaskApiError>,
    ) -> Result<Task, TaskApiError> {
        self.in_flight.remove(&change.task_id);
        match result {
            Ok(task) => {
                tracing::debug!(
                    task_id = task.id,
                    from = %change.from,
                    to = %task.status,
                    "Task moved"
                );
                self.replace_task(task.clone());
                Ok(task)
            }
            Err(err) => {
                tracing::error!(
                    task_id = change.task_id,
                    error = %err,
                    "Failed to move task"
                );
                Err(err)
            }
        }
    }

    /// Drops the dragged card on `column`, issuing at most one status-only
    /// update. `Ok(None)` means nothing was sent.
    pub async fn drop_on(&mut self, column: TaskStatus) -> Result<Option<Task>, TaskApiError> {
        let Some(change) = self.begin_drop(column) else {
            return Ok(None);
        };
        let result = self
            .api
            .update_task(change.task_id, &change.to_update())
            .await;
        self.finish_drop(change, result).map(Some)
    }

    fn replace_task(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => tracing::debug!(task_id = task.id, "Updated task is no longer on the board"),
        }
    }
}
