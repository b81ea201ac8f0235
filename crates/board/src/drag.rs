use db::models::task::{TaskStatus, UpdateTask};

/// Where a drag gesture currently stands.
///
/// The machine starts in `Idle`, enters `Dragging` when a card is picked up
/// and always returns to `Idle` on drop or drag end, so a gesture can never
/// leave it stuck mid-drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        task_id: i64,
        from: TaskStatus,
        /// Column under the pointer. Only drives highlighting.
        over: Option<TaskStatus>,
    },
}

/// A drop that moves a task to another column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub task_id: i64,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

impl StatusChange {
    /// The only request a drop ever issues: `status` and nothing else.
    pub fn to_update(&self) -> UpdateTask {
        UpdateTask::status_only(self.to)
    }
}

impl DragState {
    /// Picks up a card. Refused while another drag is in progress.
    pub fn start(&mut self, task_id: i64, from: TaskStatus) -> bool {
        if !matches!(self, DragState::Idle) {
            return false;
        }
        *self = DragState::Dragging {
            task_id,
            from,
            over: None,
        };
        true
    }

    pub fn enter(&mut self, column: TaskStatus) {
        if let DragState::Dragging { over, .. } = self {
            *over = Some(column);
        }
    }

    /// The pointer left `column` entirely. The dragged card is kept.
    pub fn leave(&mut self, column: TaskStatus) {
        if let DragState::Dragging { over, .. } = self
            && *over == Some(column)
        {
            *over = None;
        }
    }

    /// Resolves a drop on `column` and returns to `Idle`. Dropping on the
    /// column the card came from yields nothing.
    pub fn drop_on(&mut self, column: TaskStatus) -> Option<StatusChange> {
        let DragState::Dragging { task_id, from, .. } = std::mem::take(self) else {
            return None;
        };
        (from != column).then_some(StatusChange {
            task_id,
            from,
            to: column,
        })
    }

    /// Drag ended, dropped or cancelled.
    pub fn end(&mut self) {
        *self = DragState::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    pub fn dragged_task(&self) -> Option<i64> {
        match self {
            DragState::Dragging { task_id, .. } => Some(*task_id),
            DragState::Idle => None,
        }
    }

    pub fn hovered_column(&self) -> Option<TaskStatus> {
        match self {
            DragState::Dragging { over, .. } => *over,
            DragState::Idle => None,
        }
    }
}
