//! Client side of the board: the task API seam, the drag interaction and the
//! state container that ties them together.

pub mod api;
pub mod controller;
pub mod drag;

pub use api::{HttpTaskApi, TaskApi, TaskApiError};
pub use controller::{BoardColumn, BoardController};
pub use drag::{DragState, StatusChange};
