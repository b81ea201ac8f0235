use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[sea_orm(string_value = "todo")]
    Todo,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "done")]
    Done,
}

impl TaskStatus {
    /// Board column order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::TaskStatus;

    #[test]
    fn status_uses_snake_case_everywhere() {
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
        assert_eq!(
            TaskStatus::from_str("in_progress").unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(TaskStatus::from_str("inreview").is_err());
        assert!(serde_json::from_str::<TaskStatus>("\"cancelled\"").is_err());
    }
}
