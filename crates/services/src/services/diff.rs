use std::collections::BTreeSet;
use std::str::FromStr;

use db::models::task::{Task, TaskUpdatable};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("field `{0}` is not updatable")]
    InvalidField(String),
    #[error("{0}")]
    Validation(String),
}

/// Updatable scalar task fields, keyed by their wire names. Unknown names
/// are rejected at the lookup boundary; `tags` and `files` are handled
/// separately as sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum TaskField {
    #[strum(to_string = "title")]
    Title,
    #[strum(to_string = "description")]
    Description,
    #[strum(to_string = "rowId")]
    RowId,
    #[strum(to_string = "columnId")]
    ColumnId,
    #[strum(to_string = "deskId")]
    DeskId,
    #[strum(to_string = "taskTypeId")]
    TaskTypeId,
    #[strum(to_string = "initialAssessment")]
    InitialAssessment,
    #[strum(to_string = "performerId")]
    PerformerId,
}

/// A storage write scoped to exactly one task field.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetedWrite {
    Title(String),
    Description(Option<String>),
    RowId(Uuid),
    ColumnId(Uuid),
    DeskId(Uuid),
    TaskTypeId(Uuid),
    InitialAssessment(i64),
    PerformerId(Option<Uuid>),
    Tags(Vec<Uuid>),
    Files(Vec<Uuid>),
}

impl TargetedWrite {
    pub async fn apply(&self, pool: &SqlitePool, task_id: Uuid) -> Result<(), sqlx::Error> {
        match self {
            Self::Title(title) => Task::update_title(pool, task_id, title).await,
            Self::Description(description) => {
                Task::update_description(pool, task_id, description.as_deref()).await
            }
            Self::RowId(row_id) => Task::update_row_id(pool, task_id, *row_id).await,
            Self::ColumnId(column_id) => Task::update_column_id(pool, task_id, *column_id).await,
            Self::DeskId(desk_id) => Task::update_desk_id(pool, task_id, *desk_id).await,
            Self::TaskTypeId(task_type_id) => {
                Task::update_task_type_id(pool, task_id, *task_type_id).await
            }
            Self::InitialAssessment(value) => {
                Task::update_initial_assessment(pool, task_id, *value).await
            }
            Self::PerformerId(performer_id) => {
                Task::update_performer_id(pool, task_id, *performer_id).await
            }
            Self::Tags(tags) => Task::replace_tags(pool, task_id, tags).await,
            Self::Files(files) => Task::replace_files(pool, task_id, files).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub field: String,
    pub previous: String,
    pub current: String,
    pub write: TargetedWrite,
}

/// The computed set of field-level changes between a task's stored state and
/// a proposed update. The three derived sequences are parallel and equal in
/// length.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDiff {
    pub entries: Vec<DiffEntry>,
}

impl TaskDiff {
    pub fn updated_fields(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.field.clone()).collect()
    }

    pub fn new_values(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.current.clone()).collect()
    }

    pub fn previous_values(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.previous.clone()).collect()
    }

    /// The desk the task is moving to, when the diff touches `deskId`.
    pub fn new_desk_id(&self) -> Option<Uuid> {
        self.entries.iter().find_map(|e| match e.write {
            TargetedWrite::DeskId(desk_id) => Some(desk_id),
            _ => None,
        })
    }
}

/// Compute the diff between the stored updatable snapshot and a proposed
/// partial update. `Ok(None)` means nothing changed (a successful no-op).
///
/// Scalars compare with loose equality on stringified values, so `"5"` and
/// `5` do not produce a false diff on type-coerced form input. `tags` and
/// `files` compare as sets of ids; the recorded value is the full submitted
/// set (a replace, not a merge). A field absent from the payload is left
/// untouched; an explicit empty value counts as a candidate change.
pub fn diff_task(
    snapshot: &TaskUpdatable,
    proposed: &Map<String, Value>,
    tags: Option<&[Uuid]>,
    files: Option<&[Uuid]>,
) -> Result<Option<TaskDiff>, DiffError> {
    let mut entries = Vec::new();

    for (key, value) in proposed {
        if key == "tags" || key == "files" {
            continue;
        }
        let field =
            TaskField::from_str(key).map_err(|_| DiffError::InvalidField(key.clone()))?;
        let previous = scalar_repr(snapshot, field);
        let current = value_repr(value);
        if previous == current {
            continue;
        }
        let write = parse_write(field, value)?;
        entries.push(DiffEntry {
            field: field.to_string(),
            previous,
            current,
            write,
        });
    }

    if let Some(files) = files {
        let old: BTreeSet<Uuid> = snapshot.files.iter().copied().collect();
        let new: BTreeSet<Uuid> = files.iter().copied().collect();
        if old != new {
            entries.push(DiffEntry {
                field: "files".to_string(),
                previous: set_repr(&old),
                current: set_repr(&new),
                write: TargetedWrite::Files(files.to_vec()),
            });
        }
    }

    if let Some(tags) = tags {
        let old: BTreeSet<Uuid> = snapshot.tags.iter().copied().collect();
        let new: BTreeSet<Uuid> = tags.iter().copied().collect();
        if old != new {
            entries.push(DiffEntry {
                field: "tags".to_string(),
                previous: set_repr(&old),
                current: set_repr(&new),
                write: TargetedWrite::Tags(tags.to_vec()),
            });
        }
    }

    if entries.is_empty() {
        Ok(None)
    } else {
        Ok(Some(TaskDiff { entries }))
    }
}

fn scalar_repr(snapshot: &TaskUpdatable, field: TaskField) -> String {
    match field {
        TaskField::Title => snapshot.title.clone(),
        TaskField::Description => snapshot.description.clone().unwrap_or_default(),
        TaskField::RowId => snapshot.row_id.to_string(),
        TaskField::ColumnId => snapshot.column_id.to_string(),
        TaskField::DeskId => snapshot.desk_id.to_string(),
        TaskField::TaskTypeId => snapshot.task_type_id.to_string(),
        TaskField::InitialAssessment => snapshot.initial_assessment.to_string(),
        TaskField::PerformerId => snapshot
            .performer_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
    }
}

fn value_repr(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn set_repr(ids: &BTreeSet<Uuid>) -> String {
    Value::from(ids.iter().map(Uuid::to_string).collect::<Vec<String>>()).to_string()
}

fn parse_write(field: TaskField, value: &Value) -> Result<TargetedWrite, DiffError> {
    match field {
        TaskField::Title => match value.as_str() {
            Some(title) if !title.trim().is_empty() => {
                Ok(TargetedWrite::Title(title.to_string()))
            }
            _ => Err(DiffError::Validation("title cannot be empty".to_string())),
        },
        TaskField::Description => match value {
            Value::Null => Ok(TargetedWrite::Description(None)),
            Value::String(s) => Ok(TargetedWrite::Description(Some(s.clone()))),
            _ => Err(DiffError::Validation(
                "description must be a string".to_string(),
            )),
        },
        TaskField::RowId => parse_uuid(value, field).map(TargetedWrite::RowId),
        TaskField::ColumnId => parse_uuid(value, field).map(TargetedWrite::ColumnId),
        TaskField::DeskId => parse_uuid(value, field).map(TargetedWrite::DeskId),
        TaskField::TaskTypeId => parse_uuid(value, field).map(TargetedWrite::TaskTypeId),
        TaskField::InitialAssessment => {
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match parsed {
                Some(v) if v >= 0 => Ok(TargetedWrite::InitialAssessment(v)),
                _ => Err(DiffError::Validation(
                    "initial assessment must be a non-negative number".to_string(),
                )),
            }
        }
        TaskField::PerformerId => match value {
            Value::Null => Ok(TargetedWrite::PerformerId(None)),
            _ => parse_uuid(value, field).map(|id| TargetedWrite::PerformerId(Some(id))),
        },
    }
}

fn parse_uuid(value: &Value, field: TaskField) -> Result<Uuid, DiffError> {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| DiffError::Validation(format!("{field} must be a valid id")))
}
