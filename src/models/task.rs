use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Fields a `PATCH /tasks/{id}` body may touch.
pub const ALLOWED_TASK_UPDATE_FIELDS: [&str; 2] = ["description", "completed"];

/// A task owned by exactly one account. Rows are removed together with their
/// owner inside the account-deletion transaction.
#[derive(Debug, Serialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    /// Id of the owning account.
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Query parameters for listing tasks.
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    /// Filter tasks by completion state.
    pub completed: Option<bool>,
}

/// Partial task update. Absent fields keep their stored value.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 1000))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Same wholesale-rejection rule as the profile update: one unknown key fails
/// the entire request.
pub fn ensure_allowed_task_update(body: &Value) -> Result<(), AppError> {
    let object = body
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Expected a JSON object".into()))?;

    let valid = object
        .keys()
        .all(|key| ALLOWED_TASK_UPDATE_FIELDS.contains(&key.as_str()));
    if !valid {
        return Err(AppError::ValidationError("Invalid Updates".into()));
    }

    Ok(())
}
