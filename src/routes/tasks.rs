use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthSession,
    error::AppError,
    models::task::{self, Task, TaskInput, TaskQuery, TaskUpdate},
};

const TASK_COLUMNS: &str = "id, description, completed, owner, created_at, updated_at";

/// Create a task owned by the caller.
#[post("/tasks")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
    input: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let input = input.into_inner();

    let sql = format!(
        "INSERT INTO tasks (id, description, completed, owner) \
         VALUES ($1, $2, $3, $4) RETURNING {}",
        TASK_COLUMNS
    );
    let created = sqlx::query_as::<_, Task>(&sql)
        .bind(Uuid::new_v4())
        .bind(input.description.trim())
        .bind(input.completed)
        .bind(session_data.user.id)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(created))
}

/// List the caller's tasks, newest first, optionally filtered by completion
/// state.
#[get("/tasks")]
pub async fn list_tasks(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
    query: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let tasks = match query.completed {
        Some(completed) => {
            let sql = format!(
                "SELECT {} FROM tasks WHERE owner = $1 AND completed = $2 \
                 ORDER BY created_at DESC",
                TASK_COLUMNS
            );
            sqlx::query_as::<_, Task>(&sql)
                .bind(session_data.user.id)
                .bind(completed)
                .fetch_all(&**pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {} FROM tasks WHERE owner = $1 ORDER BY created_at DESC",
                TASK_COLUMNS
            );
            sqlx::query_as::<_, Task>(&sql)
                .bind(session_data.user.id)
                .fetch_all(&**pool)
                .await?
        }
    };

    Ok(HttpResponse::Ok().json(tasks))
}

/// Fetch one of the caller's tasks. Tasks owned by other accounts look the
/// same as missing ones.
#[get("/tasks/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE id = $1 AND owner = $2",
        TASK_COLUMNS
    );
    let found = sqlx::query_as::<_, Task>(&sql)
        .bind(task_id.into_inner())
        .bind(session_data.user.id)
        .fetch_optional(&**pool)
        .await?;

    match found {
        Some(found) => Ok(HttpResponse::Ok().json(found)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Partial task update with the same wholesale allow-list rule as the profile
/// update.
#[patch("/tasks/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
    task_id: web::Path<Uuid>,
    body: web::Json<serde_json::Value>,
) -> Result<impl Responder, AppError> {
    let body = body.into_inner();
    task::ensure_allowed_task_update(&body)?;

    let changes: TaskUpdate = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid update payload: {}", e)))?;
    changes.validate()?;

    let task_uuid = task_id.into_inner();

    let select_sql = format!(
        "SELECT {} FROM tasks WHERE id = $1 AND owner = $2",
        TASK_COLUMNS
    );
    let existing = sqlx::query_as::<_, Task>(&select_sql)
        .bind(task_uuid)
        .bind(session_data.user.id)
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let description = match changes.description {
        Some(description) => description.trim().to_string(),
        None => existing.description,
    };
    let completed = changes.completed.unwrap_or(existing.completed);

    let update_sql = format!(
        "UPDATE tasks SET description = $1, completed = $2, updated_at = now() \
         WHERE id = $3 AND owner = $4 RETURNING {}",
        TASK_COLUMNS
    );
    let updated = sqlx::query_as::<_, Task>(&update_sql)
        .bind(&description)
        .bind(completed)
        .bind(task_uuid)
        .bind(session_data.user.id)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete one of the caller's tasks and return the removed record.
#[delete("/tasks/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "DELETE FROM tasks WHERE id = $1 AND owner = $2 RETURNING {}",
        TASK_COLUMNS
    );
    let deleted = sqlx::query_as::<_, Task>(&sql)
        .bind(task_id.into_inner())
        .bind(session_data.user.id)
        .fetch_optional(&**pool)
        .await?;

    match deleted {
        Some(deleted) => Ok(HttpResponse::Ok().json(deleted)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}
