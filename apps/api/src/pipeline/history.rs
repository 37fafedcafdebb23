use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{Application, StatusHistoryEntry};
use crate::pipeline::status::{validate_transition, ApplicationStatus};

/// A single status change to append to the audit trail.
pub struct TransitionRecord<'a> {
    pub application_id: Uuid,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub changed_by: Uuid,
    pub reason: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Appends one history row inside the caller's transaction.
/// CRITICAL: history is append-only. Never UPDATE or DELETE rows here.
pub async fn record_transition(
    tx: &mut Transaction<'_, Postgres>,
    record: TransitionRecord<'_>,
) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO status_history
            (id, application_id, from_status, to_status, changed_by, reason, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(record.application_id)
    .bind(record.from_status)
    .bind(record.to_status)
    .bind(record.changed_by)
    .bind(record.reason)
    .bind(record.notes)
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

/// Validates and applies a status change, recording it in the same transaction.
///
/// The UPDATE is guarded on the status the caller read, so two concurrent changes
/// from the same starting status cannot both commit.
pub async fn change_status(
    pool: &PgPool,
    application: &Application,
    to: ApplicationStatus,
    changed_by: Uuid,
    reason: Option<&str>,
    notes: Option<&str>,
) -> Result<Application, AppError> {
    let from = application.status;
    validate_transition(from, to).map_err(|e| AppError::Validation(e.to_string()))?;

    let mut tx = pool.begin().await?;

    let updated: Option<Application> = sqlx::query_as(
        r#"
        UPDATE applications
        SET status = $1, updated_at = now()
        WHERE id = $2 AND status = $3
        RETURNING *
        "#,
    )
    .bind(to)
    .bind(application.id)
    .bind(from)
    .fetch_optional(&mut *tx)
    .await?;

    let updated = updated.ok_or_else(|| {
        AppError::Validation("Application status changed concurrently; reload and retry".into())
    })?;

    record_transition(
        &mut tx,
        TransitionRecord {
            application_id: application.id,
            from_status: Some(from),
            to_status: to,
            changed_by,
            reason,
            notes,
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        "Application {} moved {from} -> {to} by user {changed_by}",
        application.id
    );
    Ok(updated)
}

/// Returns the audit trail for an application, newest first.
pub async fn history_for(
    pool: &PgPool,
    application_id: Uuid,
) -> Result<Vec<StatusHistoryEntry>, AppError> {
    Ok(sqlx::query_as::<_, StatusHistoryEntry>(
        r#"
        SELECT h.id, h.application_id, h.from_status, h.to_status, h.changed_by,
               u.username AS changed_by_username, h.reason, h.notes, h.changed_at
        FROM status_history h
        JOIN users u ON u.id = h.changed_by
        WHERE h.application_id = $1
        ORDER BY h.changed_at DESC, h.id DESC
        "#,
    )
    .bind(application_id)
    .fetch_all(pool)
    .await?)
}
