// src/routes/schedule_routes.rs

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ROLE_ADMIN, ROLE_DOCTOR},
    routes::doctor_routes::resolve_doctor_id_by_user_id,
    slots::{CandidateSlot, SlotWindow},
};

// A generation request covering more than this many days is almost
// certainly a client bug.
const MAX_GENERATION_DAYS: i64 = 92;

const DEFAULT_PAGE_LIMIT: i64 = 20;
const MAX_PAGE_LIMIT: i64 = 100;

fn is_admin(auth: &AuthContext) -> bool {
    auth.role == ROLE_ADMIN
}
fn is_doctor(auth: &AuthContext) -> bool {
    auth.role == ROLE_DOCTOR
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if is_admin(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage schedule slots".into(),
        ))
    }
}

/// Admin may act for any doctor; a doctor only for themselves.
async fn ensure_doctor_scope(
    state: &AppState,
    auth: &AuthContext,
    doctor_id: Uuid,
) -> Result<(), ApiError> {
    if is_admin(auth) {
        return Ok(());
    }
    if is_doctor(auth) {
        let own = resolve_doctor_id_by_user_id(state, auth.user_id).await?;
        if own == doctor_id {
            return Ok(());
        }
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Doctor can only manage their own availability".into(),
        ));
    }
    Err(ApiError::Forbidden(
        "FORBIDDEN",
        "You do not have permission to manage availability".into(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        // /api/v1/schedules
        .route("/", get(list_schedules))
        .route("/mine", get(my_schedules))
        .route("/generate", post(generate_slots))
        .route("/assign", post(assign_schedules))
        .route(
            "/{schedule_id}/doctors/{doctor_id}",
            delete(unassign_schedule),
        )
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ScheduleSlotRow {
    pub schedule_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AvailabilityRow {
    pub doctor_id: Uuid,
    pub schedule_id: Uuid,
    pub is_booked: bool,
    pub appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityPage {
    pub meta: PageMeta,
    pub data: Vec<AvailabilityRow>,
}

/* ============================================================
   POST /schedules/generate
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct GenerateSlotsRequest {
    // YYYY-MM-DD
    pub start_date: String,
    pub end_date: String,
    // HH:MM
    pub daily_start_time: String,
    pub daily_end_time: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateSlotsData {
    /// Candidate slots expanded from the window.
    pub generated: usize,
    /// Slot rows actually inserted (the rest already existed).
    pub created: u64,
}

fn parse_date(label: &str, s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest("VALIDATION_ERROR", format!("{label} must be YYYY-MM-DD"))
    })
}

fn parse_time(label: &str, s: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| {
        ApiError::BadRequest("VALIDATION_ERROR", format!("{label} must be HH:MM"))
    })
}

/// Persist candidate slots, de-duplicating on exact `(start_at, end_at)`
/// bounds, and return the full set of rows now backing the candidates
/// (pre-existing + newly created). A concurrent caller generating an
/// overlapping range races at the unique constraint; `ON CONFLICT DO
/// NOTHING` turns that into the "already present" case.
pub async fn register_slots(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    candidates: &[CandidateSlot],
) -> Result<(Vec<ScheduleSlotRow>, u64), ApiError> {
    if candidates.is_empty() {
        return Ok((vec![], 0));
    }

    let mut created: u64 = 0;
    for c in candidates {
        let res = sqlx::query(
            r#"
            INSERT INTO schedule_slot (start_at, end_at)
            VALUES ($1, $2)
            ON CONFLICT (start_at, end_at) DO NOTHING
            "#,
        )
        .bind(c.start_at)
        .bind(c.end_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
        created += res.rows_affected();
    }

    // Candidates are emitted in ascending order, so their envelope bounds
    // the ranged read-back; exact-bounds matching happens here in Rust.
    let min_start = candidates[0].start_at;
    let max_end = candidates[candidates.len() - 1].end_at;

    let rows: Vec<ScheduleSlotRow> = sqlx::query_as::<_, ScheduleSlotRow>(
        r#"
        SELECT schedule_id, start_at, end_at
        FROM schedule_slot
        WHERE start_at >= $1
          AND end_at <= $2
        ORDER BY start_at ASC
        "#,
    )
    .bind(min_start)
    .bind(max_end)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let wanted: HashSet<(DateTime<Utc>, DateTime<Utc>)> =
        candidates.iter().map(|c| (c.start_at, c.end_at)).collect();
    let backing = rows
        .into_iter()
        .filter(|r| wanted.contains(&(r.start_at, r.end_at)))
        .collect();

    Ok((backing, created))
}

pub async fn generate_slots(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<GenerateSlotsRequest>,
) -> Result<Json<ApiOk<GenerateSlotsData>>, ApiError> {
    ensure_admin(&auth)?;

    let start_date = parse_date("start_date", &req.start_date)?;
    let end_date = parse_date("end_date", &req.end_date)?;
    let daily_start = parse_time("daily_start_time", &req.daily_start_time)?;
    let daily_end = parse_time("daily_end_time", &req.daily_end_time)?;

    if (end_date - start_date).num_days() > MAX_GENERATION_DAYS {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("date range must not exceed {MAX_GENERATION_DAYS} days"),
        ));
    }

    let window = SlotWindow::new(start_date, end_date, daily_start, daily_end);
    let candidates: Vec<CandidateSlot> = window.iter().collect();

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let (backing, created) = register_slots(&mut tx, &candidates).await?;

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tracing::info!(
        generated = candidates.len(),
        created,
        backing = backing.len(),
        "schedule slots registered"
    );

    Ok(Json(ApiOk {
        data: GenerateSlotsData {
            generated: candidates.len(),
            created,
        },
    }))
}

/* ============================================================
   POST /schedules/assign
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct AssignSchedulesRequest {
    pub doctor_id: Uuid,
    pub schedule_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AssignSchedulesData {
    pub assigned: u64,
}

pub async fn assign_schedules(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AssignSchedulesRequest>,
) -> Result<Json<ApiOk<AssignSchedulesData>>, ApiError> {
    ensure_doctor_scope(&state, &auth, req.doctor_id).await?;

    if req.schedule_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "schedule_ids must not be empty".into(),
        ));
    }

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let doctor: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT doctor_id
        FROM doctor
        WHERE doctor_id = $1
          AND is_deleted = false
        "#,
    )
    .bind(req.doctor_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if doctor.is_none() {
        return Err(ApiError::not_found("doctor"));
    }

    let known: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT schedule_id
        FROM schedule_slot
        WHERE schedule_id = ANY($1)
        "#,
    )
    .bind(&req.schedule_ids)
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let known: HashSet<Uuid> = known.into_iter().collect();
    let missing: Vec<Uuid> = req
        .schedule_ids
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::invalid_reference("schedule", &missing));
    }

    // Assignment is idempotent: an already-assigned pair is skipped, and a
    // racing duplicate insert lands on the composite PK instead.
    let mut assigned: u64 = 0;
    let mut seen = HashSet::new();
    for schedule_id in req.schedule_ids.iter().filter(|id| seen.insert(**id)) {
        let res = sqlx::query(
            r#"
            INSERT INTO doctor_schedule (doctor_id, schedule_id)
            VALUES ($1, $2)
            ON CONFLICT (doctor_id, schedule_id) DO NOTHING
            "#,
        )
        .bind(req.doctor_id)
        .bind(schedule_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
        assigned += res.rows_affected();
    }

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk {
        data: AssignSchedulesData { assigned },
    }))
}

/* ============================================================
   GET /schedules, GET /schedules/mine
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ListSchedulesQuery {
    pub doctor_id: Option<Uuid>,
    pub is_booked: Option<bool>,
    // YYYY-MM-DD, inclusive on both ends
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Permitted sort keys, mapped to qualified columns. Caller input never
/// reaches the SQL text except through this enumeration.
fn sort_column(sort_by: Option<&str>) -> Result<&'static str, ApiError> {
    match sort_by {
        None | Some("start_at") => Ok("s.start_at"),
        Some("end_at") => Ok("s.end_at"),
        Some("created_at") => Ok("ds.created_at"),
        Some(other) => Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("sort_by must be one of start_at, end_at, created_at (got {other})"),
        )),
    }
}

fn sort_direction(sort_order: Option<&str>) -> Result<&'static str, ApiError> {
    match sort_order {
        None | Some("asc") => Ok("ASC"),
        Some("desc") => Ok("DESC"),
        Some(other) => Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("sort_order must be asc or desc (got {other})"),
        )),
    }
}

fn page_window(page: Option<i64>, limit: Option<i64>) -> Result<(i64, i64), ApiError> {
    let page = page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "page must be >= 1".into(),
        ));
    }
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("limit must be between 1 and {MAX_PAGE_LIMIT}"),
        ));
    }
    Ok((page, limit))
}

async fn fetch_availability_page(
    state: &AppState,
    q: &ListSchedulesQuery,
    doctor_id: Option<Uuid>,
) -> Result<AvailabilityPage, ApiError> {
    let (page, limit) = page_window(q.page, q.limit)?;
    let order_col = sort_column(q.sort_by.as_deref())?;
    let order_dir = sort_direction(q.sort_order.as_deref())?;

    let date_from: Option<DateTime<Utc>> = match q.date_from.as_deref() {
        Some(s) => Some(
            parse_date("date_from", s)?
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .ok_or_else(|| ApiError::Internal("invalid date_from".into()))?,
        ),
        None => None,
    };
    // Inclusive upper date: slots must end no later than the following midnight.
    let date_to: Option<DateTime<Utc>> = match q.date_to.as_deref() {
        Some(s) => {
            let d = parse_date("date_to", s)?;
            let next = d.succ_opt().ok_or_else(|| {
                ApiError::BadRequest("VALIDATION_ERROR", "date_to out of range".into())
            })?;
            Some(
                next.and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc())
                    .ok_or_else(|| ApiError::Internal("invalid date_to".into()))?,
            )
        }
        None => None,
    };

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM doctor_schedule ds
        JOIN schedule_slot s ON s.schedule_id = ds.schedule_id
        WHERE ($1::uuid IS NULL OR ds.doctor_id = $1)
          AND ($2::boolean IS NULL OR ds.is_booked = $2)
          AND ($3::timestamptz IS NULL OR s.start_at >= $3)
          AND ($4::timestamptz IS NULL OR s.end_at <= $4)
        "#,
    )
    .bind(doctor_id)
    .bind(q.is_booked)
    .bind(date_from)
    .bind(date_to)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    // order_col/order_dir come from the allow-list above, never from the caller.
    let sql = format!(
        r#"
        SELECT
          ds.doctor_id,
          ds.schedule_id,
          ds.is_booked,
          ds.appointment_id,
          ds.created_at,
          s.start_at,
          s.end_at
        FROM doctor_schedule ds
        JOIN schedule_slot s ON s.schedule_id = ds.schedule_id
        WHERE ($1::uuid IS NULL OR ds.doctor_id = $1)
          AND ($2::boolean IS NULL OR ds.is_booked = $2)
          AND ($3::timestamptz IS NULL OR s.start_at >= $3)
          AND ($4::timestamptz IS NULL OR s.end_at <= $4)
        ORDER BY {order_col} {order_dir}
        LIMIT $5 OFFSET $6
        "#
    );

    let rows: Vec<AvailabilityRow> = sqlx::query_as::<_, AvailabilityRow>(&sql)
        .bind(doctor_id)
        .bind(q.is_booked)
        .bind(date_from)
        .bind(date_to)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(AvailabilityPage {
        meta: PageMeta { total, page, limit },
        data: rows,
    })
}

pub async fn list_schedules(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<ListSchedulesQuery>,
) -> Result<Json<AvailabilityPage>, ApiError> {
    let page = fetch_availability_page(&state, &q, q.doctor_id).await?;
    Ok(Json(page))
}

pub async fn my_schedules(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<ListSchedulesQuery>,
) -> Result<Json<AvailabilityPage>, ApiError> {
    if !is_doctor(&auth) {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only doctors have their own availability".into(),
        ));
    }
    let doctor_id = resolve_doctor_id_by_user_id(&state, auth.user_id).await?;
    let page = fetch_availability_page(&state, &q, Some(doctor_id)).await?;
    Ok(Json(page))
}

/* ============================================================
   DELETE /schedules/{schedule_id}/doctors/{doctor_id}
   ============================================================ */

pub async fn unassign_schedule(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((schedule_id, doctor_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiOk<AvailabilityRow>>, ApiError> {
    ensure_doctor_scope(&state, &auth, doctor_id).await?;

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let link: Option<AvailabilityRow> = sqlx::query_as::<_, AvailabilityRow>(
        r#"
        SELECT
          ds.doctor_id,
          ds.schedule_id,
          ds.is_booked,
          ds.appointment_id,
          ds.created_at,
          s.start_at,
          s.end_at
        FROM doctor_schedule ds
        JOIN schedule_slot s ON s.schedule_id = ds.schedule_id
        WHERE ds.doctor_id = $1
          AND ds.schedule_id = $2
        FOR UPDATE OF ds
        "#,
    )
    .bind(doctor_id)
    .bind(schedule_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some(link) = link else {
        return Err(ApiError::not_found("availability"));
    };

    // A booked slot can never be detached; the booking must be released
    // first by the appointment side.
    if link.is_booked {
        return Err(ApiError::slot_booked(schedule_id));
    }

    sqlx::query(
        r#"
        DELETE FROM doctor_schedule
        WHERE doctor_id = $1
          AND schedule_id = $2
        "#,
    )
    .bind(doctor_id)
    .bind(schedule_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tracing::info!(%doctor_id, %schedule_id, "availability removed");

    Ok(Json(ApiOk { data: link }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_allow_list_maps_to_qualified_columns() {
        assert_eq!(sort_column(None).unwrap(), "s.start_at");
        assert_eq!(sort_column(Some("start_at")).unwrap(), "s.start_at");
        assert_eq!(sort_column(Some("end_at")).unwrap(), "s.end_at");
        assert_eq!(sort_column(Some("created_at")).unwrap(), "ds.created_at");
        assert!(sort_column(Some("is_booked")).is_err());
        // injection attempts are just unknown keys
        assert!(sort_column(Some("start_at; DROP TABLE doctor")).is_err());
    }

    #[test]
    fn sort_direction_is_enumerated() {
        assert_eq!(sort_direction(None).unwrap(), "ASC");
        assert_eq!(sort_direction(Some("asc")).unwrap(), "ASC");
        assert_eq!(sort_direction(Some("desc")).unwrap(), "DESC");
        assert!(sort_direction(Some("DESC; --")).is_err());
    }

    #[test]
    fn page_window_defaults_and_bounds() {
        assert_eq!(page_window(None, None).unwrap(), (1, DEFAULT_PAGE_LIMIT));
        assert_eq!(page_window(Some(3), Some(50)).unwrap(), (3, 50));
        assert!(page_window(Some(0), None).is_err());
        assert!(page_window(None, Some(0)).is_err());
        assert!(page_window(None, Some(MAX_PAGE_LIMIT + 1)).is_err());
    }

    #[test]
    fn date_and_time_parsing() {
        assert!(parse_date("start_date", "2024-01-01").is_ok());
        assert!(parse_date("start_date", "01/01/2024").is_err());
        assert!(parse_time("daily_start_time", "09:00").is_ok());
        assert!(parse_time("daily_start_time", "9am").is_err());
    }
}
