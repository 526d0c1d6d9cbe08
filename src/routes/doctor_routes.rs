// src/routes/doctor_routes.rs

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    auth::hash_password,
    error::{is_unique_violation, ApiError},
    middleware::auth_context::AuthContext,
    models::{AppState, OkData, OkResponse, ROLE_ADMIN, ROLE_DOCTOR},
};

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
            "Only admin can manage doctors".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        // /api/v1/doctors
        .route("/", get(list_doctors).post(create_doctor))
        // /api/v1/doctors/{doctor_id}
        .route(
            "/{doctor_id}",
            get(get_doctor).patch(update_doctor).delete(delete_doctor),
        )
}

/* ============================================================
   Response DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct SpecialtyBrief {
    pub specialty_id: Uuid,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Serialize)]
pub struct SpecialtyLinkDto {
    pub specialty_id: Uuid,
    pub specialty: SpecialtyBrief,
}

#[derive(Debug, Serialize)]
pub struct DoctorDetailDto {
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub registration_number: String,
    pub experience_years: i32,
    pub gender: i16,
    pub about: Option<String>,
    pub appointment_fee_cents: i32,
    pub qualification: Option<String>,
    pub designation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub specialty_links: Vec<SpecialtyLinkDto>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DoctorListItem {
    pub doctor_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_number: String,
    pub designation: Option<String>,
    pub created_at: DateTime<Utc>,
}

/* ============================================================
   Specialty set reconciliation
   ============================================================ */

/// Drop duplicate ids, keeping first-seen order.
fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Ids in `requested` that are not in `found`, in request order.
fn missing_ids(requested: &[Uuid], found: &HashSet<Uuid>) -> Vec<Uuid> {
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect()
}

/// Move a doctor's specialty membership to `(current - remove) + add`,
/// inside the caller's transaction.
///
/// Removals are applied before additions. Removing a link the doctor does
/// not hold, or adding an unknown specialty id, fails the whole operation
/// with the complete offending id list; re-adding an already-held
/// specialty is a silent no-op.
pub async fn reconcile_specialties(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    doctor_id: Uuid,
    add_ids: &[Uuid],
    remove_ids: &[Uuid],
) -> Result<(), ApiError> {
    let remove_ids = dedup_ids(remove_ids);
    if !remove_ids.is_empty() {
        let held: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT specialty_id
            FROM doctor_specialty
            WHERE doctor_id = $1
              AND specialty_id = ANY($2)
            "#,
        )
        .bind(doctor_id)
        .bind(&remove_ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

        let held: HashSet<Uuid> = held.into_iter().collect();
        let missing = missing_ids(&remove_ids, &held);
        if !missing.is_empty() {
            return Err(ApiError::invalid_reference("doctor specialty", &missing));
        }

        sqlx::query(
            r#"
            DELETE FROM doctor_specialty
            WHERE doctor_id = $1
              AND specialty_id = ANY($2)
            "#,
        )
        .bind(doctor_id)
        .bind(&remove_ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
    }

    let add_ids = dedup_ids(add_ids);
    if !add_ids.is_empty() {
        let known: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT specialty_id
            FROM specialty
            WHERE specialty_id = ANY($1)
            "#,
        )
        .bind(&add_ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

        let known: HashSet<Uuid> = known.into_iter().collect();
        let missing = missing_ids(&add_ids, &known);
        if !missing.is_empty() {
            return Err(ApiError::invalid_reference("specialty", &missing));
        }

        let existing: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT specialty_id
            FROM doctor_specialty
            WHERE doctor_id = $1
              AND specialty_id = ANY($2)
            "#,
        )
        .bind(doctor_id)
        .bind(&add_ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

        let existing: HashSet<Uuid> = existing.into_iter().collect();

        // ON CONFLICT covers a concurrent insert of the same pair; the
        // composite PK is the final arbiter of "already linked".
        for specialty_id in add_ids.iter().filter(|id| !existing.contains(id)) {
            sqlx::query(
                r#"
                INSERT INTO doctor_specialty (specialty_id, doctor_id)
                VALUES ($1, $2)
                ON CONFLICT (specialty_id, doctor_id) DO NOTHING
                "#,
            )
            .bind(specialty_id)
            .bind(doctor_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
        }
    }

    Ok(())
}

/* ============================================================
   Shared read-back: profile joined with specialty links
   ============================================================ */

pub async fn load_doctor_detail(
    db: &sqlx::PgPool,
    doctor_id: Uuid,
) -> Result<DoctorDetailDto, ApiError> {
    let rows = sqlx::query(
        r#"
        SELECT
          d.doctor_id,
          d.user_id,
          d.first_name,
          d.last_name,
          d.email,
          d.phone,
          d.address,
          d.registration_number,
          d.experience_years,
          d.gender,
          d.about,
          d.appointment_fee_cents,
          d.qualification,
          d.designation,
          d.created_at,
          d.updated_at,

          s.specialty_id AS sp_id,
          s.title        AS sp_title,
          s.icon         AS sp_icon

        FROM doctor d
        LEFT JOIN doctor_specialty ds ON ds.doctor_id = d.doctor_id
        LEFT JOIN specialty s ON s.specialty_id = ds.specialty_id

        WHERE d.doctor_id = $1
          AND d.is_deleted = false

        ORDER BY s.title ASC
        "#,
    )
    .bind(doctor_id)
    .fetch_all(db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    fold_rows_into_detail(rows)?.ok_or_else(|| ApiError::not_found("doctor"))
}

fn fold_rows_into_detail(
    rows: Vec<sqlx::postgres::PgRow>,
) -> Result<Option<DoctorDetailDto>, ApiError> {
    let mut detail: Option<DoctorDetailDto> = None;

    for r in rows {
        if detail.is_none() {
            detail = Some(DoctorDetailDto {
                doctor_id: r.try_get("doctor_id").map_err(internal_row)?,
                user_id: r.try_get("user_id").map_err(internal_row)?,
                first_name: r.try_get("first_name").map_err(internal_row)?,
                last_name: r.try_get("last_name").map_err(internal_row)?,
                email: r.try_get("email").map_err(internal_row)?,
                phone: r.try_get("phone").map_err(internal_row)?,
                address: r.try_get("address").map_err(internal_row)?,
                registration_number: r.try_get("registration_number").map_err(internal_row)?,
                experience_years: r.try_get("experience_years").map_err(internal_row)?,
                gender: r.try_get("gender").map_err(internal_row)?,
                about: r.try_get("about").map_err(internal_row)?,
                appointment_fee_cents: r
                    .try_get("appointment_fee_cents")
                    .map_err(internal_row)?,
                qualification: r.try_get("qualification").map_err(internal_row)?,
                designation: r.try_get("designation").map_err(internal_row)?,
                created_at: r.try_get("created_at").map_err(internal_row)?,
                updated_at: r.try_get("updated_at").map_err(internal_row)?,
                specialty_links: vec![],
            });
        }

        // LEFT JOIN: a doctor with no specialties yields one row of NULLs here
        let sp_id: Option<Uuid> = r.try_get("sp_id").ok().flatten();
        if let Some(specialty_id) = sp_id {
            let title: String = r.try_get("sp_title").map_err(internal_row)?;
            let icon: String = r.try_get("sp_icon").map_err(internal_row)?;
            if let Some(d) = detail.as_mut() {
                d.specialty_links.push(SpecialtyLinkDto {
                    specialty_id,
                    specialty: SpecialtyBrief {
                        specialty_id,
                        title,
                        icon,
                    },
                });
            }
        }
    }

    Ok(detail)
}

fn internal_row(e: sqlx::Error) -> ApiError {
    ApiError::Internal(format!("row decode error: {e}"))
}

/* ============================================================
   Validation
   ============================================================ */

fn validate_email(email: &str) -> Result<(), ApiError> {
    let e = email.trim();
    if e.is_empty() || !e.contains('@') {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "a valid email is required".into(),
        ));
    }
    Ok(())
}

fn validate_password(pw: &str) -> Result<(), ApiError> {
    if pw.trim().len() < 8 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

fn validate_name(label: &str, name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("{label} is required"),
        ));
    }
    Ok(())
}

fn validate_gender(gender: i16) -> Result<(), ApiError> {
    if !(0..=2).contains(&gender) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "gender must be 0,1,2".into(),
        ));
    }
    Ok(())
}

fn validate_non_negative(label: &str, v: i32) -> Result<(), ApiError> {
    if v < 0 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("{label} must be >= 0"),
        ));
    }
    Ok(())
}

/* ============================================================
   POST /doctors (create)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateDoctorRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub registration_number: String,
    pub experience_years: Option<i32>,
    pub gender: Option<i16>,
    pub about: Option<String>,
    pub appointment_fee_cents: Option<i32>,
    pub qualification: Option<String>,
    pub designation: Option<String>,
    pub specialty_ids: Option<Vec<Uuid>>,
}

pub async fn create_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateDoctorRequest>,
) -> Result<Json<ApiOk<DoctorDetailDto>>, ApiError> {
    ensure_admin(&auth)?;

    validate_email(&req.email)?;
    validate_password(&req.password)?;
    validate_name("first_name", &req.first_name)?;
    validate_name("last_name", &req.last_name)?;
    validate_name("registration_number", &req.registration_number)?;
    let gender = req.gender.unwrap_or(0);
    validate_gender(gender)?;
    let experience_years = req.experience_years.unwrap_or(0);
    validate_non_negative("experience_years", experience_years)?;
    let fee_cents = req.appointment_fee_cents.unwrap_or(0);
    validate_non_negative("appointment_fee_cents", fee_cents)?;

    let email = req.email.trim().to_lowercase();
    let pw_hash = hash_password(req.password.trim()).map_err(ApiError::Internal)?;

    // Credential record, profile record and initial specialty set commit
    // together or not at all.
    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO app_user (email, password_hash, role)
        VALUES ($1, $2, $3)
        RETURNING user_id
        "#,
    )
    .bind(&email)
    .bind(&pw_hash)
    .bind(ROLE_DOCTOR)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::email_taken()
        } else {
            ApiError::Internal(format!("db error: {e}"))
        }
    })?;

    let doctor_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO doctor (
          user_id,
          first_name,
          last_name,
          email,
          phone,
          address,
          registration_number,
          experience_years,
          gender,
          about,
          appointment_fee_cents,
          qualification,
          designation
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
        RETURNING doctor_id
        "#,
    )
    .bind(user_id)
    .bind(req.first_name.trim())
    .bind(req.last_name.trim())
    .bind(&email)
    .bind(req.phone.as_deref())
    .bind(req.address.as_deref())
    .bind(req.registration_number.trim())
    .bind(experience_years)
    .bind(gender)
    .bind(req.about.as_deref())
    .bind(fee_cents)
    .bind(req.qualification.as_deref())
    .bind(req.designation.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::email_taken()
        } else {
            ApiError::Internal(format!("db error: {e}"))
        }
    })?;

    if let Some(ids) = req.specialty_ids.as_deref() {
        reconcile_specialties(&mut tx, doctor_id, ids, &[]).await?;
    }

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tracing::info!(%doctor_id, "doctor created");

    let detail = load_doctor_detail(&state.db, doctor_id).await?;
    Ok(Json(ApiOk { data: detail }))
}

/* ============================================================
   PATCH /doctors/{doctor_id}
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct UpdateDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub registration_number: Option<String>,
    pub experience_years: Option<i32>,
    pub gender: Option<i16>,
    pub about: Option<String>,
    pub appointment_fee_cents: Option<i32>,
    pub qualification: Option<String>,
    pub designation: Option<String>,
    pub add_specialty_ids: Option<Vec<Uuid>>,
    pub remove_specialty_ids: Option<Vec<Uuid>>,
}

impl UpdateDoctorRequest {
    fn has_profile_patch(&self) -> bool {
        self.first_name.is_some()
            || self.last_name.is_some()
            || self.phone.is_some()
            || self.address.is_some()
            || self.registration_number.is_some()
            || self.experience_years.is_some()
            || self.gender.is_some()
            || self.about.is_some()
            || self.appointment_fee_cents.is_some()
            || self.qualification.is_some()
            || self.designation.is_some()
    }
}

pub async fn update_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(doctor_id): Path<Uuid>,
    Json(req): Json<UpdateDoctorRequest>,
) -> Result<Json<ApiOk<DoctorDetailDto>>, ApiError> {
    // Admin can edit any doctor; a doctor may only edit themselves.
    if !is_admin(&auth) {
        if !is_doctor(&auth) {
            return Err(ApiError::Forbidden(
                "FORBIDDEN",
                "Only admin or the doctor can edit this profile".into(),
            ));
        }
        let own = resolve_doctor_id_by_user_id(&state, auth.user_id).await?;
        if own != doctor_id {
            return Err(ApiError::Forbidden(
                "FORBIDDEN",
                "Doctor can only edit their own profile".into(),
            ));
        }
    }

    if let Some(s) = req.first_name.as_deref() {
        validate_name("first_name", s)?;
    }
    if let Some(s) = req.last_name.as_deref() {
        validate_name("last_name", s)?;
    }
    if let Some(s) = req.registration_number.as_deref() {
        validate_name("registration_number", s)?;
    }
    if let Some(g) = req.gender {
        validate_gender(g)?;
    }
    if let Some(y) = req.experience_years {
        validate_non_negative("experience_years", y)?;
    }
    if let Some(f) = req.appointment_fee_cents {
        validate_non_negative("appointment_fee_cents", f)?;
    }

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let exists: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT doctor_id
        FROM doctor
        WHERE doctor_id = $1
          AND is_deleted = false
        "#,
    )
    .bind(doctor_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if exists.is_none() {
        return Err(ApiError::not_found("doctor"));
    }

    if req.has_profile_patch() {
        sqlx::query(
            r#"
            UPDATE doctor
            SET
              first_name            = COALESCE($2, first_name),
              last_name             = COALESCE($3, last_name),
              phone                 = COALESCE($4, phone),
              address               = COALESCE($5, address),
              registration_number   = COALESCE($6, registration_number),
              experience_years      = COALESCE($7, experience_years),
              gender                = COALESCE($8, gender),
              about                 = COALESCE($9, about),
              appointment_fee_cents = COALESCE($10, appointment_fee_cents),
              qualification         = COALESCE($11, qualification),
              designation           = COALESCE($12, designation),
              updated_at = now()
            WHERE doctor_id = $1
            "#,
        )
        .bind(doctor_id)
        .bind(req.first_name.as_deref().map(str::trim))
        .bind(req.last_name.as_deref().map(str::trim))
        .bind(req.phone.as_deref())
        .bind(req.address.as_deref())
        .bind(req.registration_number.as_deref().map(str::trim))
        .bind(req.experience_years)
        .bind(req.gender)
        .bind(req.about.as_deref())
        .bind(req.appointment_fee_cents)
        .bind(req.qualification.as_deref())
        .bind(req.designation.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
    }

    // Any reconciler failure rolls the profile patch back with it.
    reconcile_specialties(
        &mut tx,
        doctor_id,
        req.add_specialty_ids.as_deref().unwrap_or(&[]),
        req.remove_specialty_ids.as_deref().unwrap_or(&[]),
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let detail = load_doctor_detail(&state.db, doctor_id).await?;
    Ok(Json(ApiOk { data: detail }))
}

/* ============================================================
   Read surface
   ============================================================ */

pub async fn get_doctor(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<ApiOk<DoctorDetailDto>>, ApiError> {
    let detail = load_doctor_detail(&state.db, doctor_id).await?;
    Ok(Json(ApiOk { data: detail }))
}

pub async fn list_doctors(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<ApiOk<Vec<DoctorListItem>>>, ApiError> {
    let rows: Vec<DoctorListItem> = sqlx::query_as::<_, DoctorListItem>(
        r#"
        SELECT doctor_id, first_name, last_name, email, registration_number, designation, created_at
        FROM doctor
        WHERE is_deleted = false
        ORDER BY created_at DESC
        LIMIT 200
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: rows }))
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    let res = sqlx::query(
        r#"
        UPDATE doctor
        SET is_deleted = true,
            updated_at = now()
        WHERE doctor_id = $1
          AND is_deleted = false
        "#,
    )
    .bind(doctor_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("doctor"));
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

/// Doctor accounts map 1:1 to a doctor row via app_user.user_id.
pub async fn resolve_doctor_id_by_user_id(
    state: &AppState,
    user_id: Uuid,
) -> Result<Uuid, ApiError> {
    let doctor_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT doctor_id
        FROM doctor
        WHERE user_id = $1
          AND is_deleted = false
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    doctor_id.ok_or_else(|| {
        ApiError::BadRequest(
            "NO_DOCTOR_PROFILE",
            "Doctor account has no doctor profile".into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_ids(&[a, b, a, b, a]), vec![a, b]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[test]
    fn missing_ids_reports_all_misses_in_request_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let found: HashSet<Uuid> = [b].into_iter().collect();
        assert_eq!(missing_ids(&[a, b, c], &found), vec![a, c]);
        assert!(missing_ids(&[b], &found).is_empty());
    }

    #[test]
    fn gender_and_amount_validation() {
        assert!(validate_gender(0).is_ok());
        assert!(validate_gender(2).is_ok());
        assert!(validate_gender(3).is_err());
        assert!(validate_non_negative("fee", 0).is_ok());
        assert!(validate_non_negative("fee", -1).is_err());
    }

    #[test]
    fn email_and_password_validation() {
        assert!(validate_email("doc@clinic.example").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("  ").is_err());
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn empty_patch_is_detected() {
        let req = UpdateDoctorRequest {
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            registration_number: None,
            experience_years: None,
            gender: None,
            about: None,
            appointment_fee_cents: None,
            qualification: None,
            designation: None,
            add_specialty_ids: Some(vec![Uuid::new_v4()]),
            remove_specialty_ids: None,
        };
        assert!(!req.has_profile_patch());

        let req = UpdateDoctorRequest {
            phone: Some("555-0100".into()),
            ..req
        };
        assert!(req.has_profile_patch());
    }
}
