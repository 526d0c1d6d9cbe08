// src/routes/specialty_routes.rs

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ROLE_ADMIN},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage specialties".into(),
        ))
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SpecialtyRow {
    pub specialty_id: Uuid,
    pub title: String,
    pub icon: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct CreateSpecialtyRequest {
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSpecialtyRequest {
    pub title: Option<String>,
    pub icon: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        // /api/v1/specialties
        .route("/", get(list_specialties).post(create_specialty))
        // /api/v1/specialties/{specialty_id}
        .route("/{specialty_id}", get(get_specialty).patch(update_specialty))
    // No delete route: a specialty may only disappear once no doctor
    // references it, which is handled outside this service.
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "title is required".into(),
        ));
    }
    Ok(())
}

pub async fn create_specialty(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateSpecialtyRequest>,
) -> Result<Json<ApiOk<SpecialtyRow>>, ApiError> {
    ensure_admin(&auth)?;
    validate_title(&req.title)?;

    let row: SpecialtyRow = sqlx::query_as::<_, SpecialtyRow>(
        r#"
        INSERT INTO specialty (title, icon)
        VALUES ($1, $2)
        RETURNING specialty_id, title, icon, created_at, updated_at
        "#,
    )
    .bind(req.title.trim())
    .bind(req.icon.trim())
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: row }))
}

pub async fn list_specialties(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<ApiOk<Vec<SpecialtyRow>>>, ApiError> {
    let rows: Vec<SpecialtyRow> = sqlx::query_as::<_, SpecialtyRow>(
        r#"
        SELECT specialty_id, title, icon, created_at, updated_at
        FROM specialty
        ORDER BY title ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: rows }))
}

pub async fn get_specialty(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(specialty_id): Path<Uuid>,
) -> Result<Json<ApiOk<SpecialtyRow>>, ApiError> {
    let row: SpecialtyRow = sqlx::query_as::<_, SpecialtyRow>(
        r#"
        SELECT specialty_id, title, icon, created_at, updated_at
        FROM specialty
        WHERE specialty_id = $1
        "#,
    )
    .bind(specialty_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("specialty"))?;

    Ok(Json(ApiOk { data: row }))
}

/// Title/icon edits only; a referenced specialty is otherwise immutable.
pub async fn update_specialty(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(specialty_id): Path<Uuid>,
    Json(req): Json<UpdateSpecialtyRequest>,
) -> Result<Json<ApiOk<SpecialtyRow>>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(t) = req.title.as_deref() {
        validate_title(t)?;
    }

    let row: SpecialtyRow = sqlx::query_as::<_, SpecialtyRow>(
        r#"
        UPDATE specialty
        SET title = COALESCE($2, title),
            icon  = COALESCE($3, icon),
            updated_at = now()
        WHERE specialty_id = $1
        RETURNING specialty_id, title, icon, created_at, updated_at
        "#,
    )
    .bind(specialty_id)
    .bind(req.title.as_deref().map(str::trim))
    .bind(req.icon.as_deref().map(str::trim))
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("specialty"))?;

    Ok(Json(ApiOk { data: row }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_must_not_be_blank() {
        assert!(validate_title("Cardiology").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }
}
