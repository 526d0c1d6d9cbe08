use crate::models::AppState;
use axum::Router;

pub mod auth_routes;
pub mod doctor_routes;
pub mod schedule_routes;
pub mod specialty_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1/doctors", doctor_routes::router())
        .nest("/api/v1/specialties", specialty_routes::router())
        .nest("/api/v1/schedules", schedule_routes::router())
        .with_state(state)
}
