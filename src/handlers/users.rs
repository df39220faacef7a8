use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    models::{CreateUser, User},
    AppState,
};

pub async fn users_list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users =
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY last_name, first_name")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(form): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if form.email.trim().is_empty() || !form.email.contains('@') {
        return Err(ApiError::Validation("a valid email is required".to_string()));
    }
    if form.first_name.trim().is_empty() || form.last_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "first and last name are required".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, first_name, last_name) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(form.email.trim())
    .bind(form.first_name.trim())
    .bind(form.last_name.trim())
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Validation("a user with this email already exists".to_string())
        }
        _ => ApiError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}
