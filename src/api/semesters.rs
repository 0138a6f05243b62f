//! Semester handlers. Semesters are normally generated by course creation;
//! the create endpoint exists for manual adjustments.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use super::{created, enforce_rate_limit, success, AppState};
use crate::db::{
    entities::{course, semester},
    unix_now,
};
use crate::error::{Result, ServerError};
use crate::ratelimit::policies;
use crate::slug::slugify;
use crate::validation::sanitize_string;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub course_id: Option<i32>,
}

/// GET /api/semesters?courseId=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let mut select = semester::Entity::find().order_by_asc(semester::Column::Number);
    if let Some(course_id) = query.course_id {
        select = select.filter(semester::Column::CourseId.eq(course_id));
    }
    let semesters = select.all(&state.db).await?;
    Ok(success(&semesters))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterPayload {
    pub course_id: Option<i32>,
    pub number: Option<i32>,
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// POST /api/semesters
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SemesterPayload>,
) -> Result<Response> {
    enforce_rate_limit(&state, &headers, "create", policies::CREATE)?;

    let mut errors = Vec::new();
    match payload.course_id {
        None => errors.push("Course ID is required".to_string()),
        Some(id) if id < 1 => errors.push("Invalid course ID format".to_string()),
        Some(_) => {}
    }
    match payload.number {
        None => errors.push("Semester number is required".to_string()),
        Some(n) if n < 1 => errors.push("Semester number must be positive".to_string()),
        Some(_) => {}
    }
    match payload.name.as_deref().map(str::trim) {
        None | Some("") => errors.push("Semester name is required".to_string()),
        Some(_) => {}
    }
    if !errors.is_empty() {
        return Err(ServerError::Validation(errors));
    }

    let course_id = payload.course_id.unwrap_or_default();
    course::Entity::find_by_id(course_id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("Course"))?;

    let name = sanitize_string(payload.name.as_deref().unwrap_or_default());
    let slug = payload
        .slug
        .as_deref()
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(&name));

    let semester = semester::ActiveModel {
        course_id: Set(course_id),
        number: Set(payload.number.unwrap_or_default()),
        name: Set(name),
        slug: Set(slug),
        created_at: Set(unix_now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created(&semester, "Semester created successfully"))
}

/// GET /api/semesters/:id - by numeric id, falling back to slug
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let mut semester = match id.parse::<i32>() {
        Ok(n) => semester::Entity::find_by_id(n).one(&state.db).await?,
        Err(_) => None,
    };

    if semester.is_none() {
        semester = semester::Entity::find()
            .filter(semester::Column::Slug.eq(id.to_lowercase()))
            .one(&state.db)
            .await?;
    }

    let semester = semester.ok_or(ServerError::NotFound("Semester"))?;
    Ok(success(&semester))
}
