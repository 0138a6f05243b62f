//! Subject handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use super::{cascade_deleted, created, enforce_rate_limit, parse_id, success, AppState};
use crate::db::{
    entities::{semester, subject},
    unix_now,
};
use crate::error::{Result, ServerError};
use crate::ratelimit::policies;
use crate::slug::slugify;
use crate::validation::{validate_subject, SubjectPayload};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub semester_id: Option<i32>,
}

/// GET /api/subjects?semesterId=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let mut select = subject::Entity::find().order_by_desc(subject::Column::CreatedAt);
    if let Some(semester_id) = query.semester_id {
        select = select.filter(subject::Column::SemesterId.eq(semester_id));
    }
    let subjects = select.all(&state.db).await?;
    Ok(success(&subjects))
}

/// POST /api/subjects
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SubjectPayload>,
) -> Result<Response> {
    enforce_rate_limit(&state, &headers, "create", policies::CREATE)?;

    let input = validate_subject(&payload).map_err(ServerError::Validation)?;

    // Parent must exist at creation time, and carry the course reference
    // the caller named.
    let semester = semester::Entity::find_by_id(input.semester_id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("Semester"))?;
    if semester.course_id != input.course_id {
        return Err(ServerError::Validation(vec![
            "Course ID does not match the semester's course".to_string(),
        ]));
    }

    let subject = subject::ActiveModel {
        course_id: Set(input.course_id),
        semester_id: Set(input.semester_id),
        slug: Set(slugify(&input.name)),
        name: Set(input.name),
        code: Set(input.code),
        credits: Set(input.credits),
        description: Set(input.description),
        created_at: Set(unix_now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created(&subject, "Subject created successfully"))
}

/// GET /api/subjects/:id - by numeric id, falling back to slug
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let mut subject = match id.parse::<i32>() {
        Ok(n) => subject::Entity::find_by_id(n).one(&state.db).await?,
        Err(_) => None,
    };

    if subject.is_none() {
        subject = subject::Entity::find()
            .filter(subject::Column::Slug.eq(id.to_lowercase()))
            .one(&state.db)
            .await?;
    }

    let subject = subject.ok_or(ServerError::NotFound("Subject"))?;
    Ok(success(&subject))
}

#[derive(Deserialize)]
pub struct SubjectUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<i32>,
    pub description: Option<String>,
}

/// PUT /api/subjects/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SubjectUpdate>,
) -> Result<Response> {
    let id = parse_id(&id, "subject")?;

    let subject = subject::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("Subject"))?;

    let mut active: subject::ActiveModel = subject.clone().into();
    let mut changed = false;
    if let Some(name) = body.name {
        active.slug = Set(slugify(&name));
        active.name = Set(name);
        changed = true;
    }
    if let Some(code) = body.code {
        active.code = Set(code);
        changed = true;
    }
    if let Some(credits) = body.credits {
        active.credits = Set(credits);
        changed = true;
    }
    if let Some(description) = body.description {
        active.description = Set(description);
        changed = true;
    }

    if !changed {
        return Ok(success(&subject));
    }

    let updated = active.update(&state.db).await?;
    Ok(success(&updated))
}

/// DELETE /api/subjects/:id - cascade delete of the subject's PDFs
pub async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id, "subject")?;
    let (subject, summary) = state.cascade.delete_subject(id).await?;
    Ok(cascade_deleted("Subject", &subject, summary))
}
