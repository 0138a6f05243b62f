//! University handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use super::{cascade_deleted, created, enforce_rate_limit, parse_id, success, AppState};
use crate::db::{entities::university, unix_now};
use crate::error::{Result, ServerError};
use crate::ratelimit::policies;
use crate::slug::slugify;
use crate::validation::{validate_university, UniversityPayload};

/// GET /api/universities
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Response> {
    let universities = university::Entity::find()
        .order_by_desc(university::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(success(&universities))
}

/// POST /api/universities
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UniversityPayload>,
) -> Result<Response> {
    enforce_rate_limit(&state, &headers, "create", policies::CREATE)?;

    let input = validate_university(&payload).map_err(ServerError::Validation)?;

    let university = university::ActiveModel {
        slug: Set(slugify(&input.name)),
        name: Set(input.name),
        description: Set(input.description),
        location: Set(input.location),
        logo: Set(input.logo),
        created_at: Set(unix_now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created(&university, "University created successfully"))
}

/// GET /api/universities/:id - by numeric id, falling back to slug
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let mut university = match id.parse::<i32>() {
        Ok(n) => university::Entity::find_by_id(n).one(&state.db).await?,
        Err(_) => None,
    };

    if university.is_none() {
        university = university::Entity::find()
            .filter(university::Column::Slug.eq(id.to_lowercase()))
            .one(&state.db)
            .await?;
    }

    let university = university.ok_or(ServerError::NotFound("University"))?;
    Ok(success(&university))
}

#[derive(Deserialize)]
pub struct UniversityUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub logo: Option<String>,
}

/// PUT /api/universities/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UniversityUpdate>,
) -> Result<Response> {
    let id = parse_id(&id, "university")?;

    let university = university::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("University"))?;

    let mut active: university::ActiveModel = university.clone().into();
    let mut changed = false;
    if let Some(name) = body.name {
        active.slug = Set(slugify(&name));
        active.name = Set(name);
        changed = true;
    }
    if let Some(description) = body.description {
        active.description = Set(description);
        changed = true;
    }
    if let Some(location) = body.location {
        active.location = Set(location);
        changed = true;
    }
    if let Some(logo) = body.logo {
        active.logo = Set(Some(logo));
        changed = true;
    }

    if !changed {
        return Ok(success(&university));
    }

    let updated = active.update(&state.db).await?;
    Ok(success(&updated))
}

/// DELETE /api/universities/:id - cascade delete
pub async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id, "university")?;
    let (university, summary) = state.cascade.delete_university(id).await?;
    Ok(cascade_deleted("University", &university, summary))
}
