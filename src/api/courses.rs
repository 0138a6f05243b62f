//! Course handlers. Creating a course auto-generates its semesters from the
//! course duration (one year = two semesters).

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
    entities::{course, semester, university},
    unix_now,
};
use crate::error::{Result, ServerError};
use crate::ratelimit::policies;
use crate::slug::slugify;
use crate::validation::{validate_course, CoursePayload};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub university_id: Option<i32>,
}

/// GET /api/courses?universityId=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let mut select = course::Entity::find().order_by_desc(course::Column::CreatedAt);
    if let Some(university_id) = query.university_id {
        select = select.filter(course::Column::UniversityId.eq(university_id));
    }
    let courses = select.all(&state.db).await?;
    Ok(success(&courses))
}

/// Total semesters for a duration string: the first decimal number is read
/// as a year count, one year = two semesters. Unparseable durations yield 0.
fn semesters_for_duration(duration: &str) -> u32 {
    let mut number = String::new();
    for ch in duration.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
        } else if ch == '.' && !number.is_empty() && !number.contains('.') {
            number.push(ch);
        } else if !number.is_empty() {
            break;
        }
    }

    match number.trim_end_matches('.').parse::<f64>() {
        Ok(years) if years > 0.0 => (years * 2.0).floor() as u32,
        _ => 0,
    }
}

/// POST /api/courses - create with automatic semester generation
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CoursePayload>,
) -> Result<Response> {
    enforce_rate_limit(&state, &headers, "create", policies::CREATE)?;

    let input = validate_course(&payload).map_err(ServerError::Validation)?;

    // Parent must exist at creation time (checked, not transactional)
    university::Entity::find_by_id(input.university_id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("University"))?;

    let now = unix_now();
    let course = course::ActiveModel {
        university_id: Set(input.university_id),
        slug: Set(slugify(&input.name)),
        name: Set(input.name),
        code: Set(input.code),
        description: Set(input.description),
        duration: Set(input.duration),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let total_semesters = semesters_for_duration(&course.duration);
    if total_semesters > 0 {
        let semesters: Vec<semester::ActiveModel> = (1..=total_semesters)
            .map(|n| semester::ActiveModel {
                course_id: Set(course.id),
                number: Set(n as i32),
                name: Set(format!("Semester {}", n)),
                slug: Set(format!("semester-{}", n)),
                created_at: Set(now),
                ..Default::default()
            })
            .collect();
        semester::Entity::insert_many(semesters).exec(&state.db).await?;
    }

    Ok(created(
        &course,
        format!("Course created successfully with {} semesters", total_semesters),
    ))
}

/// GET /api/courses/:id - by numeric id, falling back to slug
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let mut course = match id.parse::<i32>() {
        Ok(n) => course::Entity::find_by_id(n).one(&state.db).await?,
        Err(_) => None,
    };

    if course.is_none() {
        course = course::Entity::find()
            .filter(course::Column::Slug.eq(id.to_lowercase()))
            .one(&state.db)
            .await?;
    }

    let course = course.ok_or(ServerError::NotFound("Course"))?;
    Ok(success(&course))
}

#[derive(Deserialize)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
}

/// PUT /api/courses/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CourseUpdate>,
) -> Result<Response> {
    let id = parse_id(&id, "course")?;

    let course = course::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ServerError::NotFound("Course"))?;

    let mut active: course::ActiveModel = course.clone().into();
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
    if let Some(description) = body.description {
        active.description = Set(description);
        changed = true;
    }
    if let Some(duration) = body.duration {
        active.duration = Set(duration);
        changed = true;
    }

    if !changed {
        return Ok(success(&course));
    }

    let updated = active.update(&state.db).await?;
    Ok(success(&updated))
}

/// DELETE /api/courses/:id - cascade delete
pub async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id, "course")?;
    let (course, summary) = state.cascade.delete_course(id).await?;
    Ok(cascade_deleted("Course", &course, summary))
}

#[cfg(test)]
mod tests {
    use super::semesters_for_duration;

    #[test]
    fn test_whole_years() {
        assert_eq!(semesters_for_duration("4 years"), 8);
        assert_eq!(semesters_for_duration("3 year"), 6);
        assert_eq!(semesters_for_duration("1"), 2);
    }

    #[test]
    fn test_fractional_years() {
        assert_eq!(semesters_for_duration("2.5 years"), 5);
        assert_eq!(semesters_for_duration("0.5 years"), 1);
        assert_eq!(semesters_for_duration("1.25 years"), 2);
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(semesters_for_duration("abc"), 0);
        assert_eq!(semesters_for_duration(""), 0);
        assert_eq!(semesters_for_duration("zero years"), 0);
    }

    #[test]
    fn test_number_embedded_in_text() {
        assert_eq!(semesters_for_duration("around 4 years total"), 8);
        assert_eq!(semesters_for_duration("4-year programme"), 8);
        assert_eq!(semesters_for_duration("2. years"), 4);
    }
}
