//! Cascade-delete coordinator for the catalog hierarchy.
//!
//! Deleting a University, Course, or Subject removes every descendant entity
//! (University ⇒ Courses ⇒ Semesters ⇒ Subjects ⇒ PDFs) and releases each
//! descendant PDF's stored file. The operation runs in three stages:
//!
//! 1. resolve - collect descendant id sets top-down
//! 2. release-external - delete stored objects, tolerating failures
//! 3. delete - bulk-delete rows strictly leaf-to-root
//!
//! Storage failures are counted in the summary but never abort the cascade;
//! a failed release leaves an orphaned stored object. Database failures are
//! fatal and abort the remaining stages, leaving the partial state for a
//! re-run to converge on: the leaf-to-root order guarantees a retry finds
//! fewer remaining descendants each time.

use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter};
use serde::Serialize;

use crate::db::entities::{course, pdf, semester, subject, university};
use crate::error::{Result, ServerError};
use crate::storage::StorageBackend;

/// Counts of what a cascade delete removed. Descendants only; the root
/// entity itself is returned separately.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub courses: u64,
    pub semesters: u64,
    pub subjects: u64,
    pub pdfs: u64,
    pub external_attempted: u64,
    pub external_released: u64,
}

struct Subtree {
    course_ids: Vec<i32>,
    semester_ids: Vec<i32>,
    subject_ids: Vec<i32>,
    pdfs: Vec<pdf::Model>,
}

/// Coordinates cascade deletes. Holds its own lock so that concurrent
/// deletes of overlapping subtrees cannot interleave their resolve and
/// delete stages.
pub struct CascadeCoordinator {
    db: DatabaseConnection,
    storage: Arc<dyn StorageBackend>,
    lock: tokio::sync::Mutex<()>,
}

impl CascadeCoordinator {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            db,
            storage,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Delete a university and everything beneath it.
    pub async fn delete_university(&self, id: i32) -> Result<(university::Model, DeleteSummary)> {
        let _guard = self.lock.lock().await;

        let subtree = self.resolve_university(id).await?;
        let mut summary = self.release_external(&subtree.pdfs).await;

        summary.pdfs = self.delete_pdfs(&subtree.subject_ids).await?;
        summary.subjects = self.delete_subjects(&subtree.semester_ids).await?;
        summary.semesters = self.delete_semesters(&subtree.course_ids).await?;
        summary.courses = course::Entity::delete_many()
            .filter(course::Column::UniversityId.eq(id))
            .exec(&self.db)
            .await?
            .rows_affected;

        let root = university::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(ServerError::NotFound("University"))?;
        root.clone().delete(&self.db).await?;

        Ok((root, summary))
    }

    /// Delete a course, its semesters, subjects, and PDFs.
    pub async fn delete_course(&self, id: i32) -> Result<(course::Model, DeleteSummary)> {
        let _guard = self.lock.lock().await;

        let subtree = self.resolve_course(id).await?;
        let mut summary = self.release_external(&subtree.pdfs).await;

        summary.pdfs = self.delete_pdfs(&subtree.subject_ids).await?;
        summary.subjects = self.delete_subjects(&subtree.semester_ids).await?;
        summary.semesters = semester::Entity::delete_many()
            .filter(semester::Column::CourseId.eq(id))
            .exec(&self.db)
            .await?
            .rows_affected;

        let root = course::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(ServerError::NotFound("Course"))?;
        root.clone().delete(&self.db).await?;

        Ok((root, summary))
    }

    /// Delete a subject and its PDFs.
    pub async fn delete_subject(&self, id: i32) -> Result<(subject::Model, DeleteSummary)> {
        let _guard = self.lock.lock().await;

        let pdfs = pdf::Entity::find()
            .filter(pdf::Column::SubjectId.eq(id))
            .all(&self.db)
            .await?;
        let mut summary = self.release_external(&pdfs).await;

        summary.pdfs = pdf::Entity::delete_many()
            .filter(pdf::Column::SubjectId.eq(id))
            .exec(&self.db)
            .await?
            .rows_affected;

        let root = subject::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(ServerError::NotFound("Subject"))?;
        root.clone().delete(&self.db).await?;

        Ok((root, summary))
    }

    /// Stage 1: resolve descendant id sets top-down.
    async fn resolve_university(&self, id: i32) -> Result<Subtree> {
        let course_ids: Vec<i32> = course::Entity::find()
            .filter(course::Column::UniversityId.eq(id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        self.resolve_below_courses(course_ids).await
    }

    async fn resolve_course(&self, id: i32) -> Result<Subtree> {
        self.resolve_below_courses(vec![id]).await
    }

    async fn resolve_below_courses(&self, course_ids: Vec<i32>) -> Result<Subtree> {
        let semester_ids: Vec<i32> = semester::Entity::find()
            .filter(semester::Column::CourseId.is_in(course_ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let subject_ids: Vec<i32> = subject::Entity::find()
            .filter(subject::Column::SemesterId.is_in(semester_ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let pdfs = pdf::Entity::find()
            .filter(pdf::Column::SubjectId.is_in(subject_ids.clone()))
            .all(&self.db)
            .await?;

        Ok(Subtree {
            course_ids,
            semester_ids,
            subject_ids,
            pdfs,
        })
    }

    /// Stage 2: release stored files. Each attempt is independent; failures
    /// are logged and counted, never fatal.
    async fn release_external(&self, pdfs: &[pdf::Model]) -> DeleteSummary {
        let mut summary = DeleteSummary::default();

        for pdf in pdfs {
            let Some(key) = &pdf.storage_key else {
                continue;
            };
            summary.external_attempted += 1;
            match self.storage.delete(key).await {
                Ok(()) => {
                    summary.external_released += 1;
                    tracing::debug!("Released stored file {}", key);
                }
                Err(e) => {
                    tracing::error!("Failed to release stored file {}: {}", key, e);
                }
            }
        }

        summary
    }

    /// Stage 3 helpers: bulk deletes, leaf-to-root.
    async fn delete_pdfs(&self, subject_ids: &[i32]) -> Result<u64> {
        Ok(pdf::Entity::delete_many()
            .filter(pdf::Column::SubjectId.is_in(subject_ids.to_vec()))
            .exec(&self.db)
            .await?
            .rows_affected)
    }

    async fn delete_subjects(&self, semester_ids: &[i32]) -> Result<u64> {
        Ok(subject::Entity::delete_many()
            .filter(subject::Column::SemesterId.is_in(semester_ids.to_vec()))
            .exec(&self.db)
            .await?
            .rows_affected)
    }

    async fn delete_semesters(&self, course_ids: &[i32]) -> Result<u64> {
        Ok(semester::Entity::delete_many()
            .filter(semester::Column::CourseId.is_in(course_ids.to_vec()))
            .exec(&self.db)
            .await?
            .rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, unix_now};
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use sea_orm::{ActiveModelTrait, PaginatorTrait, Set};
    use std::collections::HashSet;
    use tempfile::TempDir;

    use crate::storage::{StorageError, StorageResult};

    /// In-memory storage that records deletes and can be told to fail for
    /// specific keys.
    struct MockStorage {
        deleted: Mutex<Vec<String>>,
        fail_keys: HashSet<String>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                deleted: Mutex::new(Vec::new()),
                fail_keys: HashSet::new(),
            }
        }

        fn failing_on(keys: &[&str]) -> Self {
            Self {
                deleted: Mutex::new(Vec::new()),
                fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl StorageBackend for MockStorage {
        async fn get(&self, key: &str) -> StorageResult<Bytes> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn put(&self, _key: &str, _data: Bytes) -> StorageResult<()> {
            Ok(())
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            if self.fail_keys.contains(key) {
                return Err(StorageError::Other("simulated outage".to_string()));
            }
            self.deleted.lock().push(key.to_string());
            Ok(())
        }

        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(false)
        }
    }

    async fn test_db(dir: &TempDir) -> DatabaseConnection {
        db::init_database(&dir.path().join("test.db")).await.unwrap()
    }

    /// Seed a university with `n` courses × `m` semesters × `k` subjects ×
    /// `p` PDFs, every PDF bound to a stored object.
    async fn seed_tree(db: &DatabaseConnection, n: i32, m: i32, k: i32, p: i32) -> i32 {
        let now = unix_now();
        let uni = university::ActiveModel {
            name: Set("Test University".to_string()),
            slug: Set("test-university".to_string()),
            description: Set("Seeded for cascade tests".to_string()),
            location: Set("Testville".to_string()),
            logo: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        for c in 0..n {
            let course = course::ActiveModel {
                university_id: Set(uni.id),
                name: Set(format!("Course {}", c)),
                slug: Set(format!("course-{}", c)),
                code: Set(format!("C{}", c)),
                description: Set("A seeded course".to_string()),
                duration: Set("4 years".to_string()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await
            .unwrap();

            for s in 0..m {
                let sem = semester::ActiveModel {
                    course_id: Set(course.id),
                    number: Set(s + 1),
                    name: Set(format!("Semester {}", s + 1)),
                    slug: Set(format!("semester-{}", s + 1)),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(db)
                .await
                .unwrap();

                for j in 0..k {
                    let subj = subject::ActiveModel {
                        course_id: Set(course.id),
                        semester_id: Set(sem.id),
                        name: Set(format!("Subject {}", j)),
                        slug: Set(format!("subject-{}", j)),
                        code: Set(format!("S{}", j)),
                        credits: Set(4),
                        description: Set("A seeded subject".to_string()),
                        created_at: Set(now),
                        ..Default::default()
                    }
                    .insert(db)
                    .await
                    .unwrap();

                    for q in 0..p {
                        pdf::ActiveModel {
                            subject_id: Set(subj.id),
                            title: Set(format!("PDF {}", q)),
                            description: Set("A seeded document".to_string()),
                            file_name: Set(format!("doc-{}.pdf", q)),
                            file_url: Set(format!("/files/key-{}-{}-{}", c, j, q)),
                            file_size: Set(1024),
                            storage_key: Set(Some(format!("key-{}-{}-{}-{}", c, s, j, q))),
                            category: Set(pdf::PdfCategory::Notes),
                            uploaded_at: Set(now),
                            updated_at: Set(now),
                            ..Default::default()
                        }
                        .insert(db)
                        .await
                        .unwrap();
                    }
                }
            }
        }

        uni.id
    }

    #[tokio::test]
    async fn test_university_cascade_counts() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;
        let uni_id = seed_tree(&db, 2, 3, 2, 2).await;

        let coordinator = CascadeCoordinator::new(db.clone(), Arc::new(MockStorage::new()));
        let (root, summary) = coordinator.delete_university(uni_id).await.unwrap();

        assert_eq!(root.id, uni_id);
        assert_eq!(summary.courses, 2);
        assert_eq!(summary.semesters, 6);
        assert_eq!(summary.subjects, 12);
        assert_eq!(summary.pdfs, 24);
        assert_eq!(summary.external_attempted, 24);
        assert_eq!(summary.external_released, 24);

        // Nothing left behind
        assert_eq!(university::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(course::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(semester::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(subject::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(pdf::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_not_found() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;
        seed_tree(&db, 1, 1, 1, 1).await;

        let coordinator = CascadeCoordinator::new(db.clone(), Arc::new(MockStorage::new()));
        match coordinator.delete_university(9999).await {
            Err(ServerError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|(_, s)| s)),
        }

        // The other university's tree is untouched
        assert_eq!(course::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(pdf::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;
        let uni_id = seed_tree(&db, 1, 1, 1, 3).await;

        let storage = Arc::new(MockStorage::failing_on(&["key-0-0-0-1"]));
        let coordinator = CascadeCoordinator::new(db.clone(), storage.clone());
        let (_, summary) = coordinator.delete_university(uni_id).await.unwrap();

        assert_eq!(summary.external_attempted, 3);
        assert_eq!(summary.external_released, 2);
        assert_eq!(storage.deleted.lock().len(), 2);
        assert_eq!(summary.pdfs, 3);
        assert_eq!(pdf::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_course_cascade_leaves_siblings() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;
        seed_tree(&db, 2, 2, 1, 1).await;

        let first_course = course::Entity::find().all(&db).await.unwrap()[0].clone();
        let coordinator = CascadeCoordinator::new(db.clone(), Arc::new(MockStorage::new()));
        let (_, summary) = coordinator.delete_course(first_course.id).await.unwrap();

        assert_eq!(summary.semesters, 2);
        assert_eq!(summary.subjects, 2);
        assert_eq!(summary.pdfs, 2);
        assert_eq!(course::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(semester::Entity::find().count(&db).await.unwrap(), 2);
        assert_eq!(university::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_subject_cascade() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;
        seed_tree(&db, 1, 1, 2, 3).await;

        let subj = subject::Entity::find().all(&db).await.unwrap()[0].clone();
        let coordinator = CascadeCoordinator::new(db.clone(), Arc::new(MockStorage::new()));
        let (root, summary) = coordinator.delete_subject(subj.id).await.unwrap();

        assert_eq!(root.id, subj.id);
        assert_eq!(summary.pdfs, 3);
        assert_eq!(summary.external_attempted, 3);
        assert_eq!(subject::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(pdf::Entity::find().count(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pdfs_without_storage_key_are_skipped() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;
        let uni_id = seed_tree(&db, 1, 1, 1, 0).await;

        let subj = subject::Entity::find().all(&db).await.unwrap()[0].clone();
        pdf::ActiveModel {
            subject_id: Set(subj.id),
            title: Set("External link only".to_string()),
            description: Set("No stored object bound".to_string()),
            file_name: Set("link.pdf".to_string()),
            file_url: Set("https://example.com/link.pdf".to_string()),
            file_size: Set(10),
            storage_key: Set(None),
            category: Set(pdf::PdfCategory::Other),
            uploaded_at: Set(unix_now()),
            updated_at: Set(unix_now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let coordinator = CascadeCoordinator::new(db.clone(), Arc::new(MockStorage::new()));
        let (_, summary) = coordinator.delete_university(uni_id).await.unwrap();

        assert_eq!(summary.pdfs, 1);
        assert_eq!(summary.external_attempted, 0);
        assert_eq!(summary.external_released, 0);
    }
}
