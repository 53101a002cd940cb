//! In-process persistence gateway.
//!
//! Mirrors the relational schema's constraints (foreign keys and one status per course)
//! so the service behaves the same against it as against PostgreSQL. A writer holds the
//! store lock for its whole lifetime, which serializes transactions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::domain::{
    CourseStatus, CourseStatusId, Student, StudentCourse, StudentCourseId, StudentId,
    StudentSearchCondition,
};
use super::repository::{RepositoryError, StudentRepository, StudentWriter};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    students: BTreeMap<StudentId, Student>,
    courses: BTreeMap<StudentCourseId, StudentCourse>,
    statuses: BTreeMap<CourseStatusId, CourseStatus>,
    last_student_id: StudentId,
    last_course_id: StudentCourseId,
    last_status_id: CourseStatusId,
}

impl MemoryState {
    fn status_for_course(&self, course_id: StudentCourseId) -> Option<&CourseStatus> {
        self.statuses
            .values()
            .find(|status| status.student_course_id == Some(course_id))
    }

    fn course_ids_of(&self, student_id: StudentId) -> Vec<StudentCourseId> {
        self.courses
            .values()
            .filter(|course| course.student_id == Some(student_id))
            .filter_map(|course| course.id)
            .collect()
    }

    fn check_status_reference(
        &self,
        status: &CourseStatus,
    ) -> Result<StudentCourseId, RepositoryError> {
        let course_id = status
            .student_course_id
            .filter(|id| self.courses.contains_key(id))
            .ok_or_else(|| {
                RepositoryError::ConstraintViolation(
                    "course_statuses.student_course_id must reference an existing course"
                        .to_string(),
                )
            })?;

        if let Some(existing) = self.status_for_course(course_id) {
            if existing.id != status.id {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "course {course_id} already has a status"
                )));
            }
        }

        Ok(course_id)
    }
}

/// Shared in-memory store. Clones point at the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStudentRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepository for MemoryStudentRepository {
    type Writer = MemoryWriter;

    async fn begin(&self) -> Result<Self::Writer, RepositoryError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryWriter { guard, staged })
    }

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.students.values().cloned().collect())
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.students.get(&id).cloned())
    }

    async fn search_students(
        &self,
        condition: &StudentSearchCondition,
    ) -> Result<Vec<Student>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .students
            .values()
            .filter(|student| condition.matches_student(student))
            .cloned()
            .collect())
    }

    async fn list_courses(&self) -> Result<Vec<StudentCourse>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.courses.values().cloned().collect())
    }

    async fn list_courses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<StudentCourse>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .courses
            .values()
            .filter(|course| course.student_id == Some(student_id))
            .cloned()
            .collect())
    }

    async fn get_course(
        &self,
        id: StudentCourseId,
    ) -> Result<Option<StudentCourse>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.courses.get(&id).cloned())
    }

    async fn list_statuses(&self) -> Result<Vec<CourseStatus>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.statuses.values().cloned().collect())
    }

    async fn list_statuses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<CourseStatus>, RepositoryError> {
        let state = self.state.lock().await;
        let course_ids = state.course_ids_of(student_id);
        Ok(state
            .statuses
            .values()
            .filter(|status| {
                status
                    .student_course_id
                    .is_some_and(|id| course_ids.contains(&id))
            })
            .cloned()
            .collect())
    }

    async fn get_status_by_course(
        &self,
        student_course_id: StudentCourseId,
    ) -> Result<Option<CourseStatus>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.status_for_course(student_course_id).cloned())
    }
}

/// Transaction over [`MemoryStudentRepository`]. Writes go to a staged copy that
/// replaces the shared state on commit.
pub struct MemoryWriter {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StudentWriter for MemoryWriter {
    async fn insert_student(&mut self, student: &Student) -> Result<StudentId, RepositoryError> {
        self.staged.last_student_id += 1;
        let id = self.staged.last_student_id;
        let stored = Student {
            id: Some(id),
            is_deleted: false,
            ..student.clone()
        };
        self.staged.students.insert(id, stored);
        Ok(id)
    }

    async fn insert_course(
        &mut self,
        course: &StudentCourse,
    ) -> Result<StudentCourseId, RepositoryError> {
        let owner_exists = course
            .student_id
            .is_some_and(|id| self.staged.students.contains_key(&id));
        if !owner_exists {
            return Err(RepositoryError::ConstraintViolation(
                "students_courses.student_id must reference an existing student".to_string(),
            ));
        }

        self.staged.last_course_id += 1;
        let id = self.staged.last_course_id;
        let stored = StudentCourse {
            id: Some(id),
            course_status: None,
            ..course.clone()
        };
        self.staged.courses.insert(id, stored);
        Ok(id)
    }

    async fn insert_status(
        &mut self,
        status: &CourseStatus,
    ) -> Result<CourseStatusId, RepositoryError> {
        let candidate = CourseStatus {
            id: None,
            ..status.clone()
        };
        self.staged.check_status_reference(&candidate)?;

        self.staged.last_status_id += 1;
        let id = self.staged.last_status_id;
        self.staged.statuses.insert(
            id,
            CourseStatus {
                id: Some(id),
                ..candidate
            },
        );
        Ok(id)
    }

    async fn update_student(&mut self, student: &Student) -> Result<(), RepositoryError> {
        if let Some(id) = student.id {
            if let Some(stored) = self.staged.students.get_mut(&id) {
                *stored = student.clone();
            }
        }
        Ok(())
    }

    async fn update_course(&mut self, course: &StudentCourse) -> Result<(), RepositoryError> {
        if let Some(id) = course.id {
            if let Some(stored) = self.staged.courses.get_mut(&id) {
                stored.course_name = course.course_name.clone();
            }
        }
        Ok(())
    }

    async fn update_status(&mut self, status: &CourseStatus) -> Result<(), RepositoryError> {
        let Some(id) = status.id else {
            return Ok(());
        };
        if !self.staged.statuses.contains_key(&id) {
            return Ok(());
        }

        self.staged.check_status_reference(status)?;
        self.staged.statuses.insert(id, status.clone());
        Ok(())
    }

    async fn delete_status(&mut self, id: CourseStatusId) -> Result<(), RepositoryError> {
        self.staged.statuses.remove(&id);
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let MemoryWriter { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}
