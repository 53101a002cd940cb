use async_trait::async_trait;

use super::domain::{
    CourseStatus, CourseStatusId, Student, StudentCourse, StudentCourseId, StudentId,
    StudentSearchCondition,
};

/// Read side of the persistence gateway plus the entry point for write transactions.
///
/// By-id lookups return `Ok(None)` when nothing matches; callers decide whether that is
/// an error.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    type Writer: StudentWriter;

    /// Opens a unit of work. Nothing it writes is visible until [`StudentWriter::commit`].
    async fn begin(&self) -> Result<Self::Writer, RepositoryError>;

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError>;
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;
    async fn search_students(
        &self,
        condition: &StudentSearchCondition,
    ) -> Result<Vec<Student>, RepositoryError>;

    async fn list_courses(&self) -> Result<Vec<StudentCourse>, RepositoryError>;
    async fn list_courses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<StudentCourse>, RepositoryError>;
    async fn get_course(
        &self,
        id: StudentCourseId,
    ) -> Result<Option<StudentCourse>, RepositoryError>;

    async fn list_statuses(&self) -> Result<Vec<CourseStatus>, RepositoryError>;
    async fn list_statuses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<CourseStatus>, RepositoryError>;
    async fn get_status_by_course(
        &self,
        student_course_id: StudentCourseId,
    ) -> Result<Option<CourseStatus>, RepositoryError>;
}

/// Write side of the gateway. Dropping a writer without committing rolls it back.
#[async_trait]
pub trait StudentWriter: Send {
    /// Inserts the student with `is_deleted = false` and returns the assigned id.
    async fn insert_student(&mut self, student: &Student) -> Result<StudentId, RepositoryError>;
    async fn insert_course(
        &mut self,
        course: &StudentCourse,
    ) -> Result<StudentCourseId, RepositoryError>;
    async fn insert_status(
        &mut self,
        status: &CourseStatus,
    ) -> Result<CourseStatusId, RepositoryError>;

    /// Overwrites every mutable student column. Unknown ids are a no-op.
    async fn update_student(&mut self, student: &Student) -> Result<(), RepositoryError>;
    /// Overwrites the course name only. Unknown ids are a no-op.
    async fn update_course(&mut self, course: &StudentCourse) -> Result<(), RepositoryError>;
    async fn update_status(&mut self, status: &CourseStatus) -> Result<(), RepositoryError>;
    async fn delete_status(&mut self, id: CourseStatusId) -> Result<(), RepositoryError>;

    async fn commit(self) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
