use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use super::composer::{attach_statuses, compose_details};
use super::domain::{
    CourseStatus, CourseStatusId, StudentCourseId, StudentDetail, StudentId,
    StudentSearchCondition,
};
use super::repository::{RepositoryError, StudentRepository, StudentWriter};

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Service orchestrating the persistence gateway and the detail composer.
pub struct StudentService<R> {
    repository: Arc<R>,
    clock: Clock,
}

impl<R> StudentService<R>
where
    R: StudentRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_clock(repository, Arc::new(|| Local::now().naive_local()))
    }

    pub(crate) fn with_clock(repository: Arc<R>, clock: Clock) -> Self {
        Self { repository, clock }
    }

    /// Every student with all of its courses and their statuses.
    pub async fn list_student_details(&self) -> Result<Vec<StudentDetail>, StudentServiceError> {
        let students = self.repository.list_students().await?;
        let mut courses = self.repository.list_courses().await?;
        let statuses = self.repository.list_statuses().await?;

        attach_statuses(&mut courses, statuses);
        debug!(
            students = students.len(),
            courses = courses.len(),
            "composing student details"
        );
        Ok(compose_details(students, courses))
    }

    pub async fn get_student_detail(
        &self,
        id: StudentId,
    ) -> Result<StudentDetail, StudentServiceError> {
        let student = self
            .repository
            .get_student(id)
            .await?
            .ok_or(StudentServiceError::NotFound {
                entity: "student",
                id,
            })?;

        let mut courses = self.repository.list_courses_by_student(id).await?;
        let statuses = self.repository.list_statuses_by_student(id).await?;
        attach_statuses(&mut courses, statuses);

        Ok(StudentDetail::new(student, courses))
    }

    /// Persists the student, its courses, and any nested statuses in one transaction.
    ///
    /// Courses are bound to the new student and get a one-year window starting now;
    /// client-supplied ids and timestamps are ignored.
    pub async fn register_student_detail(
        &self,
        mut detail: StudentDetail,
    ) -> Result<StudentDetail, StudentServiceError> {
        let now = (self.clock)();
        let mut writer = self.repository.begin().await?;

        let student_id = writer.insert_student(&detail.student).await?;
        detail.student.id = Some(student_id);
        detail.student.is_deleted = false;

        for course in &mut detail.student_course_list {
            course.enroll(student_id, now);
            let course_id = writer.insert_course(course).await?;
            course.id = Some(course_id);

            if let Some(status) = course.course_status.as_mut() {
                status.student_course_id = Some(course_id);
                status.id = Some(writer.insert_status(status).await?);
            }
        }

        writer.commit().await?;
        info!(
            student_id,
            courses = detail.student_course_list.len(),
            "registered student"
        );
        Ok(detail)
    }

    /// Overwrites the student, its courses, and their statuses in one transaction.
    ///
    /// Courses missing from the store are not created.
    pub async fn update_student_detail(
        &self,
        mut detail: StudentDetail,
    ) -> Result<(), StudentServiceError> {
        let student_id = detail
            .student
            .id
            .ok_or_else(|| validation("student id is required for an update"))?;

        for course in &mut detail.student_course_list {
            let course_id = course
                .id
                .ok_or_else(|| validation("every course in an update must carry its id"))?;
            if let Some(status) = course.course_status.as_mut() {
                if status.id.is_none() {
                    return Err(validation("every course status in an update must carry its id"));
                }
                if status.student_course_id.is_none() {
                    status.student_course_id = Some(course_id);
                }
            }
        }

        let mut writer = self.repository.begin().await?;
        writer.update_student(&detail.student).await?;
        for course in &detail.student_course_list {
            writer.update_course(course).await?;
            if let Some(status) = &course.course_status {
                writer.update_status(status).await?;
            }
        }
        writer.commit().await?;

        info!(
            student_id,
            deleted = detail.student.is_deleted,
            "updated student"
        );
        Ok(())
    }

    pub async fn list_course_statuses(&self) -> Result<Vec<CourseStatus>, StudentServiceError> {
        Ok(self.repository.list_statuses().await?)
    }

    /// Registers a status for an existing course that has none yet.
    pub async fn register_course_status(
        &self,
        mut status: CourseStatus,
    ) -> Result<CourseStatus, StudentServiceError> {
        let course_id = status
            .student_course_id
            .ok_or_else(|| validation("studentCourseId is required"))?;

        self.ensure_status_slot(course_id).await?;

        let mut writer = self.repository.begin().await?;
        let id = match writer.insert_status(&status).await {
            Ok(id) => id,
            Err(RepositoryError::ConstraintViolation(reason)) => {
                drop(writer);
                debug!(course_id, %reason, "course status insert rejected by a constraint");
                self.ensure_status_slot(course_id).await?;
                return Err(validation(format!(
                    "course status could not be registered: {reason}"
                )));
            }
            Err(error) => return Err(error.into()),
        };
        writer.commit().await?;

        status.id = Some(id);
        info!(status_id = id, course_id, "registered course status");
        Ok(status)
    }

    /// Fails unless the course exists and carries no status yet.
    async fn ensure_status_slot(&self, course_id: StudentCourseId) -> Result<(), StudentServiceError> {
        if self.repository.get_course(course_id).await?.is_none() {
            return Err(validation("the specified course does not exist"));
        }
        if self
            .repository
            .get_status_by_course(course_id)
            .await?
            .is_some()
        {
            return Err(validation(format!(
                "course {course_id} already has a status"
            )));
        }
        Ok(())
    }

    pub async fn update_course_status(
        &self,
        status: CourseStatus,
    ) -> Result<(), StudentServiceError> {
        let id = status
            .id
            .ok_or_else(|| validation("course status id is required for an update"))?;
        if status.student_course_id.is_none() {
            return Err(validation("studentCourseId is required"));
        }

        let mut writer = self.repository.begin().await?;
        writer.update_status(&status).await?;
        writer.commit().await?;

        info!(status_id = id, "updated course status");
        Ok(())
    }

    /// Deleting an unknown id succeeds without effect.
    pub async fn delete_course_status(
        &self,
        id: CourseStatusId,
    ) -> Result<(), StudentServiceError> {
        let mut writer = self.repository.begin().await?;
        writer.delete_status(id).await?;
        writer.commit().await?;

        info!(status_id = id, "deleted course status");
        Ok(())
    }

    /// Filters students in the store, then narrows each student's courses by name in memory.
    ///
    /// Students whose courses are all filtered out are still returned.
    pub async fn search_student_details(
        &self,
        condition: StudentSearchCondition,
    ) -> Result<Vec<StudentDetail>, StudentServiceError> {
        if let Some(status) = condition.status_filter() {
            debug!(status, "status is not applied as a search filter");
        }

        let students = self.repository.search_students(&condition).await?;
        let course_name = condition.course_name_filter();

        let mut details = Vec::with_capacity(students.len());
        for student in students {
            let Some(student_id) = student.id else {
                details.push(StudentDetail::new(student, Vec::new()));
                continue;
            };

            let mut courses = self.repository.list_courses_by_student(student_id).await?;
            if let Some(name) = course_name {
                courses.retain(|course| course.course_name.contains(name));
            }
            let statuses = self.repository.list_statuses_by_student(student_id).await?;
            attach_statuses(&mut courses, statuses);

            details.push(StudentDetail::new(student, courses));
        }

        debug!(matches = details.len(), "searched student details");
        Ok(details)
    }
}

fn validation(message: impl Into<String>) -> StudentServiceError {
    StudentServiceError::Validation(message.into())
}

/// Error raised by the student service.
#[derive(Debug, thiserror::Error)]
pub enum StudentServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
