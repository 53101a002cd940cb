use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::students::domain::{
    CourseStatus, CourseStatusId, Student, StudentCourse, StudentCourseId, StudentDetail,
    StudentId, StudentSearchCondition,
};
use crate::students::memory::{MemoryStudentRepository, MemoryWriter};
use crate::students::repository::{RepositoryError, StudentRepository, StudentWriter};
use crate::students::service::StudentService;

pub(super) fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 2)
        .expect("valid date")
        .and_hms_opt(15, 26, 53)
        .expect("valid time")
}

pub(super) fn build_service<R>(repository: Arc<R>) -> StudentService<R>
where
    R: StudentRepository + 'static,
{
    StudentService::with_clock(repository, Arc::new(fixed_now))
}

pub(super) fn memory_service() -> (StudentService<MemoryStudentRepository>, Arc<MemoryStudentRepository>)
{
    let repository = Arc::new(MemoryStudentRepository::new());
    (build_service(repository.clone()), repository)
}

pub(super) fn student(name: &str, area: &str, age: i32) -> Student {
    Student {
        id: None,
        name: name.to_string(),
        kana_name: format!("{name} (kana)"),
        nickname: name.to_string(),
        email: format!("{}@example.com", name.to_ascii_lowercase()),
        area: area.to_string(),
        age,
        sex: "male".to_string(),
        remark: None,
        is_deleted: false,
    }
}

pub(super) fn course(name: &str) -> StudentCourse {
    StudentCourse {
        course_name: name.to_string(),
        ..StudentCourse::default()
    }
}

pub(super) fn course_with_status(name: &str, status: &str) -> StudentCourse {
    StudentCourse {
        course_status: Some(CourseStatus {
            id: None,
            student_course_id: None,
            status: status.to_string(),
        }),
        ..course(name)
    }
}

pub(super) fn detail(student: Student, courses: Vec<StudentCourse>) -> StudentDetail {
    StudentDetail::new(student, courses)
}

pub(super) fn taro_detail() -> StudentDetail {
    detail(student("Taro", "Tokyo", 30), vec![course("AWS Course")])
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 payload")
}

/// Write operation at which [`FlakyRepository`] injects a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FailPoint {
    InsertCourse,
    InsertStatus,
    UpdateCourse,
}

/// Memory repository whose writer fails at a chosen operation.
pub(super) struct FlakyRepository {
    inner: MemoryStudentRepository,
    fail_on: FailPoint,
}

impl FlakyRepository {
    pub(super) fn new(fail_on: FailPoint) -> Self {
        Self {
            inner: MemoryStudentRepository::new(),
            fail_on,
        }
    }
}

fn injected() -> RepositoryError {
    RepositoryError::ConstraintViolation("injected failure".to_string())
}

#[async_trait]
impl StudentRepository for FlakyRepository {
    type Writer = FlakyWriter;

    async fn begin(&self) -> Result<Self::Writer, RepositoryError> {
        Ok(FlakyWriter {
            inner: self.inner.begin().await?,
            fail_on: self.fail_on,
        })
    }

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        self.inner.list_students().await
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.get_student(id).await
    }

    async fn search_students(
        &self,
        condition: &StudentSearchCondition,
    ) -> Result<Vec<Student>, RepositoryError> {
        self.inner.search_students(condition).await
    }

    async fn list_courses(&self) -> Result<Vec<StudentCourse>, RepositoryError> {
        self.inner.list_courses().await
    }

    async fn list_courses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<StudentCourse>, RepositoryError> {
        self.inner.list_courses_by_student(student_id).await
    }

    async fn get_course(
        &self,
        id: StudentCourseId,
    ) -> Result<Option<StudentCourse>, RepositoryError> {
        self.inner.get_course(id).await
    }

    async fn list_statuses(&self) -> Result<Vec<CourseStatus>, RepositoryError> {
        self.inner.list_statuses().await
    }

    async fn list_statuses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<CourseStatus>, RepositoryError> {
        self.inner.list_statuses_by_student(student_id).await
    }

    async fn get_status_by_course(
        &self,
        student_course_id: StudentCourseId,
    ) -> Result<Option<CourseStatus>, RepositoryError> {
        self.inner.get_status_by_course(student_course_id).await
    }
}

pub(super) struct FlakyWriter {
    inner: MemoryWriter,
    fail_on: FailPoint,
}

#[async_trait]
impl StudentWriter for FlakyWriter {
    async fn insert_student(&mut self, student: &Student) -> Result<StudentId, RepositoryError> {
        self.inner.insert_student(student).await
    }

    async fn insert_course(
        &mut self,
        course: &StudentCourse,
    ) -> Result<StudentCourseId, RepositoryError> {
        if self.fail_on == FailPoint::InsertCourse {
            return Err(injected());
        }
        self.inner.insert_course(course).await
    }

    async fn insert_status(
        &mut self,
        status: &CourseStatus,
    ) -> Result<CourseStatusId, RepositoryError> {
        if self.fail_on == FailPoint::InsertStatus {
            return Err(injected());
        }
        self.inner.insert_status(status).await
    }

    async fn update_student(&mut self, student: &Student) -> Result<(), RepositoryError> {
        self.inner.update_student(student).await
    }

    async fn update_course(&mut self, course: &StudentCourse) -> Result<(), RepositoryError> {
        if self.fail_on == FailPoint::UpdateCourse {
            return Err(injected());
        }
        self.inner.update_course(course).await
    }

    async fn update_status(&mut self, status: &CourseStatus) -> Result<(), RepositoryError> {
        self.inner.update_status(status).await
    }

    async fn delete_status(&mut self, id: CourseStatusId) -> Result<(), RepositoryError> {
        self.inner.delete_status(id).await
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.inner.commit().await
    }
}

/// Repository whose every call fails as if the database were down.
pub(super) struct UnavailableRepository;

pub(super) enum UnavailableWriter {}

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl StudentRepository for UnavailableRepository {
    type Writer = UnavailableWriter;

    async fn begin(&self) -> Result<Self::Writer, RepositoryError> {
        Err(unavailable())
    }

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        Err(unavailable())
    }

    async fn get_student(&self, _id: StudentId) -> Result<Option<Student>, RepositoryError> {
        Err(unavailable())
    }

    async fn search_students(
        &self,
        _condition: &StudentSearchCondition,
    ) -> Result<Vec<Student>, RepositoryError> {
        Err(unavailable())
    }

    async fn list_courses(&self) -> Result<Vec<StudentCourse>, RepositoryError> {
        Err(unavailable())
    }

    async fn list_courses_by_student(
        &self,
        _student_id: StudentId,
    ) -> Result<Vec<StudentCourse>, RepositoryError> {
        Err(unavailable())
    }

    async fn get_course(
        &self,
        _id: StudentCourseId,
    ) -> Result<Option<StudentCourse>, RepositoryError> {
        Err(unavailable())
    }

    async fn list_statuses(&self) -> Result<Vec<CourseStatus>, RepositoryError> {
        Err(unavailable())
    }

    async fn list_statuses_by_student(
        &self,
        _student_id: StudentId,
    ) -> Result<Vec<CourseStatus>, RepositoryError> {
        Err(unavailable())
    }

    async fn get_status_by_course(
        &self,
        _student_course_id: StudentCourseId,
    ) -> Result<Option<CourseStatus>, RepositoryError> {
        Err(unavailable())
    }
}

#[async_trait]
impl StudentWriter for UnavailableWriter {
    async fn insert_student(&mut self, _student: &Student) -> Result<StudentId, RepositoryError> {
        Err(unavailable())
    }

    async fn insert_course(
        &mut self,
        _course: &StudentCourse,
    ) -> Result<StudentCourseId, RepositoryError> {
        Err(unavailable())
    }

    async fn insert_status(
        &mut self,
        _status: &CourseStatus,
    ) -> Result<CourseStatusId, RepositoryError> {
        Err(unavailable())
    }

    async fn update_student(&mut self, _student: &Student) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    async fn update_course(&mut self, _course: &StudentCourse) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    async fn update_status(&mut self, _status: &CourseStatus) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    async fn delete_status(&mut self, _id: CourseStatusId) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        Err(unavailable())
    }
}
