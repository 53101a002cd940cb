//! PostgreSQL-backed persistence gateway built on `sqlx`.
//!
//! Queries are checked at runtime (`query_as::<_, T>`) so the crate builds without a
//! live database. Generated keys come back through `RETURNING id`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::domain::{
    CourseStatus, CourseStatusId, Student, StudentCourse, StudentCourseId, StudentId,
    StudentSearchCondition,
};
use super::repository::{RepositoryError, StudentRepository, StudentWriter};
use crate::config::DatabaseConfig;

const STUDENT_COLUMNS: &str =
    "id, name, kana_name, nickname, email, area, age, sex, remark, is_deleted";
const COURSE_COLUMNS: &str = "id, student_id, course_name, course_start_at, course_end_at";
const STATUS_COLUMNS: &str = "id, student_course_id, status";

/// Failures raised while preparing the connection pool or schema.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("DATABASE_URL must be set to use the PostgreSQL store")]
    MissingUrl,
    #[error("failed to connect to the database: {0}")]
    Connection(#[from] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Establishes a connection pool using the configured limits.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let url = config.url.as_deref().ok_or(DbError::MissingUrl)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.code().is_some_and(|code| code.starts_with("23")) => {
                RepositoryError::ConstraintViolation(db.message().to_string())
            }
            _ => RepositoryError::Unavailable(error.to_string()),
        }
    }
}

/// Student filter with substring matches on name and area and an inclusive age range.
fn search_query(condition: &StudentSearchCondition) -> QueryBuilder<'static, Postgres> {
    let mut builder =
        QueryBuilder::new(format!("SELECT {STUDENT_COLUMNS} FROM students WHERE TRUE"));

    if let Some(name) = condition.name_filter() {
        builder
            .push(" AND POSITION(")
            .push_bind(name.to_string())
            .push(" IN name) > 0");
    }
    if let Some(area) = condition.area_filter() {
        builder
            .push(" AND POSITION(")
            .push_bind(area.to_string())
            .push(" IN area) > 0");
    }
    if let Some(age_from) = condition.age_from {
        builder.push(" AND age >= ").push_bind(age_from);
    }
    if let Some(age_to) = condition.age_to {
        builder.push(" AND age <= ").push_bind(age_to);
    }
    builder.push(" ORDER BY id");
    builder
}

#[derive(Debug, Clone)]
pub struct PgStudentRepository {
    pool: PgPool,
}

impl PgStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentRepository for PgStudentRepository {
    type Writer = PgWriter;

    async fn begin(&self) -> Result<Self::Writer, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgWriter { tx })
    }

    async fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn search_students(
        &self,
        condition: &StudentSearchCondition,
    ) -> Result<Vec<Student>, RepositoryError> {
        let mut builder = search_query(condition);
        debug!(sql = builder.sql(), "searching students");
        let students = builder
            .build_query_as::<Student>()
            .fetch_all(&self.pool)
            .await?;
        Ok(students)
    }

    async fn list_courses(&self) -> Result<Vec<StudentCourse>, RepositoryError> {
        let courses = sqlx::query_as::<_, StudentCourse>(&format!(
            "SELECT {COURSE_COLUMNS} FROM students_courses ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn list_courses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<StudentCourse>, RepositoryError> {
        let courses = sqlx::query_as::<_, StudentCourse>(&format!(
            "SELECT {COURSE_COLUMNS} FROM students_courses WHERE student_id = $1 ORDER BY id"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn get_course(
        &self,
        id: StudentCourseId,
    ) -> Result<Option<StudentCourse>, RepositoryError> {
        let course = sqlx::query_as::<_, StudentCourse>(&format!(
            "SELECT {COURSE_COLUMNS} FROM students_courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn list_statuses(&self) -> Result<Vec<CourseStatus>, RepositoryError> {
        let statuses = sqlx::query_as::<_, CourseStatus>(&format!(
            "SELECT {STATUS_COLUMNS} FROM course_statuses ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(statuses)
    }

    async fn list_statuses_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<CourseStatus>, RepositoryError> {
        let statuses = sqlx::query_as::<_, CourseStatus>(
            r#"
            SELECT cs.id, cs.student_course_id, cs.status
            FROM course_statuses AS cs
            JOIN students_courses AS sc ON cs.student_course_id = sc.id
            WHERE sc.student_id = $1
            ORDER BY cs.id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(statuses)
    }

    async fn get_status_by_course(
        &self,
        student_course_id: StudentCourseId,
    ) -> Result<Option<CourseStatus>, RepositoryError> {
        let status = sqlx::query_as::<_, CourseStatus>(&format!(
            "SELECT {STATUS_COLUMNS} FROM course_statuses WHERE student_course_id = $1"
        ))
        .bind(student_course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }
}

/// Wraps a `sqlx` transaction; dropping it without `commit` rolls back.
pub struct PgWriter {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StudentWriter for PgWriter {
    async fn insert_student(&mut self, student: &Student) -> Result<StudentId, RepositoryError> {
        let id: StudentId = sqlx::query_scalar(
            r#"
            INSERT INTO students (name, kana_name, nickname, email, area, age, sex, remark, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
            RETURNING id
            "#,
        )
        .bind(&student.name)
        .bind(&student.kana_name)
        .bind(&student.nickname)
        .bind(&student.email)
        .bind(&student.area)
        .bind(student.age)
        .bind(&student.sex)
        .bind(&student.remark)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_course(
        &mut self,
        course: &StudentCourse,
    ) -> Result<StudentCourseId, RepositoryError> {
        let id: StudentCourseId = sqlx::query_scalar(
            r#"
            INSERT INTO students_courses (student_id, course_name, course_start_at, course_end_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(course.student_id)
        .bind(&course.course_name)
        .bind(course.course_start_at)
        .bind(course.course_end_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_status(
        &mut self,
        status: &CourseStatus,
    ) -> Result<CourseStatusId, RepositoryError> {
        let id: CourseStatusId = sqlx::query_scalar(
            "INSERT INTO course_statuses (student_course_id, status) VALUES ($1, $2) RETURNING id",
        )
        .bind(status.student_course_id)
        .bind(&status.status)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn update_student(&mut self, student: &Student) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE students
            SET name = $1, kana_name = $2, nickname = $3, email = $4, area = $5,
                age = $6, sex = $7, remark = $8, is_deleted = $9
            WHERE id = $10
            "#,
        )
        .bind(&student.name)
        .bind(&student.kana_name)
        .bind(&student.nickname)
        .bind(&student.email)
        .bind(&student.area)
        .bind(student.age)
        .bind(&student.sex)
        .bind(&student.remark)
        .bind(student.is_deleted)
        .bind(student.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_course(&mut self, course: &StudentCourse) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE students_courses SET course_name = $1 WHERE id = $2")
            .bind(&course.course_name)
            .bind(course.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_status(&mut self, status: &CourseStatus) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE course_statuses SET student_course_id = $1, status = $2 WHERE id = $3")
            .bind(status.student_course_id)
            .bind(&status.status)
            .bind(status.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_status(&mut self, id: CourseStatusId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM course_statuses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
