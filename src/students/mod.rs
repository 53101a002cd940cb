//! Student registration: domain types, the detail composer, persistence gateways,
//! the application service, and its HTTP router.

pub mod composer;
pub mod domain;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use composer::{attach_statuses, compose_details};
pub use domain::{
    CourseStatus, CourseStatusId, Student, StudentCourse, StudentCourseId, StudentDetail,
    StudentId, StudentSearchCondition,
};
pub use memory::MemoryStudentRepository;
pub use postgres::{DbError, PgStudentRepository};
pub use repository::{RepositoryError, StudentRepository, StudentWriter};
pub use router::student_router;
pub use service::{StudentService, StudentServiceError};
