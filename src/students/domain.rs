use chrono::{Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type StudentId = i32;
pub type StudentCourseId = i32;
pub type CourseStatusId = i32;

/// Length of a course enrollment window.
pub const COURSE_DURATION: Months = Months::new(12);

/// A registered person. `is_deleted` marks a withdrawn student without removing the row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub id: Option<StudentId>,
    pub name: String,
    #[serde(default)]
    pub kana_name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default, alias = "deleted")]
    pub is_deleted: bool,
}

/// Enrollment of a student in a named course offering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentCourse {
    #[serde(default)]
    pub id: Option<StudentCourseId>,
    #[serde(default)]
    pub student_id: Option<StudentId>,
    pub course_name: String,
    #[serde(default)]
    pub course_start_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub course_end_at: Option<NaiveDateTime>,
    #[serde(default)]
    #[sqlx(skip)]
    pub course_status: Option<CourseStatus>,
}

impl StudentCourse {
    /// Binds the course to its owner and opens a one-year window starting at `now`.
    pub fn enroll(&mut self, student_id: StudentId, now: NaiveDateTime) {
        self.student_id = Some(student_id);
        self.course_start_at = Some(now);
        self.course_end_at = Some(course_end(now));
    }
}

pub fn course_end(start: NaiveDateTime) -> NaiveDateTime {
    start
        .checked_add_months(COURSE_DURATION)
        .unwrap_or(NaiveDateTime::MAX)
}

/// Application state of a single enrollment, e.g. "仮申込" (tentative) or "受講中" (in progress).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatus {
    #[serde(default)]
    pub id: Option<CourseStatusId>,
    #[serde(default)]
    pub student_course_id: Option<StudentCourseId>,
    pub status: String,
}

/// Read model combining a student with its enrollments. Never persisted as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetail {
    pub student: Student,
    #[serde(default)]
    pub student_course_list: Vec<StudentCourse>,
}

impl StudentDetail {
    pub fn new(student: Student, student_course_list: Vec<StudentCourse>) -> Self {
        Self {
            student,
            student_course_list,
        }
    }
}

/// Optional filters for student searches. Blank strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSearchCondition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub age_from: Option<i32>,
    #[serde(default)]
    pub age_to: Option<i32>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl StudentSearchCondition {
    pub fn name_filter(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    pub fn area_filter(&self) -> Option<&str> {
        non_blank(&self.area)
    }

    pub fn course_name_filter(&self) -> Option<&str> {
        non_blank(&self.course_name)
    }

    pub fn status_filter(&self) -> Option<&str> {
        non_blank(&self.status)
    }

    /// Store-level predicate: name and area substrings plus the inclusive age range.
    pub fn matches_student(&self, student: &Student) -> bool {
        self.name_filter()
            .map_or(true, |name| student.name.contains(name))
            && self
                .area_filter()
                .map_or(true, |area| student.area.contains(area))
            && self.age_from.map_or(true, |from| student.age >= from)
            && self.age_to.map_or(true, |to| student.age <= to)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
