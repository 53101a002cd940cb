//! Joins students, courses, and course statuses into [`StudentDetail`] read models.

use std::collections::HashMap;

use super::domain::{
    CourseStatus, Student, StudentCourse, StudentCourseId, StudentDetail, StudentId,
};

/// Attaches to each student, in input order, every course whose `student_id` matches.
///
/// Courses keep their relative order. Courses whose owner is not in `students` are dropped.
/// Student ids are expected to be unique; a repeated id receives no courses.
pub fn compose_details(students: Vec<Student>, courses: Vec<StudentCourse>) -> Vec<StudentDetail> {
    let mut by_student: HashMap<StudentId, Vec<StudentCourse>> = HashMap::new();
    for course in courses {
        if let Some(student_id) = course.student_id {
            by_student.entry(student_id).or_default().push(course);
        }
    }

    students
        .into_iter()
        .map(|student| {
            let student_course_list = student
                .id
                .and_then(|id| by_student.remove(&id))
                .unwrap_or_default();
            StudentDetail::new(student, student_course_list)
        })
        .collect()
}

/// Sets `course_status` on every course from a mapping keyed by student-course id.
///
/// Last status wins when several reference the same course. Courses without a status
/// are reset to `None`.
pub fn attach_statuses(courses: &mut [StudentCourse], statuses: Vec<CourseStatus>) {
    let mut by_course: HashMap<StudentCourseId, CourseStatus> = HashMap::new();
    for status in statuses {
        if let Some(course_id) = status.student_course_id {
            by_course.insert(course_id, status);
        }
    }

    for course in courses.iter_mut() {
        course.course_status = course.id.and_then(|id| by_course.get(&id).cloned());
    }
}
