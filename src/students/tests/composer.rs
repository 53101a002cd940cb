use super::common::*;
use crate::students::composer::{attach_statuses, compose_details};
use crate::students::domain::{CourseStatus, StudentCourse};

fn owned_course(id: i32, student_id: i32, name: &str) -> StudentCourse {
    StudentCourse {
        id: Some(id),
        student_id: Some(student_id),
        ..course(name)
    }
}

fn status(id: i32, course_id: i32, label: &str) -> CourseStatus {
    CourseStatus {
        id: Some(id),
        student_course_id: Some(course_id),
        status: label.to_string(),
    }
}

#[test]
fn compose_details_groups_courses_by_owner_in_order() {
    let mut taro = student("Taro", "Tokyo", 30);
    taro.id = Some(1);
    let mut hanako = student("Hanako", "Osaka", 25);
    hanako.id = Some(2);
    let mut jiro = student("Jiro", "Miyazaki", 22);
    jiro.id = Some(3);

    let courses = vec![
        owned_course(10, 2, "Java Course"),
        owned_course(11, 1, "AWS Course"),
        owned_course(12, 2, "Design Course"),
        owned_course(13, 9, "Orphan Course"),
        owned_course(14, 1, "Web Marketing"),
    ];

    let details = compose_details(vec![hanako, taro, jiro], courses);

    let names: Vec<&str> = details.iter().map(|d| d.student.name.as_str()).collect();
    assert_eq!(names, ["Hanako", "Taro", "Jiro"]);

    let course_ids = |index: usize| -> Vec<Option<i32>> {
        details[index]
            .student_course_list
            .iter()
            .map(|course| course.id)
            .collect()
    };
    assert_eq!(course_ids(0), [Some(10), Some(12)]);
    assert_eq!(course_ids(1), [Some(11), Some(14)]);
    assert!(course_ids(2).is_empty());

    let attached: usize = details.iter().map(|d| d.student_course_list.len()).sum();
    assert_eq!(attached, 4, "orphan course is not attached anywhere");
}

#[test]
fn compose_details_handles_empty_inputs() {
    assert!(compose_details(Vec::new(), vec![owned_course(1, 1, "Java")]).is_empty());

    let mut taro = student("Taro", "Tokyo", 30);
    taro.id = Some(1);
    let details = compose_details(vec![taro], Vec::new());
    assert_eq!(details.len(), 1);
    assert!(details[0].student_course_list.is_empty());
}

#[test]
fn attach_statuses_matches_by_course_id() {
    let mut courses = vec![owned_course(10, 1, "Java"), owned_course(11, 1, "AWS")];
    courses[1].course_status = Some(status(99, 11, "stale"));

    attach_statuses(&mut courses, vec![status(1, 10, "仮申込")]);

    assert_eq!(
        courses[0].course_status.as_ref().map(|s| s.status.as_str()),
        Some("仮申込")
    );
    assert!(courses[1].course_status.is_none());
}

#[test]
fn attach_statuses_keeps_the_last_duplicate() {
    let mut courses = vec![owned_course(10, 1, "Java")];

    attach_statuses(
        &mut courses,
        vec![status(1, 10, "仮申込"), status(2, 10, "受講中")],
    );

    let attached = courses[0].course_status.as_ref().expect("status attached");
    assert_eq!(attached.id, Some(2));
    assert_eq!(attached.status, "受講中");
}

#[test]
fn compose_details_hands_each_course_list_out_once() {
    let mut taro = student("Taro", "Tokyo", 30);
    taro.id = Some(1);
    let repeated = taro.clone();

    let details = compose_details(
        vec![taro, repeated],
        vec![owned_course(10, 1, "Java Course"), owned_course(11, 1, "AWS Course")],
    );

    assert_eq!(details[0].student_course_list.len(), 2);
    assert!(details[1].student_course_list.is_empty());
}
