use crate::infra::Store;
use clap::Subcommand;
use student_management::error::AppError;
use student_management::students::{
    StudentDetail, StudentId, StudentRepository, StudentService,
};

#[derive(Subcommand, Debug)]
pub(crate) enum StudentsCommand {
    /// List every student with courses and statuses
    List,
    /// Show a single student by id
    Show {
        /// Student id
        id: StudentId,
    },
}

pub(crate) async fn run_students_command(
    store: Store,
    command: StudentsCommand,
) -> Result<(), AppError> {
    match store {
        Store::Memory(repository) => print_students(StudentService::new(repository), command).await,
        Store::Postgres(repository) => {
            print_students(StudentService::new(repository), command).await
        }
    }
}

async fn print_students<R>(
    service: StudentService<R>,
    command: StudentsCommand,
) -> Result<(), AppError>
where
    R: StudentRepository + 'static,
{
    let details = match command {
        StudentsCommand::List => service.list_student_details().await?,
        StudentsCommand::Show { id } => vec![service.get_student_detail(id).await?],
    };

    if details.is_empty() {
        println!("No students registered.");
        return Ok(());
    }

    for detail in &details {
        println!("{}", render_student_detail(detail));
    }
    Ok(())
}

pub(crate) fn render_student_detail(detail: &StudentDetail) -> String {
    let student = &detail.student;
    let id = student
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let withdrawn = if student.is_deleted { " [withdrawn]" } else { "" };

    let mut lines = vec![format!(
        "#{id} {} ({}), {} years, {}{withdrawn}",
        student.name, student.kana_name, student.age, student.area
    )];

    if detail.student_course_list.is_empty() {
        lines.push("  no courses".to_string());
    }
    for course in &detail.student_course_list {
        let window = match (course.course_start_at, course.course_end_at) {
            (Some(start), Some(end)) => format!("{} -> {}", start.date(), end.date()),
            _ => "unscheduled".to_string(),
        };
        let status = course
            .course_status
            .as_ref()
            .map(|status| status.status.as_str())
            .unwrap_or("no status");
        lines.push(format!("  - {} | {window} | {status}", course.course_name));
    }

    lines.join("\n")
}
