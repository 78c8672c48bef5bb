//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod academic_progress;
pub mod academic_record;
pub mod attendance;
pub mod course;
pub mod enrollment;
pub mod professor;
pub mod semester_gpa;
pub mod student;
pub mod transcript;
pub mod user;

// Re-export specific types to avoid conflicts
pub use academic_progress::{Entity as AcademicProgress, Model as AcademicProgressModel};
pub use academic_record::{Entity as AcademicRecord, GradeStatus, Model as AcademicRecordModel};
pub use attendance::{AttendanceStatus, Entity as Attendance, Model as AttendanceModel};
pub use course::{CourseCategory, Entity as Course, Model as CourseModel};
pub use enrollment::{Entity as Enrollment, EnrollmentStatus, Model as EnrollmentModel};
pub use professor::{Entity as Professor, Model as ProfessorModel};
pub use semester_gpa::{Entity as SemesterGpa, Model as SemesterGpaModel};
pub use student::{Entity as Student, Model as StudentModel};
pub use transcript::{
    Entity as Transcript, Model as TranscriptModel, TranscriptStatus, TranscriptType,
};
pub use user::{Entity as User, Model as UserModel, UserRole};
