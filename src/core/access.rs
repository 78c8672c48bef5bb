//! Access control - Resolves the acting user and checks capabilities.
//!
//! Every request resolves an [`Actor`] from its bearer token before any
//! business function runs. Business functions then take the role profile they
//! need (`&student::Model` or `&professor::Model`) so the role check happens
//! exactly once, at the boundary, via [`Actor::student`] / [`Actor::professor`].
//! Ownership checks that depend on stored rows go through [`authorize`].

use crate::{
    core::auth::Claims,
    entities::{
        Course, Enrollment, Professor, Student, User, UserRole, course, enrollment, professor,
        student, user,
    },
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait, prelude::*};
use tracing::debug;

/// The authenticated user together with their role profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    /// A logged-in student
    Student {
        /// Account row
        user: user::Model,
        /// Student profile
        student: student::Model,
    },
    /// A logged-in professor
    Professor {
        /// Account row
        user: user::Model,
        /// Professor profile
        professor: professor::Model,
    },
}

impl Actor {
    /// The account row, whatever the role.
    #[must_use]
    pub const fn user(&self) -> &user::Model {
        match self {
            Self::Student { user, .. } | Self::Professor { user, .. } => user,
        }
    }

    /// The student profile, or [`Error::Forbidden`] for professors.
    pub fn student(&self) -> Result<&student::Model> {
        match self {
            Self::Student { student, .. } => Ok(student),
            Self::Professor { .. } => Err(Error::forbidden("Student access required")),
        }
    }

    /// The professor profile, or [`Error::Forbidden`] for students.
    pub fn professor(&self) -> Result<&professor::Model> {
        match self {
            Self::Professor { professor, .. } => Ok(professor),
            Self::Student { .. } => Err(Error::forbidden("Professor access required")),
        }
    }
}

/// Loads the user named by `claims` and their profile.
///
/// Unknown, inactive or profile-less users are [`Error::Unauthenticated`], as
/// is a token whose email or role no longer matches the stored user.
pub async fn resolve_actor<C>(db: &C, claims: &Claims) -> Result<Actor>
where
    C: ConnectionTrait,
{
    let user = User::find_by_id(claims.user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::unauthenticated("User no longer exists"))?;

    if !user.is_active {
        return Err(Error::unauthenticated("Inactive user"));
    }
    if user.email != claims.sub || user.role != claims.role {
        return Err(Error::unauthenticated("Token does not match user"));
    }

    match user.role {
        UserRole::Student => {
            let student = Student::find()
                .filter(student::Column::UserId.eq(user.id))
                .one(db)
                .await?
                .ok_or_else(|| Error::unauthenticated("Student profile missing"))?;
            Ok(Actor::Student { user, student })
        }
        UserRole::Professor => {
            let professor = Professor::find()
                .filter(professor::Column::UserId.eq(user.id))
                .one(db)
                .await?
                .ok_or_else(|| Error::unauthenticated("Professor profile missing"))?;
            Ok(Actor::Professor { user, professor })
        }
    }
}

/// Row-dependent permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The actor is the student with this profile id
    StudentSelf(i64),
    /// The actor is the professor owning this course
    ProfessorOwner(i64),
    /// The actor is a professor and this student is enrolled in one of their
    /// courses or majors in their department
    ProfessorDepartment(i64),
    /// The actor is a professor and this student is enrolled in one of their
    /// courses; required for anything built from academic records
    ProfessorTeaches(i64),
}

/// Checks `capability` for `actor`, failing with [`Error::Forbidden`].
///
/// Referenced courses and students that do not exist are [`Error::NotFound`].
pub async fn authorize<C>(db: &C, actor: &Actor, capability: Capability) -> Result<()>
where
    C: ConnectionTrait,
{
    debug!(user_id = actor.user().id, ?capability, "authorizing");
    match capability {
        Capability::StudentSelf(student_id) => {
            if actor.student()?.id == student_id {
                Ok(())
            } else {
                Err(Error::forbidden("Students may only access their own records"))
            }
        }
        Capability::ProfessorOwner(course_id) => {
            owned_course(db, actor.professor()?, course_id).await.map(|_| ())
        }
        Capability::ProfessorDepartment(student_id) => {
            let professor = actor.professor()?;
            let student = Student::find_by_id(student_id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("Student", student_id))?;
            if in_department(&student, professor) || teaches_student(db, professor, student.id).await? {
                Ok(())
            } else {
                Err(Error::forbidden(
                    "Student is not in your courses or department",
                ))
            }
        }
        Capability::ProfessorTeaches(student_id) => {
            let professor = actor.professor()?;
            Student::find_by_id(student_id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("Student", student_id))?;
            if teaches_student(db, professor, student_id).await? {
                Ok(())
            } else {
                Err(Error::forbidden("Student is not enrolled in any of your courses"))
            }
        }
    }
}

/// Loads a course the professor owns.
pub async fn owned_course<C>(db: &C, professor: &professor::Model, course_id: i64) -> Result<course::Model>
where
    C: ConnectionTrait,
{
    let course = Course::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))?;
    if course.professor_id != professor.id {
        return Err(Error::forbidden("You can only manage your own courses"));
    }
    Ok(course)
}

fn in_department(student: &student::Model, professor: &professor::Model) -> bool {
    student
        .major
        .as_deref()
        .is_some_and(|major| major.trim().eq_ignore_ascii_case(professor.department.trim()))
}

/// True when the student has any enrollment in one of the professor's courses.
pub async fn teaches_student<C>(db: &C, professor: &professor::Model, student_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let found = Enrollment::find()
        .join(JoinType::InnerJoin, enrollment::Relation::Course.def())
        .filter(enrollment::Column::StudentId.eq(student_id))
        .filter(course::Column::ProfessorId.eq(professor.id))
        .one(db)
        .await?;
    Ok(found.is_some())
}
