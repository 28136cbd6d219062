//! Typed capability checks.
//!
//! Authorization questions are asked as "may this role perform this action on
//! this subject", with both halves closed enums. The check itself is a pure
//! function over a role's capability set, so it is testable without HTTP.

use db::models::user::Role;

/// The resources the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Users,
    Teachers,
    Students,
    Courses,
    Classrooms,
    Batches,
    Enrollments,
    Timetables,
    Announcements,
    Attendance,
    Payments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

/// One granted `(subject, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    pub subject: Subject,
    pub action: Action,
}

const ALL_ACTIONS: [Action; 4] = [Action::View, Action::Create, Action::Update, Action::Delete];

fn grant_all(caps: &mut Vec<Capability>, subject: Subject) {
    for action in ALL_ACTIONS {
        caps.push(Capability { subject, action });
    }
}

fn grant(caps: &mut Vec<Capability>, subject: Subject, actions: &[Action]) {
    for &action in actions {
        caps.push(Capability { subject, action });
    }
}

/// The full capability set of a role. Admins hold every capability; teachers
/// own the attendance lifecycle plus read access to their teaching context;
/// students can view and scan.
pub fn capabilities_for_role(role: Role) -> Vec<Capability> {
    let mut caps = Vec::new();
    match role {
        Role::Admin => {
            for subject in [
                Subject::Users,
                Subject::Teachers,
                Subject::Students,
                Subject::Courses,
                Subject::Classrooms,
                Subject::Batches,
                Subject::Enrollments,
                Subject::Timetables,
                Subject::Announcements,
                Subject::Attendance,
                Subject::Payments,
            ] {
                grant_all(&mut caps, subject);
            }
        }
        Role::Teacher => {
            grant_all(&mut caps, Subject::Attendance);
            grant(&mut caps, Subject::Students, &[Action::View]);
            grant(&mut caps, Subject::Batches, &[Action::View]);
            grant(&mut caps, Subject::Enrollments, &[Action::View]);
            grant(&mut caps, Subject::Timetables, &[Action::View]);
            grant(
                &mut caps,
                Subject::Announcements,
                &[Action::View, Action::Create],
            );
        }
        Role::Student => {
            // Create covers self-service scanning
            grant(&mut caps, Subject::Attendance, &[Action::View, Action::Create]);
            grant(&mut caps, Subject::Timetables, &[Action::View]);
            grant(&mut caps, Subject::Announcements, &[Action::View]);
            grant(&mut caps, Subject::Payments, &[Action::View]);
        }
    }
    caps
}

/// Pure capability check: does `caps` contain `(subject, action)`?
pub fn can_perform(caps: &[Capability], subject: Subject, action: Action) -> bool {
    caps.contains(&Capability { subject, action })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_everything() {
        let caps = capabilities_for_role(Role::Admin);
        assert!(can_perform(&caps, Subject::Users, Action::Delete));
        assert!(can_perform(&caps, Subject::Attendance, Action::Update));
        assert!(can_perform(&caps, Subject::Classrooms, Action::Create));
    }

    #[test]
    fn teacher_owns_attendance_but_not_user_management() {
        let caps = capabilities_for_role(Role::Teacher);
        assert!(can_perform(&caps, Subject::Attendance, Action::Create));
        assert!(can_perform(&caps, Subject::Attendance, Action::Update));
        assert!(can_perform(&caps, Subject::Students, Action::View));
        assert!(!can_perform(&caps, Subject::Users, Action::View));
        assert!(!can_perform(&caps, Subject::Students, Action::Delete));
        assert!(!can_perform(&caps, Subject::Payments, Action::View));
    }

    #[test]
    fn student_can_scan_but_not_override() {
        let caps = capabilities_for_role(Role::Student);
        assert!(can_perform(&caps, Subject::Attendance, Action::View));
        assert!(can_perform(&caps, Subject::Attendance, Action::Create));
        assert!(!can_perform(&caps, Subject::Attendance, Action::Update));
        assert!(!can_perform(&caps, Subject::Batches, Action::View));
        assert!(can_perform(&caps, Subject::Payments, Action::View));
        assert!(!can_perform(&caps, Subject::Payments, Action::Create));
    }
}
