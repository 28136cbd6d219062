pub mod m202601050001_create_users;
pub mod m202601050002_create_teachers_students;
pub mod m202601050003_create_courses_classrooms;
pub mod m202601050004_create_batches;
pub mod m202601050005_create_enrollments;
pub mod m202601050006_create_timetables;
pub mod m202601050007_create_attendance;
pub mod m202601050008_create_refresh_tokens;
pub mod m202601050009_create_announcements;
pub mod m202601050010_create_payments;
