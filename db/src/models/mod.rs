pub mod announcement;
pub mod attendance_record;
pub mod attendance_session;
pub mod batch;
pub mod classroom;
pub mod course;
pub mod enrollment;
pub mod payment;
pub mod refresh_token;
pub mod student;
pub mod teacher;
pub mod timetable;
pub mod user;

pub use announcement::Entity as Announcement;
pub use attendance_record::Entity as AttendanceRecord;
pub use attendance_session::Entity as AttendanceSession;
pub use batch::Entity as Batch;
pub use classroom::Entity as Classroom;
pub use course::Entity as Course;
pub use enrollment::Entity as Enrollment;
pub use payment::Entity as Payment;
pub use refresh_token::Entity as RefreshToken;
pub use student::Entity as Student;
pub use teacher::Entity as Teacher;
pub use timetable::Entity as Timetable;
pub use user::Entity as User;
