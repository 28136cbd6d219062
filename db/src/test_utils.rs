use chrono::NaiveDate;
use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::models::{batch, classroom, course, enrollment, student, teacher, timetable, user};

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// A minimal teaching setup: one batch with a weekly slot and `n` enrolled
/// students. Most attendance tests start from this.
pub struct ClassFixture {
    pub teacher: teacher::Model,
    pub batch: batch::Model,
    pub timetable: timetable::Model,
    pub students: Vec<student::Model>,
    pub enrollments: Vec<enrollment::Model>,
}

pub async fn seed_class(db: &DatabaseConnection, n: usize) -> ClassFixture {
    let teacher_user = user::Model::create(
        db,
        "t.moyo",
        "t.moyo@school.test",
        "password1",
        user::Role::Teacher,
    )
    .await
    .unwrap();
    let teacher = teacher::Model::create(db, teacher_user.id, "T. Moyo", None)
        .await
        .unwrap();

    let course = course::Model::create(db, "Mathematics", None).await.unwrap();
    let classroom = classroom::Model::create(db, "Room 12", 40).await.unwrap();

    let batch = batch::Model::create(
        db,
        "Math 2026-A",
        course.id,
        teacher.id,
        classroom.id,
        batch::Status::Active,
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        None,
    )
    .await
    .unwrap();

    let timetable = timetable::Model::create(db, batch.id, 1, "09:00", "10:30")
        .await
        .unwrap();

    let mut students = Vec::with_capacity(n);
    let mut enrollments = Vec::with_capacity(n);
    for i in 0..n {
        let u = user::Model::create(
            db,
            &format!("student{i}"),
            &format!("student{i}@school.test"),
            "password1",
            user::Role::Student,
        )
        .await
        .unwrap();
        let s = student::Model::create(db, u.id, &format!("Student {i}"), None)
            .await
            .unwrap();
        let e = enrollment::Model::create(db, batch.id, s.id).await.unwrap();
        students.push(s);
        enrollments.push(e);
    }

    ClassFixture {
        teacher,
        batch,
        timetable,
        students,
        enrollments,
    }
}
