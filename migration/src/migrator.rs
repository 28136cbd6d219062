use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202601050001_create_users::Migration),
            Box::new(migrations::m202601050002_create_teachers_students::Migration),
            Box::new(migrations::m202601050003_create_courses_classrooms::Migration),
            Box::new(migrations::m202601050004_create_batches::Migration),
            Box::new(migrations::m202601050005_create_enrollments::Migration),
            Box::new(migrations::m202601050006_create_timetables::Migration),
            Box::new(migrations::m202601050007_create_attendance::Migration),
            Box::new(migrations::m202601050008_create_refresh_tokens::Migration),
            Box::new(migrations::m202601050009_create_announcements::Migration),
            Box::new(migrations::m202601050010_create_payments::Migration),
        ]
    }
}
