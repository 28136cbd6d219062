use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One student's membership of one batch. The set of `active` enrollments at
/// generation time is the attendance summary denominator.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub batch_id: i64,
    pub student_id: i64,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString,
    Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "enrollment_status_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "active")]
    Active,

    #[sea_orm(string_value = "dropped")]
    Dropped,

    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id",
        on_delete = "Cascade"
    )]
    Batch,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        batch_id: i64,
        student_id: i64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        ActiveModel {
            batch_id: Set(batch_id),
            student_id: Set(student_id),
            status: Set(Status::Active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Active enrollments of a batch, i.e. the students who get a record when
    /// a session is generated.
    pub async fn active_for_batch(
        db: &DatabaseConnection,
        batch_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .filter(Column::Status.eq(Status::Active))
            .all(db)
            .await
    }

    pub async fn active_count_for_batch(
        db: &DatabaseConnection,
        batch_id: i64,
    ) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .filter(Column::Status.eq(Status::Active))
            .count(db)
            .await
    }

    pub async fn batch_ids_for_student(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        Ok(Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::Status.eq(Status::Active))
            .all(db)
            .await?
            .into_iter()
            .map(|e| e.batch_id)
            .collect())
    }

    /// Every enrollment id a student has ever held, regardless of status.
    /// Payment history hangs off these.
    pub async fn ids_for_student(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        Ok(Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .all(db)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect())
    }

    pub async fn find_active_for_student_in_batch(
        db: &DatabaseConnection,
        batch_id: i64,
        student_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::Status.eq(Status::Active))
            .one(db)
            .await
    }

    /// Marks the enrollment dropped and cancels its scheduled attendance
    /// records so they leave the summary denominator.
    pub async fn drop_out(self, db: &DatabaseConnection) -> Result<Self, DbErr> {
        let id = self.id;
        let mut active: ActiveModel = self.into();
        active.status = Set(Status::Dropped);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        super::attendance_record::Model::cancel_for_enrollment(db, id).await?;
        Ok(updated)
    }
}
