use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A recurring weekly class slot for a batch. `day_of_week` counts from
/// Sunday (0) to Saturday (6); times are stored as `"HH:MM"`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "timetables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub batch_id: i64,
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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
    #[sea_orm(has_many = "super::attendance_session::Entity")]
    Sessions,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        batch_id: i64,
        day_of_week: i32,
        start_time: &str,
        end_time: &str,
    ) -> Result<Self, DbErr> {
        if NaiveTime::parse_from_str(start_time, "%H:%M").is_err()
            || NaiveTime::parse_from_str(end_time, "%H:%M").is_err()
        {
            return Err(DbErr::Custom("Timetable times must be HH:MM".into()));
        }
        if !(0..=6).contains(&day_of_week) {
            return Err(DbErr::Custom("day_of_week must be 0..=6".into()));
        }

        let now = Utc::now();
        ActiveModel {
            batch_id: Set(batch_id),
            day_of_week: Set(day_of_week),
            start_time: Set(start_time.to_owned()),
            end_time: Set(end_time.to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn for_batches(
        db: &DatabaseConnection,
        batch_ids: &[i64],
    ) -> Result<Vec<Self>, DbErr> {
        if batch_ids.is_empty() {
            return Ok(Vec::new());
        }
        Entity::find()
            .filter(Column::BatchId.is_in(batch_ids.iter().copied()))
            .all(db)
            .await
    }

    pub fn start_naive(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.start_time, "%H:%M").ok()
    }

    pub fn end_naive(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.end_time, "%H:%M").ok()
    }
}
