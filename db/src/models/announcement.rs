use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use serde::Serialize;

/// A notice posted by staff. `batch_id = None` means school-wide; otherwise
/// the announcement is scoped to one batch.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "announcements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub batch_id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub pinned: bool,
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
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        batch_id: Option<i64>,
        user_id: i64,
        title: &str,
        body: &str,
        pinned: bool,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        ActiveModel {
            batch_id: Set(batch_id),
            user_id: Set(user_id),
            title: Set(title.to_owned()),
            body: Set(body.to_owned()),
            pinned: Set(pinned),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Announcements visible from within `batch_ids`: the batches' own plus
    /// school-wide ones, pinned first, newest first within each group.
    pub async fn visible_for_batches(
        db: &DatabaseConnection,
        batch_ids: &[i64],
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(
                Column::BatchId
                    .is_null()
                    .or(Column::BatchId.is_in(batch_ids.iter().copied())),
            )
            .order_by_desc(Column::Pinned)
            .order_by_desc(Column::CreatedAt)
            .all(db)
            .await
    }
}
