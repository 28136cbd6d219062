use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::QueryOrder;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One fee payment against an enrollment. Amounts are stored in the smallest
/// currency unit, so arithmetic stays integral.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub enrollment_id: i64,
    pub amount: i64,
    pub method: Method,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString,
    Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_method_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Method {
    #[sea_orm(string_value = "kbz_saving")]
    KbzSaving,

    #[sea_orm(string_value = "aya_saving")]
    AyaSaving,

    #[sea_orm(string_value = "kpay")]
    Kpay,

    #[sea_orm(string_value = "aya_pay")]
    AyaPay,

    #[sea_orm(string_value = "wave")]
    Wave,

    #[sea_orm(string_value = "foc")]
    Foc,

    #[sea_orm(string_value = "cash")]
    Cash,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::enrollment::Entity",
        from = "Column::EnrollmentId",
        to = "super::enrollment::Column::Id",
        on_delete = "Cascade"
    )]
    Enrollment,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        enrollment_id: i64,
        amount: i64,
        method: Method,
        paid_at: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        ActiveModel {
            enrollment_id: Set(enrollment_id),
            amount: Set(amount),
            method: Set(method),
            paid_at: Set(paid_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Payment history across all of a student's enrollments, newest first.
    /// Dropped enrollments keep their history.
    pub async fn for_student(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let enrollment_ids =
            super::enrollment::Model::ids_for_student(db, student_id).await?;
        Entity::find()
            .filter(Column::EnrollmentId.is_in(enrollment_ids))
            .order_by_desc(Column::PaidAt)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_class, setup_test_db};

    #[tokio::test]
    async fn payment_history_follows_the_student_not_the_enrollment() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 2).await;

        Model::create(&db, class.enrollments[0].id, 150_000, Method::Kpay, Utc::now())
            .await
            .unwrap();
        Model::create(&db, class.enrollments[1].id, 150_000, Method::Cash, Utc::now())
            .await
            .unwrap();

        // dropping does not erase history
        class.enrollments[0].clone().drop_out(&db).await.unwrap();

        let history = Model::for_student(&db, class.students[0].id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].method, Method::Kpay);
        assert_eq!(history[0].amount, 150_000);
    }
}
