use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One enrolled student's attendance mark for one session.
///
/// Records are created by [`Model::generate_for_session`] or on the fly by a
/// scan that arrives before generation ran. The `present` flag is monotonic:
/// it only ever moves from `false` to `true`, whether by scan or by teacher
/// override.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: String,
    pub enrollment_id: i64,
    pub present: bool,
    pub status: Status,
    #[serde(skip_serializing)]
    pub token: String,
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString,
    Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_record_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    /// Session still open, mark still mutable by scanning.
    #[sea_orm(string_value = "scheduled")]
    Scheduled,

    /// Session finished, the mark is the final result.
    #[sea_orm(string_value = "closed")]
    Closed,

    /// Enrollment was dropped before the session finished. Excluded from
    /// summary totals.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::enrollment::Entity",
        from = "Column::EnrollmentId",
        to = "super::enrollment::Column::Id",
        on_delete = "Cascade"
    )]
    Enrollment,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Present and total counts for one session. `total` never includes
/// cancelled records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub present: u64,
    pub total: u64,
}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        session: &super::attendance_session::Model,
        enrollment_id: i64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        ActiveModel {
            session_id: Set(session.id.clone()),
            enrollment_id: Set(enrollment_id),
            present: Set(false),
            status: Set(Status::Scheduled),
            token: Set(session.token.clone()),
            expired_at: Set(session.expired_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Creates a scheduled record for every active enrollment of the
    /// session's batch that does not have one yet. Safe to call repeatedly;
    /// existing records (and their marks) are left untouched. Returns how
    /// many records were created.
    pub async fn generate_for_session(
        db: &DatabaseConnection,
        session: &super::attendance_session::Model,
        batch_id: i64,
    ) -> Result<u64, DbErr> {
        let enrollments = super::enrollment::Model::active_for_batch(db, batch_id).await?;
        let existing: Vec<i64> = Entity::find()
            .filter(Column::SessionId.eq(session.id.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.enrollment_id)
            .collect();

        let mut created = 0u64;
        for enrollment in enrollments {
            if existing.contains(&enrollment.id) {
                continue;
            }
            // a concurrent generate can still win the unique index race;
            // treat that insert failure as "already there"
            if Self::create(db, session, enrollment.id).await.is_ok() {
                created += 1;
            }
        }
        Ok(created)
    }

    pub async fn for_session(
        db: &DatabaseConnection,
        session_id: &str,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::EnrollmentId)
            .all(db)
            .await
    }

    pub async fn find_for_enrollment(
        db: &DatabaseConnection,
        session_id: &str,
        enrollment_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::EnrollmentId.eq(enrollment_id))
            .one(db)
            .await
    }

    /// Lookup with an insert fallback, for scans that race generation or
    /// each other. If the insert loses the unique index race the row that
    /// won is returned instead.
    pub async fn find_or_create_for_enrollment(
        db: &DatabaseConnection,
        session: &super::attendance_session::Model,
        enrollment_id: i64,
    ) -> Result<Self, DbErr> {
        if let Some(record) = Self::find_for_enrollment(db, &session.id, enrollment_id).await? {
            return Ok(record);
        }
        match Self::create(db, session, enrollment_id).await {
            Ok(created) => Ok(created),
            Err(insert_err) => Self::find_for_enrollment(db, &session.id, enrollment_id)
                .await?
                .ok_or(insert_err),
        }
    }

    /// Raises the present flag. Marking twice is a no-op, and nothing ever
    /// lowers the flag again.
    pub async fn mark_present(self, db: &DatabaseConnection) -> Result<Self, DbErr> {
        if self.present {
            return Ok(self);
        }
        let mut active: ActiveModel = self.into();
        active.present = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Finalizes all still-scheduled records of a finished session.
    pub async fn close_for_session(
        db: &DatabaseConnection,
        session_id: &str,
    ) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(Status::Closed))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(Status::Scheduled))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Cancels the scheduled records of a dropped enrollment. Closed records
    /// keep their historical result.
    pub async fn cancel_for_enrollment(
        db: &DatabaseConnection,
        enrollment_id: i64,
    ) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(Status::Cancelled))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::EnrollmentId.eq(enrollment_id))
            .filter(Column::Status.eq(Status::Scheduled))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Present/total counts for one session.
    ///
    /// The total is the larger of the non-cancelled record count and the
    /// batch's current active enrollment count. Records can trail behind
    /// enrollments (generation has not run, or only some students scanned on
    /// the fly), and after a drop the cancelled records leave both sides.
    pub async fn summary_for_session(
        db: &DatabaseConnection,
        session_id: &str,
        batch_id: i64,
    ) -> Result<Summary, DbErr> {
        let recorded = Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.ne(Status::Cancelled))
            .count(db)
            .await?;
        let enrolled =
            super::enrollment::Model::active_count_for_batch(db, batch_id).await?;

        let present = if recorded == 0 {
            0
        } else {
            Entity::find()
                .filter(Column::SessionId.eq(session_id))
                .filter(Column::Status.ne(Status::Cancelled))
                .filter(Column::Present.eq(true))
                .count(db)
                .await?
        };

        Ok(Summary {
            present,
            total: recorded.max(enrolled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance_session;
    use crate::test_utils::{seed_class, setup_test_db, ClassFixture};
    use chrono::Days;
    use sea_orm::DatabaseConnection;

    async fn open_session(
        db: &DatabaseConnection,
        class: &ClassFixture,
    ) -> attendance_session::Model {
        let date = Utc::now().date_naive() + Days::new(30);
        attendance_session::Model::find_or_create_for(db, &class.timetable, date)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn generate_is_idempotent() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 3).await;
        let session = open_session(&db, &class).await;

        let first = Model::generate_for_session(&db, &session, class.batch.id)
            .await
            .unwrap();
        let second = Model::generate_for_session(&db, &session, class.batch.id)
            .await
            .unwrap();

        assert_eq!(first, 3);
        assert_eq!(second, 0);
        assert_eq!(Model::for_session(&db, &session.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn generate_skips_dropped_enrollments() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 3).await;
        class.enrollments[0].clone().drop_out(&db).await.unwrap();

        let session = open_session(&db, &class).await;
        let created = Model::generate_for_session(&db, &session, class.batch.id)
            .await
            .unwrap();

        assert_eq!(created, 2);
    }

    #[tokio::test]
    async fn mark_present_is_monotonic() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 1).await;
        let session = open_session(&db, &class).await;
        Model::generate_for_session(&db, &session, class.batch.id)
            .await
            .unwrap();

        let record = Model::find_for_enrollment(&db, &session.id, class.enrollments[0].id)
            .await
            .unwrap()
            .unwrap();
        assert!(!record.present);

        let record = record.mark_present(&db).await.unwrap();
        assert!(record.present);

        // a second scan changes nothing
        let record = record.mark_present(&db).await.unwrap();
        assert!(record.present);
    }

    #[tokio::test]
    async fn losing_the_insert_race_still_resolves_the_existing_record() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 1).await;
        let session = open_session(&db, &class).await;
        let enrollment_id = class.enrollments[0].id;

        let first = Model::create(&db, &session, enrollment_id).await.unwrap();
        // a duplicate insert hits the unique index
        assert!(Model::create(&db, &session, enrollment_id).await.is_err());

        let resolved = Model::find_or_create_for_enrollment(&db, &session, enrollment_id)
            .await
            .unwrap();
        assert_eq!(resolved.id, first.id);
        assert_eq!(Model::for_session(&db, &session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closing_a_session_leaves_cancelled_records_cancelled() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 2).await;
        let session = open_session(&db, &class).await;
        Model::generate_for_session(&db, &session, class.batch.id)
            .await
            .unwrap();

        class.enrollments[1].clone().drop_out(&db).await.unwrap();
        Model::close_for_session(&db, &session.id).await.unwrap();

        let records = Model::for_session(&db, &session.id).await.unwrap();
        let by_enrollment = |id: i64| {
            records
                .iter()
                .find(|r| r.enrollment_id == id)
                .unwrap()
                .status
        };
        assert_eq!(by_enrollment(class.enrollments[0].id), Status::Closed);
        assert_eq!(by_enrollment(class.enrollments[1].id), Status::Cancelled);
    }

    #[tokio::test]
    async fn dropping_an_enrollment_shrinks_the_summary() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 3).await;
        let session = open_session(&db, &class).await;
        Model::generate_for_session(&db, &session, class.batch.id)
            .await
            .unwrap();

        Model::find_for_enrollment(&db, &session.id, class.enrollments[0].id)
            .await
            .unwrap()
            .unwrap()
            .mark_present(&db)
            .await
            .unwrap();
        class.enrollments[2].clone().drop_out(&db).await.unwrap();

        let summary = Model::summary_for_session(&db, &session.id, class.batch.id)
            .await
            .unwrap();
        assert_eq!(summary, Summary { present: 1, total: 2 });
    }

    #[tokio::test]
    async fn summary_falls_back_to_enrollment_count_before_generation() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 4).await;
        let session = open_session(&db, &class).await;

        let summary = Model::summary_for_session(&db, &session.id, class.batch.id)
            .await
            .unwrap();
        assert_eq!(summary, Summary { present: 0, total: 4 });
    }
}
