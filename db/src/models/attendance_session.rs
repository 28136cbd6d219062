use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// One concrete attendance-taking window for a timetable slot on a given
/// date. Sessions are materialized lazily: the first access for a
/// `(timetable, date)` pair creates the row, and the unique index on that
/// pair makes concurrent first accesses converge on a single session.
///
/// `token` is the opaque value embedded in the QR scan URL. Once
/// `expired_at` has passed the token stops admitting scans, and the session
/// is flipped to `finished` the next time it is read.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub timetable_id: i64,
    pub date: NaiveDate,
    #[serde(skip_serializing)]
    pub token: String,
    pub expired_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString,
    Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_session_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "pending")]
    Pending,

    #[sea_orm(string_value = "finished")]
    Finished,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::timetable::Entity",
        from = "Column::TimetableId",
        to = "super::timetable::Column::Id",
        on_delete = "Cascade"
    )]
    Timetable,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::timetable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timetable.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Scan tokens are 32 random bytes, hex encoded. They are bearer secrets, so
/// they come from the OS RNG rather than a seeded generator.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Model {
    /// Computes the UTC window of `timetable` on `date` from its `"HH:MM"`
    /// slot times. Falls back to midnight if a stored time fails to parse,
    /// which `timetable::Model::create` prevents for rows we wrote.
    fn slot_bounds(
        timetable: &super::timetable::Model,
        date: NaiveDate,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = timetable.start_naive().unwrap_or_default();
        let end = timetable.end_naive().unwrap_or_default();
        (
            Utc.from_utc_datetime(&date.and_time(start)),
            Utc.from_utc_datetime(&date.and_time(end)),
        )
    }

    pub async fn create(
        db: &DatabaseConnection,
        timetable: &super::timetable::Model,
        date: NaiveDate,
    ) -> Result<Self, DbErr> {
        let (start_time, end_time) = Self::slot_bounds(timetable, date);
        let now = Utc::now();
        ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            timetable_id: Set(timetable.id),
            date: Set(date),
            token: Set(generate_token()),
            expired_at: Set(end_time),
            start_time: Set(start_time),
            end_time: Set(end_time),
            status: Set(Status::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
    }

    /// Returns the session for `(timetable, date)`, creating it on first
    /// access. If two callers race past the existence check, the unique
    /// index rejects the second insert and we fetch the winner's row.
    pub async fn find_or_create_for(
        db: &DatabaseConnection,
        timetable: &super::timetable::Model,
        date: NaiveDate,
    ) -> Result<Self, DbErr> {
        if let Some(existing) = Self::find_for(db, timetable.id, date).await? {
            return Ok(existing);
        }

        match Self::create(db, timetable, date).await {
            Ok(created) => Ok(created),
            Err(insert_err) => Self::find_for(db, timetable.id, date)
                .await?
                .ok_or(insert_err),
        }
    }

    pub async fn find_for(
        db: &DatabaseConnection,
        timetable_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::TimetableId.eq(timetable_id))
            .filter(Column::Date.eq(date))
            .one(db)
            .await
    }

    pub async fn find_by_id(
        db: &DatabaseConnection,
        id: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id.to_owned()).one(db).await
    }

    pub async fn find_by_token(
        db: &DatabaseConnection,
        token: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find().filter(Column::Token.eq(token)).one(db).await
    }

    pub async fn for_timetables(
        db: &DatabaseConnection,
        timetable_ids: &[i64],
    ) -> Result<Vec<Self>, DbErr> {
        if timetable_ids.is_empty() {
            return Ok(Vec::new());
        }
        Entity::find()
            .filter(Column::TimetableId.is_in(timetable_ids.iter().copied()))
            .order_by_desc(Column::Date)
            .all(db)
            .await
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at
    }

    /// The URL a student's QR scanner lands on.
    pub fn scan_url(&self, frontend_base: &str) -> String {
        format!(
            "{}/student/attendances/scan?token={}",
            frontend_base.trim_end_matches('/'),
            self.token
        )
    }

    /// Lazily finishes an expired session. There is no background sweeper;
    /// any read path calls this and gets the up-to-date status. Finishing
    /// also closes the session's scheduled records so absences become final.
    pub async fn refresh_status(self, db: &DatabaseConnection) -> Result<Self, DbErr> {
        if self.status != Status::Pending || !self.is_expired(Utc::now()) {
            return Ok(self);
        }

        let id = self.id.clone();
        let mut active: ActiveModel = self.into();
        active.status = Set(Status::Finished);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        super::attendance_record::Model::close_for_session(db, &id).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance_record;
    use crate::test_utils::{seed_class, setup_test_db};
    use chrono::Days;

    fn future_date() -> NaiveDate {
        Utc::now().date_naive() + Days::new(30)
    }

    fn past_date() -> NaiveDate {
        Utc::now().date_naive() - Days::new(30)
    }

    #[tokio::test]
    async fn find_or_create_converges_on_one_session() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 2).await;
        let date = future_date();

        let first = Model::find_or_create_for(&db, &class.timetable, date)
            .await
            .unwrap();
        let second = Model::find_or_create_for(&db, &class.timetable, date)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.token, second.token);
        assert_eq!(first.status, Status::Pending);
    }

    #[tokio::test]
    async fn slot_times_come_from_the_timetable() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 1).await;
        let date = future_date();

        let session = Model::find_or_create_for(&db, &class.timetable, date)
            .await
            .unwrap();

        assert_eq!(session.start_time.date_naive(), date);
        assert_eq!(session.start_time.format("%H:%M").to_string(), "09:00");
        assert_eq!(session.end_time.format("%H:%M").to_string(), "10:30");
        assert_eq!(session.expired_at, session.end_time);
    }

    #[tokio::test]
    async fn refresh_status_finishes_expired_session_and_closes_records() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 3).await;

        let session = Model::find_or_create_for(&db, &class.timetable, past_date())
            .await
            .unwrap();
        attendance_record::Model::generate_for_session(&db, &session, class.batch.id)
            .await
            .unwrap();

        let session = session.refresh_status(&db).await.unwrap();
        assert_eq!(session.status, Status::Finished);

        let records = attendance_record::Model::for_session(&db, &session.id)
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert!(
            records
                .iter()
                .all(|r| r.status == attendance_record::Status::Closed)
        );
    }

    #[tokio::test]
    async fn refresh_status_leaves_open_session_pending() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 1).await;

        let session = Model::find_or_create_for(&db, &class.timetable, future_date())
            .await
            .unwrap();
        let session = session.refresh_status(&db).await.unwrap();

        assert_eq!(session.status, Status::Pending);
    }

    #[tokio::test]
    async fn scan_url_embeds_the_token() {
        let db = setup_test_db().await;
        let class = seed_class(&db, 1).await;

        let session = Model::find_or_create_for(&db, &class.timetable, future_date())
            .await
            .unwrap();

        let url = session.scan_url("https://school.test/");
        assert_eq!(
            url,
            format!(
                "https://school.test/student/attendances/scan?token={}",
                session.token
            )
        );
    }
}
