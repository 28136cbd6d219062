use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// A long-lived opaque credential backing the short-lived JWT. Only the
/// sha256 digest of the token is stored; the plaintext exists once, in the
/// login or refresh response that minted it.
///
/// Refresh is rotation: redeeming a token revokes it and issues a
/// replacement, so a stolen token stops working the moment the legitimate
/// client refreshes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl Model {
    /// Mints a fresh refresh token for `user_id` and returns the plaintext
    /// alongside the stored row.
    pub async fn issue(
        db: &DatabaseConnection,
        user_id: i64,
        expiry_days: i64,
    ) -> Result<(String, Self), DbErr> {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let model = ActiveModel {
            user_id: Set(user_id),
            token_digest: Set(digest(&token)),
            expires_at: Set(Utc::now() + Duration::days(expiry_days)),
            revoked: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok((token, model))
    }

    /// Looks up a presented token. Returns `None` for unknown, revoked, or
    /// expired tokens alike; callers cannot distinguish the three.
    pub async fn find_valid(
        db: &DatabaseConnection,
        token: &str,
    ) -> Result<Option<Self>, DbErr> {
        let found = Entity::find()
            .filter(Column::TokenDigest.eq(digest(token)))
            .one(db)
            .await?;

        Ok(found.filter(|t| !t.revoked && t.expires_at > Utc::now()))
    }

    pub async fn revoke(self, db: &DatabaseConnection) -> Result<Self, DbErr> {
        if self.revoked {
            return Ok(self);
        }
        let mut active: ActiveModel = self.into();
        active.revoked = Set(true);
        active.update(db).await
    }

    /// One refresh step: revokes `self` and issues the successor for the
    /// same user. Returns the new plaintext token and row.
    pub async fn rotate(
        self,
        db: &DatabaseConnection,
        expiry_days: i64,
    ) -> Result<(String, Self), DbErr> {
        let user_id = self.user_id;
        self.revoke(db).await?;
        Self::issue(db, user_id, expiry_days).await
    }

    /// Revokes every live token of a user, i.e. logout everywhere.
    pub async fn revoke_all_for_user(
        db: &DatabaseConnection,
        user_id: i64,
    ) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Revoked, Expr::value(true))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Revoked.eq(false))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Model as User, Role};
    use crate::test_utils::setup_test_db;

    async fn seed_user(db: &DatabaseConnection) -> User {
        User::create(db, "admin", "admin@school.test", "password1", Role::Admin)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn issued_token_is_valid_and_unknown_token_is_not() {
        let db = setup_test_db().await;
        let user = seed_user(&db).await;

        let (token, row) = Model::issue(&db, user.id, 7).await.unwrap();
        assert_eq!(row.token_digest, digest(&token));

        let found = Model::find_valid(&db, &token).await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(row.id));

        assert!(Model::find_valid(&db, "deadbeef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotation_revokes_the_redeemed_token() {
        let db = setup_test_db().await;
        let user = seed_user(&db).await;

        let (old_token, row) = Model::issue(&db, user.id, 7).await.unwrap();
        let (new_token, _) = row.rotate(&db, 7).await.unwrap();

        assert!(Model::find_valid(&db, &old_token).await.unwrap().is_none());
        assert!(Model::find_valid(&db, &new_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn revoke_all_kills_every_live_token() {
        let db = setup_test_db().await;
        let user = seed_user(&db).await;

        let (a, _) = Model::issue(&db, user.id, 7).await.unwrap();
        let (b, _) = Model::issue(&db, user.id, 7).await.unwrap();

        let revoked = Model::revoke_all_for_user(&db, user.id).await.unwrap();
        assert_eq!(revoked, 2);
        assert!(Model::find_valid(&db, &a).await.unwrap().is_none());
        assert!(Model::find_valid(&db, &b).await.unwrap().is_none());
    }
}
