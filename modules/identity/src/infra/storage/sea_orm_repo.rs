//! SeaORM adapter for [`UsersRepository`]. Generic over the connection so it
//! also runs on a transaction.

use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter,
};
use uuid::Uuid;

use crate::domain::model::{normalize_email, User};
use crate::domain::repo::UsersRepository;
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};

pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        UserEntity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("find_by_ids failed")?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        UserEntity::find()
            .filter(Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("find_by_email failed")?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_login(&self, email_or_phone: &str) -> anyhow::Result<Option<User>> {
        UserEntity::find()
            .filter(
                Condition::any()
                    .add(Column::Email.eq(normalize_email(email_or_phone)))
                    .add(Column::Phone.eq(email_or_phone)),
            )
            .one(&self.conn)
            .await
            .context("find_by_login failed")?
            .map(User::try_from)
            .transpose()
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let count = UserEntity::find()
            .filter(Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("email_exists failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, user: User) -> anyhow::Result<()> {
        let _ = UserAM::from(user)
            .insert(&self.conn)
            .await
            .context("insert failed")?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        UserEntity::update_many()
            .col_expr(Column::ResetTokenHash, Expr::value(digest))
            .col_expr(Column::ResetTokenExpiresAt, Expr::value(expires_at))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("set_reset_token failed")?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = UserEntity::update_many()
            .col_expr(Column::PasswordHash, Expr::value(new_password_hash))
            .col_expr(Column::ResetTokenHash, Expr::value(Option::<String>::None))
            .col_expr(
                Column::ResetTokenExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::ResetTokenHash.eq(digest))
            .filter(Column::ResetTokenExpiresAt.gt(now))
            .exec(&self.conn)
            .await
            .context("consume_reset_token failed")?;
        Ok(res.rows_affected > 0)
    }
}
