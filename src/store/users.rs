use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::Expr,
};

use super::{StoreError, StoreResult, UserStore, expect_rows};
use crate::{
    entities::user,
    models::{NewUserRecord, User, now_millis},
};

#[derive(Clone)]
pub struct DbUserStore {
    db: DatabaseConnection,
}

impl DbUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for DbUserStore {
    async fn create(&self, u: NewUserRecord) -> StoreResult<User> {
        let model = user::ActiveModel {
            id: Default::default(),
            username: Set(u.username),
            email: Set(u.email),
            password_hash: Set(u.password_hash),
            role: Set(u.role.as_str().to_string()),
            created_at: Set(now_millis()),
        };
        Ok(model.insert(&self.db).await?.into())
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(User::from)
            .ok_or(StoreError::NotFound)
    }

    async fn get(&self, id: i32) -> StoreResult<User> {
        user::Entity::find_by_id(id).one(&self.db).await?.map(User::from).ok_or(StoreError::NotFound)
    }

    async fn update(&self, u: &User) -> StoreResult<User> {
        let res = user::Entity::update_many()
            .col_expr(user::Column::Username, Expr::value(u.username.clone()))
            .col_expr(user::Column::Email, Expr::value(u.email.clone()))
            .filter(user::Column::Id.eq(u.id))
            .exec(&self.db)
            .await?;
        expect_rows(res.rows_affected)?;
        self.get(u.id).await
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> StoreResult<()> {
        let res = user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        expect_rows(res.rows_affected)
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let res = user::Entity::delete_by_id(id).exec(&self.db).await?;
        expect_rows(res.rows_affected)
    }
}
