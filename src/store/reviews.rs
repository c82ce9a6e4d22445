use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};

use super::{ReviewStore, StoreError, StoreResult, expect_rows};
use crate::{
    entities::review,
    models::{NewReview, Review, now_millis},
};

#[derive(Clone)]
pub struct DbReviewStore {
    db: DatabaseConnection,
}

impl DbReviewStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReviewStore for DbReviewStore {
    async fn add(&self, movie_id: i32, r: NewReview) -> StoreResult<Review> {
        let model = review::ActiveModel {
            id: Default::default(),
            movie_id: Set(movie_id),
            user_id: Set(r.user_id),
            score: Set(r.score),
            text: Set(r.text),
            created_at: Set(now_millis()),
        };
        Ok(model.insert(&self.db).await?.into())
    }

    async fn list_by_movie(&self, movie_id: i32) -> StoreResult<Vec<Review>> {
        let rows = review::Entity::find()
            .filter(review::Column::MovieId.eq(movie_id))
            .order_by_asc(review::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn update_by_movie_and_user(
        &self,
        movie_id: i32,
        user_id: i32,
        score: i32,
    ) -> StoreResult<()> {
        let res = review::Entity::update_many()
            .col_expr(review::Column::Score, Expr::value(score))
            .filter(review::Column::MovieId.eq(movie_id))
            .filter(review::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        expect_rows(res.rows_affected)
    }

    async fn delete_by_movie_and_user(&self, movie_id: i32, user_id: i32) -> StoreResult<()> {
        let res = review::Entity::delete_many()
            .filter(review::Column::MovieId.eq(movie_id))
            .filter(review::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        expect_rows(res.rows_affected)
    }

    async fn get(&self, id: i32) -> StoreResult<Review> {
        review::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Review::from)
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_id(&self, id: i32) -> StoreResult<()> {
        let res = review::Entity::delete_by_id(id).exec(&self.db).await?;
        expect_rows(res.rows_affected)
    }
}
