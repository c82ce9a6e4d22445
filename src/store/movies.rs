use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

use super::{MovieStore, StoreError, StoreResult, expect_rows};
use crate::{
    entities::{movie, review},
    models::{Movie, NewMovieRecord},
};

#[derive(Clone)]
pub struct DbMovieStore {
    db: DatabaseConnection,
}

impl DbMovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MovieStore for DbMovieStore {
    async fn create(&self, movie: NewMovieRecord) -> StoreResult<Movie> {
        let model = movie::ActiveModel {
            id: Default::default(),
            tmdb_id: Set(movie.tmdb_id),
            title: Set(movie.title),
            year: Set(movie.year),
            description: Set(movie.description),
            rating: Set(0.0),
        };
        Ok(model.insert(&self.db).await?.into())
    }

    async fn all(&self) -> StoreResult<Vec<Movie>> {
        let rows = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn get(&self, id: i32) -> StoreResult<Movie> {
        movie::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Movie::from)
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_tmdb_id(&self, tmdb_id: i32) -> StoreResult<Movie> {
        movie::Entity::find()
            .filter(movie::Column::TmdbId.eq(tmdb_id))
            .one(&self.db)
            .await?
            .map(Movie::from)
            .ok_or(StoreError::NotFound)
    }

    async fn exists_by_tmdb_id(&self, tmdb_id: i32) -> StoreResult<bool> {
        let count = movie::Entity::find()
            .filter(movie::Column::TmdbId.eq(tmdb_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn update(&self, m: &Movie) -> StoreResult<Movie> {
        let res = movie::Entity::update_many()
            .col_expr(movie::Column::TmdbId, Expr::value(m.tmdb_id))
            .col_expr(movie::Column::Title, Expr::value(m.title.clone()))
            .col_expr(movie::Column::Year, Expr::value(m.year))
            .col_expr(movie::Column::Description, Expr::value(m.description.clone()))
            .filter(movie::Column::Id.eq(m.id))
            .exec(&self.db)
            .await?;
        expect_rows(res.rows_affected)?;
        self.get(m.id).await
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let txn = self.db.begin().await?;

        review::Entity::delete_many().filter(review::Column::MovieId.eq(id)).exec(&txn).await?;
        let res = movie::Entity::delete_by_id(id).exec(&txn).await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Err(StoreError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }

    async fn set_rating(&self, id: i32, rating: f64) -> StoreResult<()> {
        let res = movie::Entity::update_many()
            .col_expr(movie::Column::Rating, Expr::value(rating))
            .filter(movie::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        expect_rows(res.rows_affected)
    }

    async fn search(&self, title: &str, year: i32) -> StoreResult<Vec<Movie>> {
        let mut query = movie::Entity::find();
        if year > 0 {
            query = query.filter(movie::Column::Year.eq(year));
        }
        let rows = query.order_by_asc(movie::Column::Id).all(&self.db).await?;

        // SQLite's LOWER and LIKE only fold ASCII, so titles are matched here.
        let needle = title.trim().to_lowercase();
        Ok(rows
            .into_iter()
            .filter(|m| needle.is_empty() || m.title.to_lowercase().contains(&needle))
            .map(Movie::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        db,
        models::NewReview,
        store::{DbReviewStore, ReviewStore},
    };

    async fn store() -> DbMovieStore {
        DbMovieStore::new(db::connect_in_memory().await.expect("in-memory db"))
    }

    fn record(title: &str, year: i32) -> NewMovieRecord {
        NewMovieRecord { title: title.to_string(), year, ..Default::default() }
    }

    #[tokio::test]
    async fn create_assigns_id_and_zero_rating() {
        let movies = store().await;
        let a = movies.create(record("Dune", 2021)).await.unwrap();
        let b = movies.create(record("Arrival", 2016)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.rating, 0.0);
        assert_eq!(movies.get(a.id).await.unwrap(), a);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let movies = store().await;
        assert_matches!(movies.get(404).await, Err(StoreError::NotFound));
        assert_matches!(movies.delete(404).await, Err(StoreError::NotFound));
        assert_matches!(movies.set_rating(404, 3.0).await, Err(StoreError::NotFound));

        let ghost = Movie {
            id: 404,
            tmdb_id: None,
            title: "Ghost".into(),
            year: 1990,
            description: String::new(),
            rating: 0.0,
        };
        assert_matches!(movies.update(&ghost).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn update_keeps_rating() {
        let movies = store().await;
        let mut m = movies.create(record("Dune", 2021)).await.unwrap();
        movies.set_rating(m.id, 4.5).await.unwrap();

        m.title = "Dune: Part One".into();
        m.rating = 1.0;
        let updated = movies.update(&m).await.unwrap();

        assert_eq!(updated.title, "Dune: Part One");
        assert_eq!(updated.rating, 4.5);
    }

    #[tokio::test]
    async fn search_matches_title_case_insensitively_and_year_exactly() {
        let movies = store().await;
        movies.create(record("Dune", 2021)).await.unwrap();
        movies.create(record("Dune", 1984)).await.unwrap();
        movies.create(record("Arrival", 2016)).await.unwrap();

        assert_eq!(movies.search("", 0).await.unwrap().len(), 3);
        assert_eq!(movies.search("dUN", 0).await.unwrap().len(), 2);
        assert_eq!(movies.search("dune", 1984).await.unwrap().len(), 1);
        assert_eq!(movies.search("", 2016).await.unwrap()[0].title, "Arrival");
        assert!(movies.search("dune", 2016).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let movies = store().await;
        movies.create(record("100% Wolf", 2020)).await.unwrap();
        movies.create(record("1000 Wolves", 2020)).await.unwrap();

        let hits = movies.search("100%", 0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% Wolf");
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let movies = store().await;
        movies.create(record("Élite", 2018)).await.unwrap();
        movies.create(record("Ötzi", 2023)).await.unwrap();

        assert_eq!(movies.search("élite", 0).await.unwrap().len(), 1);
        assert_eq!(movies.search("ÉLITE", 0).await.unwrap().len(), 1);
        assert_eq!(movies.search("Élite", 2018).await.unwrap().len(), 1);
        assert_eq!(movies.search("ötz", 0).await.unwrap()[0].title, "Ötzi");
        assert!(movies.search("élite", 2023).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tmdb_lookup() {
        let movies = store().await;
        let m = movies
            .create(NewMovieRecord { tmdb_id: Some(550), ..record("Fight Club", 1999) })
            .await
            .unwrap();

        assert!(movies.exists_by_tmdb_id(550).await.unwrap());
        assert!(!movies.exists_by_tmdb_id(551).await.unwrap());
        assert_eq!(movies.get_by_tmdb_id(550).await.unwrap().id, m.id);

        let dup = movies.create(NewMovieRecord { tmdb_id: Some(550), ..record("Again", 1999) }).await;
        assert_matches!(dup, Err(StoreError::Conflict));
    }

    #[tokio::test]
    async fn delete_cascades_to_reviews() {
        let db = db::connect_in_memory().await.unwrap();
        let movies = DbMovieStore::new(db.clone());
        let reviews = DbReviewStore::new(db);

        let m = movies.create(record("Dune", 2021)).await.unwrap();
        let r = reviews
            .add(m.id, NewReview { user_id: 1, score: 5, text: None })
            .await
            .unwrap();

        movies.delete(m.id).await.unwrap();

        assert_matches!(movies.get(m.id).await, Err(StoreError::NotFound));
        assert_matches!(reviews.get(r.id).await, Err(StoreError::NotFound));
        assert!(reviews.list_by_movie(m.id).await.unwrap().is_empty());
    }
}
