//! Asynchronous recomputation of movie ratings.
//!
//! ```text
//! ReviewService (add / update / delete / admin delete)
//!        |
//!        v
//! RatingQueue::enqueue(movie_id)      bounded mpsc, any number of producers
//!        |
//!        v
//! run_worker (single consumer task)
//!        |
//!        +--> ReviewStore::list_by_movie   re-read at dequeue time
//!        |
//!        v
//! MovieStore::set_rating              the only writer of Movie::rating
//! ```
//!
//! Signals for the same movie are handled in enqueue order. Because the
//! review set is read when a signal is dequeued, a burst of mutations
//! collapses into recomputations that all see the latest state; duplicates
//! are not removed and are harmless.
//!
//! Recomputations never overlap. The worker and the inline overflow path
//! share one lock, so the recomputation that starts later also reads the
//! later review set and writes last.
//!
//! Failures are logged and dropped. The mutation that produced the signal
//! has already committed, so a failed recomputation only leaves the rating
//! stale until the next signal for that movie. Signals still queued when
//! the process exits are lost.

use std::{str::FromStr, sync::Arc};

use tokio::{
    sync::{
        Mutex,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::store::{MovieStore, ReviewStore, StoreResult};

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// What a producer does when the queue is full.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OverflowPolicy {
    /// Wait for space. Bounds memory at the cost of request latency.
    #[default]
    Block,
    /// Recompute on the producer's task instead of queueing.
    Inline,
}

impl FromStr for OverflowPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "inline" => Ok(OverflowPolicy::Inline),
            other => anyhow::bail!("unknown overflow policy `{other}` (expected block or inline)"),
        }
    }
}

/// Recomputes and persists the rating of one movie.
pub struct Recalculator {
    movies: Arc<dyn MovieStore>,
    reviews: Arc<dyn ReviewStore>,
    /// Held across read and write of every recomputation.
    running: Mutex<()>,
}

impl Recalculator {
    pub fn new(movies: Arc<dyn MovieStore>, reviews: Arc<dyn ReviewStore>) -> Self {
        Self { movies, reviews, running: Mutex::new(()) }
    }

    /// Returns the rating that was written.
    pub async fn recompute(&self, movie_id: i32) -> StoreResult<f64> {
        let _guard = self.running.lock().await;
        let scores: Vec<i32> =
            self.reviews.list_by_movie(movie_id).await?.into_iter().map(|r| r.score).collect();
        let rating = mean(&scores);
        self.movies.set_rating(movie_id, rating).await?;
        Ok(rating)
    }

    async fn recompute_logged(&self, movie_id: i32) {
        match self.recompute(movie_id).await {
            Ok(rating) => debug!(movie_id, rating, "rating recomputed"),
            Err(err) => warn!(movie_id, error = %err, "rating recomputation failed"),
        }
    }
}

/// Arithmetic mean of the scores, 0 when there are none. No rounding.
pub fn mean(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    sum as f64 / scores.len() as f64
}

/// Producer handle for the aggregator. Cheap to clone.
///
/// Only [`RatingQueue::start`] creates one, so a queue cannot exist without
/// its consumer having been spawned.
#[derive(Clone)]
pub struct RatingQueue {
    tx: mpsc::Sender<i32>,
    overflow: OverflowPolicy,
    recalculator: Arc<Recalculator>,
}

impl RatingQueue {
    /// Spawns the consumer task. The task ends once every `RatingQueue`
    /// clone has been dropped and the remaining signals are drained.
    pub fn start(
        recalculator: Recalculator,
        capacity: usize,
        overflow: OverflowPolicy,
    ) -> (Self, JoinHandle<()>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let recalculator = Arc::new(recalculator);

        info!(capacity, ?overflow, "rating aggregator started");
        let worker = tokio::spawn(run_worker(rx, recalculator.clone()));

        (Self { tx, overflow, recalculator }, worker)
    }

    /// Signals that `movie_id`'s review set changed.
    pub async fn enqueue(&self, movie_id: i32) {
        match self.overflow {
            OverflowPolicy::Block => {
                if self.tx.send(movie_id).await.is_err() {
                    warn!(movie_id, "rating aggregator is gone, signal dropped");
                }
            },
            OverflowPolicy::Inline => match self.tx.try_send(movie_id) {
                Ok(()) => {},
                Err(TrySendError::Full(movie_id)) => {
                    debug!(movie_id, "rating queue full, recomputing inline");
                    self.recalculator.recompute_logged(movie_id).await;
                },
                Err(TrySendError::Closed(movie_id)) => {
                    warn!(movie_id, "rating aggregator is gone, signal dropped");
                },
            },
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<i32>, recalculator: Arc<Recalculator>) {
    while let Some(movie_id) = rx.recv().await {
        recalculator.recompute_logged(movie_id).await;
    }
    info!("rating queue closed, aggregator stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        db,
        models::{NewMovieRecord, NewReview, Review},
        store::{DbMovieStore, DbReviewStore},
    };

    /// Pauses after reading a movie's reviews, so a recomputation holds a
    /// snapshot that later writes can make stale.
    struct SlowReads {
        inner: Arc<DbReviewStore>,
        pause: Duration,
    }

    #[async_trait]
    impl ReviewStore for SlowReads {
        async fn add(&self, movie_id: i32, review: NewReview) -> StoreResult<Review> {
            self.inner.add(movie_id, review).await
        }

        async fn list_by_movie(&self, movie_id: i32) -> StoreResult<Vec<Review>> {
            let rows = self.inner.list_by_movie(movie_id).await?;
            tokio::time::sleep(self.pause).await;
            Ok(rows)
        }

        async fn update_by_movie_and_user(
            &self,
            movie_id: i32,
            user_id: i32,
            score: i32,
        ) -> StoreResult<()> {
            self.inner.update_by_movie_and_user(movie_id, user_id, score).await
        }

        async fn delete_by_movie_and_user(&self, movie_id: i32, user_id: i32) -> StoreResult<()> {
            self.inner.delete_by_movie_and_user(movie_id, user_id).await
        }

        async fn get(&self, id: i32) -> StoreResult<Review> {
            self.inner.get(id).await
        }

        async fn delete_by_id(&self, id: i32) -> StoreResult<()> {
            self.inner.delete_by_id(id).await
        }
    }

    async fn stores() -> (Arc<DbMovieStore>, Arc<DbReviewStore>) {
        let db = db::connect_in_memory().await.expect("in-memory db");
        (Arc::new(DbMovieStore::new(db.clone())), Arc::new(DbReviewStore::new(db)))
    }

    fn recalculator(movies: &Arc<DbMovieStore>, reviews: &Arc<DbReviewStore>) -> Recalculator {
        Recalculator::new(movies.clone(), reviews.clone())
    }

    async fn movie(movies: &DbMovieStore) -> i32 {
        movies
            .create(NewMovieRecord { title: "Dune".into(), year: 2021, ..Default::default() })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn mean_of_scores() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[5, 4, 3]), 4.0);
        assert_eq!(mean(&[5, 4]), 4.5);
        assert!((mean(&[1, 2, 2]) - 5.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overflow_policy_parses() {
        assert_eq!("block".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Block);
        assert_eq!(" Inline ".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Inline);
        assert!("drop".parse::<OverflowPolicy>().is_err());
    }

    #[tokio::test]
    async fn recompute_writes_mean_and_resets_to_zero() {
        let (movies, reviews) = stores().await;
        let id = movie(&movies).await;
        let recalc = recalculator(&movies, &reviews);

        for (user_id, score) in [(1, 5), (2, 2)] {
            reviews.add(id, NewReview { user_id, score, text: None }).await.unwrap();
        }
        assert_eq!(recalc.recompute(id).await.unwrap(), 3.5);
        assert_eq!(movies.get(id).await.unwrap().rating, 3.5);

        reviews.delete_by_movie_and_user(id, 1).await.unwrap();
        reviews.delete_by_movie_and_user(id, 2).await.unwrap();
        assert_eq!(recalc.recompute(id).await.unwrap(), 0.0);
        assert_eq!(movies.get(id).await.unwrap().rating, 0.0);
    }

    #[tokio::test]
    async fn worker_drains_queue_and_survives_failures() {
        let (movies, reviews) = stores().await;
        let id = movie(&movies).await;
        reviews.add(id, NewReview { user_id: 1, score: 4, text: None }).await.unwrap();

        let (queue, worker) =
            RatingQueue::start(recalculator(&movies, &reviews), 2, OverflowPolicy::Block);

        // Unknown movie fails inside the worker; the next signal must still land.
        queue.enqueue(9999).await;
        queue.enqueue(id).await;
        drop(queue);
        worker.await.unwrap();

        assert_eq!(movies.get(id).await.unwrap().rating, 4.0);
    }

    #[tokio::test]
    async fn burst_settles_on_latest_review_state() {
        let (movies, reviews) = stores().await;
        let id = movie(&movies).await;
        let (queue, worker) = RatingQueue::start(
            recalculator(&movies, &reviews),
            DEFAULT_QUEUE_CAPACITY,
            OverflowPolicy::Block,
        );

        for (user_id, score) in [(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)] {
            reviews.add(id, NewReview { user_id, score, text: None }).await.unwrap();
            queue.enqueue(id).await;
        }
        drop(queue);
        worker.await.unwrap();

        assert_eq!(movies.get(id).await.unwrap().rating, 3.0);
    }

    #[tokio::test]
    async fn inline_policy_recomputes_when_full() {
        let (movies, reviews) = stores().await;
        let id = movie(&movies).await;
        reviews.add(id, NewReview { user_id: 1, score: 2, text: None }).await.unwrap();

        // Keep the channel full by never letting the worker run ahead: with
        // capacity 1 on a current-thread runtime the second try_send overflows.
        let (queue, worker) =
            RatingQueue::start(recalculator(&movies, &reviews), 1, OverflowPolicy::Inline);
        queue.enqueue(id).await;
        queue.enqueue(id).await;
        assert_eq!(movies.get(id).await.unwrap().rating, 2.0);

        drop(queue);
        worker.await.unwrap();
        assert_eq!(movies.get(id).await.unwrap().rating, 2.0);
    }

    #[tokio::test]
    async fn overlapping_recomputations_keep_the_latest_state() {
        let (movies, reviews) = stores().await;
        let id = movie(&movies).await;
        reviews.add(id, NewReview { user_id: 1, score: 4, text: None }).await.unwrap();

        let slow = Arc::new(SlowReads { inner: reviews.clone(), pause: Duration::from_millis(100) });
        let recalc = Arc::new(Recalculator::new(movies.clone(), slow));

        // The first recomputation reads one review, then stalls.
        let stale = tokio::spawn({
            let recalc = recalc.clone();
            async move { recalc.recompute(id).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A second review lands and an overflowing producer recomputes inline.
        reviews.add(id, NewReview { user_id: 2, score: 2, text: None }).await.unwrap();
        assert_eq!(recalc.recompute(id).await.unwrap(), 3.0);

        assert_eq!(stale.await.unwrap().unwrap(), 4.0);
        assert_eq!(movies.get(id).await.unwrap().rating, 3.0);
    }
}
