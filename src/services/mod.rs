//! Validation and orchestration on top of the stores.

mod movies;
mod reviews;
mod users;

pub use movies::MovieService;
pub use reviews::ReviewService;
pub use users::UserService;
