//! User domain entities.

pub mod model;
pub mod status;

pub use model::UserProfile;
pub use status::AccountStatus;
