pub mod movie;
pub mod rating;
pub mod recommendation;
pub mod user_profile;

pub use movie::Movie;
pub use rating::Rating;
pub use recommendation::{round_to_tenth, Recommendation};
pub use user_profile::{UserProfile, PREFERENCE_THRESHOLD};
