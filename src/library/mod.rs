pub mod models;
pub mod store;
pub mod validation;

pub use models::{LibraryState, PracticeProfile, Song, UserSettings};
