pub mod github;
pub mod platform;
pub mod version;
