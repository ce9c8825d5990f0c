pub mod intent;
pub mod plan;
pub mod profile;
