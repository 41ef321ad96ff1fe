pub mod activity;
pub mod fields;
pub mod place;
pub mod trip;
