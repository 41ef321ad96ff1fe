pub mod activities;
pub mod places;
pub mod trips;
