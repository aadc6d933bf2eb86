pub mod core;
pub mod gradebook;
pub mod indicators;
pub mod roster;
pub mod setup;
