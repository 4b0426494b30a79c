pub mod activity;
pub mod challenge;
