pub mod achievement;
pub mod challenge;
pub mod mobility;
pub mod user;
