pub mod activity;
pub mod domain;
