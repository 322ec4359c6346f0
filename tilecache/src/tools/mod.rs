pub mod cache_args;
pub mod clear;
pub mod get;
pub mod trim;
pub mod usage;
