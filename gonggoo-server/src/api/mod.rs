pub mod callable;
pub mod error;
pub mod extractors;
pub mod webhook;
