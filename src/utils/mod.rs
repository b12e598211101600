//! Small shared helpers.

pub mod collections;
pub mod id_generator;
