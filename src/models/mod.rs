//! Domain model module declarations.

pub mod discovery;
pub mod limit;
pub mod rate;
