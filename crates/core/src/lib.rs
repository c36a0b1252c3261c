//! Access policy and workflows for campus-access.

pub mod services;

pub use services::*;
