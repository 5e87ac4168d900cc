//! Schemas of the modules that ship with the server

pub mod k2ksm;

pub use k2ksm::core_schema;
