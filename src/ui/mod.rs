pub mod dashboard;
pub mod plain;
