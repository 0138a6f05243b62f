//! SeaORM entities for the catalog hierarchy.

pub mod course;
pub mod pdf;
pub mod semester;
pub mod subject;
pub mod university;
