//! Built-in gate stages.

pub mod schema;
pub mod shape;

pub use schema::SchemaStage;
pub use shape::ShapeStage;
