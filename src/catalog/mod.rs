pub mod ingest;
pub mod models;
pub mod source;

pub use ingest::{build_catalog, is_focus_command, IngestOptions, SchemaDocuments};
pub use models::{
    ArgsSchema, Catalog, CatalogEntry, Command, HasArguments, Setting, ValueType,
};
pub use source::{FileSchemaSource, SchemaSource, StaticSchemaSource, STATIC_SCHEMA_URIS};
