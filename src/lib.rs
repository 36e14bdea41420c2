pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::config::{ImporterContext, ImporterOptions};
pub use crate::core::importer::RecordImporter;
pub use crate::core::marc::{embed_path, EmbedPath};
pub use crate::core::workflow::ImportWorkflow;
pub use crate::domain::model::{
    DataField, Field, FieldContent, ImportRequest, MarcRecord, Profile, Subfield,
};
pub use crate::domain::ports::{ProfileStore, RecordSource, RenderFormat};
pub use crate::utils::error::{CopycatError, Result, RetrieveError};
