pub mod importer;
pub mod marc;
pub mod workflow;

pub use crate::domain::model::{
    DataField, Field, FieldContent, ImportRequest, MarcRecord, Profile, Subfield,
};
pub use crate::domain::ports::{ProfileStore, RecordSource, RenderFormat};
pub use crate::utils::error::Result;
