use crate::config::{ImporterContext, ImporterOptions};
use crate::core::importer::RecordImporter;
use crate::core::marc::embed_path;
use crate::domain::model::{ImportRequest, MarcRecord, Profile};
use crate::domain::ports::{ProfileStore, RecordSource, RenderFormat};
use crate::utils::error::{CopycatError, Result};

/// The copy cataloging flow: resolve the profile, obtain the record (inline
/// payload or remote fetch), optionally stamp the internal identifier, then
/// drive the record through the ingestion pipeline.
pub struct ImportWorkflow<R: RecordSource, P: ProfileStore> {
    source: R,
    store: P,
}

impl<R: RecordSource, P: ProfileStore> ImportWorkflow<R, P> {
    pub fn new(source: R, store: P) -> Self {
        Self { source, store }
    }

    /// Runs one import and returns the instance identifiers the pipeline
    /// created or updated. A fresh importer (with its own connection pool)
    /// is built per run; it is bound to the caller identity in `ctx`.
    pub async fn run(
        &self,
        ctx: ImporterContext,
        options: ImporterOptions,
        request: &ImportRequest,
    ) -> Result<Vec<String>> {
        let profile = self
            .store
            .profile(&request.profile_id)
            .await?
            .ok_or_else(|| CopycatError::ValidationError {
                message: format!("No such profileId {}", request.profile_id),
            })?;

        let mut marc = self.obtain_record(&profile, request).await?;

        let (known_instances, job_profile_id) = match &request.internal_identifier {
            Some(internal_id) => {
                // overlay: stamp the known instance id into the record and
                // skip polling later
                let pattern = profile.internal_id_embed_path.as_deref().ok_or_else(|| {
                    CopycatError::ValidationError {
                        message: "Missing internalIdEmbedPath in target profile".to_string(),
                    }
                })?;
                embed_path(&mut marc, pattern, internal_id)?;
                (vec![internal_id.clone()], profile.update_job_profile_id)
            }
            None => (Vec::new(), profile.create_job_profile_id),
        };

        let mut importer = RecordImporter::new(ctx, options)?;
        importer.begin(job_profile_id.as_deref()).await?;
        importer.post(&marc).await?;
        importer.end(known_instances).await
    }

    async fn obtain_record(
        &self,
        profile: &Profile,
        request: &ImportRequest,
    ) -> Result<MarcRecord> {
        if let Some(payload) = &request.record {
            return local_record(payload);
        }
        let external_id = request.external_identifier.as_deref().ok_or_else(|| {
            CopycatError::ValidationError {
                message: "Missing externalIdentifier in import request".to_string(),
            }
        })?;
        tracing::info!(
            "Search {} {}",
            profile.url.as_deref().unwrap_or("-"),
            external_id
        );
        let bytes = self
            .source
            .fetch(profile, external_id, RenderFormat::Json)
            .await?;
        MarcRecord::from_slice(&bytes)
    }
}

fn local_record(payload: &serde_json::Value) -> Result<MarcRecord> {
    if let Some(json) = payload.get("json") {
        tracing::debug!("local JSON record");
        return MarcRecord::from_value(json.clone());
    }
    let keys = payload
        .as_object()
        .map(|obj| obj.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_default();
    Err(CopycatError::ValidationError {
        message: format!("No known record types in payload, got {}", keys),
    })
}
