use crate::config::{ImporterContext, ImporterOptions};
use crate::domain::model::MarcRecord;
use crate::utils::error::{CopycatError, Result};
use crate::utils::validation::Validate;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::time::sleep;
use uuid::Uuid;

const TENANT_HEADER: &str = "X-Okapi-Tenant";
const TOKEN_HEADER: &str = "X-Okapi-Token";
const USER_ID_HEADER: &str = "X-Okapi-User-Id";

/// Job lifecycle. Operations are rejected outside the states that allow
/// them: `begin` only from `Idle`, `post` after the profile is assigned,
/// nothing after `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Idle,
    Created,
    ProfileAssigned,
    Uploading,
    Ended,
}

impl JobState {
    fn name(&self) -> &'static str {
        match self {
            JobState::Idle => "Idle",
            JobState::Created => "Created",
            JobState::ProfileAssigned => "ProfileAssigned",
            JobState::Uploading => "Uploading",
            JobState::Ended => "Ended",
        }
    }
}

/// Handle to the server-side job execution. Owned by the importer that
/// created it, mutated only by it, discarded when the workflow concludes.
/// Progress flags (profile assigned, ended) live in [`JobState`].
#[derive(Debug, Clone)]
struct JobExecution {
    job_id: String,
    records_posted: u32,
}

/// One source-record poll attempt: either every entry carried an instance
/// identifier, or at least one did not yet.
enum PollOutcome {
    Ready(Vec<String>),
    NotReady,
}

/// Drives one import job through the remote ingestion service:
/// create job, assign profile, upload record(s), signal end of stream and
/// poll for the instance identifiers the pipeline derived.
///
/// An importer is bound to one caller identity and one job. It owns its HTTP
/// connection pool for its whole lifetime; [`RecordImporter::end`] consumes
/// the importer, so the pool is released exactly once on every exit path.
/// Not to be shared between users or tenants.
pub struct RecordImporter {
    client: Client,
    ctx: ImporterContext,
    options: ImporterOptions,
    state: JobState,
    job: Option<JobExecution>,
}

impl RecordImporter {
    pub fn new(ctx: ImporterContext, options: ImporterOptions) -> Result<Self> {
        ctx.validate()?;
        options.validate()?;
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.idle_timeout)
            .pool_idle_timeout(options.idle_timeout)
            .build()
            .map_err(|e| CopycatError::ValidationError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            ctx,
            options,
            state: JobState::Idle,
            job: None,
        })
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job.as_ref().map(|job| job.job_id.as_str())
    }

    pub fn records_posted(&self) -> u32 {
        self.job.as_ref().map(|job| job.records_posted).unwrap_or(0)
    }

    fn guard(&self, operation: &'static str, allowed: &[JobState]) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(CopycatError::InvalidState {
            operation,
            state: self.state.name(),
        })
    }

    fn job(&self, operation: &'static str) -> Result<&JobExecution> {
        self.job.as_ref().ok_or(CopycatError::InvalidState {
            operation,
            state: self.state.name(),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(TENANT_HEADER, &self.ctx.tenant)
            .header(USER_ID_HEADER, &self.ctx.user_id)
            .header("Accept", "*/*");
        if let Some(token) = &self.ctx.token {
            request = request.header(TOKEN_HEADER, token);
        }
        request
    }

    /// Sends the request, requires `expected`, returns the response body.
    /// Any other status and any transport failure is a hard failure.
    async fn expect_status(
        &self,
        context: &'static str,
        method: &'static str,
        url: String,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<String> {
        let map_transport = |source: reqwest::Error, url: &str| CopycatError::Transport {
            context,
            method,
            url: url.to_string(),
            source,
        };
        let response = request
            .send()
            .await
            .map_err(|e| map_transport(e, &url))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport(e, &url))?;
        tracing::info!("{} RES {}: {}", context, url, body);
        if status != expected {
            tracing::error!("{} {} {} returned {}", context, method, url, status.as_u16());
            return Err(CopycatError::UnexpectedStatus {
                context,
                method,
                url,
                status: status.as_u16(),
                expected: expected.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn create_job(&self, job_profile_id: Option<&str>) -> Result<String> {
        let context = "Create job execution";
        let url = format!("{}/change-manager/jobExecutions", self.ctx.base_url);
        let profile_id = job_profile_id.or(self.ctx.default_job_profile_id.as_deref());
        let init_job = json!({
            "userId": self.ctx.user_id,
            "sourceType": "ONLINE",
            "jobProfileInfo": {"id": profile_id, "dataType": "MARC"},
        });
        tracing::info!("{} POST {}: {}", context, url, init_job);
        let request = self.request(Method::POST, &url).json(&init_job);
        let body = self
            .expect_status(context, "POST", url, request, StatusCode::CREATED)
            .await?;
        let value: Value = serde_json::from_str(&body)?;
        value
            .get("parentJobExecutionId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(CopycatError::MissingResponseKey {
                key: "parentJobExecutionId",
            })
    }

    async fn put_job_profile(&self, job_profile_id: Option<&str>) -> Result<()> {
        let context = "Assign job profile for job execution";
        let job = self.job(context)?;
        let url = format!(
            "{}/change-manager/jobExecutions/{}/jobProfile",
            self.ctx.base_url, job.job_id
        );
        let job_profile = json!({
            "id": job_profile_id.or(self.ctx.default_job_profile_id.as_deref()),
            "dataType": "MARC",
        });
        tracing::info!("{} PUT {}: {}", context, url, job_profile);
        let request = self.request(Method::PUT, &url).json(&job_profile);
        self.expect_status(context, "PUT", url, request, StatusCode::OK)
            .await?;
        Ok(())
    }

    /// Begins importing: creates the job execution and assigns the job
    /// profile (`job_profile_id`, or the configured default when `None`).
    pub async fn begin(&mut self, job_profile_id: Option<&str>) -> Result<()> {
        self.guard("begin", &[JobState::Idle])?;
        let job_id = self.create_job(job_profile_id).await?;
        self.job = Some(JobExecution {
            job_id,
            records_posted: 0,
        });
        self.state = JobState::Created;
        self.put_job_profile(job_profile_id).await?;
        self.state = JobState::ProfileAssigned;
        Ok(())
    }

    /// Uploads one record to the job.
    pub async fn post(&mut self, record: &MarcRecord) -> Result<()> {
        self.post_raw(Some(record), false).await
    }

    async fn post_raw(&mut self, record: Option<&MarcRecord>, last: bool) -> Result<()> {
        self.guard("post", &[JobState::ProfileAssigned, JobState::Uploading])?;
        let context = "Add record for job execution";
        let job = self.job(context)?;
        let url = format!(
            "{}/change-manager/jobExecutions/{}/records",
            self.ctx.base_url, job.job_id
        );
        let mut initial_records = Vec::new();
        if let Some(record) = record {
            initial_records.push(json!({"record": serde_json::to_string(record)?}));
        }
        let raw_records = json!({
            "id": Uuid::new_v4().to_string(),
            "recordsMetadata": {
                "last": last,
                "contentType": "MARC_JSON",
                "counter": 1,
                "total": 1,
            },
            "initialRecords": initial_records,
        });
        tracing::info!("{} POST {}: {}", context, url, raw_records);
        let request = self.request(Method::POST, &url).json(&raw_records);
        self.expect_status(context, "POST", url, request, StatusCode::NO_CONTENT)
            .await?;
        if record.is_some() {
            if let Some(job) = self.job.as_mut() {
                job.records_posted += 1;
            }
        }
        self.state = if last {
            JobState::Ended
        } else {
            JobState::Uploading
        };
        Ok(())
    }

    async fn fetch_source_records(&self) -> Result<PollOutcome> {
        let job = self.job("Get source records")?;
        let url = format!(
            "{}/source-storage/source-records?snapshotId={}",
            self.ctx.base_url, job.job_id
        );
        let request = self.request(Method::GET, &url);
        let body = self
            .expect_status("Get source records", "GET", url, request, StatusCode::OK)
            .await?;
        let value: Value = serde_json::from_str(&body)?;
        let Some(source_records) = value.get("sourceRecords").and_then(Value::as_array) else {
            return Err(CopycatError::MissingResponseKey {
                key: "sourceRecords",
            });
        };
        // an empty listing means nothing to confirm, not "not ready yet"
        let mut instances = Vec::with_capacity(source_records.len());
        for source_record in source_records {
            match source_record
                .pointer("/externalIdsHolder/instanceId")
                .and_then(Value::as_str)
            {
                Some(instance_id) => instances.push(instance_id.to_string()),
                None => return Ok(PollOutcome::NotReady),
            }
        }
        Ok(PollOutcome::Ready(instances))
    }

    /// Polls the source-record listing for the instance identifiers the
    /// pipeline derived for this job. Not-ready responses are retried after
    /// `poll_wait`, attempts strictly sequential, up to `poll_iterations`.
    pub async fn poll_instances(&self) -> Result<Vec<String>> {
        for iteration in 1..=self.options.poll_iterations {
            tracing::info!("get source records, iteration {}", iteration);
            match self.fetch_source_records().await? {
                PollOutcome::Ready(instances) => return Ok(instances),
                PollOutcome::NotReady => {
                    if iteration >= self.options.poll_iterations {
                        break;
                    }
                    sleep(self.options.poll_wait).await;
                }
            }
        }
        Err(CopycatError::PollExhausted {
            retries: self.options.poll_iterations,
        })
    }

    /// Ends importing. Posts the end-of-stream signal, then either returns
    /// the caller-supplied instances after the settle delay (overlay) or
    /// polls for derived identifiers (create). A poll failure is logged and
    /// absorbed: the import itself already succeeded, so the caller gets an
    /// empty list rather than an error.
    ///
    /// Consumes the importer; the connection pool is dropped on every path.
    pub async fn end(mut self, known_instances: Vec<String>) -> Result<Vec<String>> {
        self.post_raw(None, true).await?;
        if !known_instances.is_empty() {
            sleep(self.options.update_settle).await;
            return Ok(known_instances);
        }
        match self.poll_instances().await {
            Ok(instances) => Ok(instances),
            Err(cause) => {
                tracing::warn!("Polling failed and ignored: {}", cause);
                Ok(Vec::new())
            }
        }
    }
}
