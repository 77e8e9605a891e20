use crate::transport::request::Request;
use crate::{Error, Job, JobPath, PollOptions, QueueItemId};
use http::Method;

/// Parameters of [`JobsService::build`].
///
/// Without parameters the job is triggered through `build`; with at least
/// one it goes through `buildWithParameters`.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub params: Vec<(String, String)>,
    /// Remote trigger token (`authToken` of the job).
    pub token: Option<String>,
    /// Wait until the queue item has an executor and the build exists.
    pub wait_for_start: bool,
    /// Wait until the build has finished.
    pub wait: bool,
    /// Cadence and deadline of each wait.
    pub poll: PollOptions,
}

impl BuildRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn wait_for_start(mut self) -> Self {
        self.wait_for_start = true;
        self
    }

    #[must_use]
    pub fn wait(mut self) -> Self {
        self.wait = true;
        self
    }

    #[must_use]
    pub fn poll(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }
}

/// Jenkins job APIs.
#[derive(Clone, Debug)]
pub struct JobsService {
    client: crate::Client,
}

impl JobsService {
    pub(crate) fn new(client: crate::Client) -> Self {
        Self { client }
    }

    /// `GET <job>/api/json`
    pub async fn get(&self, job: impl Into<JobPath>, tree: Option<&str>) -> Result<Job, Error> {
        let job = job.into();
        let req = Request::job(Method::GET, &job, &["api", "json"]).query_opt("tree", tree);
        self.client.send_json(req).await
    }

    /// `true` unless `<job>/api/json` answers `404`.
    pub async fn exists(&self, job: impl Into<JobPath>) -> Result<bool, Error> {
        let job = job.into();
        let req = Request::job(Method::GET, &job, &["api", "json"]).query_pair("tree", "name");
        match self.client.send_unit(req).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// `POST <job>/build` or `POST <job>/buildWithParameters`
    ///
    /// Returns the id of the queue item Jenkins created. With
    /// [`BuildRequest::wait_for_start`] or [`BuildRequest::wait`] set, only
    /// returns once the build reached that state.
    pub async fn build(
        &self,
        job: impl Into<JobPath>,
        request: BuildRequest,
    ) -> Result<QueueItemId, Error> {
        let job = job.into();
        let endpoint = if request.params.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let req = Request::job(Method::POST, &job, &[endpoint])
            .query_opt("token", request.token.as_deref())
            .form_pairs(request.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let resp = self.client.execute_request(&req).await?;
        let id = resp
            .header_str("location")
            .and_then(QueueItemId::from_location)
            .ok_or_else(|| {
                self.client.decode_error(
                    &req,
                    &resp,
                    std::io::Error::other("missing queue item in Location header"),
                )
            })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(job = %job, queue_item = %id, "build queued");

        if !(request.wait_for_start || request.wait) {
            return Ok(id);
        }

        let item = self
            .client
            .queue()
            .wait_for_executable(id, request.poll)
            .await?;
        let Some(executable) = item.executable else {
            return Ok(id);
        };

        let builds = self.client.builds();
        if request.wait {
            builds.wait(&job, executable.number, request.poll).await?;
        } else {
            builds
                .wait_for_start(&job, executable.number, request.poll)
                .await?;
        }
        Ok(id)
    }
}
