use crate::log_stream::{LogSource, LogStream, LogStreamOptions};
use crate::transport::request::{Request, Response};
use crate::{
    AbortKind, Build, BuildNumber, Error, JobPath, PollOptions, ProgressiveText, poll,
};
use async_trait::async_trait;
use http::Method;

/// Options of [`BuildsService::log`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Byte offset to read from.
    pub start: u64,
    /// Read the HTML-annotated log (`progressiveHtml`).
    pub html: bool,
}

fn log_endpoint(html: bool) -> &'static str {
    if html {
        "progressiveHtml"
    } else {
        "progressiveText"
    }
}

fn parse_progressive_text(start: u64, resp: &Response) -> ProgressiveText {
    let text = resp.text_lossy().into_owned();
    // Without `X-Text-Size` assume the body is everything up to now.
    let size = resp
        .header_str("x-text-size")
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(start + text.len() as u64);
    let more = resp
        .header_str("x-more-data")
        .is_some_and(|s| s.eq_ignore_ascii_case("true"));
    ProgressiveText::new(text, size, more)
}

/// Jenkins build APIs.
#[derive(Clone, Debug)]
pub struct BuildsService {
    client: crate::Client,
}

impl BuildsService {
    pub(crate) fn new(client: crate::Client) -> Self {
        Self { client }
    }

    /// `GET <job>/<build>/api/json`
    pub async fn get(
        &self,
        job: impl Into<JobPath>,
        build: impl Into<BuildNumber>,
    ) -> Result<Build, Error> {
        let (job, build) = (job.into(), build.into());
        let req = Request::job(Method::GET, &job, &[build.as_str(), "api", "json"]);
        self.client.send_json(req).await
    }

    /// `POST <job>/<build>/doDelete`
    pub async fn delete(
        &self,
        job: impl Into<JobPath>,
        build: impl Into<BuildNumber>,
    ) -> Result<(), Error> {
        let (job, build) = (job.into(), build.into());
        let req = Request::job(Method::POST, &job, &[build.as_str(), "doDelete"]);
        self.client.send_unit(req).await
    }

    /// `POST <job>/<build>/stop|term|kill`
    pub async fn abort(
        &self,
        job: impl Into<JobPath>,
        build: impl Into<BuildNumber>,
        kind: AbortKind,
    ) -> Result<(), Error> {
        let (job, build) = (job.into(), build.into());
        let req = Request::job(Method::POST, &job, &[build.as_str(), kind.endpoint()]);
        self.client.send_unit(req).await
    }

    /// `GET <job>/<build>/logText/progressiveText?start=<offset>`
    pub async fn log(
        &self,
        job: impl Into<JobPath>,
        build: impl Into<BuildNumber>,
        options: LogOptions,
    ) -> Result<ProgressiveText, Error> {
        let (job, build) = (job.into(), build.into());
        fetch_log(&self.client, &job, &build, options).await
    }

    /// Follow the console log of a build as it grows.
    ///
    /// Nothing is requested until the returned stream is polled. To follow
    /// the HTML-annotated log, build the stream from
    /// [`BuildLog::html`] with [`LogStream::new`].
    pub fn log_stream(
        &self,
        job: impl Into<JobPath>,
        build: impl Into<BuildNumber>,
        options: LogStreamOptions,
    ) -> LogStream<BuildLog> {
        LogStream::new(BuildLog::new(self.client.clone(), job, build), options)
    }

    /// Poll until the build exists.
    ///
    /// A `404` means the build has not been created yet and is waited
    /// through; any other failure ends the wait.
    pub async fn wait_for_start(
        &self,
        job: impl Into<JobPath>,
        build: impl Into<BuildNumber>,
        options: PollOptions,
    ) -> Result<Build, Error> {
        let (job, build) = (job.into(), build.into());
        self.wait_until(&job, &build, options, |_| false).await
    }

    /// Poll until the build has finished.
    ///
    /// Like [`BuildsService::wait_for_start`], a build that does not exist
    /// yet is waited for.
    pub async fn wait(
        &self,
        job: impl Into<JobPath>,
        build: impl Into<BuildNumber>,
        options: PollOptions,
    ) -> Result<Build, Error> {
        let (job, build) = (job.into(), build.into());
        self.wait_until(&job, &build, options, |b| b.building).await
    }

    async fn wait_until(
        &self,
        job: &JobPath,
        build: &BuildNumber,
        options: PollOptions,
        keep_waiting: impl Fn(&Build) -> bool,
    ) -> Result<Build, Error> {
        poll::wait_for(
            || self.get(job, build.clone()),
            |attempt| match attempt {
                Ok(b) => keep_waiting(b),
                Err(err) => err.is_not_found(),
            },
            options,
        )
        .await
    }
}

async fn fetch_log(
    client: &crate::Client,
    job: &JobPath,
    build: &BuildNumber,
    options: LogOptions,
) -> Result<ProgressiveText, Error> {
    let req = Request::job(
        Method::GET,
        job,
        &[build.as_str(), "logText", log_endpoint(options.html)],
    )
    .query_pair("start", options.start.to_string());
    let resp = client.send_response(req).await?;
    Ok(parse_progressive_text(options.start, &resp))
}

/// Console log of one build, read through `logText/progressiveText`.
#[derive(Clone, Debug)]
pub struct BuildLog {
    client: crate::Client,
    job: JobPath,
    build: BuildNumber,
    html: bool,
}

impl BuildLog {
    /// Plain-text log of `build`. Pass it to [`LogStream::new`] to follow it.
    pub fn new(client: crate::Client, job: impl Into<JobPath>, build: impl Into<BuildNumber>) -> Self {
        Self {
            client,
            job: job.into(),
            build: build.into(),
            html: false,
        }
    }

    /// Read the HTML-annotated log instead of plain text.
    #[must_use]
    pub fn html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }
}

#[async_trait]
impl LogSource for BuildLog {
    async fn fetch_log_chunk(&self, start: u64) -> Result<ProgressiveText, Error> {
        let options = LogOptions {
            start,
            html: self.html,
        };
        fetch_log(&self.client, &self.job, &self.build, options).await
    }
}
