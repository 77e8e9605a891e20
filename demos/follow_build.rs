//! Trigger a build, wait for it to finish and print its result.
//!
//! ```bash
//! cargo run --example follow_build
//! ```
//!
//! Env vars:
//! - `JENKINS_URL`
//! - `JENKINS_USER`, `JENKINS_TOKEN` (optional)
//! - `JENKINS_JOB` (default: `core`; `folder/job`, `/job/a/job/b` and full URLs work too)
//! - `JENKINS_PARAMS` (optional, `KEY=VALUE,KEY=VALUE`)
//! - `WAIT_SECS` (default: `600`)

use jenkins_client::{BuildRequest, Client, JobPath, PollOptions};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = env_or("JENKINS_URL", "https://jenkins.example.com");
    let job = JobPath::parse(env_or("JENKINS_JOB", "core"));
    let wait_secs: u64 = env_or("WAIT_SECS", "600").parse()?;

    let mut builder = Client::builder(&base_url)?.no_system_proxy();
    if let (Some(user), Some(token)) = (env_opt("JENKINS_USER"), env_opt("JENKINS_TOKEN")) {
        builder = builder.auth_basic(user, token);
    }
    let client = builder.build()?;

    let poll = PollOptions::default()
        .interval(Duration::from_secs(2))
        .timeout(Duration::from_secs(wait_secs));

    let mut request = BuildRequest::new();
    if let Some(params) = env_opt("JENKINS_PARAMS") {
        request = request.params(
            params
                .split(',')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned())),
        );
    }

    let id = client.jobs().build(&job, request).await?;
    println!("queued {} as item {id}", job.pretty_path());

    let item = client.queue().wait_for_executable(id, poll).await?;
    let Some(executable) = item.executable else {
        println!("queue item {id} has no executable");
        return Ok(());
    };
    println!("started #{}", executable.number);

    let build = client.builds().wait(&job, executable.number, poll).await?;
    println!("#{} finished: {:?}", build.number, build.result);

    Ok(())
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
