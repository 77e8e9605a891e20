//! Follow the console log of a build until it finishes.
//!
//! ```bash
//! cargo run --example tail_log
//! ```
//!
//! Env vars:
//! - `JENKINS_URL`
//! - `JENKINS_USER`, `JENKINS_TOKEN` (optional)
//! - `JENKINS_JOB` (default: `core`)
//! - `JENKINS_BUILD` (default: `lastBuild`)
//! - `LOG_START` (default: `0`, byte offset to resume from)
//! - `LOG_HTML` (default: `false`, follow `progressiveHtml` instead)

use jenkins_client::{BuildLog, Client, LogStream, LogStreamOptions};
use std::{io::Write, time::Duration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = env_or("JENKINS_URL", "https://jenkins.example.com");
    let job = env_or("JENKINS_JOB", "core");
    let build = env_or("JENKINS_BUILD", "lastBuild");
    let start: u64 = env_or("LOG_START", "0").parse()?;
    let html: bool = env_or("LOG_HTML", "false").parse()?;

    let mut builder = Client::builder(&base_url)?
        .no_system_proxy()
        .timeout(Duration::from_secs(60));
    if let (Some(user), Some(token)) = (env_opt("JENKINS_USER"), env_opt("JENKINS_TOKEN")) {
        builder = builder.auth_basic(user, token);
    }
    let client = builder.build()?;

    let options = LogStreamOptions::default()
        .start(start)
        .interval(Duration::from_millis(500));

    let mut stdout = std::io::stdout();
    let source = BuildLog::new(client, job.as_str(), build.as_str()).html(html);
    let offset = LogStream::new(source, options)
        .finish(|chunk| {
            let _ = stdout.write_all(chunk.as_bytes());
            let _ = stdout.flush();
        })
        .await?;

    eprintln!("log ended at byte {offset}");
    Ok(())
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
