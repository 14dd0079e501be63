use std::process::Command;

use anyhow::{Context, Result, bail};

/// Environment variables checked for a token, in order.
const TOKEN_VARS: [&str; 3] = ["ISSUE_FINDER_TOKEN", "GH_TOKEN", "GITHUB_TOKEN"];

/// Resolve a GitHub auth token for the given host.
///
/// Priority:
/// 1. `ISSUE_FINDER_TOKEN`, `GH_TOKEN`, `GITHUB_TOKEN` environment variables
/// 2. `gh auth token --hostname {host}` (gh CLI)
pub fn resolve_token(host: &str) -> Result<String> {
    for var in TOKEN_VARS {
        if let Ok(token) = std::env::var(var)
            && !token.trim().is_empty()
        {
            tracing::debug!("using token from ${var}");
            return Ok(token.trim().to_owned());
        }
    }

    match token_from_gh_cli(host) {
        Ok(token) => {
            tracing::debug!("using token from gh CLI for {host}");
            Ok(token)
        }
        Err(e) => bail!(
            "no GitHub token found for host \"{host}\" ({e:#}). \
             Set ISSUE_FINDER_TOKEN / GH_TOKEN / GITHUB_TOKEN or run `gh auth login`."
        ),
    }
}

fn token_from_gh_cli(host: &str) -> Result<String> {
    let output = Command::new("gh")
        .args(["auth", "token", "--hostname", host])
        .output()
        .context("failed to run `gh auth token`")?;

    if !output.status.success() {
        bail!("gh auth token exited with non-zero status");
    }

    let token = String::from_utf8(output.stdout)
        .context("gh auth token produced non-UTF-8 output")?
        .trim()
        .to_owned();

    if token.is_empty() {
        bail!("gh auth token returned empty string");
    }

    Ok(token)
}
