//! Source fetching: a sparse, shallow git checkout of the docs directory.
//!
//! The checkout is driven through the `git` executable rather than a git
//! library so that credentials helpers, proxies and `~/.gitconfig` behave
//! exactly as they do for the operator's own clones.
//!
//! A fresh directory is initialised with `core.sparseCheckout` so only the
//! documentation directory is materialised; an existing checkout is fetched
//! again and force-checked-out at the requested reference, which makes the
//! stage idempotent. In offline mode the existing tree is used untouched.

use crate::config::ExportConfig;
use crate::error::FetchError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Make the documentation tree available locally and return its root.
pub async fn fetch_source(config: &ExportConfig) -> Result<PathBuf, FetchError> {
    let checkout = config.checkout_dir.as_path();
    let docs_root = config.docs_root();

    if config.offline {
        info!("Offline mode: reusing checkout at {}", checkout.display());
        return existing_docs_root(checkout, docs_root);
    }

    let git = Git {
        dir: checkout.to_path_buf(),
        timeout_secs: config.git_timeout_secs,
    };

    if checkout.join(".git").is_dir() {
        info!(
            "Updating existing checkout {} to '{}'",
            checkout.display(),
            config.source_ref
        );
        git.run(&["remote", "set-url", "origin", &config.repo_url])
            .await?;
    } else {
        info!(
            "Cloning {} ({}) into {}",
            config.repo_url,
            config.source_ref,
            checkout.display()
        );
        tokio::fs::create_dir_all(checkout)
            .await
            .map_err(|e| FetchError::Io {
                path: checkout.to_path_buf(),
                source: e,
            })?;
        git.run(&["init", "--quiet"]).await?;
        git.run(&["config", "core.sparseCheckout", "true"]).await?;
        git.run(&["remote", "add", "origin", &config.repo_url])
            .await?;
    }

    write_sparse_checkout(checkout, &config.docs_dir).await?;

    git.run(&["fetch", "--depth", "1", "origin", &config.source_ref])
        .await
        .map_err(|e| classify_fetch_failure(e, &config.repo_url, &config.source_ref))?;
    git.run(&["checkout", "--force", "--detach", "FETCH_HEAD"])
        .await?;

    let head = git.run(&["rev-parse", "--short", "HEAD"]).await?;
    info!("Checked out {} at {}", config.source_ref, head.trim());

    existing_docs_root(checkout, docs_root)
}

fn existing_docs_root(checkout: &Path, docs_root: PathBuf) -> Result<PathBuf, FetchError> {
    if docs_root.is_dir() {
        Ok(docs_root)
    } else if checkout.is_dir() {
        Err(FetchError::DocsDirMissing { path: docs_root })
    } else {
        Err(FetchError::NoCheckout {
            path: checkout.to_path_buf(),
        })
    }
}

async fn write_sparse_checkout(checkout: &Path, docs_dir: &str) -> Result<(), FetchError> {
    let info_dir = checkout.join(".git").join("info");
    tokio::fs::create_dir_all(&info_dir)
        .await
        .map_err(|e| FetchError::Io {
            path: info_dir.clone(),
            source: e,
        })?;
    let sparse = info_dir.join("sparse-checkout");
    let pattern = format!("/{}/\n", docs_dir.trim_matches('/'));
    tokio::fs::write(&sparse, pattern)
        .await
        .map_err(|e| FetchError::Io {
            path: sparse,
            source: e,
        })
}

/// Re-label a generic `git fetch` failure from its stderr.
fn classify_fetch_failure(err: FetchError, url: &str, reference: &str) -> FetchError {
    let FetchError::CommandFailed { ref detail, .. } = err else {
        return err;
    };
    let lower = detail.to_lowercase();
    if lower.contains("couldn't find remote ref")
        || lower.contains("not our ref")
        || lower.contains("unknown revision")
    {
        FetchError::RefNotFound {
            url: url.to_string(),
            reference: reference.to_string(),
        }
    } else if lower.contains("could not resolve host")
        || lower.contains("unable to access")
        || lower.contains("could not read from remote")
        || lower.contains("repository not found")
        || lower.contains("does not appear to be a git repository")
        || lower.contains("connection refused")
    {
        FetchError::RemoteUnreachable {
            url: url.to_string(),
            detail: detail.clone(),
        }
    } else {
        err
    }
}

/// A `git` invocation rooted at the checkout directory.
struct Git {
    dir: PathBuf,
    timeout_secs: u64,
}

impl Git {
    /// Run one git command, returning its stdout.
    async fn run(&self, args: &[&str]) -> Result<String, FetchError> {
        let command = args.first().copied().unwrap_or_default().to_string();
        debug!("git {}", args.join(" "));

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| FetchError::Timeout {
                command: command.clone(),
                secs: self.timeout_secs,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ClientMissing(e.to_string())
                } else {
                    FetchError::Io {
                        path: self.dir.clone(),
                        source: e,
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(FetchError::CommandFailed {
                command,
                detail: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(detail: &str) -> FetchError {
        FetchError::CommandFailed {
            command: "fetch".into(),
            detail: detail.into(),
        }
    }

    #[test]
    fn missing_ref_is_classified() {
        let e = classify_fetch_failure(
            failed("fatal: couldn't find remote ref nope"),
            "https://example.com/r.git",
            "nope",
        );
        assert!(matches!(e, FetchError::RefNotFound { ref reference, .. } if reference == "nope"));
    }

    #[test]
    fn unreachable_remote_is_classified() {
        let e = classify_fetch_failure(
            failed("fatal: unable to access 'https://example.invalid/': Could not resolve host"),
            "https://example.invalid/r.git",
            "main",
        );
        assert!(matches!(e, FetchError::RemoteUnreachable { .. }));
    }

    #[test]
    fn other_failures_pass_through() {
        let e = classify_fetch_failure(failed("fatal: index.lock exists"), "u", "r");
        assert!(matches!(e, FetchError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn offline_without_checkout_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::builder()
            .checkout_dir(dir.path().join("missing"))
            .offline(true)
            .build()
            .unwrap();
        let err = fetch_source(&config).await.unwrap_err();
        assert!(matches!(err, FetchError::NoCheckout { .. }));
    }

    #[tokio::test]
    async fn offline_reuses_existing_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        let config = ExportConfig::builder()
            .checkout_dir(dir.path())
            .offline(true)
            .build()
            .unwrap();
        let root = fetch_source(&config).await.unwrap();
        assert_eq!(root, dir.path().join("docs"));
    }

    #[tokio::test]
    async fn offline_with_checkout_but_no_docs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::builder()
            .checkout_dir(dir.path())
            .offline(true)
            .build()
            .unwrap();
        let err = fetch_source(&config).await.unwrap_err();
        assert!(matches!(err, FetchError::DocsDirMissing { .. }));
    }
}
