//! Publishing run artifacts to a git remote
//!
//! A publish creates `prototype/ml-<timestamp>` from HEAD, writes the
//! artifacts under `artifacts/<timestamp>` in the work tree, commits them on
//! that branch, pushes the branch and switches back to where HEAD was. A
//! failed commit or push also deletes the local branch. The returned
//! comparison URL opens a pull request against the base branch.

use crate::api::RunResults;
use crate::core::{Result, TabmlError};
use crate::persistence::{run_timestamp, save_artifacts};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, Cred, CredentialType, PushOptions, RemoteCallbacks, Repository, Signature,
};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Where and how to publish
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Any path inside the repository
    pub repo_path: PathBuf,
    pub remote: String,
    /// Branch the comparison URL targets
    pub base_branch: String,
    pub commit_message: String,
    pub branch_prefix: String,
    /// Artifact root relative to the work tree
    pub artifacts_root: PathBuf,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            remote: "origin".to_string(),
            base_branch: "main".to_string(),
            commit_message: "Auto-generated ML prototype run".to_string(),
            branch_prefix: "prototype/ml-".to_string(),
            artifacts_root: PathBuf::from("artifacts"),
        }
    }
}

impl PublishOptions {
    pub fn with_repo_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.repo_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_remote(mut self, remote: &str) -> Self {
        self.remote = remote.to_string();
        self
    }

    pub fn with_base_branch(mut self, base: &str) -> Self {
        self.base_branch = base.to_string();
        self
    }

    pub fn with_commit_message(mut self, message: &str) -> Self {
        self.commit_message = message.to_string();
        self
    }
}

/// What a successful publish produced
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub branch: String,
    /// Artifact directory relative to the repository root, as committed on
    /// the branch
    pub artifact_dir: PathBuf,
    pub commit: String,
    pub compare_url: String,
}

/// Publish with the current local time as the run timestamp
pub fn publish_run(results: &RunResults, options: &PublishOptions) -> Result<PublishOutcome> {
    publish_run_at(results, options, &run_timestamp())
}

/// Publish using `timestamp` for the branch and artifact directory names
pub fn publish_run_at(
    results: &RunResults,
    options: &PublishOptions,
    timestamp: &str,
) -> Result<PublishOutcome> {
    let repo = Repository::discover(&options.repo_path)?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| {
            TabmlError::InvalidParameter("Cannot publish from a bare repository".to_string())
        })?
        .to_path_buf();

    let remote_url = {
        let remote = repo
            .find_remote(&options.remote)
            .map_err(|_| TabmlError::MissingRemote(options.remote.clone()))?;
        remote
            .url()
            .ok_or_else(|| TabmlError::MissingRemote(options.remote.clone()))?
            .to_string()
    };

    let head = repo.head()?;
    let original_ref = if repo.head_detached()? {
        None
    } else {
        head.name().map(str::to_string)
    };
    let original_commit = head.peel_to_commit()?;

    let branch = format!("{}{}", options.branch_prefix, timestamp);
    let branch_ref = format!("refs/heads/{branch}");
    repo.branch(&branch, &original_commit, false)?;
    repo.set_head(&branch_ref)?;
    debug!("Checked out new branch {branch}");

    let relative_dir = options.artifacts_root.join(timestamp);
    let committed = commit_artifacts(&repo, results, &workdir, &relative_dir, options)
        .and_then(|commit| {
            push_branch(&repo, &options.remote, &branch_ref)?;
            Ok(commit)
        });

    if let Err(e) = restore_head(&repo, original_ref.as_deref(), &original_commit) {
        warn!("Could not switch back to the original branch: {e}");
    }
    if committed.is_err() {
        if let Err(e) = repo
            .find_branch(&branch, BranchType::Local)
            .and_then(|mut local| local.delete())
        {
            warn!("Could not delete branch {branch}: {e}");
        }
    }
    let commit = committed?;

    let compare_url = compare_url(&remote_url, &options.base_branch, &branch);
    info!("Pushed {branch} to {}", options.remote);

    Ok(PublishOutcome {
        branch,
        artifact_dir: relative_dir,
        commit,
        compare_url,
    })
}

fn commit_artifacts(
    repo: &Repository,
    results: &RunResults,
    workdir: &Path,
    relative_dir: &Path,
    options: &PublishOptions,
) -> Result<String> {
    let artifact_dir = save_artifacts(results, workdir.join(relative_dir))?;

    let mut index = repo.index()?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(&artifact_dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(name) = path.file_name() {
                paths.push(relative_dir.join(name));
            }
        }
    }
    paths.sort();
    for path in &paths {
        index.add_path(path)?;
    }
    index.write()?;

    let tree = repo.find_tree(index.write_tree()?)?;
    let parent = repo.head()?.peel_to_commit()?;
    let signature = repo
        .signature()
        .or_else(|_| Signature::now("tabml", "tabml@localhost"))?;
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &options.commit_message,
        &tree,
        &[&parent],
    )?;
    debug!("Committed {} artifact file(s) as {oid}", paths.len());
    Ok(oid.to_string())
}

fn push_branch(repo: &Repository, remote_name: &str, branch_ref: &str) -> Result<()> {
    let mut remote = repo.find_remote(remote_name)?;

    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("no usable credentials found"));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            if let Some(user) = username {
                return Cred::ssh_key_from_agent(user);
            }
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username);
        }
        Cred::default()
    });
    callbacks.push_update_reference(|reference, status| match status {
        Some(message) => Err(git2::Error::from_str(&format!(
            "remote rejected {reference}: {message}"
        ))),
        None => Ok(()),
    });

    let mut push_options = PushOptions::new();
    push_options.remote_callbacks(callbacks);
    let refspec = format!("{branch_ref}:{branch_ref}");
    remote.push(&[refspec.as_str()], Some(&mut push_options))?;
    Ok(())
}

fn restore_head(repo: &Repository, original_ref: Option<&str>, original: &Commit) -> Result<()> {
    repo.checkout_tree(original.as_object(), Some(CheckoutBuilder::new().safe()))?;
    match original_ref {
        Some(name) => repo.set_head(name)?,
        None => repo.set_head_detached(original.id())?,
    }
    Ok(())
}

/// Browser URL of a remote: `.git` removed, ssh forms rewritten to https
pub fn web_url(remote_url: &str) -> String {
    let url = remote_url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);

    if let Some(rest) = url.strip_prefix("ssh://") {
        let rest = rest.split_once('@').map_or(rest, |(_, r)| r);
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = host.split(':').next().unwrap_or(host);
        return format!("https://{host}/{path}");
    }

    // scp-like syntax: user@host:owner/repo
    if !url.contains("://") {
        if let Some((user_host, path)) = url.split_once(':') {
            if let Some((_, host)) = user_host.split_once('@') {
                return format!("https://{host}/{path}");
            }
        }
    }

    url.to_string()
}

/// Comparison (pull request) URL for `branch` against `base`
pub fn compare_url(remote_url: &str, base: &str, branch: &str) -> String {
    format!("{}/compare/{base}...{branch}?expand=1", web_url(remote_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_url_https() {
        assert_eq!(
            web_url("https://github.com/acme/churn.git"),
            "https://github.com/acme/churn"
        );
        assert_eq!(
            web_url("https://github.com/acme/churn"),
            "https://github.com/acme/churn"
        );
    }

    #[test]
    fn test_web_url_ssh_forms() {
        assert_eq!(
            web_url("git@github.com:acme/churn.git"),
            "https://github.com/acme/churn"
        );
        assert_eq!(
            web_url("ssh://git@github.com:22/acme/churn.git"),
            "https://github.com/acme/churn"
        );
    }

    #[test]
    fn test_compare_url() {
        assert_eq!(
            compare_url(
                "git@github.com:acme/churn.git",
                "main",
                "prototype/ml-20240101120000"
            ),
            "https://github.com/acme/churn/compare/main...prototype/ml-20240101120000?expand=1"
        );
    }

    #[test]
    fn test_default_options() {
        let options = PublishOptions::default()
            .with_remote("upstream")
            .with_base_branch("develop");
        assert_eq!(options.remote, "upstream");
        assert_eq!(options.base_branch, "develop");
        assert_eq!(options.commit_message, "Auto-generated ML prototype run");
        assert_eq!(options.branch_prefix, "prototype/ml-");
    }
}
