//! Repository plumbing for `generate course|nanodegree`: a deploy key the
//! grader clones with, and the SSH URL of the repository it clones.
//!
//! Key material is read and sent but never logged.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{NelsonError, Result};

pub const DEPLOY_KEY_DIR: &str = "deploy_key";
pub const DEPLOY_KEY_FILE: &str = "deploy_id_rsa";

const STARTER_REMOTE: &str = "git@github.com:udacity/clyde-starter";
const GITHUB_HTTPS: &str = "https://github.com/";
const GITHUB_SSH: &str = "git@github.com:";

/// Private key path inside `dir`.
pub fn deploy_key_path(dir: &Path) -> PathBuf {
    dir.join(DEPLOY_KEY_FILE)
}

/// Create `dir` (owner-only) and generate an unencrypted RSA key in it,
/// unless one is already there. Returns the private key path.
pub fn create_deploy_key(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        fs::create_dir_all(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }
    }

    let key = deploy_key_path(dir);
    if key.is_file() {
        tracing::warn!(path = %key.display(), "deploy key already exists");
        return Ok(key);
    }

    let ssh_keygen = which::which("ssh-keygen")
        .map_err(|_| NelsonError::DeployKey("ssh-keygen not found on PATH".into()))?;

    let output = Command::new(ssh_keygen)
        .arg("-f")
        .arg(&key)
        .args(["-t", "rsa", "-q", "-N", ""])
        .output()
        .map_err(|e| NelsonError::DeployKey(format!("failed to run ssh-keygen: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NelsonError::DeployKey(format!(
            "ssh-keygen failed (exit {}): {}",
            output.status.code().unwrap_or(-1),
            stderr.trim(),
        )));
    }

    tracing::info!(path = %key.display(), "deploy key generated");
    Ok(key)
}

/// Contents of the private key in `dir`.
pub fn read_deploy_key(dir: &Path) -> Result<String> {
    let key = deploy_key_path(dir);
    fs::read_to_string(&key)
        .map_err(|e| NelsonError::DeployKey(format!("cannot read {}: {}", key.display(), e)))
}

/// SSH URL of `remote` in the current repository, per `git remote -v`.
pub fn infer_git_url(remote: &str) -> Result<String> {
    let output = Command::new("git")
        .args(["remote", "-v"])
        .output()
        .map_err(|e| NelsonError::GitRemote(format!("failed to run git: {}", e)))?;

    if !output.status.success() {
        return Err(NelsonError::GitRemote(format!(
            "git remote -v failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_git_url(&String::from_utf8_lossy(&output.stdout), remote)
}

/// Pick `remote`'s GitHub URL out of `git remote -v` output, rewriting
/// HTTPS URLs to their SSH form. The last matching line wins.
pub fn parse_git_url(remote_output: &str, remote: &str) -> Result<String> {
    let mut url = None;

    for line in remote_output.lines() {
        let mut words = line.split_whitespace();
        let (Some(name), Some(location)) = (words.next(), words.next()) else {
            continue;
        };
        if name != remote {
            continue;
        }

        if location.starts_with(GITHUB_SSH) {
            url = Some(location.to_string());
        } else if let Some(path) = location.strip_prefix(GITHUB_HTTPS) {
            let path = path.strip_suffix(".git").unwrap_or(path);
            url = Some(format!("{}{}.git", GITHUB_SSH, path));
        }
    }

    let url = url.ok_or_else(|| {
        NelsonError::GitRemote(
            "Unable to infer git_url.  Please set the parameter in the config file.".into(),
        )
    })?;

    if url.strip_suffix(".git").unwrap_or(&url) == STARTER_REMOTE {
        return Err(NelsonError::GitRemote("You must create a new remote repository.".into()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOTES: &str = "\
origin\tgit@github.com:gt-omscs/cs6300-quizzes.git (fetch)
origin\tgit@github.com:gt-omscs/cs6300-quizzes.git (push)
mirror\thttps://github.com/someone/mirror.git (fetch)
mirror\thttps://github.com/someone/mirror.git (push)
plain\thttps://github.com/someone/plain (fetch)
elsewhere\thttps://gitlab.com/someone/repo.git (fetch)
";

    #[test]
    fn ssh_remote_is_used_as_is() {
        assert_eq!(
            parse_git_url(REMOTES, "origin").unwrap(),
            "git@github.com:gt-omscs/cs6300-quizzes.git"
        );
    }

    #[test]
    fn https_remote_is_rewritten() {
        assert_eq!(parse_git_url(REMOTES, "mirror").unwrap(), "git@github.com:someone/mirror.git");
        assert_eq!(parse_git_url(REMOTES, "plain").unwrap(), "git@github.com:someone/plain.git");
    }

    #[test]
    fn unknown_or_foreign_remote_fails() {
        for remote in ["upstream", "elsewhere"] {
            let err = parse_git_url(REMOTES, remote).unwrap_err();
            assert!(err.to_string().starts_with("Unable to infer git_url."));
        }
    }

    #[test]
    fn starter_remote_is_refused() {
        let output = "origin\thttps://github.com/udacity/clyde-starter (fetch)\n";
        let err = parse_git_url(output, "origin").unwrap_err();
        assert_eq!(err.to_string(), "You must create a new remote repository.");
    }

    #[test]
    fn existing_key_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join(DEPLOY_KEY_DIR);
        fs::create_dir(&keys).unwrap();
        fs::write(deploy_key_path(&keys), "-----BEGIN KEY-----\n").unwrap();

        let path = create_deploy_key(&keys).unwrap();
        assert_eq!(path, deploy_key_path(&keys));
        assert_eq!(read_deploy_key(&keys).unwrap(), "-----BEGIN KEY-----\n");
    }

    #[test]
    fn reading_missing_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_deploy_key(dir.path()), Err(NelsonError::DeployKey(_))));
    }

    #[cfg(unix)]
    #[test]
    fn new_key_directory_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join(DEPLOY_KEY_DIR);
        // Generation itself depends on ssh-keygen being installed.
        let _ = create_deploy_key(&keys);

        let mode = fs::metadata(&keys).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
