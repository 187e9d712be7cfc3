//! File loading for `Response::send_file` and the static file server.
//!
//! A file is opened, stat-ed through the same handle and read completely
//! before anything touches the response.

use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};

/// What to do with path components starting with a dot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dotfiles {
    Allow,
    /// Respond 403.
    Deny,
    /// Pretend the file does not exist (404).
    Ignore,
}

/// Options for [`Response::send_file_with`](crate::Response::send_file_with).
#[derive(Clone, Debug)]
pub struct SendFileOptions {
    /// Base directory for relative paths; the result may not escape it.
    pub root: Option<PathBuf>,
    /// Dotfile policy. Unset means only a dotfile *name* is ignored; dotted
    /// directories along the way are allowed.
    pub dotfiles: Option<Dotfiles>,
    /// `max-age` for the `Cache-Control` header.
    pub max_age: Duration,
    /// Add `immutable` to `Cache-Control`.
    pub immutable: bool,
    pub last_modified: bool,
    /// Stat-based weak ETag.
    pub etag: bool,
    pub cache_control: bool,
}

impl Default for SendFileOptions {
    fn default() -> Self {
        Self {
            root: None,
            dotfiles: None,
            max_age: Duration::ZERO,
            immutable: false,
            last_modified: true,
            etag: true,
            cache_control: true,
        }
    }
}

impl SendFileOptions {
    pub(crate) fn cache_control_value(&self) -> String {
        let mut value = format!("public, max-age={}", self.max_age.as_secs());
        if self.immutable {
            value.push_str(", immutable");
        }
        value
    }
}

/// A fully read regular file.
#[derive(Debug)]
pub(crate) struct LoadedFile {
    pub(crate) path: PathBuf,
    pub(crate) contents: Bytes,
    pub(crate) metadata: Metadata,
}

pub(crate) async fn load(path: &Path, opts: &SendFileOptions) -> Result<LoadedFile> {
    let (full, parts) = match &opts.root {
        Some(root) => join_contained(root, path)?,
        None if path.is_absolute() => {
            let parts = path
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect();
            (path.to_path_buf(), parts)
        }
        None => {
            return Err(Error::http(
                StatusCode::INTERNAL_SERVER_ERROR,
                "path must be absolute or specify root to send_file",
            ));
        }
    };
    check_dotfiles(&parts, opts.dotfiles)?;

    let mut file = tokio::fs::File::open(&full).await?;
    let metadata = file.metadata().await?;
    if metadata.is_dir() {
        return Err(Error::not_found());
    }

    let mut buf = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
    file.read_to_end(&mut buf).await?;

    Ok(LoadedFile { path: full, contents: Bytes::from(buf), metadata })
}

/// Joins `rel` onto `root`, refusing to climb above it (403). Also returns the
/// normalized components below `root`.
pub(crate) fn join_contained(root: &Path, rel: &Path) -> Result<(PathBuf, Vec<String>)> {
    let mut parts: Vec<String> = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(Error::http(StatusCode::FORBIDDEN, "Forbidden"));
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    let mut full = root.to_path_buf();
    full.extend(&parts);
    Ok((full, parts))
}

pub(crate) fn check_dotfiles(parts: &[String], policy: Option<Dotfiles>) -> Result<()> {
    if !parts.iter().any(|p| p.len() > 1 && p.starts_with('.')) {
        return Ok(());
    }
    let access = match policy {
        Some(p) => p,
        None => match parts.last() {
            Some(name) if name.starts_with('.') => Dotfiles::Ignore,
            _ => Dotfiles::Allow,
        },
    };
    match access {
        Dotfiles::Allow  => Ok(()),
        Dotfiles::Deny   => Err(Error::http(StatusCode::FORBIDDEN, "Forbidden")),
        Dotfiles::Ignore => Err(Error::not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment() {
        let (full, parts) = join_contained(Path::new("/srv/www"), Path::new("/css/../img/a.png")).unwrap();
        assert_eq!(full, PathBuf::from("/srv/www/img/a.png"));
        assert_eq!(parts, vec!["img", "a.png"]);

        let err = join_contained(Path::new("/srv/www"), Path::new("../etc/passwd")).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn dotfile_policies() {
        let hidden = vec![".env".to_owned()];
        let nested = vec![".well-known".to_owned(), "x.txt".to_owned()];
        assert_eq!(check_dotfiles(&hidden, None).unwrap_err().status(), StatusCode::NOT_FOUND);
        assert!(check_dotfiles(&nested, None).is_ok());
        assert_eq!(check_dotfiles(&nested, Some(Dotfiles::Deny)).unwrap_err().status(), StatusCode::FORBIDDEN);
        assert!(check_dotfiles(&hidden, Some(Dotfiles::Allow)).is_ok());
    }

    #[test]
    fn cache_control() {
        let opts = SendFileOptions { max_age: Duration::from_secs(60), immutable: true, ..Default::default() };
        assert_eq!(opts.cache_control_value(), "public, max-age=60, immutable");
    }

    #[tokio::test]
    async fn relative_path_needs_root() {
        let err = load(Path::new("relative.txt"), &SendFileOptions::default()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
