//! "Fetch if absent" download of source files.
//!
//! # Invariants
//! - An existing destination file is never re-downloaded nor re-validated.
//! - A download lands in `<name>.part` and is renamed only once complete.
//! - No retries: the first failure aborts the run.

use crate::config::SourceDescriptor;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("mortality/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug)]
pub enum FetchError {
    Client(reqwest::Error),
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Http {
        url: String,
        source: reqwest::Error,
    },
    Status {
        url: String,
        status: u16,
    },
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(err) => write!(f, "failed to build HTTP client: {err}"),
            Self::Io { path, source } => write!(f, "I/O error on `{}`: {source}", path.display()),
            Self::Http { url, source } => write!(f, "request to {url} failed: {source}"),
            Self::Status { url, status } => write!(f, "request to {url} returned HTTP {status}"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Client(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Http { source, .. } => Some(source),
            Self::Status { .. } => None,
        }
    }
}

/// Transfers one remote resource into a local file.
pub trait Downloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Blocking HTTP downloader.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let http_error = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let mut response = self.client.get(url).send().map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = File::create(dest).map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        response.copy_to(&mut file).map_err(http_error)
    }
}

/// Result of one `fetch_missing` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Downloads every source whose destination file does not exist yet.
pub fn fetch_missing<D: Downloader + ?Sized>(
    downloader: &D,
    sources: &[SourceDescriptor],
    data_dir: &Path,
) -> Result<FetchSummary, FetchError> {
    std::fs::create_dir_all(data_dir).map_err(|source| FetchError::Io {
        path: data_dir.to_path_buf(),
        source,
    })?;

    let mut summary = FetchSummary::default();
    for source in sources {
        let dest = source.path_in(data_dir);
        if dest.exists() {
            info!(
                "event=download module=fetch status=skipped file={}",
                source.file_name
            );
            summary.skipped.push(dest);
            continue;
        }

        let started_at = Instant::now();
        info!(
            "event=download module=fetch status=start file={}",
            source.file_name
        );
        let partial = data_dir.join(format!("{}.part", source.file_name));
        let bytes = match downloader.download(&source.origin, &partial) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(
                    "event=download module=fetch status=error file={} duration_ms={} error={}",
                    source.file_name,
                    started_at.elapsed().as_millis(),
                    err
                );
                let _ = std::fs::remove_file(&partial);
                return Err(err);
            }
        };
        std::fs::rename(&partial, &dest).map_err(|source| FetchError::Io {
            path: dest.clone(),
            source,
        })?;
        info!(
            "event=download module=fetch status=ok file={} bytes={} duration_ms={}",
            source.file_name,
            bytes,
            started_at.elapsed().as_millis()
        );
        summary.downloaded.push(dest);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{fetch_missing, Downloader, FetchError};
    use crate::config::{SourceDescriptor, SourceKind};
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct FakeDownloader {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Downloader for FakeDownloader {
        fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            if self.fail {
                std::fs::write(dest, b"partial").unwrap();
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                });
            }
            std::fs::write(dest, url.as_bytes()).unwrap();
            Ok(url.len() as u64)
        }
    }

    fn source(name: &str) -> SourceDescriptor {
        SourceDescriptor {
            origin: format!("https://example.org/{name}"),
            file_name: name.to_string(),
            kind: SourceKind::Deaths,
        }
    }

    #[test]
    fn downloads_only_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("present.txt"), b"cached").unwrap();

        let downloader = FakeDownloader::default();
        let summary = fetch_missing(
            &downloader,
            &[source("present.txt"), source("missing.txt")],
            &data_dir,
        )
        .unwrap();

        assert_eq!(*downloader.calls.borrow(), vec!["https://example.org/missing.txt"]);
        assert_eq!(summary.skipped, vec![data_dir.join("present.txt")]);
        assert_eq!(summary.downloaded, vec![data_dir.join("missing.txt")]);
        assert_eq!(
            std::fs::read_to_string(data_dir.join("present.txt")).unwrap(),
            "cached"
        );
        assert!(!data_dir.join("missing.txt.part").exists());
    }

    #[test]
    fn failed_download_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = FakeDownloader {
            fail: true,
            ..FakeDownloader::default()
        };
        let err = fetch_missing(&downloader, &[source("a.txt")], dir.path()).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!dir.path().join("a.txt").exists());
        assert!(!dir.path().join("a.txt.part").exists());
    }
}
