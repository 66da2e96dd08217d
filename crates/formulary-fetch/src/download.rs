//! Archive downloads with streaming checksum verification.
//!
//! Every archive is streamed into a temporary file inside the download
//! cache while being hashed. Only an archive whose digest matches its
//! declared checksum is moved to its final cache path; a mismatching
//! download is discarded with the temporary file.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use formulary_core::checksum::{self, HashingWriter};
use formulary_core::{ArchiveKind, ArchiveRef, PackageDescriptor};
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};

/// Length of the URL-hash prefix in cache file names.
const CACHE_KEY_LEN: usize = 16;

/// Options for building a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Reject placeholder checksums instead of skipping verification.
    pub strict_checksums: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            user_agent: format!("formulary/{}", env!("CARGO_PKG_VERSION")),
            strict_checksums: false,
        }
    }
}

/// An archive on disk whose checksum has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub name: String,
    pub url: String,
    pub kind: ArchiveKind,
    /// Path inside the download cache.
    pub path: PathBuf,
    /// Actual SHA-256 of the file.
    pub sha256: String,
    /// `false` when the declared checksum was a placeholder.
    pub verified: bool,
    /// `true` when served from the cache without a download.
    pub cached: bool,
}

/// Downloads archives into a cache directory.
pub struct Fetcher {
    agent: ureq::Agent,
    downloads: PathBuf,
    options: FetchOptions,
}

impl Fetcher {
    /// Create a fetcher storing archives in `downloads`.
    pub fn new(downloads: impl Into<PathBuf>, options: FetchOptions) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            downloads: downloads.into(),
            options,
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads
    }

    /// Where `archive` is cached: `<downloads>/<url-hash>--<file name>`.
    pub fn cache_path(&self, archive: &ArchiveRef<'_>) -> PathBuf {
        let key = checksum::sha256_hex(archive.url.as_bytes());
        let key = &key[..CACHE_KEY_LEN];
        self.downloads
            .join(format!("{key}--{}", file_name_from_url(archive.url)))
    }

    /// Fetch and verify every archive of `descriptor`, resources first.
    ///
    /// Stops at the first failure; nothing outside the download cache is
    /// touched.
    pub fn fetch_all(&self, descriptor: &PackageDescriptor) -> Result<Vec<FetchedArchive>> {
        descriptor
            .archives()
            .iter()
            .map(|archive| self.fetch(archive))
            .collect()
    }

    /// Fetch one archive, reusing a cached copy that still verifies.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Unverified`] for a placeholder in strict mode
    /// - [`FetchError::Unreachable`] / [`FetchError::Status`] for fetch failures
    /// - [`FetchError::ChecksumMismatch`] if the digest disagrees
    pub fn fetch(&self, archive: &ArchiveRef<'_>) -> Result<FetchedArchive> {
        if archive.checksum.is_placeholder() {
            if self.options.strict_checksums {
                return Err(FetchError::Unverified {
                    name: archive.name.to_string(),
                });
            }
            warn!(
                archive = archive.name,
                "checksum is a placeholder; skipping verification"
            );
        }

        let target = self.cache_path(archive);
        if let Some(hit) = self.cached(archive, &target)? {
            return Ok(hit);
        }

        std::fs::create_dir_all(&self.downloads).map_err(|e| FetchError::io(&self.downloads, e))?;
        info!(archive = archive.name, url = archive.url, "fetching");
        let reader = self.open(archive.url)?;
        let (tmp, actual) = self.stream_to_temp(reader, archive.url)?;

        if !archive.checksum.matches(&actual) {
            // tmp is dropped (and deleted) here
            return Err(FetchError::ChecksumMismatch {
                name: archive.name.to_string(),
                url: archive.url.to_string(),
                expected: archive.checksum.as_str().to_string(),
                actual,
            });
        }

        tmp.persist(&target)
            .map_err(|e| FetchError::io(&target, e.error))?;
        debug!(path = %target.display(), sha256 = %actual, "stored download");

        Ok(FetchedArchive {
            name: archive.name.to_string(),
            url: archive.url.to_string(),
            kind: archive.kind,
            path: target,
            sha256: actual,
            verified: !archive.checksum.is_placeholder(),
            cached: false,
        })
    }

    /// Return the cached archive if it exists and verifies against a real
    /// checksum. Placeholder archives are always fetched again.
    fn cached(&self, archive: &ArchiveRef<'_>, target: &Path) -> Result<Option<FetchedArchive>> {
        let Some(expected) = archive.checksum.digest() else {
            return Ok(None);
        };
        if !target.is_file() {
            return Ok(None);
        }
        let file = File::open(target).map_err(|e| FetchError::io(target, e))?;
        let actual = checksum::sha256_reader(file).map_err(|e| FetchError::io(target, e))?;
        if !expected.eq_ignore_ascii_case(&actual) {
            warn!(path = %target.display(), "cached archive is corrupt; fetching again");
            std::fs::remove_file(target).map_err(|e| FetchError::io(target, e))?;
            return Ok(None);
        }
        debug!(archive = archive.name, path = %target.display(), "cache hit");
        Ok(Some(FetchedArchive {
            name: archive.name.to_string(),
            url: archive.url.to_string(),
            kind: archive.kind,
            path: target.to_path_buf(),
            sha256: actual,
            verified: true,
            cached: true,
        }))
    }

    /// Open a reader over the archive at `url`.
    fn open(&self, url: &str) -> Result<Box<dyn Read>> {
        let local = url
            .strip_prefix("file://")
            .or_else(|| (!url.contains("://")).then_some(url));
        if let Some(path) = local {
            let file = File::open(path).map_err(|e| FetchError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            return Ok(Box::new(file));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(FetchError::UnsupportedScheme(url.to_string()));
        }

        let response = self
            .agent
            .get(url)
            .header("User-Agent", self.options.user_agent.as_str())
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FetchError::Status {
                    url: url.to_string(),
                    code,
                },
                other => FetchError::Unreachable {
                    url: url.to_string(),
                    message: other.to_string(),
                },
            })?;
        Ok(Box::new(response.into_body().into_reader()))
    }

    /// Copy `reader` into a temp file in the downloads directory, hashing
    /// as it goes.
    fn stream_to_temp(
        &self,
        mut reader: Box<dyn Read>,
        url: &str,
    ) -> Result<(tempfile::NamedTempFile, String)> {
        let tmp = tempfile::NamedTempFile::new_in(&self.downloads)
            .map_err(|e| FetchError::io(&self.downloads, e))?;
        let mut writer = HashingWriter::new(io::BufWriter::new(tmp));
        io::copy(&mut reader, &mut writer).map_err(|e| FetchError::Unreachable {
            url: url.to_string(),
            message: format!("transfer interrupted: {e}"),
        })?;
        debug!(url, bytes = writer.bytes_written(), "download complete");
        let (mut buffered, digest) = writer.finish();
        buffered
            .flush()
            .map_err(|e| FetchError::io(&self.downloads, e))?;
        let tmp = buffered
            .into_inner()
            .map_err(|e| FetchError::io(&self.downloads, e.into_error()))?;
        Ok((tmp, digest))
    }

    /// Remove every cached download, returning how many files were deleted.
    pub fn clean(&self) -> Result<usize> {
        if !self.downloads.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        let entries = std::fs::read_dir(&self.downloads).map_err(|e| FetchError::io(&self.downloads, e))?;
        for entry in entries {
            let path = entry.map_err(|e| FetchError::io(&self.downloads, e))?.path();
            if path.is_file() {
                std::fs::remove_file(&path).map_err(|e| FetchError::io(&path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Last path segment of a URL with query/fragment stripped, made safe for
/// use as a file name.
pub fn file_name_from_url(url: &str) -> String {
    let name = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+') { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulary_core::Checksum;
    use pretty_assertions::assert_eq;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    struct Setup {
        _dir: tempfile::TempDir,
        source: PathBuf,
        fetcher: Fetcher,
    }

    fn setup(options: FetchOptions) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tool-1.0.tar.gz");
        std::fs::write(&source, b"archive bytes").unwrap();
        let fetcher = Fetcher::new(dir.path().join("downloads"), options);
        Setup {
            _dir: dir,
            source,
            fetcher,
        }
    }

    fn archive<'a>(url: &'a str, checksum: &'a Checksum) -> ArchiveRef<'a> {
        ArchiveRef {
            name: "tool",
            url,
            checksum,
            kind: ArchiveKind::Primary,
        }
    }

    /// Serve exactly one HTTP response on a local port.
    fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
        });
        format!("http://127.0.0.1:{port}/tool-1.0.tar.gz")
    }

    #[test]
    fn fetch_verifies_and_caches() {
        let s = setup(FetchOptions::default());
        let url = format!("file://{}", s.source.display());
        let sum = Checksum::parse(&checksum::sha256_hex(b"archive bytes")).unwrap();

        let first = s.fetcher.fetch(&archive(&url, &sum)).unwrap();
        assert!(first.verified);
        assert!(!first.cached);
        assert_eq!(std::fs::read(&first.path).unwrap(), b"archive bytes");
        assert!(first.path.file_name().unwrap().to_string_lossy().ends_with("--tool-1.0.tar.gz"));

        let second = s.fetcher.fetch(&archive(&url, &sum)).unwrap();
        assert!(second.cached);
        assert_eq!(second.path, first.path);
    }

    #[test]
    fn mismatch_leaves_nothing_behind() {
        let s = setup(FetchOptions::default());
        let url = format!("file://{}", s.source.display());
        let sum = Checksum::parse(&checksum::sha256_hex(b"something else")).unwrap();

        let err = s.fetcher.fetch(&archive(&url, &sum)).unwrap_err();
        assert!(err.is_checksum_mismatch(), "{err}");
        let leftovers = std::fs::read_dir(s.fetcher.downloads_dir()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn corrupt_cache_is_refetched() {
        let s = setup(FetchOptions::default());
        let url = format!("file://{}", s.source.display());
        let sum = Checksum::parse(&checksum::sha256_hex(b"archive bytes")).unwrap();
        let a = archive(&url, &sum);

        std::fs::create_dir_all(s.fetcher.downloads_dir()).unwrap();
        std::fs::write(s.fetcher.cache_path(&a), b"garbage").unwrap();
        let fetched = s.fetcher.fetch(&a).unwrap();
        assert!(!fetched.cached);
        assert_eq!(std::fs::read(&fetched.path).unwrap(), b"archive bytes");
    }

    #[test]
    fn placeholder_skips_verification_unless_strict() {
        let s = setup(FetchOptions::default());
        let url = format!("file://{}", s.source.display());
        let sum = Checksum::parse("placeholder_sha256").unwrap();
        let fetched = s.fetcher.fetch(&archive(&url, &sum)).unwrap();
        assert!(!fetched.verified);
        assert_eq!(fetched.sha256, checksum::sha256_hex(b"archive bytes"));

        let strict = setup(FetchOptions {
            strict_checksums: true,
            ..FetchOptions::default()
        });
        let err = strict.fetcher.fetch(&archive(&url, &sum)).unwrap_err();
        assert!(matches!(err, FetchError::Unverified { .. }));
    }

    #[test]
    fn unreachable_sources() {
        let s = setup(FetchOptions {
            timeout: Duration::from_secs(5),
            ..FetchOptions::default()
        });
        let sum = Checksum::parse("placeholder").unwrap();

        let missing = s.fetcher.fetch(&archive("file:///nonexistent/tool.tar.gz", &sum));
        assert!(matches!(missing, Err(FetchError::Unreachable { .. })));

        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}/tool.tar.gz");
        let refused = s.fetcher.fetch(&archive(&url, &sum));
        assert!(matches!(refused, Err(FetchError::Unreachable { .. })), "{refused:?}");

        let ftp = s.fetcher.fetch(&archive("ftp://x/tool.tar.gz", &sum));
        assert!(matches!(ftp, Err(FetchError::UnsupportedScheme(_))));
    }

    #[test]
    fn http_download_and_status_errors() {
        let s = setup(FetchOptions::default());
        let sum = Checksum::parse(&checksum::sha256_hex(b"served")).unwrap();
        let url = serve_once("200 OK", b"served");
        let fetched = s.fetcher.fetch(&archive(&url, &sum)).unwrap();
        assert_eq!(std::fs::read(&fetched.path).unwrap(), b"served");

        let url = serve_once("404 Not Found", b"");
        let err = s.fetcher.fetch(&archive(&url, &sum)).unwrap_err();
        assert!(matches!(err, FetchError::Status { code: 404, .. }), "{err}");
    }

    #[test]
    fn clean_removes_downloads() {
        let s = setup(FetchOptions::default());
        let url = format!("file://{}", s.source.display());
        let sum = Checksum::parse(&checksum::sha256_hex(b"archive bytes")).unwrap();
        s.fetcher.fetch(&archive(&url, &sum)).unwrap();
        assert_eq!(s.fetcher.clean().unwrap(), 1);
        assert_eq!(s.fetcher.clean().unwrap(), 0);
    }

    #[test]
    fn file_names_from_urls() {
        assert_eq!(file_name_from_url("https://x/a/click-8.1.7.tar.gz"), "click-8.1.7.tar.gz");
        assert_eq!(file_name_from_url("https://x/a/b.zip?x=1"), "b.zip");
        assert_eq!(file_name_from_url("https://x/"), "x");
        assert_eq!(file_name_from_url("https://x/we ird"), "we_ird");
    }
}
