// ABOUTME: Append-only failure log written as one human-readable line per failure.
// ABOUTME: Defines FailureKind tags and FailureEntry records; the log is never read back.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::ImportError;

/// Category tag written in front of every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    WpFetch,
    PostsPage,
    Author,
    Category,
    FeaturedMedia,
    Image404,
    ImageHttp,
    ImageFetch,
    MediaCreate,
    ContentConvert,
    PostSave,
    Fatal,
}

impl FailureKind {
    pub fn tag(self) -> &'static str {
        match self {
            FailureKind::WpFetch => "WP_FETCH",
            FailureKind::PostsPage => "POSTS_PAGE",
            FailureKind::Author => "AUTHOR",
            FailureKind::Category => "CATEGORY",
            FailureKind::FeaturedMedia => "FEATURED_MEDIA",
            FailureKind::Image404 => "IMAGE_404",
            FailureKind::ImageHttp => "IMAGE_HTTP",
            FailureKind::ImageFetch => "IMAGE_FETCH",
            FailureKind::MediaCreate => "MEDIA_CREATE",
            FailureKind::ContentConvert => "CONTENT_CONVERT",
            FailureKind::PostSave => "POST_SAVE",
            FailureKind::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub kind: FailureKind,
    pub message: String,
    pub url: Option<String>,
    pub post: Option<String>,
    pub status: Option<u16>,
    pub detail: Option<String>,
}

impl FailureEntry {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            url: None,
            post: None,
            status: None,
            detail: None,
        }
    }

    /// Entry describing `err`: its status code and source chain are carried over.
    pub fn from_error(kind: FailureKind, message: impl Into<String>, err: &ImportError) -> Self {
        let mut entry = Self::new(kind, message);
        entry.status = err.http_status();
        entry.detail = Some(match err.detail() {
            Some(detail) => format!("{} {}: {}: {}", err.op, err.target, err.code, detail),
            None => format!("{} {}: {}", err.op, err.target, err.code),
        });
        entry
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn post(mut self, post: impl Into<String>) -> Self {
        self.post = Some(post.into());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Renders the entry as a single log line (no trailing newline).
    pub fn format_line(&self, at: DateTime<Utc>) -> String {
        let mut line = format!(
            "[{}] [{}] {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.kind,
            one_line(&self.message)
        );
        if let Some(url) = &self.url {
            line.push_str(&format!(" | url={}", url));
        }
        if let Some(post) = &self.post {
            line.push_str(&format!(" | post={}", post));
        }
        if let Some(status) = self.status {
            line.push_str(&format!(" | status={}", status));
        }
        if let Some(detail) = &self.detail {
            line.push_str(&format!(" | detail={}", one_line(detail)));
        }
        line
    }
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append-only log of failures for one run.
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    count: usize,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failures recorded so far in this run.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Appends `entry`. A log that cannot be written is reported through
    /// tracing; the run goes on regardless.
    pub fn record(&mut self, entry: &FailureEntry) {
        self.count += 1;
        tracing::warn!(kind = %entry.kind, "{}", entry.message);

        let line = entry.format_line(Utc::now());
        if let Err(err) = self.append(&line) {
            tracing::error!(path = %self.path.display(), "cannot write failure log: {}", err);
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_format_line_all_fields() {
        let entry = FailureEntry::new(FailureKind::Image404, "image download failed")
            .url("https://x.test/a.jpg")
            .post("42 hello-world")
            .status(404);
        assert_eq!(
            entry.format_line(fixed_time()),
            "[2024-05-01T12:30:00Z] [IMAGE_404] image download failed | url=https://x.test/a.jpg | post=42 hello-world | status=404"
        );
    }

    #[test]
    fn test_format_line_from_error() {
        let err = ImportError::status(
            "https://blog.test/wp-json/wp/v2/users/3",
            "Fetch",
            500,
            Some(anyhow::anyhow!("boom\nsecond line")),
        );
        let entry = FailureEntry::from_error(FailureKind::WpFetch, "author lookup failed", &err);
        let line = entry.format_line(fixed_time());
        assert!(line.starts_with("[2024-05-01T12:30:00Z] [WP_FETCH] author lookup failed | status=500 | detail=Fetch"));
        assert!(line.ends_with("boom second line"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_record_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("import-errors.log");
        let mut log = FailureLog::new(&path);

        log.record(&FailureEntry::new(FailureKind::PostSave, "first"));
        log.record(&FailureEntry::new(FailureKind::Fatal, "second"));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[POST_SAVE] first"));
        assert!(lines[1].contains("[FATAL] second"));
        assert_eq!(log.count(), 2);
    }

    #[test]
    fn test_tags() {
        assert_eq!(FailureKind::ImageHttp.tag(), "IMAGE_HTTP");
        assert_eq!(FailureKind::ContentConvert.to_string(), "CONTENT_CONVERT");
    }
}
