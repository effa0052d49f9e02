// ABOUTME: Per-run import context owning identity caches, persisted id maps and the failure log.
// ABOUTME: Applies the stage policy table to collaborator results, recording every failure once.

use std::collections::HashMap;
use std::fs;

use crate::error::ImportError;
use crate::failure_log::{FailureEntry, FailureLog};
use crate::id_map::IdMap;
use crate::options::ImportOptions;
use crate::policy::{policy_for, Policy, Stage};
use crate::store::DocId;

/// Outcome of a collaborator call after the policy table has been applied.
#[derive(Debug)]
pub enum Settled<T> {
    Value(T),
    /// Failed and recorded; carry on without the value.
    Omitted,
    /// Failed and recorded; the current post counts as failed.
    Failed(ImportError),
    /// Failed and recorded; the run must stop.
    Fatal(ImportError),
}

impl<T> Settled<T> {
    /// The value, if the call succeeded.
    pub fn value(self) -> Option<T> {
        match self {
            Settled::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Where a failure happened, for the log.
#[derive(Debug, Clone, Default)]
pub struct FailureScope<'a> {
    pub message: &'a str,
    pub url: Option<&'a str>,
    pub post: Option<&'a str>,
}

/// State shared by every step of one run. Created at run start, dropped at run end.
#[derive(Debug)]
pub struct ImportContext {
    pub users: HashMap<u64, DocId>,
    pub categories: HashMap<String, DocId>,
    pub media: IdMap,
    pub posts: IdMap,
    pub failures: FailureLog,
}

impl ImportContext {
    /// Creates the work directory and loads the persisted maps, or starts
    /// with empty in-memory maps when persistence is off.
    pub fn open(opts: &ImportOptions) -> Result<Self, ImportError> {
        fs::create_dir_all(&opts.work_dir).map_err(|e| {
            ImportError::io(opts.work_dir.display().to_string(), "CreateWorkDir", Some(e.into()))
        })?;

        if !opts.persist_maps {
            return Ok(Self::in_memory(FailureLog::new(opts.log_path())));
        }

        let media = match opts.media_map_path() {
            Some(path) => IdMap::load(path)?,
            None => IdMap::in_memory(),
        };

        Ok(Self {
            users: HashMap::new(),
            categories: HashMap::new(),
            media,
            posts: IdMap::load(opts.post_map_path())?,
            failures: FailureLog::new(opts.log_path()),
        })
    }

    /// A context with in-memory maps and the given failure log.
    pub fn in_memory(failures: FailureLog) -> Self {
        Self {
            users: HashMap::new(),
            categories: HashMap::new(),
            media: IdMap::in_memory(),
            posts: IdMap::in_memory(),
            failures,
        }
    }

    /// Records a failure of `stage` and decides what happens next.
    pub fn settle<T>(&mut self, stage: Stage, scope: FailureScope<'_>, result: Result<T, ImportError>) -> Settled<T> {
        let err = match result {
            Ok(value) => return Settled::Value(value),
            Err(err) => err,
        };

        let mut entry = FailureEntry::from_error(stage.failure_kind(&err), scope.message, &err);
        if let Some(url) = scope.url {
            entry = entry.url(url);
        }
        if let Some(post) = scope.post {
            entry = entry.post(post);
        }
        self.failures.record(&entry);

        match policy_for(stage) {
            Policy::RecoverAndOmit => Settled::Omitted,
            Policy::CountAsFailed => Settled::Failed(err),
            Policy::Fatal => Settled::Fatal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> ImportContext {
        ImportContext::in_memory(FailureLog::new(dir.path().join("import-errors.log")))
    }

    #[test]
    fn test_settle_value_records_nothing() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let settled = ctx.settle(Stage::Author, FailureScope::default(), Ok::<_, ImportError>(5));
        assert_eq!(settled.value(), Some(5));
        assert_eq!(ctx.failures.count(), 0);
    }

    #[test]
    fn test_settle_applies_policy() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let scope = || FailureScope {
            message: "failed",
            url: Some("https://x.test"),
            post: Some("1 hello"),
        };

        let omitted = ctx.settle::<()>(Stage::Category, scope(), Err(ImportError::fetch("u", "op", None)));
        assert!(matches!(omitted, Settled::Omitted));

        let failed = ctx.settle::<()>(Stage::PostSave, scope(), Err(ImportError::store("posts", "Create", None)));
        assert!(matches!(failed, Settled::Failed(_)));

        let fatal = ctx.settle::<()>(Stage::FirstPostsPage, scope(), Err(ImportError::status("u", "Posts", 500, None)));
        assert!(matches!(fatal, Settled::Fatal(_)));

        assert_eq!(ctx.failures.count(), 3);
        let log = fs::read_to_string(dir.path().join("import-errors.log")).unwrap();
        assert!(log.contains("[WP_FETCH] failed | url=https://x.test | post=1 hello"));
        assert!(log.contains("[POST_SAVE]"));
        assert!(log.contains("[FATAL]"));
    }

    #[test]
    fn test_open_creates_work_dir_and_loads_maps() {
        let dir = TempDir::new().unwrap();
        let work_dir = dir.path().join("work");
        fs::create_dir_all(&work_dir).unwrap();
        fs::write(work_dir.join("wp-post-map.json"), r#"{"7": "p7"}"#).unwrap();

        let opts = ImportOptions {
            work_dir: work_dir.clone(),
            ..Default::default()
        };
        let ctx = ImportContext::open(&opts).unwrap();
        assert_eq!(ctx.posts.get("7"), Some("p7"));
        assert!(ctx.media.path().is_some());

        let opts = ImportOptions {
            work_dir: dir.path().join("fresh"),
            media_map_file: None,
            ..Default::default()
        };
        let ctx = ImportContext::open(&opts).unwrap();
        assert!(ctx.posts.is_empty());
        assert_eq!(ctx.media.path(), None);
        assert!(dir.path().join("fresh").is_dir());
    }

    #[test]
    fn test_open_without_persistence_ignores_map_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("wp-post-map.json"), r#"{"7": "p7"}"#).unwrap();

        let opts = ImportOptions {
            work_dir: dir.path().to_path_buf(),
            persist_maps: false,
            ..Default::default()
        };
        let mut ctx = ImportContext::open(&opts).unwrap();
        assert!(ctx.posts.is_empty());
        assert_eq!(ctx.posts.path(), None);
        assert_eq!(ctx.media.path(), None);
        assert_eq!(ctx.failures.path(), dir.path().join("import-errors.log").as_path());

        ctx.posts.insert("8", "p8");
        ctx.posts.save().unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("wp-post-map.json")).unwrap(),
            r#"{"7": "p7"}"#
        );
        assert!(!dir.path().join("wp-media-map.json").exists());
    }

    #[test]
    fn test_open_rejects_corrupt_post_map() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("wp-post-map.json"), "{not json").unwrap();
        let opts = ImportOptions {
            work_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(ImportContext::open(&opts).unwrap_err().is_decode());
    }
}
