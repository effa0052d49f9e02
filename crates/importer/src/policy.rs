// ABOUTME: Failure policy table deciding how each import stage's errors are handled.
// ABOUTME: Maps stages to recover-and-omit, count-as-failed or fatal, and to failure-log tags.

use crate::error::ImportError;
use crate::failure_log::FailureKind;

/// Point in the run where a collaborator call can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The first page of posts; without it there is nothing to import.
    FirstPostsPage,
    PostsPage,
    Author,
    Category,
    FeaturedMedia,
    ImageDownload,
    MediaCreate,
    Content,
    PostSave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Record the failure and carry on without the value.
    RecoverAndOmit,
    /// Record the failure and count the post as failed.
    CountAsFailed,
    /// Record the failure and stop the run.
    Fatal,
}

pub fn policy_for(stage: Stage) -> Policy {
    match stage {
        Stage::FirstPostsPage => Policy::Fatal,
        Stage::PostSave => Policy::CountAsFailed,
        Stage::PostsPage
        | Stage::Author
        | Stage::Category
        | Stage::FeaturedMedia
        | Stage::ImageDownload
        | Stage::MediaCreate
        | Stage::Content => Policy::RecoverAndOmit,
    }
}

impl Stage {
    /// Log tag for `err` raised at this stage.
    ///
    /// Author and category failures on the WordPress side are tagged
    /// `WP_FETCH`; failures writing them to the store keep their own tag.
    pub fn failure_kind(self, err: &ImportError) -> FailureKind {
        match self {
            Stage::FirstPostsPage => FailureKind::Fatal,
            Stage::PostsPage => FailureKind::PostsPage,
            Stage::Author if !err.is_store() => FailureKind::WpFetch,
            Stage::Author => FailureKind::Author,
            Stage::Category if !err.is_store() => FailureKind::WpFetch,
            Stage::Category => FailureKind::Category,
            Stage::FeaturedMedia => FailureKind::FeaturedMedia,
            Stage::ImageDownload if err.is_not_found_status() => FailureKind::Image404,
            Stage::ImageDownload if err.is_status() => FailureKind::ImageHttp,
            Stage::ImageDownload => FailureKind::ImageFetch,
            Stage::MediaCreate => FailureKind::MediaCreate,
            Stage::Content => FailureKind::ContentConvert,
            Stage::PostSave => FailureKind::PostSave,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(policy_for(Stage::FirstPostsPage), Policy::Fatal);
        assert_eq!(policy_for(Stage::PostSave), Policy::CountAsFailed);
        assert_eq!(policy_for(Stage::PostsPage), Policy::RecoverAndOmit);
        assert_eq!(policy_for(Stage::ImageDownload), Policy::RecoverAndOmit);
        assert_eq!(policy_for(Stage::Content), Policy::RecoverAndOmit);
    }

    #[test]
    fn test_image_failure_kinds() {
        let missing = ImportError::status("u", "Download", 404, None);
        let server = ImportError::status("u", "Download", 503, None);
        let transport = ImportError::fetch("u", "Download", None);

        assert_eq!(Stage::ImageDownload.failure_kind(&missing), FailureKind::Image404);
        assert_eq!(Stage::ImageDownload.failure_kind(&server), FailureKind::ImageHttp);
        assert_eq!(Stage::ImageDownload.failure_kind(&transport), FailureKind::ImageFetch);
    }

    #[test]
    fn test_author_failure_kinds() {
        let remote = ImportError::status("u", "Fetch", 500, None);
        let store = ImportError::store("users", "Create", None);

        assert_eq!(Stage::Author.failure_kind(&remote), FailureKind::WpFetch);
        assert_eq!(Stage::Author.failure_kind(&store), FailureKind::Author);
        assert_eq!(Stage::Category.failure_kind(&store), FailureKind::Category);
    }
}
