//! Upload decision table
//!
//! Maps the current record of a file and the invocation flags to the action
//! the uploader takes. Pure: no I/O happens here.

use super::record::{UploadRecord, UploadStatus};

/// Flags that influence the decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadFlags {
    /// Re-attempt a dangling `uploading` record
    pub resume: bool,

    /// Upload again even though the file is marked `done`
    pub reupload: bool,

    /// Suppress the "already uploaded" notice
    pub quiet: bool,
}

/// What to do with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No record: start a fresh upload
    Proceed,

    /// Dangling `uploading` record and `--resume`
    Resume,

    /// `done` record and `--reupload`
    Reupload,

    /// `failed` record: clear it and try again
    Retry,

    /// `done` record without `--reupload`
    Skip,

    /// Dangling `uploading` record without `--resume`
    AbortDangling,
}

impl Decision {
    /// Returns true if the decision leads to a network call
    pub fn uploads(&self) -> bool {
        matches!(
            self,
            Decision::Proceed | Decision::Resume | Decision::Reupload | Decision::Retry
        )
    }

    /// Returns true if a prior record has to be removed before uploading
    pub fn clears_prior(&self) -> bool {
        matches!(
            self,
            Decision::Resume | Decision::Reupload | Decision::Retry
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Proceed => "proceed",
            Decision::Resume => "resume",
            Decision::Reupload => "reupload",
            Decision::Retry => "retry",
            Decision::Skip => "skip",
            Decision::AbortDangling => "abort",
        }
    }
}

/// Decides the action for a file given its current record
pub fn decide(record: Option<&UploadRecord>, flags: UploadFlags) -> Decision {
    let status = record.map(|r| r.status).unwrap_or_default();

    match status {
        UploadStatus::New => Decision::Proceed,
        UploadStatus::Uploading if flags.resume => Decision::Resume,
        UploadStatus::Uploading => Decision::AbortDangling,
        UploadStatus::Done if flags.reupload => Decision::Reupload,
        UploadStatus::Done => Decision::Skip,
        UploadStatus::Failed => Decision::Retry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(status: UploadStatus) -> UploadRecord {
        UploadRecord::bare(status)
    }

    fn flags(resume: bool, reupload: bool) -> UploadFlags {
        UploadFlags {
            resume,
            reupload,
            quiet: false,
        }
    }

    #[test]
    fn absent_record_proceeds() {
        assert_eq!(decide(None, flags(false, false)), Decision::Proceed);
    }

    #[test]
    fn dangling_upload_aborts_without_resume() {
        let r = record(UploadStatus::Uploading);
        assert_eq!(decide(Some(&r), flags(false, false)), Decision::AbortDangling);
        assert_eq!(decide(Some(&r), flags(false, true)), Decision::AbortDangling);
    }

    #[test]
    fn dangling_upload_resumes_with_flag() {
        let r = record(UploadStatus::Uploading);
        assert_eq!(decide(Some(&r), flags(true, false)), Decision::Resume);
    }

    #[test]
    fn done_is_skipped_unless_reupload() {
        let r = record(UploadStatus::Done);
        assert_eq!(decide(Some(&r), flags(false, false)), Decision::Skip);
        assert_eq!(decide(Some(&r), flags(true, false)), Decision::Skip);
        assert_eq!(decide(Some(&r), flags(false, true)), Decision::Reupload);
    }

    #[test]
    fn failed_is_retried() {
        let r = record(UploadStatus::Failed);
        assert_eq!(decide(Some(&r), flags(false, false)), Decision::Retry);
    }

    fn any_status() -> impl Strategy<Value = Option<UploadStatus>> {
        prop_oneof![
            Just(None),
            Just(Some(UploadStatus::New)),
            Just(Some(UploadStatus::Uploading)),
            Just(Some(UploadStatus::Done)),
            Just(Some(UploadStatus::Failed)),
        ]
    }

    proptest! {
        #[test]
        fn done_never_uploads_without_reupload(resume: bool, quiet: bool) {
            let r = record(UploadStatus::Done);
            let f = UploadFlags { resume, reupload: false, quiet };
            prop_assert!(!decide(Some(&r), f).uploads());
        }

        #[test]
        fn quiet_never_changes_the_decision(
            status in any_status(),
            resume: bool,
            reupload: bool,
        ) {
            let r = status.map(record);
            let loud = decide(r.as_ref(), UploadFlags { resume, reupload, quiet: false });
            let quiet = decide(r.as_ref(), UploadFlags { resume, reupload, quiet: true });
            prop_assert_eq!(loud, quiet);
        }

        #[test]
        fn only_existing_records_are_cleared(
            status in any_status(),
            resume: bool,
            reupload: bool,
        ) {
            let r = status.map(record);
            let decision = decide(r.as_ref(), UploadFlags { resume, reupload, quiet: false });
            let has_marker = matches!(
                status,
                Some(UploadStatus::Uploading | UploadStatus::Done | UploadStatus::Failed)
            );
            if decision.clears_prior() {
                prop_assert!(has_marker);
                prop_assert!(decision.uploads());
            }
        }
    }
}
