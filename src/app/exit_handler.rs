//! Exit code logic for the harvester process.
//!
//! Single responsibility: map a run report to the process exit outcome.

use harvester_core::RunReport;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished run.
///
/// An interrupted run or a failed listing is a failure. Otherwise the run
/// succeeds when nothing failed, and is partial when some items failed but
/// others were downloaded.
pub(crate) fn determine_exit_outcome(report: &RunReport) -> ProcessExit {
    if report.interrupted || report.listing_error.is_some() {
        return ProcessExit::Failure;
    }
    if report.failed() == 0 && !report.has_errors() {
        ProcessExit::Success
    } else if report.downloaded() > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use harvester_core::orchestrator::{CollectionDisposition, CollectionReport};

    use super::determine_exit_outcome;
    use crate::ProcessExit;
    use harvester_core::RunReport;

    fn collection(downloaded: usize, failed: usize) -> CollectionReport {
        CollectionReport {
            identity: "c1".to_string(),
            title: "Backend Engineer".to_string(),
            classification: "new",
            folder: PathBuf::from("downloads/Backend Engineer (01-02-2024)"),
            disposition: CollectionDisposition::Incomplete,
            announced_total: (downloaded + failed) as u64,
            harvested: downloaded + failed,
            passes: 1,
            downloaded,
            skipped: 0,
            failed,
            unrecoverable: 0,
            faulted_passes: 0,
            failures: Default::default(),
        }
    }

    fn report(collections: Vec<CollectionReport>) -> RunReport {
        RunReport {
            listed: collections.len(),
            collections,
            ..RunReport::default()
        }
    }

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        assert_eq!(
            determine_exit_outcome(&report(vec![collection(3, 0)])),
            ProcessExit::Success
        );
    }

    #[test]
    fn test_exit_outcome_success_when_nothing_to_do() {
        assert_eq!(determine_exit_outcome(&report(vec![])), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_partial_when_mixed() {
        assert_eq!(
            determine_exit_outcome(&report(vec![collection(2, 1)])),
            ProcessExit::Partial
        );
    }

    #[test]
    fn test_exit_outcome_failure_when_all_failed() {
        assert_eq!(
            determine_exit_outcome(&report(vec![collection(0, 2)])),
            ProcessExit::Failure
        );
    }

    #[test]
    fn test_exit_outcome_failure_when_interrupted() {
        let mut run = report(vec![collection(4, 0)]);
        run.interrupted = true;
        assert_eq!(determine_exit_outcome(&run), ProcessExit::Failure);
    }

    #[test]
    fn test_exit_outcome_failure_when_listing_failed() {
        let run = RunReport {
            listing_error: Some("manifest unreadable".to_string()),
            ..RunReport::default()
        };
        assert_eq!(determine_exit_outcome(&run), ProcessExit::Failure);
    }

    #[test]
    fn test_exit_outcome_partial_when_one_collection_errored() {
        let mut broken = collection(0, 0);
        broken.disposition = CollectionDisposition::Errored("folder not writable".to_string());
        assert_eq!(
            determine_exit_outcome(&report(vec![collection(1, 0), broken])),
            ProcessExit::Partial
        );
    }
}
