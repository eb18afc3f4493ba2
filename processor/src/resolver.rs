//! Evidence to datastore-file path resolution.

use std::path::PathBuf;

use crate::message_queue::MessageQueue;
use crate::payload::Evidence;
use crate::store::DataStore;
use crate::store::StoreError;

/// Local path of the newest datastore file matching the evidence hash in the
/// evidence's case.
///
/// Returns `Ok(None)` when the evidence carries no hash or case id, or when no
/// stored file matches. A missing record is expected and only logged.
pub fn resolve_evidence_path(
    store: &dyn DataStore,
    evidence: &Evidence,
    log: &mut MessageQueue,
) -> Result<Option<PathBuf>, StoreError> {
    let (Some(case_id), Some(hash)) = (evidence.case(), evidence.hash()) else {
        log.debug(format!(
            "evidence id={} has no hash or case id; nothing to resolve",
            evidence.id
        ));
        return Ok(None);
    };

    match store.latest_stored_file(case_id, hash)? {
        Some(file) => Ok(Some(file.local_path)),
        None => {
            log.warning(format!(
                "no DataStoreFile found for evidence id={} case_id={case_id} sha256={hash}",
                evidence.id
            ));
            Ok(None)
        }
    }
}
