//! Per-case output directory under the host's upload root.
//!
//! Layout: `<uploads_root>/<client>/<case>/<module>`.

use std::path::Path;
use std::path::PathBuf;

use crate::message_queue::MessageQueue;
use crate::payload::Evidence;
use crate::store::DataStore;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OutputDirError {
    #[error("no upload root configured")]
    NoUploadRoot,

    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Strip spaces and path separators so a name is a single path component.
fn sanitize_component(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '/' && *c != '\\')
        .collect()
}

/// Path for a module's artifacts of one case, or `None` when any component
/// is empty after sanitising. With `create`, the tree is created if absent.
pub fn build_upload_path(
    uploads_root: &Path,
    case_customer: &str,
    case_name: &str,
    module: &str,
    create: bool,
) -> Result<Option<PathBuf>, OutputDirError> {
    let customer = sanitize_component(case_customer);
    let case = sanitize_component(case_name);
    let module = sanitize_component(module);
    if customer.is_empty() || case.is_empty() || module.is_empty() {
        return Ok(None);
    }
    // `..` would escape the upload root.
    if [&customer, &case, &module].iter().any(|c| c.as_str() == "..") {
        return Ok(None);
    }

    let path = uploads_root.join(customer).join(case).join(module);
    if create {
        std::fs::create_dir_all(&path).map_err(|source| OutputDirError::Create {
            path: path.clone(),
            source,
        })?;
    }
    Ok(Some(path))
}

/// Output directory for the evidence's case, created if needed.
///
/// Never fails: a missing case, client, name or upload root, and any error
/// while building the path, yield `None` so the launch falls back to the
/// default working directory.
pub fn compute_output_dir(
    store: &dyn DataStore,
    uploads_root: Option<&Path>,
    module: &str,
    evidence: &Evidence,
    log: &mut MessageQueue,
) -> Option<PathBuf> {
    match try_compute_output_dir(store, uploads_root, module, evidence) {
        Ok(dir) => dir,
        Err(err) => {
            log.error(format!(
                "failed to compute output directory for evidence id={}: {err}",
                evidence.id
            ));
            None
        }
    }
}

fn try_compute_output_dir(
    store: &dyn DataStore,
    uploads_root: Option<&Path>,
    module: &str,
    evidence: &Evidence,
) -> Result<Option<PathBuf>, OutputDirError> {
    let Some(case_id) = evidence.case() else {
        return Ok(None);
    };
    let Some(case) = store.case_with_client(case_id)? else {
        return Ok(None);
    };
    let customer = case.client.as_ref().and_then(|c| c.name.as_deref());
    let (Some(customer), Some(case_name)) = (customer, case.name.as_deref()) else {
        return Ok(None);
    };
    if customer.is_empty() || case_name.is_empty() {
        return Ok(None);
    }

    let root = uploads_root.ok_or(OutputDirError::NoUploadRoot)?;
    build_upload_path(root, customer, case_name, module, true)
}
