#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use iris_e01_processor::HookName;
use iris_e01_processor::HookPayload;
use iris_e01_processor::ModuleInterface;
use iris_e01_processor::launcher::DetachedSpawner;
use pretty_assertions::assert_eq;

use super::common::add_file;
use super::common::at;
use super::common::config_with_script;
use super::common::evidence;
use super::common::processor;
use super::common::seeded_store;

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).expect("write script");
    let mut perms = std::fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("chmod");
}

fn wait_for(path: &Path) -> String {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(text) = std::fs::read_to_string(path)
            && text.ends_with("done\n")
        {
            return text;
        }
        assert!(Instant::now() < deadline, "{} never appeared", path.display());
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn script_runs_detached_with_arguments_and_environment() {
    let work = tempfile::tempdir().expect("tempdir");
    let uploads = work.path().join("uploads");
    std::fs::create_dir(&uploads).expect("uploads");
    let script = work.path().join("process_e01.sh");
    write_script(
        &script,
        "#!/bin/sh\n\
         out=\"$IRIS_E01_OUTPUT_DIR/marker.txt\"\n\
         {\n\
           echo \"args=$*\"\n\
           echo \"case=$IRIS_CASE_ID evidence=$IRIS_EVIDENCE_ID\"\n\
           echo \"path=$IRIS_E01_PATH\"\n\
           echo \"module=$IRIS_MODULE_NAME\"\n\
           echo \"cwd=$(pwd)\"\n\
           echo done\n\
         } > \"$out.tmp\" && mv \"$out.tmp\" \"$out\"\n",
    );

    let store = seeded_store();
    add_file(&store, "aa", "/data/disk.E01", at(1, 0));
    let mut config = config_with_script(&script.to_string_lossy());
    config.e01_script_extra_args = "--tz 'Europe/Paris'".to_string();
    let processor = processor(config, store, Some(&uploads), Arc::new(DetachedSpawner));

    let started = Instant::now();
    let status = processor.hooks_handler(
        &HookName::OnPostloadEvidenceCreate,
        None,
        HookPayload::from(vec![evidence(3, Some("aa"))]),
    );
    assert!(status.is_success());
    assert!(started.elapsed() < Duration::from_secs(5));

    let output_dir = uploads
        .join("AcmeCorp")
        .join("Intrusion2024")
        .join("iris_e01_processor");
    let marker = wait_for(&output_dir.join("marker.txt"));
    let lines: Vec<&str> = marker.lines().collect();
    assert_eq!(lines[0], "args=/data/disk.E01 --tz Europe/Paris");
    assert_eq!(lines[1], "case=1 evidence=3");
    assert_eq!(lines[2], "path=/data/disk.E01");
    assert_eq!(lines[3], "module=iris_e01_processor");
    let cwd = lines[4].trim_start_matches("cwd=");
    assert_eq!(
        std::fs::canonicalize(cwd).expect("cwd"),
        std::fs::canonicalize(&output_dir).expect("output dir")
    );
}

#[test]
fn missing_script_is_logged_and_handler_still_succeeds() {
    let work = tempfile::tempdir().expect("tempdir");
    let store = seeded_store();
    add_file(&store, "aa", "/data/disk.E01", at(1, 0));
    let script = work.path().join("absent.sh");
    let processor = processor(
        config_with_script(&script.to_string_lossy()),
        store,
        None,
        Arc::new(DetachedSpawner),
    );

    let payload = HookPayload::from(vec![evidence(3, Some("aa"))]);
    let status = processor.hooks_handler(&HookName::OnPostloadEvidenceCreate, None, payload.clone());

    assert_eq!(status.data(), Some(&payload));
    assert!(
        status
            .logs()
            .iter()
            .any(|l| l.contains("not found or not executable"))
    );
}
