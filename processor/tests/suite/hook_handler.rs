use std::path::PathBuf;
use std::sync::Arc;

use iris_e01_processor::HookName;
use iris_e01_processor::HookObject;
use iris_e01_processor::HookPayload;
use iris_e01_processor::ModuleConfig;
use iris_e01_processor::ModuleInterface;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::common::RecordingSpawner;
use super::common::add_file;
use super::common::at;
use super::common::config_with_script;
use super::common::evidence;
use super::common::processor;
use super::common::seeded_store;

const EVIDENCE_HOOK: HookName = HookName::OnPostloadEvidenceCreate;

#[test]
fn disabled_module_passes_payload_through_without_side_effects() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let store = seeded_store();
    add_file(&store, "aa", "/data/a.E01", at(1, 0));
    let spawner = Arc::new(RecordingSpawner::default());
    let config = ModuleConfig {
        enabled: false,
        ..ModuleConfig::default()
    };
    let processor = processor(config, store, Some(uploads.path()), spawner.clone());

    let payload = HookPayload::from(vec![evidence(1, Some("aa"))]);
    let status = processor.hooks_handler(&EVIDENCE_HOOK, None, payload.clone());

    assert!(status.is_success());
    assert_eq!(status.data(), Some(&payload));
    assert!(spawner.requests().is_empty());
    assert_eq!(std::fs::read_dir(uploads.path()).expect("read").count(), 0);
}

#[test]
fn other_hooks_are_passthrough() {
    let spawner = Arc::new(RecordingSpawner::default());
    let processor = processor(
        config_with_script("/opt/run.sh"),
        seeded_store(),
        None,
        spawner.clone(),
    );

    let payload = HookPayload::from(vec![evidence(1, Some("aa"))]);
    let hook = HookName::Other("on_postload_ioc_create".to_string());
    let status = processor.hooks_handler(&hook, Some("ui name"), payload.clone());

    assert_eq!(status.data(), Some(&payload));
    assert!(spawner.requests().is_empty());
}

#[test]
fn missing_script_path_is_a_configuration_error() {
    let store = seeded_store();
    add_file(&store, "aa", "/data/a.E01", at(1, 0));
    let spawner = Arc::new(RecordingSpawner::default());
    let config = ModuleConfig {
        e01_script_path: None,
        ..ModuleConfig::default()
    };
    let processor = processor(config, store, None, spawner.clone());

    let status = processor.hooks_handler(
        &EVIDENCE_HOOK,
        None,
        HookPayload::from(vec![evidence(1, Some("aa"))]),
    );

    assert!(status.is_failure());
    assert_eq!(status.message(), Some("e01_script_path not configured"));
    assert!(status.logs().iter().any(|l| l.starts_with("[ERROR]")));
    assert!(spawner.requests().is_empty());
}

#[test]
fn payload_without_evidence_is_returned_unchanged() {
    let spawner = Arc::new(RecordingSpawner::default());
    let config = ModuleConfig {
        log_debug: true,
        ..config_with_script("/opt/run.sh")
    };
    let processor = processor(config, seeded_store(), None, spawner.clone());

    let payload = HookPayload::Single(HookObject::Other(json!({ "object_type": "ioc", "id": 4 })));
    let status = processor.hooks_handler(&EVIDENCE_HOOK, None, payload.clone());

    assert_eq!(status.data(), Some(&payload));
    assert!(spawner.requests().is_empty());
    assert!(
        status
            .logs()
            .iter()
            .any(|l| l.contains("received no CaseReceivedFile instances"))
    );
}

#[test]
fn evidence_missing_hash_or_case_launches_nothing() {
    let store = seeded_store();
    add_file(&store, "aa", "/data/a.E01", at(1, 0));
    let spawner = Arc::new(RecordingSpawner::default());
    let processor = processor(config_with_script("/opt/run.sh"), store, None, spawner.clone());

    let mut no_case = evidence(2, Some("aa"));
    no_case.case_id = None;
    let payload = HookPayload::from(vec![evidence(1, None), no_case]);
    let status = processor.hooks_handler(&EVIDENCE_HOOK, None, payload.clone());

    assert_eq!(status.data(), Some(&payload));
    assert!(spawner.requests().is_empty());
    assert!(
        status
            .logs()
            .iter()
            .any(|l| l.contains("unable to resolve local path for evidence id=2, case_id=none"))
    );
}

#[test]
fn newest_stored_file_is_launched_with_output_directory() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let store = seeded_store();
    add_file(&store, "aa", "/data/first-upload.E01", at(1, 9));
    add_file(&store, "aa", "/data/re-upload.E01", at(3, 9));
    let spawner = Arc::new(RecordingSpawner::default());
    let config = ModuleConfig {
        e01_script_extra_args: "--profile full".to_string(),
        ..config_with_script("/opt/run.sh")
    };
    let processor = processor(config, store, Some(uploads.path()), spawner.clone());

    let status = processor.hooks_handler(
        &EVIDENCE_HOOK,
        None,
        HookPayload::from(vec![evidence(7, Some("aa"))]),
    );
    assert!(status.is_success());

    let expected_dir: PathBuf = uploads
        .path()
        .join("AcmeCorp")
        .join("Intrusion2024")
        .join("iris_e01_processor");
    assert!(expected_dir.is_dir());

    let requests = spawner.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.argv(),
        vec!["/opt/run.sh", "/data/re-upload.E01", "--profile", "full"]
    );
    assert_eq!(request.cwd.as_deref(), Some(expected_dir.as_path()));
    assert_eq!(request.env_value("IRIS_CASE_ID"), Some("1"));
    assert_eq!(request.env_value("IRIS_EVIDENCE_ID"), Some("7"));
    assert_eq!(request.env_value("IRIS_E01_PATH"), Some("/data/re-upload.E01"));
    assert_eq!(
        request.env_value("IRIS_E01_OUTPUT_DIR"),
        expected_dir.to_str()
    );
    assert_eq!(request.env_value("IRIS_MODULE_NAME"), Some("iris_e01_processor"));
}

#[test]
fn one_failing_item_does_not_stop_the_rest() {
    let store = seeded_store();
    add_file(&store, "aa", "/data/a.E01", at(1, 0));
    add_file(&store, "bb", "/data/b.E01", at(1, 0));
    add_file(&store, "cc", "/data/c.E01", at(1, 0));
    let spawner = Arc::new(RecordingSpawner::failing_for(&[2]));
    let processor = processor(config_with_script("/opt/run.sh"), store, None, spawner.clone());

    let payload = HookPayload::from(vec![
        evidence(1, Some("aa")),
        evidence(2, Some("bb")),
        evidence(3, Some("cc")),
        evidence(4, Some("unknown")),
    ]);
    let status = processor.hooks_handler(&EVIDENCE_HOOK, None, payload.clone());

    assert!(status.is_success());
    assert_eq!(status.data(), Some(&payload));
    let launched: Vec<String> = spawner
        .requests()
        .iter()
        .filter_map(|r| r.env_value("IRIS_EVIDENCE_ID").map(str::to_string))
        .collect();
    assert_eq!(launched, vec!["1", "2", "3"]);
    assert!(
        status
            .logs()
            .iter()
            .any(|l| l.contains("evidence id=2: failed to launch script '/opt/run.sh'"))
    );
    assert!(
        status
            .logs()
            .iter()
            .any(|l| l.contains("no DataStoreFile found for evidence id=4"))
    );
}

#[test]
fn unreadable_evidence_is_logged_and_siblings_still_launch() {
    let store = seeded_store();
    add_file(&store, "aa", "/data/a.E01", at(1, 0));
    let spawner = Arc::new(RecordingSpawner::default());
    let processor = processor(config_with_script("/opt/run.sh"), store, None, spawner.clone());

    let raw = json!([
        {
            "object_type": "case_received_file",
            "id": 7,
            "case_id": 1,
            "file_hash": "aa",
            "file_size": 1024,
        },
        {
            "object_type": "case_received_file",
            "id": "not-a-number",
            "case_id": 1,
        },
    ]);
    let payload: HookPayload = serde_json::from_value(raw.clone()).expect("parse");
    let status = processor.hooks_handler(&EVIDENCE_HOOK, None, payload);

    assert!(status.is_success());
    assert_eq!(serde_json::to_value(status.data()).expect("serialize"), raw);
    let launched: Vec<String> = spawner
        .requests()
        .iter()
        .filter_map(|r| r.env_value("IRIS_EVIDENCE_ID").map(str::to_string))
        .collect();
    assert_eq!(launched, vec!["7"]);
    assert!(
        status
            .logs()
            .iter()
            .any(|l| l.starts_with("[ERROR]")
                && l.contains("evidence id=\"not-a-number\": unreadable evidence record"))
    );
}

#[test]
fn missing_case_names_fall_back_to_upload_root() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let store = seeded_store();
    store.insert_case(2, Some(""), None).expect("case");
    store
        .insert_stored_file(2, "aa", std::path::Path::new("/data/a.E01"), &at(1, 0))
        .expect("file");
    let spawner = Arc::new(RecordingSpawner::default());
    let processor = processor(
        config_with_script("/opt/run.sh"),
        store,
        Some(uploads.path()),
        spawner.clone(),
    );

    let mut item = evidence(5, Some("aa"));
    item.case_id = Some(2);
    let status = processor.hooks_handler(&EVIDENCE_HOOK, None, HookPayload::from(vec![item]));

    assert!(status.is_success());
    let requests = spawner.requests();
    assert_eq!(requests[0].cwd.as_deref(), Some(uploads.path()));
    assert_eq!(requests[0].env_value("IRIS_E01_OUTPUT_DIR"), Some(""));
}

#[test]
fn configuration_is_read_on_every_call() {
    use iris_e01_processor::ConfigSource;
    use iris_e01_processor::E01Processor;
    use iris_e01_processor::HostSettings;
    use iris_e01_processor::config::TomlFileConfig;

    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("module.toml");
    std::fs::write(&config_path, "enabled = false\n").expect("write");
    let store = seeded_store();
    add_file(&store, "aa", "/data/a.E01", at(1, 0));
    let spawner = Arc::new(RecordingSpawner::default());
    let source: Arc<dyn ConfigSource> = Arc::new(TomlFileConfig::new(&config_path));
    let processor = E01Processor::new(source, Arc::new(store), HostSettings::default())
        .with_spawner(spawner.clone());

    let payload = HookPayload::from(vec![evidence(1, Some("aa"))]);
    processor.hooks_handler(&EVIDENCE_HOOK, None, payload.clone());
    assert!(spawner.requests().is_empty());

    std::fs::write(&config_path, "enabled = true\ne01_script_path = \"/opt/new.sh\"\n")
        .expect("write");
    processor.hooks_handler(&EVIDENCE_HOOK, None, payload);
    let requests = spawner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].program, PathBuf::from("/opt/new.sh"));
}
