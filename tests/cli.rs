mod common;

use std::fs;

use common::{OutputTable, TestWorkspace, bin, fixture_path};
use predicates::str::contains;

fn match_fixture(workspace: &TestWorkspace, extra: &[&str]) -> std::path::PathBuf {
    let stem = workspace.stem("han_results");
    let incoming = fixture_path("han_commanderies.csv");
    let target = fixture_path("chgis_v6_sample.csv");
    let config = fixture_path("han_match.yaml");
    let mut args = vec![
        "match",
        "-i",
        incoming.to_str().unwrap(),
        "-t",
        target.to_str().unwrap(),
        "-c",
        config.to_str().unwrap(),
        "-o",
        stem.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    bin().args(&args).assert().success();
    stem
}

#[test]
fn match_writes_annotated_table() {
    let workspace = TestWorkspace::new();
    let stem = match_fixture(&workspace, &[]);
    let output = OutputTable::read(&stem.with_extension("csv"));

    assert_eq!(output.headers[0], "tgaz_sys_id");
    assert!(!output.headers.iter().any(|h| h.starts_with("tgaz_prnt")));
    assert_eq!(
        &output.headers[output.headers.len() - 8..],
        [
            "match",
            "fuzzy_out_x_coord_match",
            "fuzzy_out_y_coord_match",
            "out_type_py_match",
            "out_beg_match",
            "out_end_match",
            "out_year_overlap",
            "out_content_match_strength",
        ]
    );
    // incoming order is preserved; the unmatched target record is dropped
    let ids = output
        .rows
        .iter()
        .map(|row| row["input_id"].as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["a1", "a2", "a3", "a4"]);
    assert!(output.find("tgaz_sys_id", "hvd_2").is_empty());

    let zhangye = output.find("input_id", "a1")[0];
    assert_eq!(zhangye["match"], "found");
    assert_eq!(zhangye["tgaz_sys_id"], "hvd_1");
    assert_eq!(zhangye["fuzzy_out_x_coord_match"], "False");
    assert_eq!(zhangye["fuzzy_out_y_coord_match"], "True");
    assert_eq!(zhangye["out_year_overlap"], "perfect_match");
    assert_eq!(zhangye["out_content_match_strength"], "4");

    let dunhuang = output.find("input_id", "a2")[0];
    assert_eq!(dunhuang["out_year_overlap"], "CAUTION__ZEROES");
    assert_eq!(dunhuang["out_end_match"], "False");

    let changan = output.find("input_id", "a3")[0];
    assert_eq!(changan["match"], "not_found");
    assert_eq!(changan["tgaz_sys_id"], "");
    assert_eq!(changan["out_year_overlap"], "");
    assert_eq!(changan["out_content_match_strength"], "0");

    let jiuquan = output.find("input_id", "a4")[0];
    assert_eq!(jiuquan["input_year_beg"], "unknown");
    assert_eq!(jiuquan["out_year_overlap"], "ERROR__NON_NUMERIC_YEAR_VALUE");
    assert_eq!(jiuquan["out_beg_match"], "False");
}

#[test]
fn match_writes_summary_report() {
    let workspace = TestWorkspace::new();
    let stem = match_fixture(&workspace, &["--summary-json"]);
    let info = fs::read_to_string(stem.with_extension("info.txt")).expect("read summary");
    assert!(info.starts_with("SUMMARY OF RESULTS\nGenerated at "));
    assert!(info.contains("Incoming file: han_commanderies.csv"));
    assert!(info.contains("Target rows:   4"));
    assert!(info.contains("Target rows with no incoming match (dropped): 1"));
    assert!(info.contains("CAUTION__ZEROES"));
    assert!(info.contains("Target field mapping (CHGIS v6 (Aug. 2016 draft) default mapping):"));
    assert!(info.contains("beg_yr"));
    assert!(info.contains("Decimal places: 1"));

    let json = fs::read_to_string(stem.with_extension("info.json")).expect("read json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("parse json");
    assert_eq!(value["output"]["rows"], 4);
    assert_eq!(value["incoming"]["sha256"].as_str().map(str::len), Some(64));
}

#[test]
fn fuzzy_names_join_on_prefix() {
    let workspace = TestWorkspace::new();
    let stem = match_fixture(&workspace, &["--name-mode", "fuzzy"]);
    let output = OutputTable::read(&stem.with_extension("csv"));
    assert_eq!(output.headers[0], "fuzzy_nm");
    let zhangye = output.find("fuzzy_nm", "張掖");
    let matched = zhangye
        .iter()
        .map(|row| row["tgaz_sys_id"].as_str())
        .collect::<Vec<_>>();
    assert_eq!(matched, vec!["hvd_1", "hvd_2"]);
}

#[test]
fn pinyin_fuzzy_request_falls_back_to_strict() {
    let workspace = TestWorkspace::new();
    let stem = match_fixture(&workspace, &["--name-key", "py", "--name-mode", "fuzzy"]);
    let output = OutputTable::read(&stem.with_extension("csv"));
    assert!(!output.headers.iter().any(|h| h == "fuzzy_nm"));
    assert_eq!(output.find("match", "found").len(), 3);
    let info = fs::read_to_string(stem.with_extension("info.txt")).expect("read summary");
    assert!(info.contains("Name match key: nm_py"));
    assert!(info.contains("Name match mode: strict"));
}

#[test]
fn unusable_decimal_places_default_to_integer_rounding() {
    let workspace = TestWorkspace::new();
    let stem = match_fixture(&workspace, &["--decimal-places", "one"]);
    let output = OutputTable::read(&stem.with_extension("csv"));
    let zhangye = output.find("input_id", "a1")[0];
    assert_eq!(zhangye["fuzzy_out_x_coord_match"], "True");
    let info = fs::read_to_string(stem.with_extension("info.txt")).expect("read summary");
    assert!(info.contains("Decimal places: 0 (defaulted)"));
}

#[test]
fn rejects_unsupported_input_extension() {
    let workspace = TestWorkspace::new();
    let incoming = workspace.write("places.txt", "name\n張掖\n");
    let target = fixture_path("chgis_v6_sample.csv");
    bin()
        .args([
            "match",
            "-i",
            incoming.to_str().unwrap(),
            "-t",
            target.to_str().unwrap(),
            "-o",
            workspace.stem("out").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("does not end in one of"));
}

#[test]
fn rejects_missing_input_file() {
    let workspace = TestWorkspace::new();
    let target = fixture_path("chgis_v6_sample.csv");
    bin()
        .args([
            "match",
            "-i",
            workspace.path().join("absent.csv").to_str().unwrap(),
            "-t",
            target.to_str().unwrap(),
            "-o",
            workspace.stem("out").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Not a valid filename"));
}

#[test]
fn configuration_errors_stop_before_output() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "bad.yaml",
        "incoming:\n  fields:\n    input_nm_trad: no_such_column\ntarget:\n  schema: auto\n",
    );
    let stem = workspace.stem("out");
    bin()
        .args([
            "match",
            "-i",
            fixture_path("han_commanderies.csv").to_str().unwrap(),
            "-t",
            fixture_path("chgis_v6_sample.csv").to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "-o",
            stem.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("no_such_column"));
    assert!(!stem.with_extension("csv").exists());
    assert!(!stem.with_extension("info.txt").exists());
}

#[test]
fn missing_name_field_is_fatal() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "names.yaml",
        "incoming:\n  fields:\n    input_id: id\ntarget:\n  schema: auto\n",
    );
    bin()
        .args([
            "match",
            "-i",
            fixture_path("han_commanderies.csv").to_str().unwrap(),
            "-t",
            fixture_path("chgis_v6_sample.csv").to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "-o",
            workspace.stem("out").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("name field"));
}

#[test]
fn init_writes_template_and_refuses_to_overwrite() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("match.yaml");
    bin()
        .args(["init", "-o", path.to_str().unwrap()])
        .assert()
        .success();
    let text = fs::read_to_string(&path).expect("read template");
    assert!(text.contains("input_nm_trad"));
    assert!(text.contains("tgaz_sys_id"));

    bin()
        .args(["init", "-o", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("--force"));
    bin()
        .args(["init", "-o", path.to_str().unwrap(), "--force"])
        .assert()
        .success();
}

#[test]
fn fields_lists_target_vocabulary_and_reference_schemas() {
    bin()
        .args(["fields", "--side", "target"])
        .assert()
        .success()
        .stdout(contains("tgaz_pres_loc"))
        .stdout(contains("CHGIS v5 (18 columns)"))
        .stdout(contains("type_simp"));
}
