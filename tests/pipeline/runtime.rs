//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Qi.
//! The Qi project belongs to the Dunimd Team.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use qix::{
    read_relation, QiBlockStatus, QiError, QiExecutor, QiExecutorConfigBuilder, QiExtractionCause, QiPipeline,
    QiStageDetail, QiValue,
};
use serde_json::json;
use tempfile::{tempdir, TempDir};

const TREES: &str = "\
id;species;planted;height;district;protected
DE-001;Oak;1925;21,5;Mitte;true
DE-002;Beech;1980;14;Pankow;false
FR-003;Oak;1925;19;Mitte;false
DE-004;Lime;1925;11,25;Spandau;true
DE-005;Maple;2001;8;Mitte;false
AT-006;Oak;1950;17;Pankow;false
DE-007;Oak;1925;23;Mitte;true
DE-008;Birch;1999;9,5;Spandau;false
DE-009;Lime;1925;12;Pankow;false
DE-010;Oak;1930;16;Mitte;true
";

fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn store(dir: &TempDir) -> String {
    dir.path().join("out").join("store.sqlite").to_string_lossy().into_owned()
}

fn tree_columns(id_type: &str, planted_type: &str) -> serde_json::Value {
    json!([
        {"id": id_type},
        {"species": "text"},
        {"planted": planted_type},
        {"height": "decimal"},
        {"district": "text"},
        {"protected": "boolean"}
    ])
}

fn serial() -> QiExecutor {
    QiExecutor::new(QiExecutorConfigBuilder {
        parallel: Some(false),
        ..Default::default()
    }
    .build())
}

#[test]
fn test_delimited_source_loads_only_conforming_rows() {
    let dir = tempdir().unwrap();
    let source = write_file(&dir, "trees.csv", TREES.as_bytes());
    let file = store(&dir);

    let pipeline = QiPipeline::new("Trees")
        .constraint("GermanId", "regex", json!({"pattern": "^DE"}))
        .value_type("TreeId", "text", &["GermanId"])
        .block("Fetch", "Extraction", json!({"source": source}))
        .block("Decode", "TextDecoder", json!({"encoding": "utf-8"}))
        .block("Parse", "DelimitedInterpreter", json!({"delimiter": ";"}))
        .block("Type", "TableInterpreter", json!({"columns": tree_columns("TreeId", "integer")}))
        .block("Load", "RelationalLoader", json!({"table": "trees", "file": file}))
        .pipe(&["Fetch", "Decode", "Parse", "Type", "Load"]);

    let report = QiExecutor::default().run_pipeline(&pipeline).unwrap();

    assert!(report.is_success(), "{:?}", report.failures());
    assert_eq!(report.dropped("Type"), Some(2));
    assert_eq!(report.loaded("Load"), Some(8));
    let names: Vec<&str> = report.blocks().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Fetch", "Decode", "Parse", "Type", "Load"]);

    let rows = read_relation(Path::new(&file), "trees").unwrap();
    assert_eq!(rows.len(), 8);
    assert_eq!(
        rows[0],
        vec![
            QiValue::Text("DE-001".into()),
            QiValue::Text("Oak".into()),
            QiValue::Integer(1925),
            QiValue::Decimal(21.5),
            QiValue::Text("Mitte".into()),
            QiValue::Boolean(true),
        ]
    );
    assert!(rows
        .iter()
        .all(|row| row[0].as_str().map_or(false, |id| id.starts_with("DE"))));
}

#[test]
fn test_shared_value_type_filters_two_branches() {
    let dir = tempdir().unwrap();
    let source = write_file(&dir, "trees.csv", TREES.as_bytes());
    let file = store(&dir);

    let pipeline = QiPipeline::new("Jubilee")
        .constraint("Year1925", "equals", json!({"value": 1925}))
        .value_type("JubileeYear", "integer", &["Year1925"])
        .block("Fetch", "Extraction", json!({"source": source}))
        .block("Decode", "TextDecoder", json!({}))
        .block("Parse", "DelimitedInterpreter", json!({"delimiter": ";"}))
        .block("Oaks", "TableInterpreter", json!({"columns": tree_columns("text", "JubileeYear")}))
        .block("Heights", "TableInterpreter", json!({"columns": [{"id": "text"}, {"planted": "JubileeYear"}]}))
        .block("LoadOaks", "RelationalLoader", json!({"table": "jubilee", "file": file}))
        .block("LoadHeights", "RelationalLoader", json!({"table": "jubilee_ids", "file": file}))
        .pipe(&["Fetch", "Decode", "Parse", "Oaks", "LoadOaks"])
        .pipe(&["Parse", "Heights", "LoadHeights"]);

    let report = serial().run_pipeline(&pipeline).unwrap();

    assert!(report.is_success(), "{:?}", report.failures());
    assert_eq!(report.dropped("Oaks"), Some(5));
    assert_eq!(report.dropped("Heights"), Some(5));
    assert_eq!(report.loaded("LoadOaks"), Some(5));

    let ids = read_relation(Path::new(&file), "jubilee_ids").unwrap();
    assert_eq!(ids.len(), 5);
    assert!(ids.iter().all(|row| row[1] == QiValue::Integer(1925)));
}

#[test]
fn test_failed_source_skips_its_branch_only() {
    let dir = tempdir().unwrap();
    let present = write_file(&dir, "trees.csv", TREES.as_bytes());
    let missing = dir.path().join("absent.csv").to_string_lossy().into_owned();
    let file = store(&dir);

    let pipeline = QiPipeline::new("Mixed")
        .block("FetchBroken", "Extraction", json!({"source": missing}))
        .block("DecodeBroken", "TextDecoder", json!({}))
        .block("ParseBroken", "DelimitedInterpreter", json!({}))
        .block("FetchTrees", "Extraction", json!({"source": present}))
        .block("DecodeTrees", "TextDecoder", json!({}))
        .block("ParseTrees", "DelimitedInterpreter", json!({"delimiter": ";"}))
        .block("TypeTrees", "TableInterpreter", json!({"columns": [{"id": "text"}]}))
        .block("LoadTrees", "RelationalLoader", json!({"table": "trees", "file": file}))
        .pipe(&["FetchBroken", "DecodeBroken", "ParseBroken"])
        .pipe(&["FetchTrees", "DecodeTrees", "ParseTrees", "TypeTrees", "LoadTrees"]);

    let report = QiExecutor::default().run_pipeline(&pipeline).unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.status("FetchBroken"),
        Some(QiBlockStatus::Failed(QiError::Extraction { cause: QiExtractionCause::NotFound, .. }))
    ));
    assert_eq!(
        report.status("DecodeBroken"),
        Some(&QiBlockStatus::Skipped {
            upstream: "FetchBroken".into()
        })
    );
    assert_eq!(
        report.status("ParseBroken"),
        Some(&QiBlockStatus::Skipped {
            upstream: "FetchBroken".into()
        })
    );
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.status("LoadTrees"), Some(&QiBlockStatus::Succeeded));
    assert_eq!(read_relation(Path::new(&file), "trees").unwrap().len(), 10);
}

#[test]
fn test_zip_member_feeds_table_chain() {
    let dir = tempdir().unwrap();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("export/trees.csv", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(TREES.as_bytes()).unwrap();
    writer
        .start_file("export/notes.txt", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(b"not a table").unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    let source = write_file(&dir, "export.zip", &bytes);
    let file = store(&dir);

    let pipeline = QiPipeline::new("Zipped")
        .block("Fetch", "Extraction", json!({"source": format!("file://{}", source)}))
        .block("Unzip", "ArchiveInterpreter", json!({"archive": "zip"}))
        .block("Pick", "FilePicker", json!({"path": "/export/trees.csv"}))
        .block("Decode", "TextDecoder", json!({}))
        .block("Parse", "DelimitedInterpreter", json!({"delimiter": ";"}))
        .block("Select", "CellRangeSelector", json!({"select": "A1:B*"}))
        .block("Rename", "CellWriter", json!({"at": "A1:B1", "write": ["tree", "kind"]}))
        .block("Trim", "RowDeleter", json!({"delete": [2]}))
        .block("Type", "TableInterpreter", json!({"columns": [{"tree": "text"}, {"kind": "text"}]}))
        .block("Load", "RelationalLoader", json!({"table": "kinds", "file": file, "if_exists": "replace"}))
        .pipe(&["Fetch", "Unzip", "Pick", "Decode", "Parse", "Select", "Rename", "Trim", "Type", "Load"]);

    let report = QiExecutor::default().run_pipeline(&pipeline).unwrap();

    assert!(report.is_success(), "{:?}", report.failures());
    let rows = read_relation(Path::new(&file), "kinds").unwrap();
    assert_eq!(rows.len(), 9);
    assert_eq!(rows[0], vec![QiValue::Text("DE-002".into()), QiValue::Text("Beech".into())]);
}

#[test]
fn test_fan_out_gives_every_consumer_the_same_table() {
    let dir = tempdir().unwrap();
    let source = write_file(&dir, "trees.csv", TREES.as_bytes());
    let file = store(&dir);

    let mut pipeline = QiPipeline::new("FanOut")
        .block("Fetch", "Extraction", json!({"source": source}))
        .block("Decode", "TextDecoder", json!({}))
        .block("Parse", "DelimitedInterpreter", json!({"delimiter": ";"}))
        .pipe(&["Fetch", "Decode", "Parse"]);
    for branch in ["a", "b", "c"] {
        let typed = format!("Type_{}", branch);
        let load = format!("Load_{}", branch);
        pipeline = pipeline
            .block(&typed, "TableInterpreter", json!({"columns": [{"id": "text"}]}))
            .block(&load, "RelationalLoader", json!({"table": branch, "file": file}))
            .pipe(&["Parse", typed.as_str(), load.as_str()]);
    }

    let report = QiExecutor::default().run_pipeline(&pipeline).unwrap();

    assert!(report.is_success(), "{:?}", report.failures());
    for branch in ["a", "b", "c"] {
        assert_eq!(report.loaded(&format!("Load_{}", branch)), Some(10));
        assert_eq!(read_relation(Path::new(&file), branch).unwrap().len(), 10);
    }
}

#[test]
fn test_block_without_input_is_reported_unreachable() {
    let dir = tempdir().unwrap();
    let source = write_file(&dir, "trees.csv", TREES.as_bytes());

    let pipeline = QiPipeline::new("Orphan")
        .block("Fetch", "Extraction", json!({"source": source}))
        .block("Decode", "TextDecoder", json!({}))
        .block("Orphan", "DelimitedInterpreter", json!({}))
        .block("Drop", "RowDeleter", json!({"delete": [1]}))
        .pipe(&["Fetch", "Decode"])
        .edge("Orphan", "Drop");

    let report = QiExecutor::default().run_pipeline(&pipeline).unwrap();

    assert_eq!(report.status("Decode"), Some(&QiBlockStatus::Succeeded));
    assert_eq!(report.status("Orphan"), Some(&QiBlockStatus::Unreachable));
    assert_eq!(report.status("Drop"), Some(&QiBlockStatus::Unreachable));
    assert!(report.failures().is_empty());
}

#[test]
fn test_compile_error_touches_no_source() {
    let dir = tempdir().unwrap();
    let file = store(&dir);

    let pipeline = QiPipeline::new("Broken")
        .block("Fetch", "Extraction", json!({"source": "https://invalid.example/trees.csv"}))
        .block("Decode", "TextDecoder", json!({}))
        .block("Parse", "DelimitedInterpreter", json!({}))
        .block("Type", "TableInterpreter", json!({"columns": [{"id": "Undeclared"}]}))
        .block("Load", "RelationalLoader", json!({"table": "trees", "file": file}))
        .pipe(&["Fetch", "Decode", "Parse", "Type", "Load"]);

    let err = QiExecutor::default().run_pipeline(&pipeline).unwrap_err();
    assert_eq!(
        err,
        QiError::UnknownType {
            name: "Undeclared".into()
        }
    );
    assert!(!Path::new(&file).exists());
}

#[test]
fn test_yaml_pipeline_and_report_serialise() {
    let dir = tempdir().unwrap();
    let source = write_file(&dir, "trees.csv", TREES.as_bytes());
    let file = store(&dir);
    let yaml = format!(
        r#"
name: Yaml
constraints:
  - name: Recent
    kind: range
    lower: 1990
value_types:
  - name: RecentYear
    base: integer
    constraints: [Recent]
blocks:
  - name: Fetch
    kind: Extraction
    params: {{ source: "{source}" }}
  - name: Decode
    kind: TextDecoder
  - name: Parse
    kind: DelimitedInterpreter
    params: {{ delimiter: ";" }}
  - name: Cut
    kind: ColumnDeleter
    params: {{ delete: [B], names: [district] }}
  - name: Type
    kind: TableInterpreter
    params:
      columns:
        - {{ name: id, type: text }}
        - {{ name: planted, type: RecentYear }}
  - name: Load
    kind: RelationalLoader
    params: {{ table: recent, file: "{file}" }}
edges:
  - {{ from: Fetch, to: Decode }}
  - {{ from: Decode, to: Parse }}
  - {{ from: Parse, to: Cut }}
  - {{ from: Cut, to: Type }}
  - {{ from: Type, to: Load }}
"#
    );
    let pipeline = QiPipeline::from_yaml(&yaml).unwrap();
    let report = serial().run_pipeline(&pipeline).unwrap();

    assert!(report.is_success(), "{:?}", report.failures());
    assert_eq!(report.loaded("Load"), Some(2));
    match &report.block("Type").unwrap().detail {
        QiStageDetail::Interpreted {
            input_rows,
            retained,
            dropped,
            dropped_rows,
        } => {
            assert_eq!((*input_rows, *retained, *dropped), (10, 2, 8));
            assert_eq!(dropped_rows.len(), 8);
            assert_eq!(dropped_rows[0].row, 1);
            assert_eq!(dropped_rows[0].column, "planted");
        }
        other => panic!("unexpected detail {:?}", other),
    }

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["pipeline"], "Yaml");
    assert_eq!(json["blocks"][0]["status"], "Succeeded");
    assert_eq!(json["blocks"][5]["detail"]["kind"], "loaded");
    assert_eq!(json["blocks"][5]["detail"]["rows"], 2);
}
