//! Loader and cache tests against real parquet and Arrow IPC files.
//!
//! Parquet fixtures are written with `DuckDB` `COPY ... (FORMAT PARQUET)`,
//! IPC fixtures with `arrow_ipc::writer::FileWriter`.

use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int32Array, RecordBatch, StringArray,
};
use arrow_ipc::writer::FileWriter;
use arrow_schema::{DataType as ArrowType, Field, Schema};
use chrono::NaiveDate;
use duckdb::Connection;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tlf_core::{DataType, SchemaError, Value};
use tlf_data::{DataError, DatasetCache, DatasetLoader};

fn write_adsl_parquet(dir: &Path) {
    let path = dir.join("adsl.parquet");
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "COPY (
            SELECT * FROM (VALUES
                ('01-701-1015', 'Placebo', 63, 54.4, true, DATE '2014-01-02'),
                ('01-701-1023', 'Xanomeline High Dose', 64, 80.3, true, DATE '2012-08-05'),
                ('01-701-1028', 'Xanomeline Low Dose', 71, NULL, false, NULL)
            ) AS t(USUBJID, TRT01P, AGE, WEIGHTBL, SAFFL, TRTSDT)
        ) TO '{}' (FORMAT PARQUET)",
        path.display()
    ))
    .unwrap();
}

fn write_adae_ipc(dir: &Path, file: &str) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("USUBJID", ArrowType::Utf8, false),
        Field::new("AEDECOD", ArrowType::Utf8, true),
        Field::new("AESEQ", ArrowType::Int32, false),
        Field::new("DOSE", ArrowType::Float64, true),
        Field::new("SERIOUS", ArrowType::Boolean, true),
        Field::new("ASTDT", ArrowType::Date32, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["01-701-1015", "01-701-1015"])),
        Arc::new(StringArray::from(vec![Some("HEADACHE"), None])),
        Arc::new(Int32Array::from(vec![1, 2])),
        Arc::new(Float64Array::from(vec![Some(54.0), None])),
        Arc::new(BooleanArray::from(vec![Some(false), Some(true)])),
        Arc::new(Date32Array::from(vec![Some(16_072), None])),
    ];
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns).unwrap();

    let out = std::fs::File::create(dir.join(file)).unwrap();
    let mut writer = FileWriter::try_new(out, &schema).unwrap();
    writer.write(&batch).unwrap();
    writer.finish().unwrap();
}

#[test]
fn loads_parquet_with_typed_columns() {
    let dir = TempDir::new().unwrap();
    write_adsl_parquet(dir.path());

    let adsl = DatasetLoader::new(dir.path()).load("adsl").unwrap();

    assert_eq!(adsl.name(), "adsl");
    assert_eq!(adsl.id().sha256.len(), 64);
    assert_eq!(adsl.row_count(), 3);
    assert_eq!(
        adsl.column_names(),
        vec!["USUBJID", "TRT01P", "AGE", "WEIGHTBL", "SAFFL", "TRTSDT"]
    );

    let dtypes: Vec<DataType> = adsl.columns().iter().map(|c| c.dtype()).collect();
    assert_eq!(
        dtypes,
        vec![
            DataType::Str,
            DataType::Str,
            DataType::Int,
            DataType::Float,
            DataType::Bool,
            DataType::Date
        ]
    );

    let age = adsl.column("AGE").unwrap();
    assert_eq!(age.values(), &[Value::Int(63), Value::Int(64), Value::Int(71)]);
    assert_eq!(adsl.column("WEIGHTBL").unwrap().get(2), &Value::Null);
    assert_eq!(
        adsl.column("TRTSDT").unwrap().get(0),
        &Value::Date(NaiveDate::from_ymd_opt(2014, 1, 2).unwrap())
    );
    assert_eq!(adsl.column("USUBJID").unwrap().get(1), &Value::from("01-701-1023"));
}

#[test]
fn repeated_loads_are_identical() {
    let dir = TempDir::new().unwrap();
    write_adsl_parquet(dir.path());
    let loader = DatasetLoader::new(dir.path());

    let first = loader.load("adsl").unwrap();
    let second = loader.load("adsl").unwrap();
    assert_eq!(first, second);
}

#[test]
fn loads_arrow_ipc_when_no_parquet() {
    let dir = TempDir::new().unwrap();
    write_adae_ipc(dir.path(), "adae.arrow");

    let adae = DatasetLoader::new(dir.path()).load("adae").unwrap();

    assert_eq!(adae.row_count(), 2);
    assert_eq!(adae.column("AESEQ").unwrap().dtype(), DataType::Int);
    assert_eq!(adae.column("AEDECOD").unwrap().get(1), &Value::Null);
    assert_eq!(adae.column("DOSE").unwrap().get(0), &Value::Float(54.0));
    assert_eq!(adae.column("SERIOUS").unwrap().get(1), &Value::Bool(true));
    assert_eq!(
        adae.column("ASTDT").unwrap().get(0),
        &Value::Date(NaiveDate::from_ymd_opt(2014, 1, 2).unwrap())
    );
}

#[test]
fn parquet_wins_over_ipc() {
    let dir = TempDir::new().unwrap();
    write_adsl_parquet(dir.path());
    write_adae_ipc(dir.path(), "adsl.ipc");

    let adsl = DatasetLoader::new(dir.path()).load("adsl").unwrap();
    assert!(adsl.has_column("TRT01P"));
}

#[test]
fn missing_dataset_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = DatasetLoader::new(dir.path()).load("adlb").unwrap_err();
    assert!(matches!(err, DataError::NotFound { ref name, .. } if name == "adlb"));
}

#[test]
fn nested_parquet_column_is_a_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested.parquet");
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "COPY (SELECT 1 AS ID, [1, 2] AS VISITS) TO '{}' (FORMAT PARQUET)",
        path.display()
    ))
    .unwrap();

    let err = DatasetLoader::new(dir.path()).load("nested").unwrap_err();
    assert!(matches!(
        err,
        DataError::Schema(SchemaError::UnsupportedType { ref column, .. }) if column == "VISITS"
    ));
}

#[test]
fn cache_loads_once_and_does_not_cache_failures() {
    let dir = TempDir::new().unwrap();
    let cache = DatasetCache::new(DatasetLoader::new(dir.path()));

    assert!(cache.get("adsl").is_err());
    assert!(cache.loaded().is_empty());

    write_adsl_parquet(dir.path());
    let first = cache.get("adsl").unwrap();
    let second = cache.get("adsl").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let loaded = cache.loaded();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "adsl");
}
