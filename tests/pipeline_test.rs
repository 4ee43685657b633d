use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use sales_ingest::app::{BatchLoader, Destination};
use sales_ingest::config::{DestinationConfig, IngestSettings};
use sales_ingest::infra::SqliteDestination;
use sales_ingest::pipeline::ingestion::read_source;
use sales_ingest::pipeline::processing::clean_sales_data;
use sales_ingest::types::SalesRecord;
use sales_ingest::{IngestError, Pipeline};

const HEADER: &str = "ORDERNUMBER,QUANTITYORDERED,PRICEEACH,ORDERLINENUMBER,SALES,ORDERDATE,STATUS,PRODUCTLINE,PRODUCTCODE,CUSTOMERNAME,CITY,COUNTRY,DEALSIZE";

/// Ten rows: six clean, two with bad dates, one duplicate key, one negative quantity
const ROWS: [&str; 10] = [
    "10107,30,95.70,2,2871.00,2/24/2003 0:00,Shipped,Motorcycles,S10_1678,Land of Toys Inc.,NYC,USA,Small",
    "10121,34,81.35,5,2765.90,5/7/2003 0:00,Shipped,Motorcycles,S10_1678,Reims Collectables,Reims,France,Small",
    "10134,41,94.74,2,3884.34,7/1/2003 0:00,Shipped,Motorcycles,S10_1678,Lyon Souveniers,Paris,France,Medium",
    "10145,45,83.26,6,3746.70,8/25/2003 0:00,Shipped,Motorcycles,S10_1678,Toys4GrownUps.com,Pasadena,USA,Medium",
    "10159,49,100.00,14,5205.27,10/10/2003 0:00,Shipped,Classic Cars,S10_1949,Corporate Gift Ideas Co.,San Francisco,,Medium",
    "10168,36,96.66,1,3479.76,10/28/2003 0:00,Shipped,Classic Cars,S10_1949,Technics Stores Inc.,Burlingame,USA,",
    "10180,29,86.13,9,2497.77,not-a-date,Shipped,Motorcycles,S10_1678,Daedalus Designs Imports,Lille,France,Small",
    "10188,48,100.00,1,5512.32,,Shipped,Motorcycles,S10_1678,Herkku Gifts,Bergen,Norway,Medium",
    "10107,30,99.97,2,2999.00,2/24/2003 0:00,Shipped,Motorcycles,S10_1678,Duplicate Buyer,NYC,USA,Small",
    "10201,-5,100.00,2,0.00,12/1/2003 0:00,Shipped,Motorcycles,S10_1678,Mini Wheels Co.,San Francisco,USA,Small",
];

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) -> PathBuf {
    let mut body = String::from(header);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn settings_for(source: PathBuf, report_dir: Option<PathBuf>) -> IngestSettings {
    IngestSettings {
        source_path: source,
        batch_size: 4,
        report_dir,
    }
}

fn sample_record(order_number: i64, order_line_number: i64, quantity: i64) -> SalesRecord {
    SalesRecord {
        order_number,
        order_line_number,
        order_date: NaiveDate::from_ymd_opt(2003, 2, 24).unwrap(),
        status: "Shipped".into(),
        product_code: "S10_1678".into(),
        product_line: "Motorcycles".into(),
        customer_name: "Land of Toys Inc.".into(),
        country: "USA".into(),
        quantity,
        unit_price: Decimal::new(9570, 2),
        total_amount: Decimal::new(287100, 2),
        deal_size: "Small".into(),
    }
}

#[test]
fn cleaning_drops_bad_rows_and_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "sales.csv", HEADER, &ROWS);

    let source = read_source(&csv).unwrap();
    let cleaned = clean_sales_data(&source.headers, &source.rows).unwrap();

    assert_eq!(source.row_count(), 10);
    assert_eq!(cleaned.report.invalid_dates, 2);
    assert_eq!(cleaned.report.duplicates, 1);
    assert_eq!(cleaned.report.out_of_range, 1);
    assert_eq!(cleaned.report.final_rows, 6);
    assert_eq!(cleaned.records.len(), 6);

    // The first occurrence of a duplicated key wins
    let first = &cleaned.records[0];
    assert_eq!(first.key(), (10107, 2));
    assert_eq!(first.customer_name, "Land of Toys Inc.");
    assert_eq!(first.total_amount, Decimal::new(287100, 2));

    let gift = cleaned.records.iter().find(|r| r.order_number == 10159).unwrap();
    assert_eq!(gift.country, "Unknown");
    let technics = cleaned.records.iter().find(|r| r.order_number == 10168).unwrap();
    assert_eq!(technics.deal_size, "Unknown");
}

#[test]
fn missing_price_is_a_critical_null() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        dir.path(),
        "sales.csv",
        HEADER,
        &[
            "10107,30,,2,2871.00,2/24/2003 0:00,Shipped,Motorcycles,S10_1678,Land of Toys Inc.,NYC,USA,Small",
            "10121,34,81.35,5,2765.90,5/7/2003 0:00,Shipped,Motorcycles,S10_1678,Reims Collectables,Reims,France,Small",
        ],
    );

    let source = read_source(&csv).unwrap();
    let cleaned = clean_sales_data(&source.headers, &source.rows).unwrap();

    assert_eq!(cleaned.report.critical_nulls, 1);
    assert_eq!(cleaned.records.len(), 1);
}

#[test]
fn header_only_file_cleans_to_nothing() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "empty.csv", HEADER, &[]);

    let source = read_source(&csv).unwrap();
    let cleaned = clean_sales_data(&source.headers, &source.rows).unwrap();

    assert_eq!(cleaned.report.initial_rows, 0);
    assert_eq!(cleaned.report.removed_pct(), 0.0);
    assert!(cleaned.records.is_empty());
}

#[test]
fn absent_required_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        dir.path(),
        "sales.csv",
        "ORDERNUMBER,ORDERLINENUMBER,ORDERDATE",
        &["10107,2,2/24/2003 0:00"],
    );

    let source = read_source(&csv).unwrap();
    let result = clean_sales_data(&source.headers, &source.rows);

    match result {
        Err(IngestError::MissingColumns(columns)) => {
            assert!(columns.contains(&"SALES".to_string()));
            assert!(!columns.contains(&"ORDERNUMBER".to_string()));
        }
        other => panic!("expected missing columns, got {other:?}"),
    }
}

#[tokio::test]
async fn reloading_the_same_records_inserts_nothing() {
    let dir = TempDir::new().unwrap();
    let mut db = SqliteDestination::open(dir.path().join("sales.db")).unwrap();
    let records: Vec<SalesRecord> = (1..=7).map(|n| sample_record(10100, n, 10)).collect();
    let loader = BatchLoader::new(3).unwrap();

    let first = loader.load(&records, &mut db).await.unwrap();
    let second = loader.load(&records, &mut db).await.unwrap();

    assert_eq!(first.inserted, 7);
    assert_eq!(first.batches, 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.total_rows, 7);
}

#[tokio::test]
async fn constraint_violation_rolls_back_the_whole_load() {
    let dir = TempDir::new().unwrap();
    let mut db = SqliteDestination::open(dir.path().join("sales.db")).unwrap();
    let records = vec![
        sample_record(10100, 1, 10),
        sample_record(10100, 2, 10),
        sample_record(10100, 3, 0),
    ];

    let result = BatchLoader::new(2).unwrap().load(&records, &mut db).await;

    match result {
        Err(IngestError::Write { message }) => assert!(message.starts_with("batch 2 of 2")),
        other => panic!("expected write error, got {other:?}"),
    }
    assert_eq!(db.count_rows().await.unwrap(), 0);
}

#[tokio::test]
async fn pipeline_run_is_idempotent_end_to_end() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "sales.csv", HEADER, &ROWS);
    let db_path = dir.path().join("db").join("sales.db");
    let reports = dir.path().join("reports");
    let destination = DestinationConfig::Sqlite(db_path.clone());

    let first = Pipeline::new(settings_for(csv.clone(), Some(reports.clone())), destination.clone())
        .run()
        .await
        .unwrap();
    let second = Pipeline::new(settings_for(csv, None), destination)
        .run()
        .await
        .unwrap();

    assert_eq!(first.load.inserted, 6);
    assert_eq!(first.load.batches, 2);
    assert_eq!(second.load.inserted, 0);
    assert_eq!(second.load.total_rows, 6);

    let stats = second.stats;
    assert_eq!(stats.total_records, 6);
    assert_eq!(stats.earliest_date, NaiveDate::from_ymd_opt(2003, 2, 24));
    assert_eq!(stats.latest_date, NaiveDate::from_ymd_opt(2003, 10, 28));
    assert_eq!(stats.total_sales, Some(Decimal::new(2195297, 2)));
    assert_eq!(stats.unique_customers, 6);
    assert_eq!(stats.product_lines, 2);

    let report_path = first.report_path.unwrap();
    assert!(report_path.starts_with(&reports));
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["load"]["inserted"], 6);
    assert_eq!(report["cleaning"]["invalid_dates"], 2);
    assert!(second.report_path.is_none());
}

#[tokio::test]
async fn missing_source_halts_before_connecting() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sales.db");

    let result = Pipeline::new(
        settings_for(dir.path().join("nope.csv"), None),
        DestinationConfig::Sqlite(db_path.clone()),
    )
    .run()
    .await;

    assert!(matches!(result, Err(IngestError::SourceNotFound(_))));
    assert!(!db_path.exists());
}
