use anyhow::Result;
use chrono::NaiveDateTime;
use metgrid_core::outputs::{
    file_identifier, write_tables, LabelledTable, OutputLabel, StagedOutput,
};
use metgrid_core::{ObservationRow, ObservationTable, OutputFormat, TablePurpose};
use metgrid_parser::{ChannelKind, ChannelValue, ColumnSpec, SeriesBounds};

fn ts(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").expect("valid timestamp")
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("metgrid-outputs-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn small_table() -> ObservationTable {
    ObservationTable {
        purpose: TablePurpose::Pth,
        columns: vec![
            ColumnSpec::new("pressure_hpa", ChannelKind::Numeric),
            ColumnSpec::new("note", ChannelKind::Text),
        ],
        keyed_by_height: false,
        rows: vec![
            ObservationRow {
                timestamp: ts("2021-09-14 00:00:00"),
                height: None,
                values: vec![ChannelValue::Number(1013.5), ChannelValue::Text("ok".into())],
            },
            ObservationRow {
                timestamp: ts("2021-09-14 00:10:00"),
                height: None,
                values: vec![ChannelValue::Missing, ChannelValue::Missing],
            },
        ],
    }
}

#[test]
fn profiler_identifiers_drop_the_century() {
    assert_eq!(file_identifier("WLS7-436_2021_09_14__00_00_00.sta"), "210914");
    assert_eq!(
        file_identifier("/data/lidar/WLS7-436_2021_09_15__00_00_00.sta"),
        "210915"
    );
    assert_eq!(file_identifier("scan_dump.sta"), "scan_dump");
    assert_eq!(file_identifier("WLS7_20x1_09_14.sta"), "WLS7_20x1_09_14");
}

#[test]
fn labels_join_first_and_last_with_the_purpose() {
    let label = OutputLabel::from_file_names(&[
        "WLS7-436_2021_09_14__00_00_00.sta",
        "WLS7-436_2021_09_15__00_00_00.sta",
    ])
    .expect("label");
    assert_eq!(label.for_table(TablePurpose::Pth), "210914_to_210915_lidar_pth");
    assert_eq!(
        label.for_table(TablePurpose::Profile),
        "210914_to_210915_lidar_profile"
    );
    assert_eq!(label.manifest_name(), "210914_to_210915_manifest.json");

    let tower = OutputLabel::from_bounds(SeriesBounds {
        start: ts("2022-03-21 00:05:00"),
        end: ts("2022-03-22 23:59:59.950"),
    });
    assert_eq!(
        tower.for_table(TablePurpose::Tower1Hz),
        "22_03_21_to_22_03_22_tower_1hz"
    );
    assert_eq!(
        tower.for_table(TablePurpose::Sonic3d20Hz),
        "22_03_21_to_22_03_22_ane_sonic_3d_20hz"
    );

    let empty: [&str; 0] = [];
    assert!(OutputLabel::from_file_names(&empty).is_none());
}

#[test]
fn csv_output_writes_missing_cells_as_the_marker() -> Result<()> {
    let dir = scratch_dir("csv");
    let tables = vec![LabelledTable {
        label: "210914_to_210914_lidar_pth".into(),
        table: small_table(),
    }];

    let mut staged = StagedOutput::default();
    let written = write_tables(&tables, &dir, OutputFormat::Csv, "NaN", &mut staged)?;
    assert!(!written[0].path.exists());
    staged.commit()?;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].rows, 2);
    assert_eq!(written[0].first_timestamp, Some(ts("2021-09-14 00:00:00")));
    assert!(written[0].path.ends_with("210914_to_210914_lidar_pth.csv"));

    let contents = std::fs::read_to_string(&written[0].path)?;
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines[0], "datetime,pressure_hpa,note");
    assert!(lines[1].starts_with("2021-09-14 00:00:00,1013.5,ok"));
    assert_eq!(lines[2], "2021-09-14 00:10:00,NaN,NaN");

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn parquet_output_round_trips_row_count() -> Result<()> {
    let dir = scratch_dir("parquet");
    let tables = vec![LabelledTable {
        label: "sample".into(),
        table: small_table(),
    }];

    let mut staged = StagedOutput::default();
    let written = write_tables(&tables, &dir, OutputFormat::Parquet, "NaN", &mut staged)?;
    staged.commit()?;
    assert!(written[0].path.ends_with("sample.parquet"));
    assert!(std::fs::metadata(&written[0].path)?.len() > 0);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn failed_write_leaves_no_table_behind() -> Result<()> {
    let dir = scratch_dir("rollback");
    let tables = vec![
        LabelledTable {
            label: "first".into(),
            table: small_table(),
        },
        LabelledTable {
            label: "missing_subdir/second".into(),
            table: small_table(),
        },
    ];

    let mut staged = StagedOutput::default();
    let result = write_tables(&tables, &dir, OutputFormat::Csv, "NaN", &mut staged);
    assert!(result.is_err());
    assert!(!dir.join("first.csv").exists());
    drop(staged);

    assert_eq!(std::fs::read_dir(&dir)?.count(), 0);
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
