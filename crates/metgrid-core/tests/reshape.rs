use anyhow::Result;
use chrono::NaiveDateTime;
use metgrid_core::grid::{nominal_period, reindex, GriddedSeries};
use metgrid_core::ingestion::{ingest_files, FileInput};
use metgrid_core::reshape::{height_profile_table, pth_table, ProfilerReshape, Reshape};
use metgrid_core::TablePurpose;
use metgrid_parser::{ChannelValue, HeightLevel, InstrumentKind, InstrumentParser, ProfilerParser};

fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../metgrid-parser/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn ts(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

fn gridded_profiler(names: &[&str]) -> Result<GriddedSeries> {
    let contents: Vec<Vec<u8>> = names.iter().map(|name| fixture_bytes(name)).collect();
    let inputs: Vec<FileInput<'_>> = names
        .iter()
        .zip(contents.iter())
        .map(|(name, bytes)| FileInput {
            path: name,
            contents: bytes,
        })
        .collect();
    let batch = ingest_files(&inputs);
    let series = ProfilerParser::default().parse(&batch.records)?;
    let (gridded, _) = reindex(series, nominal_period(InstrumentKind::Profiler))?;
    Ok(gridded)
}

const DAY_ONE: &str = "WLS7-436_2021_09_14__00_00_00.sta";
const DAY_TWO: &str = "WLS7-436_2021_09_15__00_00_00.sta";

#[test]
fn pth_table_keeps_the_missing_scan_as_an_all_missing_row() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE])?;
    let table = pth_table(&gridded);

    assert_eq!(table.purpose, TablePurpose::Pth);
    assert_eq!(table.len(), 4);
    assert_eq!(table.columns.len(), 6);
    assert_eq!(table.columns[0].name, "internal_temperature_c");
    assert!(!table.keyed_by_height);

    let timestamps: Vec<_> = table.rows.iter().map(|row| row.timestamp).collect();
    assert_eq!(
        timestamps,
        vec![
            ts("2021-09-14 00:00:00"),
            ts("2021-09-14 00:10:00"),
            ts("2021-09-14 00:20:00"),
            ts("2021-09-14 00:30:00"),
        ]
    );
    assert!(table.rows[1].is_all_missing());
    assert_eq!(table.rows[0].values[0], ChannelValue::Number(20.0));
    assert_eq!(table.rows[2].values[0], ChannelValue::Number(21.0));
    assert_eq!(table.rows[3].values[2], ChannelValue::Number(1013.2));
    Ok(())
}

#[test]
fn profile_table_has_one_row_per_slot_and_height() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE])?;
    let table = height_profile_table(&gridded);

    assert_eq!(table.len(), gridded.len() * gridded.heights.len());
    assert_eq!(table.len(), 12);
    assert!(table.keyed_by_height);
    assert_eq!(table.columns.len(), 11);
    assert_eq!(table.columns[0].name, "wind_speed_ms");
    assert_eq!(table.columns[10].name, "data_availability_pct");

    let heights: Vec<_> = table.rows[..3].iter().map(|row| row.height).collect();
    assert_eq!(
        heights,
        vec![
            Some(HeightLevel(40)),
            Some(HeightLevel(60)),
            Some(HeightLevel(100)),
        ]
    );
    assert!(table.rows[..3]
        .iter()
        .all(|row| row.timestamp == ts("2021-09-14 00:00:00")));

    assert_eq!(table.rows[0].values[0], ChannelValue::Number(5.0));
    assert_eq!(table.rows[1].values[0], ChannelValue::Number(6.0));
    assert_eq!(table.rows[2].values[0], ChannelValue::Number(7.0));
    assert_eq!(table.rows[2].values[4], ChannelValue::Number(200.0));
    Ok(())
}

#[test]
fn gap_rows_are_missing_at_every_height() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE])?;
    let table = height_profile_table(&gridded);

    let gap_rows: Vec<_> = table
        .rows
        .iter()
        .filter(|row| row.timestamp == ts("2021-09-14 00:10:00"))
        .collect();
    assert_eq!(gap_rows.len(), 3);
    assert!(gap_rows.iter().all(|row| row.is_all_missing()));
    Ok(())
}

#[test]
fn sentinel_stays_missing_in_its_height_row() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE])?;
    let table = height_profile_table(&gridded);

    let row = table
        .rows
        .iter()
        .find(|row| {
            row.timestamp == ts("2021-09-14 00:20:00") && row.height == Some(HeightLevel(40))
        })
        .expect("row at 00:20 for 40 m");
    assert_eq!(row.values[0], ChannelValue::Number(5.1));
    assert!(row.values[1].is_missing());
    assert_eq!(row.values[2], ChannelValue::Number(4.1));
    Ok(())
}

#[test]
fn truncated_block_is_missing_only_for_its_height() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE, DAY_TWO])?;
    let table = height_profile_table(&gridded);

    let last: Vec<_> = table
        .rows
        .iter()
        .filter(|row| row.timestamp == ts("2021-09-15 00:10:00"))
        .collect();
    assert_eq!(last.len(), 3);
    assert!(!last[0].is_all_missing());
    assert!(!last[1].is_all_missing());
    assert!(last[2].is_all_missing());
    Ok(())
}

#[test]
fn multi_day_run_spans_the_gap_between_files() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE, DAY_TWO])?;
    assert_eq!(gridded.grid.start(), ts("2021-09-14 00:00:00"));
    assert_eq!(gridded.grid.end(), ts("2021-09-15 00:10:00"));
    assert_eq!(gridded.len(), 146);
    assert_eq!(gridded.observed().count(), 5);

    let tables = ProfilerReshape::default().reshape(&gridded)?;
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].len(), 146);
    assert_eq!(tables[1].len(), 146 * 3);
    Ok(())
}

#[test]
fn profile_table_can_be_switched_off() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE])?;
    let tables = ProfilerReshape {
        include_profile: false,
    }
    .reshape(&gridded)?;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].purpose, TablePurpose::Pth);
    Ok(())
}

#[test]
fn dataframe_orders_key_columns_first() -> Result<()> {
    let gridded = gridded_profiler(&[DAY_ONE])?;
    let df = height_profile_table(&gridded).to_dataframe()?;

    assert_eq!(df.height(), 12);
    assert_eq!(df.width(), 13);
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names[0], "datetime");
    assert_eq!(names[1], "height_m");
    assert_eq!(names[2], "wind_speed_ms");

    let heights = df.column("height_m")?.i64()?;
    assert_eq!(heights.get(0), Some(40));
    assert_eq!(heights.get(2), Some(100));

    let dispersion = df.column("wind_speed_dispersion_ms")?.f64()?;
    assert_eq!(dispersion.null_count(), 3 + 1);
    Ok(())
}
