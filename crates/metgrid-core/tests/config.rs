use std::path::PathBuf;

use metgrid_core::{OutputFormat, PipelineError, RunConfig};
use metgrid_parser::InstrumentKind;

#[test]
fn toml_defaults_fill_unset_fields() -> Result<(), PipelineError> {
    let config = RunConfig::from_toml_str(
        r#"
        instrument = "tower"
        input_dir = "campaign/tower/raw"
        "#,
    )?;

    assert_eq!(config.instrument, InstrumentKind::Tower);
    assert_eq!(config.pattern(), "*20Hz_*.dat");
    assert_eq!(config.output_format, OutputFormat::Csv);
    assert_eq!(config.missing_marker, "NaN");
    assert_eq!(config.phase_ms, 0);
    assert!(!config.write_full_20hz);
    assert!(config.require_consistent_heights);
    assert_eq!(config.output_dir(), PathBuf::from("campaign/tower/results"));
    config.validate()
}

#[test]
fn explicit_fields_override_defaults() -> Result<(), PipelineError> {
    let config = RunConfig::from_toml_str(
        r#"
        instrument = "profiler"
        input_dir = "lidar"
        pattern = "WLS7*.sta"
        output_dir = "/tmp/out"
        output_format = "parquet"
        missing_marker = "-9999"
        require_consistent_heights = false
        write_profile = false
        "#,
    )?;

    assert_eq!(config.pattern(), "WLS7*.sta");
    assert_eq!(config.output_dir(), PathBuf::from("/tmp/out"));
    assert_eq!(config.output_format, OutputFormat::Parquet);
    assert_eq!(config.missing_marker, "-9999");
    assert!(!config.require_consistent_heights);
    assert!(!config.write_profile);
    assert!(config.require_heights);
    config.validate()
}

#[test]
fn unknown_keys_are_rejected() {
    let err = RunConfig::from_toml_str(
        r#"
        instrument = "profiler"
        input_dir = "lidar"
        phase = 50
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Toml(_)));
}

#[test]
fn phase_must_sit_on_the_tower_grid() {
    let mut config = RunConfig::new(InstrumentKind::Tower, "raw");
    for phase in [0, 50, 950] {
        config.phase_ms = phase;
        assert!(config.validate().is_ok(), "phase {phase}");
    }
    for phase in [10, 1000, -50] {
        config.phase_ms = phase;
        assert!(
            matches!(config.validate(), Err(PipelineError::Config(_))),
            "phase {phase}"
        );
    }
}

#[test]
fn output_format_parses_case_insensitively() {
    assert_eq!("CSV".parse::<OutputFormat>().ok(), Some(OutputFormat::Csv));
    assert_eq!(
        "parquet".parse::<OutputFormat>().ok(),
        Some(OutputFormat::Parquet)
    );
    assert!("xlsx".parse::<OutputFormat>().is_err());
}

#[test]
fn input_next_to_nothing_writes_to_local_results() {
    let config = RunConfig::new(InstrumentKind::Profiler, "raw");
    assert_eq!(config.output_dir(), PathBuf::from("results"));
    assert_eq!(config.pattern(), "*.sta");
}
