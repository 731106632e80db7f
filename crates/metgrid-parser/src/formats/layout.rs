use crate::errors::ParserError;
use crate::model::{ChannelKind, ColumnLayout, ColumnSpec};

use ChannelDescriptor as C;

/// One named channel at a fixed field offset. Offsets of fixed channels count from the start of
/// the line; offsets of block channels count from the start of their block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub kind: ChannelKind,
}

impl ChannelDescriptor {
    pub const fn numeric(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            offset,
            kind: ChannelKind::Numeric,
        }
    }

    pub const fn text(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            offset,
            kind: ChannelKind::Text,
        }
    }

    pub fn column_spec(&self) -> ColumnSpec {
        ColumnSpec::new(self.name, self.kind)
    }
}

/// A run of fields repeated once per height level, starting right after the fixed fields.
#[derive(Debug, Clone, Copy)]
pub struct BlockLayout {
    pub width: usize,
    pub channels: &'static [ChannelDescriptor],
}

#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    /// Leading timestamp tokens. A fixed channel may reuse one of them.
    pub timestamp_fields: usize,
    pub fixed: &'static [ChannelDescriptor],
    pub block: Option<BlockLayout>,
}

impl RecordLayout {
    /// Fields spanned by the timestamp tokens and fixed channels.
    pub fn leading_fields(&self) -> usize {
        self.fixed
            .iter()
            .map(|channel| channel.offset + 1)
            .max()
            .unwrap_or(0)
            .max(self.timestamp_fields)
    }

    /// Field count of a complete line carrying `block_count` blocks.
    pub fn field_count(&self, block_count: usize) -> usize {
        let blocks = self.block.map(|block| block.width * block_count).unwrap_or(0);
        self.leading_fields() + blocks
    }

    pub fn block_start(&self, block_index: usize) -> usize {
        let width = self.block.map(|block| block.width).unwrap_or(0);
        self.leading_fields() + block_index * width
    }

    /// Fields a line needs for block `block_index` to be extractable.
    pub fn block_required_fields(&self, block_index: usize) -> usize {
        let last = self
            .block
            .and_then(|block| block.channels.iter().map(|c| c.offset).max())
            .unwrap_or(0);
        self.block_start(block_index) + last + 1
    }

    pub fn column_layout(&self) -> ColumnLayout {
        ColumnLayout {
            fixed: self.fixed.iter().map(ChannelDescriptor::column_spec).collect(),
            block: self
                .block
                .map(|block| block.channels.iter().map(ChannelDescriptor::column_spec).collect())
                .unwrap_or_default(),
        }
    }

    /// Checks channel offsets only: ordered, non-overlapping and inside their block.
    pub fn validate_descriptors(&self, parser: &'static str) -> Result<(), ParserError> {
        let mismatch = |message: String| ParserError::LayoutMismatch { parser, message };

        check_offsets(self.fixed, usize::MAX).map_err(mismatch)?;

        if let Some(block) = &self.block {
            if block.width == 0 || block.channels.is_empty() {
                return Err(mismatch("block layout declares no channels".to_string()));
            }
            check_offsets(block.channels, block.width)
                .map_err(|message| mismatch(format!("block {message}")))?;
        }
        Ok(())
    }

    /// Checks the offsets, then the field count against one the record format states on its own.
    pub fn validate(
        &self,
        parser: &'static str,
        declared_fields: usize,
        block_count: usize,
    ) -> Result<(), ParserError> {
        self.validate_descriptors(parser)?;

        let mismatch = |message: String| ParserError::LayoutMismatch { parser, message };
        let expected = self.field_count(block_count);
        if expected != declared_fields {
            return Err(mismatch(format!(
                "descriptors cover {expected} fields but the record declares {declared_fields}"
            )));
        }
        Ok(())
    }
}

fn check_offsets(channels: &[ChannelDescriptor], limit: usize) -> Result<(), String> {
    let mut previous: Option<usize> = None;
    for channel in channels {
        if channel.offset >= limit {
            return Err(format!(
                "channel '{}' offset {} outside {limit} fields",
                channel.name, channel.offset
            ));
        }
        if previous.is_some_and(|prev| channel.offset <= prev) {
            return Err(format!(
                "channel '{}' offset {} overlaps or precedes the previous channel",
                channel.name, channel.offset
            ));
        }
        previous = Some(channel.offset);
    }
    Ok(())
}

pub const PROFILER_PTH_CHANNELS: [ChannelDescriptor; 6] = [
    C::numeric("internal_temperature_c", 1),
    C::numeric("external_temperature_c", 2),
    C::numeric("pressure_hpa", 3),
    C::numeric("relative_humidity_pct", 4),
    C::numeric("wiper_count", 5),
    C::numeric("battery_voltage_v", 6),
];

/// Eleven named channels inside each twelve-field height block; the twelfth field is not
/// carried.
pub const PROFILER_BLOCK_CHANNELS: [ChannelDescriptor; 11] = [
    C::numeric("wind_speed_ms", 0),
    C::numeric("wind_speed_dispersion_ms", 1),
    C::numeric("wind_speed_min_ms", 2),
    C::numeric("wind_speed_max_ms", 3),
    C::numeric("wind_direction_deg", 4),
    C::numeric("z_wind_ms", 5),
    C::numeric("z_wind_dispersion_ms", 6),
    C::numeric("cnr_db", 7),
    C::numeric("cnr_min_db", 8),
    C::numeric("doppler_spectrum_broadening_ms", 9),
    C::numeric("data_availability_pct", 10),
];

pub const PROFILER_BLOCK_WIDTH: usize = 12;

/// Timestamp plus the six PTH fields.
pub const PROFILER_FIXED_FIELDS: usize = 7;

pub const PROFILER_LAYOUT: RecordLayout = RecordLayout {
    timestamp_fields: 1,
    fixed: &PROFILER_PTH_CHANNELS,
    block: Some(BlockLayout {
        width: PROFILER_BLOCK_WIDTH,
        channels: &PROFILER_BLOCK_CHANNELS,
    }),
};

/// Record index, year, day-of-year, hour+minute and seconds precede the channels. The seconds
/// token doubles as the `sec` channel.
pub const TOWER_TIMESTAMP_FIELDS: usize = 5;

pub const TOWER_CHANNELS: [ChannelDescriptor; 23] = [
    C::numeric("sec", 4),
    C::numeric("panel_tmpr", 5),
    C::numeric("batt_volt", 6),
    C::numeric("Ts", 7),
    C::numeric("Ux", 8),
    C::numeric("Uy", 9),
    C::numeric("Uz", 10),
    C::numeric("sonic_checksum_flg", 11),
    C::numeric("diag_sonic", 12),
    C::text("in_bytes_str", 13),
    C::numeric("Vx_1", 14),
    C::numeric("Vy_1", 15),
    C::numeric("diag_1", 16),
    C::numeric("Vx_2", 17),
    C::numeric("Vy_2", 18),
    C::numeric("diag_2", 19),
    C::numeric("Vx_3", 20),
    C::numeric("Vy_3", 21),
    C::numeric("diag_3", 22),
    C::numeric("T_probe", 23),
    C::numeric("RH_probe", 24),
    C::numeric("press", 25),
    C::numeric("P", 26),
];

pub const TOWER_FIELD_COUNT: usize = 27;

pub const TOWER_LAYOUT: RecordLayout = RecordLayout {
    timestamp_fields: TOWER_TIMESTAMP_FIELDS,
    fixed: &TOWER_CHANNELS,
    block: None,
};

/// Channels of the sonic anemometer projection of the 20 Hz table.
pub const SONIC_3D_CHANNELS: [&str; 4] = ["Ts", "Ux", "Uy", "Uz"];
