//! Pixel grid ↔ table reshaping.

use crate::envelope::{Band, RasterEnvelope};
use crate::progress::Progress;
use crate::table::{ColumnType, Field, Table, TableSchema, Value};
use geoimage_common::{GeoImageError, GeoImageResult};
use tracing::{debug, info};

pub const ROW_COLUMN: &str = "row";
pub const COL_COLUMN: &str = "col";

/// Name of the value column for 1-based band `index`.
pub fn band_column_name(index: usize) -> String {
    format!("Band_{}", index)
}

/// One row per pixel (row-major): `Band_1..Band_n` then `row`, `col`.
pub fn to_table(envelope: &RasterEnvelope) -> Table {
    to_table_with_progress(envelope, &crate::progress::NoProgress)
}

pub fn to_table_with_progress(envelope: &RasterEnvelope, progress: &dyn Progress) -> Table {
    progress.report(0.1, "Starting image reshaping...");
    let (count, height, width) = envelope.shape();

    let mut fields: Vec<Field> = (1..=count)
        .map(|i| Field::new(band_column_name(i), ColumnType::Float))
        .collect();
    fields.push(Field::new(ROW_COLUMN, ColumnType::Int));
    fields.push(Field::new(COL_COLUMN, ColumnType::Int));

    let mut rows = Vec::with_capacity(height * width);
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let mut cells: Vec<Value> = envelope
                .bands()
                .iter()
                .map(|band| Value::Float(band.values()[idx]))
                .collect();
            cells.push(Value::Int(row as i64));
            cells.push(Value::Int(col as i64));
            rows.push(cells);
        }
    }

    let mut table = Table::new(fields);
    table.replace_rows(rows);

    debug!(rows = table.num_rows(), columns = table.num_columns(), "Reshaped image to table");
    progress.report(0.9, "Data reshaped successfully.");
    table
}

/// Check a column selection against a table schema.
pub fn validate_value_columns(schema: &TableSchema, value_columns: &[String]) -> GeoImageResult<()> {
    if value_columns.is_empty() {
        return Err(GeoImageError::InvalidConfiguration(
            "at least one value column must be selected".to_string(),
        ));
    }
    for name in value_columns {
        schema.require(name, &[ColumnType::Int, ColumnType::Float, ColumnType::Text])?;
    }
    Ok(())
}

/// Reshape each selected column into a band shaped like `template`.
pub fn from_table(
    table: &Table,
    value_columns: &[String],
    template: &RasterEnvelope,
) -> GeoImageResult<Vec<Band>> {
    validate_value_columns(table.schema(), value_columns)?;

    let (height, width) = (template.height(), template.width());
    let expected = height * width;
    if table.num_rows() != expected {
        return Err(GeoImageError::ShapeMismatch {
            expected,
            actual: table.num_rows(),
        });
    }

    value_columns
        .iter()
        .map(|name| {
            let values = table
                .column(name)?
                .enumerate()
                .map(|(row, cell)| {
                    cell.to_f64().ok_or_else(|| GeoImageError::NotNumeric {
                        column: name.clone(),
                        row,
                        value: format!("{:?}", cell),
                    })
                })
                .collect::<GeoImageResult<Vec<f64>>>()?;
            Band::new(height, width, values)
        })
        .collect()
}

/// New envelope from table columns, georeferenced like `template`.
pub fn bands_from_table(
    table: &Table,
    value_columns: &[String],
    template: &RasterEnvelope,
) -> GeoImageResult<RasterEnvelope> {
    let bands = from_table(table, value_columns, template)?;
    let mut georeference = template.georeference().clone();
    georeference.count = bands.len();
    info!(
        bands = bands.len(),
        height = georeference.height,
        width = georeference.width,
        "Built envelope from table"
    );
    RasterEnvelope::new(bands, georeference, template.bounds().copied())
}

/// First band as a plain grid: one row per image row, columns `0..width-1`.
pub fn band_to_grid_table(envelope: &RasterEnvelope) -> Table {
    let width = envelope.width();
    let fields = (0..width)
        .map(|c| Field::new(c.to_string(), ColumnType::Float))
        .collect();
    let mut table = Table::new(fields);
    let band = &envelope.bands()[0];
    table.replace_rows(
        (0..envelope.height())
            .map(|r| band.row(r).iter().map(|&v| Value::Float(v)).collect())
            .collect(),
    );
    table
}
