//! Generic tabular exchange form.
//!
//! JSON layout:
//!
//! ```json
//! {"fields":[{"name":"id","type":"int"},{"name":"geometry","type":"point","crs":"EPSG:4326"}],
//!  "rows":[[1,"POINT (10 20)"]]}
//! ```
//!
//! Geometry cells are WKT strings. Non-finite floats serialize as `null`.

use crate::geometry::Geometry;
use geoimage_common::{Crs, GeoImageError, GeoImageResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Point,
    Polygon,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, ColumnType::Point | ColumnType::Polygon)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Point => "point",
            ColumnType::Polygon => "polygon",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// CRS of a geometry column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
}

impl Field {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            crs: None,
        }
    }

    pub fn geometry(name: impl Into<String>, column_type: ColumnType, crs: Option<Crs>) -> Self {
        Self {
            name: name.into(),
            column_type,
            crs,
        }
    }
}

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Geometry(Geometry),
}

impl Value {
    /// Numeric coercion: ints, floats and numeric text; `Null` is NaN.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Null => Some(f64::NAN),
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Geometry(_) => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn matches(&self, column_type: ColumnType) -> bool {
        match (self, column_type) {
            (Value::Null, _) => true,
            (Value::Int(_), ColumnType::Int) => true,
            (Value::Float(_), ColumnType::Float) => true,
            (Value::Text(_), ColumnType::Text) => true,
            (Value::Geometry(g), ColumnType::Point) => !g.is_polygonal(),
            (Value::Geometry(g), ColumnType::Polygon) => g.is_polygonal(),
            _ => false,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Geometry(g) => serde_json::Value::String(g.to_wkt()),
        }
    }

    fn from_json(value: serde_json::Value, field: &Field) -> GeoImageResult<Value> {
        let mismatch = |v: &serde_json::Value| {
            GeoImageError::invalid_parameter(
                field.name.clone(),
                format!("cell {} is not a valid {}", v, field.column_type),
            )
        };

        if value.is_null() {
            return Ok(Value::Null);
        }
        match field.column_type {
            ColumnType::Int => value.as_i64().map(Value::Int).ok_or_else(|| mismatch(&value)),
            ColumnType::Float => value
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| mismatch(&value)),
            ColumnType::Text => match value {
                serde_json::Value::String(s) => Ok(Value::Text(s)),
                other => Ok(Value::Text(other.to_string())),
            },
            ColumnType::Point | ColumnType::Polygon => {
                let wkt = value.as_str().ok_or_else(|| mismatch(&value))?;
                let geometry = Geometry::from_wkt(wkt)?;
                let value = Value::Geometry(geometry);
                if value.matches(field.column_type) {
                    Ok(value)
                } else {
                    Err(GeoImageError::InvalidGeometry(format!(
                        "'{}' in {} column '{}'",
                        wkt, field.column_type, field.name
                    )))
                }
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Geometry> for Value {
    fn from(g: Geometry) -> Self {
        Value::Geometry(g)
    }
}

/// Column definitions only; what configure-time validation inspects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<Field>,
}

impl TableSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Look up a column and check its type against `allowed`.
    pub fn require(&self, name: &str, allowed: &[ColumnType]) -> GeoImageResult<&Field> {
        let field = self
            .field(name)
            .ok_or_else(|| GeoImageError::MissingColumn(name.to_string()))?;
        if !allowed.contains(&field.column_type) {
            let expected = allowed
                .iter()
                .map(ColumnType::name)
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(GeoImageError::wrong_column_type(
                name,
                expected,
                field.column_type.name(),
            ));
        }
        Ok(field)
    }

    /// `base`, or `base_1`, `base_2`, ... if already taken.
    pub fn unique_name(&self, base: &str) -> String {
        if self.field(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{}_{}", base, i))
            .find(|candidate| self.field(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }
}

/// Rows of typed cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct Table {
    schema: TableSchema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            schema: TableSchema::new(fields),
            rows: Vec::new(),
        }
    }

    pub fn with_capacity(fields: Vec<Field>, rows: usize) -> Self {
        Self {
            schema: TableSchema::new(fields),
            rows: Vec::with_capacity(rows),
        }
    }

    /// Append a row, checking width and cell types.
    pub fn push_row(&mut self, row: Vec<Value>) -> GeoImageResult<()> {
        if row.len() != self.schema.fields.len() {
            return Err(GeoImageError::invalid_parameter(
                "row",
                format!(
                    "row {} has {} cells, table has {} columns",
                    self.rows.len(),
                    row.len(),
                    self.schema.fields.len()
                ),
            ));
        }
        if let Some((cell, field)) = row
            .iter()
            .zip(&self.schema.fields)
            .find(|(cell, field)| !cell.matches(field.column_type))
        {
            return Err(GeoImageError::invalid_parameter(
                field.name.clone(),
                format!("{:?} is not a valid {}", cell, field.column_type),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn fields(&self) -> &[Field] {
        &self.schema.fields
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields.len()
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> GeoImageResult<impl Iterator<Item = &Value>> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| GeoImageError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(move |row| &row[index]))
    }

    pub fn from_json(json: &str) -> GeoImageResult<Table> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> GeoImageResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> GeoImageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace all rows; callers guarantee cells match the schema.
    pub(crate) fn replace_rows(&mut self, rows: Vec<Vec<Value>>) {
        self.rows = rows;
    }

    /// Append columns, extending every row from `values`.
    pub(crate) fn extend_columns(
        &mut self,
        fields: Vec<Field>,
        values: Vec<Vec<Value>>,
    ) -> GeoImageResult<()> {
        if values.len() != self.rows.len() {
            return Err(GeoImageError::ShapeMismatch {
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        self.schema.fields.extend(fields);
        for (row, extra) in self.rows.iter_mut().zip(values) {
            row.extend(extra);
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct RawTable {
    fields: Vec<Field>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

impl TryFrom<RawTable> for Table {
    type Error = GeoImageError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let mut table = Table::with_capacity(raw.fields, raw.rows.len());
        for (i, cells) in raw.rows.into_iter().enumerate() {
            if cells.len() != table.num_columns() {
                return Err(GeoImageError::invalid_parameter(
                    "rows",
                    format!(
                        "row {} has {} cells, table has {} columns",
                        i,
                        cells.len(),
                        table.num_columns()
                    ),
                ));
            }
            let row = cells
                .into_iter()
                .zip(table.fields())
                .map(|(cell, field)| Value::from_json(cell, field))
                .collect::<GeoImageResult<Vec<_>>>()?;
            table.rows.push(row);
        }
        Ok(table)
    }
}

impl From<Table> for RawTable {
    fn from(table: Table) -> Self {
        let rows = table
            .rows
            .iter()
            .map(|row| row.iter().map(Value::to_json).collect())
            .collect();
        RawTable {
            fields: table.schema.fields,
            rows,
        }
    }
}
