use crate::decode::ResultRow;
use crate::error::RecordError;
use crate::sqlite::Value;

/// A row of the `stocks` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    pub id: i64,
    pub name: String,
    pub amount: i64,
}

impl TryFrom<&ResultRow> for StockRecord {
    type Error = RecordError;

    fn try_from(row: &ResultRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: integer(row, "id")?,
            name: text(row, "name")?,
            amount: integer(row, "amount")?,
        })
    }
}

fn column<'a>(row: &'a ResultRow, name: &'static str) -> Result<&'a Value, RecordError> {
    row.get(name).ok_or(RecordError::MissingColumn(name))
}

fn integer(row: &ResultRow, name: &'static str) -> Result<i64, RecordError> {
    let value = column(row, name)?;
    value.as_integer().ok_or(RecordError::UnexpectedType {
        column: name,
        expected: "integer",
        found: value.type_name(),
    })
}

fn text(row: &ResultRow, name: &'static str) -> Result<String, RecordError> {
    let value = column(row, name)?;
    value
        .as_text()
        .map(str::to_string)
        .ok_or(RecordError::UnexpectedType {
            column: name,
            expected: "text",
            found: value.type_name(),
        })
}
