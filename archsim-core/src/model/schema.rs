//! Relational schema owned by database nodes.

use serde::{Deserialize, Serialize};

use crate::ids::{ColumnId, IndexId, TableId};

/// Row count assumed when a table does not declare one.
pub const DEFAULT_ESTIMATED_ROWS: u64 = 1000;

/// Foreign key target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRef {
    pub table_id: TableId,
    pub column_id: ColumnId,
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub foreign_key: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub references: Option<ForeignKeyRef>,
}

impl Column {
    /// Creates a nullable, non-key column.
    pub fn new(
        id: impl Into<ColumnId>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            foreign_key: false,
            nullable: true,
            unique: false,
            references: None,
        }
    }

    /// Marks the column as the primary key.
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self.unique = true;
        self
    }

    /// Marks the column as a foreign key into another table.
    pub fn foreign_key_to(
        mut self,
        table_id: impl Into<TableId>,
        column_id: impl Into<ColumnId>,
    ) -> Self {
        self.foreign_key = true;
        self.references = Some(ForeignKeyRef {
            table_id: table_id.into(),
            column_id: column_id.into(),
        });
        self
    }
}

/// Index access method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    #[default]
    Btree,
    Hash,
    Gin,
    Gist,
}

/// A secondary or primary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub id: IndexId,
    pub name: String,
    /// Indexed columns in key order.
    pub columns: Vec<ColumnId>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, rename = "type")]
    pub kind: IndexKind,
    /// Covering columns stored in the index leaf but not part of the key.
    #[serde(default)]
    pub include: Vec<ColumnId>,
}

impl Index {
    /// Creates a non-unique btree index over the given key columns.
    pub fn new<I, C>(id: impl Into<IndexId>, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnId>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            kind: IndexKind::Btree,
            include: Vec::new(),
        }
    }

    /// Adds covering columns.
    pub fn including<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnId>,
    {
        self.include = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// A table owned by a database node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: TableId,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub estimated_rows: Option<u64>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(id: impl Into<TableId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            estimated_rows: None,
        }
    }

    /// Appends a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends an index.
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Sets the estimated row count.
    pub fn with_rows(mut self, rows: u64) -> Self {
        self.estimated_rows = Some(rows);
        self
    }

    /// Returns the declared row estimate or [`DEFAULT_ESTIMATED_ROWS`].
    pub fn estimated_rows(&self) -> u64 {
        self.estimated_rows.unwrap_or(DEFAULT_ESTIMATED_ROWS)
    }

    /// Looks up a column by id.
    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Resolves a column id to its name.
    pub fn column_name(&self, id: &ColumnId) -> Option<&str> {
        self.column(id).map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_rows_default() {
        let table = Table::new("t1", "users");
        assert_eq!(table.estimated_rows(), DEFAULT_ESTIMATED_ROWS);
        assert_eq!(table.with_rows(250_000).estimated_rows(), 250_000);
    }

    #[test]
    fn test_column_lookup() {
        let table = Table::new("t1", "orders")
            .with_column(Column::new("c1", "id", "uuid").primary())
            .with_column(Column::new("c2", "user_id", "uuid").foreign_key_to("t0", "c0"));

        assert_eq!(table.column_name(&ColumnId::new("c2")), Some("user_id"));
        assert!(table.column(&ColumnId::new("c1")).unwrap().primary_key);
        assert!(table.column(&ColumnId::new("c2")).unwrap().foreign_key);
        assert!(table.column(&ColumnId::new("missing")).is_none());
    }
}
