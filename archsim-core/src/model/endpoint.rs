//! API endpoints and the database queries they issue.

use serde::{Deserialize, Serialize};

use crate::ids::{ColumnId, EndpointId, NodeId, TableId};

/// HTTP verb of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Statement kind of a linked query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
}

/// A query an endpoint issues against a table on a database node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedQuery {
    /// Database node owning the table.
    pub node_id: NodeId,
    pub table_id: TableId,
    #[serde(default)]
    pub kind: QueryKind,
    /// Filter columns, in the order the predicate lists them.
    #[serde(default)]
    pub where_columns: Vec<ColumnId>,
    /// Projected columns.
    #[serde(default)]
    pub select_columns: Vec<ColumnId>,
}

impl LinkedQuery {
    /// Creates a SELECT with no filter or projection.
    pub fn select(node_id: impl Into<NodeId>, table_id: impl Into<TableId>) -> Self {
        Self {
            node_id: node_id.into(),
            table_id: table_id.into(),
            kind: QueryKind::Select,
            where_columns: Vec::new(),
            select_columns: Vec::new(),
        }
    }

    /// Sets the filter columns.
    pub fn filter_on<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnId>,
    {
        self.where_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the projected columns.
    pub fn project<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnId>,
    {
        self.select_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// An HTTP endpoint served by an api-server node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: EndpointId,
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub linked_queries: Vec<LinkedQuery>,
}

impl Endpoint {
    /// Creates an endpoint with no linked queries.
    pub fn new(id: impl Into<EndpointId>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            linked_queries: Vec::new(),
        }
    }

    /// Links a query issued by this endpoint.
    pub fn with_query(mut self, query: LinkedQuery) -> Self {
        self.linked_queries.push(query);
        self
    }
}
