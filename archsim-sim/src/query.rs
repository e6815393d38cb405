//! Query cost estimation against table schemas and indexes.
//!
//! Index matching is a strict positional prefix match: the i-th WHERE column
//! must name the same column as the i-th index key column. The order in
//! which WHERE columns are supplied therefore matters.

use std::fmt;

use archsim_core::{ColumnId, Index, LinkedQuery, Table};
use serde::Serialize;

/// Cost of a sequential scan per thousand rows, in milliseconds.
const SEQ_SCAN_COST_PER_1K_ROWS: f64 = 10.0;

/// Cost constant of an index scan, in milliseconds.
const INDEX_SCAN_COST_PER_1K_ROWS: f64 = 0.1;

/// Cost constant of an index-only scan, in milliseconds.
const INDEX_ONLY_SCAN_COST_PER_1K_ROWS: f64 = 0.05;

/// Row count above which an unindexed filter is flagged.
const LARGE_TABLE_ROWS: u64 = 100_000;

/// Access path chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// Full table scan.
    SeqScan,
    /// Index lookup followed by a row fetch.
    IndexScan,
    /// Lookup served entirely from the index.
    IndexOnlyScan,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanType::SeqScan => write!(f, "seq_scan"),
            ScanType::IndexScan => write!(f, "index_scan"),
            ScanType::IndexOnlyScan => write!(f, "index_only_scan"),
        }
    }
}

/// How much of a WHERE clause an index key prefix serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexCoverage {
    /// No leading WHERE column matches.
    None,
    /// Some leading WHERE columns match.
    Partial,
    /// Every WHERE column matches in order.
    Full,
}

/// Category of a query warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryWarningKind {
    /// Full scan of a table with at least 100 000 rows.
    SeqScanLargeTable,
    /// No index serves the WHERE columns.
    MissingIndex,
    /// An index serves only a prefix of the WHERE columns.
    PartialIndexMatch,
}

/// A finding about a query plan with a suggested fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryWarning {
    /// Category of the warning.
    pub kind: QueryWarningKind,
    /// What the planner would do.
    pub message: String,
    /// `CREATE INDEX` statement that would serve the query.
    pub suggestion: String,
}

/// Estimated plan and cost of one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnalysis {
    /// Chosen access path.
    pub scan_type: ScanType,
    /// Estimated rows read.
    pub estimated_rows_scanned: f64,
    /// Estimated execution cost, in milliseconds.
    pub estimated_cost_ms: f64,
    /// Name of the index chosen, if any.
    pub used_index: Option<String>,
    /// Findings with suggested fixes.
    pub warnings: Vec<QueryWarning>,
}

/// Query planner cost model.
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    /// Estimates the access path and cost of `query` against `table`.
    ///
    /// Returns `None` when the query names a WHERE or SELECT column id that
    /// does not exist in the table.
    pub fn analyze(query: &LinkedQuery, table: &Table) -> Option<QueryAnalysis> {
        let where_names = resolve_names(&query.where_columns, table)?;
        resolve_names(&query.select_columns, table)?;

        let best = Self::best_index(query, &where_names, table);
        let rows = table.estimated_rows() as f64;
        let log_rows = rows.log2().max(1.0);

        let (scan_type, coverage) = match best {
            Some(candidate) if candidate.covering => (ScanType::IndexOnlyScan, candidate.coverage),
            Some(candidate) => (ScanType::IndexScan, candidate.coverage),
            None => (ScanType::SeqScan, IndexCoverage::None),
        };

        let estimated_cost_ms = match scan_type {
            ScanType::SeqScan => SEQ_SCAN_COST_PER_1K_ROWS * rows / 1000.0,
            ScanType::IndexScan => INDEX_SCAN_COST_PER_1K_ROWS * log_rows,
            ScanType::IndexOnlyScan => INDEX_ONLY_SCAN_COST_PER_1K_ROWS * log_rows,
        };
        let estimated_rows_scanned = match scan_type {
            ScanType::SeqScan => rows,
            _ => (rows.log2() * 10.0).max(1.0),
        };

        let mut warnings = Vec::new();
        if !where_names.is_empty() {
            let suggestion = suggest_index(query, &where_names, table);
            if scan_type == ScanType::SeqScan {
                if table.estimated_rows() >= LARGE_TABLE_ROWS {
                    warnings.push(QueryWarning {
                        kind: QueryWarningKind::SeqScanLargeTable,
                        message: format!(
                            "Sequential scan on {} (~{} rows)",
                            table.name,
                            table.estimated_rows()
                        ),
                        suggestion: suggestion.clone(),
                    });
                }
                warnings.push(QueryWarning {
                    kind: QueryWarningKind::MissingIndex,
                    message: format!(
                        "No index on {} serves WHERE ({})",
                        table.name,
                        where_names.join(", ")
                    ),
                    suggestion,
                });
            } else if coverage == IndexCoverage::Partial {
                warnings.push(QueryWarning {
                    kind: QueryWarningKind::PartialIndexMatch,
                    message: format!(
                        "Index {} only matches a prefix of WHERE ({})",
                        best.map(|c| c.index.name.as_str()).unwrap_or_default(),
                        where_names.join(", ")
                    ),
                    suggestion,
                });
            }
        }

        Some(QueryAnalysis {
            scan_type,
            estimated_rows_scanned,
            estimated_cost_ms,
            used_index: best.map(|c| c.index.name.clone()),
            warnings,
        })
    }

    /// Positional prefix coverage of the WHERE columns by an index key.
    pub fn coverage(where_names: &[&str], index: &Index, table: &Table) -> IndexCoverage {
        let matched = where_names
            .iter()
            .zip(&index.columns)
            .take_while(|(name, column)| table.column_name(column) == Some(**name))
            .count();

        if matched == 0 {
            IndexCoverage::None
        } else if matched == where_names.len() {
            IndexCoverage::Full
        } else {
            IndexCoverage::Partial
        }
    }

    /// Returns true when the index satisfies the SELECT list without a row fetch.
    pub fn is_covering(query: &LinkedQuery, index: &Index, coverage: IndexCoverage) -> bool {
        coverage == IndexCoverage::Full
            && query
                .select_columns
                .iter()
                .all(|c| index.columns.contains(c) || index.include.contains(c))
    }

    /// Covering first, then first full match, then first partial match.
    fn best_index<'t>(
        query: &LinkedQuery,
        where_names: &[&str],
        table: &'t Table,
    ) -> Option<Candidate<'t>> {
        let mut full = None;
        let mut partial = None;

        for index in &table.indexes {
            let coverage = Self::coverage(where_names, index, table);
            let candidate = Candidate {
                index,
                coverage,
                covering: Self::is_covering(query, index, coverage),
            };
            match coverage {
                _ if candidate.covering => return Some(candidate),
                IndexCoverage::Full if full.is_none() => full = Some(candidate),
                IndexCoverage::Partial if partial.is_none() => partial = Some(candidate),
                _ => {}
            }
        }

        full.or(partial)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'t> {
    index: &'t Index,
    coverage: IndexCoverage,
    covering: bool,
}

fn resolve_names<'t>(ids: &[ColumnId], table: &'t Table) -> Option<Vec<&'t str>> {
    ids.iter().map(|id| table.column_name(id)).collect()
}

/// Builds `CREATE INDEX idx_<table>_<cols> ON <table> (<cols>) [INCLUDE (..)]`.
fn suggest_index(query: &LinkedQuery, where_names: &[&str], table: &Table) -> String {
    let include: Vec<&str> = query
        .select_columns
        .iter()
        .filter(|c| !query.where_columns.contains(c))
        .filter_map(|c| table.column_name(c))
        .fold(Vec::new(), |mut acc, name| {
            if !acc.contains(&name) {
                acc.push(name);
            }
            acc
        });

    let mut statement = format!(
        "CREATE INDEX idx_{}_{} ON {} ({})",
        table.name,
        where_names.join("_"),
        table.name,
        where_names.join(", ")
    );
    if !include.is_empty() {
        statement.push_str(&format!(" INCLUDE ({})", include.join(", ")));
    }
    statement
}

#[cfg(test)]
mod tests {
    use archsim_core::Column;

    use super::*;

    fn users_table(rows: u64) -> Table {
        Table::new("t_users", "users")
            .with_column(Column::new("c_id", "id", "uuid").primary())
            .with_column(Column::new("c_email", "email", "text"))
            .with_column(Column::new("c_name", "name", "text"))
            .with_column(Column::new("c_org", "org_id", "uuid"))
            .with_rows(rows)
    }

    fn query(where_cols: &[&str], select_cols: &[&str]) -> LinkedQuery {
        LinkedQuery::select("db", "t_users")
            .filter_on(where_cols.iter().copied())
            .project(select_cols.iter().copied())
    }

    #[test]
    fn test_single_column_index_scan() {
        let table = users_table(1000).with_index(Index::new("i1", "users_email", ["c_email"]));

        let analysis = QueryAnalyzer::analyze(&query(&["c_email"], &["c_name"]), &table).unwrap();

        assert_eq!(analysis.scan_type, ScanType::IndexScan);
        assert_eq!(analysis.used_index.as_deref(), Some("users_email"));
        assert!(analysis.warnings.is_empty());
        let expected = 0.1 * 1000f64.log2();
        assert!((analysis.estimated_cost_ms - expected).abs() < 1e-9);
        assert!((analysis.estimated_rows_scanned - 1000f64.log2() * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_covering_index_only_scan() {
        let table = users_table(1000)
            .with_index(Index::new("i1", "users_email", ["c_email"]).including(["c_name"]));

        let analysis = QueryAnalyzer::analyze(&query(&["c_email"], &["c_name"]), &table).unwrap();

        assert_eq!(analysis.scan_type, ScanType::IndexOnlyScan);
        let expected = 0.05 * 1000f64.log2();
        assert!((analysis.estimated_cost_ms - expected).abs() < 1e-9);
    }

    #[test]
    fn test_seq_scan_on_large_table_warns() {
        let table = users_table(200_000).with_index(Index::new("i1", "users_email", ["c_email"]));

        let analysis = QueryAnalyzer::analyze(&query(&["c_name"], &[]), &table).unwrap();

        assert_eq!(analysis.scan_type, ScanType::SeqScan);
        assert_eq!(analysis.estimated_rows_scanned, 200_000.0);
        assert_eq!(analysis.estimated_cost_ms, 2000.0);
        let kinds: Vec<_> = analysis.warnings.iter().map(|w| w.kind).collect();
        assert!(kinds.contains(&QueryWarningKind::SeqScanLargeTable));
        assert!(kinds.contains(&QueryWarningKind::MissingIndex));
        assert_eq!(
            analysis.warnings[0].suggestion,
            "CREATE INDEX idx_users_name ON users (name)"
        );
    }

    #[test]
    fn test_small_table_seq_scan_only_missing_index() {
        let table = users_table(500);

        let analysis = QueryAnalyzer::analyze(&query(&["c_name"], &[]), &table).unwrap();

        assert_eq!(analysis.scan_type, ScanType::SeqScan);
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(analysis.warnings[0].kind, QueryWarningKind::MissingIndex);
    }

    #[test]
    fn test_no_where_columns_no_warnings() {
        let table = users_table(500_000);

        let analysis = QueryAnalyzer::analyze(&query(&[], &["c_name"]), &table).unwrap();

        assert_eq!(analysis.scan_type, ScanType::SeqScan);
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn test_positional_prefix_is_order_sensitive() {
        let table = users_table(1000)
            .with_index(Index::new("i1", "users_org_email", ["c_org", "c_email"]));

        let in_order = QueryAnalyzer::analyze(&query(&["c_org", "c_email"], &[]), &table).unwrap();
        assert_eq!(in_order.scan_type, ScanType::IndexOnlyScan);

        // Same predicate set, reversed order: first position mismatches.
        let reversed = QueryAnalyzer::analyze(&query(&["c_email", "c_org"], &[]), &table).unwrap();
        assert_eq!(reversed.scan_type, ScanType::SeqScan);
    }

    #[test]
    fn test_partial_match_warns_and_suggests_include() {
        let table = users_table(1000).with_index(Index::new("i1", "users_org", ["c_org"]));

        let analysis =
            QueryAnalyzer::analyze(&query(&["c_org", "c_email"], &["c_name", "c_org"]), &table)
                .unwrap();

        assert_eq!(analysis.scan_type, ScanType::IndexScan);
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(analysis.warnings[0].kind, QueryWarningKind::PartialIndexMatch);
        assert_eq!(
            analysis.warnings[0].suggestion,
            "CREATE INDEX idx_users_org_id_email ON users (org_id, email) INCLUDE (name)"
        );
    }

    #[test]
    fn test_index_selection_prefers_covering_then_earliest() {
        let table = users_table(1000)
            .with_index(Index::new("i1", "partial_first", ["c_email"]))
            .with_index(Index::new("i2", "full_first", ["c_email", "c_name"]))
            .with_index(Index::new("i3", "full_second", ["c_email", "c_name"]))
            .with_index(
                Index::new("i4", "covering", ["c_email", "c_name"]).including(["c_org"]),
            );

        let covering =
            QueryAnalyzer::analyze(&query(&["c_email", "c_name"], &["c_org"]), &table).unwrap();
        assert_eq!(covering.used_index.as_deref(), Some("covering"));

        let full =
            QueryAnalyzer::analyze(&query(&["c_email", "c_name"], &["c_id"]), &table).unwrap();
        assert_eq!(full.used_index.as_deref(), Some("full_first"));
        assert_eq!(full.scan_type, ScanType::IndexScan);
    }

    #[test]
    fn test_unknown_column_skips_analysis() {
        let table = users_table(1000);
        assert!(QueryAnalyzer::analyze(&query(&["c_missing"], &[]), &table).is_none());
        assert!(QueryAnalyzer::analyze(&query(&[], &["c_missing"]), &table).is_none());
    }

    #[test]
    fn test_coverage_levels() {
        let table = users_table(1000);
        let index = Index::new("i1", "composite", ["c_org", "c_email"]);

        assert_eq!(QueryAnalyzer::coverage(&[], &index, &table), IndexCoverage::None);
        assert_eq!(
            QueryAnalyzer::coverage(&["org_id"], &index, &table),
            IndexCoverage::Full
        );
        assert_eq!(
            QueryAnalyzer::coverage(&["org_id", "name"], &index, &table),
            IndexCoverage::Partial
        );
        assert_eq!(
            QueryAnalyzer::coverage(&["org_id", "email", "name"], &index, &table),
            IndexCoverage::Partial
        );
        assert_eq!(
            QueryAnalyzer::coverage(&["email"], &index, &table),
            IndexCoverage::None
        );
    }
}
