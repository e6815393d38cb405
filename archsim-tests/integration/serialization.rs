//! Diagram JSON in, result JSON out.

use archsim_core::tracing_setup::init_test_tracing;
use archsim_core::{NodeType, RunConfig, Scaling, Topology};
use archsim_sim::simulate;
use serde_json::Value;

const DIAGRAM: &str = r#"{
    "nodes": [
        { "id": "users", "kind": { "type": "traffic-source", "data": { "label": "Users" } } },
        {
            "id": "api",
            "position": { "x": 240.0, "y": 80.0 },
            "kind": {
                "type": "api-server",
                "data": {
                    "label": "Orders API",
                    "scaling": { "mode": "auto", "minInstances": 2, "maxInstances": 6 },
                    "endpoints": [{
                        "id": "ep_list",
                        "method": "GET",
                        "path": "/users/{id}/orders",
                        "linkedQueries": [{
                            "nodeId": "db",
                            "tableId": "t_orders",
                            "kind": "SELECT",
                            "whereColumns": ["c_user"],
                            "selectColumns": ["c_total"]
                        }]
                    }]
                }
            }
        },
        {
            "id": "db",
            "kind": {
                "type": "database",
                "data": {
                    "label": "Postgres",
                    "tables": [{
                        "id": "t_orders",
                        "name": "orders",
                        "estimatedRows": 250000,
                        "columns": [
                            { "id": "c_id", "name": "id", "type": "uuid", "primaryKey": true },
                            { "id": "c_user", "name": "user_id", "type": "uuid" },
                            { "id": "c_total", "name": "total", "type": "numeric" }
                        ],
                        "indexes": [
                            {
                                "id": "i_pk",
                                "name": "orders_pkey",
                                "columns": ["c_id"],
                                "unique": true
                            }
                        ]
                    }]
                }
            }
        },
        {
            "id": "sessions",
            "kind": {
                "type": "cache",
                "data": {
                    "keys": [{
                        "id": "k_session",
                        "pattern": "session:{token}",
                        "ttlSeconds": 1800
                    }]
                }
            }
        },
        { "id": "todo", "kind": { "type": "annotation", "data": { "text": "add CDN" } } }
    ],
    "edges": [
        { "id": "e1", "source": "users", "target": "api" },
        { "id": "e2", "source": "api", "target": "db", "kind": "database" },
        { "id": "e3", "source": "api", "target": "sessions", "kind": "cache" },
        { "id": "e4", "source": "todo", "target": "api" }
    ]
}"#;

#[test]
fn test_diagram_json_deserializes() -> anyhow::Result<()> {
    let topology: Topology = serde_json::from_str(DIAGRAM)?;

    assert_eq!(topology.nodes.len(), 5);
    assert_eq!(topology.edges.len(), 4);
    let api = topology.node(&"api".into()).unwrap();
    assert_eq!(api.node_type(), NodeType::ApiServer);
    assert_eq!(api.label(), "Orders API");
    assert_eq!(
        api.scaling(),
        Scaling::Auto {
            min_instances: 2,
            max_instances: 6
        }
    );
    assert_eq!(api.endpoints()[0].linked_queries.len(), 1);
    Ok(())
}

#[test]
fn test_diagram_json_runs() -> anyhow::Result<()> {
    init_test_tracing();

    let topology: Topology = serde_json::from_str(DIAGRAM)?;
    let result = simulate(&topology, RunConfig::new(4, 50.0).with_seed(8))?;

    assert_eq!(result.total_requests, 200);
    assert!(result.node("todo").is_none());
    assert_eq!(result.node("sessions").map(|n| n.requests_received), Some(200));
    assert_eq!(result.node("sessions").map(|n| n.label.as_str()), Some("sessions"));

    // The dangling annotation edge is reported but never carries traffic.
    assert_eq!(result.edges.len(), 4);
    let annotation_edge = result.edges.iter().find(|e| e.edge_id.as_str() == "e4").unwrap();
    assert_eq!(annotation_edge.request_count, 0);

    let query = &result.query_analyses[0];
    assert_eq!(query.table_name, "orders");
    assert_eq!(query.analysis.scan_type.to_string(), "seq_scan");
    assert_eq!(query.analysis.warnings.len(), 2);
    assert_eq!(
        query.analysis.warnings[1].suggestion,
        "CREATE INDEX idx_orders_user_id ON orders (user_id) INCLUDE (total)"
    );
    Ok(())
}

#[test]
fn test_result_json_uses_camel_case() -> anyhow::Result<()> {
    let topology: Topology = serde_json::from_str(DIAGRAM)?;
    let result = simulate(&topology, RunConfig::new(2, 20.0).with_seed(8))?;
    let json: Value = serde_json::from_str(&result.to_json()?)?;

    assert_eq!(json["totalRequests"], 40);
    assert_eq!(json["config"]["durationSeconds"], 2);
    assert_eq!(json["config"]["seed"], 8);
    assert_eq!(json["timeline"].as_array().map(Vec::len), Some(2));

    let node = &json["nodes"][1];
    assert_eq!(node["nodeId"], "api");
    assert_eq!(node["nodeType"], "api-server");
    assert!(node["p99LatencyMs"].is_number());
    assert!(node["requestsQueued"].is_number());

    let entry = &json["entryPoints"][0];
    assert_eq!(entry["successRate"], 1.0);

    let query = &json["queryAnalyses"][0];
    assert_eq!(query["scanType"], "seq_scan");
    assert_eq!(query["tableName"], "orders");
    assert_eq!(query["warnings"][0]["kind"], "seq_scan_large_table");
    assert_eq!(query["warnings"][1]["kind"], "missing_index");

    let cache = &json["cacheAnalyses"][0];
    assert_eq!(cache["keyId"], "k_session");
    assert_eq!(cache["cardinality"], 1000);
    assert!(cache["estimatedHitRate"].is_number());
    Ok(())
}
