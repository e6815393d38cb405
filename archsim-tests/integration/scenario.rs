//! End-to-end scenarios over realistic diagrams.

use archsim_core::tracing_setup::init_test_tracing;
use archsim_core::{
    CacheKey, Column, Endpoint, HttpMethod, Index, LinkedQuery, NodeType, RunConfig, Scaling,
    Table, Topology,
};
use archsim_sim::{QueryWarningKind, ScanType, Simulation};

fn posts_table() -> Table {
    Table::new("t_posts", "posts")
        .with_column(Column::new("c_id", "id", "bigint").primary())
        .with_column(
            Column::new("c_author", "author_id", "bigint").foreign_key_to("t_users", "c_id"),
        )
        .with_column(Column::new("c_created", "created_at", "timestamp"))
        .with_column(Column::new("c_title", "title", "text"))
        .with_index(Index::new("i_pk", "posts_pkey", ["c_id"]))
        .with_index(Index::new("i_author_created", "posts_author_created_idx", [
            "c_author", "c_created",
        ]))
        .with_rows(2_000_000)
}

fn blog() -> Topology {
    let feed = Endpoint::new("ep_feed", HttpMethod::Get, "/authors/{id}/posts").with_query(
        LinkedQuery::select("db", "t_posts")
            .filter_on(["c_author"])
            .project(["c_title"]),
    );
    Topology::builder()
        .traffic_source("browsers")
        .cdn("cdn", Scaling::Single)
        .load_balancer("lb", Scaling::Single)
        .api_server("api", Scaling::Auto { min_instances: 2, max_instances: 8 }, vec![feed])
        .cache("redis", Scaling::Single, vec![
            CacheKey::new("k_feed", "feed:{author_id}").with_ttl(60),
        ])
        .database("db", Scaling::Fixed { instances: 2 }, vec![posts_table()])
        .annotation("note", "read path only")
        .connect("browsers", "cdn")
        .connect("cdn", "lb")
        .connect("lb", "api")
        .connect("api", "redis")
        .connect("redis", "db")
        .build()
}

#[test]
fn test_blog_read_path() {
    init_test_tracing();

    let topology = blog();
    let result = Simulation::new(&topology, RunConfig::new(10, 400.0).with_seed(2024))
        .run()
        .expect("valid configuration");

    assert_eq!(result.total_requests, 4000);
    assert_eq!(result.nodes.len(), 6);
    assert!(result.node("note").is_none());

    for id in ["cdn", "lb", "api", "redis", "db"] {
        let node = result.node(id).unwrap();
        assert_eq!(node.requests_received, 4000, "node {id}");
        assert_eq!(node.errors, 0, "node {id}");
    }

    let api = result.node("api").unwrap();
    assert_eq!(api.node_type, NodeType::ApiServer);
    assert_eq!(api.instances, 2);
    assert_eq!(api.capacity_rps, 2000.0);

    let entry = result.entry_point("browsers").unwrap();
    assert_eq!(entry.success_rate, 1.0);
    assert!(entry.avg_rtt_ms > api.avg_latency_ms);
}

#[test]
fn test_blog_query_and_cache_insights() {
    init_test_tracing();

    let topology = blog();
    let result = Simulation::new(&topology, RunConfig::new(5, 200.0).with_seed(7))
        .run()
        .expect("valid configuration");

    assert_eq!(result.query_analyses.len(), 1);
    let query = &result.query_analyses[0];
    assert_eq!(query.analysis.scan_type, ScanType::IndexScan);
    assert_eq!(
        query.analysis.used_index.as_deref(),
        Some("posts_author_created_idx")
    );
    assert!(
        query
            .analysis
            .warnings
            .iter()
            .all(|w| w.kind != QueryWarningKind::MissingIndex)
    );

    assert_eq!(result.cache_analyses.len(), 1);
    let cache = &result.cache_analyses[0];
    assert_eq!(cache.analysis.cardinality, 1000);
    // 200 rps over a 60s window across 1000 keys gives 12 reads per key.
    assert!((cache.analysis.estimated_hit_rate - 12.0 / 13.0).abs() < 1e-9);
    assert!(cache.analysis.effective_db_rps < 200.0);
}
