use std::hint::black_box;

use archsim_core::{
    CacheKey, Column, Endpoint, HttpMethod, Index, LinkedQuery, RunConfig, Scaling, Table,
    Topology,
};
use archsim_sim::{QueryAnalyzer, simulate};
use criterion::{Criterion, criterion_group, criterion_main};

fn users_table() -> Table {
    Table::new("t_users", "users")
        .with_column(Column::new("c_id", "id", "uuid").primary())
        .with_column(Column::new("c_email", "email", "text"))
        .with_column(Column::new("c_org", "org_id", "uuid"))
        .with_index(Index::new("i_email", "users_email_idx", ["c_email"]))
        .with_index(Index::new("i_org_email", "users_org_email_idx", ["c_org", "c_email"]))
        .with_rows(500_000)
}

fn storefront() -> Topology {
    let endpoint = Endpoint::new("ep_user", HttpMethod::Get, "/users/{id}").with_query(
        LinkedQuery::select("db", "t_users")
            .filter_on(["c_org", "c_email"])
            .project(["c_id"]),
    );
    Topology::builder()
        .traffic_source("web")
        .traffic_source("mobile")
        .cdn("cdn", Scaling::Single)
        .load_balancer("lb", Scaling::Single)
        .api_server("api-1", Scaling::Fixed { instances: 2 }, vec![endpoint.clone()])
        .api_server("api-2", Scaling::Fixed { instances: 2 }, vec![endpoint])
        .cache("redis", Scaling::Single, vec![
            CacheKey::new("k_user", "user:{id}").with_ttl(300),
        ])
        .database("db", Scaling::Fixed { instances: 3 }, vec![users_table()])
        .queue("events", Scaling::Single)
        .connect("web", "cdn")
        .connect("mobile", "lb")
        .connect("cdn", "lb")
        .connect("lb", "api-1")
        .connect("lb", "api-2")
        .connect("api-1", "redis")
        .connect("api-2", "redis")
        .connect("redis", "db")
        .connect("api-1", "events")
        .build()
}

fn bench_run_loop(c: &mut Criterion) {
    let topology = storefront();
    c.bench_function("run_loop_storefront_10s_2000rps", |b| {
        b.iter(|| {
            let config = RunConfig::new(10, 2000.0).with_seed(42);
            black_box(simulate(black_box(&topology), config))
        });
    });
}

fn bench_query_analysis(c: &mut Criterion) {
    let table = users_table();
    let query = LinkedQuery::select("db", "t_users")
        .filter_on(["c_org", "c_email"])
        .project(["c_id"]);
    c.bench_function("query_analysis_composite_index", |b| {
        b.iter(|| black_box(QueryAnalyzer::analyze(black_box(&query), black_box(&table))));
    });
}

criterion_group!(benches, bench_run_loop, bench_query_analysis);
criterion_main!(benches);
