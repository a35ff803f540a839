use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use dashtable::{
    core::{
        filter::FilterState,
        fuzzy::rank,
        pipeline::{PipelineInput, run},
        sort::SortState,
    },
    gateway::GatewayResponse,
    record::Record,
    types::{EntityKind, PagingMode, SortDirection},
    view::TableView,
};
use serde_json::{Value, json};

const NAMES: [&str; 8] = [
    "Acme", "Ace Corp", "Zenith", "Northwind", "Globex", "Initech", "Umbrella", "Hooli",
];

fn company(i: usize) -> Value {
    json!({
        "companyId": format!("{i}"),
        "companyName": format!("{} {i}", NAMES[i % NAMES.len()]),
        "phoneContact": format!("555-{:04}", i % 10_000),
    })
}

fn records(n: usize) -> Vec<Record> {
    (0..n)
        .filter_map(|i| Record::from_json(company(i), "companyId"))
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let filters = FilterState::new();
    let sort = SortState::by("companyName", SortDirection::Ascending);

    for n in [1_000usize, 10_000, 50_000] {
        let rows = records(n);
        for search in ["", "ace"] {
            group.bench_with_input(BenchmarkId::new(format!("search={search:?}"), n), &rows, |b, rows| {
                b.iter(|| {
                    let out = run(
                        rows,
                        &PipelineInput {
                            filters: &filters,
                            search,
                            searchable: &["companyId", "companyName"],
                            sort: &sort,
                            page_index: 3,
                            page_size: 25,
                            paging: PagingMode::Client,
                            server_total_pages: 0,
                        },
                    );
                    assert!(out.page.rows.len() <= 25);
                });
            });
        }
    }
    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    c.bench_function("rank_10k", |b| {
        let targets: Vec<String> = (0..10_000).map(|i| format!("{} {i}", NAMES[i % NAMES.len()])).collect();
        b.iter(|| targets.iter().filter(|t| rank(t, "umb").passed).count());
    });
}

fn bench_view_load(c: &mut Criterion) {
    let body = json!({ "companyList": (0..50_000).map(company).collect::<Vec<_>>() });
    c.bench_function("view_load_50k", |b| {
        b.iter(|| {
            let mut view = TableView::new(EntityKind::Companies, 25);
            if let Some(plan) = view.load() {
                view.complete_fetch(plan.seq, Ok(GatewayResponse::new(200, body.clone())));
            }
            view.commit_search("glob");
            view.snapshot().rows.len()
        });
    });
}

criterion_group!(benches, bench_pipeline, bench_rank, bench_view_load);
criterion_main!(benches);
