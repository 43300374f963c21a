use async_trait::async_trait;
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linkchecker::{
    dedup_urls, normalize_url, CheckContext, CheckedLink, Dispatcher, GroupRepository, GroupStore, LinkGroup,
    LinkStatus, MarkdownReportRenderer, Metrics, Probe, ReportRenderer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

struct InstantProbe;

#[async_trait]
impl Probe for InstantProbe {
    async fn check(&self, _ctx: &CheckContext, url: &str) -> CheckedLink {
        CheckedLink::new(url, LinkStatus::Available, Utc::now(), Duration::from_millis(1))
    }
}

fn sample_urls(count: usize, distinct: usize) -> Vec<String> {
    (0..count).map(|i| format!("https://site-{}.example.com/page", i % distinct)).collect()
}

fn sample_links(count: usize) -> Vec<CheckedLink> {
    (0..count)
        .map(|i| {
            let status = if i % 5 == 0 {
                LinkStatus::NotAvailable
            } else {
                LinkStatus::Available
            };
            CheckedLink::new(
                format!("https://site-{i}.example.com/some/long/path/segment"),
                status,
                Utc::now(),
                Duration::from_millis(20 + i as u64),
            )
        })
        .collect()
}

fn benchmark_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup");
    configure_fast_group(&mut group);

    for (count, distinct) in [(100, 50), (1_000, 1_000), (10_000, 100)] {
        let urls = sample_urls(count, distinct);
        group.bench_with_input(BenchmarkId::new("urls", format!("{count}/{distinct}")), &urls, |b, urls| {
            b.iter(|| black_box(dedup_urls(urls)));
        });
    }

    group.finish();
}

fn benchmark_url_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("url_normalization");
    configure_fast_group(&mut group);

    let inputs = ["example.com", "https://example.com/path?q=1", "http://", "exa mple.com"];

    group.bench_function("normalize", |b| {
        b.iter(|| {
            for input in &inputs {
                let _ = black_box(normalize_url(input));
            }
        });
    });

    group.finish();
}

fn benchmark_store(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("store");
    configure_fast_group(&mut group);

    let links = sample_links(10);

    group.bench_function("insert", |b| {
        let store = GroupStore::new();
        b.iter(|| {
            rt.block_on(async {
                black_box(store.insert(links.clone()).await.unwrap());
            })
        });
    });

    let store = GroupStore::new();
    rt.block_on(async {
        for _ in 0..1_000 {
            store.insert(links.clone()).await.unwrap();
        }
    });
    let numbers: Vec<u64> = (1..=1_000).step_by(37).collect();

    group.bench_function("get_by_numbers", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(store.get_by_numbers(&numbers).await.unwrap());
            })
        });
    });

    group.finish();
}

fn benchmark_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch");
    configure_fast_group(&mut group);

    let urls = sample_urls(200, 150);

    for workers in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            b.iter(|| {
                rt.block_on(async {
                    let dispatcher = Dispatcher::new(
                        workers,
                        Arc::new(InstantProbe),
                        Arc::new(GroupStore::new()),
                        Metrics::new(),
                    );
                    let summary = dispatcher.check_many(&CheckContext::new(), &urls).await.unwrap();
                    black_box(summary);
                })
            });
        });
    }

    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    configure_fast_group(&mut group);

    let renderer = MarkdownReportRenderer::new();
    let groups: Vec<LinkGroup> = (1..=5)
        .map(|n| LinkGroup {
            links_num: n,
            links: sample_links(50),
        })
        .collect();

    group.bench_function("markdown_5x50", |b| {
        b.iter(|| black_box(renderer.render(&groups).unwrap()));
    });

    group.finish();
}

criterion_group!(
    unit_benches,
    benchmark_dedup,
    benchmark_url_normalization,
    benchmark_store,
    benchmark_dispatch,
    benchmark_render,
);

criterion_main!(unit_benches);
