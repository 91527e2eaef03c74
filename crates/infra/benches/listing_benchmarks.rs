use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use backoffice_content::{CmsInput, CmsPage, CmsQuery};
use backoffice_core::ListRequest;
use backoffice_infra::{CmsStore, InMemoryStore, compose};
use chrono::{Duration, Utc};

fn seeded_store(rt: &tokio::runtime::Runtime, count: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    let start = Utc::now();
    rt.block_on(async {
        for i in 0..count {
            let input = CmsInput {
                key: format!("page-{i:05}"),
                title: format!("Title {}", count - i),
                meta_keyword: if i % 2 == 0 { "even".into() } else { "odd".into() },
                content: "<p>body</p>".into(),
                is_active: i % 3 != 0,
            };
            let page = CmsPage::create(&input, start + Duration::seconds(i as i64));
            store.insert_cms_page(&page).await.unwrap();
        }
    });
    store
}

fn bench_compose(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("listing_compose");

    for size in [100usize, 1_000, 10_000] {
        let store = seeded_store(&rt, size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("default_sort", size), &size, |b, _| {
            let query = CmsQuery::from_request(&ListRequest::new(3, 20));
            b.iter(|| black_box(rt.block_on(compose(&store, black_box(&query))).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("filtered_by_title", size), &size, |b, _| {
            let request = ListRequest::new(1, 50)
                .sorted_by("title", "asc")
                .filter("metaKeyword", "ev")
                .filter("isActive", "true");
            let query = CmsQuery::from_request(&request);
            b.iter(|| black_box(rt.block_on(compose(&store, black_box(&query))).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
