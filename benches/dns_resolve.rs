use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use dnsmux::dns::{
    Answer, AnswerCache, AnyRecordType, ClientOptions, DnsClient, DnsResolver, DnsResponse,
    QueryOptions, RecordType, RecordTypeLabel,
};

fn filled_cache(slots: u32) -> AnswerCache {
    let cache = AnswerCache::new(slots as usize);
    for i in 0..slots {
        let host = format!("host{}.example.com", i);
        let data = format!("10.0.{}.{}", (i >> 8) as u8, i as u8);
        cache.add(&host, Answer::new(host.as_str(), RecordType::A, data).with_ttl(300));
    }
    cache
}

fn bench_cache_lookup_hit(c: &mut Criterion) {
    let cache = filled_cache(1000);
    let types: [AnyRecordType; 1] = [RecordType::A.into()];

    c.bench_function("answer_cache_lookup_hit", |b| {
        b.iter(|| {
            black_box(cache.get("host500.example.com", &types));
        });
    });
}

fn bench_cache_lookup_label_form(c: &mut Criterion) {
    let cache = filled_cache(1000);
    let types: [AnyRecordType; 1] = [RecordTypeLabel::A.into()];

    c.bench_function("answer_cache_lookup_label_form", |b| {
        b.iter(|| {
            black_box(cache.get("host500.example.com", &types));
        });
    });
}

fn bench_cache_lookup_miss(c: &mut Criterion) {
    let cache = filled_cache(1000);
    let types: [AnyRecordType; 2] = [RecordType::A.into(), RecordType::Aaaa.into()];

    c.bench_function("answer_cache_lookup_partial_miss", |b| {
        b.iter(|| {
            black_box(cache.get("host500.example.com", &types));
        });
    });
}

fn bench_cache_insert_with_eviction(c: &mut Criterion) {
    c.bench_function("answer_cache_insert_2000_into_1000", |b| {
        b.iter(|| {
            let cache = filled_cache(1000);
            for i in 1000..2000u32 {
                let host = format!("host{}.example.com", i);
                cache.add(&host, Answer::new(host.as_str(), RecordType::A, "10.1.0.1").with_ttl(300));
            }
            black_box(cache.len());
        });
    });
}

struct StaticResolver;

#[async_trait::async_trait]
impl DnsResolver for StaticResolver {
    async fn resolve(&self, domain: &str, _options: &QueryOptions) -> anyhow::Result<DnsResponse> {
        Ok(DnsResponse::new(
            Vec::new(),
            vec![Answer::new(domain, RecordType::A, "10.0.0.1").with_ttl(300)],
        ))
    }
}

fn bench_client_cached_query(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let backend: Arc<dyn DnsResolver> = Arc::new(StaticResolver);
    let client = DnsClient::new(ClientOptions::new().resolver(".", backend));
    rt.block_on(client.query("example.com", QueryOptions::new())).unwrap();

    c.bench_function("dns_client_cached_query", |b| {
        b.iter(|| {
            let response = rt.block_on(client.query("example.com", QueryOptions::new()));
            black_box(response.unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_cache_lookup_hit,
    bench_cache_lookup_label_form,
    bench_cache_lookup_miss,
    bench_cache_insert_with_eviction,
    bench_client_cached_query
);
criterion_main!(benches);
