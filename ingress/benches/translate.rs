use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use k8s_openapi::api::networking::v1::Ingress;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use vg_ingress::filter::ClassFilter;
use vg_ingress::ingress::{Backend, IngressPath, IngressResource, IngressRule};
use vg_ingress::kubernetes::objects::ObjectRef;
use vg_ingress::reconciler::Reconciler;
use vg_ingress::reporter::error_reporter;
use vg_ingress::store::MemoryStore;
use vg_ingress::translator::translate;

fn ingress(rules: usize, paths: usize) -> IngressResource {
    let rules = (0..rules)
        .map(|rule| {
            IngressRule::builder()
                .host(format!("host{rule}.example.com"))
                .paths(
                    (0..paths)
                        .map(|path| {
                            IngressPath::builder()
                                .path(format!("/api/v{path}"))
                                .backend(
                                    Backend::builder()
                                        .service_name(format!("service{}", path % 4))
                                        .service_port(8080)
                                        .build(),
                                )
                                .build()
                        })
                        .collect(),
                )
                .build()
        })
        .collect();

    IngressResource::builder()
        .object_ref(
            ObjectRef::of_kind::<Ingress>()
                .namespace("default")
                .name("bench")
                .build(),
        )
        .class("vale-gateway")
        .rules(rules)
        .build()
}

fn benchmark_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    for (rules, paths) in [(1, 4), (10, 10), (50, 20)] {
        let ingress = ingress(rules, paths);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rules}x{paths}")),
            &ingress,
            |b, ingress| b.iter(|| translate(black_box(ingress))),
        );
    }
    group.finish();
}

fn benchmark_converged_pass(c: &mut Criterion) {
    let rt = Runtime::new().expect("Runtime should start");
    let ingress = ingress(10, 10);
    let (reporter, _errors) = error_reporter(CancellationToken::new());
    let reconciler = Reconciler::new(
        Arc::new(MemoryStore::new()),
        ClassFilter::new("vale-gateway"),
        reporter,
    );
    rt.block_on(reconciler.reconcile(&ingress))
        .expect("Initial pass should succeed");

    c.bench_function("reconcile_converged_10x10", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(reconciler.reconcile(&ingress).await) });
    });
}

criterion_group!(benches, benchmark_translate, benchmark_converged_pass);
criterion_main!(benches);
