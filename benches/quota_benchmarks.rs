use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use quota_ledger::domain::services::ConstraintCompiler;
use quota_ledger::domain::value_objects::Unit;

/// Benchmark 1: unit string parsing at each supported suffix.
fn bench_unit_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_parse");

    for (label, input) in [("bare", "16"), ("mib", "512 MiB"), ("gib", "10 GiB"), ("tib", "2 TiB")] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &input, |b, &input| {
            b.iter(|| black_box(Unit::GiB.parse(input).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark 2: unit conversion across the full B..EiB ladder.
fn bench_unit_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_convert");

    group.bench_function("gib_to_mib", |b| {
        b.iter(|| black_box(Unit::GiB.convert(black_box(100), Unit::MiB).unwrap()));
    });

    group.bench_function("tib_to_kib", |b| {
        b.iter(|| black_box(Unit::TiB.convert(black_box(4), Unit::KiB).unwrap()));
    });

    group.finish();
}

/// Benchmark 3: compiling the declarative constraint syntax, well-formed
/// and clause-inconsistent inputs separately since the latter takes the
/// best-effort partial-tree path.
fn bench_constraint_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("constraint_compile");

    group.bench_function("single_clause", |b| {
        b.iter(|| black_box(ConstraintCompiler::compile(Unit::None, "at least 10")));
    });

    group.bench_function("mixed_measured_clauses", |b| {
        b.iter(|| {
            black_box(ConstraintCompiler::compile(
                Unit::MiB,
                "at least 10 MiB, at most 1 GiB, should be 512 MiB",
            ))
        });
    });

    group.bench_function("clause_inconsistent", |b| {
        b.iter(|| black_box(ConstraintCompiler::compile(Unit::None, "at least 40, at most 2")));
    });

    group.finish();
}

/// Benchmark 4: the reduced `Constraint`'s hot per-request operations
/// (`allows`/`apply`), called once per quota-change request in the
/// enforcement pipeline.
fn bench_constraint_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("constraint_apply");
    group.throughput(Throughput::Elements(1));

    let outcome = ConstraintCompiler::compile(Unit::None, "at least 10, at most 1000");
    let constraint = outcome.constraint;

    group.bench_function("allows", |b| {
        b.iter(|| black_box(constraint.allows(black_box(500))));
    });

    group.bench_function("apply", |b| {
        b.iter(|| black_box(constraint.apply(black_box(5))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_unit_parse,
    bench_unit_convert,
    bench_constraint_compile,
    bench_constraint_apply,
);

criterion_main!(benches);
