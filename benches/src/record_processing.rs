use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use casefile::domain::{LAYOUT_V1, LineBuilder, Origin, RawLine, Span, names};
use casefile::prelude::*;
use casefile::pipeline::EntityGroup;

const NAMES: [&str; 3] = ["SMIT", "JONE", "BROW"];

/// Canonical records for one entity with `count` modules
fn entity_records(count: usize, mixed_names: bool) -> Vec<CanonicalRecord> {
    (0..count)
        .map(|i| {
            let name = if mixed_names { NAMES[i % NAMES.len()] } else { NAMES[0] };
            let family = if i % 4 == 0 { "I" } else { "T" };
            let record_type = if family == "I" { "05" } else { "01" };
            let period = format!("{}{:02}", 2000 + (i * 7) % 25, 1 + i % 12);
            let text = LineBuilder::new(&LAYOUT_V1)
                .set(names::TIN, "00000000050")
                .set(names::TIN_TYPE, "0")
                .set(names::FILE_SOURCE, "A")
                .set(names::NAME_CONTROL, name)
                .set(names::CYCLE, "202412")
                .set(names::EXTRACT_DATE, "20241215")
                .set(names::ROUTING_CODE, if i % 3 == 0 { "99" } else { "12" })
                .set(names::FAMILY, family)
                .set(names::RECORD_TYPE, record_type)
                .set(names::TAX_PERIOD, &period)
                .set(names::BALANCE, "125050")
                .set(names::ASSESSMENT_DATE, "20220415")
                .build();
            let raw = RawLine {
                text,
                origin: Origin::Primary,
                line_no: i + 1,
            };
            CanonicalRecord::new(raw, Span::new(0, 11))
        })
        .collect()
}

fn processor() -> RecordProcessor {
    RecordProcessor::new(LAYOUT_V1, DateRules::default(), "99", "05").unwrap()
}

/// In-group ordering alone
fn bench_group_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_ordering");
    let policy = GroupSortPolicy::from_layout(&LAYOUT_V1, "05").unwrap();

    for count in [3, 50, 500] {
        for mixed in [false, true] {
            let id = BenchmarkId::new(if mixed { "mixed_names" } else { "uniform_names" }, count);
            group.bench_with_input(id, &count, |b, &count| {
                b.iter_batched(
                    || entity_records(count, mixed),
                    |records| black_box(policy.order(records)),
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

/// Ordering, decoding and state derivation for one entity
fn bench_entity_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity_processing");
    let processor = processor();

    for count in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || EntityGroup::new("000000000500A".to_string(), 1, entity_records(count, true)),
                |entity| black_box(processor.process(entity)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_group_ordering, bench_entity_processing);
criterion_main!(benches);
