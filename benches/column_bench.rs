use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use drift_gen::cache::{CacheStore, CellValue};
use drift_gen::column::ColumnGenerator;
use drift_gen::config::{ColumnSpec, DataType, Distribution, Transition, TransitionSet};
use drift_gen::output::{OutputFormat, RowWriter};
use tempfile::TempDir;

fn spec(distribution: Distribution, transitions: &[Transition]) -> ColumnSpec {
    ColumnSpec::new(
        "bench",
        DataType::Integer,
        0.0,
        transitions.iter().copied().collect::<TransitionSet>(),
        distribution,
    )
    .unwrap()
}

fn bench_column_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_generation");
    group.sample_size(20);

    let rows = 20_000u64;
    for (name, distribution, transitions) in [
        ("increment", Distribution::Increment, vec![]),
        ("uniform", Distribution::Uniform, vec![]),
        (
            "normal_transformed",
            Distribution::Normal,
            vec![
                Transition::ValuesScale,
                Transition::NullsHigh,
                Transition::ValuesSomeStrings,
            ],
        ),
    ] {
        group.throughput(Throughput::Elements(rows));
        group.bench_with_input(
            BenchmarkId::new("generate_day", name),
            &(distribution, transitions),
            |b, (distribution, transitions)| {
                b.iter_with_setup(
                    || {
                        let temp_dir = TempDir::new().unwrap();
                        let cache = CacheStore::with_dir(temp_dir.path().to_path_buf()).unwrap();
                        let generator =
                            ColumnGenerator::new(spec(*distribution, transitions), None, 42);
                        (temp_dir, cache, generator)
                    },
                    |(_temp_dir, cache, mut generator)| {
                        generator.generate(&cache, 0, rows, 1, 10_000).unwrap();
                    },
                )
            },
        );
    }

    group.finish();
}

fn bench_row_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_writer");

    let names: Vec<String> = (0..8).map(|i| format!("col{}", i)).collect();
    let row: Vec<CellValue> = (0..8)
        .map(|i| match i % 3 {
            0 => CellValue::Int(i * 1000),
            1 => CellValue::Float(i as f64 * 1.5),
            _ => CellValue::from("sometimes-42.0"),
        })
        .collect();

    for format in [OutputFormat::Csv, OutputFormat::Json, OutputFormat::JsonLines] {
        group.throughput(Throughput::Elements(10_000));
        group.bench_with_input(
            BenchmarkId::new("write_10k_rows", format),
            &format,
            |b, &format| {
                b.iter_with_setup(
                    || {
                        let temp_dir = TempDir::new().unwrap();
                        let path = temp_dir
                            .path()
                            .join(format!("0.{}", format.file_extension()));
                        let writer = RowWriter::create(&path, format, names.clone()).unwrap();
                        (temp_dir, writer)
                    },
                    |(_temp_dir, mut writer)| {
                        for _ in 0..10_000 {
                            writer.write_row(&row).unwrap();
                        }
                        writer.finish().unwrap();
                    },
                )
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_column_generation, bench_row_writer);
criterion_main!(benches);
