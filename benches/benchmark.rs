//! パフォーマンスベンチマーク
//!
//! BOMワークブックからのレコード抽出と、レコード集合の比較を測定します。
//! フィクスチャはrust_xlsxwriterでベンチマーク開始時にメモリ上へ生成します。

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;

use nvlcheck::{compare, extract_records, ParseConfig, ParseConfigBuilder, Record};

/// `rows`行のBOMワークブックを生成する（1行おきに書式付きの数量）
fn generate_bom(rows: u32) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("BoM").unwrap();
    let one_decimal = Format::new().set_num_format("0.0");

    worksheet.write_string(0, 0, "Item").unwrap();
    worksheet.write_string(0, 1, "Qty").unwrap();
    worksheet.write_string(0, 2, "SKU").unwrap();
    for row in 1..=rows {
        worksheet
            .write_string(row, 0, &format!("Part {}", row))
            .unwrap();
        if row % 2 == 0 {
            worksheet
                .write_number_with_format(row, 1, f64::from(row % 50), &one_decimal)
                .unwrap();
        } else {
            worksheet.write_number(row, 1, f64::from(row % 50)).unwrap();
        }
        worksheet
            .write_string(row, 2, &format!("SKU-{:06}", row))
            .unwrap();
    }
    worksheet.write_string(rows + 1, 0, "Total").unwrap();

    workbook.save_to_buffer().unwrap()
}

fn bom_config() -> ParseConfig {
    ParseConfigBuilder::new("BoM")
        .with_first_data_row(1)
        .build()
        .unwrap()
}

fn records(count: usize, offset: usize) -> Vec<Record> {
    (offset..offset + count)
        .map(|i| Record::new(format!("Part {}", i), (i % 50).to_string(), format!("SKU-{:06}", i)))
        .collect()
}

/// ワークブックからの抽出速度
fn benchmark_extract(c: &mut Criterion) {
    let config = bom_config();
    let mut group = c.benchmark_group("extract");
    group.sample_size(10);

    for rows in [500u32, 5_000] {
        let data = generate_bom(rows);
        group.throughput(Throughput::Elements(u64::from(rows)));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| {
                let records = extract_records(Cursor::new(black_box(data)), &config).unwrap();
                black_box(records)
            });
        });
    }

    group.finish();
}

/// 集合比較の速度（10%がソースのみ）
fn benchmark_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    for count in [1_000usize, 50_000] {
        let source = records(count, 0);
        let target = records(count, count / 10);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &(source, target),
            |b, (source, target)| {
                b.iter(|| black_box(compare(source.clone(), target.clone())));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_extract, benchmark_compare);
criterion_main!(benches);
