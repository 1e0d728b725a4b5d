use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use navmap::config::{CleanOptions, ConnectOptions, SortOptions};
use navmap::ids::{decode_building, decode_point};
use navmap::ops::{clean_point_connections, connect_points};
use navmap::svg::SvgDocument;
use std::hint::black_box;

/// A chain of `points` markers where every fifth point is missing, leaving
/// dangling neighbor references and lines for the clean pass.
fn chain_document(points: usize) -> String {
    let mut out = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:flutter_maps="urn:flutter-maps:navigation">"#,
    );
    out.push('\n');
    for i in 1..=points {
        if i % 5 == 0 {
            continue;
        }
        let mut neighbors = Vec::new();
        if i > 1 {
            neighbors.push((i - 1).to_string());
        }
        if i < points {
            neighbors.push((i + 1).to_string());
        }
        out.push_str(&format!(
            "  <ellipse id=\"point-{i}={}\" cx=\"{}\" cy=\"0\" rx=\"1\" ry=\"1\"/>\n",
            neighbors.join("-"),
            i * 10
        ));
        if i < points {
            out.push_str(&format!(
                "  <line id=\"nav_line-{i}-{next}\" flutter_maps:a_id=\"{i}\" flutter_maps:b_id=\"{next}\"/>\n",
                next = i + 1
            ));
        }
        if i % 7 == 0 {
            out.push_str(&format!(
                "  <rect id=\"shop-{i}={i}\" x=\"{}\" y=\"5\" width=\"4\" height=\"4\"/>\n",
                i * 10
            ));
        }
    }
    out.push_str("</svg>\n");
    out
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let ids = [
        "point-43",
        "point-43=44-39-45",
        "stairs-elevator-1=2",
        "shop-7=",
        "rect1234",
    ];
    group.bench_function("decode", |b| {
        b.iter(|| {
            for id in ids {
                black_box(decode_point(black_box(id)));
                black_box(decode_building(black_box(id)));
            }
        });
    });
    group.finish();
}

fn bench_clean(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean");
    for size in [100usize, 1_000, 5_000] {
        let source = chain_document(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, data| {
            b.iter(|| {
                let mut doc = SvgDocument::parse(black_box(data)).expect("parse failed");
                let summary = clean_point_connections(&mut doc, CleanOptions::default())
                    .expect("clean failed");
                black_box(summary.removed);
            });
        });
    }
    group.finish();
}

fn bench_connect(c: &mut Criterion) {
    let mut group = c.benchmark_group("connect");
    for size in [100usize, 1_000] {
        let source = chain_document(size);
        let selection: Vec<String> = (1..=size)
            .filter(|i| i % 5 != 0)
            .map(|i| {
                if i == 1 {
                    "point-1=2".to_string()
                } else if i == size {
                    format!("point-{i}={}", i - 1)
                } else {
                    format!("point-{i}={}-{}", i - 1, i + 1)
                }
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, data| {
            b.iter(|| {
                let mut doc = SvgDocument::parse(black_box(data)).expect("parse failed");
                doc.select_ids(&selection).expect("selection failed");
                let summary =
                    connect_points(&mut doc, &ConnectOptions::default(), SortOptions::default())
                        .expect("connect failed");
                black_box(summary.lines_added);
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_codec, bench_clean, bench_connect
);
criterion_main!(benches);
