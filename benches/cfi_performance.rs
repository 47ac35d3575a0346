//! CFI parsing, ordering and generation benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use epub_locator::cfi::{self, AddressPath, CanonicalAddress};
use epub_locator::tree::{DocumentTree, TreePosition, XhtmlDocument};

fn sample_section() -> String {
    let paragraphs: String = (0..200)
        .map(|i| {
            format!(
                "<p id=\"p{i}\">Paragraph {i} with <em>some</em> emphasis and a <span class=\"hl\">highlight</span> inside.</p>"
            )
        })
        .collect();
    format!("<html><head/><body id=\"body01\">{paragraphs}</body></html>")
}

fn sample_addresses() -> Vec<CanonicalAddress> {
    (0..1000)
        .map(|i| {
            let cfi = format!(
                "epubcfi(/6/{}!/4/{}/1:{})",
                (i % 20 + 1) * 2,
                (i * 7 % 50 + 1) * 2,
                i % 97
            );
            cfi::parse(&cfi).unwrap()
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_point", |b| {
        b.iter(|| cfi::parse(black_box("epubcfi(/6/4[chap01ref]!/4[body01]/10[para05]/3:10)")))
    });
    c.bench_function("parse_range", |b| {
        b.iter(|| cfi::parse(black_box("epubcfi(/6/4[chap01ref]!/4[body01]/10[para05],/2/1:1,/3:4)")))
    });
}

fn bench_sort(c: &mut Criterion) {
    let addresses = sample_addresses();
    c.bench_function("sort_1000", |b| {
        b.iter(|| {
            let mut sorted = addresses.clone();
            sorted.sort_by(cfi::compare);
            sorted
        })
    });
}

fn bench_generate_resolve(c: &mut Criterion) {
    let doc = XhtmlDocument::parse_with_ignore_class(&sample_section(), Some("hl")).unwrap();
    let base = AddressPath::section_base(2, 3, Some("chap04"));
    let para = doc.children(doc.body())[150];
    let tail = *doc.children(para).last().unwrap();

    c.bench_function("generate_point", |b| {
        b.iter(|| cfi::address_from_node(&doc, black_box(tail), Some(3), &base))
    });

    let first = doc.children(doc.children(doc.body())[10])[0];
    c.bench_function("generate_range", |b| {
        b.iter(|| {
            cfi::address_from_range(
                &doc,
                TreePosition::at(first, 2),
                TreePosition::at(black_box(tail), 3),
                &base,
            )
        })
    });

    let address = cfi::address_from_node(&doc, tail, Some(3), &base).unwrap();
    c.bench_function("resolve_point", |b| {
        b.iter(|| cfi::resolve(&doc, black_box(&address)))
    });
}

criterion_group!(benches, bench_parse, bench_sort, bench_generate_resolve);
criterion_main!(benches);
