use criterion::{Criterion, criterion_group, criterion_main};
use quire_engine::interchange::{from_html, to_html};
use quire_engine::model::Selection;
use quire_engine::schema::blog::blog_schema;
use quire_engine::transform::Transaction;

fn generate_post(paragraphs: usize) -> String {
    let mut html = String::from("<h1>Benchmark post</h1>");
    for i in 0..paragraphs {
        html.push_str(&format!(
            "<p>Paragraph {i} with <strong>bold</strong> and <em>italic</em> text.</p>"
        ));
        if i % 10 == 0 {
            html.push_str(r#"<pre data-type="file-code-block" data-language="ts"><code>const a = 1;
a += 1;</code></pre>"#);
        }
    }
    html
}

fn bench_transactions(c: &mut Criterion) {
    let mut group = c.benchmark_group("transactions");
    group.sample_size(10);

    let schema = blog_schema();
    let html = generate_post(100);
    let doc = from_html(&schema, &html).unwrap();

    group.bench_function("insert_text", |b| {
        let tr = Transaction::new().insert_text(3, "test", vec![]);
        b.iter(|| {
            let applied = tr.apply(&schema, std::hint::black_box(&doc), Selection::cursor(3));
            std::hint::black_box(applied)
        });
    });

    group.bench_function("replace_and_map", |b| {
        let tr = Transaction::new().replace(3, 10, vec![]);
        b.iter(|| {
            let applied = tr.apply(&schema, &doc, Selection::cursor(3)).unwrap();
            std::hint::black_box(applied.mapping.map(std::hint::black_box(500)))
        });
    });

    group.bench_function("parse_html", |b| {
        b.iter(|| from_html(&schema, std::hint::black_box(&html)))
    });

    group.bench_function("serialize_html", |b| {
        b.iter(|| to_html(&schema, std::hint::black_box(&doc)))
    });

    group.finish();
}

criterion_group!(benches, bench_transactions);
criterion_main!(benches);
