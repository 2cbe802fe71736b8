use notes_tui::{
    config::EditorConfig,
    editor::{EditorView, Key},
    model::{Document, EditorState, MarkType, Node, Selection, TextRun},
    render,
    theme::Theme,
};
use std::time::{Duration, Instant};

/// Performance benchmark suite for the note editor
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Document rendering performance
/// - Keystroke handling, including input rules
/// - Edge navigation around inline code
const SMALL_DOC_PARAGRAPHS: usize = 10;
const MEDIUM_DOC_PARAGRAPHS: usize = 100;
const LARGE_DOC_PARAGRAPHS: usize = 1000;

const ITERATIONS: usize = 100;

const SAMPLE_WORDS: [&str; 16] = [
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "magna",
];

fn sentence(seed: usize, words: usize) -> String {
    (0..words)
        .map(|idx| SAMPLE_WORDS[(seed + idx * 7) % SAMPLE_WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain paragraphs with a code block every tenth block.
fn create_test_document(num_paragraphs: usize, avg_words_per_para: usize) -> Document {
    let blocks = (0..num_paragraphs)
        .map(|idx| {
            if idx % 10 == 9 {
                Node::code_block("fn main() {\n    println!(\"hi\");\n}")
            } else {
                Node::plain_paragraph(&sentence(idx, avg_words_per_para))
            }
        })
        .collect();
    Document::new(blocks)
}

/// Paragraphs mixing bold, italics and inline code runs.
fn create_styled_document(num_paragraphs: usize) -> Document {
    let blocks = (0..num_paragraphs)
        .map(|idx| {
            Node::paragraph(vec![
                TextRun::new(format!("This is paragraph {idx} with ")),
                TextRun::marked("bold", [MarkType::Strong]),
                TextRun::new(" and "),
                TextRun::marked("italic", [MarkType::Italics]),
                TextRun::new(" text and some "),
                TextRun::marked("inline_code()", [MarkType::Code]),
                TextRun::new("."),
            ])
        })
        .collect();
    Document::new(blocks)
}

fn editor_at_end(doc: Document) -> EditorView {
    let selection = Selection::at_end(&doc);
    let state = EditorState::builder(doc).selection(selection).build();
    EditorView::new(state, &EditorConfig::default()).expect("default editor configuration")
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);
        println!(
            "Ops/sec:        {:.2}",
            1_000_000.0 / self.avg_duration.as_micros().max(1) as f64
        );

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    // Warmup
    for _ in 0..10 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = durations.iter().min().copied().unwrap_or_default();
    let max_duration = durations.iter().max().copied().unwrap_or_default();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

#[test]
fn bench_rendering_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           RENDERING PERFORMANCE BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let theme = Theme::default();
    let docs = vec![
        ("Small (10 paras)", create_test_document(SMALL_DOC_PARAGRAPHS, 20)),
        ("Medium (100 paras)", create_test_document(MEDIUM_DOC_PARAGRAPHS, 20)),
        ("Large (1000 paras)", create_test_document(LARGE_DOC_PARAGRAPHS, 20)),
        ("Styled (100 paras)", create_styled_document(MEDIUM_DOC_PARAGRAPHS)),
    ];

    for (name, doc) in docs {
        let selection = Selection::at_end(&doc);
        let result = benchmark(&format!("render_document - {name}"), ITERATIONS, || {
            let _ = render::render_document(&doc, selection, 80, &theme);
        });
        result.print();
    }
}

#[test]
fn bench_wrap_width_impact() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║              WRAP WIDTH IMPACT BENCHMARKS                      ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let theme = Theme::default();
    let doc = create_test_document(MEDIUM_DOC_PARAGRAPHS, 50);
    let selection = Selection::at_start(&doc);

    for width in [40, 80, 120, 200] {
        let result = benchmark(
            &format!("render_document - wrap_width={width}"),
            ITERATIONS,
            || {
                let _ = render::render_document(&doc, selection, width, &theme);
            },
        );
        result.print();
    }
}

#[test]
fn bench_typing() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                  TYPING BENCHMARKS                             ║");
    println!("╚════════════════════════════════════════════════════════════════╝");
    println!("\nEvery keystroke offers the text to the input rules first.");

    let doc_sizes = [
        ("Small (10 paras)", SMALL_DOC_PARAGRAPHS),
        ("Medium (100 paras)", MEDIUM_DOC_PARAGRAPHS),
        ("Large (1000 paras)", LARGE_DOC_PARAGRAPHS),
    ];

    for (name, size) in doc_sizes {
        let doc = create_test_document(size, 20);
        let iterations = if size >= LARGE_DOC_PARAGRAPHS { 10 } else { ITERATIONS };

        let result = benchmark(&format!("Typing 10 chars - {name}"), iterations, || {
            let mut view = editor_at_end(doc.clone());
            for _ in 0..10 {
                view.handle_key(Key::char('x'));
            }
        });
        result.print();

        let per_char = result.avg_duration / 10;
        println!("\nPer-character cost: {:?}", per_char);
        if per_char.as_millis() > 16 {
            println!("⚠️  CRITICAL: Typing will feel laggy (>16ms per keystroke)");
        } else if per_char.as_millis() > 5 {
            println!("⚠️  WARNING: May feel sluggish on older hardware");
        }
    }
}

#[test]
fn bench_input_rules() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                INPUT RULE BENCHMARKS                           ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let doc = create_test_document(MEDIUM_DOC_PARAGRAPHS, 60);

    let result = benchmark("Inline code rule after a long paragraph", ITERATIONS, || {
        let mut view = editor_at_end(doc.clone());
        for ch in " `code`".chars() {
            view.handle_key(Key::char(ch));
        }
    });
    result.print();

    let enter = Key::parse("Enter").expect("valid key");
    let result = benchmark("Code fence rule", ITERATIONS, || {
        let mut view = editor_at_end(doc.clone());
        view.handle_key(enter);
        for ch in "```".chars() {
            view.handle_key(Key::char(ch));
        }
    });
    result.print();
}

#[test]
fn bench_edge_navigation() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║              EDGE NAVIGATION BENCHMARKS                        ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let doc = create_styled_document(MEDIUM_DOC_PARAGRAPHS);
    let arrow_left = Key::parse("ArrowLeft").expect("valid key");

    let result = benchmark("ArrowLeft across a styled paragraph", ITERATIONS, || {
        let mut view = editor_at_end(doc.clone());
        for _ in 0..80 {
            view.handle_key(arrow_left);
        }
    });
    result.print();
}
