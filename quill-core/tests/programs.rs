use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use quill_core::{Compilation, CoreError, Globals, Host, SyntaxTree};
use walkdir::WalkDir;

/// Feeds `// input:` lines and records everything printed.
#[derive(Default)]
struct ScriptedHost {
    input: VecDeque<String>,
    output: Vec<String>,
}

impl Host for ScriptedHost {
    fn print(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn input(&mut self) -> String {
        self.input.pop_front().unwrap_or_default()
    }

    fn random(&mut self, _max: i32) -> i32 {
        0
    }
}

/// Expectations read from the `// key: value` header of a program.
#[derive(Default)]
struct Header {
    input: VecDeque<String>,
    output: Vec<String>,
    errors: Vec<String>,
}

fn parse_header(source: &str) -> Header {
    let mut header = Header::default();
    for line in source.lines() {
        let Some(directive) = line.strip_prefix("// ") else {
            continue;
        };
        if let Some(value) = directive.strip_prefix("input: ") {
            header.input.push_back(value.to_string());
        } else if let Some(value) = directive.strip_prefix("expect: ") {
            header.output.push(value.to_string());
        } else if let Some(value) = directive.strip_prefix("error: ") {
            header.errors.push(value.to_string());
        }
    }
    header
}

fn run_program(path: &Path) {
    let source = fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"));
    let header = parse_header(&source);

    let tree = SyntaxTree::load(path).unwrap_or_else(|e| panic!("Failed to load {path:?}: {e}"));
    let compilation = Compilation::new(vec![tree]);
    let mut host = ScriptedHost {
        input: header.input,
        output: Vec::new(),
    };
    let result = compilation
        .evaluate(&mut Globals::new(), &mut host)
        .unwrap_or_else(|e| panic!("{path:?} failed at runtime: {e}"));

    let codes: Vec<&str> = result.diagnostics.iter().map(|d| d.code.code()).collect();
    assert_eq!(codes, header.errors, "diagnostics of {path:?}:\n{:#?}", result.diagnostics);
    assert_eq!(host.output, header.output, "output of {path:?}");
}

#[test]
fn sample_programs_behave_as_annotated() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/programs");
    let mut count = 0;

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "ql"))
    {
        count += 1;
        run_program(entry.path());
    }

    assert!(count > 0, "No programs found in {root}");
}

#[test]
fn programs_can_span_several_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let library = dir.path().join("library.ql");
    let entry = dir.path().join("entry.ql");
    fs::write(&library, "function shout(text: string) {\n    print(text + \"!\")\n}\n").expect("write");
    fs::write(&entry, "shout(\"hey\")\n").expect("write");

    let trees = vec![
        SyntaxTree::load(&library).expect("load"),
        SyntaxTree::load(&entry).expect("load"),
    ];
    let compilation = Compilation::new(trees);
    let mut host = ScriptedHost::default();
    let result = compilation.evaluate(&mut Globals::new(), &mut host).expect("evaluate");

    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(host.output, ["hey!"]);
}

#[test]
fn global_statements_in_two_files_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("first.ql");
    let second = dir.path().join("second.ql");
    fs::write(&first, "print(\"one\")\n").expect("write");
    fs::write(&second, "print(\"two\")\n").expect("write");

    let trees = vec![SyntaxTree::load(&first).expect("load"), SyntaxTree::load(&second).expect("load")];
    let diagnostics = Compilation::new(trees).diagnostics();

    let reported: Vec<(String, &str)> = diagnostics
        .iter()
        .map(|d| (d.location.file_name().to_string(), d.code.code()))
        .collect();
    assert_eq!(
        reported,
        [
            (first.display().to_string(), "Q0223"),
            (second.display().to_string(), "Q0223"),
        ]
    );
}

#[test]
fn missing_files_report_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.ql");
    let error = SyntaxTree::load(&missing).unwrap_err();
    assert!(matches!(error, CoreError::SourceIo { ref path, .. } if path == &missing));
    assert!(error.to_string().contains("missing.ql"));
}
