mod repl;
mod report;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use quill_core::{Compilation, ConsoleHost, CoreError, Globals, SyntaxTree, TreeEmitter};
use simple_logger::SimpleLogger;

use crate::repl::Repl;
use crate::report::write_diagnostics;

/// Compile and run Quill programs; without files, start the REPL.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source files forming one program
    files: Vec<PathBuf>,

    #[arg(long, help = "Print the parse tree of every source file")]
    show_tree: bool,

    #[arg(long, help = "Print the lowered bound tree before running")]
    show_program: bool,

    #[arg(short, long, help = "Log compiler stages at debug level")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .context("failed to install logger")?;
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    if cli.files.is_empty() {
        return Repl::new(cli.show_tree, cli.show_program).run();
    }

    let mut trees = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let tree = SyntaxTree::load(path).with_context(|| format!("failed to read input file {}", path.display()))?;
        if cli.show_tree {
            print!("{tree}");
        }
        trees.push(tree);
    }

    let compilation = Compilation::new(trees);
    let diagnostics = compilation.diagnostics();
    if !diagnostics.is_empty() {
        write_diagnostics(&mut io::stderr().lock(), &diagnostics).context("failed to write diagnostics")?;
        return Err(CoreError::Diagnostics(diagnostics).into());
    }

    if cli.show_program {
        let mut emitter = TreeEmitter::new(String::new());
        compilation.emit(&mut emitter)?;
        print!("{}", emitter.into_inner());
    }

    let mut host = ConsoleHost::new();
    compilation
        .evaluate(&mut Globals::new(), &mut host)
        .map_err(CoreError::from)
        .context("program failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn runs_a_program_file() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("hello.ql");
        fs::write(&input_path, "for i = 1 to 3\n    print(\"line \" + string(i))\n").expect("write input");

        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .arg(&input_path)
            .assert()
            .success()
            .stdout("line 1\nline 2\nline 3\n");
    }

    #[test]
    fn combines_several_files() {
        let dir = tempdir().expect("tempdir");
        let library = dir.path().join("library.ql");
        let program = dir.path().join("program.ql");
        fs::write(&library, "function square(n: int): int {\n    return n * n\n}\n").expect("write library");
        fs::write(&program, "print(string(square(7)))\n").expect("write program");

        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .arg(&library)
            .arg(&program)
            .assert()
            .success()
            .stdout("49\n");
    }

    #[test]
    fn reports_diagnostics_with_location() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("broken.ql");
        fs::write(&input_path, "print(\"ok\")\nvar x = missing\n").expect("write input");

        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .arg(&input_path)
            .assert()
            .failure()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("broken.ql(2,9,2,16): error Q0203"))
            .stderr(predicate::str::contains("1 diagnostic(s)"));
    }

    #[test]
    fn reports_runtime_errors() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("divide.ql");
        fs::write(&input_path, "var zero = 0\nprint(string(4 / zero))\n").expect("write input");

        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .arg(&input_path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("division by zero"));
    }

    #[test]
    fn reports_missing_files() {
        let dir = tempdir().expect("tempdir");

        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .arg(dir.path().join("absent.ql"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read input file"));
    }

    #[test]
    fn shows_the_lowered_program() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("loop.ql");
        fs::write(&input_path, "var i = 0\nwhile i < 2\n    i = i + 1\nprint(string(i))\n").expect("write input");

        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .arg("--show-program")
            .arg(&input_path)
            .assert()
            .success()
            .stdout(predicate::str::starts_with("function main()\n{\n"))
            .stdout(predicate::str::contains("goto LABEL_1 if i < 2"))
            .stdout(predicate::str::ends_with("}\n2\n"));
    }

    #[test]
    fn repl_chains_submissions() {
        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .write_stdin("var x = 20\nfunction twice(n: int): int {\n    return n * 2\n}\ntwice(x) + 2\n")
            .assert()
            .success()
            .stdout("42\n");
    }

    #[test]
    fn repl_keeps_going_after_diagnostics() {
        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .write_stdin("var x = nope\nvar y = 5\ny\n")
            .assert()
            .success()
            .stdout("5\n")
            .stderr(predicate::str::contains("error Q0203"));
    }

    #[test]
    fn repl_meta_commands() {
        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .write_stdin("#help\nvar total = 3\n#ls\n#dump rnd\n#reset\ntotal\n#bogus\n#exit\nprint(\"unreachable\")\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("#dump <function>  Shows bound tree of a function."))
            .stdout(predicate::str::contains("var total: int\n"))
            .stdout(predicate::str::contains("function rnd(max: int): int\n"))
            .stdout(predicate::str::contains("unreachable").not())
            .stderr(predicate::str::contains("Q0203"))
            .stderr(predicate::str::contains("invalid command #bogus"));
    }

    #[test]
    fn repl_dumps_user_functions() {
        Command::cargo_bin("quill-cli")
            .expect("binary exists")
            .write_stdin("function inc(n: int): int {\n    return n + 1\n}\n#dump inc\n#dump nothing\n")
            .assert()
            .success()
            .stdout("function inc(n: int): int\n{\n    return n + 1\n}\n")
            .stderr(predicate::str::contains("function 'nothing' does not exist"));
    }
}
