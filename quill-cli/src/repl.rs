//! Line-oriented interactive shell.
//!
//! Lines accumulate into a submission until it parses without running off
//! the end of the input (or two blank lines force it). Each submission is
//! compiled on top of the previous successful one and shares its globals.
//! Lines starting with `#` at the start of a submission are meta-commands.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use quill_core::ast::{SyntaxNode, ends_with_missing_token};
use quill_core::{Compilation, ConsoleHost, Globals, Symbol, SyntaxTree};

use crate::report::write_diagnostics;

struct MetaCommand {
    name: &'static str,
    parameters: &'static [&'static str],
    description: &'static str,
    handler: fn(&mut Repl, &[&str]) -> Result<()>,
}

#[rustfmt::skip]
const META_COMMANDS: &[MetaCommand] = &[
    MetaCommand { name: "help",        parameters: &[],           description: "Shows help.",                      handler: Repl::help },
    MetaCommand { name: "exit",        parameters: &[],           description: "Exits the REPL.",                  handler: Repl::exit },
    MetaCommand { name: "reset",       parameters: &[],           description: "Clears all previous submissions.", handler: Repl::reset },
    MetaCommand { name: "showTree",    parameters: &[],           description: "Shows the parse tree.",            handler: Repl::toggle_tree },
    MetaCommand { name: "showProgram", parameters: &[],           description: "Shows the bound tree.",            handler: Repl::toggle_program },
    MetaCommand { name: "load",        parameters: &["path"],     description: "Loads a script file.",             handler: Repl::load },
    MetaCommand { name: "ls",          parameters: &[],           description: "Lists all symbols.",               handler: Repl::list_symbols },
    MetaCommand { name: "dump",        parameters: &["function"], description: "Shows bound tree of a function.",  handler: Repl::dump },
];

pub struct Repl {
    previous: Option<Arc<Compilation>>,
    globals: Globals,
    host: ConsoleHost,
    show_tree: bool,
    show_program: bool,
    done: bool,
}

impl Repl {
    pub fn new(show_tree: bool, show_program: bool) -> Self {
        Repl {
            previous: None,
            globals: Globals::new(),
            host: ConsoleHost::new(),
            show_tree,
            show_program,
            done: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let interactive = io::stdin().is_terminal();
        let mut submission = String::new();

        while !self.done {
            if interactive {
                print!("{}", if submission.is_empty() { "» " } else { "· " });
                io::stdout().flush().context("failed to flush prompt")?;
            }

            // Not locked across iterations: `input()` reads stdin too.
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line).context("failed to read from stdin")?;
            if read == 0 {
                if !submission.trim().is_empty() {
                    self.submit(SyntaxTree::parse(submission.as_str()))?;
                }
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']);

            if submission.is_empty() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(command) = line.strip_prefix('#') {
                    if let Err(error) = self.dispatch(command) {
                        eprintln!("error: {error:#}");
                    }
                    continue;
                }
            }

            submission.push_str(line);
            submission.push('\n');
            if is_complete_submission(&submission) {
                let text = std::mem::take(&mut submission);
                self.submit(SyntaxTree::parse(text))?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, line: &str) -> Result<()> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arguments: Vec<&str> = words.collect();

        let Some(command) = META_COMMANDS.iter().find(|command| command.name == name) else {
            bail!("invalid command #{name}");
        };
        if arguments.len() != command.parameters.len() {
            bail!("invalid number of arguments\nusage: {}", usage(command));
        }
        (command.handler)(self, &arguments)
    }

    fn submit(&mut self, tree: Arc<SyntaxTree>) -> Result<()> {
        if self.show_tree {
            print!("{tree}");
        }

        let compilation = Arc::new(Compilation::script(self.previous.clone(), tree));
        if self.show_program {
            let mut text = String::new();
            compilation.emit_program_tree(&mut text)?;
            print!("{text}");
        }

        match compilation.evaluate(&mut self.globals, &mut self.host) {
            Ok(result) if result.diagnostics.is_empty() => {
                if let Some(value) = result.value {
                    println!("{value}");
                }
                self.previous = Some(compilation);
            }
            Ok(result) => {
                write_diagnostics(&mut io::stderr().lock(), &result.diagnostics)
                    .context("failed to write diagnostics")?;
            }
            Err(error) => eprintln!("runtime error: {error}"),
        }
        Ok(())
    }

    /// The newest successful submission, or an empty one that only sees
    /// the built-ins.
    fn latest(&self) -> Arc<Compilation> {
        self.previous
            .clone()
            .unwrap_or_else(|| Arc::new(Compilation::script(None, SyntaxTree::parse(""))))
    }

    fn help(&mut self, _: &[&str]) -> Result<()> {
        let width = META_COMMANDS.iter().map(|command| usage(command).len()).max().unwrap_or(0);
        for command in META_COMMANDS {
            println!("{:<width$}  {}", usage(command), command.description);
        }
        Ok(())
    }

    fn exit(&mut self, _: &[&str]) -> Result<()> {
        self.done = true;
        Ok(())
    }

    fn reset(&mut self, _: &[&str]) -> Result<()> {
        self.previous = None;
        self.globals.clear();
        Ok(())
    }

    fn toggle_tree(&mut self, _: &[&str]) -> Result<()> {
        self.show_tree = !self.show_tree;
        println!("{}", if self.show_tree { "Showing parse trees." } else { "Not showing parse trees." });
        Ok(())
    }

    fn toggle_program(&mut self, _: &[&str]) -> Result<()> {
        self.show_program = !self.show_program;
        println!("{}", if self.show_program { "Showing bound tree." } else { "Not showing bound tree." });
        Ok(())
    }

    fn load(&mut self, arguments: &[&str]) -> Result<()> {
        let path = arguments[0];
        let tree = SyntaxTree::load(path).with_context(|| format!("failed to load {path}"))?;
        self.submit(tree)
    }

    fn list_symbols(&mut self, _: &[&str]) -> Result<()> {
        let mut symbols = self.latest().symbols();
        symbols.sort_by(|a, b| a.kind_name().cmp(b.kind_name()).then_with(|| a.name().cmp(b.name())));
        for symbol in symbols {
            println!("{symbol}");
        }
        Ok(())
    }

    fn dump(&mut self, arguments: &[&str]) -> Result<()> {
        let name = arguments[0];
        let latest = self.latest();
        let function = latest.symbols().into_iter().find_map(|symbol| match symbol {
            Symbol::Function(function) if function.name == name => Some(function),
            _ => None,
        });
        let Some(function) = function else {
            bail!("function '{name}' does not exist");
        };

        let mut text = String::new();
        latest.emit_tree(&function, &mut text)?;
        print!("{text}");
        Ok(())
    }
}

fn usage(command: &MetaCommand) -> String {
    let mut usage = format!("#{}", command.name);
    for parameter in command.parameters {
        usage.push_str(&format!(" <{parameter}>"));
    }
    usage
}

/// A submission is complete once it parses without fabricating a token
/// at its end, or when it ends in two blank lines.
fn is_complete_submission(text: &str) -> bool {
    if text.ends_with("\n\n\n") {
        return true;
    }
    let tree = SyntaxTree::parse(text);
    match tree.root().members.last() {
        Some(member) => !ends_with_missing_token(SyntaxNode::Member(member)),
        None => true,
    }
}
