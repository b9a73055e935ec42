//! Tree-walking evaluator.
//!
//! Runs bound statements directly. Lowered bodies are plain label/goto
//! sequences, but structured statements are executed as well: a jump that
//! its block cannot resolve propagates outward until a block holding the
//! label, or a loop owning it as break/continue target, handles it.
//!
//! Built-ins talk to the outside world only through a [`Host`].

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use rand::prelude::*;
use thiserror::Error;

use crate::binder::BoundProgram;
use crate::bound_tree::*;
use crate::builtins::BuiltinKind;
use crate::operators::{BoundBinaryOperatorKind, BoundUnaryOperatorKind};
use crate::symbols::{FunctionSymbol, VariableScope, VariableSymbol};
use crate::types::TypeSymbol;
use crate::value::Value;

/// Global variable storage, owned by the caller and shared across
/// submissions.
pub type Globals = HashMap<Arc<VariableSymbol>, Value>;

/// I/O surface used by the built-in functions.
pub trait Host {
    fn print(&mut self, text: &str);
    fn input(&mut self) -> String;
    /// A random integer in `0..max`; `max` is always positive.
    fn random(&mut self, max: i32) -> i32;
}

/// Host backed by stdin/stdout and the thread-local RNG.
pub struct ConsoleHost {
    rng: ThreadRng,
}

impl ConsoleHost {
    pub fn new() -> Self {
        ConsoleHost { rng: thread_rng() }
    }
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for ConsoleHost {
    fn print(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(error) = writeln!(stdout, "{text}") {
            log::warn!("failed to write output: {error}");
        }
    }

    fn input(&mut self) -> String {
        let mut line = String::new();
        if let Err(error) = io::stdin().lock().read_line(&mut line) {
            log::warn!("failed to read input: {error}");
        }
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    fn random(&mut self, max: i32) -> i32 {
        self.rng.gen_range(0..max)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot convert '{value}' to {target}")]
    InvalidConversion { value: String, target: TypeSymbol },

    #[error("invalid argument {value} for '{function}'")]
    InvalidArgument { function: String, value: String },

    #[error("function '{0}' has no body")]
    MissingFunctionBody(String),

    #[error("malformed bound tree: {0}")]
    MalformedTree(String),
}

type Result<T> = std::result::Result<T, RuntimeError>;

/// How control leaves a statement.
#[derive(Debug)]
enum Flow<'t> {
    Next,
    Jump(&'t BoundLabel),
    Return(Option<Value>),
}

pub struct Evaluator<'a> {
    program: &'a BoundProgram,
    globals: &'a mut Globals,
    host: &'a mut dyn Host,
    /// Locals and parameters, one map per active call.
    frames: Vec<HashMap<Arc<VariableSymbol>, Value>>,
    last_value: Option<Value>,
}

impl<'a> Evaluator<'a> {
    pub fn new(program: &'a BoundProgram, globals: &'a mut Globals, host: &'a mut dyn Host) -> Self {
        Evaluator {
            program,
            globals,
            host,
            frames: Vec::new(),
            last_value: None,
        }
    }

    /// Run the submission's entry function. The result is the value of a
    /// top-level `return`, or else of the last expression statement run
    /// by the entry function itself.
    pub fn evaluate(&mut self) -> Result<Option<Value>> {
        let program = self.program;
        let Some(entry) = program.global_scope.entry_function() else {
            return Ok(None);
        };
        let body = program
            .function_body(entry)
            .ok_or_else(|| RuntimeError::MissingFunctionBody(entry.name.clone()))?;
        self.evaluate_body(body)
    }

    /// Run `body` as the entry function.
    pub fn evaluate_body(&mut self, body: &BoundBlockStatement) -> Result<Option<Value>> {
        self.frames.push(HashMap::new());
        self.last_value = None;
        let flow = self.execute_block(&body.statements);
        self.frames.pop();

        match flow? {
            Flow::Return(Some(value)) => Ok(Some(value)),
            Flow::Return(None) | Flow::Next => Ok(self.last_value.take()),
            Flow::Jump(label) => Err(unknown_label(label)),
        }
    }

    fn execute_block<'t>(&mut self, statements: &'t [BoundStatement]) -> Result<Flow<'t>> {
        let labels: HashMap<&BoundLabel, usize> = statements
            .iter()
            .enumerate()
            .filter_map(|(index, statement)| match statement {
                BoundStatement::Label(label) => Some((label, index)),
                _ => None,
            })
            .collect();

        let mut index = 0;
        while let Some(statement) = statements.get(index) {
            match self.execute_statement(statement)? {
                Flow::Next => index += 1,
                Flow::Jump(label) => match labels.get(label) {
                    Some(target) => index = *target,
                    None => return Ok(Flow::Jump(label)),
                },
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn execute_statement<'t>(&mut self, statement: &'t BoundStatement) -> Result<Flow<'t>> {
        match statement {
            BoundStatement::Block(block) => self.execute_block(&block.statements),
            BoundStatement::VariableDeclaration(declaration) => {
                let value = self.evaluate_expression(&declaration.initializer)?;
                self.assign(&declaration.variable, value);
                Ok(Flow::Next)
            }
            BoundStatement::If(node) => {
                if self.evaluate_condition(&node.condition)? {
                    self.execute_statement(&node.then_statement)
                } else if let Some(else_statement) = &node.else_statement {
                    self.execute_statement(else_statement)
                } else {
                    Ok(Flow::Next)
                }
            }
            BoundStatement::While(node) => {
                while self.evaluate_condition(&node.condition)? {
                    match self.execute_loop_body(&node.body, &node.break_label, &node.continue_label)? {
                        LoopControl::Continue => {}
                        LoopControl::Break => break,
                        LoopControl::Exit(flow) => return Ok(flow),
                    }
                }
                Ok(Flow::Next)
            }
            BoundStatement::DoWhile(node) => {
                loop {
                    match self.execute_loop_body(&node.body, &node.break_label, &node.continue_label)? {
                        LoopControl::Continue => {}
                        LoopControl::Break => break,
                        LoopControl::Exit(flow) => return Ok(flow),
                    }
                    if !self.evaluate_condition(&node.condition)? {
                        break;
                    }
                }
                Ok(Flow::Next)
            }
            BoundStatement::For(node) => self.execute_for(node),
            BoundStatement::Label(_) => Ok(Flow::Next),
            BoundStatement::Goto(label) => Ok(Flow::Jump(label)),
            BoundStatement::ConditionalGoto(node) => {
                if self.evaluate_condition(&node.condition)? == node.jump_if_true {
                    Ok(Flow::Jump(&node.label))
                } else {
                    Ok(Flow::Next)
                }
            }
            BoundStatement::Return(expression) => {
                let value = match expression {
                    Some(expression) => Some(self.evaluate_expression(expression)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
            BoundStatement::Expression(expression) => {
                let value = self.evaluate_expression(expression)?;
                if self.frames.len() == 1 {
                    self.last_value = (value != Value::Void).then_some(value);
                }
                Ok(Flow::Next)
            }
        }
    }

    /// Bounds and step are evaluated once, in that order, before the
    /// first iteration. The upper bound is inclusive.
    fn execute_for<'t>(&mut self, node: &'t BoundForStatement) -> Result<Flow<'t>> {
        let lower = self.evaluate_int(&node.lower_bound)?;
        self.assign(&node.variable, Value::Int(lower));
        let upper = self.evaluate_int(&node.upper_bound)?;
        let step = self.evaluate_int(&node.step)?;

        loop {
            let current = self.int_variable(&node.variable)?;
            if current > upper {
                break;
            }
            match self.execute_loop_body(&node.body, &node.break_label, &node.continue_label)? {
                LoopControl::Continue => {}
                LoopControl::Break => break,
                LoopControl::Exit(flow) => return Ok(flow),
            }
            let current = self.int_variable(&node.variable)?;
            self.assign(&node.variable, Value::Int(current.wrapping_add(step)));
        }
        Ok(Flow::Next)
    }

    fn execute_loop_body<'t>(
        &mut self,
        body: &'t BoundStatement,
        break_label: &BoundLabel,
        continue_label: &BoundLabel,
    ) -> Result<LoopControl<'t>> {
        Ok(match self.execute_statement(body)? {
            Flow::Next => LoopControl::Continue,
            Flow::Jump(label) if label == continue_label => LoopControl::Continue,
            Flow::Jump(label) if label == break_label => LoopControl::Break,
            flow => LoopControl::Exit(flow),
        })
    }

    fn variable_value(&self, variable: &Arc<VariableSymbol>) -> Result<Value> {
        let storage = match variable.scope {
            VariableScope::Global => Some(&*self.globals),
            VariableScope::Local | VariableScope::Parameter => self.frames.last(),
        };
        storage
            .and_then(|storage| storage.get(variable))
            .cloned()
            .ok_or_else(|| RuntimeError::MalformedTree(format!("variable '{}' read before assignment", variable.name)))
    }

    fn int_variable(&self, variable: &Arc<VariableSymbol>) -> Result<i32> {
        let value = self.variable_value(variable)?;
        value.as_int().ok_or_else(|| type_mismatch("int", &value))
    }

    fn assign(&mut self, variable: &Arc<VariableSymbol>, value: Value) {
        match variable.scope {
            VariableScope::Global => {
                self.globals.insert(variable.clone(), value);
            }
            VariableScope::Local | VariableScope::Parameter => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.insert(variable.clone(), value);
                }
            }
        }
    }

    fn evaluate_condition(&mut self, expression: &BoundExpression) -> Result<bool> {
        let value = self.evaluate_expression(expression)?;
        value.as_bool().ok_or_else(|| type_mismatch("bool", &value))
    }

    fn evaluate_int(&mut self, expression: &BoundExpression) -> Result<i32> {
        let value = self.evaluate_expression(expression)?;
        value.as_int().ok_or_else(|| type_mismatch("int", &value))
    }

    fn evaluate_expression(&mut self, expression: &BoundExpression) -> Result<Value> {
        match &expression.kind {
            BoundExpressionKind::Error => Err(RuntimeError::MalformedTree("error expression reached".to_string())),
            BoundExpressionKind::Literal(value) => Ok(value.clone()),
            BoundExpressionKind::Variable(variable) => self.variable_value(variable),
            BoundExpressionKind::Assignment { variable, expression } => {
                let value = self.evaluate_expression(expression)?;
                self.assign(variable, value.clone());
                Ok(value)
            }
            BoundExpressionKind::Unary { op, operand } => {
                let operand = self.evaluate_expression(operand)?;
                evaluate_unary(op.kind, operand)
            }
            BoundExpressionKind::Binary { left, op, right } => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                evaluate_binary(op.kind, left, right)
            }
            BoundExpressionKind::Call { function, arguments } => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate_expression(argument)?);
                }
                self.call(function, values)
            }
            BoundExpressionKind::Conversion(operand) => {
                let value = self.evaluate_expression(operand)?;
                convert(value, &expression.ty)
            }
        }
    }

    fn call(&mut self, function: &FunctionSymbol, arguments: Vec<Value>) -> Result<Value> {
        if let Some(kind) = function.builtin() {
            return self.call_builtin(kind, &function.name, arguments);
        }

        let program = self.program;
        let body = program
            .function_body(function)
            .ok_or_else(|| RuntimeError::MissingFunctionBody(function.name.clone()))?;

        let frame = function.parameters.iter().cloned().zip(arguments).collect();
        self.frames.push(frame);
        let flow = self.execute_block(&body.statements);
        self.frames.pop();

        match flow? {
            Flow::Return(value) => Ok(value.unwrap_or(Value::Void)),
            Flow::Next => Ok(Value::Void),
            Flow::Jump(label) => Err(unknown_label(label)),
        }
    }

    fn call_builtin(&mut self, kind: BuiltinKind, name: &str, arguments: Vec<Value>) -> Result<Value> {
        match kind {
            BuiltinKind::Print => {
                let text = arguments.first().map(Value::to_string).unwrap_or_default();
                self.host.print(&text);
                Ok(Value::Void)
            }
            BuiltinKind::Input => Ok(Value::String(self.host.input())),
            BuiltinKind::Rnd => match arguments.first() {
                Some(Value::Int(max)) if *max > 0 => Ok(Value::Int(self.host.random(*max))),
                other => Err(RuntimeError::InvalidArgument {
                    function: name.to_string(),
                    value: other.map(Value::to_string).unwrap_or_default(),
                }),
            },
        }
    }
}

enum LoopControl<'t> {
    Continue,
    Break,
    /// Leave the loop entirely: a return or a jump to an outer label.
    Exit(Flow<'t>),
}

fn unknown_label(label: &BoundLabel) -> RuntimeError {
    RuntimeError::MalformedTree(format!("jump to unknown label '{label}'"))
}

fn type_mismatch(expected: &str, value: &Value) -> RuntimeError {
    RuntimeError::MalformedTree(format!("expected {expected}, found {}", value.ty()))
}

fn evaluate_unary(kind: BoundUnaryOperatorKind, operand: Value) -> Result<Value> {
    use BoundUnaryOperatorKind::*;

    match (kind, operand) {
        (Identity, Value::Int(value)) => Ok(Value::Int(value)),
        (Negation, Value::Int(value)) => Ok(Value::Int(value.wrapping_neg())),
        (OnesComplement, Value::Int(value)) => Ok(Value::Int(!value)),
        (LogicalNegation, Value::Bool(value)) => Ok(Value::Bool(!value)),
        (kind, operand) => Err(RuntimeError::MalformedTree(format!(
            "unary {kind:?} applied to {}",
            operand.ty()
        ))),
    }
}

fn evaluate_binary(kind: BoundBinaryOperatorKind, left: Value, right: Value) -> Result<Value> {
    use BoundBinaryOperatorKind::*;

    let value = match (kind, left, right) {
        (Equals, left, right) => Value::Bool(left == right),
        (NotEquals, left, right) => Value::Bool(left != right),

        (Addition, Value::String(left), Value::String(right)) => Value::String(left + &right),

        (Division | Modulo, Value::Int(_), Value::Int(0)) => return Err(RuntimeError::DivisionByZero),
        (kind, Value::Int(left), Value::Int(right)) => match kind {
            Addition => Value::Int(left.wrapping_add(right)),
            Subtraction => Value::Int(left.wrapping_sub(right)),
            Multiplication => Value::Int(left.wrapping_mul(right)),
            Division => Value::Int(left.wrapping_div(right)),
            Modulo => Value::Int(left.wrapping_rem(right)),
            BitwiseAnd => Value::Int(left & right),
            BitwiseOr => Value::Int(left | right),
            BitwiseXor => Value::Int(left ^ right),
            Less => Value::Bool(left < right),
            LessOrEquals => Value::Bool(left <= right),
            Greater => Value::Bool(left > right),
            GreaterOrEquals => Value::Bool(left >= right),
            kind => return Err(operand_mismatch(kind, "int")),
        },

        (kind, Value::Bool(left), Value::Bool(right)) => match kind {
            BitwiseAnd | LogicalAnd => Value::Bool(left & right),
            BitwiseOr | LogicalOr => Value::Bool(left | right),
            BitwiseXor => Value::Bool(left ^ right),
            kind => return Err(operand_mismatch(kind, "bool")),
        },

        (kind, left, _) => return Err(operand_mismatch(kind, left.ty().name())),
    };
    Ok(value)
}

fn operand_mismatch(kind: BoundBinaryOperatorKind, ty: &str) -> RuntimeError {
    RuntimeError::MalformedTree(format!("binary {kind:?} applied to {ty}"))
}

fn convert(value: Value, target: &TypeSymbol) -> Result<Value> {
    let invalid = |value: &Value| RuntimeError::InvalidConversion {
        value: value.to_string(),
        target: target.clone(),
    };

    match (target, value) {
        (TypeSymbol::String, value) => Ok(Value::String(value.to_string())),
        (TypeSymbol::Int, Value::String(text)) => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| invalid(&Value::String(text.clone()))),
        (TypeSymbol::Bool, Value::String(text)) => match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid(&Value::String(text.clone()))),
        },
        (target, value) if value.ty() == *target => Ok(value),
        (_, value) => Err(invalid(&value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{bind_global_scope, bind_program};
    use crate::syntax_tree::SyntaxTree;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingHost {
        output: Vec<String>,
        input: VecDeque<String>,
    }

    impl Host for RecordingHost {
        fn print(&mut self, text: &str) {
            self.output.push(text.to_string());
        }

        fn input(&mut self) -> String {
            self.input.pop_front().unwrap_or_default()
        }

        fn random(&mut self, max: i32) -> i32 {
            max - 1
        }
    }

    fn compile(source: &str) -> BoundProgram {
        let tree = SyntaxTree::parse(source);
        let global = Arc::new(bind_global_scope(true, None, &[tree]));
        let program = bind_program(None, global);
        assert!(program.diagnostics.is_empty(), "{:?}", program.diagnostics);
        program
    }

    fn run_with(source: &str, host: &mut RecordingHost) -> Result<Option<Value>> {
        let program = compile(source);
        let mut globals = Globals::new();
        Evaluator::new(&program, &mut globals, host).evaluate()
    }

    fn run(source: &str) -> Result<Option<Value>> {
        run_with(source, &mut RecordingHost::default())
    }

    #[test]
    fn for_loop_upper_bound_is_inclusive() {
        let source = "var sum = 0\nfor i = 1 to 3 { sum = sum + i }\nsum";
        assert_eq!(run(source), Ok(Some(Value::Int(6))));
    }

    #[test]
    fn evaluates_operators() {
        assert_eq!(run("1 + 2 * 3"), Ok(Some(Value::Int(7))));
        assert_eq!(run("(1 + 2) * 3"), Ok(Some(Value::Int(9))));
        assert_eq!(run("-7 / 2"), Ok(Some(Value::Int(-3))));
        assert_eq!(run("7 % 3"), Ok(Some(Value::Int(1))));
        assert_eq!(run("~1"), Ok(Some(Value::Int(-2))));
        assert_eq!(run("6 & 3 | 8 ^ 1"), Ok(Some(Value::Int(11))));
        assert_eq!(run("!true || 1 < 2 && 3 >= 3"), Ok(Some(Value::Bool(true))));
        assert_eq!(run("\"ab\" + \"cd\" == \"abcd\""), Ok(Some(Value::Bool(true))));
        assert_eq!(run("2147483647 + 1"), Ok(Some(Value::Int(i32::MIN))));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        assert_eq!(run("var z = 0\n1 / z"), Err(RuntimeError::DivisionByZero));
        assert_eq!(run("var z = 0\n1 % z"), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn converts_between_strings_and_values() {
        assert_eq!(run("int(\"42\") + 1"), Ok(Some(Value::Int(43))));
        assert_eq!(run("bool(\"true\")"), Ok(Some(Value::Bool(true))));
        assert_eq!(run("string(12) + string(false)"), Ok(Some(Value::from("12false"))));
        assert_eq!(
            run("int(\"x\")"),
            Err(RuntimeError::InvalidConversion {
                value: "x".to_string(),
                target: TypeSymbol::Int
            })
        );
    }

    #[test]
    fn calls_functions_and_builtins() {
        let source = "\
function fib(n: int): int {
    if n < 2 return n
    return fib(n - 1) + fib(n - 2)
}
print(\"fib \" + string(fib(10)))
print(input())
rnd(6)
";
        let mut host = RecordingHost {
            input: VecDeque::from(["echo".to_string()]),
            ..RecordingHost::default()
        };
        assert_eq!(run_with(source, &mut host), Ok(Some(Value::Int(5))));
        assert_eq!(host.output, ["fib 55", "echo"]);
    }

    #[test]
    fn rejects_non_positive_random_bounds() {
        assert!(matches!(run("rnd(0)"), Err(RuntimeError::InvalidArgument { .. })));
    }

    #[test]
    fn break_and_continue_target_their_loop() {
        let source = "\
var total = 0
var i = 0
while true {
    i = i + 1
    if i > 10 break
    if i % 2 == 0 continue
    for j = 1 to 100 {
        if j > 2 break
        total = total + j
    }
}
total";
        assert_eq!(run(source), Ok(Some(Value::Int(15))));
    }

    #[test]
    fn do_while_runs_at_least_once() {
        assert_eq!(run("var n = 10\ndo n = n + 1 while n < 5\nn"), Ok(Some(Value::Int(11))));
    }

    #[test]
    fn last_expression_statement_is_the_result() {
        assert_eq!(run("var x = 1"), Ok(None));
        assert_eq!(run("1\nprint(\"x\")"), Ok(None));
        assert_eq!(run("var x = 1\nx = 5"), Ok(Some(Value::Int(5))));
        assert_eq!(run("return 3\n4"), Ok(Some(Value::Int(3))));
    }

    #[test]
    fn enum_values_compare_and_print() {
        let source = "enum Light { Red, Green }\nvar l = Light.Green\nstring(l) + string(l == Light.Red)";
        assert_eq!(run(source), Ok(Some(Value::from("Greenfalse"))));
    }

    #[test]
    fn globals_persist_across_submissions() {
        let first_global = Arc::new(bind_global_scope(true, None, &[SyntaxTree::parse("var x = 20")]));
        let first = Arc::new(bind_program(None, first_global.clone()));
        let second_global = Arc::new(bind_global_scope(
            true,
            Some(first_global),
            &[SyntaxTree::parse("x = x + 1\nx")],
        ));
        let second = bind_program(Some(first.clone()), second_global);

        let mut globals = Globals::new();
        let mut host = RecordingHost::default();
        Evaluator::new(&first, &mut globals, &mut host).evaluate().expect("first");
        let result = Evaluator::new(&second, &mut globals, &mut host).evaluate();
        assert_eq!(result, Ok(Some(Value::Int(21))));
    }

    #[test]
    fn lowered_and_structured_trees_agree() {
        let sources = [
            "var s = 0\nfor i = 1 to 10 step 3 { s = s + i }\ns",
            "var s = 0\nvar i = 0\nwhile i < 5 { i = i + 1\n if i == 3 continue\n s = s + i }\ns",
            "var x = 3\nif x > 2 { x = x * 10 } else { x = 0 }\nx",
            "var n = 0\ndo { n = n + 2 } while n < 7\nn",
            "var s = \"\"\nfor i = 5 to 1 { s = s + \"never\" }\nfor i = 1 to 3 { if i == 2 break\n s = s + string(i) }\ns",
            "var st = 2\nvar c = 0\nfor i = 0 to 10 step st { c = c + 1 }\nc",
        ];

        for source in sources {
            let program = compile(source);
            let structured = BoundBlockStatement::new(program.global_scope.statements.clone());

            let mut structured_host = RecordingHost::default();
            let mut globals = Globals::new();
            let expected = Evaluator::new(&program, &mut globals, &mut structured_host).evaluate_body(&structured);

            let mut lowered_host = RecordingHost::default();
            let mut globals = Globals::new();
            let actual = Evaluator::new(&program, &mut globals, &mut lowered_host).evaluate();

            assert_eq!(actual, expected, "{source}");
            assert_eq!(lowered_host.output, structured_host.output, "{source}");
            assert!(expected.is_ok_and(|value| value.is_some()), "{source}");
        }
    }
}
