//! Source-like dump of bound trees, used by `#showProgram` and `#dump`.
//!
//! Lowered bodies print as one statement per line with labels outdented:
//!
//! ```text
//! function count(n: int): int
//! {
//!     var i = 0
//!     goto continue_1
//! LABEL_1:
//!     i = i + 1
//! continue_1:
//!     goto LABEL_1 if i < n
//! break_1:
//!     return i
//! }
//! ```

use std::fmt::{self, Write};

use crate::bound_tree::*;
use crate::parser::binary_precedence;
use crate::symbols::FunctionSymbol;
use crate::value::Value;

/// Write `function`'s signature followed by its body.
pub fn write_function(out: &mut impl Write, function: &FunctionSymbol, body: &BoundBlockStatement) -> fmt::Result {
    writeln!(out, "{function}")?;
    let mut printer = Printer { out, indent: 0 };
    printer.write_block(body)
}

pub fn write_statement(out: &mut impl Write, statement: &BoundStatement) -> fmt::Result {
    Printer { out, indent: 0 }.write_statement(statement)
}

pub fn expression_to_string(expression: &BoundExpression) -> String {
    let mut text = String::new();
    // Writing to a String cannot fail.
    let _ = Printer {
        out: &mut text,
        indent: 0,
    }
    .write_expression(expression);
    text
}

struct Printer<'w, W: Write> {
    out: &'w mut W,
    indent: usize,
}

impl<W: Write> Printer<'_, W> {
    fn line_start(&mut self, indent: usize) -> fmt::Result {
        for _ in 0..indent {
            self.out.write_str("    ")?;
        }
        Ok(())
    }

    fn write_block(&mut self, block: &BoundBlockStatement) -> fmt::Result {
        self.line_start(self.indent)?;
        self.out.write_str("{\n")?;
        self.indent += 1;
        for statement in &block.statements {
            self.write_statement(statement)?;
        }
        self.indent -= 1;
        self.line_start(self.indent)?;
        self.out.write_str("}\n")
    }

    /// Nested statements are indented one level unless they are blocks.
    fn write_nested(&mut self, statement: &BoundStatement) -> fmt::Result {
        if let BoundStatement::Block(block) = statement {
            return self.write_block(block);
        }
        self.indent += 1;
        let result = self.write_statement(statement);
        self.indent -= 1;
        result
    }

    fn write_statement(&mut self, statement: &BoundStatement) -> fmt::Result {
        match statement {
            BoundStatement::Block(block) => self.write_block(block),
            BoundStatement::VariableDeclaration(declaration) => {
                self.line_start(self.indent)?;
                let keyword = if declaration.variable.is_read_only { "let" } else { "var" };
                write!(self.out, "{keyword} {} = ", declaration.variable.name)?;
                self.write_expression(&declaration.initializer)?;
                self.out.write_char('\n')
            }
            BoundStatement::If(node) => {
                self.line_start(self.indent)?;
                self.out.write_str("if ")?;
                self.write_expression(&node.condition)?;
                self.out.write_char('\n')?;
                self.write_nested(&node.then_statement)?;
                if let Some(else_statement) = &node.else_statement {
                    self.line_start(self.indent)?;
                    self.out.write_str("else\n")?;
                    self.write_nested(else_statement)?;
                }
                Ok(())
            }
            BoundStatement::While(node) => {
                self.line_start(self.indent)?;
                self.out.write_str("while ")?;
                self.write_expression(&node.condition)?;
                self.out.write_char('\n')?;
                self.write_nested(&node.body)
            }
            BoundStatement::DoWhile(node) => {
                self.line_start(self.indent)?;
                self.out.write_str("do\n")?;
                self.write_nested(&node.body)?;
                self.line_start(self.indent)?;
                self.out.write_str("while ")?;
                self.write_expression(&node.condition)?;
                self.out.write_char('\n')
            }
            BoundStatement::For(node) => {
                self.line_start(self.indent)?;
                write!(self.out, "for {} = ", node.variable.name)?;
                self.write_expression(&node.lower_bound)?;
                self.out.write_str(" to ")?;
                self.write_expression(&node.upper_bound)?;
                if node.step.constant() != Some(&Value::Int(1)) {
                    self.out.write_str(" step ")?;
                    self.write_expression(&node.step)?;
                }
                self.out.write_char('\n')?;
                self.write_nested(&node.body)
            }
            BoundStatement::Label(label) => {
                self.line_start(self.indent.saturating_sub(1))?;
                writeln!(self.out, "{label}:")
            }
            BoundStatement::Goto(label) => {
                self.line_start(self.indent)?;
                writeln!(self.out, "goto {label}")
            }
            BoundStatement::ConditionalGoto(node) => {
                self.line_start(self.indent)?;
                let keyword = if node.jump_if_true { "if" } else { "unless" };
                write!(self.out, "goto {} {keyword} ", node.label)?;
                self.write_expression(&node.condition)?;
                self.out.write_char('\n')
            }
            BoundStatement::Return(expression) => {
                self.line_start(self.indent)?;
                self.out.write_str("return")?;
                if let Some(expression) = expression {
                    self.out.write_char(' ')?;
                    self.write_expression(expression)?;
                }
                self.out.write_char('\n')
            }
            BoundStatement::Expression(expression) => {
                self.line_start(self.indent)?;
                self.write_expression(expression)?;
                self.out.write_char('\n')
            }
        }
    }

    fn write_expression(&mut self, expression: &BoundExpression) -> fmt::Result {
        match &expression.kind {
            BoundExpressionKind::Error => self.out.write_char('?'),
            BoundExpressionKind::Literal(value) => self.write_literal(value),
            BoundExpressionKind::Variable(variable) => self.out.write_str(&variable.name),
            BoundExpressionKind::Assignment { variable, expression } => {
                write!(self.out, "{} = ", variable.name)?;
                self.write_expression(expression)
            }
            BoundExpressionKind::Unary { op, operand } => {
                self.out.write_str(op.symbol())?;
                self.write_operand(operand, u8::MAX)
            }
            BoundExpressionKind::Binary { left, op, right } => {
                let precedence = binary_precedence(op.token);
                self.write_operand(left, precedence)?;
                write!(self.out, " {} ", op.symbol())?;
                // Left-associative: an equal-precedence right operand needs parentheses.
                self.write_operand(right, precedence + 1)
            }
            BoundExpressionKind::Call { function, arguments } => {
                write!(self.out, "{}(", function.name)?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        self.out.write_str(", ")?;
                    }
                    self.write_expression(argument)?;
                }
                self.out.write_char(')')
            }
            BoundExpressionKind::Conversion(operand) => {
                write!(self.out, "{}(", expression.ty)?;
                self.write_expression(operand)?;
                self.out.write_char(')')
            }
        }
    }

    /// Write `operand`, parenthesized when it binds looser than `minimum`.
    fn write_operand(&mut self, operand: &BoundExpression, minimum: u8) -> fmt::Result {
        let precedence = match &operand.kind {
            BoundExpressionKind::Binary { op, .. } => binary_precedence(op.token),
            BoundExpressionKind::Assignment { .. } => 0,
            _ => u8::MAX,
        };
        if precedence < minimum {
            self.out.write_char('(')?;
            self.write_expression(operand)?;
            self.out.write_char(')')
        } else {
            self.write_expression(operand)
        }
    }

    fn write_literal(&mut self, value: &Value) -> fmt::Result {
        match value {
            Value::String(text) => write!(self.out, "\"{}\"", text.replace('"', "\"\"")),
            Value::Enum { symbol, .. } => write!(self.out, "{}.{value}", symbol.name),
            other => write!(self.out, "{other}"),
        }
    }
}
