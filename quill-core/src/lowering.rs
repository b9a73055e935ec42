//! Lowering: rewrite structured control flow into labels and gotos.
//!
//! ```text
//! if c then                 gotoFalse c END; then; END:
//! if c then else e          gotoFalse c ELSE; then; goto END; ELSE:; e; END:
//! while c body              goto CONTINUE; BODY:; body; CONTINUE:; gotoTrue c BODY; BREAK:
//! do body while c           BODY:; body; CONTINUE:; gotoTrue c BODY; BREAK:
//! for v = l to u step s     var v = l; let upperBound = u;
//!                           while v <= upperBound { body; CONTINUE:; v = v + s }
//! ```
//!
//! `BREAK` and `CONTINUE` are the labels the binder gave the loop, so
//! `break` and `continue` inside the body keep their targets. All other
//! labels are fresh `LABEL_<n>`s, numbered from 1 for each function.
//!
//! The result is flattened into a single block.

use std::sync::Arc;

use crate::bound_tree::*;
use crate::lexer::TokenKind;
use crate::operators::{BoundBinaryOperator, BoundBinaryOperatorKind};
use crate::rewriter::BoundTreeRewriter;
use crate::symbols::{FunctionSymbol, VariableSymbol};
use crate::types::TypeSymbol;

/// Lower and flatten a function body. A void function whose body can run
/// off its end gets an explicit trailing `return`.
pub fn lower(function: &FunctionSymbol, body: BoundStatement) -> BoundBlockStatement {
    let mut lowerer = Lowerer { label_count: 0 };
    let mut block = flatten(lowerer.rewrite_statement(body));

    if function.return_type.is_void() && block.statements.last().is_none_or(can_fall_through) {
        block.statements.push(BoundStatement::Return(None));
    }

    log::trace!(
        "lowered '{}': {} statements, {} labels",
        function.name,
        block.statements.len(),
        lowerer.label_count
    );
    block
}

fn can_fall_through(statement: &BoundStatement) -> bool {
    !matches!(statement, BoundStatement::Return(_) | BoundStatement::Goto(_))
}

/// Inline nested blocks into one, in order. Uses an explicit work stack so
/// deeply nested input cannot exhaust the call stack.
fn flatten(statement: BoundStatement) -> BoundBlockStatement {
    let mut statements = Vec::new();
    let mut pending = vec![statement];

    while let Some(current) = pending.pop() {
        match current {
            BoundStatement::Block(block) => pending.extend(block.statements.into_iter().rev()),
            other => statements.push(other),
        }
    }

    BoundBlockStatement::new(statements)
}

struct Lowerer {
    label_count: usize,
}

impl Lowerer {
    fn generate_label(&mut self) -> BoundLabel {
        self.label_count += 1;
        BoundLabel::new(format!("LABEL_{}", self.label_count))
    }
}

impl BoundTreeRewriter for Lowerer {
    fn rewrite_if_statement(&mut self, node: BoundIfStatement) -> BoundStatement {
        let BoundIfStatement {
            condition,
            then_statement,
            else_statement,
        } = node;

        let lowered = match else_statement {
            None => {
                let end_label = self.generate_label();
                BoundStatement::block(vec![
                    BoundStatement::goto_if(end_label.clone(), condition, false),
                    *then_statement,
                    BoundStatement::Label(end_label),
                ])
            }
            Some(else_statement) => {
                let else_label = self.generate_label();
                let end_label = self.generate_label();
                BoundStatement::block(vec![
                    BoundStatement::goto_if(else_label.clone(), condition, false),
                    *then_statement,
                    BoundStatement::Goto(end_label.clone()),
                    BoundStatement::Label(else_label),
                    *else_statement,
                    BoundStatement::Label(end_label),
                ])
            }
        };

        self.rewrite_statement(lowered)
    }

    fn rewrite_while_statement(&mut self, node: BoundWhileStatement) -> BoundStatement {
        let body_label = self.generate_label();
        let lowered = BoundStatement::block(vec![
            BoundStatement::Goto(node.continue_label.clone()),
            BoundStatement::Label(body_label.clone()),
            *node.body,
            BoundStatement::Label(node.continue_label),
            BoundStatement::goto_if(body_label, node.condition, true),
            BoundStatement::Label(node.break_label),
        ]);

        self.rewrite_statement(lowered)
    }

    fn rewrite_do_while_statement(&mut self, node: BoundDoWhileStatement) -> BoundStatement {
        let body_label = self.generate_label();
        let lowered = BoundStatement::block(vec![
            BoundStatement::Label(body_label.clone()),
            *node.body,
            BoundStatement::Label(node.continue_label),
            BoundStatement::goto_if(body_label, node.condition, true),
            BoundStatement::Label(node.break_label),
        ]);

        self.rewrite_statement(lowered)
    }

    fn rewrite_for_statement(&mut self, node: BoundForStatement) -> BoundStatement {
        let BoundForStatement {
            variable,
            lower_bound,
            upper_bound,
            step,
            body,
            break_label,
            continue_label,
        } = node;

        let mut statements = vec![BoundStatement::declare(variable.clone(), lower_bound)];

        let upper = hidden_local("upperBound", &variable);
        statements.push(BoundStatement::declare(upper.clone(), upper_bound));

        let step = if step.constant().is_some() {
            step
        } else {
            let step_value = hidden_local("stepValue", &variable);
            statements.push(BoundStatement::declare(step_value.clone(), step));
            BoundExpression::variable(step_value)
        };

        let condition = BoundExpression::binary(
            BoundExpression::variable(variable.clone()),
            int_operator(TokenKind::LessEquals, BoundBinaryOperatorKind::LessOrEquals, TypeSymbol::Bool),
            BoundExpression::variable(upper),
        );
        let increment = BoundExpression::assignment(
            variable.clone(),
            BoundExpression::binary(
                BoundExpression::variable(variable),
                int_operator(TokenKind::Plus, BoundBinaryOperatorKind::Addition, TypeSymbol::Int),
                step,
            ),
        );

        let loop_body = BoundStatement::block(vec![
            *body,
            BoundStatement::Label(continue_label),
            BoundStatement::Expression(increment),
        ]);
        statements.push(BoundStatement::While(BoundWhileStatement {
            condition,
            body: Box::new(loop_body),
            break_label,
            continue_label: self.generate_label(),
        }));

        self.rewrite_statement(BoundStatement::block(statements))
    }
}

/// A read-only `int` living alongside the loop variable.
fn hidden_local(name: &str, loop_variable: &VariableSymbol) -> Arc<VariableSymbol> {
    VariableSymbol::new(name, TypeSymbol::Int, true, loop_variable.scope)
}

fn int_operator(token: TokenKind, kind: BoundBinaryOperatorKind, result_type: TypeSymbol) -> BoundBinaryOperator {
    BoundBinaryOperator {
        token,
        kind,
        left_type: TypeSymbol::Int,
        right_type: TypeSymbol::Int,
        result_type,
    }
}
