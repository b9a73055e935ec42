//! Structure-preserving rewriting of bound trees.
//!
//! Every method has a default that rebuilds its node from rewritten
//! children, so an implementor overrides only the node kinds it wants to
//! replace. Nodes are taken by value: a rewrite moves the tree rather than
//! copying it.

use crate::bound_tree::*;

pub trait BoundTreeRewriter {
    fn rewrite_statement(&mut self, statement: BoundStatement) -> BoundStatement {
        match statement {
            BoundStatement::Block(node) => self.rewrite_block_statement(node),
            BoundStatement::VariableDeclaration(node) => self.rewrite_variable_declaration(node),
            BoundStatement::If(node) => self.rewrite_if_statement(node),
            BoundStatement::While(node) => self.rewrite_while_statement(node),
            BoundStatement::DoWhile(node) => self.rewrite_do_while_statement(node),
            BoundStatement::For(node) => self.rewrite_for_statement(node),
            BoundStatement::ConditionalGoto(node) => self.rewrite_conditional_goto(node),
            BoundStatement::Label(label) => BoundStatement::Label(label),
            BoundStatement::Goto(label) => BoundStatement::Goto(label),
            BoundStatement::Return(expression) => {
                BoundStatement::Return(expression.map(|expression| self.rewrite_expression(expression)))
            }
            BoundStatement::Expression(expression) => BoundStatement::Expression(self.rewrite_expression(expression)),
        }
    }

    fn rewrite_block_statement(&mut self, node: BoundBlockStatement) -> BoundStatement {
        let statements = node
            .statements
            .into_iter()
            .map(|statement| self.rewrite_statement(statement))
            .collect();
        BoundStatement::block(statements)
    }

    fn rewrite_variable_declaration(&mut self, node: BoundVariableDeclaration) -> BoundStatement {
        let initializer = self.rewrite_expression(node.initializer);
        BoundStatement::declare(node.variable, initializer)
    }

    fn rewrite_if_statement(&mut self, node: BoundIfStatement) -> BoundStatement {
        BoundStatement::If(BoundIfStatement {
            condition: self.rewrite_expression(node.condition),
            then_statement: Box::new(self.rewrite_statement(*node.then_statement)),
            else_statement: node
                .else_statement
                .map(|statement| Box::new(self.rewrite_statement(*statement))),
        })
    }

    fn rewrite_while_statement(&mut self, node: BoundWhileStatement) -> BoundStatement {
        BoundStatement::While(BoundWhileStatement {
            condition: self.rewrite_expression(node.condition),
            body: Box::new(self.rewrite_statement(*node.body)),
            ..node
        })
    }

    fn rewrite_do_while_statement(&mut self, node: BoundDoWhileStatement) -> BoundStatement {
        BoundStatement::DoWhile(BoundDoWhileStatement {
            body: Box::new(self.rewrite_statement(*node.body)),
            condition: self.rewrite_expression(node.condition),
            ..node
        })
    }

    fn rewrite_for_statement(&mut self, node: BoundForStatement) -> BoundStatement {
        BoundStatement::For(BoundForStatement {
            lower_bound: self.rewrite_expression(node.lower_bound),
            upper_bound: self.rewrite_expression(node.upper_bound),
            step: self.rewrite_expression(node.step),
            body: Box::new(self.rewrite_statement(*node.body)),
            ..node
        })
    }

    fn rewrite_conditional_goto(&mut self, node: BoundConditionalGoto) -> BoundStatement {
        BoundStatement::ConditionalGoto(BoundConditionalGoto {
            condition: self.rewrite_expression(node.condition),
            ..node
        })
    }

    fn rewrite_expression(&mut self, expression: BoundExpression) -> BoundExpression {
        let BoundExpression { kind, ty } = expression;
        let kind = match kind {
            kind @ (BoundExpressionKind::Error | BoundExpressionKind::Literal(_) | BoundExpressionKind::Variable(_)) => {
                kind
            }
            BoundExpressionKind::Assignment { variable, expression } => BoundExpressionKind::Assignment {
                variable,
                expression: Box::new(self.rewrite_expression(*expression)),
            },
            BoundExpressionKind::Unary { op, operand } => BoundExpressionKind::Unary {
                op,
                operand: Box::new(self.rewrite_expression(*operand)),
            },
            BoundExpressionKind::Binary { left, op, right } => BoundExpressionKind::Binary {
                left: Box::new(self.rewrite_expression(*left)),
                op,
                right: Box::new(self.rewrite_expression(*right)),
            },
            BoundExpressionKind::Call { function, arguments } => BoundExpressionKind::Call {
                function,
                arguments: arguments
                    .into_iter()
                    .map(|argument| self.rewrite_expression(argument))
                    .collect(),
            },
            BoundExpressionKind::Conversion(expression) => {
                BoundExpressionKind::Conversion(Box::new(self.rewrite_expression(*expression)))
            }
        };
        BoundExpression { kind, ty }
    }
}
