//! Binding: resolve names and types, producing the bound tree.
//!
//! Binding runs in two passes. [`bind_global_scope`] declares every enum
//! and function of a submission and binds its global statements;
//! [`bind_program`] then binds and lowers each function body against the
//! finished global scope.
//!
//! Earlier submissions are chained through `previous`. Their symbols are
//! visible through one scope layer per submission, so a name declared
//! again in a later submission shadows instead of conflicting.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ast::*;
use crate::bound_tree::*;
use crate::builtins::builtin_functions;
use crate::control_flow::all_paths_return;
use crate::diagnostic::{Diagnostic, DiagnosticBag};
use crate::lexer::{SyntaxToken, TokenKind};
use crate::lowering::lower;
use crate::operators::{bind_binary_operator, bind_unary_operator};
use crate::scope::{ScopeChain, ScopeKind};
use crate::source::SourceText;
use crate::span::TextSpan;
use crate::symbols::*;
use crate::syntax_tree::SyntaxTree;
use crate::types::{TypeSymbol, classify_conversion};
use crate::value::Value;

/// Name of the function synthesized from a script's global statements.
pub const SCRIPT_FUNCTION_NAME: &str = "$eval";

/// Name of the program entry point.
pub const MAIN_FUNCTION_NAME: &str = "main";

/// Top-level symbols of one submission plus its bound global statements.
#[derive(Debug)]
pub struct BoundGlobalScope {
    pub previous: Option<Arc<BoundGlobalScope>>,
    pub is_script: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Entry point in program mode, declared or synthesized.
    pub main_function: Option<Arc<FunctionSymbol>>,
    /// `$eval` in script mode when there are global statements.
    pub script_function: Option<Arc<FunctionSymbol>>,
    /// Functions declared with `function`, in declaration order.
    pub functions: Vec<Arc<FunctionSymbol>>,
    /// Redeclarations that lost to an earlier function of the same name.
    /// Their bodies are bound for diagnostics only.
    pub duplicate_functions: Vec<Arc<FunctionSymbol>>,
    pub enums: Vec<Arc<EnumSymbol>>,
    pub variables: Vec<Arc<VariableSymbol>>,
    /// Global statements, bound but not lowered.
    pub statements: Vec<BoundStatement>,
}

impl BoundGlobalScope {
    /// The function that runs this submission's global statements.
    pub fn entry_function(&self) -> Option<&Arc<FunctionSymbol>> {
        if self.is_script {
            self.script_function.as_ref()
        } else {
            self.main_function.as_ref()
        }
    }
}

/// Lowered function bodies of one submission.
#[derive(Debug)]
pub struct BoundProgram {
    pub previous: Option<Arc<BoundProgram>>,
    pub global_scope: Arc<BoundGlobalScope>,
    /// Global scope diagnostics followed by those of the function bodies.
    pub diagnostics: Vec<Diagnostic>,
    bodies: HashMap<Arc<FunctionSymbol>, BoundBlockStatement>,
    order: Vec<Arc<FunctionSymbol>>,
}

impl BoundProgram {
    /// Body of `function`, searching earlier submissions as well.
    pub fn function_body(&self, function: &FunctionSymbol) -> Option<&BoundBlockStatement> {
        let mut program = Some(self);
        while let Some(current) = program {
            if let Some(body) = current.bodies.get(function) {
                return Some(body);
            }
            program = current.previous.as_deref();
        }
        None
    }

    /// Functions bound in this submission with their bodies, declared
    /// functions first and the synthesized entry point last.
    pub fn functions(&self) -> impl Iterator<Item = (&Arc<FunctionSymbol>, &BoundBlockStatement)> {
        self.order
            .iter()
            .filter_map(|function| self.bodies.get(function).map(|body| (function, body)))
    }
}

pub fn bind_global_scope(
    is_script: bool,
    previous: Option<Arc<BoundGlobalScope>>,
    syntax_trees: &[Arc<SyntaxTree>],
) -> BoundGlobalScope {
    let text = syntax_trees
        .first()
        .map(|tree| tree.text().clone())
        .unwrap_or_else(|| Arc::new(SourceText::new("")));
    let mut scopes = parent_scopes(previous.as_deref());
    scopes.push(ScopeKind::Global);
    let mut binder = Binder::new(scopes, None, text);

    let mut enums = Vec::new();
    for tree in syntax_trees {
        binder.diagnostics.set_text(tree.text().clone());
        for member in &tree.root().members {
            if let MemberSyntax::Enum(syntax) = member
                && let Some(symbol) = binder.bind_enum_declaration(syntax)
            {
                enums.push(symbol);
            }
        }
    }

    let mut functions = Vec::new();
    let mut duplicate_functions = Vec::new();
    for tree in syntax_trees {
        binder.diagnostics.set_text(tree.text().clone());
        for (member_index, member) in tree.root().members.iter().enumerate() {
            let MemberSyntax::Function(syntax) = member else {
                continue;
            };
            match binder.bind_function_declaration(syntax, tree, member_index) {
                Some(Ok(function)) => functions.push(function),
                Some(Err(duplicate)) => duplicate_functions.push(duplicate),
                None => {}
            }
        }
    }

    // (tree, first global statement) for every tree that has any.
    let mut global_files: Vec<(&Arc<SyntaxTree>, &StatementSyntax)> = Vec::new();
    let mut statements = Vec::new();
    for tree in syntax_trees {
        binder.diagnostics.set_text(tree.text().clone());
        let mut first = None;
        for member in &tree.root().members {
            if let MemberSyntax::GlobalStatement(syntax) = member {
                first.get_or_insert(syntax);
                statements.push(binder.bind_global_statement(syntax, is_script));
            }
        }
        if let Some(first) = first {
            global_files.push((tree, first));
        }
    }

    if global_files.len() > 1 {
        for (tree, statement) in &global_files {
            binder.diagnostics.set_text(tree.text().clone());
            binder
                .diagnostics
                .report_only_one_file_can_have_global_statements(statement.span());
        }
    }

    let mut main_function = None;
    let mut script_function = None;
    if is_script {
        if !global_files.is_empty() {
            script_function = Some(FunctionSymbol::new(
                SCRIPT_FUNCTION_NAME,
                Vec::new(),
                TypeSymbol::Void,
                FunctionOrigin::Synthesized,
            ));
        }
    } else {
        let declared_main = functions.iter().find(|function| function.name == MAIN_FUNCTION_NAME);
        if let Some(main) = declared_main {
            let identifier_span = main_identifier(main);
            if let Some((text, span)) = identifier_span.clone()
                && (!main.parameters.is_empty() || !main.return_type.is_void())
            {
                binder.diagnostics.set_text(text);
                binder.diagnostics.report_main_must_have_correct_signature(span);
            }
            if !global_files.is_empty() {
                if let Some((text, span)) = identifier_span {
                    binder.diagnostics.set_text(text);
                    binder.diagnostics.report_cannot_mix_main_and_global_statements(span);
                }
                for (tree, statement) in &global_files {
                    binder.diagnostics.set_text(tree.text().clone());
                    binder
                        .diagnostics
                        .report_cannot_mix_main_and_global_statements(statement.span());
                }
            }
            main_function = Some(main.clone());
        } else if !global_files.is_empty() {
            main_function = Some(FunctionSymbol::new(
                MAIN_FUNCTION_NAME,
                Vec::new(),
                TypeSymbol::Void,
                FunctionOrigin::Synthesized,
            ));
        }
    }

    let mut variables: Vec<Arc<VariableSymbol>> = binder
        .scopes
        .innermost()
        .filter_map(|symbol| match symbol {
            Symbol::Variable(variable) => Some(variable.clone()),
            _ => None,
        })
        .collect();
    variables.sort_by_key(|variable| variable.id);

    let diagnostics = binder.diagnostics.into_vec();
    log::debug!(
        "bound global scope: {} functions, {} enums, {} variables, {} diagnostics",
        functions.len(),
        enums.len(),
        variables.len(),
        diagnostics.len()
    );

    BoundGlobalScope {
        previous,
        is_script,
        diagnostics,
        main_function,
        script_function,
        functions,
        duplicate_functions,
        enums,
        variables,
        statements,
    }
}

fn main_identifier(main: &FunctionSymbol) -> Option<(Arc<SourceText>, TextSpan)> {
    let declaration = main.declaration()?;
    let syntax = declaration.syntax()?;
    Some((declaration.tree.text().clone(), syntax.identifier.span()))
}

pub fn bind_program(previous: Option<Arc<BoundProgram>>, global_scope: Arc<BoundGlobalScope>) -> BoundProgram {
    let mut diagnostics = global_scope.diagnostics.clone();
    let mut bodies = HashMap::new();
    let mut order = Vec::new();

    for function in &global_scope.functions {
        if let Some(lowered) = bind_function_body(&global_scope, function, &mut diagnostics) {
            bodies.insert(function.clone(), lowered);
            order.push(function.clone());
        }
    }
    for duplicate in &global_scope.duplicate_functions {
        bind_function_body(&global_scope, duplicate, &mut diagnostics);
    }

    if let Some(entry) = global_scope.entry_function()
        && matches!(entry.origin, FunctionOrigin::Synthesized)
    {
        let body = lower(entry, BoundStatement::block(global_scope.statements.clone()));
        bodies.insert(entry.clone(), body);
        order.push(entry.clone());
    }

    log::debug!(
        "bound program: {} function bodies, {} diagnostics",
        bodies.len(),
        diagnostics.len()
    );

    BoundProgram {
        previous,
        global_scope,
        diagnostics,
        bodies,
        order,
    }
}

/// Bind and lower a declared function's body, checking that a non-void
/// function returns on every path.
fn bind_function_body(
    global_scope: &BoundGlobalScope,
    function: &Arc<FunctionSymbol>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<BoundBlockStatement> {
    let declaration = function.declaration()?;
    let syntax = declaration.syntax()?;

    let mut binder = Binder::new(
        global_scopes(global_scope),
        Some(function.clone()),
        declaration.tree.text().clone(),
    );
    binder.scopes.push(ScopeKind::Function);
    for parameter in &function.parameters {
        binder.scopes.declare_or_replace(Symbol::Variable(parameter.clone()));
    }

    let body = binder.bind_block_statement(&syntax.body);
    let lowered = lower(function, BoundStatement::Block(body));
    if !function.return_type.is_void() && !function.return_type.is_error() && !all_paths_return(&lowered) {
        binder.diagnostics.report_all_paths_must_return(syntax.identifier.span());
    }

    diagnostics.extend(binder.diagnostics.into_vec());
    Some(lowered)
}

/// Built-ins plus one layer per earlier submission, oldest first.
fn parent_scopes(previous: Option<&BoundGlobalScope>) -> ScopeChain {
    let mut chain = ScopeChain::new();
    chain.push(ScopeKind::Builtins);
    for function in builtin_functions() {
        chain.declare_or_replace(Symbol::Function(function.clone()));
    }

    let mut submissions = Vec::new();
    let mut current = previous;
    while let Some(global) = current {
        submissions.push(global);
        current = global.previous.as_deref();
    }

    for global in submissions.into_iter().rev() {
        chain.push(ScopeKind::Previous);
        declare_globals(&mut chain, global);
    }
    chain
}

/// The chain seen by function bodies of `global`.
fn global_scopes(global: &BoundGlobalScope) -> ScopeChain {
    let mut chain = parent_scopes(global.previous.as_deref());
    chain.push(ScopeKind::Global);
    declare_globals(&mut chain, global);
    chain
}

fn declare_globals(chain: &mut ScopeChain, global: &BoundGlobalScope) {
    for symbol in &global.enums {
        chain.declare_or_replace(Symbol::Enum(symbol.clone()));
    }
    for function in &global.functions {
        chain.declare_or_replace(Symbol::Function(function.clone()));
    }
    for variable in &global.variables {
        chain.declare_or_replace(Symbol::Variable(variable.clone()));
    }
}

struct Binder {
    scopes: ScopeChain,
    /// Function whose body is being bound; `None` for global statements.
    function: Option<Arc<FunctionSymbol>>,
    diagnostics: DiagnosticBag,
    /// (break, continue) labels of the enclosing loops.
    loops: Vec<(BoundLabel, BoundLabel)>,
    label_count: usize,
    is_script: bool,
}

impl Binder {
    fn new(scopes: ScopeChain, function: Option<Arc<FunctionSymbol>>, text: Arc<SourceText>) -> Self {
        Binder {
            scopes,
            function,
            diagnostics: DiagnosticBag::new(text),
            loops: Vec::new(),
            label_count: 0,
            is_script: false,
        }
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn bind_enum_declaration(&mut self, syntax: &EnumDeclarationSyntax) -> Option<Arc<EnumSymbol>> {
        let mut members: Vec<String> = Vec::new();
        for member in syntax.members.iter() {
            if member.is_missing {
                continue;
            }
            if members.contains(&member.text) {
                self.diagnostics.report_symbol_already_declared(member.span(), &member.text);
                continue;
            }
            members.push(member.text.clone());
        }

        if syntax.identifier.is_missing {
            return None;
        }
        let symbol = EnumSymbol::new(syntax.identifier.text.clone(), members);
        match self.scopes.declare(Symbol::Enum(symbol.clone())) {
            Ok(()) => Some(symbol),
            Err(_) => {
                self.diagnostics
                    .report_symbol_already_declared(syntax.identifier.span(), &syntax.identifier.text);
                None
            }
        }
    }

    fn bind_function_declaration(
        &mut self,
        syntax: &FunctionDeclarationSyntax,
        tree: &Arc<SyntaxTree>,
        member_index: usize,
    ) -> Option<Result<Arc<FunctionSymbol>, Arc<FunctionSymbol>>> {
        let mut parameters = Vec::new();
        let mut seen = HashSet::new();
        for parameter in syntax.parameters.iter() {
            let name = &parameter.identifier.text;
            if !seen.insert(name.as_str()) {
                self.diagnostics
                    .report_symbol_already_declared(parameter.identifier.span(), name);
                continue;
            }
            let ty = self.bind_type_clause(&parameter.type_clause);
            parameters.push(VariableSymbol::parameter(name.clone(), ty));
        }

        let return_type = syntax
            .type_clause
            .as_ref()
            .map_or(TypeSymbol::Void, |clause| self.bind_type_clause(clause));

        if syntax.identifier.is_missing {
            return None;
        }
        let function = FunctionSymbol::new(
            syntax.identifier.text.clone(),
            parameters,
            return_type,
            FunctionOrigin::Declared(FunctionDeclaration {
                tree: tree.clone(),
                member_index,
            }),
        );
        match self.scopes.declare(Symbol::Function(function.clone())) {
            Ok(()) => Some(Ok(function)),
            Err(_) => {
                self.diagnostics
                    .report_symbol_already_declared(syntax.identifier.span(), &syntax.identifier.text);
                Some(Err(function))
            }
        }
    }

    fn bind_type_clause(&mut self, clause: &TypeClauseSyntax) -> TypeSymbol {
        let identifier = &clause.identifier;
        if identifier.is_missing {
            return TypeSymbol::Error;
        }
        match self.lookup_type(&identifier.text) {
            Some(ty) => ty,
            None => {
                self.diagnostics.report_undefined_type(identifier.span(), &identifier.text);
                TypeSymbol::Error
            }
        }
    }

    fn lookup_type(&self, name: &str) -> Option<TypeSymbol> {
        TypeSymbol::lookup_primitive(name).or_else(|| match self.scopes.lookup(name) {
            Some(Symbol::Enum(symbol)) => Some(TypeSymbol::Enum(symbol.clone())),
            _ => None,
        })
    }

    fn declare_variable(&mut self, identifier: &SyntaxToken, ty: TypeSymbol, is_read_only: bool) -> Arc<VariableSymbol> {
        let scope = if self.scopes.is_global() {
            VariableScope::Global
        } else {
            VariableScope::Local
        };
        let variable = VariableSymbol::new(identifier.text.clone(), ty, is_read_only, scope);

        if !identifier.is_missing && self.scopes.declare(Symbol::Variable(variable.clone())).is_err() {
            self.diagnostics
                .report_symbol_already_declared(identifier.span(), &identifier.text);
        }
        variable
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn bind_global_statement(&mut self, syntax: &StatementSyntax, is_script: bool) -> BoundStatement {
        self.is_script = is_script;
        self.bind_statement(syntax)
    }

    fn bind_statement(&mut self, syntax: &StatementSyntax) -> BoundStatement {
        match syntax {
            StatementSyntax::Block(block) => BoundStatement::Block(self.bind_block_statement(block)),
            StatementSyntax::VariableDeclaration(declaration) => self.bind_variable_declaration(declaration),
            StatementSyntax::If(statement) => self.bind_if_statement(statement),
            StatementSyntax::While(statement) => self.bind_while_statement(statement),
            StatementSyntax::DoWhile(statement) => self.bind_do_while_statement(statement),
            StatementSyntax::For(statement) => self.bind_for_statement(statement),
            StatementSyntax::Break(keyword) => self.bind_jump(keyword, true),
            StatementSyntax::Continue(keyword) => self.bind_jump(keyword, false),
            StatementSyntax::Return(statement) => self.bind_return_statement(statement),
            StatementSyntax::Expression(expression) => self.bind_expression_statement(expression),
        }
    }

    fn bind_block_statement(&mut self, syntax: &BlockStatementSyntax) -> BoundBlockStatement {
        self.scopes.push(ScopeKind::Block);
        let statements = syntax
            .statements
            .iter()
            .map(|statement| self.bind_statement(statement))
            .collect();
        self.scopes.pop();
        BoundBlockStatement::new(statements)
    }

    fn bind_variable_declaration(&mut self, syntax: &VariableDeclarationSyntax) -> BoundStatement {
        let is_read_only = syntax.keyword.kind == TokenKind::Let;
        let declared_type = syntax
            .type_clause
            .as_ref()
            .map(|clause| self.bind_type_clause(clause));
        let initializer = self.bind_expression(&syntax.initializer);

        let (ty, initializer) = match declared_type {
            Some(ty) => {
                let initializer = self.bind_conversion(syntax.initializer.span(), initializer, &ty, false);
                (ty, initializer)
            }
            None => (initializer.ty.clone(), initializer),
        };

        let variable = self.declare_variable(&syntax.identifier, ty, is_read_only);
        BoundStatement::declare(variable, initializer)
    }

    fn bind_if_statement(&mut self, syntax: &IfStatementSyntax) -> BoundStatement {
        let condition = self.bind_expression_of_type(&syntax.condition, &TypeSymbol::Bool);
        let then_statement = self.bind_statement(&syntax.then_statement);
        let else_statement = syntax
            .else_clause
            .as_ref()
            .map(|clause| Box::new(self.bind_statement(&clause.else_statement)));

        BoundStatement::If(BoundIfStatement {
            condition,
            then_statement: Box::new(then_statement),
            else_statement,
        })
    }

    fn bind_while_statement(&mut self, syntax: &WhileStatementSyntax) -> BoundStatement {
        let condition = self.bind_expression_of_type(&syntax.condition, &TypeSymbol::Bool);
        let (body, break_label, continue_label) = self.bind_loop_body(&syntax.body);
        BoundStatement::While(BoundWhileStatement {
            condition,
            body: Box::new(body),
            break_label,
            continue_label,
        })
    }

    fn bind_do_while_statement(&mut self, syntax: &DoWhileStatementSyntax) -> BoundStatement {
        let (body, break_label, continue_label) = self.bind_loop_body(&syntax.body);
        let condition = self.bind_expression_of_type(&syntax.condition, &TypeSymbol::Bool);
        BoundStatement::DoWhile(BoundDoWhileStatement {
            body: Box::new(body),
            condition,
            break_label,
            continue_label,
        })
    }

    fn bind_for_statement(&mut self, syntax: &ForStatementSyntax) -> BoundStatement {
        let lower_bound = self.bind_expression_of_type(&syntax.lower_bound, &TypeSymbol::Int);
        let upper_bound = self.bind_expression_of_type(&syntax.upper_bound, &TypeSymbol::Int);
        let step = match &syntax.step_clause {
            Some(clause) => self.bind_expression_of_type(&clause.expression, &TypeSymbol::Int),
            None => BoundExpression::literal(1),
        };

        self.scopes.push(ScopeKind::Block);
        let variable = self.declare_variable(&syntax.identifier, TypeSymbol::Int, true);
        let (body, break_label, continue_label) = self.bind_loop_body(&syntax.body);
        self.scopes.pop();

        BoundStatement::For(BoundForStatement {
            variable,
            lower_bound,
            upper_bound,
            step,
            body: Box::new(body),
            break_label,
            continue_label,
        })
    }

    fn bind_loop_body(&mut self, body: &StatementSyntax) -> (BoundStatement, BoundLabel, BoundLabel) {
        self.label_count += 1;
        let break_label = BoundLabel::new(format!("break_{}", self.label_count));
        let continue_label = BoundLabel::new(format!("continue_{}", self.label_count));

        self.loops.push((break_label.clone(), continue_label.clone()));
        let body = self.bind_statement(body);
        self.loops.pop();

        (body, break_label, continue_label)
    }

    fn bind_jump(&mut self, keyword: &SyntaxToken, is_break: bool) -> BoundStatement {
        match self.loops.last() {
            Some((break_label, continue_label)) => {
                let target = if is_break { break_label } else { continue_label };
                BoundStatement::Goto(target.clone())
            }
            None => {
                self.diagnostics
                    .report_invalid_break_or_continue(keyword.span(), &keyword.text);
                BoundStatement::Expression(BoundExpression::error())
            }
        }
    }

    fn bind_return_statement(&mut self, syntax: &ReturnStatementSyntax) -> BoundStatement {
        let Some(expression_syntax) = &syntax.expression else {
            if let Some(function) = &self.function
                && !function.return_type.is_void()
                && !function.return_type.is_error()
            {
                self.diagnostics
                    .report_missing_return_expression(syntax.return_keyword.span(), &function.return_type);
            }
            return BoundStatement::Return(None);
        };

        let expression = match self.function.clone() {
            None => {
                let expression = self.bind_expression(expression_syntax);
                if !self.is_script {
                    self.diagnostics
                        .report_invalid_return_with_value_in_global_statements(expression_syntax.span());
                }
                expression
            }
            Some(function) if function.return_type.is_void() => {
                let expression = self.bind_expression_allowing_void(expression_syntax);
                self.diagnostics
                    .report_invalid_return_expression(expression_syntax.span(), &function.name);
                expression
            }
            Some(function) => self.bind_expression_of_type(expression_syntax, &function.return_type),
        };
        BoundStatement::Return(Some(expression))
    }

    fn bind_expression_statement(&mut self, syntax: &ExpressionSyntax) -> BoundStatement {
        let expression = self.bind_expression_allowing_void(syntax);
        let allowed = matches!(
            expression.kind,
            BoundExpressionKind::Error | BoundExpressionKind::Assignment { .. } | BoundExpressionKind::Call { .. }
        ) || (self.is_script && self.function.is_none());

        if !allowed {
            self.diagnostics.report_invalid_expression_statement(syntax.span());
        }
        BoundStatement::Expression(expression)
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    /// Bind an expression that must produce a value.
    fn bind_expression(&mut self, syntax: &ExpressionSyntax) -> BoundExpression {
        let expression = self.bind_expression_allowing_void(syntax);
        if expression.ty.is_void() {
            self.diagnostics.report_expression_must_have_value(syntax.span());
            return BoundExpression::error();
        }
        expression
    }

    fn bind_expression_of_type(&mut self, syntax: &ExpressionSyntax, ty: &TypeSymbol) -> BoundExpression {
        let expression = self.bind_expression(syntax);
        self.bind_conversion(syntax.span(), expression, ty, false)
    }

    fn bind_expression_allowing_void(&mut self, syntax: &ExpressionSyntax) -> BoundExpression {
        match syntax {
            ExpressionSyntax::Literal(token) => self.bind_literal_expression(token),
            ExpressionSyntax::Name(token) => self.bind_name_expression(token),
            ExpressionSyntax::Assignment(assignment) => self.bind_assignment_expression(assignment),
            ExpressionSyntax::Unary(unary) => self.bind_unary_expression(unary),
            ExpressionSyntax::Binary(binary) => self.bind_binary_expression(binary),
            ExpressionSyntax::Parenthesized(parenthesized) => self.bind_expression(&parenthesized.expression),
            ExpressionSyntax::Call(call) => self.bind_call_expression(call),
            ExpressionSyntax::MemberAccess(access) => self.bind_member_access_expression(access),
        }
    }

    fn bind_literal_expression(&mut self, token: &SyntaxToken) -> BoundExpression {
        match (token.kind, &token.value) {
            (TokenKind::True, _) => BoundExpression::literal(true),
            (TokenKind::False, _) => BoundExpression::literal(false),
            (_, Some(value)) => BoundExpression::literal(value.clone()),
            (TokenKind::Number, None) => {
                self.diagnostics.report_invalid_number(token.span(), &token.text);
                BoundExpression::error()
            }
            _ => BoundExpression::error(),
        }
    }

    fn bind_name_expression(&mut self, token: &SyntaxToken) -> BoundExpression {
        match self.bind_variable_reference(token) {
            Some(variable) => BoundExpression::variable(variable),
            None => BoundExpression::error(),
        }
    }

    /// Resolve `token` to a variable, reporting when it is not one. A
    /// missing token was already reported by the parser.
    fn bind_variable_reference(&mut self, token: &SyntaxToken) -> Option<Arc<VariableSymbol>> {
        if token.is_missing {
            return None;
        }
        match self.scopes.lookup(&token.text) {
            Some(Symbol::Variable(variable)) => Some(variable.clone()),
            Some(_) => {
                self.diagnostics.report_not_a_variable(token.span(), &token.text);
                None
            }
            None => {
                self.diagnostics.report_undefined_name(token.span(), &token.text);
                None
            }
        }
    }

    fn bind_assignment_expression(&mut self, syntax: &AssignmentExpressionSyntax) -> BoundExpression {
        let expression = self.bind_expression(&syntax.expression);
        let Some(variable) = self.bind_variable_reference(&syntax.identifier) else {
            return BoundExpression::error();
        };

        if variable.is_read_only {
            self.diagnostics.report_cannot_assign(syntax.equals.span(), &variable.name);
        }
        let expression = self.bind_conversion(syntax.expression.span(), expression, &variable.ty, false);
        BoundExpression::assignment(variable, expression)
    }

    fn bind_unary_expression(&mut self, syntax: &UnaryExpressionSyntax) -> BoundExpression {
        let operand = self.bind_expression(&syntax.operand);
        if operand.is_error() {
            return BoundExpression::error();
        }

        match bind_unary_operator(syntax.operator.kind, &operand.ty) {
            Some(op) => BoundExpression::unary(op, operand),
            None => {
                self.diagnostics
                    .report_undefined_unary_operator(syntax.operator.span(), &syntax.operator.text, &operand.ty);
                BoundExpression::error()
            }
        }
    }

    fn bind_binary_expression(&mut self, syntax: &BinaryExpressionSyntax) -> BoundExpression {
        let left = self.bind_expression(&syntax.left);
        let right = self.bind_expression(&syntax.right);
        if left.is_error() || right.is_error() {
            return BoundExpression::error();
        }

        match bind_binary_operator(syntax.operator.kind, &left.ty, &right.ty) {
            Some(op) => BoundExpression::binary(left, op, right),
            None => {
                self.diagnostics.report_undefined_binary_operator(
                    syntax.operator.span(),
                    &syntax.operator.text,
                    &left.ty,
                    &right.ty,
                );
                BoundExpression::error()
            }
        }
    }

    fn bind_call_expression(&mut self, syntax: &CallExpressionSyntax) -> BoundExpression {
        let identifier = &syntax.identifier;

        if syntax.arguments.len() == 1
            && let Some(ty) = TypeSymbol::lookup_primitive(&identifier.text)
        {
            let argument = &syntax.arguments.items[0];
            let expression = self.bind_expression(argument);
            return self.bind_conversion(argument.span(), expression, &ty, true);
        }

        let arguments: Vec<BoundExpression> = syntax
            .arguments
            .iter()
            .map(|argument| self.bind_expression(argument))
            .collect();

        let function = match self.scopes.lookup(&identifier.text) {
            Some(Symbol::Function(function)) => function.clone(),
            Some(_) => {
                self.diagnostics.report_not_a_function(identifier.span(), &identifier.text);
                return BoundExpression::error();
            }
            None => {
                if !identifier.is_missing {
                    self.diagnostics.report_undefined_name(identifier.span(), &identifier.text);
                }
                return BoundExpression::error();
            }
        };

        let expected = function.parameters.len();
        if arguments.len() != expected {
            let span = match (syntax.arguments.items.get(expected), syntax.arguments.items.last()) {
                (Some(first_extra), Some(last)) => first_extra.span().cover(last.span()),
                _ => syntax.close_paren.span(),
            };
            self.diagnostics
                .report_wrong_argument_count(span, &function.name, expected, arguments.len());
            return BoundExpression::error();
        }

        let arguments = arguments
            .into_iter()
            .zip(syntax.arguments.iter())
            .zip(&function.parameters)
            .map(|((argument, argument_syntax), parameter)| {
                self.bind_conversion(argument_syntax.span(), argument, &parameter.ty, false)
            })
            .collect();

        BoundExpression::call(function, arguments)
    }

    fn bind_member_access_expression(&mut self, syntax: &MemberAccessExpressionSyntax) -> BoundExpression {
        let target = &syntax.target;
        let symbol = match self.scopes.lookup(&target.text) {
            Some(Symbol::Enum(symbol)) => symbol.clone(),
            Some(_) => {
                self.diagnostics.report_not_an_enum(target.span(), &target.text);
                return BoundExpression::error();
            }
            None => {
                self.diagnostics.report_undefined_name(target.span(), &target.text);
                return BoundExpression::error();
            }
        };

        let member = &syntax.member;
        if member.is_missing {
            return BoundExpression::error();
        }
        match symbol.member_index(&member.text) {
            Some(index) => BoundExpression::literal(Value::Enum { symbol, index }),
            None => {
                self.diagnostics
                    .report_undefined_enum_member(member.span(), &symbol.name, &member.text);
                BoundExpression::error()
            }
        }
    }

    /// Convert `expression` to `target`. Implicit conversions are limited
    /// to identity; explicit ones are reported unless `allow_explicit`.
    /// Error types never produce a report.
    fn bind_conversion(
        &mut self,
        span: TextSpan,
        expression: BoundExpression,
        target: &TypeSymbol,
        allow_explicit: bool,
    ) -> BoundExpression {
        let conversion = classify_conversion(&expression.ty, target);

        if !conversion.exists() {
            if !expression.is_error() && !target.is_error() {
                self.diagnostics.report_cannot_convert(span, &expression.ty, target);
            }
            return BoundExpression::error();
        }

        if !allow_explicit && conversion.is_explicit() {
            self.diagnostics
                .report_cannot_convert_implicitly(span, &expression.ty, target);
        }

        if conversion.is_identity() {
            expression
        } else {
            BoundExpression::conversion(target.clone(), expression)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    fn bind(is_script: bool, sources: &[&str]) -> BoundProgram {
        let trees: Vec<_> = sources.iter().map(|source| SyntaxTree::parse(*source)).collect();
        for tree in &trees {
            assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
        }
        let global = Arc::new(bind_global_scope(is_script, None, &trees));
        bind_program(None, global)
    }

    fn codes(source: &str) -> Vec<DiagnosticCode> {
        bind(false, &[source]).diagnostics.iter().map(|d| d.code).collect()
    }

    fn script_codes(source: &str) -> Vec<DiagnosticCode> {
        bind(true, &[source]).diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn well_formed_program_has_no_diagnostics() {
        let source = "\
enum Color { Red, Green }
function add(a: int, b: int): int {
    return a + b
}
var total = add(1, 2)
let c = Color.Green
for i = 1 to 3 step 1 {
    total = total + i
}
print(string(total) + string(c == Color.Red))
";
        assert_eq!(codes(source), []);
    }

    #[test]
    fn undefined_names_do_not_cascade() {
        assert_eq!(codes("var y = x + 1 * 2"), [DiagnosticCode::UndefinedName]);
        assert_eq!(codes("print(string(-x))"), [DiagnosticCode::UndefinedName]);
    }

    #[test]
    fn reports_operator_mismatches() {
        assert_eq!(codes("var b = 1 + true"), [DiagnosticCode::UndefinedBinaryOperator]);
        assert_eq!(codes("var b = !1"), [DiagnosticCode::UndefinedUnaryOperator]);
    }

    #[test]
    fn reports_overflowing_literals() {
        assert_eq!(codes("var n = 99999999999"), [DiagnosticCode::InvalidLiteralType]);
    }

    #[test]
    fn read_only_variables_cannot_be_assigned() {
        assert_eq!(codes("let x = 1\nx = 2"), [DiagnosticCode::CannotAssign]);
        assert_eq!(codes("for i = 1 to 2 { i = 3 }"), [DiagnosticCode::CannotAssign]);
    }

    #[test]
    fn conversions_must_be_explicit() {
        assert_eq!(codes("var s: string = 1"), [DiagnosticCode::CannotConvertImplicitly]);
        assert_eq!(codes("var b: bool = 1"), [DiagnosticCode::CannotConvert]);
        assert_eq!(codes("var s = string(1)\nvar n = int(\"4\")"), []);
    }

    #[test]
    fn reports_call_mismatches() {
        assert_eq!(codes("print()"), [DiagnosticCode::WrongArgumentCount]);
        assert_eq!(codes("print(\"a\", \"b\")"), [DiagnosticCode::WrongArgumentCount]);
        assert_eq!(codes("print(1)"), [DiagnosticCode::CannotConvertImplicitly]);
        assert_eq!(codes("rnd(true)"), [DiagnosticCode::CannotConvert]);
        assert_eq!(codes("var x = 1\nx()"), [DiagnosticCode::NotAFunction]);
        assert_eq!(codes("nope()"), [DiagnosticCode::UndefinedName]);
        assert_eq!(codes("var x = print"), [DiagnosticCode::NotAVariable]);
    }

    #[test]
    fn void_calls_have_no_value() {
        assert_eq!(codes("var x = print(\"a\")"), [DiagnosticCode::ExpressionMustHaveValue]);
    }

    #[test]
    fn reports_enum_misuse() {
        assert_eq!(
            codes("enum Color { Red }\nvar c = Color.Blue"),
            [DiagnosticCode::UndefinedEnumMember]
        );
        assert_eq!(codes("var x = 1\nvar c = x.Red"), [DiagnosticCode::NotAnEnum]);
        assert_eq!(
            codes("enum Color { Red, Red }"),
            [DiagnosticCode::SymbolAlreadyDeclared]
        );
        assert_eq!(codes("var c: Shade = 1"), [DiagnosticCode::UndefinedType]);
    }

    #[test]
    fn rejects_duplicates_in_one_scope() {
        assert_eq!(codes("var x = 1\nvar x = 2"), [DiagnosticCode::SymbolAlreadyDeclared]);
        assert_eq!(codes("var x = 1\n{ var x = 2 }"), []);
        assert_eq!(
            codes("function f(a: int, a: int) {}"),
            [DiagnosticCode::SymbolAlreadyDeclared]
        );
        assert_eq!(
            codes("function f() {}\nfunction f() {}"),
            [DiagnosticCode::SymbolAlreadyDeclared]
        );
    }

    #[test]
    fn expression_statements_must_have_effects_outside_scripts() {
        assert_eq!(codes("1 + 2"), [DiagnosticCode::InvalidExpressionStatement]);
        assert_eq!(script_codes("1 + 2"), []);
        assert_eq!(
            script_codes("function f() { 1 }"),
            [DiagnosticCode::InvalidExpressionStatement]
        );
    }

    #[test]
    fn break_and_continue_need_a_loop() {
        assert_eq!(codes("break"), [DiagnosticCode::InvalidBreakOrContinue]);
        assert_eq!(codes("while true { if false continue else break }"), []);
    }

    #[test]
    fn checks_return_statements() {
        assert_eq!(
            codes("function f() { return 1 }"),
            [DiagnosticCode::InvalidReturnExpression]
        );
        assert_eq!(
            codes("function f(): int { return }"),
            [DiagnosticCode::MissingReturnExpression]
        );
        assert_eq!(
            codes("return 1"),
            [DiagnosticCode::InvalidReturnWithValueInGlobalStatements]
        );
        assert_eq!(script_codes("return 1"), []);
    }

    #[test]
    fn non_void_functions_must_return_on_every_path() {
        assert_eq!(
            codes("function f(a: bool): int { if a { return 1 } }"),
            [DiagnosticCode::AllPathsMustReturn]
        );
        assert_eq!(codes("function f(a: bool): int { if a return 1 else return 2 }"), []);
        assert_eq!(codes("function f(): int { while true { } }"), []);
        assert_eq!(codes("function f(a: bool): int {\n    return 1\n    while a { }\n}"), []);
    }

    #[test]
    fn redeclared_function_bodies_are_still_checked() {
        assert_eq!(
            codes("function f() {}\nfunction f() { var x = nope }"),
            [DiagnosticCode::SymbolAlreadyDeclared, DiagnosticCode::UndefinedName]
        );
        let program = bind(false, &["function f(): int { return 1 }\nfunction f(): int { }"]);
        assert_eq!(program.functions().count(), 1);
        let codes: Vec<_> = program.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            [DiagnosticCode::SymbolAlreadyDeclared, DiagnosticCode::AllPathsMustReturn]
        );
    }

    #[test]
    fn checks_entry_point() {
        assert_eq!(
            codes("function main(): int { return 0 }"),
            [DiagnosticCode::MainMustHaveCorrectSignature]
        );
        assert_eq!(
            codes("function main() {}\nprint(\"x\")"),
            [
                DiagnosticCode::CannotMixMainAndGlobalStatements,
                DiagnosticCode::CannotMixMainAndGlobalStatements
            ]
        );
        let program = bind(false, &["print(\"a\")", "print(\"b\")"]);
        let codes: Vec<_> = program.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            [
                DiagnosticCode::OnlyOneFileCanHaveGlobalStatements,
                DiagnosticCode::OnlyOneFileCanHaveGlobalStatements
            ]
        );
    }

    #[test]
    fn synthesizes_entry_functions() {
        let program = bind(false, &["var x = 1"]);
        let main = program.global_scope.main_function.clone().expect("main");
        assert_eq!(main.name, MAIN_FUNCTION_NAME);
        assert!(program.function_body(&main).is_some());

        let script = bind(true, &["var x = 1"]);
        let eval = script.global_scope.script_function.clone().expect("$eval");
        assert_eq!(eval.name, SCRIPT_FUNCTION_NAME);
        assert!(script.global_scope.main_function.is_none());

        let declared = bind(false, &["function main() { print(\"hi\") }"]);
        let main = declared.global_scope.main_function.clone().expect("main");
        assert!(main.declaration().is_some());
    }

    #[test]
    fn loops_get_their_own_labels() {
        let program = bind(true, &["while true { break }\nwhile true { continue }"]);
        let statements = &program.global_scope.statements;
        let targets: Vec<_> = statements
            .iter()
            .filter_map(|statement| match statement {
                BoundStatement::While(node) => match node.body.as_ref() {
                    BoundStatement::Block(block) => match &block.statements[0] {
                        BoundStatement::Goto(label) => Some(label.name().to_string()),
                        _ => None,
                    },
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(targets, ["break_1", "continue_2"]);
    }

    #[test]
    fn later_submissions_see_and_shadow_earlier_globals() {
        let first = Arc::new(bind_global_scope(true, None, &[SyntaxTree::parse("var x = 1")]));
        assert!(first.diagnostics.is_empty());
        assert_eq!(first.variables.len(), 1);

        let second = Arc::new(bind_global_scope(
            true,
            Some(first.clone()),
            &[SyntaxTree::parse("x = 2")],
        ));
        assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);
        assert!(second.variables.is_empty());

        let third = bind_global_scope(true, Some(second), &[SyntaxTree::parse("var x = \"s\"")]);
        assert!(third.diagnostics.is_empty(), "{:?}", third.diagnostics);
        assert_eq!(third.variables[0].ty, TypeSymbol::String);
        assert_ne!(third.variables[0], first.variables[0]);
    }

    #[test]
    fn functions_from_earlier_submissions_keep_their_bodies() {
        let tree = SyntaxTree::parse("function twice(n: int): int { return n * 2 }");
        let first_global = Arc::new(bind_global_scope(true, None, &[tree]));
        let first = Arc::new(bind_program(None, first_global.clone()));

        let second_global = Arc::new(bind_global_scope(
            true,
            Some(first_global.clone()),
            &[SyntaxTree::parse("twice(4)")],
        ));
        let second = bind_program(Some(first), second_global);
        assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);

        let twice = &first_global.functions[0];
        assert!(second.function_body(twice).is_some());
        assert_eq!(second.functions().count(), 1);
    }
}
