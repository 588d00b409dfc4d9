//! src/semantics/validator.rs

use crate::ast::{Node, NodeKind, Operator};
use crate::common::MAX_NESTING_DEPTH;
use crate::emitter::{self, WriterOptions};
use crate::error::{CompilerBug, ValidateError, ValidationError, ValidatorFault, WalkError};

type VisitResult<'a> = Result<(), WalkError<'a>>;

/// Tunables for the structural validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum node nesting the walk descends into before giving up.
    pub max_depth: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

/// Checks every node of a parse tree against the grammar of its kind.
///
/// The validator never looks at semantics: it only enforces which child kinds
/// each node kind may hold. A failure therefore always means some earlier
/// pass built a malformed tree.
pub struct Validator {
    config: ValidatorConfig,
}

/// One unit of pending work, kept on an explicit stack so tree depth never
/// turns into native recursion.
enum Step<'a> {
    Visit { node: &'a Node, depth: usize },
    /// A violation found while expanding a parent. It is reported only after
    /// the siblings checked before it, keeping document order.
    Reject(ValidationError<'a>),
}

/// Expands one node at a time into the steps for its children.
struct Walk<'a> {
    depth: usize,
    children: Vec<Step<'a>>,
}

/// Validates `tree`, turning a grammar violation into a rendered
/// [`CompilerBug`] report. Internal faults are returned as they are.
pub fn validate(tree: &Node) -> Result<(), ValidateError> {
    validate_with_config(tree, ValidatorConfig::default())
}

pub fn validate_with_config(tree: &Node, config: ValidatorConfig) -> Result<(), ValidateError> {
    tracing::debug!(root = tree.name(), max_depth = config.max_depth, "validating parse tree");
    let mut validator = Validator::with_config(config);
    match validator.validate_tree(tree) {
        Ok(()) => {
            tracing::debug!("parse tree is well-formed");
            Ok(())
        }
        Err(WalkError::Invalid(err)) => {
            let bug = report(tree, err, config.max_depth);
            tracing::warn!(reason = %bug.message, location = %bug.location, "parse tree validation failed");
            Err(ValidateError::CompilerBug(bug))
        }
        Err(WalkError::Fault(fault)) => Err(ValidateError::Internal(fault)),
    }
}

/// Resolves the display location and renders the tree around the offender.
fn report(tree: &Node, err: ValidationError<'_>, max_depth: usize) -> CompilerBug {
    let location = err
        .node
        .and_then(|n| n.span)
        .or(tree.span)
        .map(|span| span.start.to_string())
        .unwrap_or_else(|| "(unknown)".to_string());

    let options = WriterOptions {
        highlighted: err.node,
        show_line_numbers: true,
        max_depth,
    };
    let (rendered, highlight) = match emitter::write_tree(tree, options) {
        Ok(tree) => (tree.text, tree.highlight),
        Err(_) => ("<tree could not be rendered>".to_string(), None),
    };

    CompilerBug {
        message: err.message,
        location,
        rendered,
        highlight,
    }
}

fn fail<'a>(node: &'a Node, message: &str) -> WalkError<'a> {
    WalkError::Invalid(ValidationError::new(node, message))
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Validator { config }
    }

    /// Walks `tree` and reports the first violation with its offending node.
    pub fn validate_tree<'a>(&mut self, tree: &'a Node) -> VisitResult<'a> {
        let limit = self.config.max_depth;
        let mut walk = Walk {
            depth: 0,
            children: Vec::new(),
        };
        let mut stack = vec![Step::Visit { node: tree, depth: 1 }];

        while let Some(step) = stack.pop() {
            let (node, depth) = match step {
                Step::Reject(err) => return Err(err.into()),
                Step::Visit { node, depth } => (node, depth),
            };
            if depth > limit {
                return Err(ValidatorFault::NestingTooDeep { depth, limit }.into());
            }
            walk.depth = depth;
            match walk.visit_kind(node) {
                Ok(()) => {}
                Err(WalkError::Invalid(err)) => walk.children.push(Step::Reject(err)),
                Err(fault) => return Err(fault),
            }
            // 逆序压栈，保证先检查的子节点先出栈
            stack.extend(walk.children.drain(..).rev());
        }
        Ok(())
    }
}

impl<'a> Walk<'a> {
    fn visit(&mut self, node: &'a Node) -> VisitResult<'a> {
        self.children.push(Step::Visit {
            node,
            depth: self.depth + 1,
        });
        Ok(())
    }

    /// 先检查子节点满足前置条件，再排入待访问队列；不满足则在子节点处报错。
    fn check_visit(&mut self, condition: bool, node: &'a Node, message: &str) -> VisitResult<'a> {
        if !condition {
            return Err(fail(node, message));
        }
        self.visit(node)
    }

    fn check_visit_opt(
        &mut self,
        node: &'a Option<Box<Node>>,
        condition: impl Fn(&Node) -> bool,
        message: &str,
    ) -> VisitResult<'a> {
        match node {
            Some(node) => {
                let node: &'a Node = node;
                self.check_visit(condition(node), node, message)
            }
            None => Ok(()),
        }
    }

    fn check_visit_all(
        &mut self,
        nodes: &'a [Node],
        condition: impl Fn(&Node) -> bool,
        message: &str,
    ) -> VisitResult<'a> {
        for node in nodes {
            self.check_visit(condition(node), node, message)?;
        }
        Ok(())
    }

    fn visit_kind(&mut self, tree: &'a Node) -> VisitResult<'a> {
        match &tree.kind {
            // --- Program / modules ---
            NodeKind::Program { elements } => {
                self.check_visit_all(elements, Node::is_program_element, "global program element expected")
            }
            NodeKind::ModuleDefinition { name, elements } => {
                self.check_visit(is_binding_identifier(name), name, "binding identifier expected")?;
                self.check_visit_all(elements, Node::is_program_element, "module element expected")
            }
            NodeKind::ModuleDeclaration { specifiers } => {
                if specifiers.is_empty() {
                    return Err(fail(tree, "expected at least one module specifier"));
                }
                self.check_visit_all(
                    specifiers,
                    |n| matches!(n.kind, NodeKind::ModuleSpecifier { .. }),
                    "module specifier expected",
                )
            }
            NodeKind::ModuleSpecifier { expression, .. } => self.check_visit(
                matches!(expression.kind, NodeKind::ModuleExpression { .. }),
                expression,
                "module expression expected",
            ),
            NodeKind::ModuleExpression { reference, .. } => self.check_visit(
                matches!(
                    reference.kind,
                    NodeKind::ModuleRequire { .. }
                        | NodeKind::IdentifierExpression { .. }
                        | NodeKind::ModuleExpression { .. }
                ),
                reference,
                "module require, identifier or module expression expected",
            ),
            NodeKind::ExportDeclaration { declaration } => self.check_visit(
                matches!(
                    declaration.kind,
                    NodeKind::VariableStatement { .. }
                        | NodeKind::FunctionDeclaration { .. }
                        | NodeKind::ModuleDefinition { .. }
                        | NodeKind::ModuleDeclaration { .. }
                        | NodeKind::ClassDeclaration { .. }
                        | NodeKind::ExportMappingList { .. }
                ),
                declaration,
                "expected valid export tree",
            ),
            NodeKind::ExportMappingList { paths } => {
                if paths.is_empty() {
                    return Err(fail(tree, "expected at least one path"));
                }
                self.check_visit_all(
                    paths,
                    |n| matches!(n.kind, NodeKind::ExportMapping { .. }),
                    "expected export mapping",
                )
            }
            NodeKind::ExportMapping {
                module_expression,
                specifier_set,
            } => {
                self.check_visit_opt(
                    module_expression,
                    |n| matches!(n.kind, NodeKind::ModuleExpression { .. }),
                    "module expression expected",
                )?;
                self.check_visit(
                    matches!(
                        specifier_set.kind,
                        NodeKind::ExportSpecifierSet { .. }
                            | NodeKind::IdentifierExpression { .. }
                            | NodeKind::ExportStar
                    ),
                    specifier_set,
                    "specifier set or identifier expected",
                )
            }
            NodeKind::ExportSpecifierSet { specifiers } => {
                if specifiers.is_empty() {
                    return Err(fail(tree, "expected at least one identifier"));
                }
                self.check_visit_all(
                    specifiers,
                    |n| {
                        matches!(
                            n.kind,
                            NodeKind::ExportSpecifier { .. } | NodeKind::IdentifierExpression { .. }
                        )
                    },
                    "expected valid export specifier",
                )
            }
            NodeKind::ImportDeclaration {
                specifier_set,
                module_expression,
            } => {
                self.check_visit(
                    matches!(
                        specifier_set.kind,
                        NodeKind::ImportSpecifierSet { .. }
                            | NodeKind::IdentifierExpression { .. }
                            | NodeKind::ExportStar
                    ),
                    specifier_set,
                    "import specifier set or identifier expected",
                )?;
                self.check_visit(
                    matches!(module_expression.kind, NodeKind::ModuleExpression { .. }),
                    module_expression,
                    "module expression expected",
                )
            }
            NodeKind::ImportSpecifierSet { specifiers } => {
                if specifiers.is_empty() {
                    return Err(fail(tree, "expected at least one import specifier"));
                }
                self.check_visit_all(
                    specifiers,
                    |n| {
                        matches!(
                            n.kind,
                            NodeKind::ImportSpecifier { .. } | NodeKind::IdentifierExpression { .. }
                        )
                    },
                    "expected valid import specifier",
                )
            }

            // --- Statements ---
            NodeKind::Block { statements } => self.check_visit_all(
                statements,
                Node::is_source_element,
                "statement or function declaration expected",
            ),
            NodeKind::VariableStatement { declarations } => self.check_visit(
                matches!(declarations.kind, NodeKind::VariableDeclarationList { .. }),
                declarations,
                "variable declaration list expected",
            ),
            NodeKind::VariableDeclarationList { declarations, .. } => {
                if declarations.is_empty() {
                    return Err(fail(tree, "expected at least one variable declaration"));
                }
                self.check_visit_all(
                    declarations,
                    |n| matches!(n.kind, NodeKind::VariableDeclaration { .. }),
                    "variable declaration expected",
                )
            }
            NodeKind::VariableDeclaration { lvalue, initializer } => {
                self.check_visit(
                    is_binding_identifier(lvalue) || lvalue.is_pattern(),
                    lvalue,
                    "binding identifier or pattern expected",
                )?;
                self.check_visit_opt(
                    initializer,
                    Node::is_assignment_expression,
                    "assignment expression expected",
                )
            }
            NodeKind::ExpressionStatement { expression } => {
                self.check_visit(expression.is_expression(), expression, "expression expected")
            }
            NodeKind::IfStatement {
                condition,
                if_clause,
                else_clause,
            } => {
                self.check_visit(condition.is_expression(), condition, "expression expected")?;
                self.check_visit(if_clause.is_statement(), if_clause, "statement expected")?;
                self.check_visit_opt(else_clause, Node::is_statement, "statement expected")
            }
            NodeKind::DoWhileStatement { body, condition } => {
                self.check_visit(body.is_statement(), body, "statement expected")?;
                self.check_visit(condition.is_expression(), condition, "expression expected")
            }
            NodeKind::WhileStatement { condition, body } => {
                self.check_visit(condition.is_expression(), condition, "expression expected")?;
                self.check_visit(body.is_statement(), body, "statement expected")
            }
            NodeKind::ForStatement {
                initializer,
                condition,
                increment,
                body,
            } => {
                self.check_visit_opt(
                    initializer,
                    |n| n.is_expression() || matches!(n.kind, NodeKind::VariableDeclarationList { .. }),
                    "variable declaration, expression or null expected",
                )?;
                self.check_visit_opt(condition, Node::is_expression, "expression or null expected")?;
                self.check_visit_opt(increment, Node::is_expression, "expression or null expected")?;
                self.check_visit(body.is_statement(), body, "statement expected")
            }
            NodeKind::ForInStatement {
                initializer,
                collection,
                body,
            } => {
                self.visit_for_each_initializer(initializer, "for-in")?;
                self.check_visit(collection.is_expression(), collection, "expression expected")?;
                self.check_visit(body.is_statement(), body, "statement expected")
            }
            NodeKind::ForOfStatement {
                initializer,
                collection,
                body,
            } => {
                self.visit_for_each_initializer(initializer, "for-of")?;
                self.check_visit(collection.is_expression(), collection, "expression expected")?;
                self.check_visit(body.is_statement(), body, "statement expected")
            }
            NodeKind::ReturnStatement { expression } => {
                self.check_visit_opt(expression, Node::is_expression, "expression expected")
            }
            NodeKind::ThrowStatement { value } => {
                self.check_visit_opt(value, Node::is_expression, "expression expected")
            }
            NodeKind::WithStatement { expression, body } => {
                self.check_visit(expression.is_expression(), expression, "expression expected")?;
                self.check_visit(body.is_statement(), body, "statement expected")
            }
            NodeKind::SwitchStatement { expression, clauses } => {
                self.check_visit(expression.is_expression(), expression, "expression expected")?;
                let mut default_count = 0;
                for clause in clauses {
                    match clause.kind {
                        NodeKind::DefaultClause { .. } => {
                            default_count += 1;
                            if default_count > 1 {
                                return Err(fail(clause, "no more than one default clause allowed"));
                            }
                        }
                        NodeKind::CaseClause { .. } => {}
                        _ => return Err(fail(clause, "case or default clause expected")),
                    }
                    self.visit(clause)?;
                }
                Ok(())
            }
            NodeKind::CaseClause {
                expression,
                statements,
            } => {
                self.check_visit(expression.is_expression(), expression, "expression expected")?;
                self.check_visit_all(statements, Node::is_statement, "statement expected")
            }
            NodeKind::DefaultClause { statements } => {
                self.check_visit_all(statements, Node::is_statement, "statement expected")
            }
            NodeKind::LabelledStatement { statement, .. } => {
                self.check_visit(statement.is_statement(), statement, "statement expected")
            }
            NodeKind::TryStatement {
                body,
                catch_block,
                finally_block,
            } => {
                if catch_block.is_none() && finally_block.is_none() {
                    return Err(fail(tree, "try statement requires a catch or finally clause"));
                }
                self.check_visit(is_block(body), body, "block expected")?;
                self.check_visit_opt(
                    catch_block,
                    |n| matches!(n.kind, NodeKind::Catch { .. }),
                    "catch clause expected",
                )?;
                self.check_visit_opt(
                    finally_block,
                    |n| matches!(n.kind, NodeKind::Finally { .. }),
                    "finally clause expected",
                )
            }
            NodeKind::Catch {
                binding,
                catch_body,
            } => {
                self.check_visit(
                    is_binding_identifier(binding) || binding.is_pattern(),
                    binding,
                    "binding identifier or pattern expected",
                )?;
                self.check_visit(is_block(catch_body), catch_body, "block expected")
            }
            NodeKind::Finally { block } => self.check_visit(is_block(block), block, "block expected"),
            NodeKind::AwaitStatement { expression, .. } => {
                self.check_visit(expression.is_expression(), expression, "expression expected")
            }

            // --- Functions / classes ---
            NodeKind::FunctionDeclaration {
                name,
                parameters,
                body,
                ..
            }
            | NodeKind::FunctionExpression {
                name,
                parameters,
                body,
                ..
            } => {
                self.check_visit_opt(name, is_binding_identifier, "binding identifier expected")?;
                self.check_visit(
                    is_formal_parameter_list(parameters),
                    parameters,
                    "formal parameters expected",
                )?;
                self.check_visit(is_block(body), body, "function body expected")
            }
            NodeKind::ArrowFunctionExpression { parameters, body } => {
                self.check_visit(
                    is_formal_parameter_list(parameters),
                    parameters,
                    "formal parameters expected",
                )?;
                self.check_visit(
                    is_block(body) || body.is_assignment_expression(),
                    body,
                    "block or assignment expression expected",
                )
            }
            NodeKind::FormalParameterList { parameters } => {
                let last = parameters.len().saturating_sub(1);
                for (i, parameter) in parameters.iter().enumerate() {
                    match parameter.kind {
                        NodeKind::RestParameter { .. } => {
                            if i != last {
                                return Err(fail(
                                    parameter,
                                    "rest parameter must be the last parameter in a parameter list",
                                ));
                            }
                        }
                        NodeKind::BindingElement { .. } => {}
                        _ => return Err(fail(parameter, "binding element or rest parameter expected")),
                    }
                    self.visit(parameter)?;
                }
                Ok(())
            }
            NodeKind::RestParameter { identifier } => self.check_visit(
                is_binding_identifier(identifier),
                identifier,
                "binding identifier expected",
            ),
            NodeKind::BindingElement {
                binding,
                initializer,
            } => {
                self.check_visit(
                    is_binding_identifier(binding) || binding.is_pattern(),
                    binding,
                    "binding identifier or pattern expected",
                )?;
                self.check_visit_opt(
                    initializer,
                    Node::is_assignment_expression,
                    "assignment expression expected",
                )
            }
            NodeKind::ClassDeclaration {
                name,
                superclass,
                elements,
            }
            | NodeKind::ClassExpression {
                name,
                superclass,
                elements,
            } => {
                self.check_visit_opt(name, is_binding_identifier, "binding identifier expected")?;
                self.check_visit_opt(
                    superclass,
                    Node::is_assignment_expression,
                    "assignment expression expected",
                )?;
                self.check_visit_all(
                    elements,
                    |n| {
                        matches!(
                            n.kind,
                            NodeKind::PropertyMethodAssignment { .. }
                                | NodeKind::GetAccessor { .. }
                                | NodeKind::SetAccessor { .. }
                        )
                    },
                    "class element expected",
                )
            }
            NodeKind::PropertyMethodAssignment {
                parameters, body, ..
            } => {
                self.check_visit(
                    is_formal_parameter_list(parameters),
                    parameters,
                    "formal parameters expected",
                )?;
                self.check_visit(is_block(body), body, "function body expected")
            }
            NodeKind::GetAccessor { body, .. } => {
                self.check_visit(is_block(body), body, "function body expected")
            }
            NodeKind::SetAccessor {
                parameter, body, ..
            } => {
                self.check_visit(
                    is_binding_identifier(parameter)
                        || parameter.is_pattern()
                        || matches!(parameter.kind, NodeKind::BindingElement { .. }),
                    parameter,
                    "binding identifier or pattern expected",
                )?;
                self.check_visit(is_block(body), body, "function body expected")
            }
            NodeKind::PropertyNameAssignment { value, .. } => self.check_visit(
                value.is_assignment_expression(),
                value,
                "assignment expression expected",
            ),

            // --- Expressions ---
            NodeKind::ArrayLiteralExpression { elements } => {
                for element in elements.iter().flatten() {
                    self.check_visit(
                        element.is_assignment_or_spread(),
                        element,
                        "assignment or spread expected",
                    )?;
                }
                Ok(())
            }
            NodeKind::ObjectLiteralExpression { properties } => self.check_visit_all(
                properties,
                |n| {
                    matches!(
                        n.kind,
                        NodeKind::PropertyNameAssignment { .. }
                            | NodeKind::PropertyNameShorthand { .. }
                            | NodeKind::GetAccessor { .. }
                            | NodeKind::SetAccessor { .. }
                            | NodeKind::PropertyMethodAssignment { .. }
                    )
                },
                "accessor, property name assignment or property method assignment expected",
            ),
            NodeKind::ParenExpression { expression } => self.check_visit(
                expression.is_expression() || expression.is_pattern(),
                expression,
                "expression or pattern expected",
            ),
            NodeKind::UnaryExpression { operand, .. } | NodeKind::PostfixExpression { operand, .. } => {
                self.check_visit(
                    operand.is_assignment_expression(),
                    operand,
                    "assignment expression expected",
                )
            }
            NodeKind::SpreadExpression { expression } => self.check_visit(
                expression.is_assignment_expression(),
                expression,
                "assignment expression expected",
            ),
            NodeKind::BinaryOperator {
                left,
                operator,
                right,
            } => self.visit_binary_operator(tree, left, operator, right),
            NodeKind::ConditionalExpression {
                condition,
                left,
                right,
            } => {
                for part in [condition, left, right] {
                    self.check_visit(
                        part.is_assignment_expression(),
                        part,
                        "assignment expression expected",
                    )?;
                }
                Ok(())
            }
            NodeKind::CommaExpression { expressions } => {
                if expressions.len() < 2 {
                    return Err(fail(tree, "comma expression requires at least two operands"));
                }
                self.check_visit_all(
                    expressions,
                    Node::is_assignment_expression,
                    "assignment expression expected",
                )
            }
            NodeKind::CallExpression { operand, args } => {
                self.visit_member_operand(operand)?;
                self.check_visit(is_argument_list(args), args, "arguments expected")
            }
            NodeKind::ArgumentList { args } => self.check_visit_all(
                args,
                Node::is_assignment_or_spread,
                "assignment or spread expected",
            ),
            NodeKind::NewExpression { operand, args } => {
                self.visit_member_operand(operand)?;
                self.check_visit_opt(args, is_argument_list, "arguments expected")
            }
            NodeKind::MemberExpression { operand, .. } => self.visit_member_operand(operand),
            NodeKind::MemberLookupExpression {
                operand,
                member_expression,
            } => {
                self.visit_member_operand(operand)?;
                self.check_visit(
                    member_expression.is_expression(),
                    member_expression,
                    "expression expected",
                )
            }
            NodeKind::YieldExpression { expression, .. } => self.check_visit_opt(
                expression,
                Node::is_assignment_expression,
                "assignment expression expected",
            ),
            NodeKind::QuasiLiteralExpression { operand, elements } => {
                self.check_visit_opt(operand, Node::is_member_expression, "member expression expected")?;
                for (i, element) in elements.iter().enumerate() {
                    if i % 2 == 0 {
                        self.check_visit(
                            matches!(element.kind, NodeKind::QuasiLiteralPortion { .. }),
                            element,
                            "quasi literal portion expected",
                        )?;
                    } else {
                        self.check_visit(
                            matches!(element.kind, NodeKind::QuasiSubstitution { .. }),
                            element,
                            "quasi substitution expected",
                        )?;
                    }
                }
                Ok(())
            }
            NodeKind::QuasiSubstitution { expression } => {
                self.check_visit(expression.is_expression(), expression, "expression expected")
            }
            NodeKind::ArrayComprehension {
                comprehension_list,
                expression,
            }
            | NodeKind::GeneratorComprehension {
                comprehension_list,
                expression,
            } => {
                match comprehension_list.first() {
                    None => return Err(fail(tree, "expected at least one comprehension for")),
                    Some(first) if !matches!(first.kind, NodeKind::ComprehensionFor { .. }) => {
                        return Err(fail(first, "comprehension for expected"));
                    }
                    Some(_) => {}
                }
                self.check_visit_all(
                    comprehension_list,
                    |n| {
                        matches!(
                            n.kind,
                            NodeKind::ComprehensionFor { .. } | NodeKind::ComprehensionIf { .. }
                        )
                    },
                    "comprehension for or comprehension if expected",
                )?;
                self.check_visit(
                    expression.is_assignment_expression(),
                    expression,
                    "assignment expression expected",
                )
            }
            NodeKind::ComprehensionFor { left, iterator } => {
                self.check_visit(
                    is_binding_identifier(left) || left.is_pattern(),
                    left,
                    "binding identifier or pattern expected",
                )?;
                self.check_visit(iterator.is_expression(), iterator, "expression expected")
            }
            NodeKind::ComprehensionIf { expression } => {
                self.check_visit(expression.is_expression(), expression, "expression expected")
            }
            NodeKind::MissingPrimaryExpression => Err(fail(tree, "parse tree contains errors")),

            // --- Patterns ---
            NodeKind::ArrayPattern { elements } => {
                let last = elements.len().saturating_sub(1);
                for (i, element) in elements.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    let is_spread = matches!(element.kind, NodeKind::SpreadPatternElement { .. });
                    if is_spread && i != last {
                        return Err(fail(element, "spread in array patterns must be the last element"));
                    }
                    self.check_visit(
                        is_spread
                            || element.is_pattern()
                            || element.is_left_hand_side_expression()
                            || matches!(element.kind, NodeKind::BindingElement { .. }),
                        element,
                        "null, sub pattern, left hand side expression or spread expected",
                    )?;
                }
                Ok(())
            }
            NodeKind::ObjectPattern { fields } => self.check_visit_all(
                fields,
                |n| {
                    matches!(
                        n.kind,
                        NodeKind::ObjectPatternField { .. }
                            | NodeKind::BindingElement { .. }
                            | NodeKind::IdentifierExpression { .. }
                    )
                },
                "object pattern field expected",
            ),
            NodeKind::ObjectPatternField { element, .. } => self.check_visit(
                element.is_pattern()
                    || element.is_left_hand_side_expression()
                    || matches!(element.kind, NodeKind::BindingElement { .. }),
                element,
                "pattern, left hand side expression or binding element expected",
            ),
            NodeKind::SpreadPatternElement { lvalue } => self.check_visit(
                lvalue.is_left_hand_side_expression() || lvalue.is_pattern(),
                lvalue,
                "left hand side expression or pattern expected",
            ),

            NodeKind::StateMachine(_) => Err(fail(
                tree,
                "State machines are never valid outside of the generator transformer pass",
            )),

            // 叶子节点：没有需要检查的子节点
            NodeKind::ModuleRequire { .. }
            | NodeKind::ExportSpecifier { .. }
            | NodeKind::ExportStar
            | NodeKind::ImportSpecifier { .. }
            | NodeKind::EmptyStatement
            | NodeKind::ContinueStatement { .. }
            | NodeKind::BreakStatement { .. }
            | NodeKind::DebuggerStatement
            | NodeKind::BindingIdentifier { .. }
            | NodeKind::PropertyNameShorthand { .. }
            | NodeKind::IdentifierExpression { .. }
            | NodeKind::ThisExpression
            | NodeKind::SuperExpression
            | NodeKind::LiteralExpression { .. }
            | NodeKind::QuasiLiteralPortion { .. } => Ok(()),
        }
    }

    fn visit_binary_operator(
        &mut self,
        tree: &'a Node,
        left: &'a Node,
        operator: &Operator,
        right: &'a Node,
    ) -> VisitResult<'a> {
        if operator.is_assignment() {
            self.check_visit(
                left.is_left_hand_side_expression() || left.is_pattern(),
                left,
                "left hand side expression or pattern expected",
            )?;
            return self.check_visit(
                right.is_assignment_expression(),
                right,
                "assignment expression expected",
            );
        }

        let legal = match operator {
            Operator::Identifier(name) => name == "is" || name == "isnt",
            other => other.is_binary_value_operator(),
        };
        if !legal {
            return Err(fail(tree, "unexpected binary operator"));
        }
        self.check_visit(left.is_assignment_expression(), left, "assignment expression expected")?;
        self.check_visit(right.is_assignment_expression(), right, "assignment expression expected")
    }

    /// Operand rule shared by call, member, member lookup and `new`.
    fn visit_member_operand(&mut self, operand: &'a Node) -> VisitResult<'a> {
        if let NodeKind::NewExpression { args: None, .. } = operand.kind {
            return Err(fail(operand, "invalid member expression"));
        }
        self.check_visit(operand.is_member_expression(), operand, "member expression expected")
    }

    fn visit_for_each_initializer(&mut self, initializer: &'a Node, loop_kind: &str) -> VisitResult<'a> {
        if let NodeKind::VariableDeclarationList { declarations, .. } = &initializer.kind {
            if declarations.len() > 1 {
                let message = format!(
                    "{} statement may not have more than one variable declaration",
                    loop_kind
                );
                return Err(fail(initializer, &message));
            }
            return self.visit(initializer);
        }
        self.check_visit(
            initializer.is_pattern() || initializer.is_left_hand_side_expression(),
            initializer,
            "variable declaration or left hand side expression expected",
        )
    }
}

fn is_block(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Block { .. })
}

fn is_binding_identifier(node: &Node) -> bool {
    matches!(node.kind, NodeKind::BindingIdentifier { .. })
}

fn is_formal_parameter_list(node: &Node) -> bool {
    matches!(node.kind, NodeKind::FormalParameterList { .. })
}

fn is_argument_list(node: &Node) -> bool {
    matches!(node.kind, NodeKind::ArgumentList { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Literal, Position, Span};
    use crate::ir::state_machine::{State, StateMachine};

    // 快速构造节点的辅助函数
    fn n(kind: NodeKind) -> Node {
        Node::new(kind)
    }

    fn ident(name: &str) -> Node {
        n(NodeKind::IdentifierExpression {
            name: name.to_string(),
        })
    }

    fn block(statements: Vec<Node>) -> Node {
        n(NodeKind::Block { statements })
    }

    fn expr_stmt(expression: Node) -> Node {
        n(NodeKind::ExpressionStatement {
            expression: Box::new(expression),
        })
    }

    fn walk(tree: &Node) -> Result<(), String> {
        match Validator::new().validate_tree(tree) {
            Ok(()) => Ok(()),
            Err(WalkError::Invalid(err)) => Err(err.message),
            Err(WalkError::Fault(fault)) => panic!("unexpected fault: {}", fault),
        }
    }

    #[test]
    fn well_formed_program_passes_twice() {
        let tree = n(NodeKind::Program {
            elements: vec![
                n(NodeKind::VariableStatement {
                    declarations: Box::new(n(NodeKind::VariableDeclarationList {
                        declaration_kind: crate::ast::DeclarationKind::Let,
                        declarations: vec![n(NodeKind::VariableDeclaration {
                            lvalue: Box::new(n(NodeKind::BindingIdentifier {
                                name: "x".to_string(),
                            })),
                            initializer: Some(Box::new(n(NodeKind::LiteralExpression {
                                literal: Literal::Number(1.0),
                            }))),
                        })],
                    })),
                }),
                expr_stmt(n(NodeKind::BinaryOperator {
                    left: Box::new(ident("x")),
                    operator: Operator::PlusEqual,
                    right: Box::new(ident("y")),
                })),
            ],
        });
        assert_eq!(validate(&tree).map_err(|e| e.to_string()), Ok(()));
        assert_eq!(validate(&tree).map_err(|e| e.to_string()), Ok(()));
    }

    #[test]
    fn bare_try_is_rejected_at_the_try() {
        let tree = n(NodeKind::TryStatement {
            body: Box::new(block(vec![])),
            catch_block: None,
            finally_block: None,
        });
        let err = match Validator::new().validate_tree(&tree) {
            Err(WalkError::Invalid(err)) => err,
            other => panic!("expected validation error, got {:?}", other),
        };
        assert!(err.is_at(&tree));
        assert_eq!(err.message, "try statement requires a catch or finally clause");
    }

    #[test]
    fn comma_expression_is_not_an_assignment_operand() {
        let tree = expr_stmt(n(NodeKind::BinaryOperator {
            left: Box::new(ident("a")),
            operator: Operator::Equal,
            right: Box::new(n(NodeKind::CommaExpression {
                expressions: vec![ident("b"), ident("c")],
            })),
        }));
        assert_eq!(walk(&tree), Err("assignment expression expected".to_string()));
    }

    #[test]
    fn only_is_and_isnt_identifier_operators() {
        let with_op = |name: &str| {
            expr_stmt(n(NodeKind::BinaryOperator {
                left: Box::new(ident("a")),
                operator: Operator::Identifier(name.to_string()),
                right: Box::new(ident("b")),
            }))
        };
        assert_eq!(walk(&with_op("is")), Ok(()));
        assert_eq!(walk(&with_op("isnt")), Ok(()));
        assert_eq!(walk(&with_op("like")), Err("unexpected binary operator".to_string()));
    }

    #[test]
    fn unary_only_operator_in_binary_position() {
        let tree = expr_stmt(n(NodeKind::BinaryOperator {
            left: Box::new(ident("a")),
            operator: Operator::Typeof,
            right: Box::new(ident("b")),
        }));
        assert_eq!(walk(&tree), Err("unexpected binary operator".to_string()));
    }

    #[test]
    fn call_on_new_without_arguments() {
        let tree = expr_stmt(n(NodeKind::CallExpression {
            operand: Box::new(n(NodeKind::NewExpression {
                operand: Box::new(ident("Foo")),
                args: None,
            })),
            args: Box::new(n(NodeKind::ArgumentList { args: vec![] })),
        }));
        assert_eq!(walk(&tree), Err("invalid member expression".to_string()));
    }

    #[test]
    fn quasi_elements_alternate() {
        let portion = |s: &str| {
            n(NodeKind::QuasiLiteralPortion {
                value: s.to_string(),
            })
        };
        let subst = |e: Node| {
            n(NodeKind::QuasiSubstitution {
                expression: Box::new(e),
            })
        };
        let good = expr_stmt(n(NodeKind::QuasiLiteralExpression {
            operand: None,
            elements: vec![portion("a"), subst(ident("x")), portion("b")],
        }));
        assert_eq!(walk(&good), Ok(()));

        let bad = expr_stmt(n(NodeKind::QuasiLiteralExpression {
            operand: None,
            elements: vec![portion("a"), portion("b")],
        }));
        assert_eq!(walk(&bad), Err("quasi substitution expected".to_string()));
    }

    #[test]
    fn state_machine_is_always_rejected() {
        let machine = n(NodeKind::StateMachine(StateMachine::new(
            0,
            1,
            vec![State::Break { id: 0, label: None }],
        )));
        let tree = block(vec![n(NodeKind::IfStatement {
            condition: Box::new(ident("c")),
            if_clause: Box::new(block(vec![machine])),
            else_clause: None,
        })]);
        let message = walk(&tree).expect_err("state machine must be rejected");
        assert!(message.starts_with("State machines are never valid"));
    }

    #[test]
    fn report_uses_offender_location_and_highlights_it() {
        let at = |line| Position {
            line,
            column: 3,
            offset: 0,
        };
        let offender = Node::with_span(NodeKind::MissingPrimaryExpression, Span::new(at(7), at(7)));
        let tree = Node::with_span(
            NodeKind::ExpressionStatement {
                expression: Box::new(offender),
            },
            Span::new(at(1), at(9)),
        );
        let err = validate(&tree).expect_err("missing primary is invalid");
        let ValidateError::CompilerBug(bug) = err else {
            panic!("expected a compiler bug report");
        };
        assert_eq!(bug.location, "7:3");
        assert_eq!(bug.message, "parse tree contains errors");
        assert!(bug.to_string().starts_with(
            "Parse tree validation failure 'parse tree contains errors' at 7:3:"
        ));
        let (start, len) = bug.highlight.expect("offender highlighted");
        assert!(bug.rendered[start..start + len].contains(">>   expression: MissingPrimaryExpression"));
    }

    #[test]
    fn report_falls_back_to_root_then_unknown() {
        let at = Position {
            line: 2,
            column: 1,
            offset: 10,
        };
        let rooted = Node::with_span(
            NodeKind::ExpressionStatement {
                expression: Box::new(n(NodeKind::MissingPrimaryExpression)),
            },
            Span::new(at, at),
        );
        match validate(&rooted) {
            Err(ValidateError::CompilerBug(bug)) => assert_eq!(bug.location, "2:1"),
            other => panic!("unexpected result {:?}", other),
        }

        let bare = expr_stmt(n(NodeKind::MissingPrimaryExpression));
        match validate(&bare) {
            Err(ValidateError::CompilerBug(bug)) => assert_eq!(bug.location, "(unknown)"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn nesting_beyond_limit_is_an_internal_fault() {
        let mut tree = n(NodeKind::EmptyStatement);
        for _ in 0..10 {
            tree = block(vec![tree]);
        }
        let config = ValidatorConfig { max_depth: 5 };
        match validate_with_config(&tree, config) {
            Err(ValidateError::Internal(ValidatorFault::NestingTooDeep { limit, .. })) => {
                assert_eq!(limit, 5)
            }
            other => panic!("expected internal fault, got {:?}", other),
        }
        assert!(validate_with_config(&tree, ValidatorConfig { max_depth: 64 }).is_ok());
    }
}
