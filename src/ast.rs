// src/ast.rs

//! Parse tree consumed by the mid-tier passes.
//!
//! Every node is a [`Node`]: an optional source [`Span`] plus a [`NodeKind`]
//! that owns its children by value. The tree has no back pointers; passes
//! either read it (`&Node`) or consume and rebuild it (`Node`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::common::ensure_sufficient_stack;
use crate::ir::state_machine::StateMachine;

/// A position in the source text. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }
}

/// Operators carried by unary, postfix and binary nodes.
///
/// The set is shared between the three node kinds; which operators are legal
/// where is a validator concern, not a type-level one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    // 赋值
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    LeftShiftEqual,
    RightShiftEqual,
    UnsignedRightShiftEqual,
    AmpersandEqual,
    BarEqual,
    CaretEqual,
    // 逻辑 / 位运算
    AndAnd,
    OrOr,
    Ampersand,
    Bar,
    Caret,
    // 相等 / 关系
    EqualEqual,
    NotEqual,
    EqualEqualEqual,
    NotEqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Instanceof,
    In,
    // 移位 / 算术
    LeftShift,
    RightShift,
    UnsignedRightShift,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    // 仅一元
    Delete,
    Void,
    Typeof,
    PlusPlus,
    MinusMinus,
    Tilde,
    Bang,
    /// Contextual keyword operator such as `is` / `isnt`.
    Identifier(String),
}

impl Operator {
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::PlusEqual
                | Operator::MinusEqual
                | Operator::StarEqual
                | Operator::SlashEqual
                | Operator::PercentEqual
                | Operator::LeftShiftEqual
                | Operator::RightShiftEqual
                | Operator::UnsignedRightShiftEqual
                | Operator::AmpersandEqual
                | Operator::BarEqual
                | Operator::CaretEqual
        )
    }

    /// Logical, bitwise, equality, relational, shift and arithmetic operators.
    pub fn is_binary_value_operator(&self) -> bool {
        matches!(
            self,
            Operator::AndAnd
                | Operator::OrOr
                | Operator::Ampersand
                | Operator::Bar
                | Operator::Caret
                | Operator::EqualEqual
                | Operator::NotEqual
                | Operator::EqualEqualEqual
                | Operator::NotEqualEqual
                | Operator::Less
                | Operator::LessEqual
                | Operator::Greater
                | Operator::GreaterEqual
                | Operator::Instanceof
                | Operator::In
                | Operator::LeftShift
                | Operator::RightShift
                | Operator::UnsignedRightShift
                | Operator::Plus
                | Operator::Minus
                | Operator::Star
                | Operator::Slash
                | Operator::Percent
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equal => "=",
            Operator::PlusEqual => "+=",
            Operator::MinusEqual => "-=",
            Operator::StarEqual => "*=",
            Operator::SlashEqual => "/=",
            Operator::PercentEqual => "%=",
            Operator::LeftShiftEqual => "<<=",
            Operator::RightShiftEqual => ">>=",
            Operator::UnsignedRightShiftEqual => ">>>=",
            Operator::AmpersandEqual => "&=",
            Operator::BarEqual => "|=",
            Operator::CaretEqual => "^=",
            Operator::AndAnd => "&&",
            Operator::OrOr => "||",
            Operator::Ampersand => "&",
            Operator::Bar => "|",
            Operator::Caret => "^",
            Operator::EqualEqual => "==",
            Operator::NotEqual => "!=",
            Operator::EqualEqualEqual => "===",
            Operator::NotEqualEqual => "!==",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Instanceof => "instanceof",
            Operator::In => "in",
            Operator::LeftShift => "<<",
            Operator::RightShift => ">>",
            Operator::UnsignedRightShift => ">>>",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Delete => "delete",
            Operator::Void => "void",
            Operator::Typeof => "typeof",
            Operator::PlusPlus => "++",
            Operator::MinusMinus => "--",
            Operator::Tilde => "~",
            Operator::Bang => "!",
            Operator::Identifier(name) => name,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    RegExp { pattern: String, flags: String },
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::RegExp { pattern, flags } => write!(f, "/{}/{}", pattern, flags),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationKind {
    Var,
    Let,
    Const,
}

/// A single parse tree node.
///
/// In JSON the kind's fields sit next to an optional `span`, tagged by
/// `"type"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub span: Option<Span>,
    pub kind: NodeKind,
}

#[derive(Serialize)]
struct NodeRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    span: Option<Span>,
    #[serde(flatten)]
    kind: &'a NodeKind,
}

#[derive(Deserialize)]
struct NodeRepr {
    #[serde(default)]
    span: Option<Span>,
    #[serde(flatten)]
    kind: NodeKind,
}

// 每层节点都经过 ensure_sufficient_stack，深层树不会耗尽线程栈
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ensure_sufficient_stack(|| {
            NodeRef {
                span: self.span,
                kind: &self.kind,
            }
            .serialize(serializer)
        })
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ensure_sufficient_stack(|| {
            let NodeRepr { span, kind } = NodeRepr::deserialize(deserializer)?;
            Ok(Node { span, kind })
        })
    }
}

/// One variant per node kind. Children are owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    // --- Program / modules ---
    Program {
        elements: Vec<Node>,
    },
    ModuleDefinition {
        name: Box<Node>,
        elements: Vec<Node>,
    },
    ModuleDeclaration {
        specifiers: Vec<Node>,
    },
    ModuleSpecifier {
        identifier: String,
        expression: Box<Node>,
    },
    ModuleExpression {
        reference: Box<Node>,
        identifiers: Vec<String>,
    },
    ModuleRequire {
        url: String,
    },
    ExportDeclaration {
        declaration: Box<Node>,
    },
    ExportMappingList {
        paths: Vec<Node>,
    },
    ExportMapping {
        module_expression: Option<Box<Node>>,
        specifier_set: Box<Node>,
    },
    ExportSpecifierSet {
        specifiers: Vec<Node>,
    },
    ExportSpecifier {
        lhs: String,
        rhs: Option<String>,
    },
    ExportStar,
    ImportDeclaration {
        specifier_set: Box<Node>,
        module_expression: Box<Node>,
    },
    ImportSpecifierSet {
        specifiers: Vec<Node>,
    },
    ImportSpecifier {
        lhs: String,
        rhs: Option<String>,
    },

    // --- Statements ---
    Block {
        statements: Vec<Node>,
    },
    VariableStatement {
        declarations: Box<Node>,
    },
    VariableDeclarationList {
        declaration_kind: DeclarationKind,
        declarations: Vec<Node>,
    },
    VariableDeclaration {
        lvalue: Box<Node>,
        initializer: Option<Box<Node>>,
    },
    EmptyStatement,
    ExpressionStatement {
        expression: Box<Node>,
    },
    IfStatement {
        condition: Box<Node>,
        if_clause: Box<Node>,
        else_clause: Option<Box<Node>>,
    },
    DoWhileStatement {
        body: Box<Node>,
        condition: Box<Node>,
    },
    WhileStatement {
        condition: Box<Node>,
        body: Box<Node>,
    },
    ForStatement {
        initializer: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        increment: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForInStatement {
        initializer: Box<Node>,
        collection: Box<Node>,
        body: Box<Node>,
    },
    ForOfStatement {
        initializer: Box<Node>,
        collection: Box<Node>,
        body: Box<Node>,
    },
    ContinueStatement {
        label: Option<String>,
    },
    BreakStatement {
        label: Option<String>,
    },
    ReturnStatement {
        expression: Option<Box<Node>>,
    },
    WithStatement {
        expression: Box<Node>,
        body: Box<Node>,
    },
    SwitchStatement {
        expression: Box<Node>,
        clauses: Vec<Node>,
    },
    CaseClause {
        expression: Box<Node>,
        statements: Vec<Node>,
    },
    DefaultClause {
        statements: Vec<Node>,
    },
    LabelledStatement {
        label: String,
        statement: Box<Node>,
    },
    ThrowStatement {
        value: Option<Box<Node>>,
    },
    TryStatement {
        body: Box<Node>,
        catch_block: Option<Box<Node>>,
        finally_block: Option<Box<Node>>,
    },
    Catch {
        binding: Box<Node>,
        catch_body: Box<Node>,
    },
    Finally {
        block: Box<Node>,
    },
    DebuggerStatement,
    AwaitStatement {
        identifier: Option<String>,
        expression: Box<Node>,
    },

    // --- Functions / classes ---
    FunctionDeclaration {
        name: Option<Box<Node>>,
        is_generator: bool,
        parameters: Box<Node>,
        body: Box<Node>,
    },
    FunctionExpression {
        name: Option<Box<Node>>,
        is_generator: bool,
        parameters: Box<Node>,
        body: Box<Node>,
    },
    ArrowFunctionExpression {
        parameters: Box<Node>,
        body: Box<Node>,
    },
    FormalParameterList {
        parameters: Vec<Node>,
    },
    RestParameter {
        identifier: Box<Node>,
    },
    BindingElement {
        binding: Box<Node>,
        initializer: Option<Box<Node>>,
    },
    BindingIdentifier {
        name: String,
    },
    ClassDeclaration {
        name: Option<Box<Node>>,
        superclass: Option<Box<Node>>,
        elements: Vec<Node>,
    },
    ClassExpression {
        name: Option<Box<Node>>,
        superclass: Option<Box<Node>>,
        elements: Vec<Node>,
    },
    PropertyMethodAssignment {
        name: String,
        is_generator: bool,
        parameters: Box<Node>,
        body: Box<Node>,
    },
    GetAccessor {
        name: String,
        body: Box<Node>,
    },
    SetAccessor {
        name: String,
        parameter: Box<Node>,
        body: Box<Node>,
    },
    PropertyNameAssignment {
        name: String,
        value: Box<Node>,
    },
    PropertyNameShorthand {
        name: String,
    },

    // --- Expressions ---
    IdentifierExpression {
        name: String,
    },
    ThisExpression,
    SuperExpression,
    LiteralExpression {
        literal: Literal,
    },
    ArrayLiteralExpression {
        elements: Vec<Option<Node>>,
    },
    ObjectLiteralExpression {
        properties: Vec<Node>,
    },
    ParenExpression {
        expression: Box<Node>,
    },
    UnaryExpression {
        operator: Operator,
        operand: Box<Node>,
    },
    PostfixExpression {
        operand: Box<Node>,
        operator: Operator,
    },
    BinaryOperator {
        left: Box<Node>,
        operator: Operator,
        right: Box<Node>,
    },
    ConditionalExpression {
        condition: Box<Node>,
        left: Box<Node>,
        right: Box<Node>,
    },
    CommaExpression {
        expressions: Vec<Node>,
    },
    CallExpression {
        operand: Box<Node>,
        args: Box<Node>,
    },
    ArgumentList {
        args: Vec<Node>,
    },
    NewExpression {
        operand: Box<Node>,
        args: Option<Box<Node>>,
    },
    MemberExpression {
        operand: Box<Node>,
        member_name: String,
    },
    MemberLookupExpression {
        operand: Box<Node>,
        member_expression: Box<Node>,
    },
    SpreadExpression {
        expression: Box<Node>,
    },
    YieldExpression {
        expression: Option<Box<Node>>,
        is_yield_for: bool,
    },
    QuasiLiteralExpression {
        operand: Option<Box<Node>>,
        elements: Vec<Node>,
    },
    QuasiLiteralPortion {
        value: String,
    },
    QuasiSubstitution {
        expression: Box<Node>,
    },
    ArrayComprehension {
        comprehension_list: Vec<Node>,
        expression: Box<Node>,
    },
    GeneratorComprehension {
        comprehension_list: Vec<Node>,
        expression: Box<Node>,
    },
    ComprehensionFor {
        left: Box<Node>,
        iterator: Box<Node>,
    },
    ComprehensionIf {
        expression: Box<Node>,
    },
    MissingPrimaryExpression,

    // --- Patterns ---
    ArrayPattern {
        elements: Vec<Option<Node>>,
    },
    ObjectPattern {
        fields: Vec<Node>,
    },
    ObjectPatternField {
        name: String,
        element: Box<Node>,
    },
    SpreadPatternElement {
        lvalue: Box<Node>,
    },

    // --- Generator lowering artifact ---
    StateMachine(StateMachine),
}

impl NodeKind {
    /// The kind name used in diagnostics and rendered trees.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::ModuleDefinition { .. } => "ModuleDefinition",
            NodeKind::ModuleDeclaration { .. } => "ModuleDeclaration",
            NodeKind::ModuleSpecifier { .. } => "ModuleSpecifier",
            NodeKind::ModuleExpression { .. } => "ModuleExpression",
            NodeKind::ModuleRequire { .. } => "ModuleRequire",
            NodeKind::ExportDeclaration { .. } => "ExportDeclaration",
            NodeKind::ExportMappingList { .. } => "ExportMappingList",
            NodeKind::ExportMapping { .. } => "ExportMapping",
            NodeKind::ExportSpecifierSet { .. } => "ExportSpecifierSet",
            NodeKind::ExportSpecifier { .. } => "ExportSpecifier",
            NodeKind::ExportStar => "ExportStar",
            NodeKind::ImportDeclaration { .. } => "ImportDeclaration",
            NodeKind::ImportSpecifierSet { .. } => "ImportSpecifierSet",
            NodeKind::ImportSpecifier { .. } => "ImportSpecifier",
            NodeKind::Block { .. } => "Block",
            NodeKind::VariableStatement { .. } => "VariableStatement",
            NodeKind::VariableDeclarationList { .. } => "VariableDeclarationList",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::EmptyStatement => "EmptyStatement",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::DoWhileStatement { .. } => "DoWhileStatement",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::ForInStatement { .. } => "ForInStatement",
            NodeKind::ForOfStatement { .. } => "ForOfStatement",
            NodeKind::ContinueStatement { .. } => "ContinueStatement",
            NodeKind::BreakStatement { .. } => "BreakStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::WithStatement { .. } => "WithStatement",
            NodeKind::SwitchStatement { .. } => "SwitchStatement",
            NodeKind::CaseClause { .. } => "CaseClause",
            NodeKind::DefaultClause { .. } => "DefaultClause",
            NodeKind::LabelledStatement { .. } => "LabelledStatement",
            NodeKind::ThrowStatement { .. } => "ThrowStatement",
            NodeKind::TryStatement { .. } => "TryStatement",
            NodeKind::Catch { .. } => "Catch",
            NodeKind::Finally { .. } => "Finally",
            NodeKind::DebuggerStatement => "DebuggerStatement",
            NodeKind::AwaitStatement { .. } => "AwaitStatement",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::FunctionExpression { .. } => "FunctionExpression",
            NodeKind::ArrowFunctionExpression { .. } => "ArrowFunctionExpression",
            NodeKind::FormalParameterList { .. } => "FormalParameterList",
            NodeKind::RestParameter { .. } => "RestParameter",
            NodeKind::BindingElement { .. } => "BindingElement",
            NodeKind::BindingIdentifier { .. } => "BindingIdentifier",
            NodeKind::ClassDeclaration { .. } => "ClassDeclaration",
            NodeKind::ClassExpression { .. } => "ClassExpression",
            NodeKind::PropertyMethodAssignment { .. } => "PropertyMethodAssignment",
            NodeKind::GetAccessor { .. } => "GetAccessor",
            NodeKind::SetAccessor { .. } => "SetAccessor",
            NodeKind::PropertyNameAssignment { .. } => "PropertyNameAssignment",
            NodeKind::PropertyNameShorthand { .. } => "PropertyNameShorthand",
            NodeKind::IdentifierExpression { .. } => "IdentifierExpression",
            NodeKind::ThisExpression => "ThisExpression",
            NodeKind::SuperExpression => "SuperExpression",
            NodeKind::LiteralExpression { .. } => "LiteralExpression",
            NodeKind::ArrayLiteralExpression { .. } => "ArrayLiteralExpression",
            NodeKind::ObjectLiteralExpression { .. } => "ObjectLiteralExpression",
            NodeKind::ParenExpression { .. } => "ParenExpression",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::PostfixExpression { .. } => "PostfixExpression",
            NodeKind::BinaryOperator { .. } => "BinaryOperator",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::CommaExpression { .. } => "CommaExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::ArgumentList { .. } => "ArgumentList",
            NodeKind::NewExpression { .. } => "NewExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::MemberLookupExpression { .. } => "MemberLookupExpression",
            NodeKind::SpreadExpression { .. } => "SpreadExpression",
            NodeKind::YieldExpression { .. } => "YieldExpression",
            NodeKind::QuasiLiteralExpression { .. } => "QuasiLiteralExpression",
            NodeKind::QuasiLiteralPortion { .. } => "QuasiLiteralPortion",
            NodeKind::QuasiSubstitution { .. } => "QuasiSubstitution",
            NodeKind::ArrayComprehension { .. } => "ArrayComprehension",
            NodeKind::GeneratorComprehension { .. } => "GeneratorComprehension",
            NodeKind::ComprehensionFor { .. } => "ComprehensionFor",
            NodeKind::ComprehensionIf { .. } => "ComprehensionIf",
            NodeKind::MissingPrimaryExpression => "MissingPrimaryExpression",
            NodeKind::ArrayPattern { .. } => "ArrayPattern",
            NodeKind::ObjectPattern { .. } => "ObjectPattern",
            NodeKind::ObjectPatternField { .. } => "ObjectPatternField",
            NodeKind::SpreadPatternElement { .. } => "SpreadPatternElement",
            NodeKind::StateMachine(_) => "StateMachine",
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node { span: None, kind }
    }

    /// Reads a tree from JSON.
    ///
    /// The reader imposes no nesting limit of its own; depth is bounded by
    /// the validator's `max_depth` alone.
    pub fn from_json(source: &str) -> serde_json::Result<Node> {
        let mut json = serde_json::Deserializer::from_str(source);
        json.disable_recursion_limit();
        let node = Node::deserialize(&mut json)?;
        json.end()?;
        Ok(node)
    }

    pub fn with_span(kind: NodeKind, span: Span) -> Self {
        Node {
            span: Some(span),
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Direct children in source order, each tagged with its field name.
    /// Elided array elements appear as `None`.
    pub fn children(&self) -> Vec<(&'static str, Option<&Node>)> {
        fn one<'a>(out: &mut Vec<(&'static str, Option<&'a Node>)>, field: &'static str, n: &'a Node) {
            out.push((field, Some(n)));
        }
        fn opt<'a>(
            out: &mut Vec<(&'static str, Option<&'a Node>)>,
            field: &'static str,
            n: &'a Option<Box<Node>>,
        ) {
            if let Some(n) = n {
                out.push((field, Some(n)));
            }
        }
        fn many<'a>(out: &mut Vec<(&'static str, Option<&'a Node>)>, field: &'static str, ns: &'a [Node]) {
            out.extend(ns.iter().map(|n| (field, Some(n))));
        }
        fn holes<'a>(
            out: &mut Vec<(&'static str, Option<&'a Node>)>,
            field: &'static str,
            ns: &'a [Option<Node>],
        ) {
            out.extend(ns.iter().map(|n| (field, n.as_ref())));
        }

        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Program { elements } => many(&mut out, "element", elements),
            NodeKind::ModuleDefinition { name, elements } => {
                one(&mut out, "name", name);
                many(&mut out, "element", elements);
            }
            NodeKind::ModuleDeclaration { specifiers } => many(&mut out, "specifier", specifiers),
            NodeKind::ModuleSpecifier { expression, .. } => one(&mut out, "expression", expression),
            NodeKind::ModuleExpression { reference, .. } => one(&mut out, "reference", reference),
            NodeKind::ExportDeclaration { declaration } => one(&mut out, "declaration", declaration),
            NodeKind::ExportMappingList { paths } => many(&mut out, "path", paths),
            NodeKind::ExportMapping {
                module_expression,
                specifier_set,
            } => {
                opt(&mut out, "module", module_expression);
                one(&mut out, "specifiers", specifier_set);
            }
            NodeKind::ExportSpecifierSet { specifiers } | NodeKind::ImportSpecifierSet { specifiers } => {
                many(&mut out, "specifier", specifiers)
            }
            NodeKind::ImportDeclaration {
                specifier_set,
                module_expression,
            } => {
                one(&mut out, "specifiers", specifier_set);
                one(&mut out, "module", module_expression);
            }
            NodeKind::Block { statements }
            | NodeKind::DefaultClause { statements } => many(&mut out, "statement", statements),
            NodeKind::VariableStatement { declarations } => one(&mut out, "declarations", declarations),
            NodeKind::VariableDeclarationList { declarations, .. } => {
                many(&mut out, "declaration", declarations)
            }
            NodeKind::VariableDeclaration { lvalue, initializer } => {
                one(&mut out, "lvalue", lvalue);
                opt(&mut out, "initializer", initializer);
            }
            NodeKind::ExpressionStatement { expression }
            | NodeKind::ParenExpression { expression }
            | NodeKind::SpreadExpression { expression }
            | NodeKind::QuasiSubstitution { expression }
            | NodeKind::ComprehensionIf { expression }
            | NodeKind::AwaitStatement { expression, .. } => one(&mut out, "expression", expression),
            NodeKind::IfStatement {
                condition,
                if_clause,
                else_clause,
            } => {
                one(&mut out, "condition", condition);
                one(&mut out, "then", if_clause);
                opt(&mut out, "else", else_clause);
            }
            NodeKind::DoWhileStatement { body, condition } => {
                one(&mut out, "body", body);
                one(&mut out, "condition", condition);
            }
            NodeKind::WhileStatement { condition, body } => {
                one(&mut out, "condition", condition);
                one(&mut out, "body", body);
            }
            NodeKind::ForStatement {
                initializer,
                condition,
                increment,
                body,
            } => {
                opt(&mut out, "initializer", initializer);
                opt(&mut out, "condition", condition);
                opt(&mut out, "increment", increment);
                one(&mut out, "body", body);
            }
            NodeKind::ForInStatement {
                initializer,
                collection,
                body,
            }
            | NodeKind::ForOfStatement {
                initializer,
                collection,
                body,
            } => {
                one(&mut out, "initializer", initializer);
                one(&mut out, "collection", collection);
                one(&mut out, "body", body);
            }
            NodeKind::ReturnStatement { expression } => opt(&mut out, "expression", expression),
            NodeKind::ThrowStatement { value } => opt(&mut out, "value", value),
            NodeKind::WithStatement { expression, body } => {
                one(&mut out, "expression", expression);
                one(&mut out, "body", body);
            }
            NodeKind::SwitchStatement { expression, clauses } => {
                one(&mut out, "expression", expression);
                many(&mut out, "clause", clauses);
            }
            NodeKind::CaseClause {
                expression,
                statements,
            } => {
                one(&mut out, "expression", expression);
                many(&mut out, "statement", statements);
            }
            NodeKind::LabelledStatement { statement, .. } => one(&mut out, "statement", statement),
            NodeKind::TryStatement {
                body,
                catch_block,
                finally_block,
            } => {
                one(&mut out, "body", body);
                opt(&mut out, "catch", catch_block);
                opt(&mut out, "finally", finally_block);
            }
            NodeKind::Catch {
                binding,
                catch_body,
            } => {
                one(&mut out, "binding", binding);
                one(&mut out, "body", catch_body);
            }
            NodeKind::Finally { block } => one(&mut out, "block", block),
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
                opt(&mut out, "name", name);
                one(&mut out, "parameters", parameters);
                one(&mut out, "body", body);
            }
            NodeKind::ArrowFunctionExpression { parameters, body }
            | NodeKind::PropertyMethodAssignment {
                parameters, body, ..
            } => {
                one(&mut out, "parameters", parameters);
                one(&mut out, "body", body);
            }
            NodeKind::FormalParameterList { parameters } => many(&mut out, "parameter", parameters),
            NodeKind::RestParameter { identifier } => one(&mut out, "identifier", identifier),
            NodeKind::BindingElement {
                binding,
                initializer,
            } => {
                one(&mut out, "binding", binding);
                opt(&mut out, "initializer", initializer);
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
                opt(&mut out, "name", name);
                opt(&mut out, "superclass", superclass);
                many(&mut out, "element", elements);
            }
            NodeKind::GetAccessor { body, .. } => one(&mut out, "body", body),
            NodeKind::SetAccessor {
                parameter, body, ..
            } => {
                one(&mut out, "parameter", parameter);
                one(&mut out, "body", body);
            }
            NodeKind::PropertyNameAssignment { value, .. } => one(&mut out, "value", value),
            NodeKind::ArrayLiteralExpression { elements } | NodeKind::ArrayPattern { elements } => {
                holes(&mut out, "element", elements)
            }
            NodeKind::ObjectLiteralExpression { properties } => many(&mut out, "property", properties),
            NodeKind::UnaryExpression { operand, .. } | NodeKind::PostfixExpression { operand, .. } => {
                one(&mut out, "operand", operand)
            }
            NodeKind::BinaryOperator { left, right, .. } => {
                one(&mut out, "left", left);
                one(&mut out, "right", right);
            }
            NodeKind::ConditionalExpression {
                condition,
                left,
                right,
            } => {
                one(&mut out, "condition", condition);
                one(&mut out, "left", left);
                one(&mut out, "right", right);
            }
            NodeKind::CommaExpression { expressions } => many(&mut out, "expression", expressions),
            NodeKind::CallExpression { operand, args } => {
                one(&mut out, "operand", operand);
                one(&mut out, "args", args);
            }
            NodeKind::ArgumentList { args } => many(&mut out, "arg", args),
            NodeKind::NewExpression { operand, args } => {
                one(&mut out, "operand", operand);
                opt(&mut out, "args", args);
            }
            NodeKind::MemberExpression { operand, .. } => one(&mut out, "operand", operand),
            NodeKind::MemberLookupExpression {
                operand,
                member_expression,
            } => {
                one(&mut out, "operand", operand);
                one(&mut out, "member", member_expression);
            }
            NodeKind::YieldExpression { expression, .. } => opt(&mut out, "expression", expression),
            NodeKind::QuasiLiteralExpression { operand, elements } => {
                opt(&mut out, "operand", operand);
                many(&mut out, "element", elements);
            }
            NodeKind::ArrayComprehension {
                comprehension_list,
                expression,
            }
            | NodeKind::GeneratorComprehension {
                comprehension_list,
                expression,
            } => {
                many(&mut out, "comprehension", comprehension_list);
                one(&mut out, "expression", expression);
            }
            NodeKind::ComprehensionFor { left, iterator } => {
                one(&mut out, "left", left);
                one(&mut out, "iterator", iterator);
            }
            NodeKind::ObjectPattern { fields } => many(&mut out, "field", fields),
            NodeKind::ObjectPatternField { element, .. } => one(&mut out, "element", element),
            NodeKind::SpreadPatternElement { lvalue } => one(&mut out, "lvalue", lvalue),
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
            | NodeKind::QuasiLiteralPortion { .. }
            | NodeKind::MissingPrimaryExpression
            | NodeKind::StateMachine(_) => {}
        }
        out
    }

    // --- Node categories ---
    // 这些分类谓词是验证器检查子节点前置条件的基础。

    pub fn is_pattern(&self) -> bool {
        match &self.kind {
            NodeKind::ArrayPattern { .. } | NodeKind::ObjectPattern { .. } => true,
            NodeKind::ParenExpression { expression } => expression.is_pattern(),
            _ => false,
        }
    }

    pub fn is_left_hand_side_expression(&self) -> bool {
        match &self.kind {
            NodeKind::ThisExpression
            | NodeKind::ClassExpression { .. }
            | NodeKind::SuperExpression
            | NodeKind::IdentifierExpression { .. }
            | NodeKind::LiteralExpression { .. }
            | NodeKind::ArrayLiteralExpression { .. }
            | NodeKind::ObjectLiteralExpression { .. }
            | NodeKind::NewExpression { .. }
            | NodeKind::MemberExpression { .. }
            | NodeKind::MemberLookupExpression { .. }
            | NodeKind::CallExpression { .. }
            | NodeKind::FunctionExpression { .. }
            | NodeKind::QuasiLiteralExpression { .. } => true,
            NodeKind::ParenExpression { expression } => expression.is_left_hand_side_expression(),
            _ => false,
        }
    }

    /// Anything that may appear as the operand of a call, member access or
    /// `new`.
    pub fn is_member_expression(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::ThisExpression
                | NodeKind::ClassExpression { .. }
                | NodeKind::SuperExpression
                | NodeKind::IdentifierExpression { .. }
                | NodeKind::LiteralExpression { .. }
                | NodeKind::ArrayLiteralExpression { .. }
                | NodeKind::ObjectLiteralExpression { .. }
                | NodeKind::ParenExpression { .. }
                | NodeKind::QuasiLiteralExpression { .. }
                | NodeKind::FunctionExpression { .. }
                | NodeKind::MemberLookupExpression { .. }
                | NodeKind::MemberExpression { .. }
                | NodeKind::CallExpression { .. }
                | NodeKind::NewExpression { .. }
        )
    }

    /// Any expression that is not a comma expression.
    pub fn is_assignment_expression(&self) -> bool {
        match &self.kind {
            NodeKind::ArrayComprehension { .. }
            | NodeKind::ArrowFunctionExpression { .. }
            | NodeKind::BinaryOperator { .. }
            | NodeKind::ConditionalExpression { .. }
            | NodeKind::GeneratorComprehension { .. }
            | NodeKind::MissingPrimaryExpression
            | NodeKind::PostfixExpression { .. }
            | NodeKind::UnaryExpression { .. }
            | NodeKind::YieldExpression { .. } => true,
            _ => self.is_left_hand_side_expression(),
        }
    }

    pub fn is_expression(&self) -> bool {
        self.is_assignment_expression() || matches!(self.kind, NodeKind::CommaExpression { .. })
    }

    pub fn is_assignment_or_spread(&self) -> bool {
        self.is_assignment_expression() || matches!(self.kind, NodeKind::SpreadExpression { .. })
    }

    fn is_statement_standard(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Block { .. }
                | NodeKind::VariableStatement { .. }
                | NodeKind::EmptyStatement
                | NodeKind::ExpressionStatement { .. }
                | NodeKind::IfStatement { .. }
                | NodeKind::DoWhileStatement { .. }
                | NodeKind::WhileStatement { .. }
                | NodeKind::ForStatement { .. }
                | NodeKind::ForInStatement { .. }
                | NodeKind::ForOfStatement { .. }
                | NodeKind::ContinueStatement { .. }
                | NodeKind::BreakStatement { .. }
                | NodeKind::ReturnStatement { .. }
                | NodeKind::WithStatement { .. }
                | NodeKind::SwitchStatement { .. }
                | NodeKind::LabelledStatement { .. }
                | NodeKind::ThrowStatement { .. }
                | NodeKind::TryStatement { .. }
                | NodeKind::DebuggerStatement
                | NodeKind::AwaitStatement { .. }
                | NodeKind::StateMachine(_)
        )
    }

    /// A statement or a function / class declaration.
    pub fn is_source_element(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::FunctionDeclaration { .. } | NodeKind::ClassDeclaration { .. }
        ) || self.is_statement_standard()
    }

    pub fn is_statement(&self) -> bool {
        self.is_source_element()
    }

    /// What may appear directly in a `Program` or `ModuleDefinition`.
    pub fn is_program_element(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::ModuleDefinition { .. }
                | NodeKind::ModuleDeclaration { .. }
                | NodeKind::ExportDeclaration { .. }
                | NodeKind::ImportDeclaration { .. }
        ) || self.is_source_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Node {
        Node::new(NodeKind::IdentifierExpression {
            name: name.to_string(),
        })
    }

    #[test]
    fn paren_forwards_pattern_and_lhs() {
        let paren_pattern = Node::new(NodeKind::ParenExpression {
            expression: Box::new(Node::new(NodeKind::ArrayPattern { elements: vec![] })),
        });
        assert!(paren_pattern.is_pattern());
        assert!(!paren_pattern.is_left_hand_side_expression());

        let paren_ident = Node::new(NodeKind::ParenExpression {
            expression: Box::new(ident("a")),
        });
        assert!(!paren_ident.is_pattern());
        assert!(paren_ident.is_left_hand_side_expression());
    }

    #[test]
    fn comma_is_expression_but_not_assignment_expression() {
        let comma = Node::new(NodeKind::CommaExpression {
            expressions: vec![ident("a"), ident("b")],
        });
        assert!(comma.is_expression());
        assert!(!comma.is_assignment_expression());
        assert!(!comma.is_assignment_or_spread());
    }

    #[test]
    fn state_machine_counts_as_statement() {
        let sm = Node::new(NodeKind::StateMachine(StateMachine::new(0, 1, vec![])));
        assert!(sm.is_statement());
        assert!(!sm.is_expression());
    }

    #[test]
    fn declarations_are_source_elements_not_expressions() {
        let params = Box::new(Node::new(NodeKind::FormalParameterList { parameters: vec![] }));
        let body = Box::new(Node::new(NodeKind::Block { statements: vec![] }));
        let decl = Node::new(NodeKind::FunctionDeclaration {
            name: None,
            is_generator: true,
            parameters: params,
            body,
        });
        assert!(decl.is_source_element());
        assert!(decl.is_program_element());
        assert!(!decl.is_assignment_expression());
    }

    #[test]
    fn operator_families() {
        assert!(Operator::PlusEqual.is_assignment());
        assert!(!Operator::PlusEqual.is_binary_value_operator());
        assert!(Operator::Instanceof.is_binary_value_operator());
        assert!(!Operator::Typeof.is_binary_value_operator());
        assert_eq!(Operator::Identifier("isnt".to_string()).to_string(), "isnt");
    }
}
