// src/emitter.rs

//! Renders a parse tree as an indented outline for diagnostics.
//!
//! One node per line, children indented under their parent with the field
//! they sit in. The optional highlighted subtree is marked with `>>` and its
//! byte range in the output is reported so a `miette` label can point at it.

use crate::ast::{Node, NodeKind};
use crate::common::{MAX_NESTING_DEPTH, ensure_sufficient_stack};
use crate::ir::state_machine::State;
use std::fmt::Write;

#[derive(Debug, Clone, Copy)]
pub struct WriterOptions<'a> {
    pub highlighted: Option<&'a Node>,
    pub show_line_numbers: bool,
    /// Subtrees nested deeper than this are printed as a single `…` line.
    pub max_depth: usize,
}

impl Default for WriterOptions<'_> {
    fn default() -> Self {
        WriterOptions {
            highlighted: None,
            show_line_numbers: true,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTree {
    pub text: String,
    /// `(offset, length)` of the highlighted lines in `text`.
    pub highlight: Option<(usize, usize)>,
}

struct TreeWriter<'a> {
    output: String,
    options: WriterOptions<'a>,
    line: usize,
    highlight_start: Option<usize>,
    highlight_end: usize,
}

/// 将整棵树写成带行号的文本。
pub fn write_tree(root: &Node, options: WriterOptions<'_>) -> Result<RenderedTree, std::fmt::Error> {
    let mut writer = TreeWriter {
        output: String::new(),
        options,
        line: 0,
        highlight_start: None,
        highlight_end: 0,
    };
    writer.write_node(None, root, 0, false)?;

    let highlight = writer
        .highlight_start
        .map(|start| (start, writer.highlight_end.saturating_sub(start)));
    Ok(RenderedTree {
        text: writer.output,
        highlight,
    })
}

impl TreeWriter<'_> {
    fn write_node(
        &mut self,
        field: Option<&str>,
        node: &Node,
        depth: usize,
        inside_highlight: bool,
    ) -> Result<(), std::fmt::Error> {
        let is_highlighted = self
            .options
            .highlighted
            .is_some_and(|h| std::ptr::eq(h, node));
        let marked = inside_highlight || is_highlighted;
        if depth >= self.options.max_depth {
            return self.write_line(depth, "…", marked);
        }

        let mut text = String::new();
        if let Some(field) = field {
            write!(&mut text, "{}: ", field)?;
        }
        text.push_str(node.name());
        let detail = describe(node);
        if !detail.is_empty() {
            write!(&mut text, " {}", detail)?;
        }
        if let Some(span) = node.span {
            write!(&mut text, " @{}", span.start)?;
        }
        self.write_line(depth, &text, marked)?;

        for (child_field, child) in node.children() {
            match child {
                Some(child) => ensure_sufficient_stack(|| {
                    self.write_node(Some(child_field), child, depth + 1, marked)
                })?,
                None => self.write_line(depth + 1, &format!("{}: <elision>", child_field), marked)?,
            }
        }
        Ok(())
    }

    fn write_line(&mut self, depth: usize, text: &str, marked: bool) -> Result<(), std::fmt::Error> {
        self.line += 1;
        let start = self.output.len();
        if self.options.show_line_numbers {
            write!(&mut self.output, "{:>4} ", self.line)?;
        }
        let marker = if marked { ">>" } else { "  " };
        writeln!(&mut self.output, "{} {}{}", marker, "  ".repeat(depth), text)?;

        if marked {
            if self.highlight_start.is_none() {
                self.highlight_start = Some(start);
            }
            // 不包含行尾换行符
            self.highlight_end = self.output.len() - 1;
        }
        Ok(())
    }
}

/// The inline payload of a node: names, labels, operators, literals.
fn describe(node: &Node) -> String {
    match &node.kind {
        NodeKind::ModuleSpecifier { identifier, .. } => identifier.clone(),
        NodeKind::ModuleExpression { identifiers, .. } => identifiers.join("."),
        NodeKind::ModuleRequire { url } => format!("{:?}", url),
        NodeKind::ExportSpecifier { lhs, rhs } | NodeKind::ImportSpecifier { lhs, rhs } => match rhs {
            Some(rhs) => format!("{} as {}", lhs, rhs),
            None => lhs.clone(),
        },
        NodeKind::VariableDeclarationList {
            declaration_kind, ..
        } => format!("{:?}", declaration_kind).to_lowercase(),
        NodeKind::ContinueStatement { label } | NodeKind::BreakStatement { label } => {
            label.clone().unwrap_or_default()
        }
        NodeKind::LabelledStatement { label, .. } => format!("{}:", label),
        NodeKind::AwaitStatement { identifier, .. } => identifier.clone().unwrap_or_default(),
        NodeKind::FunctionDeclaration { is_generator, .. }
        | NodeKind::FunctionExpression { is_generator, .. } => {
            if *is_generator {
                "*".to_string()
            } else {
                String::new()
            }
        }
        NodeKind::PropertyMethodAssignment {
            name, is_generator, ..
        } => {
            if *is_generator {
                format!("*{}", name)
            } else {
                name.clone()
            }
        }
        NodeKind::GetAccessor { name, .. }
        | NodeKind::SetAccessor { name, .. }
        | NodeKind::PropertyNameAssignment { name, .. }
        | NodeKind::PropertyNameShorthand { name }
        | NodeKind::BindingIdentifier { name }
        | NodeKind::IdentifierExpression { name }
        | NodeKind::ObjectPatternField { name, .. } => name.clone(),
        NodeKind::LiteralExpression { literal } => literal.to_string(),
        NodeKind::UnaryExpression { operator, .. }
        | NodeKind::PostfixExpression { operator, .. }
        | NodeKind::BinaryOperator { operator, .. } => operator.to_string(),
        NodeKind::MemberExpression { member_name, .. } => format!(".{}", member_name),
        NodeKind::YieldExpression { is_yield_for, .. } => {
            if *is_yield_for {
                "for".to_string()
            } else {
                String::new()
            }
        }
        NodeKind::QuasiLiteralPortion { value } => format!("{:?}", value),
        NodeKind::StateMachine(machine) => {
            let states: Vec<String> = machine
                .states
                .iter()
                .map(|state| {
                    let (kind, id, label) = match state {
                        State::Break { id, label } => ("break", id, label),
                        State::Continue { id, label } => ("continue", id, label),
                    };
                    match label {
                        Some(label) => format!("{}({}, {})", kind, id, label),
                        None => format!("{}({})", kind, id),
                    }
                })
                .collect();
            format!(
                "start={} fallthrough={} [{}]",
                machine.start_state,
                machine.fallthrough_state,
                states.join(", ")
            )
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Position, Span};

    fn stmt(kind: NodeKind) -> Node {
        Node::new(kind)
    }

    #[test]
    fn writes_numbered_outline() {
        let tree = stmt(NodeKind::Block {
            statements: vec![
                stmt(NodeKind::BreakStatement {
                    label: Some("outer".to_string()),
                }),
                stmt(NodeKind::EmptyStatement),
            ],
        });
        let rendered = write_tree(&tree, WriterOptions::default()).expect("write to string");
        let lines: Vec<&str> = rendered.text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "   1    Block");
        assert_eq!(lines[1], "   2      statement: BreakStatement outer");
        assert_eq!(lines[2], "   3      statement: EmptyStatement");
        assert!(rendered.highlight.is_none());
    }

    #[test]
    fn highlights_only_the_marked_subtree() {
        let tree = stmt(NodeKind::Block {
            statements: vec![
                stmt(NodeKind::EmptyStatement),
                stmt(NodeKind::ExpressionStatement {
                    expression: Box::new(stmt(NodeKind::ThisExpression)),
                }),
            ],
        });
        let NodeKind::Block { statements } = &tree.kind else {
            panic!("expected block");
        };
        let options = WriterOptions {
            highlighted: Some(&statements[1]),
            show_line_numbers: false,
            ..WriterOptions::default()
        };
        let rendered = write_tree(&tree, options).expect("write to string");
        let (start, len) = rendered.highlight.expect("highlight range");
        let marked = &rendered.text[start..start + len];
        assert!(marked.starts_with(">>   statement: ExpressionStatement"));
        assert!(marked.ends_with("expression: ThisExpression"));
        assert!(!marked.contains("EmptyStatement"));
    }

    #[test]
    fn shows_span_start() {
        let at = |line, column| Position {
            line,
            column,
            offset: 0,
        };
        let tree = Node::with_span(NodeKind::DebuggerStatement, Span::new(at(3, 5), at(3, 14)));
        let rendered = write_tree(&tree, WriterOptions::default()).expect("write to string");
        assert_eq!(rendered.text, "   1    DebuggerStatement @3:5\n");
    }

    #[test]
    fn elides_subtrees_past_max_depth() {
        let mut tree = stmt(NodeKind::EmptyStatement);
        for _ in 0..10 {
            tree = stmt(NodeKind::Block {
                statements: vec![tree],
            });
        }
        let options = WriterOptions {
            max_depth: 3,
            ..WriterOptions::default()
        };
        let rendered = write_tree(&tree, options).expect("write to string");
        let lines: Vec<&str> = rendered.text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "   4          …");
        assert!(!rendered.text.contains("EmptyStatement"));
    }
}
