// src/semantics/break_continue.rs

//! Lowers `break` / `continue` statements that must cross a suspension
//! boundary into one-state machine fragments.
//!
//! The composition driver only calls this on statements that contain a
//! `yield`. Loops and functions own their jump targets and are lowered as
//! units elsewhere, so the rewrite never enters them. Expressions are never
//! entered either: a jump can only sit at statement level.

use crate::ast::{Node, NodeKind};
use crate::common::{StateAllocator, ensure_sufficient_stack};
use crate::ir::state_machine::{State, StateId, StateMachine};

pub struct BreakContinueTransformer<'a> {
    state_allocator: &'a mut StateAllocator,
}

/// Where a jump sits relative to the nearest switch lowered as a unit.
#[derive(Debug, Clone)]
struct JumpScope {
    /// Whether unlabeled breaks here escape the statement being lowered.
    /// Inside a switch they only leave the switch.
    transform_breaks: bool,
    /// Labels bound on or inside that switch; breaks naming them stay local.
    local_labels: Vec<String>,
}

impl JumpScope {
    fn top() -> Self {
        JumpScope {
            transform_breaks: true,
            local_labels: Vec::new(),
        }
    }

    /// Whether a `break` here must become a state machine fragment.
    ///
    /// Inside a switch, an unlabeled break and a break naming a label bound
    /// on the switch itself (`sw: switch (x) { case 0: break sw; }`) or on a
    /// statement nested in it only leave that switch, so they stay plain
    /// breaks. The state machine interpreter never sees them. Any other
    /// labeled break targets a construct outside the switch and is lowered.
    fn lowers_break(&self, label: Option<&str>) -> bool {
        if self.transform_breaks {
            return true;
        }
        match label {
            None => false,
            Some(label) => !self.local_labels.iter().any(|l| l == label),
        }
    }

    fn inside_switch(&self) -> Self {
        JumpScope {
            transform_breaks: false,
            local_labels: self.local_labels.clone(),
        }
    }

    fn with_label(&self, label: &str) -> Self {
        let mut scope = self.clone();
        scope.local_labels.push(label.to_string());
        scope
    }
}

impl<'a> BreakContinueTransformer<'a> {
    pub fn new(state_allocator: &'a mut StateAllocator) -> Self {
        BreakContinueTransformer { state_allocator }
    }

    /// Rewrites `statement`, replacing every escaping jump with a fragment.
    pub fn transform(&mut self, statement: Node) -> Node {
        self.transform_statement(statement, &JumpScope::top())
    }

    fn allocate_state(&mut self) -> StateId {
        self.state_allocator.allocate_state()
    }

    /// Wraps a single jump state; the fallthrough id is allocated after the
    /// state's own id.
    fn state_to_state_machine(&mut self, new_state: State, original: &Node) -> Node {
        let fallthrough_state = self.allocate_state();
        tracing::trace!(
            state = new_state.id(),
            fallthrough = fallthrough_state,
            label = new_state.label(),
            "lowered {}",
            original.name()
        );
        Node {
            span: original.span,
            kind: NodeKind::StateMachine(StateMachine::new(
                new_state.id(),
                fallthrough_state,
                vec![new_state],
            )),
        }
    }

    fn transform_statement(&mut self, node: Node, scope: &JumpScope) -> Node {
        ensure_sufficient_stack(|| self.rewrite_statement(node, scope))
    }

    fn rewrite_statement(&mut self, node: Node, scope: &JumpScope) -> Node {
        match node.kind {
            NodeKind::BreakStatement { ref label } => {
                if !scope.lowers_break(label.as_deref()) {
                    return node;
                }
                let id = self.allocate_state();
                let state = State::Break {
                    id,
                    label: label.clone(),
                };
                self.state_to_state_machine(state, &node)
            }
            // continue 只能指向循环，对本变换而言总是非局部的
            NodeKind::ContinueStatement { ref label } => {
                let id = self.allocate_state();
                let state = State::Continue {
                    id,
                    label: label.clone(),
                };
                self.state_to_state_machine(state, &node)
            }

            // Own their jump targets; lowered as units elsewhere.
            NodeKind::DoWhileStatement { .. }
            | NodeKind::WhileStatement { .. }
            | NodeKind::ForStatement { .. }
            | NodeKind::ForInStatement { .. }
            | NodeKind::ForOfStatement { .. }
            | NodeKind::FunctionDeclaration { .. }
            | NodeKind::ClassDeclaration { .. }
            | NodeKind::StateMachine(_) => node,

            NodeKind::SwitchStatement { .. } => self.transform_switch(node, &scope.inside_switch()),
            NodeKind::LabelledStatement { label, statement } => {
                let inner_scope = if !scope.transform_breaks || labels_switch(&statement) {
                    scope.with_label(&label)
                } else {
                    scope.clone()
                };
                let statement = self.transform_statement(*statement, &inner_scope);
                Node {
                    span: node.span,
                    kind: NodeKind::LabelledStatement {
                        label,
                        statement: Box::new(statement),
                    },
                }
            }
            NodeKind::Block { statements } => Node {
                span: node.span,
                kind: NodeKind::Block {
                    statements: self.transform_list(statements, scope),
                },
            },
            NodeKind::IfStatement {
                condition,
                if_clause,
                else_clause,
            } => Node {
                span: node.span,
                kind: NodeKind::IfStatement {
                    condition,
                    if_clause: self.transform_boxed(if_clause, scope),
                    else_clause: else_clause.map(|s| self.transform_boxed(s, scope)),
                },
            },
            NodeKind::WithStatement { expression, body } => Node {
                span: node.span,
                kind: NodeKind::WithStatement {
                    expression,
                    body: self.transform_boxed(body, scope),
                },
            },
            NodeKind::TryStatement {
                body,
                catch_block,
                finally_block,
            } => Node {
                span: node.span,
                kind: NodeKind::TryStatement {
                    body: self.transform_boxed(body, scope),
                    catch_block: catch_block.map(|c| self.transform_boxed(c, scope)),
                    finally_block: finally_block.map(|f| self.transform_boxed(f, scope)),
                },
            },
            NodeKind::Catch {
                binding,
                catch_body,
            } => Node {
                span: node.span,
                kind: NodeKind::Catch {
                    binding,
                    catch_body: self.transform_boxed(catch_body, scope),
                },
            },
            NodeKind::Finally { block } => Node {
                span: node.span,
                kind: NodeKind::Finally {
                    block: self.transform_boxed(block, scope),
                },
            },
            NodeKind::CaseClause {
                expression,
                statements,
            } => Node {
                span: node.span,
                kind: NodeKind::CaseClause {
                    expression,
                    statements: self.transform_list(statements, scope),
                },
            },
            NodeKind::DefaultClause { statements } => Node {
                span: node.span,
                kind: NodeKind::DefaultClause {
                    statements: self.transform_list(statements, scope),
                },
            },

            // 其余节点原样返回，形状由之后运行的验证器负责
            kind => Node {
                span: node.span,
                kind,
            },
        }
    }

    fn transform_switch(&mut self, node: Node, switch_scope: &JumpScope) -> Node {
        let Node { span, kind } = node;
        match kind {
            NodeKind::SwitchStatement { expression, clauses } => Node {
                span,
                kind: NodeKind::SwitchStatement {
                    expression,
                    clauses: self.transform_list(clauses, switch_scope),
                },
            },
            kind => Node { span, kind },
        }
    }

    fn transform_boxed(&mut self, node: Box<Node>, scope: &JumpScope) -> Box<Node> {
        Box::new(self.transform_statement(*node, scope))
    }

    fn transform_list(&mut self, nodes: Vec<Node>, scope: &JumpScope) -> Vec<Node> {
        nodes
            .into_iter()
            .map(|n| self.transform_statement(n, scope))
            .collect()
    }
}

/// True when a chain of labels ends at a switch statement.
fn labels_switch(node: &Node) -> bool {
    match &node.kind {
        NodeKind::SwitchStatement { .. } => true,
        NodeKind::LabelledStatement { statement, .. } => labels_switch(statement),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;

    fn n(kind: NodeKind) -> Node {
        Node::new(kind)
    }

    fn brk(label: Option<&str>) -> Node {
        n(NodeKind::BreakStatement {
            label: label.map(str::to_string),
        })
    }

    fn cont(label: Option<&str>) -> Node {
        n(NodeKind::ContinueStatement {
            label: label.map(str::to_string),
        })
    }

    fn num(value: f64) -> Box<Node> {
        Box::new(n(NodeKind::LiteralExpression {
            literal: Literal::Number(value),
        }))
    }

    fn switch(clauses: Vec<Node>) -> Node {
        n(NodeKind::SwitchStatement {
            expression: Box::new(n(NodeKind::IdentifierExpression {
                name: "x".to_string(),
            })),
            clauses,
        })
    }

    fn case(statements: Vec<Node>) -> Node {
        n(NodeKind::CaseClause {
            expression: num(0.0),
            statements,
        })
    }

    fn labelled(label: &str, statement: Node) -> Node {
        n(NodeKind::LabelledStatement {
            label: label.to_string(),
            statement: Box::new(statement),
        })
    }

    fn machine(node: &Node) -> &StateMachine {
        match &node.kind {
            NodeKind::StateMachine(m) => m,
            other => panic!("expected state machine, got {}", other.name()),
        }
    }

    fn case_statements(switch: &Node) -> &[Node] {
        let NodeKind::SwitchStatement { clauses, .. } = &switch.kind else {
            panic!("expected switch");
        };
        let NodeKind::CaseClause { statements, .. } = &clauses[0].kind else {
            panic!("expected case clause");
        };
        statements
    }

    #[test]
    fn bare_break_becomes_break_state() {
        let mut allocator = StateAllocator::starting_at(7);
        let previously_allocated = allocator.allocate_state();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let result = transformer.transform(brk(None));
        let m = machine(&result);
        assert_eq!(m.states, vec![State::Break { id: 8, label: None }]);
        assert_eq!(m.start_state, 8);
        assert_eq!(m.fallthrough_state, 9);
        assert_ne!(m.fallthrough_state, m.start_state);
        assert_ne!(m.fallthrough_state, previously_allocated);
        assert!(m.exception_regions.is_empty());
    }

    #[test]
    fn unlabeled_break_in_switch_is_local() {
        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let result = transformer.transform(switch(vec![case(vec![brk(None)])]));
        assert_eq!(case_statements(&result), &[brk(None)][..]);
        assert_eq!(allocator.peek(), 0);
    }

    #[test]
    fn labeled_break_past_switch_is_lowered() {
        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let tree = labelled(
            "outer",
            n(NodeKind::Block {
                statements: vec![switch(vec![case(vec![brk(None), brk(Some("outer"))])])],
            }),
        );
        let result = transformer.transform(tree);

        let NodeKind::LabelledStatement { statement, .. } = &result.kind else {
            panic!("expected labelled statement");
        };
        let NodeKind::Block { statements } = &statement.kind else {
            panic!("expected block");
        };
        let lowered = case_statements(&statements[0]);
        assert_eq!(lowered[0], brk(None));
        assert_eq!(
            machine(&lowered[1]).states,
            vec![State::Break {
                id: 0,
                label: Some("outer".to_string())
            }]
        );
    }

    #[test]
    fn break_naming_the_switch_itself_is_local() {
        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let tree = labelled("sw", switch(vec![case(vec![brk(Some("sw"))])]));
        let result = transformer.transform(tree);
        let NodeKind::LabelledStatement { statement, .. } = &result.kind else {
            panic!("expected labelled statement");
        };
        assert_eq!(case_statements(statement), &[brk(Some("sw"))][..]);
    }

    #[test]
    fn continue_is_lowered_even_inside_switch() {
        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let top = transformer.transform(cont(None));
        assert_eq!(machine(&top).states, vec![State::Continue { id: 0, label: None }]);

        let in_switch = transformer.transform(switch(vec![case(vec![cont(Some("loop"))])]));
        let m = machine(&case_statements(&in_switch)[0]);
        assert_eq!(
            m.states,
            vec![State::Continue {
                id: 2,
                label: Some("loop".to_string())
            }]
        );
        assert_eq!(m.fallthrough_state, 3);
    }

    #[test]
    fn switch_does_not_leak_into_siblings() {
        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let tree = n(NodeKind::Block {
            statements: vec![
                switch(vec![case(vec![switch(vec![case(vec![brk(None)])]), brk(None)])]),
                brk(None),
            ],
        });
        let result = transformer.transform(tree);
        let NodeKind::Block { statements } = &result.kind else {
            panic!("expected block");
        };

        let outer_case = case_statements(&statements[0]);
        assert_eq!(case_statements(&outer_case[0]), &[brk(None)][..]);
        assert_eq!(outer_case[1], brk(None));
        assert_eq!(machine(&statements[1]).start_state, 0);
    }

    #[test]
    fn loops_functions_and_machines_are_untouched() {
        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let body = Box::new(n(NodeKind::Block {
            statements: vec![brk(None), cont(None)],
        }));
        let unchanged = vec![
            n(NodeKind::WhileStatement {
                condition: num(1.0),
                body: body.clone(),
            }),
            n(NodeKind::DoWhileStatement {
                body: body.clone(),
                condition: num(1.0),
            }),
            n(NodeKind::ForStatement {
                initializer: None,
                condition: None,
                increment: None,
                body: body.clone(),
            }),
            n(NodeKind::FunctionDeclaration {
                name: None,
                is_generator: true,
                parameters: Box::new(n(NodeKind::FormalParameterList { parameters: vec![] })),
                body,
            }),
            n(NodeKind::StateMachine(StateMachine::new(
                10,
                11,
                vec![State::Break { id: 10, label: None }],
            ))),
        ];
        for tree in unchanged {
            assert_eq!(transformer.transform(tree.clone()), tree);
        }
        assert_eq!(allocator.peek(), 0);
    }

    #[test]
    fn rewrites_through_statement_containers() {
        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);

        let tree = n(NodeKind::TryStatement {
            body: Box::new(n(NodeKind::Block {
                statements: vec![n(NodeKind::IfStatement {
                    condition: num(1.0),
                    if_clause: Box::new(brk(None)),
                    else_clause: Some(Box::new(cont(None))),
                })],
            })),
            catch_block: None,
            finally_block: Some(Box::new(n(NodeKind::Finally {
                block: Box::new(n(NodeKind::Block {
                    statements: vec![brk(Some("done"))],
                })),
            }))),
        });
        let result = transformer.transform(tree);

        let mut ids = Vec::new();
        collect_machine_ids(&result, &mut ids);
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    fn collect_machine_ids(node: &Node, ids: &mut Vec<usize>) {
        if let NodeKind::StateMachine(m) = &node.kind {
            ids.extend(m.state_ids());
        }
        for (_, child) in node.children() {
            if let Some(child) = child {
                collect_machine_ids(child, ids);
            }
        }
    }

    #[test]
    fn deeply_nested_jump_is_lowered() {
        let depth = 2_000;
        let mut tree = brk(Some("out"));
        for _ in 0..depth {
            tree = n(NodeKind::Block {
                statements: vec![tree],
            });
        }

        let mut allocator = StateAllocator::new();
        let mut transformer = BreakContinueTransformer::new(&mut allocator);
        let result = transformer.transform(tree);

        let mut node = &result;
        for _ in 0..depth {
            let NodeKind::Block { statements } = &node.kind else {
                panic!("expected block, got {}", node.name());
            };
            node = &statements[0];
        }
        assert_eq!(
            machine(node).states,
            vec![State::Break {
                id: 0,
                label: Some("out".to_string())
            }]
        );
        assert_eq!(allocator.peek(), 2);
    }
}
