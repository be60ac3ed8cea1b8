//! Suspend factoring.
//!
//! Normalizes statements that bury a suspend expression (`yield` / `await`)
//! inside a larger expression into a two-statement sequence the state-machine
//! builders can consume: first the bare suspend, then the original statement
//! with the suspend replaced by the resumed-value slot.
//!
//! ```typescript
//! x = yield task();
//! ```
//! Becomes:
//! ```javascript
//! {
//!     yield task();
//!     x = __state.sent;
//! }
//! ```
//!
//! Three shapes are recognized:
//!
//! | input                                   | output                                      |
//! |-----------------------------------------|---------------------------------------------|
//! | `(L = S, rest...);`                     | `{ S; (L = __state.sent, rest...); }`       |
//! | `var L = S, rest...;`                   | `{ S; var L = __state.sent, rest...; }`     |
//! | `return S;`                             | `{ S; return __state.sent; }`               |
//!
//! Everything else passes through unchanged, including a bare suspend
//! statement (already in normal form) and a suspend in comma/declarator
//! position 2+ (only the first list element is inspected; callers relying on
//! deeper positions must pre-factor them). A declaration in a for-loop head
//! is not statement position and keeps its shape.
//!
//! The rewriter is shape-driven only: it neither knows nor cares whether it is
//! running in a generator or a deferred body, and it never allocates fresh
//! identifiers. It does not cross into nested function literals.

use std::rc::Rc;

use crate::syntax::{Node, NodeRef, Rewrite, VarKind, VariableDeclarator, strip_parens};

/// Name of the resumption context threaded through a lowered state machine.
pub const RESUME_CONTEXT_NAME: &str = "__state";

/// Member of the resumption context holding the last resumed value.
pub const RESUMED_VALUE_MEMBER: &str = "sent";

/// The fixed placeholder standing in for a factored-out suspend expression:
/// `__state.sent`.
pub fn resumed_value_slot() -> NodeRef {
    Node::prop(Node::id(RESUME_CONTEXT_NAME), RESUMED_VALUE_MEMBER)
}

/// Tree rewriter that factors suspend expressions out of the three recognized
/// statement shapes. See the module docs for the shapes.
pub struct SuspendFactoring;

impl SuspendFactoring {
    pub fn new() -> Self {
        SuspendFactoring
    }

    /// Factor every qualifying statement in a function body. `None` means the
    /// body came back unchanged.
    pub fn factor_body(&mut self, body: &[NodeRef]) -> Option<Vec<NodeRef>> {
        self.rewrite_list(body)
    }
}

impl Rewrite for SuspendFactoring {
    fn rewrite(&mut self, node: &NodeRef) -> NodeRef {
        // Nested function bodies are handled by their own driver pass.
        if node.is_function_like() {
            return node.clone();
        }

        match node.as_ref() {
            Node::ExpressionStatement(expr) => {
                factor_expression_statement(expr).unwrap_or_else(|| self.walk(node))
            }
            Node::VariableStatement { kind, declarations } => {
                factor_variable_statement(*kind, declarations).unwrap_or_else(|| self.walk(node))
            }
            Node::ReturnStatement(Some(expr)) if expr.is_suspend() => Node::block(vec![
                Node::expr_stmt(expr.clone()),
                Node::ret(Some(resumed_value_slot())),
            ]),
            // A declaration in a for-loop head is not statement position; its
            // shape must survive. Any suspend left in the loop head is the
            // builder's to diagnose.
            Node::For {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                let (new_init, init_changed) = match initializer {
                    Some(init) => {
                        let rewritten = self.walk(init);
                        let changed = !Rc::ptr_eq(&rewritten, init);
                        (Some(rewritten), changed)
                    }
                    None => (None, false),
                };
                let (new_cond, cond_changed) = self.rewrite_opt(condition);
                let (new_incr, incr_changed) = self.rewrite_opt(incrementor);
                let new_body = self.rewrite(body);
                if !init_changed && !cond_changed && !incr_changed && Rc::ptr_eq(&new_body, body)
                {
                    node.clone()
                } else {
                    Rc::new(Node::For {
                        initializer: new_init,
                        condition: new_cond,
                        incrementor: new_incr,
                        body: new_body,
                    })
                }
            }
            _ => self.walk(node),
        }
    }
}

/// Match `L = S` (optionally the head of a comma list, optionally
/// parenthesized) and produce the factored block.
fn factor_expression_statement(expr: &NodeRef) -> Option<NodeRef> {
    let stripped = strip_parens(expr);

    // Only the first element of a comma expression is inspected.
    let (head, tail): (&NodeRef, &[NodeRef]) = match stripped.as_ref() {
        Node::Comma(exprs) => {
            let (head, tail) = exprs.split_first()?;
            (head, tail)
        }
        _ => (stripped, &[]),
    };

    let Node::Binary {
        left,
        operator,
        right,
    } = head.as_ref()
    else {
        return None;
    };
    if operator != "=" || !right.is_suspend() {
        return None;
    }

    let resumed_assign = Node::assign(left.clone(), resumed_value_slot());
    let follow = if tail.is_empty() {
        resumed_assign
    } else {
        let mut exprs = Vec::with_capacity(tail.len() + 1);
        exprs.push(resumed_assign);
        exprs.extend(tail.iter().cloned());
        Node::comma(exprs)
    };

    Some(Node::block(vec![
        Node::expr_stmt(right.clone()),
        Node::expr_stmt(follow),
    ]))
}

/// Match `var L = S, rest...` and produce the factored block. The declaration
/// kind is reconstructed verbatim.
fn factor_variable_statement(
    kind: VarKind,
    declarations: &[VariableDeclarator],
) -> Option<NodeRef> {
    let (first, rest) = declarations.split_first()?;
    let initializer = first.initializer.as_ref()?;
    if !initializer.is_suspend() {
        return None;
    }

    let mut new_declarations = Vec::with_capacity(declarations.len());
    new_declarations.push(VariableDeclarator::new(
        first.name.clone(),
        Some(resumed_value_slot()),
    ));
    new_declarations.extend(rest.iter().cloned());

    Some(Node::block(vec![
        Node::expr_stmt(initializer.clone()),
        Node::var_stmt(kind, new_declarations),
    ]))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::syntax::FunctionData;

    fn factor(stmt: &NodeRef) -> NodeRef {
        SuspendFactoring::new().rewrite(stmt)
    }

    fn block_statements(node: &NodeRef) -> &[NodeRef] {
        match node.as_ref() {
            Node::Block(statements) => statements,
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn factors_assignment_expression_statement() {
        let suspend = Node::yield_expr(Some(Node::call(Node::id("task"), vec![])));
        let stmt = Node::expr_stmt(Node::assign(Node::id("x"), suspend.clone()));

        let out = factor(&stmt);
        let stmts = block_statements(&out);
        assert_eq!(stmts.len(), 2);
        // First statement is the original suspend expression, unmodified.
        match stmts[0].as_ref() {
            Node::ExpressionStatement(expr) => assert!(Rc::ptr_eq(expr, &suspend)),
            other => panic!("expected expression statement, got {other:?}"),
        }
        assert_eq!(
            stmts[1],
            Node::expr_stmt(Node::assign(Node::id("x"), resumed_value_slot()))
        );
    }

    #[test]
    fn preserves_comma_tail_in_order() {
        // (x = yield e, a, b);
        let suspend = Node::yield_expr(Some(Node::id("e")));
        let tail_a = Node::id("a");
        let tail_b = Node::id("b");
        let stmt = Node::expr_stmt(Node::paren(Node::comma(vec![
            Node::assign(Node::id("x"), suspend.clone()),
            tail_a.clone(),
            tail_b.clone(),
        ])));

        let out = factor(&stmt);
        let stmts = block_statements(&out);
        match stmts[1].as_ref() {
            Node::ExpressionStatement(expr) => match expr.as_ref() {
                Node::Comma(exprs) => {
                    assert_eq!(exprs.len(), 3);
                    assert_eq!(exprs[0], Node::assign(Node::id("x"), resumed_value_slot()));
                    assert!(Rc::ptr_eq(&exprs[1], &tail_a));
                    assert!(Rc::ptr_eq(&exprs[2], &tail_b));
                }
                other => panic!("expected comma expression, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn factors_first_declarator_and_preserves_rest() {
        // var x = yield e, y = f();
        let suspend = Node::yield_expr(Some(Node::id("e")));
        let second = VariableDeclarator::new("y", Some(Node::call(Node::id("f"), vec![])));
        let stmt = Node::var_stmt(
            VarKind::Var,
            vec![
                VariableDeclarator::new("x", Some(suspend.clone())),
                second.clone(),
            ],
        );

        let out = factor(&stmt);
        let stmts = block_statements(&out);
        assert_eq!(stmts[0], Node::expr_stmt(suspend));
        match stmts[1].as_ref() {
            Node::VariableStatement { kind, declarations } => {
                assert_eq!(*kind, VarKind::Var);
                assert_eq!(declarations.len(), 2);
                assert_eq!(declarations[0].name, "x");
                assert_eq!(declarations[0].initializer, Some(resumed_value_slot()));
                assert_eq!(declarations[1], second);
            }
            other => panic!("expected variable statement, got {other:?}"),
        }
    }

    #[test]
    fn preserves_declaration_kind() {
        let stmt = Node::var_stmt(
            VarKind::Let,
            vec![VariableDeclarator::new(
                "x",
                Some(Node::await_expr(Node::id("p"))),
            )],
        );
        let out = factor(&stmt);
        match block_statements(&out)[1].as_ref() {
            Node::VariableStatement { kind, .. } => assert_eq!(*kind, VarKind::Let),
            other => panic!("expected variable statement, got {other:?}"),
        }
    }

    #[test]
    fn factors_return_statement() {
        let suspend = Node::yield_expr(Some(Node::id("e")));
        let stmt = Node::ret(Some(suspend.clone()));

        let out = factor(&stmt);
        let stmts = block_statements(&out);
        assert_eq!(stmts[0], Node::expr_stmt(suspend));
        assert_eq!(stmts[1], Node::ret(Some(resumed_value_slot())));
    }

    #[test]
    fn bare_suspend_statement_is_already_normal() {
        let stmt = Node::expr_stmt(Node::yield_expr(Some(Node::id("e"))));
        let out = factor(&stmt);
        assert!(Rc::ptr_eq(&out, &stmt));
    }

    #[test]
    fn plain_statements_pass_through_unchanged() {
        let stmt = Node::expr_stmt(Node::assign(Node::id("x"), Node::number("1")));
        let out = factor(&stmt);
        assert!(Rc::ptr_eq(&out, &stmt));

        let ret = Node::ret(Some(Node::id("x")));
        assert!(Rc::ptr_eq(&factor(&ret), &ret));
    }

    // Documented boundary: only the first element of a comma or declarator
    // list is inspected. A suspend in position 2+ is left alone.
    #[test]
    fn second_list_position_is_not_factored() {
        let comma_stmt = Node::expr_stmt(Node::comma(vec![
            Node::id("a"),
            Node::assign(Node::id("x"), Node::yield_expr(Some(Node::id("e")))),
        ]));
        assert!(Rc::ptr_eq(&factor(&comma_stmt), &comma_stmt));

        let var_stmt = Node::var_stmt(
            VarKind::Var,
            vec![
                VariableDeclarator::new("x", Some(Node::number("1"))),
                VariableDeclarator::new("y", Some(Node::yield_expr(Some(Node::id("e"))))),
            ],
        );
        assert!(Rc::ptr_eq(&factor(&var_stmt), &var_stmt));
    }

    #[test]
    fn strips_parens_only_on_the_statement_expression() {
        // ((x = yield e)); still factors.
        let stmt = Node::expr_stmt(Node::paren(Node::paren(Node::assign(
            Node::id("x"),
            Node::yield_expr(Some(Node::id("e"))),
        ))));
        let out = factor(&stmt);
        assert!(matches!(out.as_ref(), Node::Block(stmts) if stmts.len() == 2));

        // x = (yield e); does not: the suspend is wrapped, not bare.
        let wrapped = Node::expr_stmt(Node::assign(
            Node::id("x"),
            Node::paren(Node::yield_expr(Some(Node::id("e")))),
        ));
        assert!(Rc::ptr_eq(&factor(&wrapped), &wrapped));
    }

    #[test]
    fn factors_at_any_statement_depth() {
        let inner = Node::expr_stmt(Node::assign(
            Node::id("x"),
            Node::yield_expr(Some(Node::id("e"))),
        ));
        let stmt = Rc::new(Node::If {
            condition: Node::id("cond"),
            then_branch: Node::block(vec![inner]),
            else_branch: None,
        });

        let out = factor(&stmt);
        match out.as_ref() {
            Node::If { then_branch, .. } => match then_branch.as_ref() {
                Node::Block(stmts) => {
                    assert!(matches!(stmts[0].as_ref(), Node::Block(inner) if inner.len() == 2));
                }
                other => panic!("expected block, got {other:?}"),
            },
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn for_initializer_keeps_its_declaration_shape() {
        // for (var x = yield e; x; ) {}  -- the initializer slot holds a
        // declaration, not a statement, so no block may be put there.
        let stmt = Rc::new(Node::For {
            initializer: Some(Node::var_stmt(
                VarKind::Var,
                vec![VariableDeclarator::new(
                    "x",
                    Some(Node::yield_expr(Some(Node::id("e")))),
                )],
            )),
            condition: Some(Node::id("x")),
            incrementor: None,
            body: Node::block(vec![]),
        });

        let out = factor(&stmt);
        assert!(Rc::ptr_eq(&out, &stmt));
    }

    #[test]
    fn nested_function_literals_are_not_entered() {
        let nested = Rc::new(Node::FunctionExpression(FunctionData {
            name: None,
            parameters: vec![],
            body: vec![Node::expr_stmt(Node::assign(
                Node::id("x"),
                Node::yield_expr(Some(Node::id("e"))),
            ))],
            is_generator: true,
            return_type: None,
        }));
        let stmt = Node::expr_stmt(Node::call(Node::id("run"), vec![nested]));
        let out = factor(&stmt);
        assert!(Rc::ptr_eq(&out, &stmt));
    }
}
