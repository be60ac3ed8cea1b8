//! Generic structural rewriting over the syntax tree.
//!
//! [`Rewrite`] is the base every transform builds on. `rewrite` is the
//! overridable dispatch point; the default just calls `walk`, which rebuilds a
//! node from its rewritten children. When no child changed, `walk` returns the
//! original `Rc`, so an untouched subtree is shared between the input and
//! output trees and callers can detect "nothing happened" with pointer
//! equality.
//!
//! A transform typically overrides `rewrite`, handles the shapes it cares
//! about, and falls back to `self.walk(node)` for everything else. Transforms
//! that must not cross into nested function bodies return the node unchanged
//! when [`Node::is_function_like`] matches.

use std::rc::Rc;

use super::ast::{
    AccessorData, FunctionData, Node, NodeRef, SwitchCase, VariableDeclarator,
};

pub trait Rewrite {
    /// Rewrite one node. Override this to install shape-specific behavior.
    fn rewrite(&mut self, node: &NodeRef) -> NodeRef {
        self.walk(node)
    }

    /// Rewrite a node list. `None` means every element came back
    /// pointer-unchanged.
    fn rewrite_list(&mut self, nodes: &[NodeRef]) -> Option<Vec<NodeRef>> {
        let mut changed = false;
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let rewritten = self.rewrite(node);
            if !Rc::ptr_eq(&rewritten, node) {
                changed = true;
            }
            out.push(rewritten);
        }
        changed.then_some(out)
    }

    /// Rewrite an optional child, reporting whether it changed.
    fn rewrite_opt(&mut self, node: &Option<NodeRef>) -> (Option<NodeRef>, bool) {
        match node {
            Some(inner) => {
                let rewritten = self.rewrite(inner);
                let changed = !Rc::ptr_eq(&rewritten, inner);
                (Some(rewritten), changed)
            }
            None => (None, false),
        }
    }

    /// Rebuild `node` from rewritten children, preserving the original `Rc`
    /// when nothing underneath changed.
    fn walk(&mut self, node: &NodeRef) -> NodeRef {
        match node.as_ref() {
            Node::Identifier(_)
            | Node::NumericLiteral(_)
            | Node::StringLiteral(_)
            | Node::BooleanLiteral(_)
            | Node::This => node.clone(),

            Node::Binary {
                left,
                operator,
                right,
            } => {
                let new_left = self.rewrite(left);
                let new_right = self.rewrite(right);
                if Rc::ptr_eq(&new_left, left) && Rc::ptr_eq(&new_right, right) {
                    node.clone()
                } else {
                    Node::binary(new_left, operator.clone(), new_right)
                }
            }

            Node::PrefixUnary { operator, operand } => {
                let new_operand = self.rewrite(operand);
                if Rc::ptr_eq(&new_operand, operand) {
                    node.clone()
                } else {
                    Rc::new(Node::PrefixUnary {
                        operator: operator.clone(),
                        operand: new_operand,
                    })
                }
            }

            Node::PostfixUnary { operand, operator } => {
                let new_operand = self.rewrite(operand);
                if Rc::ptr_eq(&new_operand, operand) {
                    node.clone()
                } else {
                    Node::postfix(new_operand, operator.clone())
                }
            }

            Node::Call { callee, arguments } => {
                let new_callee = self.rewrite(callee);
                let new_arguments = self.rewrite_list(arguments);
                if Rc::ptr_eq(&new_callee, callee) && new_arguments.is_none() {
                    node.clone()
                } else {
                    Node::call(
                        new_callee,
                        new_arguments.unwrap_or_else(|| arguments.clone()),
                    )
                }
            }

            Node::PropertyAccess { object, property } => {
                let new_object = self.rewrite(object);
                if Rc::ptr_eq(&new_object, object) {
                    node.clone()
                } else {
                    Node::prop(new_object, property.clone())
                }
            }

            Node::ElementAccess { object, index } => {
                let new_object = self.rewrite(object);
                let new_index = self.rewrite(index);
                if Rc::ptr_eq(&new_object, object) && Rc::ptr_eq(&new_index, index) {
                    node.clone()
                } else {
                    Node::elem(new_object, new_index)
                }
            }

            Node::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                let new_condition = self.rewrite(condition);
                let new_true = self.rewrite(when_true);
                let new_false = self.rewrite(when_false);
                if Rc::ptr_eq(&new_condition, condition)
                    && Rc::ptr_eq(&new_true, when_true)
                    && Rc::ptr_eq(&new_false, when_false)
                {
                    node.clone()
                } else {
                    Rc::new(Node::Conditional {
                        condition: new_condition,
                        when_true: new_true,
                        when_false: new_false,
                    })
                }
            }

            Node::Paren(inner) => {
                let new_inner = self.rewrite(inner);
                if Rc::ptr_eq(&new_inner, inner) {
                    node.clone()
                } else {
                    Node::paren(new_inner)
                }
            }

            Node::Comma(exprs) => match self.rewrite_list(exprs) {
                None => node.clone(),
                Some(new_exprs) => Node::comma(new_exprs),
            },

            Node::ArrayLiteral(elements) => match self.rewrite_list(elements) {
                None => node.clone(),
                Some(new_elements) => Node::array(new_elements),
            },

            Node::Yield(operand) => {
                let (new_operand, changed) = self.rewrite_opt(operand);
                if changed {
                    Node::yield_expr(new_operand)
                } else {
                    node.clone()
                }
            }

            Node::Await(operand) => {
                let new_operand = self.rewrite(operand);
                if Rc::ptr_eq(&new_operand, operand) {
                    node.clone()
                } else {
                    Node::await_expr(new_operand)
                }
            }

            Node::ExpressionStatement(expr) => {
                let new_expr = self.rewrite(expr);
                if Rc::ptr_eq(&new_expr, expr) {
                    node.clone()
                } else {
                    Node::expr_stmt(new_expr)
                }
            }

            Node::VariableStatement { kind, declarations } => {
                let mut changed = false;
                let mut new_declarations = Vec::with_capacity(declarations.len());
                for decl in declarations {
                    let (new_init, init_changed) = self.rewrite_opt(&decl.initializer);
                    changed |= init_changed;
                    new_declarations.push(VariableDeclarator {
                        name: decl.name.clone(),
                        initializer: new_init,
                    });
                }
                if changed {
                    Node::var_stmt(*kind, new_declarations)
                } else {
                    node.clone()
                }
            }

            Node::ReturnStatement(expr) => {
                let (new_expr, changed) = self.rewrite_opt(expr);
                if changed {
                    Node::ret(new_expr)
                } else {
                    node.clone()
                }
            }

            Node::Block(statements) => match self.rewrite_list(statements) {
                None => node.clone(),
                Some(new_statements) => Node::block(new_statements),
            },

            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let new_condition = self.rewrite(condition);
                let new_then = self.rewrite(then_branch);
                let (new_else, else_changed) = self.rewrite_opt(else_branch);
                if Rc::ptr_eq(&new_condition, condition)
                    && Rc::ptr_eq(&new_then, then_branch)
                    && !else_changed
                {
                    node.clone()
                } else {
                    Rc::new(Node::If {
                        condition: new_condition,
                        then_branch: new_then,
                        else_branch: new_else,
                    })
                }
            }

            Node::While { condition, body } => {
                let new_condition = self.rewrite(condition);
                let new_body = self.rewrite(body);
                if Rc::ptr_eq(&new_condition, condition) && Rc::ptr_eq(&new_body, body) {
                    node.clone()
                } else {
                    Rc::new(Node::While {
                        condition: new_condition,
                        body: new_body,
                    })
                }
            }

            Node::For {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                let (new_init, init_changed) = self.rewrite_opt(initializer);
                let (new_cond, cond_changed) = self.rewrite_opt(condition);
                let (new_incr, incr_changed) = self.rewrite_opt(incrementor);
                let new_body = self.rewrite(body);
                if !init_changed && !cond_changed && !incr_changed && Rc::ptr_eq(&new_body, body) {
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

            Node::ForIn {
                declaration,
                target,
                expression,
                body,
            } => {
                let new_target = self.rewrite(target);
                let new_expression = self.rewrite(expression);
                let new_body = self.rewrite(body);
                if Rc::ptr_eq(&new_target, target)
                    && Rc::ptr_eq(&new_expression, expression)
                    && Rc::ptr_eq(&new_body, body)
                {
                    node.clone()
                } else {
                    Rc::new(Node::ForIn {
                        declaration: *declaration,
                        target: new_target,
                        expression: new_expression,
                        body: new_body,
                    })
                }
            }

            Node::Switch { expression, cases } => {
                let new_expression = self.rewrite(expression);
                let mut changed = !Rc::ptr_eq(&new_expression, expression);
                let mut new_cases = Vec::with_capacity(cases.len());
                for case in cases {
                    let (new_test, test_changed) = self.rewrite_opt(&case.test);
                    let new_statements = self.rewrite_list(&case.statements);
                    changed |= test_changed || new_statements.is_some();
                    new_cases.push(SwitchCase {
                        test: new_test,
                        statements: new_statements.unwrap_or_else(|| case.statements.clone()),
                    });
                }
                if changed {
                    Rc::new(Node::Switch {
                        expression: new_expression,
                        cases: new_cases,
                    })
                } else {
                    node.clone()
                }
            }

            Node::FunctionDeclaration(data) => match self.rewrite_list(&data.body) {
                None => node.clone(),
                Some(new_body) => Rc::new(Node::FunctionDeclaration(FunctionData {
                    body: new_body,
                    ..data.clone()
                })),
            },

            Node::FunctionExpression(data) => match self.rewrite_list(&data.body) {
                None => node.clone(),
                Some(new_body) => Rc::new(Node::FunctionExpression(FunctionData {
                    body: new_body,
                    ..data.clone()
                })),
            },

            Node::GetAccessor(data) => match self.rewrite_list(&data.body) {
                None => node.clone(),
                Some(new_body) => Rc::new(Node::GetAccessor(AccessorData {
                    body: new_body,
                    ..data.clone()
                })),
            },

            Node::SetAccessor(data) => match self.rewrite_list(&data.body) {
                None => node.clone(),
                Some(new_body) => Rc::new(Node::SetAccessor(AccessorData {
                    body: new_body,
                    ..data.clone()
                })),
            },

            Node::SourceFile(statements) => match self.rewrite_list(statements) {
                None => node.clone(),
                Some(new_statements) => Node::source_file(new_statements),
            },
        }
    }
}
