//! Suspend-presence analysis.
//!
//! One pure pass over a function body answering three questions the driver
//! needs: does the body contain a `yield` suspend, an `await` suspend, or a
//! for-in loop? Nested function-bearing nodes are not entered; a nested
//! function suspends in its own context, not in the enclosing body's.

use bitflags::bitflags;

use crate::syntax::{Node, NodeRef};

bitflags! {
    /// Read-only summary of suspend-relevant constructs in one function body.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SuspendFlags: u8 {
        /// A direct `yield` suspend appears in the body.
        const YIELD = 1 << 0;
        /// An await-style suspend appears in the body.
        const AWAIT = 1 << 1;
        /// A for-in loop appears in the body.
        const FOR_IN = 1 << 2;
    }
}

impl SuspendFlags {
    pub fn has_yield(self) -> bool {
        self.contains(SuspendFlags::YIELD)
    }

    pub fn has_await(self) -> bool {
        self.contains(SuspendFlags::AWAIT)
    }

    pub fn has_for_in(self) -> bool {
        self.contains(SuspendFlags::FOR_IN)
    }
}

/// Compute the suspend-presence descriptor for a function body.
pub fn analyze_body(statements: &[NodeRef]) -> SuspendFlags {
    let mut flags = SuspendFlags::empty();
    for statement in statements {
        analyze_node(statement, &mut flags);
    }
    flags
}

fn analyze_node(node: &NodeRef, flags: &mut SuspendFlags) {
    match node.as_ref() {
        // Nested functions own their suspend points.
        Node::FunctionDeclaration(_)
        | Node::FunctionExpression(_)
        | Node::GetAccessor(_)
        | Node::SetAccessor(_) => {}

        Node::Identifier(_)
        | Node::NumericLiteral(_)
        | Node::StringLiteral(_)
        | Node::BooleanLiteral(_)
        | Node::This => {}

        Node::Yield(operand) => {
            flags.insert(SuspendFlags::YIELD);
            if let Some(operand) = operand {
                analyze_node(operand, flags);
            }
        }

        Node::Await(operand) => {
            flags.insert(SuspendFlags::AWAIT);
            analyze_node(operand, flags);
        }

        Node::ForIn {
            declaration: _,
            target,
            expression,
            body,
        } => {
            flags.insert(SuspendFlags::FOR_IN);
            analyze_node(target, flags);
            analyze_node(expression, flags);
            analyze_node(body, flags);
        }

        Node::Binary { left, right, .. } => {
            analyze_node(left, flags);
            analyze_node(right, flags);
        }
        Node::PrefixUnary { operand, .. } | Node::PostfixUnary { operand, .. } => {
            analyze_node(operand, flags);
        }
        Node::Call { callee, arguments } => {
            analyze_node(callee, flags);
            for argument in arguments {
                analyze_node(argument, flags);
            }
        }
        Node::PropertyAccess { object, .. } => analyze_node(object, flags),
        Node::ElementAccess { object, index } => {
            analyze_node(object, flags);
            analyze_node(index, flags);
        }
        Node::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            analyze_node(condition, flags);
            analyze_node(when_true, flags);
            analyze_node(when_false, flags);
        }
        Node::Paren(inner) => analyze_node(inner, flags),
        Node::Comma(exprs) => {
            for expr in exprs {
                analyze_node(expr, flags);
            }
        }
        Node::ArrayLiteral(elements) => {
            for element in elements {
                analyze_node(element, flags);
            }
        }

        Node::ExpressionStatement(expr) => analyze_node(expr, flags),
        Node::VariableStatement { declarations, .. } => {
            for declaration in declarations {
                if let Some(initializer) = &declaration.initializer {
                    analyze_node(initializer, flags);
                }
            }
        }
        Node::ReturnStatement(expr) => {
            if let Some(expr) = expr {
                analyze_node(expr, flags);
            }
        }
        Node::Block(statements) | Node::SourceFile(statements) => {
            for statement in statements {
                analyze_node(statement, flags);
            }
        }
        Node::If {
            condition,
            then_branch,
            else_branch,
        } => {
            analyze_node(condition, flags);
            analyze_node(then_branch, flags);
            if let Some(else_branch) = else_branch {
                analyze_node(else_branch, flags);
            }
        }
        Node::While { condition, body } => {
            analyze_node(condition, flags);
            analyze_node(body, flags);
        }
        Node::For {
            initializer,
            condition,
            incrementor,
            body,
        } => {
            for part in [initializer, condition, incrementor].into_iter().flatten() {
                analyze_node(part, flags);
            }
            analyze_node(body, flags);
        }
        Node::Switch { expression, cases } => {
            analyze_node(expression, flags);
            for case in cases {
                if let Some(test) = &case.test {
                    analyze_node(test, flags);
                }
                for statement in &case.statements {
                    analyze_node(statement, flags);
                }
            }
        }
    }
}
