//! For-in lowering.
//!
//! Enumeration over an object's keys cannot be paused and resumed mid
//! iteration, so any body that may suspend gets its for-in loops rewritten to
//! an explicitly resumable form first: snapshot the keys into an array with an
//! uninterruptible for-in, then walk the array with an index loop.
//!
//! ```typescript
//! for (var k in obj) { use(k); }
//! ```
//! Becomes:
//! ```javascript
//! {
//!     var _a = [];
//!     for (var _b in obj) _a.push(_b);
//!     for (var _c = 0; _c < _a.length; _c++) {
//!         var k = _a[_c];
//!         { use(k); }
//!     }
//! }
//! ```
//!
//! The snapshot loop itself contains no suspend point, so it always runs to
//! completion in one resumption; only the index loop spans suspends.

use std::rc::Rc;

use crate::names::NameGenerator;
use crate::syntax::{Node, NodeRef, Rewrite, VarKind, VariableDeclarator};

/// Contract of the loop-rewriting collaborator consumed by the driver.
pub trait LoopLowering {
    /// Rewrite every for-in loop in `body` into resumable form. `None` means
    /// no for-in was present and the body is unchanged.
    fn lower(&self, names: &mut NameGenerator, body: &[NodeRef]) -> Option<Vec<NodeRef>>;
}

/// Default for-in lowering pass.
pub struct ForInLowering;

impl LoopLowering for ForInLowering {
    fn lower(&self, names: &mut NameGenerator, body: &[NodeRef]) -> Option<Vec<NodeRef>> {
        ForInRewriter { names }.rewrite_list(body)
    }
}

struct ForInRewriter<'a> {
    names: &'a mut NameGenerator,
}

impl Rewrite for ForInRewriter<'_> {
    fn rewrite(&mut self, node: &NodeRef) -> NodeRef {
        // Nested function bodies were already lowered by their own pass.
        if node.is_function_like() {
            return node.clone();
        }

        match node.as_ref() {
            Node::ForIn {
                declaration,
                target,
                expression,
                body,
            } => {
                // Inner loops first, so nesting lowers inside out.
                let new_body = self.rewrite(body);
                self.lower_for_in(*declaration, target, expression, new_body)
            }
            _ => self.walk(node),
        }
    }
}

impl ForInRewriter<'_> {
    fn lower_for_in(
        &mut self,
        declaration: Option<VarKind>,
        target: &NodeRef,
        expression: &NodeRef,
        body: NodeRef,
    ) -> NodeRef {
        let keys = self.names.next();
        let enumerator = self.names.next();
        let index = self.names.next();

        // var _keys = [];
        let keys_decl = Node::var_stmt(
            VarKind::Var,
            vec![VariableDeclarator::new(keys.clone(), Some(Node::array(vec![])))],
        );

        // for (var _e in expr) _keys.push(_e);
        let snapshot = Rc::new(Node::ForIn {
            declaration: Some(VarKind::Var),
            target: Node::id(enumerator.clone()),
            expression: expression.clone(),
            body: Node::expr_stmt(Node::call(
                Node::prop(Node::id(keys.clone()), "push"),
                vec![Node::id(enumerator)],
            )),
        });

        // Rebind the original target at the top of each iteration.
        let key_expr = Node::elem(Node::id(keys.clone()), Node::id(index.clone()));
        let binding = match (declaration, target.as_ref()) {
            (Some(kind), Node::Identifier(name)) => Node::var_stmt(
                kind,
                vec![VariableDeclarator::new(name.clone(), Some(key_expr))],
            ),
            _ => Node::expr_stmt(Node::assign(target.clone(), key_expr)),
        };

        // for (var _i = 0; _i < _keys.length; _i++) { <binding>; <body> }
        let index_loop = Rc::new(Node::For {
            initializer: Some(Node::var_stmt(
                VarKind::Var,
                vec![VariableDeclarator::new(index.clone(), Some(Node::number("0")))],
            )),
            condition: Some(Node::binary(
                Node::id(index.clone()),
                "<",
                Node::prop(Node::id(keys), "length"),
            )),
            incrementor: Some(Node::postfix(Node::id(index), "++")),
            body: Node::block(vec![binding, body]),
        });

        Node::block(vec![keys_decl, snapshot, index_loop])
    }
}
