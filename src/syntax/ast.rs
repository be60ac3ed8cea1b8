//! Syntax tree for the downleveling transforms.
//!
//! The tree is a closed sum type of JavaScript constructs, shared through
//! `Rc`. Nodes are immutable once built: a transform that needs a different
//! child constructs a new parent and leaves the old tree intact. Untouched
//! subtrees are shared between the old and new trees, and "no change" is
//! signaled by returning the identical `Rc` (see [`NodeRef`]).
//!
//! Builder helpers at the bottom keep transform code terse; payload structs
//! (`FunctionData`, `AccessorData`, ...) exist so reconstruction can use
//! struct-update syntax instead of positional arguments.

use std::rc::Rc;

/// Shared handle to an immutable tree node.
///
/// Pointer equality (`Rc::ptr_eq`) between an input and an output node means
/// the rewrite left it unchanged.
pub type NodeRef = Rc<Node>;

/// A node in the program tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // =========================================================================
    // Literals and names
    // =========================================================================
    /// Identifier: `foo`, `_a`
    Identifier(String),

    /// Numeric literal: `42`, `3.14`
    NumericLiteral(String),

    /// String literal: `"hello"`
    StringLiteral(String),

    /// Boolean literal: `true`, `false`
    BooleanLiteral(bool),

    /// This keyword
    This,

    // =========================================================================
    // Expressions
    // =========================================================================
    /// Binary expression: `left op right`. Assignment is the `"="` operator.
    Binary {
        left: NodeRef,
        operator: String,
        right: NodeRef,
    },

    /// Unary prefix expression: `!x`, `-x`
    PrefixUnary { operator: String, operand: NodeRef },

    /// Unary postfix expression: `x++`, `x--`
    PostfixUnary { operand: NodeRef, operator: String },

    /// Call expression: `callee(args)`
    Call {
        callee: NodeRef,
        arguments: Vec<NodeRef>,
    },

    /// Property access: `object.property`
    PropertyAccess { object: NodeRef, property: String },

    /// Element access: `object[index]`
    ElementAccess { object: NodeRef, index: NodeRef },

    /// Conditional expression: `cond ? then : else`
    Conditional {
        condition: NodeRef,
        when_true: NodeRef,
        when_false: NodeRef,
    },

    /// Parenthesized expression: `(expr)`
    Paren(NodeRef),

    /// Comma expression: `a, b, c`
    Comma(Vec<NodeRef>),

    /// Array literal: `[a, b, c]`
    ArrayLiteral(Vec<NodeRef>),

    /// Generator suspend point: `yield` / `yield expr`
    Yield(Option<NodeRef>),

    /// Await suspend point: `await expr`
    Await(NodeRef),

    // =========================================================================
    // Statements
    // =========================================================================
    /// Expression statement: `expr;`
    ExpressionStatement(NodeRef),

    /// Variable statement: `var a = 1, b;`
    VariableStatement {
        kind: VarKind,
        declarations: Vec<VariableDeclarator>,
    },

    /// Return statement: `return;` / `return expr;`
    ReturnStatement(Option<NodeRef>),

    /// Block statement: `{ statements }`
    Block(Vec<NodeRef>),

    /// If statement
    If {
        condition: NodeRef,
        then_branch: NodeRef,
        else_branch: Option<NodeRef>,
    },

    /// While statement
    While { condition: NodeRef, body: NodeRef },

    /// For statement: `for (init; cond; incr) body`
    For {
        initializer: Option<NodeRef>,
        condition: Option<NodeRef>,
        incrementor: Option<NodeRef>,
        body: NodeRef,
    },

    /// For-in statement: `for (var k in expr) body` / `for (k in expr) body`.
    /// `declaration` carries the declaration kind when the target is declared
    /// in the loop head.
    ForIn {
        declaration: Option<VarKind>,
        target: NodeRef,
        expression: NodeRef,
        body: NodeRef,
    },

    /// Switch statement (produced by the state-machine builders)
    Switch {
        expression: NodeRef,
        cases: Vec<SwitchCase>,
    },

    // =========================================================================
    // Function-bearing nodes
    // =========================================================================
    /// Function declaration: `function name(params) { body }`
    FunctionDeclaration(FunctionData),

    /// Function expression: `function [name](params) { body }`
    FunctionExpression(FunctionData),

    /// Get accessor: `get name() { body }`
    GetAccessor(AccessorData),

    /// Set accessor: `set name(param) { body }`
    SetAccessor(AccessorData),

    /// Root of a program: a statement list
    SourceFile(Vec<NodeRef>),
}

/// Declaration kind of a variable statement. Reconstructed verbatim by every
/// transform that rebuilds a variable statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn keyword(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// One declarator in a variable statement: `name` or `name = initializer`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    pub name: String,
    pub initializer: Option<NodeRef>,
}

impl VariableDeclarator {
    pub fn new(name: impl Into<String>, initializer: Option<NodeRef>) -> Self {
        VariableDeclarator {
            name: name.into(),
            initializer,
        }
    }
}

/// Function parameter. Type annotations are carried as opaque text so the
/// transforms can preserve them without understanding them.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            type_annotation: None,
        }
    }

    pub fn with_type(mut self, annotation: impl Into<String>) -> Self {
        self.type_annotation = Some(annotation.into());
        self
    }
}

/// Payload of a function declaration or function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    pub name: Option<String>,
    pub parameters: Vec<Parameter>,
    pub body: Vec<NodeRef>,
    pub is_generator: bool,
    pub return_type: Option<String>,
}

/// Payload of a get or set accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorData {
    pub name: String,
    pub is_static: bool,
    pub parameters: Vec<Parameter>,
    pub body: Vec<NodeRef>,
    pub type_annotation: Option<String>,
}

/// One case of a switch statement. `test: None` is the default clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub test: Option<NodeRef>,
    pub statements: Vec<NodeRef>,
}

// =========================================================================
// Builder helpers
// =========================================================================

impl Node {
    /// Create an identifier node
    pub fn id(name: impl Into<String>) -> NodeRef {
        Rc::new(Node::Identifier(name.into()))
    }

    /// Create a numeric literal
    pub fn number(n: impl Into<String>) -> NodeRef {
        Rc::new(Node::NumericLiteral(n.into()))
    }

    /// Create a string literal
    pub fn string(s: impl Into<String>) -> NodeRef {
        Rc::new(Node::StringLiteral(s.into()))
    }

    /// Create `this`
    pub fn this() -> NodeRef {
        Rc::new(Node::This)
    }

    /// Create a binary expression
    pub fn binary(left: NodeRef, operator: impl Into<String>, right: NodeRef) -> NodeRef {
        Rc::new(Node::Binary {
            left,
            operator: operator.into(),
            right,
        })
    }

    /// Create an assignment expression: `target = value`
    pub fn assign(target: NodeRef, value: NodeRef) -> NodeRef {
        Node::binary(target, "=", value)
    }

    /// Create a postfix unary expression: `x++`
    pub fn postfix(operand: NodeRef, operator: impl Into<String>) -> NodeRef {
        Rc::new(Node::PostfixUnary {
            operand,
            operator: operator.into(),
        })
    }

    /// Create a call expression
    pub fn call(callee: NodeRef, arguments: Vec<NodeRef>) -> NodeRef {
        Rc::new(Node::Call { callee, arguments })
    }

    /// Create a property access: `object.property`
    pub fn prop(object: NodeRef, property: impl Into<String>) -> NodeRef {
        Rc::new(Node::PropertyAccess {
            object,
            property: property.into(),
        })
    }

    /// Create an element access: `object[index]`
    pub fn elem(object: NodeRef, index: NodeRef) -> NodeRef {
        Rc::new(Node::ElementAccess { object, index })
    }

    /// Wrap in parentheses
    pub fn paren(expr: NodeRef) -> NodeRef {
        Rc::new(Node::Paren(expr))
    }

    /// Create a comma expression
    pub fn comma(exprs: Vec<NodeRef>) -> NodeRef {
        Rc::new(Node::Comma(exprs))
    }

    /// Create an array literal
    pub fn array(elements: Vec<NodeRef>) -> NodeRef {
        Rc::new(Node::ArrayLiteral(elements))
    }

    /// Create a yield expression
    pub fn yield_expr(operand: Option<NodeRef>) -> NodeRef {
        Rc::new(Node::Yield(operand))
    }

    /// Create an await expression
    pub fn await_expr(operand: NodeRef) -> NodeRef {
        Rc::new(Node::Await(operand))
    }

    /// Create an expression statement
    pub fn expr_stmt(expr: NodeRef) -> NodeRef {
        Rc::new(Node::ExpressionStatement(expr))
    }

    /// Create a variable statement
    pub fn var_stmt(kind: VarKind, declarations: Vec<VariableDeclarator>) -> NodeRef {
        Rc::new(Node::VariableStatement { kind, declarations })
    }

    /// Create a return statement
    pub fn ret(expr: Option<NodeRef>) -> NodeRef {
        Rc::new(Node::ReturnStatement(expr))
    }

    /// Create a block
    pub fn block(statements: Vec<NodeRef>) -> NodeRef {
        Rc::new(Node::Block(statements))
    }

    /// Create a source file root
    pub fn source_file(statements: Vec<NodeRef>) -> NodeRef {
        Rc::new(Node::SourceFile(statements))
    }

    /// Whether this node is a suspend expression (`yield` or `await`).
    pub fn is_suspend(&self) -> bool {
        matches!(self, Node::Yield(_) | Node::Await(_))
    }

    /// Whether this node owns a function body of its own. Traversals that must
    /// stay inside the current function body stop at these.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            Node::FunctionDeclaration(_)
                | Node::FunctionExpression(_)
                | Node::GetAccessor(_)
                | Node::SetAccessor(_)
        )
    }
}

/// Strip any number of parenthesized wrappers from an expression.
///
/// Used only on the outermost expression of an expression statement, where
/// removing parentheses around a comma or assignment cannot change meaning.
pub fn strip_parens(node: &NodeRef) -> &NodeRef {
    let mut current = node;
    while let Node::Paren(inner) = current.as_ref() {
        current = inner;
    }
    current
}
