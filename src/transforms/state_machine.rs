//! State-machine construction.
//!
//! Lowers a normalized function body into an explicit, resumable control-flow
//! representation built on the `__generator` / `__awaiter` runtime helpers.
//!
//! ## Generator function
//! ```typescript
//! function* seq() {
//!     yield first();
//!     return done;
//! }
//! ```
//! Becomes (after suspend factoring):
//! ```javascript
//! function seq() {
//!     return __generator(this, function (__state) {
//!         switch (__state.label) {
//!             case 0: return [4 /*yield*/, first()];
//!             case 1: return [2 /*return*/, done];
//!         }
//!     });
//! }
//! ```
//!
//! ## Deferred (await-driven) function
//! An await-free body collapses to a single case:
//! ```javascript
//! return __awaiter(this, function (__state) {
//!     switch (__state.label) {
//!         case 0: return [2 /*return*/];
//!     }
//! });
//! ```
//!
//! The generator builder requires its input pre-factored: every suspend must
//! already sit in bare expression-statement position (see the suspend
//! factoring module). The deferred builder accepts an un-factored body and
//! factors it internally.
//!
//! These builders lower straight-line statement sequences; a suspend that only
//! becomes reachable inside a loop or branch is beyond them and is reported
//! through the diagnostic reporter, with the statement passed through.

use std::rc::Rc;

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticReporter};
use crate::names::NameGenerator;
use crate::syntax::{FunctionData, Node, NodeRef, Parameter, SwitchCase, VarKind};
use crate::transforms::suspend_analysis::{SuspendFlags, analyze_body};
use crate::transforms::suspend_factoring::{RESUME_CONTEXT_NAME, SuspendFactoring};

/// Member of the resumption context holding the current case label.
pub const STATE_LABEL_MEMBER: &str = "label";

/// Runtime helper driving generator semantics.
pub const GENERATOR_HELPER: &str = "__generator";

/// Runtime helper driving deferred/async semantics.
pub const AWAITER_HELPER: &str = "__awaiter";

// Opcodes of the `[op, value]` instructions understood by the runtime helpers.
const OP_RETURN: &str = "2";
const OP_YIELD: &str = "4";

/// Contract of the state-machine building collaborators consumed by the
/// driver.
pub trait StateMachineBuilder {
    /// Lower `body` into an explicit state machine, returning the replacement
    /// body.
    fn build(
        &self,
        names: &mut NameGenerator,
        reporter: &mut dyn DiagnosticReporter,
        body: Vec<NodeRef>,
    ) -> Vec<NodeRef>;
}

/// Builder for generator-semantics bodies. Input precondition: every suspend
/// expression has been factored to bare expression-statement position.
pub struct GeneratorFunctionBuilder;

impl StateMachineBuilder for GeneratorFunctionBuilder {
    fn build(
        &self,
        _names: &mut NameGenerator,
        reporter: &mut dyn DiagnosticReporter,
        body: Vec<NodeRef>,
    ) -> Vec<NodeRef> {
        let cases = split_into_cases(reporter, &flatten_statements(&body));
        debug!(cases = cases.len(), "built generator state machine");
        vec![wrap_state_machine(GENERATOR_HELPER, cases)]
    }
}

/// Builder for deferred/async-semantics bodies. Accepts an un-factored body
/// whose suspend points are await-style.
pub struct DeferredFunctionBuilder;

impl StateMachineBuilder for DeferredFunctionBuilder {
    fn build(
        &self,
        _names: &mut NameGenerator,
        reporter: &mut dyn DiagnosticReporter,
        body: Vec<NodeRef>,
    ) -> Vec<NodeRef> {
        let factored = SuspendFactoring::new()
            .factor_body(&body)
            .unwrap_or(body);
        let cases = split_into_cases(reporter, &flatten_statements(&factored));
        debug!(cases = cases.len(), "built deferred state machine");
        vec![wrap_state_machine(AWAITER_HELPER, cases)]
    }
}

/// Inline block statements into a flat statement stream for the case
/// splitter. A block is inlined when its braces are synthetic (the
/// two-statement shape factoring emits, which replaced a single statement in
/// the parent scope) or when dropping them is scope-neutral (`var` scoping is
/// function-wide; `let`/`const` is not, so a block declaring either keeps its
/// braces and is handled as an opaque statement).
fn flatten_statements(statements: &[NodeRef]) -> Vec<NodeRef> {
    let mut flat = Vec::with_capacity(statements.len());
    for statement in statements {
        match statement.as_ref() {
            Node::Block(inner) if is_factored_shape(inner) || is_scope_neutral(inner) => {
                flat.extend(flatten_statements(inner));
            }
            _ => flat.push(statement.clone()),
        }
    }
    flat
}

/// Whether a block is the two-statement sequence factoring synthesizes: a
/// bare suspend statement followed by the use of the resumed value.
fn is_factored_shape(statements: &[NodeRef]) -> bool {
    matches!(
        statements.first().map(|s| s.as_ref()),
        Some(Node::ExpressionStatement(expr)) if expr.is_suspend()
    )
}

/// Whether a block's braces can be dropped without changing what any
/// declaration is scoped to.
fn is_scope_neutral(statements: &[NodeRef]) -> bool {
    statements.iter().all(|statement| {
        !matches!(
            statement.as_ref(),
            Node::VariableStatement {
                kind: VarKind::Let | VarKind::Const,
                ..
            }
        )
    })
}

/// Split a flat statement sequence into switch cases, one case boundary per
/// suspend statement. Returns lower to `[2, value]` instructions, suspends to
/// `[4, operand]`.
fn split_into_cases(
    reporter: &mut dyn DiagnosticReporter,
    statements: &[NodeRef],
) -> Vec<SwitchCase> {
    let mut cases = Vec::new();
    let mut label: u32 = 0;
    let mut current: Vec<NodeRef> = Vec::new();

    for statement in statements {
        match statement.as_ref() {
            Node::ExpressionStatement(expr) if expr.is_suspend() => {
                let operand = match expr.as_ref() {
                    Node::Yield(operand) => operand.clone(),
                    Node::Await(operand) => Some(operand.clone()),
                    _ => None,
                };
                let mut instruction = vec![Node::number(OP_YIELD)];
                instruction.extend(operand);
                current.push(Node::ret(Some(Node::array(instruction))));

                cases.push(SwitchCase {
                    test: Some(Node::number(label.to_string())),
                    statements: std::mem::take(&mut current),
                });
                label += 1;
            }
            Node::ReturnStatement(value) => {
                let mut instruction = vec![Node::number(OP_RETURN)];
                instruction.extend(value.clone());
                current.push(Node::ret(Some(Node::array(instruction))));
            }
            _ => {
                let nested = analyze_body(std::slice::from_ref(statement));
                if nested.intersects(SuspendFlags::YIELD | SuspendFlags::AWAIT) {
                    reporter.report(Diagnostic::error(
                        "suspend expression inside nested control flow cannot be lowered \
                         to a state machine case",
                    ));
                }
                current.push(statement.clone());
            }
        }
    }

    // Every machine ends in an explicit return instruction.
    let ends_with_return = matches!(
        current.last().map(|s| s.as_ref()),
        Some(Node::ReturnStatement(_))
    );
    if !ends_with_return {
        current.push(Node::ret(Some(Node::array(vec![Node::number(OP_RETURN)]))));
    }
    cases.push(SwitchCase {
        test: Some(Node::number(label.to_string())),
        statements: current,
    });

    cases
}

/// Wrap the case list in the runtime-helper call:
/// `return <helper>(this, function (__state) { switch (__state.label) { ... } });`
fn wrap_state_machine(helper: &str, cases: Vec<SwitchCase>) -> NodeRef {
    let switch_stmt = Rc::new(Node::Switch {
        expression: Node::prop(Node::id(RESUME_CONTEXT_NAME), STATE_LABEL_MEMBER),
        cases,
    });
    let machine = Rc::new(Node::FunctionExpression(FunctionData {
        name: None,
        parameters: vec![Parameter::new(RESUME_CONTEXT_NAME)],
        body: vec![switch_stmt],
        is_generator: false,
        return_type: None,
    }));
    Node::ret(Some(Node::call(
        Node::id(helper),
        vec![Node::this(), machine],
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticBag;
    use crate::syntax::VariableDeclarator;
    use crate::transforms::suspend_factoring::resumed_value_slot;

    fn build(builder: &dyn StateMachineBuilder, body: Vec<NodeRef>) -> (Vec<NodeRef>, DiagnosticBag) {
        let mut names = NameGenerator::new();
        let mut bag = DiagnosticBag::new();
        let lowered = builder.build(&mut names, &mut bag, body);
        (lowered, bag)
    }

    fn unwrap_cases<'a>(body: &'a [NodeRef], helper: &str) -> &'a [SwitchCase] {
        assert_eq!(body.len(), 1);
        let Node::ReturnStatement(Some(call)) = body[0].as_ref() else {
            panic!("expected return statement, got {:?}", body[0]);
        };
        let Node::Call { callee, arguments } = call.as_ref() else {
            panic!("expected helper call, got {call:?}");
        };
        assert_eq!(callee, &Node::id(helper));
        assert_eq!(arguments[0], Node::this());
        let Node::FunctionExpression(data) = arguments[1].as_ref() else {
            panic!("expected machine function, got {:?}", arguments[1]);
        };
        assert_eq!(data.parameters[0].name, RESUME_CONTEXT_NAME);
        let Node::Switch { expression, cases } = data.body[0].as_ref() else {
            panic!("expected switch, got {:?}", data.body[0]);
        };
        assert_eq!(
            *expression,
            Node::prop(Node::id(RESUME_CONTEXT_NAME), STATE_LABEL_MEMBER)
        );
        cases
    }

    #[test]
    fn generator_splits_cases_at_suspend_statements() {
        // yield first(); x = __state.sent; return x;  (already factored)
        let body = vec![
            Node::expr_stmt(Node::yield_expr(Some(Node::call(Node::id("first"), vec![])))),
            Node::expr_stmt(Node::assign(Node::id("x"), resumed_value_slot())),
            Node::ret(Some(Node::id("x"))),
        ];

        let (lowered, bag) = build(&GeneratorFunctionBuilder, body);
        assert!(bag.is_empty());

        let cases = unwrap_cases(&lowered, GENERATOR_HELPER);
        assert_eq!(cases.len(), 2);

        assert_eq!(
            cases[0].statements,
            vec![Node::ret(Some(Node::array(vec![
                Node::number("4"),
                Node::call(Node::id("first"), vec![]),
            ])))]
        );

        assert_eq!(cases[1].test, Some(Node::number("1")));
        assert_eq!(
            cases[1].statements[1],
            Node::ret(Some(Node::array(vec![Node::number("2"), Node::id("x")])))
        );
    }

    #[test]
    fn trailing_return_instruction_is_added() {
        let body = vec![Node::expr_stmt(Node::call(Node::id("f"), vec![]))];
        let (lowered, bag) = build(&GeneratorFunctionBuilder, body);
        assert!(bag.is_empty());

        let cases = unwrap_cases(&lowered, GENERATOR_HELPER);
        assert_eq!(cases.len(), 1);
        assert_eq!(
            cases[0].statements.last(),
            Some(&Node::ret(Some(Node::array(vec![Node::number("2")]))))
        );
    }

    #[test]
    fn factored_blocks_are_flattened_into_the_case_stream() {
        // { yield e; x = __state.sent; } return x;
        let body = vec![
            Node::block(vec![
                Node::expr_stmt(Node::yield_expr(Some(Node::id("e")))),
                Node::expr_stmt(Node::assign(Node::id("x"), resumed_value_slot())),
            ]),
            Node::ret(Some(Node::id("x"))),
        ];
        let (lowered, bag) = build(&GeneratorFunctionBuilder, body);
        assert!(bag.is_empty());
        assert_eq!(unwrap_cases(&lowered, GENERATOR_HELPER).len(), 2);
    }

    #[test]
    fn user_blocks_with_lexical_declarations_keep_their_braces() {
        let scoped = Node::block(vec![
            Node::var_stmt(
                VarKind::Let,
                vec![VariableDeclarator::new("t", Some(Node::number("1")))],
            ),
            Node::expr_stmt(Node::call(Node::id("use"), vec![Node::id("t")])),
        ]);
        let body = vec![scoped.clone(), Node::ret(None)];

        let (lowered, bag) = build(&GeneratorFunctionBuilder, body);
        assert!(bag.is_empty());

        let cases = unwrap_cases(&lowered, GENERATOR_HELPER);
        assert_eq!(cases.len(), 1);
        assert!(Rc::ptr_eq(&cases[0].statements[0], &scoped));
    }

    #[test]
    fn factored_lexical_blocks_are_still_inlined() {
        // The block factoring emits for `let x = yield e;` has synthetic
        // braces; inlining it restores the original scope.
        let body = vec![Node::block(vec![
            Node::expr_stmt(Node::yield_expr(Some(Node::id("e")))),
            Node::var_stmt(
                VarKind::Let,
                vec![VariableDeclarator::new("x", Some(resumed_value_slot()))],
            ),
        ])];

        let (lowered, bag) = build(&GeneratorFunctionBuilder, body);
        assert!(bag.is_empty());
        assert_eq!(unwrap_cases(&lowered, GENERATOR_HELPER).len(), 2);
    }

    #[test]
    fn deferred_builder_factors_embedded_awaits() {
        // x = await p; return x;
        let body = vec![
            Node::expr_stmt(Node::assign(Node::id("x"), Node::await_expr(Node::id("p")))),
            Node::ret(Some(Node::id("x"))),
        ];
        let (lowered, bag) = build(&DeferredFunctionBuilder, body);
        assert!(bag.is_empty());

        let cases = unwrap_cases(&lowered, AWAITER_HELPER);
        assert_eq!(cases.len(), 2);
        assert_eq!(
            cases[0].statements,
            vec![Node::ret(Some(Node::array(vec![
                Node::number("4"),
                Node::id("p"),
            ])))]
        );
        assert_eq!(
            cases[1].statements[0],
            Node::expr_stmt(Node::assign(Node::id("x"), resumed_value_slot()))
        );
    }

    #[test]
    fn await_free_body_collapses_to_a_single_case() {
        let (lowered, bag) = build(&DeferredFunctionBuilder, vec![]);
        assert!(bag.is_empty());

        let cases = unwrap_cases(&lowered, AWAITER_HELPER);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].test, Some(Node::number("0")));
        assert_eq!(
            cases[0].statements,
            vec![Node::ret(Some(Node::array(vec![Node::number("2")])))]
        );
    }

    #[test]
    fn suspend_inside_control_flow_is_reported() {
        let body = vec![Rc::new(Node::While {
            condition: Node::id("cond"),
            body: Node::block(vec![Node::expr_stmt(Node::yield_expr(None))]),
        })];

        let (_, bag) = build(&GeneratorFunctionBuilder, body);
        assert!(bag.has_errors());
    }
}
