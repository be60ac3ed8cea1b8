//! Transform driver.
//!
//! Single entry point for lowering every function-bearing node in a program.
//! Per function body the driver recurses into nested functions first, asks the
//! suspend analysis what the body contains, and then sequences the sub-passes:
//! for-in lowering, suspend factoring, and state-machine construction, in that
//! order. Bodies that need none of it come back pointer-identical, so callers
//! can detect "nothing happened" with `Rc::ptr_eq`.
//!
//! The collaborators (loop lowering and the two state-machine builders) sit
//! behind trait objects so callers can substitute their own; the defaults are
//! the passes shipped in this crate.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::diagnostics::DiagnosticReporter;
use crate::names::NameGenerator;
use crate::syntax::{AccessorData, FunctionData, Node, NodeRef, Rewrite};
use crate::transforms::for_in_lowering::{ForInLowering, LoopLowering};
use crate::transforms::state_machine::{
    DeferredFunctionBuilder, GeneratorFunctionBuilder, StateMachineBuilder,
};
use crate::transforms::suspend_analysis::analyze_body;
use crate::transforms::suspend_factoring::SuspendFactoring;

/// Which suspend semantics the driver is allowed to compile away.
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    /// Lower generator bodies to explicit state machines.
    pub generators: bool,
    /// Lower deferred/async bodies to explicit state machines.
    pub deferred_functions: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            generators: true,
            deferred_functions: false,
        }
    }
}

/// What happened to one function body.
enum BodyOutcome {
    /// Nothing changed anywhere, keep the original node.
    Unchanged,
    /// Only nested functions changed; the body itself was not lowered.
    InnerOnly(Vec<NodeRef>),
    /// A state-machine builder produced a replacement body.
    Lowered(Vec<NodeRef>),
}

pub struct TransformDriver<'r> {
    options: TransformOptions,
    names: NameGenerator,
    reporter: &'r mut dyn DiagnosticReporter,
    loop_lowering: Box<dyn LoopLowering>,
    generator_builder: Box<dyn StateMachineBuilder>,
    deferred_builder: Box<dyn StateMachineBuilder>,
}

impl<'r> TransformDriver<'r> {
    pub fn new(options: TransformOptions, reporter: &'r mut dyn DiagnosticReporter) -> Self {
        TransformDriver::with_collaborators(
            options,
            reporter,
            Box::new(ForInLowering),
            Box::new(GeneratorFunctionBuilder),
            Box::new(DeferredFunctionBuilder),
        )
    }

    /// Build a driver around caller-supplied collaborator passes.
    pub fn with_collaborators(
        options: TransformOptions,
        reporter: &'r mut dyn DiagnosticReporter,
        loop_lowering: Box<dyn LoopLowering>,
        generator_builder: Box<dyn StateMachineBuilder>,
        deferred_builder: Box<dyn StateMachineBuilder>,
    ) -> Self {
        TransformDriver {
            options,
            names: NameGenerator::new(),
            reporter,
            loop_lowering,
            generator_builder,
            deferred_builder,
        }
    }

    /// Transform a program tree. Accepts any node; function declarations,
    /// function expressions, and property accessors anywhere beneath it are
    /// candidates for lowering. Returns the original `Rc` when nothing
    /// applied.
    pub fn transform(&mut self, node: &NodeRef) -> NodeRef {
        // Source identifiers are reserved up front so synthetic names never
        // shadow or collide with user code.
        NameCollector {
            names: &mut self.names,
        }
        .rewrite(node);

        self.rewrite(node)
    }

    fn transform_body(&mut self, body: &[NodeRef], is_generator: bool) -> BodyOutcome {
        // Inner functions first; their suspend points belong to their own
        // lowering and must be gone before this body is analyzed.
        let inner = self.rewrite_list(body);
        let current: &[NodeRef] = inner.as_deref().unwrap_or(body);

        let finish = |inner: Option<Vec<NodeRef>>| match inner {
            None => BodyOutcome::Unchanged,
            Some(body) => BodyOutcome::InnerOnly(body),
        };

        if !is_generator && !self.options.deferred_functions {
            return finish(inner);
        }

        let flags = analyze_body(current);
        if is_generator && !flags.has_yield() && !flags.has_await() {
            trace!("generator body has no suspend points, passing through");
            return finish(inner);
        }

        // For-in enumeration cannot be paused mid-iteration, so it is made
        // resumable before any state machine is built over it.
        let mut working: Option<Vec<NodeRef>> = None;
        if flags.has_for_in() && (self.options.generators || self.options.deferred_functions) {
            working = self.loop_lowering.lower(&mut self.names, current);
        }

        if flags.has_yield() || is_generator {
            if self.options.generators {
                let base = working.unwrap_or_else(|| current.to_vec());
                let factored = SuspendFactoring::new().factor_body(&base).unwrap_or(base);
                debug!(statements = factored.len(), "lowering generator body");
                return BodyOutcome::Lowered(self.generator_builder.build(
                    &mut self.names,
                    &mut *self.reporter,
                    factored,
                ));
            }
        } else if self.options.deferred_functions {
            let base = working.unwrap_or_else(|| current.to_vec());
            debug!(statements = base.len(), "lowering deferred body");
            return BodyOutcome::Lowered(self.deferred_builder.build(
                &mut self.names,
                &mut *self.reporter,
                base,
            ));
        }

        finish(inner)
    }
}

impl Rewrite for TransformDriver<'_> {
    fn rewrite(&mut self, node: &NodeRef) -> NodeRef {
        match node.as_ref() {
            Node::FunctionDeclaration(data) => {
                match self.transform_body(&data.body, data.is_generator) {
                    BodyOutcome::Unchanged => node.clone(),
                    BodyOutcome::InnerOnly(body) => Rc::new(Node::FunctionDeclaration(
                        FunctionData {
                            body,
                            ..data.clone()
                        },
                    )),
                    // A lowered body is an ordinary function; the generator
                    // contract has been compiled away.
                    BodyOutcome::Lowered(body) => Rc::new(Node::FunctionDeclaration(
                        FunctionData {
                            body,
                            is_generator: false,
                            ..data.clone()
                        },
                    )),
                }
            }
            Node::FunctionExpression(data) => {
                match self.transform_body(&data.body, data.is_generator) {
                    BodyOutcome::Unchanged => node.clone(),
                    BodyOutcome::InnerOnly(body) => Rc::new(Node::FunctionExpression(
                        FunctionData {
                            body,
                            ..data.clone()
                        },
                    )),
                    BodyOutcome::Lowered(body) => Rc::new(Node::FunctionExpression(
                        FunctionData {
                            body,
                            is_generator: false,
                            ..data.clone()
                        },
                    )),
                }
            }
            Node::GetAccessor(data) => match self.transform_body(&data.body, false) {
                BodyOutcome::Unchanged => node.clone(),
                BodyOutcome::InnerOnly(body) | BodyOutcome::Lowered(body) => {
                    Rc::new(Node::GetAccessor(AccessorData {
                        body,
                        ..data.clone()
                    }))
                }
            },
            Node::SetAccessor(data) => match self.transform_body(&data.body, false) {
                BodyOutcome::Unchanged => node.clone(),
                BodyOutcome::InnerOnly(body) | BodyOutcome::Lowered(body) => {
                    Rc::new(Node::SetAccessor(AccessorData {
                        body,
                        ..data.clone()
                    }))
                }
            },
            _ => self.walk(node),
        }
    }
}

/// Reserves every identifier visible in the source tree, nested functions
/// included, so fresh names allocated later never collide with it.
struct NameCollector<'a> {
    names: &'a mut NameGenerator,
}

impl Rewrite for NameCollector<'_> {
    fn rewrite(&mut self, node: &NodeRef) -> NodeRef {
        match node.as_ref() {
            Node::Identifier(name) => self.names.reserve(name.clone()),
            Node::VariableStatement { declarations, .. } => {
                for declaration in declarations {
                    self.names.reserve(declaration.name.clone());
                }
            }
            Node::FunctionDeclaration(data) | Node::FunctionExpression(data) => {
                if let Some(name) = &data.name {
                    self.names.reserve(name.clone());
                }
                for parameter in &data.parameters {
                    self.names.reserve(parameter.name.clone());
                }
            }
            Node::GetAccessor(data) | Node::SetAccessor(data) => {
                for parameter in &data.parameters {
                    self.names.reserve(parameter.name.clone());
                }
            }
            _ => {}
        }
        self.walk(node)
    }
}
