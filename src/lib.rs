//! Suspend-point downleveling for a source-to-source compiler.
//!
//! Function bodies containing suspend points (`yield` in generators, `await`
//! in deferred functions) are rewritten into explicit state machines driven by
//! the `__generator` / `__awaiter` runtime helpers. The public surface is
//! [`TransformDriver`]: hand it any tree node and it lowers every
//! function-bearing node beneath it, returning the original `Rc` untouched
//! when nothing needed to change.
//!
//! ```
//! use tsdl::diagnostics::DiagnosticBag;
//! use tsdl::syntax::Node;
//! use tsdl::{TransformDriver, TransformOptions};
//!
//! let program = Node::source_file(vec![]);
//! let mut diagnostics = DiagnosticBag::new();
//! let mut driver = TransformDriver::new(TransformOptions::default(), &mut diagnostics);
//! let lowered = driver.transform(&program);
//! assert!(std::rc::Rc::ptr_eq(&lowered, &program));
//! ```

pub mod diagnostics;
pub mod names;
pub mod syntax;
pub mod transforms;

pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticReporter, DiagnosticSeverity};
pub use names::NameGenerator;
pub use syntax::{Node, NodeRef, Rewrite};
pub use transforms::{TransformDriver, TransformOptions};
