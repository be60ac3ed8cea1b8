//! Downleveling transforms.
//!
//! The pipeline, in the order the driver applies it to one function body:
//!
//! 1. [`suspend_analysis`] summarizes what the body contains.
//! 2. [`for_in_lowering`] rewrites for-in loops into a resumable form.
//! 3. [`suspend_factoring`] moves embedded suspend expressions into bare
//!    statement position.
//! 4. [`state_machine`] lowers the normalized body onto the `__generator` /
//!    `__awaiter` runtime helpers.
//!
//! [`driver`] owns the sequencing and the per-function decision of whether any
//! of it is needed at all.

pub mod driver;
pub mod for_in_lowering;
pub mod state_machine;
pub mod suspend_analysis;
pub mod suspend_factoring;

pub use driver::{TransformDriver, TransformOptions};
pub use for_in_lowering::{ForInLowering, LoopLowering};
pub use state_machine::{DeferredFunctionBuilder, GeneratorFunctionBuilder, StateMachineBuilder};
pub use suspend_analysis::{SuspendFlags, analyze_body};
pub use suspend_factoring::{SuspendFactoring, resumed_value_slot};
