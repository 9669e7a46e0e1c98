//! IR optimizations.
//!
//! This module provides a framework for running optimization passes over a
//! single function, plus the default pipeline applied after each definition
//! is lowered and verified.

use crate::ir::FunctionData;

pub mod constant_folding;
pub mod local_value_numbering;
pub mod simplify_cfg;

/// A trait for a function-at-a-time optimization pass.
pub trait FunctionPass {
    fn name(&self) -> &'static str;
    fn run(&mut self, func: &mut FunctionData);
}

/// Manages and executes a sequence of passes.
pub struct PassManager {
    passes: Vec<Box<dyn FunctionPass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn add_pass(&mut self, pass: Box<dyn FunctionPass>) {
        self.passes.push(pass);
    }

    pub fn run_passes(&mut self, func: &mut FunctionData) {
        for pass in &mut self.passes {
            pass.run(func);
        }
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// The default pipeline: fold constants, then value-number away duplicate
/// pure instructions, then prune the control-flow graph.
pub fn optimize_function(func: &mut FunctionData) {
    let mut pm = PassManager::new();
    pm.add_pass(Box::new(constant_folding::ConstantFolder));
    pm.add_pass(Box::new(local_value_numbering::LocalValueNumbering));
    pm.add_pass(Box::new(simplify_cfg::SimplifyCfg));
    pm.run_passes(func);
}
