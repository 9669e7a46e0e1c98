use std::collections::HashSet;

use super::FunctionPass;
use crate::ir::{BlockId, FunctionData, Inst, ValueDef, ValueId};

/// Control-flow cleanup: drop blocks unreachable from the entry and repair φ
/// nodes afterwards. A φ left with a single incoming edge is forwarded to its
/// one input.
pub struct SimplifyCfg;

impl FunctionPass for SimplifyCfg {
    fn name(&self) -> &'static str {
        "simplify-cfg"
    }

    fn run(&mut self, func: &mut FunctionData) {
        if !func.is_defined() {
            return;
        }

        let mut reachable: HashSet<BlockId> = HashSet::new();
        let mut stack = vec![func.entry()];
        while let Some(block) = stack.pop() {
            if func.blocks[block.0].removed || !reachable.insert(block) {
                continue;
            }
            stack.extend(func.successors(block));
        }

        for i in 0..func.blocks.len() {
            if func.blocks[i].removed || reachable.contains(&BlockId(i)) {
                continue;
            }
            let block = &mut func.blocks[i];
            block.removed = true;
            block.term = None;
            for id in std::mem::take(&mut block.insts) {
                func.values[id.0] = ValueDef::Dead;
            }
        }

        // Drop φ edges coming from pruned blocks.
        for def in &mut func.values {
            if let ValueDef::Inst(Inst::Phi { incoming }) = def {
                incoming.retain(|(_, from)| reachable.contains(from));
            }
        }

        // A φ left with a single edge forwards to its one input.
        let mut forwarded = Vec::new();
        for (i, def) in func.values.iter().enumerate() {
            if let ValueDef::Inst(Inst::Phi { incoming }) = def {
                if incoming.len() == 1 {
                    forwarded.push((ValueId(i), incoming[0].0));
                }
            }
        }
        for (phi, input) in forwarded {
            func.replace_uses(phi, input);
            func.values[phi.0] = ValueDef::Dead;
            for block in &mut func.blocks {
                block.insts.retain(|v| *v != phi);
            }
        }
    }
}
