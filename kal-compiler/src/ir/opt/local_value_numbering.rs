use std::collections::HashMap;

use super::FunctionPass;
use crate::ir::{BinOp, FcmpPred, FunctionData, Inst, ValueDef, ValueId};

/// Block-local common-subexpression elimination.
///
/// Pure instructions are keyed by opcode and operands; a repeat within the
/// same block is rewritten to the first occurrence and its definition is
/// dropped. Loads and calls are never pure here — slots are mutable and
/// callees are arbitrary user code.
pub struct LocalValueNumbering;

#[derive(PartialEq, Eq, Hash)]
enum Key {
    ConstF64(u64),
    ConstI32(i32),
    Binary(BinOp, usize, usize),
    Fcmp(FcmpPred, usize, usize),
    ToDouble(usize),
}

fn key_of(inst: &Inst) -> Option<Key> {
    match inst {
        Inst::ConstF64(v) => Some(Key::ConstF64(v.to_bits())),
        Inst::ConstI32(v) => Some(Key::ConstI32(*v)),
        Inst::Binary { op, lhs, rhs } => Some(Key::Binary(*op, lhs.0, rhs.0)),
        Inst::Fcmp { pred, lhs, rhs } => Some(Key::Fcmp(*pred, lhs.0, rhs.0)),
        Inst::ToDouble(v) => Some(Key::ToDouble(v.0)),
        Inst::Call { .. }
        | Inst::Slot { .. }
        | Inst::Load { .. }
        | Inst::Store { .. }
        | Inst::Phi { .. } => None,
    }
}

impl FunctionPass for LocalValueNumbering {
    fn name(&self) -> &'static str {
        "local-value-numbering"
    }

    fn run(&mut self, func: &mut FunctionData) {
        for block_index in 0..func.blocks.len() {
            if func.blocks[block_index].removed {
                continue;
            }
            let mut numbered: HashMap<Key, ValueId> = HashMap::new();
            let mut kept = Vec::new();
            let insts = func.blocks[block_index].insts.clone();
            for id in insts {
                let key = match &func.values[id.0] {
                    ValueDef::Inst(inst) => key_of(inst),
                    _ => None,
                };
                match key {
                    Some(key) => match numbered.get(&key) {
                        Some(&canonical) => {
                            func.replace_uses(id, canonical);
                            func.values[id.0] = ValueDef::Dead;
                        }
                        None => {
                            numbered.insert(key, id);
                            kept.push(id);
                        }
                    },
                    None => kept.push(id),
                }
            }
            func.blocks[block_index].insts = kept;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockData, Terminator, Type};

    #[test]
    fn duplicate_pure_instructions_collapse() {
        // x + x computed twice; the second computation folds onto the first.
        let values = vec![
            ValueDef::Param(0),
            ValueDef::Inst(Inst::Binary {
                op: BinOp::Fadd,
                lhs: ValueId(0),
                rhs: ValueId(0),
            }),
            ValueDef::Inst(Inst::Binary {
                op: BinOp::Fadd,
                lhs: ValueId(0),
                rhs: ValueId(0),
            }),
            ValueDef::Inst(Inst::Binary {
                op: BinOp::Fmul,
                lhs: ValueId(1),
                rhs: ValueId(2),
            }),
        ];
        let mut func = FunctionData {
            name: "f".to_string(),
            params: vec!["x".to_string()],
            ret_type: Type::F64,
            values,
            blocks: vec![BlockData {
                name: "entry".to_string(),
                insts: vec![ValueId(1), ValueId(2), ValueId(3)],
                term: Some(Terminator::Ret(ValueId(3))),
                removed: false,
            }],
            erased: false,
        };

        LocalValueNumbering.run(&mut func);

        assert_eq!(func.values[2], ValueDef::Dead);
        assert_eq!(func.blocks[0].insts, vec![ValueId(1), ValueId(3)]);
        match &func.values[3] {
            ValueDef::Inst(Inst::Binary { lhs, rhs, .. }) => {
                assert_eq!(*lhs, ValueId(1));
                assert_eq!(*rhs, ValueId(1));
            }
            other => panic!("unexpected def: {:?}", other),
        }
    }

    #[test]
    fn loads_are_not_numbered() {
        // Two loads of the same slot must both survive: a store could sit
        // between them.
        let values = vec![
            ValueDef::Inst(Inst::Slot {
                name: "a".to_string(),
            }),
            ValueDef::Inst(Inst::Load { slot: ValueId(0) }),
            ValueDef::Inst(Inst::Load { slot: ValueId(0) }),
        ];
        let mut func = FunctionData {
            name: "f".to_string(),
            params: Vec::new(),
            ret_type: Type::F64,
            values,
            blocks: vec![BlockData {
                name: "entry".to_string(),
                insts: vec![ValueId(0), ValueId(1), ValueId(2)],
                term: Some(Terminator::Ret(ValueId(2))),
                removed: false,
            }],
            erased: false,
        };

        LocalValueNumbering.run(&mut func);
        assert_eq!(func.blocks[0].insts.len(), 3);
    }
}
