//! Structural checks on a lowered function.
//!
//! The verifier is a safety net behind the lowerer: it confirms the block
//! graph and the value uses are well formed before optimization runs. A
//! failure aborts the form that produced the function, never the session.

use crate::ir::{BlockId, FuncId, Inst, Module, Terminator, Type, ValueDef, ValueId};

pub fn verify_function(module: &Module, func: FuncId) -> Result<(), String> {
    let f = module.function(func);
    if !f.is_defined() {
        return Ok(());
    }
    if f.blocks[0].removed {
        return Err("entry block was removed".to_string());
    }

    let check_operand = |value: ValueId, expected: Type, what: &str| -> Result<(), String> {
        if value.0 >= f.values.len() {
            return Err(format!("{what} references value out of range"));
        }
        if matches!(f.values[value.0], ValueDef::Dead) {
            return Err(format!("{what} references a removed value"));
        }
        let found = f.value_type(value);
        if found != expected {
            return Err(format!(
                "{what} expects {} but found {}",
                expected.name(),
                found.name()
            ));
        }
        Ok(())
    };

    for (i, block) in f.blocks.iter().enumerate() {
        if block.removed {
            continue;
        }
        let here = BlockId(i);

        for &id in &block.insts {
            let inst = match f.values.get(id.0) {
                Some(ValueDef::Inst(inst)) => inst,
                Some(_) => {
                    return Err(format!(
                        "block '{}' lists a non-instruction value",
                        block.name
                    ))
                }
                None => return Err(format!("block '{}' lists an unknown value", block.name)),
            };
            match inst {
                Inst::ConstF64(_) | Inst::ConstI32(_) | Inst::Slot { .. } => {}
                Inst::Binary { lhs, rhs, .. } => {
                    check_operand(*lhs, Type::F64, "arithmetic operand")?;
                    check_operand(*rhs, Type::F64, "arithmetic operand")?;
                }
                Inst::Fcmp { lhs, rhs, .. } => {
                    check_operand(*lhs, Type::F64, "comparison operand")?;
                    check_operand(*rhs, Type::F64, "comparison operand")?;
                }
                Inst::ToDouble(v) => check_operand(*v, Type::Bool, "to_double operand")?,
                Inst::Load { slot } => check_operand(*slot, Type::Ptr, "load address")?,
                Inst::Store { slot, value } => {
                    check_operand(*slot, Type::Ptr, "store address")?;
                    check_operand(*value, Type::F64, "stored value")?;
                }
                Inst::Call { callee, args } => {
                    if callee.0 >= module.functions.len() {
                        return Err("call references an unknown function".to_string());
                    }
                    let target = module.function(*callee);
                    if target.params.len() != args.len() {
                        return Err(format!(
                            "call to '{}' passes {} arguments, expected {}",
                            target.name,
                            args.len(),
                            target.params.len()
                        ));
                    }
                    for arg in args {
                        check_operand(*arg, Type::F64, "call argument")?;
                    }
                }
                Inst::Phi { incoming } => {
                    if here == f.entry() {
                        return Err("phi in entry block".to_string());
                    }
                    let mut preds = f.predecessors(here);
                    preds.sort_by_key(|b| b.0);
                    let mut sources: Vec<BlockId> = incoming.iter().map(|(_, b)| *b).collect();
                    sources.sort_by_key(|b| b.0);
                    if preds != sources {
                        return Err(format!(
                            "phi in '{}' does not cover its predecessors exactly",
                            block.name
                        ));
                    }
                    for (v, _) in incoming {
                        check_operand(*v, Type::F64, "phi input")?;
                    }
                }
            }
        }

        match &block.term {
            None => return Err(format!("block '{}' has no terminator", block.name)),
            Some(Terminator::Br(dest)) => {
                if dest.0 >= f.blocks.len() || f.blocks[dest.0].removed {
                    return Err(format!("block '{}' branches to a dead block", block.name));
                }
            }
            Some(Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            }) => {
                check_operand(*cond, Type::Bool, "branch condition")?;
                for dest in [then_dest, else_dest] {
                    if dest.0 >= f.blocks.len() || f.blocks[dest.0].removed {
                        return Err(format!(
                            "block '{}' branches to a dead block",
                            block.name
                        ));
                    }
                }
            }
            Some(Terminator::Ret(value)) => {
                check_operand(*value, f.ret_type, "return value")?;
            }
        }
    }

    Ok(())
}
