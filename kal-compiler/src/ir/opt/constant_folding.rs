use super::FunctionPass;
use crate::ir::{BinOp, FunctionData, Inst, ValueDef};

/// Rewrites arithmetic over two constants into the constant result. The
/// rewrite happens in place on the defining instruction, so no uses need to
/// move; IEEE semantics (inf, NaN) carry through `f64` unchanged.
pub struct ConstantFolder;

impl FunctionPass for ConstantFolder {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn run(&mut self, func: &mut FunctionData) {
        // Operands always precede their users in the arena, so one forward
        // sweep folds whole constant chains.
        for i in 0..func.values.len() {
            let folded = match &func.values[i] {
                ValueDef::Inst(Inst::Binary { op, lhs, rhs }) => {
                    match (constant_of(func, *lhs), constant_of(func, *rhs)) {
                        (Some(l), Some(r)) => Some(match op {
                            BinOp::Fadd => l + r,
                            BinOp::Fsub => l - r,
                            BinOp::Fmul => l * r,
                            BinOp::Fdiv => l / r,
                        }),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some(value) = folded {
                func.values[i] = ValueDef::Inst(Inst::ConstF64(value));
            }
        }
    }
}

fn constant_of(func: &FunctionData, value: crate::ir::ValueId) -> Option<f64> {
    match func.values.get(value.0) {
        Some(ValueDef::Inst(Inst::ConstF64(v))) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockData, Terminator, Type, ValueId};

    fn function_with(values: Vec<ValueDef>, insts: Vec<ValueId>) -> FunctionData {
        FunctionData {
            name: "f".to_string(),
            params: Vec::new(),
            ret_type: Type::F64,
            values,
            blocks: vec![BlockData {
                name: "entry".to_string(),
                insts,
                term: Some(Terminator::Ret(ValueId(2))),
                removed: false,
            }],
            erased: false,
        }
    }

    #[test]
    fn folds_chains_of_constants() {
        // (1 + 2) * 4
        let mut func = function_with(
            vec![
                ValueDef::Inst(Inst::ConstF64(1.0)),
                ValueDef::Inst(Inst::ConstF64(2.0)),
                ValueDef::Inst(Inst::Binary {
                    op: BinOp::Fadd,
                    lhs: ValueId(0),
                    rhs: ValueId(1),
                }),
                ValueDef::Inst(Inst::ConstF64(4.0)),
                ValueDef::Inst(Inst::Binary {
                    op: BinOp::Fmul,
                    lhs: ValueId(2),
                    rhs: ValueId(3),
                }),
            ],
            (0..5).map(ValueId).collect(),
        );
        ConstantFolder.run(&mut func);
        assert_eq!(func.values[2], ValueDef::Inst(Inst::ConstF64(3.0)));
        assert_eq!(func.values[4], ValueDef::Inst(Inst::ConstF64(12.0)));
    }

    #[test]
    fn leaves_non_constant_operands_alone() {
        let mut func = function_with(
            vec![
                ValueDef::Param(0),
                ValueDef::Inst(Inst::ConstF64(2.0)),
                ValueDef::Inst(Inst::Binary {
                    op: BinOp::Fadd,
                    lhs: ValueId(0),
                    rhs: ValueId(1),
                }),
            ],
            vec![ValueId(1), ValueId(2)],
        );
        func.params.push("x".to_string());
        ConstantFolder.run(&mut func);
        assert!(matches!(
            func.values[2],
            ValueDef::Inst(Inst::Binary { .. })
        ));
    }
}
