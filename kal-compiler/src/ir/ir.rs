// An in-memory SSA module: functions made of basic blocks, with one value
// arena per function. Every instruction defines a value; block order inside
// `BlockData::insts` is execution order.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub usize);

/// The type of an SSA value. `F64` is the language's only surface type;
/// `Bool` values exist between a comparison and its consumer, `Ptr` values
/// are stack-slot addresses, and `I32` only occurs in the synthesized entry
/// point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    F64,
    I32,
    Bool,
    Ptr,
}

impl Type {
    pub fn name(&self) -> &'static str {
        match self {
            Type::F64 => "double",
            Type::I32 => "i32",
            Type::Bool => "i1",
            Type::Ptr => "ptr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Fadd => "fadd",
            BinOp::Fsub => "fsub",
            BinOp::Fmul => "fmul",
            BinOp::Fdiv => "fdiv",
        };
        write!(f, "{s}")
    }
}

/// Floating-point comparison predicates; `u` means unordered, so the
/// comparison holds when either operand is NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FcmpPred {
    Ult,
    Une,
}

impl fmt::Display for FcmpPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FcmpPred::Ult => "ult",
            FcmpPred::Une => "une",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    ConstF64(f64),
    ConstI32(i32),
    Binary {
        op: BinOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Fcmp {
        pred: FcmpPred,
        lhs: ValueId,
        rhs: ValueId,
    },
    /// Widen a comparison flag to 0.0 / 1.0.
    ToDouble(ValueId),
    Call {
        callee: FuncId,
        args: Vec<ValueId>,
    },
    /// A stack slot holding one mutable double; `name` is the source-level
    /// binding it backs.
    Slot {
        name: String,
    },
    Load {
        slot: ValueId,
    },
    Store {
        slot: ValueId,
        value: ValueId,
    },
    Phi {
        incoming: Vec<(ValueId, BlockId)>,
    },
}

/// How a value came to exist.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueDef {
    /// The n-th function parameter.
    Param(usize),
    Inst(Inst),
    /// Removed by an optimization pass; ids stay stable, the def is gone.
    Dead,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br(BlockId),
    CondBr {
        cond: ValueId,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Ret(ValueId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockData {
    pub name: String,
    pub insts: Vec<ValueId>,
    pub term: Option<Terminator>,
    /// Pruned by CFG simplification; ids stay stable, the block is skipped.
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    pub name: String,
    pub params: Vec<String>,
    pub ret_type: Type,
    pub values: Vec<ValueDef>,
    pub blocks: Vec<BlockData>,
    pub erased: bool,
}

impl FunctionData {
    /// A function without blocks is a bare declaration.
    pub fn is_defined(&self) -> bool {
        self.blocks.iter().any(|b| !b.removed)
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn value_type(&self, value: ValueId) -> Type {
        match &self.values[value.0] {
            ValueDef::Param(_) | ValueDef::Dead => Type::F64,
            ValueDef::Inst(inst) => match inst {
                Inst::ConstF64(_) => Type::F64,
                Inst::ConstI32(_) => Type::I32,
                Inst::Binary { .. } => Type::F64,
                Inst::Fcmp { .. } => Type::Bool,
                Inst::ToDouble(_) => Type::F64,
                Inst::Call { .. } => Type::F64,
                Inst::Slot { .. } => Type::Ptr,
                Inst::Load { .. } => Type::F64,
                Inst::Store { .. } => Type::F64,
                Inst::Phi { .. } => Type::F64,
            },
        }
    }

    /// Successor blocks of `block`, per its terminator.
    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        match &self.blocks[block.0].term {
            Some(Terminator::Br(dest)) => vec![*dest],
            Some(Terminator::CondBr {
                then_dest,
                else_dest,
                ..
            }) => vec![*then_dest, *else_dest],
            _ => Vec::new(),
        }
    }

    /// Live blocks that branch to `block`.
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        let mut preds = Vec::new();
        for (i, data) in self.blocks.iter().enumerate() {
            if data.removed {
                continue;
            }
            if self.successors(BlockId(i)).contains(&block) {
                preds.push(BlockId(i));
            }
        }
        preds
    }

    /// Rewrite every use of `from` (operands, φ inputs, terminators) to `to`.
    pub fn replace_uses(&mut self, from: ValueId, to: ValueId) {
        for def in &mut self.values {
            if let ValueDef::Inst(inst) = def {
                match inst {
                    Inst::Binary { lhs, rhs, .. } | Inst::Fcmp { lhs, rhs, .. } => {
                        if *lhs == from {
                            *lhs = to;
                        }
                        if *rhs == from {
                            *rhs = to;
                        }
                    }
                    Inst::ToDouble(v) | Inst::Load { slot: v } => {
                        if *v == from {
                            *v = to;
                        }
                    }
                    Inst::Store { slot, value } => {
                        if *slot == from {
                            *slot = to;
                        }
                        if *value == from {
                            *value = to;
                        }
                    }
                    Inst::Call { args, .. } => {
                        for arg in args {
                            if *arg == from {
                                *arg = to;
                            }
                        }
                    }
                    Inst::Phi { incoming } => {
                        for (v, _) in incoming {
                            if *v == from {
                                *v = to;
                            }
                        }
                    }
                    Inst::ConstF64(_) | Inst::ConstI32(_) | Inst::Slot { .. } => {}
                }
            }
        }
        for block in &mut self.blocks {
            match &mut block.term {
                Some(Terminator::CondBr { cond, .. }) => {
                    if *cond == from {
                        *cond = to;
                    }
                }
                Some(Terminator::Ret(v)) => {
                    if *v == from {
                        *v = to;
                    }
                }
                _ => {}
            }
        }
    }

    fn value_name(&self, value: ValueId) -> String {
        match &self.values[value.0] {
            ValueDef::Param(i) => format!("%{}", self.params[*i]),
            _ => format!("%{}", value.0),
        }
    }

    fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("double %{p}"))
            .collect();
        format!(
            "{} @{}({})",
            self.ret_type.name(),
            self.name,
            params.join(", ")
        )
    }

    fn push_lines(&self, module: &Module, out: &mut Vec<String>) {
        if !self.is_defined() {
            out.push(format!("declare {}", self.signature()));
            return;
        }
        out.push(format!("define {} {{", self.signature()));
        for block in &self.blocks {
            if block.removed {
                continue;
            }
            out.push(format!("{}:", block.name));
            for &id in &block.insts {
                let inst = match &self.values[id.0] {
                    ValueDef::Inst(inst) => inst,
                    _ => continue,
                };
                let name = self.value_name(id);
                let line = match inst {
                    Inst::ConstF64(v) => format!("{name} = const {v:?}"),
                    Inst::ConstI32(v) => format!("{name} = const i32 {v}"),
                    Inst::Binary { op, lhs, rhs } => format!(
                        "{name} = {op} {}, {}",
                        self.value_name(*lhs),
                        self.value_name(*rhs)
                    ),
                    Inst::Fcmp { pred, lhs, rhs } => format!(
                        "{name} = fcmp {pred} {}, {}",
                        self.value_name(*lhs),
                        self.value_name(*rhs)
                    ),
                    Inst::ToDouble(v) => {
                        format!("{name} = to_double {}", self.value_name(*v))
                    }
                    Inst::Call { callee, args } => {
                        let args: Vec<String> =
                            args.iter().map(|a| self.value_name(*a)).collect();
                        format!(
                            "{name} = call @{}({})",
                            module.functions[callee.0].name,
                            args.join(", ")
                        )
                    }
                    Inst::Slot { name: var } => format!("{name} = slot \"{var}\""),
                    Inst::Load { slot } => {
                        format!("{name} = load {}", self.value_name(*slot))
                    }
                    Inst::Store { slot, value } => format!(
                        "store {}, {}",
                        self.value_name(*value),
                        self.value_name(*slot)
                    ),
                    Inst::Phi { incoming } => {
                        let arms: Vec<String> = incoming
                            .iter()
                            .map(|(v, b)| {
                                format!("[ {}, {} ]", self.value_name(*v), self.blocks[b.0].name)
                            })
                            .collect();
                        format!("{name} = phi {}", arms.join(", "))
                    }
                };
                out.push(format!("  {line}"));
            }
            match &block.term {
                Some(Terminator::Br(dest)) => {
                    out.push(format!("  br {}", self.blocks[dest.0].name))
                }
                Some(Terminator::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                }) => out.push(format!(
                    "  cond_br {}, {}, {}",
                    self.value_name(*cond),
                    self.blocks[then_dest.0].name,
                    self.blocks[else_dest.0].name
                )),
                Some(Terminator::Ret(v)) => {
                    out.push(format!("  ret {}", self.value_name(*v)))
                }
                None => out.push("  <no terminator>".to_string()),
            }
        }
        out.push("}".to_string());
    }
}

/// The unit of compilation handed to the code generator.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub data_layout: String,
    pub target_triple: String,
    pub functions: Vec<FunctionData>,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        data_layout: impl Into<String>,
        target_triple: impl Into<String>,
    ) -> Self {
        Module {
            name: name.into(),
            data_layout: data_layout.into(),
            target_triple: target_triple.into(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, id: FuncId) -> &FunctionData {
        &self.functions[id.0]
    }

    /// Live (non-erased) functions, declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &FunctionData)> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.erased)
            .map(|(i, f)| (FuncId(i), f))
    }

    /// Look up a live function by symbol name.
    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.functions().find(|(_, f)| f.name == name).map(|(id, _)| id)
    }

    pub fn to_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(format!("; ModuleID = '{}'", self.name));
        if !self.data_layout.is_empty() {
            out.push(format!("target datalayout = \"{}\"", self.data_layout));
        }
        if !self.target_triple.is_empty() {
            out.push(format!("target triple = \"{}\"", self.target_triple));
        }
        for (_, function) in self.functions() {
            out.push(String::new());
            function.push_lines(self, &mut out);
        }
        out
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
