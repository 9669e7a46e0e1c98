//! The contract between the lowering core and the code generator.
//!
//! [`Builder`] is the full set of emission primitives the lowerer needs;
//! lowering is generic over it and touches nothing else of the code
//! generator. [`ModuleBuilder`] implements the contract over the in-memory
//! [`Module`], which `finalize` releases once the driver is done.

use crate::ir::{
    BinOp, BlockData, BlockId, FcmpPred, FuncId, FunctionData, Inst, Module, Terminator, Type,
    ValueDef, ValueId,
};
use crate::ir::{opt, verify};

pub trait Builder {
    // --- Functions ---

    /// Declare a function, or reuse the existing one with this name. While
    /// the function is still a bare declaration, its parameter list follows
    /// the latest declaration.
    fn declare_function(&mut self, name: &str, params: &[String], ret: Type) -> FuncId;
    fn find_function(&self, name: &str) -> Option<FuncId>;
    fn function_name(&self, func: FuncId) -> String;
    fn is_defined(&self, func: FuncId) -> bool;
    fn param_count(&self, func: FuncId) -> usize;
    fn param_value(&self, func: FuncId, index: usize) -> ValueId;
    /// Drop a function emitted by a form whose lowering failed.
    fn erase_function(&mut self, func: FuncId);

    // --- Insertion point ---

    fn enter_function(&mut self, func: FuncId);
    fn append_block(&mut self, name: &str) -> BlockId;
    fn position_at_end(&mut self, block: BlockId);
    fn current_block(&self) -> BlockId;

    // --- Instructions ---

    fn const_f64(&mut self, value: f64) -> ValueId;
    fn const_i32(&mut self, value: i32) -> ValueId;
    fn binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn fcmp(&mut self, pred: FcmpPred, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn to_double(&mut self, flag: ValueId) -> ValueId;
    fn call(&mut self, callee: FuncId, args: Vec<ValueId>) -> ValueId;
    /// Allocate a stack slot in the entry block of the current function.
    fn stack_slot(&mut self, name: &str) -> ValueId;
    fn load(&mut self, slot: ValueId) -> ValueId;
    fn store(&mut self, slot: ValueId, value: ValueId);
    fn phi(&mut self, incoming: Vec<(ValueId, BlockId)>) -> ValueId;

    // --- Terminators ---

    fn br(&mut self, dest: BlockId);
    fn cond_br(&mut self, cond: ValueId, then_dest: BlockId, else_dest: BlockId);
    fn ret(&mut self, value: ValueId);

    // --- Per-function finishing ---

    fn verify_function(&self, func: FuncId) -> Result<(), String>;
    fn optimize_function(&mut self, func: FuncId);
}

/// Builds the in-memory SSA [`Module`].
pub struct ModuleBuilder {
    module: Module,
    cur_func: Option<FuncId>,
    cur_block: Option<BlockId>,
}

impl ModuleBuilder {
    pub fn new(module: Module) -> Self {
        ModuleBuilder {
            module,
            cur_func: None,
            cur_block: None,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Release the finished module to the caller.
    pub fn finalize(self) -> Module {
        self.module
    }

    fn func_data(&mut self) -> &mut FunctionData {
        let id = self.cur_func.expect("no current function");
        &mut self.module.functions[id.0]
    }

    fn push_inst(&mut self, inst: Inst) -> ValueId {
        let block = self.cur_block.expect("no insertion point");
        let func = self.func_data();
        let id = ValueId(func.values.len());
        func.values.push(ValueDef::Inst(inst));
        func.blocks[block.0].insts.push(id);
        id
    }

    /// Terminate the current block. A block only gets one terminator; once
    /// it is closed, stray emission is dropped rather than overwriting it.
    fn terminate(&mut self, term: Terminator) {
        let block = self.cur_block.expect("no insertion point");
        let func = self.func_data();
        let slot = &mut func.blocks[block.0].term;
        if slot.is_none() {
            *slot = Some(term);
        }
    }
}

impl Builder for ModuleBuilder {
    fn declare_function(&mut self, name: &str, params: &[String], ret: Type) -> FuncId {
        if let Some(id) = self.find_function(name) {
            let func = &mut self.module.functions[id.0];
            if !func.is_defined() && func.params != params {
                func.params = params.to_vec();
                func.values = (0..params.len()).map(ValueDef::Param).collect();
                func.ret_type = ret;
            }
            return id;
        }
        let id = FuncId(self.module.functions.len());
        self.module.functions.push(FunctionData {
            name: name.to_string(),
            params: params.to_vec(),
            ret_type: ret,
            values: (0..params.len()).map(ValueDef::Param).collect(),
            blocks: Vec::new(),
            erased: false,
        });
        id
    }

    fn find_function(&self, name: &str) -> Option<FuncId> {
        self.module.get_function(name)
    }

    fn function_name(&self, func: FuncId) -> String {
        self.module.functions[func.0].name.clone()
    }

    fn is_defined(&self, func: FuncId) -> bool {
        self.module.functions[func.0].is_defined()
    }

    fn param_count(&self, func: FuncId) -> usize {
        self.module.functions[func.0].params.len()
    }

    fn param_value(&self, _func: FuncId, index: usize) -> ValueId {
        // Parameters occupy the first slots of the value arena.
        ValueId(index)
    }

    fn erase_function(&mut self, func: FuncId) {
        self.module.functions[func.0].erased = true;
        if self.cur_func == Some(func) {
            self.cur_func = None;
            self.cur_block = None;
        }
    }

    fn enter_function(&mut self, func: FuncId) {
        self.cur_func = Some(func);
        self.cur_block = None;
    }

    fn append_block(&mut self, name: &str) -> BlockId {
        let func = self.func_data();
        let mut unique = name.to_string();
        let mut counter = 1;
        while func.blocks.iter().any(|b| b.name == unique) {
            unique = format!("{name}{counter}");
            counter += 1;
        }
        let id = BlockId(func.blocks.len());
        func.blocks.push(BlockData {
            name: unique,
            insts: Vec::new(),
            term: None,
            removed: false,
        });
        id
    }

    fn position_at_end(&mut self, block: BlockId) {
        self.cur_block = Some(block);
    }

    fn current_block(&self) -> BlockId {
        self.cur_block.expect("no insertion point")
    }

    fn const_f64(&mut self, value: f64) -> ValueId {
        self.push_inst(Inst::ConstF64(value))
    }

    fn const_i32(&mut self, value: i32) -> ValueId {
        self.push_inst(Inst::ConstI32(value))
    }

    fn binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_inst(Inst::Binary { op, lhs, rhs })
    }

    fn fcmp(&mut self, pred: FcmpPred, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_inst(Inst::Fcmp { pred, lhs, rhs })
    }

    fn to_double(&mut self, flag: ValueId) -> ValueId {
        self.push_inst(Inst::ToDouble(flag))
    }

    fn call(&mut self, callee: FuncId, args: Vec<ValueId>) -> ValueId {
        self.push_inst(Inst::Call { callee, args })
    }

    fn stack_slot(&mut self, name: &str) -> ValueId {
        let FunctionData { values, blocks, .. } = self.func_data();
        let id = ValueId(values.len());
        values.push(ValueDef::Inst(Inst::Slot {
            name: name.to_string(),
        }));
        // Slots group at the top of the entry block, ahead of any code, so
        // they exist no matter which path later stores take.
        let entry = &mut blocks[0];
        let at = entry
            .insts
            .iter()
            .take_while(|v| matches!(values.get(v.0), Some(ValueDef::Inst(Inst::Slot { .. }))))
            .count();
        entry.insts.insert(at, id);
        id
    }

    fn load(&mut self, slot: ValueId) -> ValueId {
        self.push_inst(Inst::Load { slot })
    }

    fn store(&mut self, slot: ValueId, value: ValueId) {
        self.push_inst(Inst::Store { slot, value });
    }

    fn phi(&mut self, incoming: Vec<(ValueId, BlockId)>) -> ValueId {
        self.push_inst(Inst::Phi { incoming })
    }

    fn br(&mut self, dest: BlockId) {
        self.terminate(Terminator::Br(dest));
    }

    fn cond_br(&mut self, cond: ValueId, then_dest: BlockId, else_dest: BlockId) {
        self.terminate(Terminator::CondBr {
            cond,
            then_dest,
            else_dest,
        });
    }

    fn ret(&mut self, value: ValueId) {
        self.terminate(Terminator::Ret(value));
    }

    fn verify_function(&self, func: FuncId) -> Result<(), String> {
        verify::verify_function(&self.module, func)
    }

    fn optimize_function(&mut self, func: FuncId) {
        opt::optimize_function(&mut self.module.functions[func.0]);
    }
}
