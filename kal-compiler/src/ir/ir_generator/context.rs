use crate::ast::Prototype;
use crate::frontend::parser::OperatorTable;
use crate::ir::builder::Builder;
use crate::ir::symbol_table::{PrototypeTable, SymbolTable};
use crate::ir::{FuncId, Type};
use crate::{CompileError, SemanticErrorKind, SourceLocation};

/// Lowering context for one compilation session.
///
/// Owns nothing global: the builder, the prototype table, and the operator
/// table are borrowed from the driver so that the parser sees operator
/// installations made here, and so that prototypes survive across top-level
/// forms. The symbol table is per function body and lives here.
pub struct Lowerer<'a, B: Builder> {
    pub builder: &'a mut B,
    pub protos: &'a mut PrototypeTable,
    pub ops: &'a mut OperatorTable,
    pub symbols: SymbolTable,
}

impl<'a, B: Builder> Lowerer<'a, B> {
    pub fn new(
        builder: &'a mut B,
        protos: &'a mut PrototypeTable,
        ops: &'a mut OperatorTable,
    ) -> Self {
        Lowerer {
            builder,
            protos,
            ops,
            symbols: SymbolTable::new(),
        }
    }

    pub(super) fn error(
        &self,
        kind: SemanticErrorKind,
        location: SourceLocation,
        message: impl Into<String>,
    ) -> CompileError {
        CompileError::Semantic {
            kind,
            location,
            message: message.into(),
        }
    }

    /// Declare a prototype in the module, reusing an existing function of the
    /// same name if there is one.
    pub fn lower_prototype(&mut self, proto: &Prototype) -> FuncId {
        self.builder
            .declare_function(&proto.name, &proto.params, Type::F64)
    }

    /// `extern` both records the prototype and declares it immediately, so a
    /// dump of the module shows the declaration even if nothing calls it.
    pub fn lower_extern(&mut self, proto: Prototype) -> FuncId {
        self.protos.put(proto.name.clone(), proto.clone());
        self.lower_prototype(&proto)
    }

    /// Resolve a function by name: prefer whatever the module already has,
    /// fall back to declaring from the recorded prototype. The fallback is
    /// what makes forward references and post-rollback recovery work.
    pub fn get_function(&mut self, name: &str) -> Option<FuncId> {
        if let Some(func) = self.builder.find_function(name) {
            return Some(func);
        }
        if let Some(proto) = self.protos.get(name).cloned() {
            return Some(self.lower_prototype(&proto));
        }
        None
    }
}
