//! The compilation driver.
//!
//! Iterates top-level forms, lowering each one as it is parsed. A failed
//! form is reported and skipped; the session always continues to the next
//! form. After end of input the recorded top-level expression wrappers are
//! stitched into a synthesized `main`, and the finished module is released
//! to the caller.

use crate::ast::Item;
use crate::frontend::lexer;
use crate::frontend::parser::{OperatorTable, Parser};
use crate::ir::builder::{Builder, ModuleBuilder};
use crate::ir::ir_generator::Lowerer;
use crate::ir::symbol_table::PrototypeTable;
use crate::ir::{FuncId, Module, Type};
use crate::CompileError;

/// Everything a session produced: the module (possibly partial if forms
/// failed), per-form diagnostics, and non-fatal warnings.
pub struct CompileOutput {
    pub module: Module,
    pub diagnostics: Vec<CompileError>,
    pub warnings: Vec<String>,
}

/// Compile one unit of source text.
pub fn compile(source: &str) -> CompileOutput {
    let mut parser = Parser::new(lexer::lex(source));
    let mut ops = OperatorTable::new();
    let mut protos = PrototypeTable::new();
    let mut builder = ModuleBuilder::new(Module::new("kaleidoscope", "", ""));
    let mut diagnostics = Vec::new();
    let mut top_level: Vec<FuncId> = Vec::new();

    loop {
        match parser.parse_toplevel(&ops) {
            Ok(Item::Eof) => break,
            Ok(Item::Empty) => {}
            Ok(Item::Definition(def)) => {
                let mut lowerer = Lowerer::new(&mut builder, &mut protos, &mut ops);
                if let Err(error) = lowerer.lower_definition(&def) {
                    diagnostics.push(error);
                }
            }
            Ok(Item::Extern(proto)) => {
                let mut lowerer = Lowerer::new(&mut builder, &mut protos, &mut ops);
                lowerer.lower_extern(proto);
            }
            Ok(Item::TopLevel(def)) => {
                let mut lowerer = Lowerer::new(&mut builder, &mut protos, &mut ops);
                match lowerer.lower_definition(&def) {
                    Ok(func) => top_level.push(func),
                    Err(error) => diagnostics.push(error),
                }
            }
            Err(error) => {
                // Discard one token so the next round does not see the same
                // unexpected token again.
                diagnostics.push(error);
                parser.synchronize();
            }
        }
    }

    let mut warnings = Vec::new();
    if top_level.is_empty() {
        warnings.push(
            "no top-level expressions to execute, main function will not be generated"
                .to_string(),
        );
    } else {
        synthesize_main(&mut builder, &top_level, &mut diagnostics);
    }

    CompileOutput {
        module: builder.finalize(),
        diagnostics,
        warnings,
    }
}

/// `main` is `i32 ()`: it calls each top-level wrapper in insertion order,
/// discards the results, and returns 0.
fn synthesize_main(
    builder: &mut ModuleBuilder,
    top_level: &[FuncId],
    diagnostics: &mut Vec<CompileError>,
) {
    let main = builder.declare_function("main", &[], Type::I32);
    builder.enter_function(main);
    let entry = builder.append_block("entry");
    builder.position_at_end(entry);
    for &func in top_level {
        builder.call(func, Vec::new());
    }
    let zero = builder.const_i32(0);
    builder.ret(zero);

    if let Err(message) = builder.verify_function(main) {
        diagnostics.push(CompileError::Verify {
            function: "main".to_string(),
            message,
        });
    }
}
