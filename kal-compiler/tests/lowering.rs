use kal_compiler::ir::{FunctionData, Inst, Module, Terminator, ValueDef};
use kal_compiler::{compile, compile_to_module, SemanticErrorKind};

fn function<'m>(module: &'m Module, name: &str) -> &'m FunctionData {
    let id = module
        .get_function(name)
        .unwrap_or_else(|| panic!("function '{name}' should exist"));
    module.function(id)
}

// ── φ construction ───────────────────────────────────────────────────────

#[test]
fn if_merge_phi_has_exactly_two_predecessors() {
    let module = compile_to_module("def pick(a b) if a then b else 0;").unwrap();
    let func = function(&module, "pick");

    let phi = func
        .values
        .iter()
        .find_map(|def| match def {
            ValueDef::Inst(Inst::Phi { incoming }) => Some(incoming),
            _ => None,
        })
        .expect("merge should hold a phi");
    assert_eq!(phi.len(), 2);
}

#[test]
fn nested_arms_route_the_phi_through_their_final_block() {
    let module =
        compile_to_module("def pick(a b) if a then (if b then 1 else 2) else 3;").unwrap();
    let func = function(&module, "pick");

    let merge = func
        .blocks
        .iter()
        .position(|b| b.name == "merge")
        .expect("outer merge block");
    let phi = func.blocks[merge]
        .insts
        .iter()
        .find_map(|id| match &func.values[id.0] {
            ValueDef::Inst(Inst::Phi { incoming }) => Some(incoming),
            _ => None,
        })
        .expect("outer merge should hold a phi");

    assert_eq!(phi.len(), 2);
    let mut sources: Vec<&str> = phi
        .iter()
        .map(|(_, block)| func.blocks[block.0].name.as_str())
        .collect();
    sources.sort();
    // The then-arm is itself an if, so its edge comes from the inner merge
    // block, not from the syntactic then block.
    assert_eq!(sources, vec!["else", "merge1"]);
}

// ── for semantics ────────────────────────────────────────────────────────

#[test]
fn for_expression_yields_zero() {
    let module = compile_to_module("extern printd(x); for i = 1, i < 4 in printd(i);").unwrap();
    let func = function(&module, "__anon_expr0");

    let after = func
        .blocks
        .iter()
        .find(|b| b.name == "afterloop")
        .expect("afterloop block");
    let ret = match &after.term {
        Some(Terminator::Ret(value)) => *value,
        other => panic!("afterloop should return, got {other:?}"),
    };
    assert_eq!(func.values[ret.0], ValueDef::Inst(Inst::ConstF64(0.0)));
}

#[test]
fn for_loop_shadows_and_restores_the_loop_variable() {
    // The loop variable i shadows the parameter; after the loop the body can
    // still read the parameter's slot.
    let source = "def f(i) (for i = 0, i < 3 in 1) + i;";
    let output = compile(source);
    assert!(
        output.diagnostics.is_empty(),
        "shadowing loop variable should compile: {:?}",
        output.diagnostics
    );
    let func = function(&output.module, "f");
    let slots = func
        .values
        .iter()
        .filter(|def| matches!(def, ValueDef::Inst(Inst::Slot { name }) if name == "i"))
        .count();
    assert_eq!(slots, 2, "parameter slot and loop slot are distinct");
}

// ── Prototype replacement ────────────────────────────────────────────────

#[test]
fn later_extern_wins_for_subsequent_calls() {
    let output = compile("extern f(a); extern f(a b); f(1, 2);");
    assert!(
        output.diagnostics.is_empty(),
        "call should use the two-parameter prototype: {:?}",
        output.diagnostics
    );

    let func = function(&output.module, "f");
    assert_eq!(func.params, vec!["a", "b"]);
}

#[test]
fn stale_arity_calls_are_rejected() {
    let result = compile_to_module("extern g(a); extern g(a b); g(1);");
    match result {
        Err(kal_compiler::CompileError::Semantic { kind, .. }) => {
            assert_eq!(kind, SemanticErrorKind::ArgCountMismatch)
        }
        other => panic!("expected arity error, got {other:?}"),
    }
}

// ── Operator installation and rollback ───────────────────────────────────

#[test]
fn failed_operator_definition_rolls_the_table_back() {
    // The body references an unknown name, so the definition fails; '@' must
    // not survive as a binary operator, which makes the later '@' lex as a
    // unary operator use instead.
    let output = compile("def binary@ 7 (a b) nope; 1 @ 2;");

    assert_eq!(output.diagnostics.len(), 2, "{:?}", output.diagnostics);
    match &output.diagnostics[0] {
        kal_compiler::CompileError::Semantic { kind, .. } => {
            assert_eq!(*kind, SemanticErrorKind::UnknownName)
        }
        other => panic!("expected the body failure first, got {other:?}"),
    }
    match &output.diagnostics[1] {
        kal_compiler::CompileError::Semantic { kind, message, .. } => {
            assert_eq!(*kind, SemanticErrorKind::UnknownOperator);
            assert!(message.contains("unary"), "message: {message}");
        }
        other => panic!("expected a unary-operator failure, got {other:?}"),
    }
}

#[test]
fn successful_operator_definition_persists() {
    let output = compile("def binary@ 7 (a b) a + b; 1 @ 2;");
    assert!(
        output.diagnostics.is_empty(),
        "operator should be usable: {:?}",
        output.diagnostics
    );
    let ir = output.module.to_lines().join("\n");
    assert!(ir.contains("call @binary@"), "got:\n{ir}");
}

#[test]
fn failed_definition_erases_its_function() {
    let output = compile("def broken(x) nope;");
    assert_eq!(output.diagnostics.len(), 1);
    assert!(
        output.module.get_function("broken").is_none(),
        "failed definitions leave no function behind"
    );
}

// ── Slots and assignment ─────────────────────────────────────────────────

#[test]
fn assignment_returns_the_stored_value() {
    let module = compile_to_module("def set(x) x = 42;").unwrap();
    let func = function(&module, "set");

    let entry = &func.blocks[0];
    let ret = match &entry.term {
        Some(Terminator::Ret(value)) => *value,
        other => panic!("expected a return, got {other:?}"),
    };
    assert_eq!(
        func.values[ret.0],
        ValueDef::Inst(Inst::ConstF64(42.0)),
        "the assignment expression yields the stored value"
    );
}

#[test]
fn slots_stay_in_the_entry_block() {
    let module =
        compile_to_module("def f(n) if n then (var t = 1 in t) else 0;").unwrap();
    let func = function(&module, "f");

    for (i, block) in func.blocks.iter().enumerate() {
        for id in &block.insts {
            if matches!(func.values[id.0], ValueDef::Inst(Inst::Slot { .. })) {
                assert_eq!(i, 0, "slot found outside the entry block");
            }
        }
    }
}

// ── Optimization pipeline ────────────────────────────────────────────────

#[test]
fn constant_expressions_fold() {
    let module = compile_to_module("def k() 2 * 3 + 4;").unwrap();
    let func = function(&module, "k");

    let ret = match &func.blocks[0].term {
        Some(Terminator::Ret(value)) => *value,
        other => panic!("expected a return, got {other:?}"),
    };
    assert_eq!(func.values[ret.0], ValueDef::Inst(Inst::ConstF64(10.0)));
}

#[test]
fn duplicate_constants_collapse() {
    let module = compile_to_module("def g(x) x + 1 + 1;").unwrap();
    let func = function(&module, "g");

    let ones = func
        .values
        .iter()
        .filter(|def| matches!(def, ValueDef::Inst(Inst::ConstF64(v)) if *v == 1.0))
        .count();
    assert_eq!(ones, 1, "the literal 1 should be materialized once");
}

#[test]
fn loads_of_a_mutable_slot_are_not_merged() {
    // (x + x) keeps two loads: a store may sit between reads in general, so
    // value numbering must not treat loads as pure.
    let module = compile_to_module("def g(x) x + x;").unwrap();
    let func = function(&module, "g");

    let loads = func
        .values
        .iter()
        .filter(|def| matches!(def, ValueDef::Inst(Inst::Load { .. })))
        .count();
    assert_eq!(loads, 2);
}
