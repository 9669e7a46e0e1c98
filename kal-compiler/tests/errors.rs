use kal_compiler::{compile, compile_to_module, CompileError, SemanticErrorKind};

// ── Semantic error detection ─────────────────────────────────────────────
// Each test verifies that an invalid program produces the correct error kind.

#[test]
fn unknown_variable() {
    let result = compile_to_module("def f(x) y;");
    assert_semantic_error(result, SemanticErrorKind::UnknownName);
}

#[test]
fn unknown_function() {
    let result = compile_to_module("foo(1);");
    assert_semantic_error(result, SemanticErrorKind::UnknownName);
}

#[test]
fn unknown_unary_operator() {
    let result = compile_to_module("def f(x) !x;");
    assert_semantic_error(result, SemanticErrorKind::UnknownOperator);
}

#[test]
fn unknown_binary_operator() {
    // '>' is seeded in the precedence table but has no built-in lowering, so
    // it needs a user definition.
    let result = compile_to_module("1 > 2;");
    assert_semantic_error(result, SemanticErrorKind::UnknownOperator);
}

#[test]
fn assignment_requires_a_variable_destination() {
    let result = compile_to_module("def f(x) (x + 1) = 2;");
    assert_semantic_error(result, SemanticErrorKind::InvalidAssignTarget);
}

#[test]
fn assignment_to_an_unbound_name() {
    let result = compile_to_module("def f(x) y = 1;");
    assert_semantic_error(result, SemanticErrorKind::UnknownName);
}

#[test]
fn argument_count_mismatch() {
    let result = compile_to_module("def add(a b) a + b; add(1);");
    assert_semantic_error(result, SemanticErrorKind::ArgCountMismatch);
}

#[test]
fn too_many_arguments() {
    let result = compile_to_module("def add(a b) a + b; add(1, 2, 3);");
    assert_semantic_error(result, SemanticErrorKind::ArgCountMismatch);
}

#[test]
fn function_redefinition() {
    let result = compile_to_module("def f(x) x; def f(x) x + 1;");
    assert_semantic_error(result, SemanticErrorKind::Redefinition);
}

#[test]
fn duplicate_parameter_names() {
    let result = compile_to_module("def f(a a) a;");
    assert_semantic_error(result, SemanticErrorKind::ParameterRedefinition);
}

// ── Parse errors and recovery ────────────────────────────────────────────

#[test]
fn missing_paren_in_prototype() {
    let err = compile_to_module("def foo(x 1").unwrap_err();
    match err {
        CompileError::Parse { message, .. } => {
            assert!(message.contains("')'"), "message: {message}")
        }
        other => panic!("expected parse error, got: {other:?}"),
    }
}

#[test]
fn failed_form_does_not_poison_the_rest() {
    let output = compile("extern printd(x); def 1; printd(7);");
    assert_eq!(output.diagnostics.len(), 1);
    assert!(matches!(output.diagnostics[0], CompileError::Parse { .. }));
    let ir = output.module.to_lines().join("\n");
    assert!(ir.contains("call @printd"), "later forms still compile:\n{ir}");
}

// ── Error location accuracy ──────────────────────────────────────────────

#[test]
fn error_location_single_line() {
    let result = compile_to_module("x;");
    match result {
        Err(CompileError::Semantic { location, .. }) => {
            assert_eq!(location.line, 1, "error should be on line 1");
            assert_eq!(location.column, 1, "error should point at 'x'");
        }
        other => panic!("expected semantic error, got: {other:?}"),
    }
}

#[test]
fn error_location_multiline() {
    let result = compile_to_module("1;\n2;\nnot_a_func(1, 2);\n");
    match result {
        Err(CompileError::Semantic { location, .. }) => {
            assert_eq!(location.line, 3, "error should be on line 3");
            assert!(location.column >= 1, "column should be set");
        }
        other => panic!("expected semantic error, got: {other:?}"),
    }
}

// ── Helper ───────────────────────────────────────────────────────────────

fn assert_semantic_error(
    result: Result<kal_compiler::ir::Module, CompileError>,
    expected: SemanticErrorKind,
) {
    match result {
        Ok(_) => panic!("expected {expected:?} error, but compilation succeeded"),
        Err(CompileError::Semantic { kind, .. }) => assert_eq!(kind, expected),
        Err(other) => panic!("expected {expected:?} semantic error, got: {other:?}"),
    }
}
