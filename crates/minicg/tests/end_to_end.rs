//! Whole-pipeline tests: AST in, assembly out, executed by the harness
//! interpreter.

use minicg::ast::{BinaryOp, Node, Type, TypeKind};
use minicg::test_harness::*;
use minicg::{CompileOptions, Error, Scoping, TranslationUnit, compile, compile_with_options};

fn block_scoped() -> CompileOptions {
    CompileOptions {
        scoping: Scoping::Block,
        ..CompileOptions::default()
    }
}

fn run_with(unit: &TranslationUnit, options: &CompileOptions) -> minicg::Result<i64> {
    run(&minicg::lower(unit, options)?)
}

// ── Scenarios ──

/// `function f() { declare a = 2; return a; }`
#[test]
fn test_declared_local_is_returned() {
    let unit = function("f", vec![decl("a", int(2)), ret(var("a"))]);
    let asm = compile(&unit).expect("compile");
    let expected = "\
.text
.globl f
f:
    pushq %rbp
    movq %rsp, %rbp
    subq $16, %rsp
    movq $2, -8(%rbp)
    movq -8(%rbp), %rdi
    movq %rdi, %rax
    jmp .Lf_end
.Lf_end:
    addq $16, %rsp
    popq %rbp
    ret
";
    assert_eq!(asm, expected);
    assert_eq!(compile_and_run(&unit).expect("run"), 2);
}

/// `function f() { return 2 + 3 * 4; }`
#[test]
fn test_nested_arithmetic() {
    let unit = function("f", vec![ret(add(int(2), mul(int(3), int(4))))]);
    let asm = lower_default(&unit).expect("compile");
    assert_eq!(run(&asm).expect("run"), 14);

    // The product is computed first, into the first cache register.
    assert_has_pattern(
        &extract_instructions(&asm),
        &[
            InstructionPattern::Mov {
                src: Pat::Exact(Operand::Imm(3)),
                dst: Pat::Exact(Operand::Reg(Reg::Rdi)),
            },
            InstructionPattern::Imul {
                src: Pat::Exact(Operand::Imm(4)),
                dst: Pat::Exact(Operand::Reg(Reg::Rdi)),
            },
            InstructionPattern::Mov {
                src: Pat::Exact(Operand::Imm(2)),
                dst: Pat::Exact(Operand::Reg(Reg::Rsi)),
            },
            InstructionPattern::Add {
                src: Pat::Exact(Operand::Reg(Reg::Rdi)),
                dst: Pat::Exact(Operand::Reg(Reg::Rsi)),
            },
        ],
    );
}

/// More live temporaries than cache registers: the result must still be right
/// and the listing must contain at least one spill and one reload.
#[test]
fn test_chain_wider_than_register_file() {
    let unit = function("f", vec![decl("x", int(3)), ret(right_nested_var_sum("x", 8))]);
    let asm = lower_default(&unit).expect("compile");
    assert_eq!(run(&asm).expect("run"), 24);
    assert!(asm.count_notes(Note::Spill) >= 1, "{asm}");
    assert!(asm.count_notes(Note::Reload) >= 1, "{asm}");
}

#[test]
fn test_long_immediate_chain() {
    let unit = function("f", vec![ret(right_nested_sum(12))]);
    assert_eq!(compile_and_run(&unit).expect("run"), 78);
}

#[test]
fn test_mixed_chain_with_products() {
    // x*1 + (x*2 + (... + x*9))
    let body = (1..=9)
        .rev()
        .map(|k| mul(var("x"), int(k)))
        .reduce(|acc, term| add(term, acc))
        .expect("non-empty");
    let unit = function("f", vec![decl("x", int(5)), ret(body)]);
    assert_eq!(compile_and_run(&unit).expect("run"), 5 * 45);
}

#[test]
fn test_several_locals() {
    let unit = function(
        "f",
        vec![
            decl("a", int(7)),
            decl("b", int(-3)),
            decl("c", mul(var("a"), var("b"))),
            ret(add(var("c"), mul(var("a"), var("a")))),
        ],
    );
    assert_eq!(compile_and_run(&unit).expect("run"), -21 + 49);
}

#[test]
fn test_conversion_is_transparent() {
    let unit = function(
        "f",
        vec![
            Node::decl("n", Type::long(), Some(int(40))),
            ret(add(Node::conv(Type::int(), var("n")), int(2))),
        ],
    );
    assert_eq!(compile_and_run(&unit).expect("run"), 42);
}

#[test]
fn test_arithmetic_wraps_at_64_bits() {
    let big = i64::from(i32::MAX);
    // (MAX * MAX) * (MAX * MAX) overflows i64.
    let square = || mul(int(big), int(big));
    let unit = function("f", vec![ret(mul(square(), square()))]);
    let expected = (big * big).wrapping_mul(big * big);
    assert_eq!(compile_and_run(&unit).expect("run"), expected);
}

#[test]
fn test_recompilation_is_identical() {
    let unit = function("f", vec![decl("x", int(3)), ret(right_nested_var_sum("x", 10))]);
    let first = compile(&unit).expect("first");
    let second = compile(&unit).expect("second");
    assert_eq!(first, second);
}

#[test]
fn test_function_name_drives_labels() {
    let unit = function("compute", vec![ret(int(1))]);
    let asm = compile(&unit).expect("compile");
    assert!(asm.contains(".globl compute\ncompute:\n"), "{asm}");
    assert!(asm.contains("jmp .Lcompute_end\n.Lcompute_end:\n"), "{asm}");
}

fn long(value: i64) -> Node {
    Node::Literal {
        ty: Type::long(),
        value,
    }
}

#[test]
fn test_wide_immediate_operand() {
    let big = 1_i64 << 40;
    let unit = function("f", vec![ret(add(int(1), long(big)))]);
    let asm = lower_default(&unit).expect("compile");
    assert_has_pattern(
        &extract_instructions(&asm),
        &[
            InstructionPattern::Mov {
                src: Pat::Exact(Operand::Imm(big)),
                dst: Pat::Exact(Operand::Reg(Reg::Rax)),
            },
            InstructionPattern::Add {
                src: Pat::Exact(Operand::Reg(Reg::Rax)),
                dst: Pat::Exact(Operand::Reg(Reg::Rdi)),
            },
        ],
    );
    assert_eq!(run(&asm).expect("run"), big + 1);
}

#[test]
fn test_wide_immediate_store() {
    let big = 1_i64 << 40;
    let unit = function(
        "f",
        vec![
            Node::decl("x", Type::long(), Some(long(big))),
            ret(mul(var("x"), int(3))),
        ],
    );
    let text = compile(&unit).expect("compile");
    assert!(
        text.contains("    movq $1099511627776, %rax\n    movq %rax, -8(%rbp)\n"),
        "{text}"
    );
    assert_eq!(compile_and_run(&unit).expect("run"), 3 * big);
}

#[test]
fn test_immediates_at_the_i32_boundary() {
    let min = i64::from(i32::MIN);
    let over = i64::from(i32::MAX) + 1;
    let unit = function("f", vec![ret(mul(long(-1), add(long(min), long(over))))]);
    let instructions = extract_instructions(&lower_default(&unit).expect("compile"));
    // i32::MIN still encodes inline; one past i32::MAX needs the scratch register.
    assert_has_pattern(
        &instructions,
        &[
            InstructionPattern::Mov {
                src: Pat::Exact(Operand::Imm(min)),
                dst: Pat::Exact(Operand::Reg(Reg::Rdi)),
            },
            InstructionPattern::Mov {
                src: Pat::Exact(Operand::Imm(over)),
                dst: Pat::Exact(Operand::Reg(Reg::Rax)),
            },
            InstructionPattern::Add {
                src: Pat::Exact(Operand::Reg(Reg::Rax)),
                dst: Pat::Exact(Operand::Reg(Reg::Rdi)),
            },
        ],
    );
    assert_eq!(compile_and_run(&unit).expect("run"), -(min + over));
}

#[test]
fn test_wide_immediates_wrap() {
    let a = i64::MAX - 7;
    let b = i64::MIN + 3;
    let unit = function("f", vec![ret(mul(long(a), long(b)))]);
    assert_eq!(compile_and_run(&unit).expect("run"), a.wrapping_mul(b));
}

// ── Scoping ──

#[test]
fn test_inner_declaration_shadows_outer() {
    let unit = function(
        "f",
        vec![
            decl("x", int(1)),
            block(vec![decl("x", int(5)), ret(mul(var("x"), int(2)))]),
        ],
    );
    assert_eq!(run_with(&unit, &block_scoped()).expect("run"), 10);
}

#[test]
fn test_shadowing_ends_with_block() {
    let unit = function(
        "f",
        vec![
            decl("x", int(1)),
            block(vec![decl("x", int(5))]),
            ret(var("x")),
        ],
    );
    assert_eq!(run_with(&unit, &block_scoped()).expect("block"), 1);
    // Flat scoping rebinds the name for the rest of the function.
    assert_eq!(compile_and_run(&unit).expect("flat"), 5);
}

#[test]
fn test_sibling_block_declaration_does_not_leak() {
    let unit = function("f", vec![block(vec![decl("y", int(3))]), ret(var("y"))]);
    let err = run_with(&unit, &block_scoped()).unwrap_err();
    assert!(matches!(err, Error::UnboundVariable(ref name) if name == "y"), "{err:?}");
    assert_eq!(compile_and_run(&unit).expect("flat"), 3);
}

#[test]
fn test_outer_names_visible_in_nested_blocks() {
    let unit = function(
        "f",
        vec![
            decl("a", int(4)),
            block(vec![block(vec![decl("b", int(6)), ret(add(var("a"), var("b")))])]),
        ],
    );
    assert_eq!(run_with(&unit, &block_scoped()).expect("run"), 10);
}

// ── Annotation ──

#[test]
fn test_annotation_can_be_disabled() {
    let unit = function("f", vec![decl("x", int(2)), ret(right_nested_var_sum("x", 9))]);
    let annotated = compile(&unit).expect("annotated");
    let plain = compile_with_options(
        &unit,
        &CompileOptions {
            annotate: false,
            ..CompileOptions::default()
        },
    )
    .expect("plain");

    assert!(annotated.contains("  # spill\n"), "{annotated}");
    assert!(annotated.contains("  # reload\n"), "{annotated}");
    assert!(!plain.contains('#'), "{plain}");

    let stripped: String = annotated
        .lines()
        .map(|line| line.split("  #").next().unwrap_or(line))
        .flat_map(|line| [line, "\n"])
        .collect();
    assert_eq!(stripped, plain);
}

// ── JSON input ──

#[test]
fn test_json_translation_unit() {
    let json = r#"{
        "toplevels": [{
            "kind": "func_def",
            "name": "f",
            "body": {
                "kind": "compound",
                "stmts": [
                    {
                        "kind": "decl",
                        "name": "a",
                        "ty": { "kind": "int", "size": 4 },
                        "init": { "kind": "literal", "ty": { "kind": "int", "size": 4 }, "value": 6 }
                    },
                    {
                        "kind": "return",
                        "value": {
                            "kind": "binary",
                            "op": "mul",
                            "left": { "kind": "local_var", "name": "a" },
                            "right": { "kind": "literal", "ty": { "kind": "int", "size": 4 }, "value": 7 }
                        }
                    }
                ]
            }
        }]
    }"#;
    let unit: TranslationUnit = serde_json::from_str(json).expect("parse");
    assert_eq!(
        unit,
        function("f", vec![decl("a", int(6)), ret(mul(var("a"), int(7)))])
    );
    assert_eq!(compile_and_run(&unit).expect("run"), 42);
}

#[test]
fn test_json_decl_without_initializer() {
    let json = r#"{ "kind": "decl", "name": "p", "ty": { "kind": "ptr", "size": 8 } }"#;
    let node: Node = serde_json::from_str(json).expect("parse");
    assert_eq!(node, Node::decl("p", Type::new(TypeKind::Ptr, 8), None));
}

// ── Rejected input ──

#[test]
fn test_unsupported_operator() {
    let unit = function(
        "f",
        vec![ret(Node::binary(BinaryOp::Sub, int(3), int(1)))],
    );
    let err = compile(&unit).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)), "{err:?}");
    assert!(err.to_string().contains("(- 3 1)"), "{err}");
}

#[test]
fn test_unsupported_statements() {
    let call = Node::FuncCall {
        name: "g".into(),
        args: vec![int(1)],
    };
    let branch = Node::If {
        cond: Box::new(int(1)),
        then: Box::new(ret(int(1))),
        els: None,
    };
    for stmt in [call, branch] {
        let err = compile(&function("f", vec![stmt])).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)), "{err:?}");
    }
}

#[test]
fn test_unbound_variable() {
    let unit = function("f", vec![ret(var("missing"))]);
    let err = compile(&unit).unwrap_err();
    assert!(matches!(err, Error::UnboundVariable(ref name) if name == "missing"));
}

#[test]
fn test_oversized_declaration_rejected() {
    let huge = Type::new(TypeKind::Array, 0x8000_0000);
    let unit = function("f", vec![Node::decl("s", huge, None), ret(int(1))]);
    let err = compile(&unit).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)), "{err:?}");
    assert!(err.to_string().contains("frame too large"), "{err}");

    let max = Type::new(TypeKind::Array, u32::MAX);
    let unit = function("f", vec![decl("a", int(1)), Node::decl("s", max, None), ret(int(1))]);
    assert!(matches!(compile(&unit), Err(Error::Unsupported(_))));
}

#[test]
fn test_homes_beyond_frame_limit_rejected() {
    // Locals fill the frame exactly; the load's home slot does not fit.
    let filler = Type::new(TypeKind::Array, 0x7fff_ffe8);
    let unit = function(
        "f",
        vec![Node::decl("s", filler, None), decl("a", int(1)), ret(var("a"))],
    );
    assert!(minicg::build_ir(&unit, &CompileOptions::default()).is_ok());
    let err = compile(&unit).unwrap_err();
    assert!(err.to_string().contains("frame too large"), "{err}");
}

#[test]
fn test_multiple_functions_rejected() {
    let f = Node::func("f", block(vec![ret(int(1))]));
    let g = Node::func("g", block(vec![ret(int(2))]));
    let err = compile(&TranslationUnit::new(vec![f, g])).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)), "{err:?}");
}
