use aisl_ast::{
    BinOp, Expr, ExprKind, Function, Import, Literal, Module, Param, TestCase, TestSpec, Type,
};
use aisl_bytecode::verify;
use aisl_compiler::{compile_program, CompileError};
use rustc_hash::FxHashMap;

fn var(name: &str) -> Expr {
    Expr::new(ExprKind::Var(name.to_string()))
}

fn int_lit(n: i64) -> Expr {
    Expr::typed(ExprKind::Literal(Literal::Int(n)), Type::Int)
}

fn factorial_module() -> Module {
    let n = || var("n");
    let body = Expr::new(ExprKind::Cond {
        cond: Box::new(Expr::new(ExprKind::Binary {
            op: BinOp::Le,
            lhs: Box::new(n()),
            rhs: Box::new(int_lit(1)),
        })),
        then_branch: Box::new(int_lit(1)),
        else_branch: Box::new(Expr::new(ExprKind::Binary {
            op: BinOp::Mul,
            lhs: Box::new(n()),
            rhs: Box::new(Expr::typed(
                ExprKind::Apply {
                    callee: "factorial".to_string(),
                    args: vec![Expr::new(ExprKind::Binary {
                        op: BinOp::Sub,
                        lhs: Box::new(n()),
                        rhs: Box::new(int_lit(1)),
                    })],
                },
                Type::Int,
            )),
        })),
    });

    let factorial = Function {
        name: "factorial".to_string(),
        params: vec![Param { name: "n".to_string(), ty: Type::Int }],
        return_type: Type::Int,
        body,
    };

    let main = Function {
        name: "main".to_string(),
        params: vec![],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Seq(vec![
            Expr::new(ExprKind::Apply {
                callee: "print".to_string(),
                args: vec![Expr::typed(
                    ExprKind::Apply { callee: "factorial".to_string(), args: vec![int_lit(5)] },
                    Type::Int,
                )],
            }),
            int_lit(0),
        ])),
    };

    Module {
        name: "main".to_string(),
        imports: vec![],
        definitions: vec![
            aisl_ast::Definition::Function(factorial),
            aisl_ast::Definition::Function(main),
        ],
    }
}

#[test]
fn recursive_factorial_compiles_to_a_verified_artifact() {
    let mut modules = FxHashMap::default();
    modules.insert("main".to_string(), factorial_module());
    let bc = compile_program("main", &modules).expect("compiles");
    verify(&bc).expect("well-formed artifact");
    assert!(bc.find_function("factorial").is_some());
    assert!(bc.find_function("main").is_some());
}

fn loop_with_break_module() -> Module {
    // while (true) { if (i >= 3) break; i = i + 1 }  -- modeled with a plain
    // Loop and a conditional break, returning i via a trailing Return.
    let body = Expr::new(ExprKind::Let {
        bindings: vec![aisl_ast::Binding { name: "i".to_string(), value: Box::new(int_lit(0)) }],
        body: Box::new(Expr::new(ExprKind::Seq(vec![
            Expr::new(ExprKind::Loop {
                body: Box::new(Expr::new(ExprKind::Cond {
                    cond: Box::new(Expr::new(ExprKind::Binary {
                        op: BinOp::Ge,
                        lhs: Box::new(var("i")),
                        rhs: Box::new(int_lit(3)),
                    })),
                    then_branch: Box::new(Expr::new(ExprKind::Break)),
                    else_branch: Box::new(Expr::new(ExprKind::Literal(Literal::Unit))),
                })),
            }),
            Expr::new(ExprKind::Return(Some(Box::new(var("i"))))),
        ]))),
    });

    let counter = Function {
        name: "count_to_three".to_string(),
        params: vec![],
        return_type: Type::Int,
        body,
    };

    let main = Function {
        name: "main".to_string(),
        params: vec![],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Seq(vec![
            Expr::new(ExprKind::Apply {
                callee: "print".to_string(),
                args: vec![Expr::typed(
                    ExprKind::Apply { callee: "count_to_three".to_string(), args: vec![] },
                    Type::Int,
                )],
            }),
            int_lit(0),
        ])),
    };

    Module {
        name: "main".to_string(),
        imports: vec![],
        definitions: vec![
            aisl_ast::Definition::Function(counter),
            aisl_ast::Definition::Function(main),
        ],
    }
}

#[test]
fn loop_with_break_compiles_to_a_verified_artifact() {
    let mut modules = FxHashMap::default();
    modules.insert("main".to_string(), loop_with_break_module());
    let bc = compile_program("main", &modules).expect("compiles");
    verify(&bc).expect("well-formed artifact");
}

fn while_with_set_module() -> Module {
    // while (i < 100) { if (i == 42) break; set_i(i + 1) }, returning i.
    let loop_body = Expr::new(ExprKind::Seq(vec![
        Expr::new(ExprKind::Cond {
            cond: Box::new(Expr::new(ExprKind::Binary {
                op: BinOp::Eq,
                lhs: Box::new(var("i")),
                rhs: Box::new(int_lit(42)),
            })),
            then_branch: Box::new(Expr::new(ExprKind::Break)),
            else_branch: Box::new(Expr::new(ExprKind::Literal(Literal::Unit))),
        }),
        Expr::new(ExprKind::Assign {
            name: "i".to_string(),
            value: Box::new(Expr::new(ExprKind::Binary {
                op: BinOp::Add,
                lhs: Box::new(var("i")),
                rhs: Box::new(int_lit(1)),
            })),
        }),
    ]));

    let body = Expr::new(ExprKind::Let {
        bindings: vec![aisl_ast::Binding { name: "i".to_string(), value: Box::new(int_lit(0)) }],
        body: Box::new(Expr::new(ExprKind::Seq(vec![
            Expr::new(ExprKind::While {
                cond: Box::new(Expr::new(ExprKind::Binary {
                    op: BinOp::Lt,
                    lhs: Box::new(var("i")),
                    rhs: Box::new(int_lit(100)),
                })),
                body: Box::new(loop_body),
            }),
            Expr::new(ExprKind::Return(Some(Box::new(var("i"))))),
        ]))),
    });

    let counter =
        Function { name: "count_with_set".to_string(), params: vec![], return_type: Type::Int, body };

    let main = Function {
        name: "main".to_string(),
        params: vec![],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Seq(vec![
            Expr::new(ExprKind::Apply {
                callee: "print".to_string(),
                args: vec![Expr::typed(
                    ExprKind::Apply { callee: "count_with_set".to_string(), args: vec![] },
                    Type::Int,
                )],
            }),
            int_lit(0),
        ])),
    };

    Module {
        name: "main".to_string(),
        imports: vec![],
        definitions: vec![
            aisl_ast::Definition::Function(counter),
            aisl_ast::Definition::Function(main),
        ],
    }
}

#[test]
fn set_name_reassignment_inside_a_loop_compiles_to_a_verified_artifact() {
    let mut modules = FxHashMap::default();
    modules.insert("main".to_string(), while_with_set_module());
    let bc = compile_program("main", &modules).expect("compiles");
    verify(&bc).expect("well-formed artifact");
}

#[test]
fn circular_import_between_two_modules_is_a_compile_error() {
    let mut modules = FxHashMap::default();
    modules.insert(
        "a".to_string(),
        Module {
            name: "a".to_string(),
            imports: vec![Import { module_name: "b".to_string() }],
            definitions: vec![],
        },
    );
    modules.insert(
        "b".to_string(),
        Module {
            name: "b".to_string(),
            imports: vec![Import { module_name: "a".to_string() }],
            definitions: vec![],
        },
    );
    let err = compile_program("a", &modules).unwrap_err();
    assert!(matches!(err, CompileError::Resolve(_)));
}

#[test]
fn module_with_test_specs_and_no_main_gets_a_synthetic_entry_point() {
    let add_one = Function {
        name: "add_one".to_string(),
        params: vec![Param { name: "x".to_string(), ty: Type::Int }],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Binary {
            op: BinOp::Add,
            lhs: Box::new(var("x")),
            rhs: Box::new(int_lit(1)),
        }),
    };
    let test_spec = TestSpec {
        target: "add_one".to_string(),
        cases: vec![TestCase {
            description: "adds one".to_string(),
            args: vec![Literal::Int(1)],
            expected: Literal::Int(2),
        }],
    };
    let module = Module {
        name: "main".to_string(),
        imports: vec![],
        definitions: vec![
            aisl_ast::Definition::Function(add_one),
            aisl_ast::Definition::TestSpec(test_spec),
        ],
    };
    let mut modules = FxHashMap::default();
    modules.insert("main".to_string(), module);
    let bc = compile_program("main", &modules).expect("synthesizes main");
    verify(&bc).expect("well-formed artifact");
    assert!(bc.find_function("main").is_some());
}

#[test]
fn calling_an_unknown_function_is_a_compile_error() {
    let main = Function {
        name: "main".to_string(),
        params: vec![],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Apply { callee: "does_not_exist".to_string(), args: vec![] }),
    };
    let module = Module {
        name: "main".to_string(),
        imports: vec![],
        definitions: vec![aisl_ast::Definition::Function(main)],
    };
    let mut modules = FxHashMap::default();
    modules.insert("main".to_string(), module);
    let err = compile_program("main", &modules).unwrap_err();
    assert_eq!(err, CompileError::UnknownFunction("does_not_exist".to_string()));
}
