use aisl_ast::{
    BinOp, Binding, Definition, Expr, ExprKind, Function, Import, Literal, Module, Param, Type,
};
use aisl_compiler::compile_program;
use aisl_vm::{Heap, HeapObject, Value, Vm};
use rustc_hash::FxHashMap;

fn var(name: &str) -> Expr {
    Expr::new(ExprKind::Var(name.to_string()))
}

fn int_lit(n: i64) -> Expr {
    Expr::typed(ExprKind::Literal(Literal::Int(n)), Type::Int)
}

fn string_lit(s: &str) -> Expr {
    Expr::typed(ExprKind::Literal(Literal::String(s.to_string())), Type::String)
}

fn apply(callee: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Apply { callee: callee.to_string(), args })
}

/// `if lhs == rhs { return 0 } else { return 1 }`, so a scenario's pass/fail
/// shows up directly as the process exit code instead of needing to capture
/// what the program printed.
fn exit_on_equality(lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Cond {
        cond: Box::new(Expr::new(ExprKind::Binary { op: BinOp::Eq, lhs: Box::new(lhs), rhs: Box::new(rhs) })),
        then_branch: Box::new(Expr::new(ExprKind::Return(Some(Box::new(int_lit(0)))))),
        else_branch: Box::new(Expr::new(ExprKind::Return(Some(Box::new(int_lit(1)))))),
    })
}

fn run_single_function_module(name: &str, call_result: Expr, expected: Expr, helper: Function) -> i32 {
    let main = Function {
        name: "main".to_string(),
        params: vec![],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Let {
            bindings: vec![Binding { name: "v".to_string(), value: Box::new(call_result) }],
            body: Box::new(exit_on_equality(var("v"), expected)),
        }),
    };
    let module = Module {
        name: name.to_string(),
        imports: vec![],
        definitions: vec![Definition::Function(helper), Definition::Function(main)],
    };
    let mut modules = FxHashMap::default();
    modules.insert(name.to_string(), module);
    let bc = compile_program(name, &modules).expect("compiles");
    Vm::new(bc).run().expect("runs to completion")
}

#[test]
fn recursive_factorial_of_ten_is_3628800() {
    let n = || var("n");
    let factorial = Function {
        name: "factorial".to_string(),
        params: vec![Param { name: "n".to_string(), ty: Type::Int }],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Cond {
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
        }),
    };
    let call = Expr::typed(apply("factorial", vec![int_lit(10)]), Type::Int);
    let exit = run_single_function_module("factorial_mod", call, int_lit(3628800), factorial);
    assert_eq!(exit, 0);
}

/// `while (i < 100) { if i == 42 { break }; set_i(i + 1) }`, returning `i`.
/// Exercises `set_<name>` reassignment reusing an already-bound slot across
/// loop iterations, driving the loop's own termination.
#[test]
fn while_loop_with_set_terminates_via_break_at_forty_two() {
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

    let counter = Function {
        name: "count_to_forty_two".to_string(),
        params: vec![],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Let {
            bindings: vec![Binding { name: "i".to_string(), value: Box::new(int_lit(0)) }],
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
        }),
    };
    let call = Expr::typed(apply("count_to_forty_two", vec![]), Type::Int);
    let exit = run_single_function_module("loop_mod", call, int_lit(42), counter);
    assert_eq!(exit, 0);
}

/// `let m = map_new() in (set(m, "a", 7); get(m, "a"))`.
#[test]
fn a_map_literal_round_trips_through_set_and_get() {
    let roundtrip = Function {
        name: "map_roundtrip".to_string(),
        params: vec![],
        return_type: Type::Int,
        body: Expr::new(ExprKind::Let {
            bindings: vec![Binding {
                name: "m".to_string(),
                value: Box::new(Expr::typed(apply("map_new", vec![]), Type::Map(Box::new(Type::Int)))),
            }],
            body: Box::new(Expr::new(ExprKind::Seq(vec![
                apply("set", vec![var("m"), string_lit("a"), int_lit(7)]),
                Expr::typed(apply("get", vec![var("m"), string_lit("a")]), Type::Int),
            ]))),
        }),
    };
    let call = Expr::typed(apply("map_roundtrip", vec![]), Type::Int);
    let exit = run_single_function_module("map_mod", call, int_lit(7), roundtrip);
    assert_eq!(exit, 0);
}

#[test]
fn circular_import_between_two_modules_fails_to_compile() {
    let mut modules = FxHashMap::default();
    modules.insert(
        "a".to_string(),
        Module { name: "a".to_string(), imports: vec![Import { module_name: "b".to_string() }], definitions: vec![] },
    );
    modules.insert(
        "b".to_string(),
        Module { name: "b".to_string(), imports: vec![Import { module_name: "a".to_string() }], definitions: vec![] },
    );
    assert!(compile_program("a", &modules).is_err());
}

/// Allocating 10,000 unreachable objects and collecting should free all of
/// them, strictly decreasing `bytes_allocated`.
#[test]
fn collecting_ten_thousand_unreachable_allocations_frees_them() {
    let mut heap = Heap::new();
    for i in 0..10_000 {
        heap.allocate(HeapObject::Array(vec![Value::string(format!("item-{i}"))]), &[]);
    }
    let before = heap.stats().bytes_allocated;
    heap.collect(&[]);
    let after = heap.stats().bytes_allocated;
    assert!(before > 0);
    assert!(after < before);
    assert_eq!(after, 0);
}
