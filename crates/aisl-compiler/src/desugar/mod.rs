//! Lowers `while`, infinite `loop`, `break`, and `continue` into a core
//! jump-based IR expressed as three pseudo-calls: `label(name)`,
//! `goto(name)`, and `ifnot(cond, name)`. `if` is already expression-form in
//! this AST (`Cond` always carries both branches) and is left untouched here
//! — it is lowered directly by the compiler's codegen pass instead.

pub mod control_flow;

use aisl_ast::{Binding, Expr, ExprKind, Literal};
use control_flow::{LoopContext, LoopStack};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DesugarError {
    #[error("break used outside of any loop")]
    BreakOutsideLoop,
    #[error("continue used outside of any loop")]
    ContinueOutsideLoop,
}

/// Pseudo-call names the compiler recognises in place of ordinary function
/// applications.
pub const LABEL_CALLEE: &str = "label";
pub const GOTO_CALLEE: &str = "goto";
pub const IFNOT_CALLEE: &str = "ifnot";

pub struct Desugarer {
    loop_stack: LoopStack,
    label_counter: u32,
}

impl Default for Desugarer {
    fn default() -> Self {
        Self::new()
    }
}

impl Desugarer {
    pub fn new() -> Self {
        Self { loop_stack: LoopStack::new(), label_counter: 0 }
    }

    fn fresh_label(&mut self) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("L{n}")
    }

    pub fn desugar(&mut self, expr: Expr) -> Result<Expr, DesugarError> {
        let ty = expr.ty.clone();
        let kind = match expr.kind {
            ExprKind::Literal(_) | ExprKind::Var(_) => expr.kind,

            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: Box::new(self.desugar(*lhs)?),
                rhs: Box::new(self.desugar(*rhs)?),
            },

            ExprKind::Cond { cond, then_branch, else_branch } => ExprKind::Cond {
                cond: Box::new(self.desugar(*cond)?),
                then_branch: Box::new(self.desugar(*then_branch)?),
                else_branch: Box::new(self.desugar(*else_branch)?),
            },

            ExprKind::Seq(exprs) => {
                let mut out = Vec::with_capacity(exprs.len());
                for e in exprs {
                    out.push(self.desugar(e)?);
                }
                ExprKind::Seq(out)
            }

            ExprKind::Let { bindings, body } => {
                let mut new_bindings = Vec::with_capacity(bindings.len());
                for b in bindings {
                    new_bindings.push(Binding { name: b.name, value: Box::new(self.desugar(*b.value)?) });
                }
                ExprKind::Let { bindings: new_bindings, body: Box::new(self.desugar(*body)?) }
            }

            ExprKind::Apply { callee, args } => {
                let mut new_args = Vec::with_capacity(args.len());
                for a in args {
                    new_args.push(self.desugar(a)?);
                }
                ExprKind::Apply { callee, args: new_args }
            }

            ExprKind::While { cond, body } => {
                let start = self.fresh_label();
                let end = self.fresh_label();
                let cond = self.desugar(*cond)?;
                self.loop_stack.push(LoopContext::new(start.clone(), end.clone()));
                let body = self.desugar(*body)?;
                self.loop_stack.pop();

                ExprKind::Seq(vec![
                    label_call(&start),
                    ifnot_call(cond, &end),
                    body,
                    goto_call(&start),
                    label_call(&end),
                    unit_lit(),
                ])
            }

            ExprKind::Loop { body } => {
                let start = self.fresh_label();
                let end = self.fresh_label();
                self.loop_stack.push(LoopContext::new(start.clone(), end.clone()));
                let body = self.desugar(*body)?;
                self.loop_stack.pop();

                ExprKind::Seq(vec![
                    label_call(&start),
                    body,
                    goto_call(&start),
                    label_call(&end),
                    unit_lit(),
                ])
            }

            ExprKind::Break => {
                let ctx = self.loop_stack.current().ok_or(DesugarError::BreakOutsideLoop)?;
                goto_call(&ctx.end_label).kind
            }

            ExprKind::Continue => {
                let ctx = self.loop_stack.current().ok_or(DesugarError::ContinueOutsideLoop)?;
                goto_call(&ctx.start_label).kind
            }

            ExprKind::Return(value) => {
                let value = match value {
                    Some(v) => Some(Box::new(self.desugar(*v)?)),
                    None => None,
                };
                ExprKind::Return(value)
            }

            ExprKind::Io { op, args } => {
                let mut new_args = Vec::with_capacity(args.len());
                for a in args {
                    new_args.push(self.desugar(a)?);
                }
                ExprKind::Io { op, args: new_args }
            }

            ExprKind::Assign { name, value } => {
                ExprKind::Assign { name, value: Box::new(self.desugar(*value)?) }
            }
        };
        Ok(Expr { kind, ty })
    }
}

fn string_lit(s: &str) -> Expr {
    Expr::new(ExprKind::Literal(Literal::String(s.to_string())))
}

fn unit_lit() -> Expr {
    Expr::new(ExprKind::Literal(Literal::Unit))
}

fn label_call(name: &str) -> Expr {
    Expr::new(ExprKind::Apply { callee: LABEL_CALLEE.into(), args: vec![string_lit(name)] })
}

fn goto_call(name: &str) -> Expr {
    Expr::new(ExprKind::Apply { callee: GOTO_CALLEE.into(), args: vec![string_lit(name)] })
}

fn ifnot_call(cond: Expr, name: &str) -> Expr {
    Expr::new(ExprKind::Apply { callee: IFNOT_CALLEE.into(), args: vec![cond, string_lit(name)] })
}

/// Whether an already-desugared expression is a control pseudo-call that
/// produces no stack value (`label`/`goto`/`ifnot`). Used by the sequence
/// lowering in codegen to decide whether a `POP` follows it.
pub fn is_control_pseudo_call(expr: &Expr) -> bool {
    matches!(
        &expr.kind,
        ExprKind::Apply { callee, .. }
            if callee == LABEL_CALLEE || callee == GOTO_CALLEE || callee == IFNOT_CALLEE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisl_ast::ExprKind;

    fn var(name: &str) -> Expr {
        Expr::new(ExprKind::Var(name.to_string()))
    }

    #[test]
    fn while_loop_desugars_to_label_ifnot_goto_label() {
        let mut d = Desugarer::new();
        let expr = Expr::new(ExprKind::While {
            cond: Box::new(var("cond")),
            body: Box::new(var("body")),
        });
        let desugared = d.desugar(expr).unwrap();
        match desugared.kind {
            ExprKind::Seq(items) => {
                assert_eq!(items.len(), 6);
                assert!(is_control_pseudo_call(&items[0]));
                assert!(is_control_pseudo_call(&items[1]));
                assert_eq!(items[2], var("body"));
                assert!(is_control_pseudo_call(&items[3]));
                assert!(is_control_pseudo_call(&items[4]));
            }
            other => panic!("expected Seq, got {other:?}"),
        }
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let mut d = Desugarer::new();
        assert_eq!(d.desugar(Expr::new(ExprKind::Break)), Err(DesugarError::BreakOutsideLoop));
    }

    #[test]
    fn continue_outside_loop_is_an_error() {
        let mut d = Desugarer::new();
        assert_eq!(
            d.desugar(Expr::new(ExprKind::Continue)),
            Err(DesugarError::ContinueOutsideLoop)
        );
    }

    #[test]
    fn break_inside_nested_loop_targets_innermost_end_label() {
        let mut d = Desugarer::new();
        let inner = Expr::new(ExprKind::Loop { body: Box::new(Expr::new(ExprKind::Break)) });
        let outer = Expr::new(ExprKind::Loop { body: Box::new(inner) });
        // Should not error; innermost loop's own end label absorbs the break.
        d.desugar(outer).unwrap();
    }

    #[test]
    fn label_names_are_unique_across_sibling_loops() {
        let mut d = Desugarer::new();
        let loop_a = Expr::new(ExprKind::Loop { body: Box::new(var("a")) });
        let loop_b = Expr::new(ExprKind::Loop { body: Box::new(var("b")) });
        let seq = Expr::new(ExprKind::Seq(vec![loop_a, loop_b]));
        let desugared = d.desugar(seq).unwrap();
        let ExprKind::Seq(items) = desugared.kind else { panic!() };
        let ExprKind::Seq(a_items) = &items[0].kind else { panic!() };
        let ExprKind::Seq(b_items) = &items[1].kind else { panic!() };
        assert_ne!(a_items[0], b_items[0]);
    }

    #[test]
    fn assign_recurses_into_its_value() {
        let mut d = Desugarer::new();
        let expr = Expr::new(ExprKind::Assign {
            name: "i".to_string(),
            value: Box::new(Expr::new(ExprKind::Loop { body: Box::new(var("b")) })),
        });
        let desugared = d.desugar(expr).unwrap();
        let ExprKind::Assign { name, value } = desugared.kind else { panic!("expected Assign") };
        assert_eq!(name, "i");
        assert!(matches!(value.kind, ExprKind::Seq(_)));
    }
}
