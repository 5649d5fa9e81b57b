//! Type-directed dispatch for the polymorphic short names: a call site names
//! a short operator (`add`, `eq`, `len`, ...) and the compiler rewrites it to
//! the typed opcode selected by the first argument's static type.

use aisl_ast::Type;
use aisl_bytecode::Opcode;

/// Every polymorphic short name recognised at a call site.
pub const SHORT_NAMES: &[&str] = &[
    "add", "sub", "mul", "div", "mod", "neg", "eq", "ne", "lt", "gt", "le", "ge", "abs", "min",
    "max", "sqrt", "pow", "print", "len", "push", "get", "set", "concat", "slice", "from_i64",
    "from_f64", "from_bool",
];

pub fn is_short_name(name: &str) -> bool {
    SHORT_NAMES.contains(&name)
}

/// Resolve a short name against the dispatch type derived for its first
/// argument, per the tie-breaking rules: explicit annotation wins; else
/// literal kind; else `int`.
pub fn resolve(short_name: &str, dispatch_ty: &Type) -> Option<Opcode> {
    let suffix = dispatch_ty.dispatch_suffix();
    use Opcode::*;
    Some(match (short_name, suffix) {
        ("add", "i64") => AddI64,
        ("add", "f64") => AddF64,
        ("add", "decimal") => AddDecimal,
        ("sub", "i64") => SubI64,
        ("sub", "f64") => SubF64,
        ("sub", "decimal") => SubDecimal,
        ("mul", "i64") => MulI64,
        ("mul", "f64") => MulF64,
        ("mul", "decimal") => MulDecimal,
        ("div", "i64") => DivI64,
        ("div", "f64") => DivF64,
        ("div", "decimal") => DivDecimal,
        ("mod", "i64") => ModI64,
        ("mod", "f64") => ModF64,
        ("mod", "decimal") => ModDecimal,
        ("neg", "i64") => NegI64,
        ("neg", "f64") => NegF64,
        ("neg", "decimal") => NegDecimal,
        ("abs", "i64") => AbsI64,
        ("abs", "f64") => AbsF64,
        ("abs", "decimal") => AbsDecimal,
        ("min", "i64") => MinI64,
        ("min", "f64") => MinF64,
        ("min", "decimal") => MinDecimal,
        ("max", "i64") => MaxI64,
        ("max", "f64") => MaxF64,
        ("max", "decimal") => MaxDecimal,
        ("sqrt", "f64") => SqrtF64,
        ("pow", "i64") => PowI64,
        ("pow", "f64") => PowF64,

        ("eq", "i64") => EqI64,
        ("eq", "f64") => EqF64,
        ("eq", "decimal") => EqDecimal,
        ("eq", "bool") => EqBool,
        ("eq", "string") => StrEq,
        ("ne", "i64") => NeI64,
        ("ne", "f64") => NeF64,
        ("ne", "decimal") => NeDecimal,
        ("ne", "bool") => NeBool,
        ("ne", "string") => StrNe,
        ("lt", "i64") => LtI64,
        ("lt", "f64") => LtF64,
        ("lt", "decimal") => LtDecimal,
        ("lt", "string") => StrLt,
        ("gt", "i64") => GtI64,
        ("gt", "f64") => GtF64,
        ("gt", "decimal") => GtDecimal,
        ("gt", "string") => StrGt,
        ("le", "i64") => LeI64,
        ("le", "f64") => LeF64,
        ("le", "decimal") => LeDecimal,
        ("le", "string") => StrLe,
        ("ge", "i64") => GeI64,
        ("ge", "f64") => GeF64,
        ("ge", "decimal") => GeDecimal,
        ("ge", "string") => StrGe,

        ("print", "i64") => PrintI64,
        ("print", "f64") => PrintF64,
        ("print", "bool") => PrintBool,
        ("print", "string") => PrintString,
        ("print", "array") => PrintArray,
        ("print", "map") => PrintMap,
        ("print", "decimal") => PrintDecimal,

        ("len", "string") => StrLen,
        ("len", "array") => ArrayLen,
        ("len", "map") => MapLen,

        ("push", "array") => ArrayPush,
        ("get", "array") => ArrayGet,
        ("get", "map") => MapGet,
        ("get", "string") => StrIndexGet,
        ("set", "array") => ArraySet,
        ("set", "map") => MapSet,

        ("concat", "string") => StrConcat,
        ("slice", "string") => StrSlice,

        ("from_i64", "string") => StrFromI64,
        ("from_f64", "string") => StrFromF64,
        ("from_bool", "string") => StrFromBool,

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_dispatches_by_operand_type() {
        assert_eq!(resolve("add", &Type::Int), Some(Opcode::AddI64));
        assert_eq!(resolve("add", &Type::Float), Some(Opcode::AddF64));
        assert_eq!(resolve("add", &Type::Decimal), Some(Opcode::AddDecimal));
    }

    #[test]
    fn eq_dispatches_to_the_typed_string_comparison() {
        assert_eq!(resolve("eq", &Type::String), Some(Opcode::StrEq));
    }

    #[test]
    fn unsupported_combination_resolves_to_none() {
        assert_eq!(resolve("sqrt", &Type::Int), None);
        assert_eq!(resolve("push", &Type::Int), None);
    }

    #[test]
    fn every_short_name_is_recognised() {
        assert!(is_short_name("add"));
        assert!(!is_short_name("frobnicate"));
    }
}
