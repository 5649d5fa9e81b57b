//! A bounded S-expression reader for AISL's surface syntax.
//!
//! `aisl-ast` is the seam the external lexer/parser is expected to write
//! into; this crate is not that parser. It is the thin, CLI-local reader
//! that lets `aislc` turn a `.aisl` file on disk into the `aisl_ast::Module`
//! the compiler already consumes, so the two binaries in this crate are
//! runnable end to end. It understands exactly the literal S-expression
//! forms below and nothing of a richer concrete grammar (infix operators,
//! precedence, comments other than `;`).

use aisl_ast::{
    BinOp, Binding, Definition, Expr, ExprKind, Function, Import, IoOp, Literal, Module, Param,
    TestCase, TestSpec, Type,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

fn err(line: usize, col: usize, message: impl Into<String>) -> ParseError {
    ParseError { line, col, message: message.into() }
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    line: usize,
    col: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut line = 1usize;
    let mut col = 1usize;
    let mut chars = src.chars().peekable();

    macro_rules! advance {
        ($c:expr) => {{
            if $c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }};
    }

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            advance!(c);
            continue;
        }
        if c == ';' {
            while let Some(&c) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
                advance!(c);
            }
            continue;
        }
        if c == '(' || c == ')' {
            tokens.push(Token { text: c.to_string(), line, col });
            chars.next();
            advance!(c);
            continue;
        }
        if c == '"' {
            let (start_line, start_col) = (line, col);
            chars.next();
            advance!(c);
            let mut text = String::from("\"");
            loop {
                match chars.next() {
                    None => return Err(err(start_line, start_col, "unterminated string literal")),
                    Some('"') => {
                        advance!('"');
                        text.push('"');
                        break;
                    }
                    Some('\\') => {
                        advance!('\\');
                        match chars.next() {
                            Some(e @ 'n') | Some(e @ 't') | Some(e @ '"') | Some(e @ '\\') => {
                                advance!(e);
                                text.push(match e {
                                    'n' => '\n',
                                    't' => '\t',
                                    other => other,
                                });
                            }
                            Some(other) => {
                                advance!(other);
                                text.push(other);
                            }
                            None => return Err(err(line, col, "dangling escape in string literal")),
                        }
                    }
                    Some(other) => {
                        advance!(other);
                        text.push(other);
                    }
                }
            }
            tokens.push(Token { text, line: start_line, col: start_col });
            continue;
        }
        let (start_line, start_col) = (line, col);
        let mut text = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == ';' {
                break;
            }
            text.push(c);
            chars.next();
            advance!(c);
        }
        tokens.push(Token { text, line: start_line, col: start_col });
    }
    Ok(tokens)
}

#[derive(Debug, Clone)]
enum SExpr {
    Atom(Token),
    List(Vec<SExpr>, usize, usize),
}

impl SExpr {
    fn pos(&self) -> (usize, usize) {
        match self {
            SExpr::Atom(t) => (t.line, t.col),
            SExpr::List(_, l, c) => (*l, *c),
        }
    }

    fn atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(t) => Some(t.text.as_str()),
            SExpr::List(..) => None,
        }
    }

    fn list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items, ..) => Some(items),
            SExpr::Atom(_) => None,
        }
    }
}

struct Reader {
    tokens: Vec<Token>,
    pos: usize,
}

impl Reader {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn read(&mut self) -> Result<SExpr, ParseError> {
        let tok = self.next().ok_or_else(|| err(0, 0, "unexpected end of input"))?;
        match tok.text.as_str() {
            "(" => {
                let (line, col) = (tok.line, tok.col);
                let mut items = Vec::new();
                loop {
                    match self.peek() {
                        None => return Err(err(line, col, "unclosed '('")),
                        Some(t) if t.text == ")" => {
                            self.next();
                            break;
                        }
                        _ => items.push(self.read()?),
                    }
                }
                Ok(SExpr::List(items, line, col))
            }
            ")" => Err(err(tok.line, tok.col, "unexpected ')'")),
            _ => Ok(SExpr::Atom(tok)),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Parse one `.aisl` source file into a module named `module_name`.
pub fn parse_module(module_name: &str, src: &str) -> Result<Module, ParseError> {
    let tokens = tokenize(src)?;
    let mut reader = Reader { tokens, pos: 0 };
    let mut imports = Vec::new();
    let mut definitions = Vec::new();

    while !reader.at_end() {
        let form = reader.read()?;
        let items = form.list().ok_or_else(|| {
            let (l, c) = form.pos();
            err(l, c, "expected a top-level form, found an atom")
        })?;
        let (head_pos, head) = match items.first() {
            Some(h) => (h.pos(), h.atom()),
            None => {
                let (l, c) = form.pos();
                return Err(err(l, c, "empty top-level form"));
            }
        };
        match head {
            Some("import") => imports.push(parse_import(items)?),
            Some("fn") => definitions.push(Definition::Function(parse_fn(items)?)),
            Some("test") => definitions.push(Definition::TestSpec(parse_test(items)?)),
            _ => return Err(err(head_pos.0, head_pos.1, "expected 'import', 'fn', or 'test'")),
        }
    }

    Ok(Module { name: module_name.to_string(), imports, definitions })
}

fn parse_import(items: &[SExpr]) -> Result<Import, ParseError> {
    let name = items.get(1).and_then(SExpr::atom).ok_or_else(|| {
        let (l, c) = items[0].pos();
        err(l, c, "import expects a module name")
    })?;
    Ok(Import { module_name: name.to_string() })
}

fn parse_fn(items: &[SExpr]) -> Result<Function, ParseError> {
    let (l, c) = items[0].pos();
    let name = items.get(1).and_then(SExpr::atom).ok_or_else(|| err(l, c, "fn expects a name"))?;
    let param_list = items.get(2).and_then(SExpr::list).ok_or_else(|| err(l, c, "fn expects a parameter list"))?;
    let mut params = Vec::with_capacity(param_list.len());
    for p in param_list {
        let fields = p.list().ok_or_else(|| {
            let (pl, pc) = p.pos();
            err(pl, pc, "each parameter must be (name type)")
        })?;
        let pname = fields.first().and_then(SExpr::atom).ok_or_else(|| {
            let (pl, pc) = p.pos();
            err(pl, pc, "parameter missing a name")
        })?;
        let ty_expr = fields.get(1).ok_or_else(|| {
            let (pl, pc) = p.pos();
            err(pl, pc, "parameter missing a type")
        })?;
        params.push(Param { name: pname.to_string(), ty: parse_type(ty_expr)? });
    }
    let return_type = items.get(3).ok_or_else(|| err(l, c, "fn expects a return type"))?;
    let return_type = parse_type(return_type)?;
    let body_expr = items.get(4).ok_or_else(|| err(l, c, "fn expects a body"))?;
    let body = parse_expr(body_expr)?;
    Ok(Function { name: name.to_string(), params, return_type, body })
}

fn parse_type(e: &SExpr) -> Result<Type, ParseError> {
    match e {
        SExpr::Atom(t) => match t.text.as_str() {
            "int" => Ok(Type::Int),
            "float" => Ok(Type::Float),
            "bool" => Ok(Type::Bool),
            "string" => Ok(Type::String),
            "unit" => Ok(Type::Unit),
            "decimal" => Ok(Type::Decimal),
            "json" => Ok(Type::Json),
            other => Err(err(t.line, t.col, format!("unknown type: {other}"))),
        },
        SExpr::List(items, l, c) => {
            let head = items.first().and_then(SExpr::atom).ok_or_else(|| err(*l, *c, "expected a type constructor"))?;
            let arg = items.get(1).ok_or_else(|| err(*l, *c, "expected a type argument"))?;
            let inner = parse_type(arg)?;
            match head {
                "array" => Ok(Type::Array(Box::new(inner))),
                "map" => Ok(Type::Map(Box::new(inner))),
                other => Err(err(*l, *c, format!("unknown type constructor: {other}"))),
            }
        }
    }
}

fn parse_test(items: &[SExpr]) -> Result<TestSpec, ParseError> {
    let (l, c) = items[0].pos();
    let target = items.get(1).and_then(SExpr::atom).ok_or_else(|| err(l, c, "test expects a target function name"))?;
    let case_list = items.get(2).and_then(SExpr::list).ok_or_else(|| err(l, c, "test expects a list of cases"))?;
    let mut cases = Vec::with_capacity(case_list.len());
    for case in case_list {
        let fields = case.list().ok_or_else(|| {
            let (cl, cc) = case.pos();
            err(cl, cc, "each test case must be (description (args...) expected)")
        })?;
        let (cl, cc) = case.pos();
        let description = fields
            .first()
            .and_then(SExpr::atom)
            .map(unquote)
            .ok_or_else(|| err(cl, cc, "test case missing a description string"))?;
        let arg_list = fields.get(1).and_then(SExpr::list).ok_or_else(|| err(cl, cc, "test case missing an argument list"))?;
        let mut args = Vec::with_capacity(arg_list.len());
        for a in arg_list {
            args.push(parse_literal(a)?);
        }
        let expected = fields.get(2).ok_or_else(|| err(cl, cc, "test case missing an expected value"))?;
        let expected = parse_literal(expected)?;
        cases.push(TestCase { description, args, expected });
    }
    Ok(TestSpec { target: target.to_string(), cases })
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(s).to_string()
}

fn parse_literal(e: &SExpr) -> Result<Literal, ParseError> {
    let (l, c) = e.pos();
    let atom = e.atom().ok_or_else(|| err(l, c, "expected a literal"))?;
    parse_atom_literal(atom, l, c)
}

fn parse_atom_literal(atom: &str, l: usize, c: usize) -> Result<Literal, ParseError> {
    if let Some(inner) = atom.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok(Literal::String(inner.to_string()));
    }
    match atom {
        "true" => return Ok(Literal::Bool(true)),
        "false" => return Ok(Literal::Bool(false)),
        "unit" => return Ok(Literal::Unit),
        _ => {}
    }
    if let Ok(i) = atom.parse::<i64>() {
        return Ok(Literal::Int(i));
    }
    if let Ok(f) = atom.parse::<f64>() {
        return Ok(Literal::Float(f));
    }
    Err(err(l, c, format!("expected a literal, found '{atom}'")))
}

const BINOPS: &[(&str, BinOp)] = &[
    ("+", BinOp::Add),
    ("-", BinOp::Sub),
    ("*", BinOp::Mul),
    ("/", BinOp::Div),
    ("=", BinOp::Eq),
    ("<", BinOp::Lt),
    (">", BinOp::Gt),
    ("<=", BinOp::Le),
    (">=", BinOp::Ge),
];

const IO_OPS: &[(&str, IoOp)] =
    &[("io_open", IoOp::Open), ("io_read", IoOp::Read), ("io_write", IoOp::Write), ("io_close", IoOp::Close)];

fn parse_expr(e: &SExpr) -> Result<Expr, ParseError> {
    match e {
        SExpr::Atom(t) => {
            if let Ok(lit) = parse_atom_literal(&t.text, t.line, t.col) {
                return Ok(Expr::new(ExprKind::Literal(lit)));
            }
            Ok(Expr::new(ExprKind::Var(t.text.clone())))
        }
        SExpr::List(items, l, c) => {
            let (l, c) = (*l, *c);
            if items.is_empty() {
                return Err(err(l, c, "empty expression form"));
            }
            let head = items[0].atom();
            let args = &items[1..];

            if let Some(head) = head {
                if let Some((_, op)) = BINOPS.iter().find(|(sym, _)| *sym == head) {
                    let lhs = args.first().ok_or_else(|| err(l, c, format!("'{head}' expects two operands")))?;
                    let rhs = args.get(1).ok_or_else(|| err(l, c, format!("'{head}' expects two operands")))?;
                    return Ok(Expr::new(ExprKind::Binary {
                        op: *op,
                        lhs: Box::new(parse_expr(lhs)?),
                        rhs: Box::new(parse_expr(rhs)?),
                    }));
                }
                if let Some((_, io_op)) = IO_OPS.iter().find(|(sym, _)| *sym == head) {
                    let args = args.iter().map(parse_expr).collect::<Result<Vec<_>, _>>()?;
                    return Ok(Expr::new(ExprKind::Io { op: *io_op, args }));
                }
                if let Some(name) = head.strip_prefix("set_").filter(|n| !n.is_empty()) {
                    let value = args.first().ok_or_else(|| err(l, c, format!("'{head}' expects a value")))?;
                    return Ok(Expr::new(ExprKind::Assign {
                        name: name.to_string(),
                        value: Box::new(parse_expr(value)?),
                    }));
                }
                match head {
                    "if" => {
                        let cond = args.first().ok_or_else(|| err(l, c, "if expects a condition"))?;
                        let then_branch = args.get(1).ok_or_else(|| err(l, c, "if expects a then-branch"))?;
                        let else_branch = args.get(2).ok_or_else(|| err(l, c, "if expects an else-branch"))?;
                        return Ok(Expr::new(ExprKind::Cond {
                            cond: Box::new(parse_expr(cond)?),
                            then_branch: Box::new(parse_expr(then_branch)?),
                            else_branch: Box::new(parse_expr(else_branch)?),
                        }));
                    }
                    "seq" => {
                        let body = args.iter().map(parse_expr).collect::<Result<Vec<_>, _>>()?;
                        return Ok(Expr::new(ExprKind::Seq(body)));
                    }
                    "let" => {
                        let binding_list = args.first().and_then(SExpr::list).ok_or_else(|| err(l, c, "let expects a binding list"))?;
                        let mut bindings = Vec::with_capacity(binding_list.len());
                        for b in binding_list {
                            let fields = b.list().ok_or_else(|| {
                                let (bl, bc) = b.pos();
                                err(bl, bc, "each binding must be (name value)")
                            })?;
                            let bname = fields.first().and_then(SExpr::atom).ok_or_else(|| {
                                let (bl, bc) = b.pos();
                                err(bl, bc, "binding missing a name")
                            })?;
                            let bvalue = fields.get(1).ok_or_else(|| {
                                let (bl, bc) = b.pos();
                                err(bl, bc, "binding missing a value")
                            })?;
                            bindings.push(Binding { name: bname.to_string(), value: Box::new(parse_expr(bvalue)?) });
                        }
                        let body = args.get(1).ok_or_else(|| err(l, c, "let expects a body"))?;
                        return Ok(Expr::new(ExprKind::Let { bindings, body: Box::new(parse_expr(body)?) }));
                    }
                    "while" => {
                        let cond = args.first().ok_or_else(|| err(l, c, "while expects a condition"))?;
                        let body = args.get(1).ok_or_else(|| err(l, c, "while expects a body"))?;
                        return Ok(Expr::new(ExprKind::While {
                            cond: Box::new(parse_expr(cond)?),
                            body: Box::new(parse_expr(body)?),
                        }));
                    }
                    "loop" => {
                        let body = args.first().ok_or_else(|| err(l, c, "loop expects a body"))?;
                        return Ok(Expr::new(ExprKind::Loop { body: Box::new(parse_expr(body)?) }));
                    }
                    "break" => return Ok(Expr::new(ExprKind::Break)),
                    "continue" => return Ok(Expr::new(ExprKind::Continue)),
                    "return" => {
                        let value = match args.first() {
                            Some(e) => Some(Box::new(parse_expr(e)?)),
                            None => None,
                        };
                        return Ok(Expr::new(ExprKind::Return(value)));
                    }
                    _ => {}
                }
                let args = args.iter().map(parse_expr).collect::<Result<Vec<_>, _>>()?;
                return Ok(Expr::new(ExprKind::Apply { callee: head.to_string(), args }));
            }
            Err(err(l, c, "expected a function name or keyword at the head of the form"))
        }
    }
}
