//! The parallel `AISLTEXT1` text artifact format: a whitespace-delimited
//! token stream, recognised as an alternative to the binary format on load.

use crate::constants::ConstantPool;
use crate::instruction::{Instruction, Operand};
use crate::module::{FunctionEntry, Module, ModuleError, TEXT_MAGIC};
use crate::opcode::Opcode;

/// Tokenize a text artifact: whitespace-separated tokens, with
/// double-quoted substrings (backslash-escaped) kept as single tokens so
/// that string constants may contain whitespace.
fn tokenize(src: &str) -> Result<Vec<String>, ModuleError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut tok = String::new();
            loop {
                match chars.next() {
                    None => return Err(ModuleError::MalformedText("unterminated string literal".into())),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => tok.push('\n'),
                        Some('t') => tok.push('\t'),
                        Some(other) => tok.push(other),
                        None => return Err(ModuleError::MalformedText("dangling escape".into())),
                    },
                    Some(other) => tok.push(other),
                }
            }
            tokens.push(tok);
        } else {
            let mut tok = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                tok.push(c);
                chars.next();
            }
            tokens.push(tok);
        }
    }
    Ok(tokens)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

struct TokenCursor {
    tokens: Vec<String>,
    pos: usize,
}

impl TokenCursor {
    fn next(&mut self) -> Result<&str, ModuleError> {
        let tok = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| ModuleError::MalformedText("unexpected end of token stream".into()))?;
        self.pos += 1;
        Ok(tok)
    }

    fn next_u32(&mut self) -> Result<u32, ModuleError> {
        let tok = self.next()?;
        tok.parse().map_err(|_| ModuleError::MalformedText(format!("expected u32, got {tok:?}")))
    }

    fn next_i64(&mut self) -> Result<i64, ModuleError> {
        let tok = self.next()?;
        tok.parse().map_err(|_| ModuleError::MalformedText(format!("expected i64, got {tok:?}")))
    }

    fn next_f64(&mut self) -> Result<f64, ModuleError> {
        let tok = self.next()?;
        tok.parse().map_err(|_| ModuleError::MalformedText(format!("expected f64, got {tok:?}")))
    }

    fn next_bool(&mut self) -> Result<bool, ModuleError> {
        match self.next()? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ModuleError::MalformedText(format!("expected bool, got {other:?}"))),
        }
    }
}

/// Parse an `AISLTEXT1` artifact.
pub fn parse_text(src: &str) -> Result<Module, ModuleError> {
    let tokens = tokenize(src)?;
    let mut c = TokenCursor { tokens, pos: 0 };

    let magic = c.next()?;
    if magic != TEXT_MAGIC {
        return Err(ModuleError::MalformedText(format!("expected {TEXT_MAGIC}, got {magic:?}")));
    }

    if c.next()? != "strings" {
        return Err(ModuleError::MalformedText("expected 'strings' section".into()));
    }
    let string_count = c.next_u32()?;
    let mut strings = ConstantPool::new();
    for _ in 0..string_count {
        let s = c.next()?.to_string();
        strings.intern(s);
    }

    if c.next()? != "functions" {
        return Err(ModuleError::MalformedText("expected 'functions' section".into()));
    }
    let function_count = c.next_u32()?;
    let mut functions = Vec::with_capacity(function_count as usize);
    for _ in 0..function_count {
        let name = c.next()?.to_string();
        let start_addr = c.next_u32()?;
        let local_count = c.next_u32()?;
        functions.push(FunctionEntry { name, start_addr, local_count, param_count: 0 });
    }

    if c.next()? != "instructions" {
        return Err(ModuleError::MalformedText("expected 'instructions' section".into()));
    }
    let instruction_count = c.next_u32()?;
    let mut instructions = Vec::with_capacity(instruction_count as usize);
    for _ in 0..instruction_count {
        let mnemonic = c.next()?.to_string();
        let opcode = Opcode::from_mnemonic(&mnemonic)
            .ok_or_else(|| ModuleError::UnknownMnemonic(mnemonic.clone()))?;
        let operand = match opcode {
            Opcode::PushInt => Operand::I64(c.next_i64()?),
            Opcode::PushFloat => Operand::F64(c.next_f64()?),
            Opcode::PushBool => Operand::Bool(c.next_bool()?),
            Opcode::PushString | Opcode::LoadLocal | Opcode::StoreLocal | Opcode::ArrayNew
            | Opcode::ChannelNew => Operand::U32(c.next_u32()?),
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => Operand::Jump(c.next_u32()?),
            Opcode::Call | Opcode::HostCall => {
                Operand::Call { func_idx: c.next_u32()?, arg_count: c.next_u32()? }
            }
            _ => Operand::None,
        };
        instructions.push(Instruction::new(opcode, operand));
    }

    Ok(Module { instructions, strings, functions })
}

/// Render a module to the `AISLTEXT1` text format — the inverse of
/// [`parse_text`].
pub fn write_text(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(TEXT_MAGIC);
    out.push('\n');

    out.push_str(&format!("strings {}\n", module.strings.len()));
    for s in module.strings.iter() {
        out.push_str(&escape(s));
        out.push('\n');
    }

    out.push_str(&format!("functions {}\n", module.functions.len()));
    for f in &module.functions {
        out.push_str(&format!("{} {} {}\n", escape(&f.name), f.start_addr, f.local_count));
    }

    out.push_str(&format!("instructions {}\n", module.instructions.len()));
    for instr in &module.instructions {
        out.push_str(instr.opcode.mnemonic());
        match instr.operand {
            Operand::None => {}
            Operand::I64(v) => out.push_str(&format!(" {v}")),
            Operand::F64(v) => out.push_str(&format!(" {v}")),
            Operand::U32(v) => out.push_str(&format!(" {v}")),
            Operand::Bool(v) => out.push_str(&format!(" {v}")),
            Operand::Jump(t) => out.push_str(&format!(" {t}")),
            Operand::Call { func_idx, arg_count } => {
                out.push_str(&format!(" {func_idx} {arg_count}"))
            }
        }
        out.push('\n');
    }
    out
}
