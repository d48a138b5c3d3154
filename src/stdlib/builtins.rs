//! Builtin output procedures: print, puts, putc.

use std::fmt;

use serde::Serialize;

use crate::core::{Builtin, Operand, PilaError, PilaResult};

/// One unit of program output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutputItem {
    /// Integer written by `print`, followed by a newline.
    Int(i64),
    /// String written verbatim by `puts`.
    Str(String),
    /// Character written by `putc`.
    Char(char),
}

impl fmt::Display for OutputItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputItem::Int(v) => writeln!(f, "{}", v),
            OutputItem::Str(s) => f.write_str(s),
            OutputItem::Char(c) => write!(f, "{}", c),
        }
    }
}

/// Run a builtin on its already-checked arguments, bottom first.
pub fn invoke(kind: Builtin, args: &[Operand], ip: usize) -> PilaResult<OutputItem> {
    let arg = args.first().cloned().unwrap_or_else(Operand::void);
    match kind {
        Builtin::PutU64 => arg
            .as_int()
            .map(OutputItem::Int)
            .ok_or_else(|| PilaError::type_mismatch("int", arg.clone(), ip)),
        Builtin::PutString => arg
            .as_str()
            .map(|s| OutputItem::Str(s.to_string()))
            .ok_or_else(|| PilaError::type_mismatch("str", arg.clone(), ip)),
        Builtin::PutChar => arg
            .as_int()
            .and_then(|code| u32::try_from(code).ok())
            .and_then(char::from_u32)
            .map(OutputItem::Char)
            .ok_or_else(|| PilaError::type_mismatch("character code", arg.clone(), ip)),
    }
}

/// Concatenate output the way a terminal would show it.
pub fn render(output: &[OutputItem]) -> String {
    output.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TypeTag;

    #[test]
    fn test_print_appends_newline() {
        let item = invoke(Builtin::PutU64, &[Operand::int(TypeTag::I8, -3)], 0).unwrap();
        assert_eq!(item.to_string(), "-3\n");
    }

    #[test]
    fn test_puts_and_putc() {
        let s = invoke(Builtin::PutString, &[Operand::string("hi")], 0).unwrap();
        let c = invoke(Builtin::PutChar, &[Operand::int(TypeTag::I64, 65)], 0).unwrap();
        assert_eq!(render(&[s, c]), "hiA");
    }

    #[test]
    fn test_putc_rejects_invalid_code() {
        let err = invoke(Builtin::PutChar, &[Operand::int(TypeTag::I64, -1)], 9).unwrap_err();
        assert!(matches!(err, PilaError::TypeMismatch { ip: 9, .. }));
    }
}
