//! Lexer for pila source files.
//!
//! Splits source text into whitespace-delimited, position-tagged tokens.
//!
//! - `//` starts a line comment
//! - `"..."` is one token even when it contains spaces. The escapes
//!   `\n \t \" \\` are decoded and the quotes stay in the token text.
//! - `@include "path"` splices the lexed content of another file in place
//!   of the directive. Paths resolve against the including file's directory.
//!
//! Line numbers and columns are 1-indexed; columns count characters.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::core::{PilaError, PilaResult, SourceLocation};

const INCLUDE_DIRECTIVE: &str = "@include";

/// A token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub file: Option<Arc<str>>,
    /// Set once an instruction has taken this token as an inline operand.
    pub consumed: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, line: usize, column: usize, file: Option<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            line,
            column,
            file,
            consumed: false,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }

    /// Whether the token is a quoted string literal.
    pub fn is_quoted(&self) -> bool {
        self.text.len() >= 2 && self.text.starts_with('"') && self.text.ends_with('"')
    }
}

/// Ordered tokens from one or more files, after include expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Mark a token as taken by an instruction.
    pub fn consume(&mut self, index: usize) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.consumed = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    pub fn append(&mut self, other: TokenStream) {
        self.tokens.extend(other.tokens);
    }
}

/// Tokenize a source string. Include directives are left as ordinary tokens.
pub fn tokenize(source: &str, file: Option<Arc<str>>) -> PilaResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1usize;
    let mut column = 1usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                column = 1;
                i += 1;
            }
            c if c.is_whitespace() => {
                column += 1;
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' => {
                let (start_line, start_column) = (line, column);
                let mut text = String::from('"');
                i += 1;
                column += 1;
                loop {
                    let Some(&c) = chars.get(i) else {
                        return Err(PilaError::syntax(
                            "unterminated string literal",
                            SourceLocation { file: file.clone(), line: start_line, column: start_column },
                        ));
                    };
                    i += 1;
                    column += 1;
                    match c {
                        '"' => break,
                        '\\' => {
                            let decoded = match chars.get(i) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some('"') => '"',
                                Some('\\') => '\\',
                                other => {
                                    return Err(PilaError::syntax(
                                        format!("unknown escape '\\{}'", other.map(|c| c.to_string()).unwrap_or_default()),
                                        SourceLocation { file: file.clone(), line, column: column - 1 },
                                    ));
                                }
                            };
                            text.push(decoded);
                            i += 1;
                            column += 1;
                        }
                        '\n' => {
                            text.push('\n');
                            line += 1;
                            column = 1;
                        }
                        c => text.push(c),
                    }
                }
                text.push('"');
                tokens.push(Token::new(text, start_line, start_column, file.clone()));
            }
            _ => {
                let start_column = column;
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                    column += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::new(text, line, start_column, file.clone()));
            }
        }
    }

    Ok(tokens)
}

/// Lex a file and expand its includes.
pub fn lex_file(path: &Path) -> PilaResult<TokenStream> {
    let mut active = Vec::new();
    let tokens = lex_file_inner(path, &mut active)?;
    debug!(file = %path.display(), tokens = tokens.len(), "lexed");
    Ok(TokenStream::new(tokens))
}

/// Lex an in-memory source. Includes resolve against `base_dir`.
pub fn lex_source(source: &str, name: &str, base_dir: &Path) -> PilaResult<TokenStream> {
    let mut active = Vec::new();
    let raw = tokenize(source, Some(Arc::from(name)))?;
    let tokens = expand_includes(raw, base_dir, &mut active)?;
    Ok(TokenStream::new(tokens))
}

/// Lex several root files and concatenate them in argument order.
///
/// With the `parallel` feature each file is lexed on the rayon pool.
pub fn lex_files(paths: &[PathBuf]) -> PilaResult<TokenStream> {
    #[cfg(feature = "parallel")]
    let streams: Vec<TokenStream> = {
        use rayon::prelude::*;
        paths.par_iter().map(|p| lex_file(p)).collect::<PilaResult<_>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let streams: Vec<TokenStream> = paths.iter().map(|p| lex_file(p)).collect::<PilaResult<_>>()?;

    let mut stream = TokenStream::default();
    for s in streams {
        stream.append(s);
    }
    Ok(stream)
}

fn read_source(path: &Path) -> PilaResult<String> {
    fs::read_to_string(path).map_err(|e| PilaError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn lex_file_inner(path: &Path, active: &mut Vec<PathBuf>) -> PilaResult<Vec<Token>> {
    let source = read_source(path)?;
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let raw = tokenize(&source, Some(Arc::from(path.display().to_string())))?;

    active.push(canonical);
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let result = expand_includes(raw, &base_dir, active);
    active.pop();
    result
}

fn expand_includes(raw: Vec<Token>, base_dir: &Path, active: &mut Vec<PathBuf>) -> PilaResult<Vec<Token>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().peekable();

    while let Some(token) = iter.next() {
        if token.text != INCLUDE_DIRECTIVE {
            out.push(token);
            continue;
        }

        let target = match iter.next() {
            Some(t) if t.line == token.line && t.is_quoted() => t,
            _ => {
                return Err(PilaError::syntax(
                    "@include expects a quoted path on the same line",
                    token.location(),
                ))
            }
        };
        if let Some(extra) = iter.peek() {
            if extra.line == token.line {
                return Err(PilaError::syntax(
                    format!("unexpected '{}' after @include", extra.text),
                    extra.location(),
                ));
            }
        }

        let relative = &target.text[1..target.text.len() - 1];
        let path = base_dir.join(relative);
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if active.contains(&canonical) {
            return Err(PilaError::syntax(
                format!("include cycle through '{}'", relative),
                target.location(),
            ));
        }

        debug!(from = ?token.file, include = %path.display(), "expanding include");
        out.extend(lex_file_inner(&path, active)?);
    }

    Ok(out)
}
