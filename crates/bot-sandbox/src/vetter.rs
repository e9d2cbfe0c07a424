//! Static analysis of uploaded bot source.
//!
//! A bot file is accepted only if it parses as Python and stays inside a
//! small, side-effect-free surface: an import allow-list, no
//! dynamic-execution or introspection builtins, and no reflective dunder
//! attributes. Violations are collected in a single pass over the token
//! stream, in source order, so a rejected upload comes back with the
//! complete report rather than just the first hit.
//!
//! Acceptance is not a safety proof - it only establishes the absence of
//! the constructs listed here. Runtime deadlines enforce the rest.

use rustpython_parser::{lexer, parse, Mode, Tok};
use serde::{Deserialize, Serialize};

/// Module roots a bot may import.
static ALLOWED_IMPORTS: &[&str] = &[
    "abc",
    "collections",
    "copy",
    "dataclasses",
    "enum",
    "functools",
    "itertools",
    "math",
    "random",
    "time",
    "typing",
];

/// Module roots that are rejected with their own violation kind because
/// they reach the OS, the network, or the interpreter internals.
static DANGEROUS_IMPORTS: &[&str] = &[
    "asyncio",
    "builtins",
    "codecs",
    "ctypes",
    "glob",
    "http",
    "importlib",
    "io",
    "marshal",
    "multiprocessing",
    "os",
    "pathlib",
    "pickle",
    "platform",
    "pty",
    "requests",
    "resource",
    "runpy",
    "shelve",
    "shutil",
    "signal",
    "site",
    "socket",
    "socketserver",
    "subprocess",
    "sys",
    "tempfile",
    "threading",
    "urllib",
    "webbrowser",
];

/// Builtins whose direct call means dynamic execution, I/O, or
/// introspection.
static DANGEROUS_BUILTINS: &[&str] = &[
    "__import__",
    "compile",
    "delattr",
    "dir",
    "eval",
    "exec",
    "getattr",
    "globals",
    "hasattr",
    "input",
    "locals",
    "open",
    "setattr",
    "vars",
];

/// Attributes that expose the interpreter's reflective machinery.
static DANGEROUS_ATTRIBUTES: &[&str] = &[
    "__bases__",
    "__builtins__",
    "__class__",
    "__code__",
    "__dict__",
    "__file__",
    "__globals__",
    "__import__",
    "__loader__",
    "__path__",
    "__spec__",
    "__subclasses__",
];

/// Classification of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// The file is not valid Python.
    SyntaxError,
    /// Import of a module on the deny-list.
    DangerousImport,
    /// Import of a module outside the allow-list.
    DisallowedImport,
    /// Direct call of a dynamic-execution/introspection builtin.
    DangerousCall,
    /// Access to a reflective dunder attribute.
    DangerousAttribute,
}

/// One finding from the vetting pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityViolation {
    pub kind: ViolationKind,
    /// 1-based source line of the offending construct.
    pub line: u32,
    /// The offending source line, trimmed.
    pub snippet: String,
    /// Human-readable description.
    pub detail: String,
}

impl std::fmt::Display for SecurityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} at line {}: {}", self.kind, self.line, self.detail)
    }
}

/// 1-based line containing the byte `offset`.
fn line_at(source: &str, offset: usize) -> u32 {
    let clamped = offset.min(source.len());
    source[..clamped].bytes().filter(|&b| b == b'\n').count() as u32 + 1
}

/// The trimmed text of a 1-based line.
fn snippet_at(source: &str, line: u32) -> String {
    source
        .lines()
        .nth(line.saturating_sub(1) as usize)
        .unwrap_or("")
        .trim()
        .to_string()
}

fn violation(source: &str, offset: usize, kind: ViolationKind, detail: String) -> SecurityViolation {
    let line = line_at(source, offset);
    SecurityViolation {
        kind,
        line,
        snippet: snippet_at(source, line),
        detail,
    }
}

/// Import-statement scanning state. Only the *root* module name of each
/// `import`/`from` is checked, mirroring how the runtime resolves it;
/// aliases and imported symbols are not module references.
#[derive(PartialEq)]
enum ImportState {
    Idle,
    /// After `import`, expecting a module root (again after each comma).
    PlainImport { expect_root: bool },
    /// After `from`, expecting the module root.
    FromModule,
    /// Root of a `from` already handled; the rest of the statement is
    /// imported symbols.
    FromSymbols,
}

fn check_import_root(source: &str, offset: usize, root: &str, out: &mut Vec<SecurityViolation>) {
    if DANGEROUS_IMPORTS.contains(&root) {
        out.push(violation(
            source,
            offset,
            ViolationKind::DangerousImport,
            format!("import of dangerous module '{}' is not allowed", root),
        ));
    } else if !ALLOWED_IMPORTS.contains(&root) {
        out.push(violation(
            source,
            offset,
            ViolationKind::DisallowedImport,
            format!(
                "import of module '{}' is not in the allowed list ({})",
                root,
                ALLOWED_IMPORTS.join(", ")
            ),
        ));
    }
}

/// Vets bot source, returning the full violation list on rejection.
///
/// The source is first parsed (a parse failure is itself a violation),
/// then scanned token by token so that nested imports, calls, and
/// attribute accesses are all seen regardless of where they appear.
pub fn vet_source(source: &str, filename: &str) -> Result<(), Vec<SecurityViolation>> {
    if let Err(err) = parse(source, Mode::Module, filename) {
        let offset = u32::from(err.offset) as usize;
        return Err(vec![violation(
            source,
            offset,
            ViolationKind::SyntaxError,
            format!("invalid Python syntax: {}", err),
        )]);
    }

    // The parse above succeeded, so lexing the same source cannot fail;
    // drop the per-token Results and keep only structural tokens.
    let tokens: Vec<(Tok, usize)> = lexer::lex(source, Mode::Module)
        .flatten()
        .filter(|(tok, _)| {
            !matches!(
                tok,
                Tok::Comment(_) | Tok::NonLogicalNewline | Tok::Indent | Tok::Dedent
            )
        })
        .map(|(tok, range)| (tok, u32::from(range.start()) as usize))
        .collect();

    let mut violations = Vec::new();
    let mut import_state = ImportState::Idle;

    for (i, (tok, offset)) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| &tokens[p].0);
        let next = tokens.get(i + 1).map(|(tok, _)| tok);

        match tok {
            Tok::Newline => import_state = ImportState::Idle,
            Tok::From => import_state = ImportState::FromModule,
            Tok::Import => {
                import_state = match import_state {
                    // `from <root> import ...` or relative `from . import ...`
                    ImportState::FromModule | ImportState::FromSymbols => {
                        ImportState::FromSymbols
                    }
                    _ => ImportState::PlainImport { expect_root: true },
                };
            }
            Tok::Comma => {
                if let ImportState::PlainImport { ref mut expect_root } = import_state {
                    *expect_root = true;
                }
            }
            Tok::As => {
                if let ImportState::PlainImport { ref mut expect_root } = import_state {
                    *expect_root = false;
                }
            }
            Tok::Name { name } => match import_state {
                ImportState::FromModule => {
                    check_import_root(source, *offset, name, &mut violations);
                    import_state = ImportState::FromSymbols;
                }
                ImportState::PlainImport { expect_root: true } => {
                    check_import_root(source, *offset, name, &mut violations);
                    import_state = ImportState::PlainImport { expect_root: false };
                }
                _ => {
                    if matches!(prev, Some(Tok::Dot)) {
                        if DANGEROUS_ATTRIBUTES.contains(&name.as_str()) {
                            violations.push(violation(
                                source,
                                *offset,
                                ViolationKind::DangerousAttribute,
                                format!("access to dangerous attribute '{}' is not allowed", name),
                            ));
                        }
                    } else if matches!(next, Some(Tok::Lpar))
                        && !matches!(prev, Some(Tok::Def) | Some(Tok::Class))
                        && DANGEROUS_BUILTINS.contains(&name.as_str())
                    {
                        violations.push(violation(
                            source,
                            *offset,
                            ViolationKind::DangerousCall,
                            format!("call to dangerous builtin '{}' is not allowed", name),
                        ));
                    }
                }
            },
            _ => {}
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
