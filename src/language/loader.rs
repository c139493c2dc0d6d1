use crate::language::ast::ProgramAst;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Name of the external source-to-AST parser, resolved through PATH.
const PARSER_BINARY: &str = "rinha.exe";

pub struct LoadedProgram {
    pub ast: ProgramAst,
    /// Original `.rinha` text, when available, for diagnostic rendering.
    pub source: Option<String>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("failed to run `rinha.exe` on {}", path.display())]
    Parser {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("`rinha.exe` rejected {}", path.display())]
    #[diagnostic(help("{stderr}"))]
    ParserFailed { path: PathBuf, stderr: String },
    #[error("malformed AST: {message}")]
    MalformedAst {
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid here")]
        span: SourceSpan,
        message: String,
    },
}

/// Turn a file path into an AST plus the source text used for error
/// rendering. `.json` files are decoded directly; anything else is treated
/// as rinha source, handed to the external parser, and the resulting JSON
/// is cached next to the source.
pub fn load(path: &Path) -> Result<LoadedProgram, LoadError> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        let text = fs::read_to_string(path).map_err(|error| LoadError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let ast = decode(path, text)?;
        let source = fs::read_to_string(companion_source(path)).ok();
        Ok(LoadedProgram { ast, source })
    } else {
        let output = Command::new(PARSER_BINARY)
            .arg(path)
            .output()
            .map_err(|error| LoadError::Parser {
                path: path.to_path_buf(),
                error,
            })?;
        if !output.status.success() {
            return Err(LoadError::ParserFailed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        let cache = cache_path(path);
        let _ = fs::write(&cache, &text);
        let ast = decode(&cache, text)?;
        let source = fs::read_to_string(path).ok();
        Ok(LoadedProgram { ast, source })
    }
}

/// Decode AST bytes that came from somewhere other than a file on disk.
pub fn decode_str(origin: &Path, text: &str) -> Result<ProgramAst, LoadError> {
    decode(origin, text.to_owned())
}

fn decode(origin: &Path, text: String) -> Result<ProgramAst, LoadError> {
    match serde_json::from_str(&text) {
        Ok(ast) => Ok(ast),
        Err(err) => {
            let offset = offset_of(&text, err.line(), err.column());
            Err(LoadError::MalformedAst {
                message: err.to_string(),
                span: SourceSpan::from((offset, 1usize.min(text.len().saturating_sub(offset)))),
                src: NamedSource::new(origin.display().to_string(), text),
            })
        }
    }
}

/// `foo.rinha` caches as `foo.json`.
fn cache_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match raw.strip_suffix("rinha") {
        Some(stem) => PathBuf::from(format!("{stem}json")),
        None => path.with_extension("json"),
    }
}

/// The `.rinha` file that pairs with an AST dump: strip the `.json` suffix
/// and, unless the remainder already names a rinha file (the
/// `source.rinha.json` convention), append `.rinha`.
fn companion_source(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let stem = raw.strip_suffix(".json").unwrap_or(&raw);
    if stem.ends_with(".rinha") {
        PathBuf::from(stem)
    } else {
        PathBuf::from(format!("{stem}.rinha"))
    }
}

fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let mut skip = line.saturating_sub(1);
    let mut offset = 0;
    for (index, byte) in text.bytes().enumerate() {
        if skip == 0 {
            break;
        }
        if byte == b'\n' {
            skip -= 1;
            offset = index + 1;
        }
    }
    (offset + column.saturating_sub(1)).min(text.len())
}
