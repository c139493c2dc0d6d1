use crate::language::ast::Location;
use crate::language::loader::LoadError;
use miette::Report;

pub fn report_load_error(error: LoadError) {
    eprintln!("{:?}", Report::new(error));
}

/// Print an interpreter diagnostic in the fixed format consumers of this
/// tool expect. Goes to stdout, not stderr.
pub fn report_runtime_error(source: Option<&str>, location: &Location, message: &str) {
    print!("{}", render_runtime_error(source, location, message));
}

pub fn render_runtime_error(source: Option<&str>, location: &Location, message: &str) -> String {
    match source {
        Some(code) if !code.is_empty() => {
            let bytes = code.as_bytes();
            let start = location.start.min(bytes.len());
            let end = location.end.clamp(start, bytes.len());
            let (line, col) = line_and_column(bytes, start);
            let slice = String::from_utf8_lossy(&bytes[start..end]);
            format!(
                "\nError in file: '{}', line: {}, col: {}\n{}\n\n... {} ...\n\n\n",
                location.filename, line, col, message, slice
            )
        }
        _ => format!(
            "\nError in file: '{}' (source code not found)\n\n... {} ...\n\n\n",
            location.filename, message
        ),
    }
}

/// 1-based line and column of a byte offset.
fn line_and_column(code: &[u8], offset: usize) -> (usize, usize) {
    let prefix = &code[..offset];
    let line = prefix.iter().filter(|byte| **byte == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map(|index| index + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(start: usize, end: usize) -> Location {
        Location {
            filename: "demo.rinha".into(),
            start,
            end,
        }
    }

    #[test]
    fn renders_line_column_and_source_slice() {
        let source = "let x = 1;\nprint(first(x))";
        // `first(x)` starts at byte 17, line 2.
        let rendered = render_runtime_error(
            Some(source),
            &location(17, 25),
            "Invalid tuple operation: first(<int>)",
        );
        assert_eq!(
            rendered,
            "\nError in file: 'demo.rinha', line: 2, col: 7\nInvalid tuple operation: first(<int>)\n\n... first(x) ...\n\n\n"
        );
    }

    #[test]
    fn first_line_columns_are_one_based() {
        let rendered = render_runtime_error(Some("print(1)"), &location(0, 8), "var not found");
        assert!(rendered.contains("line: 1, col: 1\n"));
        assert!(rendered.contains("... print(1) ..."));
    }

    #[test]
    fn missing_source_uses_the_fallback_form() {
        let rendered = render_runtime_error(None, &location(0, 3), "var not found");
        assert_eq!(
            rendered,
            "\nError in file: 'demo.rinha' (source code not found)\n\n... var not found ...\n\n\n"
        );
    }

    #[test]
    fn out_of_range_offsets_are_clamped() {
        let rendered = render_runtime_error(Some("abc"), &location(10, 20), "var not found");
        assert!(rendered.contains("...  ..."));
    }
}
