//! Line tokenizer. Splits one source line into raw string tokens,
//! treating a double-quoted string and a bracketed array literal each as a
//! single token.

use crate::error::CompileError;

/// Tokenizes a single source line. `line_no` is the 1-based original
/// source line number, used to annotate compile errors.
pub fn tokenize_line(line: &str, line_no: usize) -> std::result::Result<Vec<String>, CompileError> {
    let chars: Vec<char> = line.chars().collect();
    let n = chars.len();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < n {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        if chars[i] == '"' {
            let start = i;
            i += 1;
            let mut closed = false;
            while i < n {
                if chars[i] == '\\' && i + 1 < n {
                    i += 2;
                    continue;
                }
                if chars[i] == '"' {
                    i += 1;
                    closed = true;
                    break;
                }
                i += 1;
            }
            if !closed {
                return Err(CompileError::UnterminatedString { line: line_no });
            }
            tokens.push(chars[start..i].iter().collect());
        } else if chars[i] == '[' {
            let start = i;
            i += 1;
            let mut closed = false;
            while i < n {
                if chars[i] == ']' {
                    i += 1;
                    closed = true;
                    break;
                }
                i += 1;
            }
            if !closed {
                return Err(CompileError::UnterminatedArray { line: line_no });
            }
            tokens.push(chars[start..i].iter().collect());
        } else {
            let start = i;
            while i < n && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }

    Ok(tokens)
}
