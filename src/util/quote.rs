//! Shell quoting for values bound into command templates.
//!
//! Quoting happens at binding time; the substitution engine itself never
//! escapes anything.

use std::path::Path;

/// Quote a value for the shell the commands will run under.
pub fn quote_shell(s: &str) -> String {
    if cfg!(windows) {
        quote_windows(s)
    } else {
        quote_posix(s)
    }
}

/// Quote a path for the shell the commands will run under.
pub fn quote_path(p: &Path) -> String {
    quote_shell(&p.display().to_string())
}

/// POSIX sh quoting: safe strings pass through, everything else is wrapped
/// in single quotes with embedded quotes escaped.
pub fn quote_posix(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    let safe = s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "%+-./_:=@,".contains(c));
    if safe {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\"'\"'");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// cmd.exe-style quoting: wrap when needed, doubling backslashes that
/// precede a double quote and escaping the quote itself.
pub fn quote_windows(s: &str) -> String {
    let needs_quote = s.is_empty() || s.contains(' ') || s.contains('\t') || s.contains('"');
    if !needs_quote {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut backslashes = 0usize;
    for c in s.chars() {
        match c {
            '\\' => {
                backslashes += 1;
                out.push('\\');
            }
            '"' => {
                // Backslashes directly before a quote must be doubled.
                for _ in 0..backslashes {
                    out.push('\\');
                }
                backslashes = 0;
                out.push_str("\\\"");
            }
            _ => {
                backslashes = 0;
                out.push(c);
            }
        }
    }
    for _ in 0..backslashes {
        out.push('\\');
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_safe_passthrough() {
        assert_eq!(quote_posix("/usr/lib/caravel"), "/usr/lib/caravel");
        assert_eq!(quote_posix("-O3"), "-O3");
    }

    #[test]
    fn test_posix_space() {
        assert_eq!(quote_posix("my file.c"), "'my file.c'");
    }

    #[test]
    fn test_posix_embedded_quote() {
        assert_eq!(quote_posix("it's"), "'it'\"'\"'s'");
    }

    #[test]
    fn test_posix_empty() {
        assert_eq!(quote_posix(""), "''");
    }

    #[test]
    fn test_windows_plain() {
        assert_eq!(quote_windows("cl.exe"), "cl.exe");
    }

    #[test]
    fn test_windows_space() {
        assert_eq!(quote_windows("C:\\My Tools\\cl.exe"), "\"C:\\My Tools\\cl.exe\"");
    }

    #[test]
    fn test_windows_trailing_backslash() {
        assert_eq!(quote_windows("dir with space\\"), "\"dir with space\\\\\"");
    }
}
