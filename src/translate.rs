//! C-subset to assembly translation.
//!
//! Line-pattern substitution over a restricted C-like syntax: no
//! lexing, no parsing, no AST. Each input line is matched against an
//! ordered pattern list; the first match emits one or more assembly
//! lines, `// …` comments carry over as `# …`, `#include "file"`
//! recurses into the included file, and anything unmatched is
//! preserved as a comment so the surrounding program still assembles.
//!
//! ```text
//! int r0 = 5;          →  mov r0 5
//! r2 = r0 + r1;        →  mov r2 0 / add r2 r0 / add r2 r1
//! memory[10] = r2;     →  store r2 10
//! return 0;            →  halt
//! ```

use std::io;
use std::path::Path;

/// Translate a file, following `#include` lines relative to it.
pub fn translate_file(path: &Path) -> io::Result<Vec<String>> {
    let source = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    translate_lines(&source, base, &mut out);
    Ok(out)
}

/// Translate a source text; includes resolve relative to `base`.
pub fn translate_lines(source: &str, base: &Path, out: &mut Vec<String>) {
    for raw in source.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("#include") {
            process_include(line, base, out);
            continue;
        }

        if let Some(rest) = line.strip_prefix("//") {
            out.push(format!("#{}", rest));
            continue;
        }

        translate_line(line, out);
    }
}

fn process_include(line: &str, base: &Path, out: &mut Vec<String>) {
    let Some(header) = line.split('"').nth(1) else {
        return;
    };
    let path = base.join(header);
    match std::fs::read_to_string(&path) {
        Ok(source) => {
            let nested_base = path.parent().unwrap_or_else(|| Path::new("."));
            translate_lines(&source, nested_base, out);
        }
        Err(_) => eprintln!("Could not open {}", path.display()),
    }
}

/// Translate one statement. Always emits at least one line; unmatched
/// input becomes a comment.
pub fn translate_line(line: &str, out: &mut Vec<String>) {
    // Declaration / assignment from a literal.
    if let Some([reg, value]) = capture(line, "int r{} = {};") {
        out.push(format!("mov r{} {}", reg, value));
        return;
    }
    if let Some([reg, value]) = capture(line, "r{} = {};") {
        out.push(format!("mov r{} {}", reg, value));
        return;
    }

    // Three-register arithmetic, expanded through the destination.
    for (symbol, op) in [("+", "add"), ("-", "sub"), ("*", "mul"), ("/", "udiv")] {
        let pattern = format!("r{{}} = r{{}} {} r{{}};", symbol);
        if let Some([dst, src1, src2]) = capture(line, &pattern) {
            out.push(format!("mov r{} 0", dst));
            out.push(format!("add r{} r{}", dst, src1));
            out.push(format!("{} r{} r{}", op, dst, src2));
            return;
        }
    }

    // printf -> PRINT REG.
    if line.contains("printf") {
        if let Some([reg]) = capture(line, "printf(\"%d\", r{});")
            .or_else(|| capture(line, "printf(\"reg: %d\", r{});"))
        {
            out.push(format!("print reg {}", reg));
            return;
        }
    }

    // scanf -> IN.
    if let Some([reg]) = capture(line, "scanf(\"%d\", &r{});") {
        out.push(format!("in r{}", reg));
        return;
    }

    // Memory traffic.
    if let Some([addr, reg]) = capture(line, "memory[{}] = r{};") {
        out.push(format!("store r{} {}", reg, addr));
        return;
    }
    if let Some([reg, addr]) = capture(line, "r{} = memory[{}];") {
        out.push(format!("load r{} {}", reg, addr));
        return;
    }

    if squeeze(line).contains("return0;") {
        out.push("halt".to_string());
        return;
    }

    // Shifts by a literal.
    if let Some([dst, src, shift]) = capture(line, "r{} = r{} << {};") {
        out.push(format!("mov r{} 0", dst));
        out.push(format!("add r{} r{}", dst, src));
        out.push(format!("lsl r{} {}", dst, shift));
        return;
    }
    if let Some([dst, src, shift]) = capture(line, "r{} = r{} >> {};") {
        out.push(format!("mov r{} 0", dst));
        out.push(format!("add r{} r{}", dst, src));
        out.push(format!("lsr r{} {}", dst, shift));
        return;
    }

    // Stack and calls.
    if let Some([reg]) = capture(line, "push(r{});") {
        out.push(format!("push r{}", reg));
        return;
    }
    if let Some([reg]) = capture(line, "pop(r{});") {
        out.push(format!("pop r{}", reg));
        return;
    }
    if let Some([target]) = capture(line, "call({});") {
        out.push(format!("call {}", target));
        return;
    }
    if squeeze(line).contains("ret();") {
        out.push("ret".to_string());
        return;
    }
    if squeeze(line).contains("exit(0);") {
        out.push("halt".to_string());
        return;
    }

    if let Some([dst, src, len]) = capture(line, "memcpy({}, {}, {});") {
        out.push(format!("memcpy {} {} {}", dst, src, len));
        return;
    }

    // No pattern applies; keep the line visible as a comment.
    out.push(format!("# {}", line));
}

/// Drop every whitespace byte.
fn squeeze(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Match `line` against `pattern`, whitespace-insensitively. Each `{}`
/// captures a decimal integer (optional leading `-`); literal text
/// must match exactly and trailing input is ignored.
fn capture<const N: usize>(line: &str, pattern: &str) -> Option<[i64; N]> {
    let line: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let pattern: Vec<u8> = pattern.bytes().filter(|b| !b.is_ascii_whitespace()).collect();

    let mut values = [0i64; N];
    let mut found = 0;
    let mut i = 0;
    let mut j = 0;

    while j < pattern.len() {
        if pattern[j] == b'{' && pattern.get(j + 1) == Some(&b'}') {
            let negative = line.get(i) == Some(&b'-');
            if negative {
                i += 1;
            }
            let digits_start = i;
            while i < line.len() && line[i].is_ascii_digit() {
                i += 1;
            }
            if i == digits_start || found >= N {
                return None;
            }
            let mut value: i64 = 0;
            for &b in &line[digits_start..i] {
                value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
            }
            values[found] = if negative { -value } else { value };
            found += 1;
            j += 2;
        } else {
            if line.get(i) != Some(&pattern[j]) {
                return None;
            }
            i += 1;
            j += 1;
        }
    }

    (found == N).then_some(values)
}
