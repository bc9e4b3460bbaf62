use std::fs;
use std::path::Path;

/// (file, line number, line)
type Finding = (String, usize, String);

#[test]
fn no_todo_comments() {
    let findings = scan(|line, _in_tests| is_todo_in_comment(line));
    report(&findings, "todo comments must be removed before tests pass");
}

#[test]
fn no_panicking_unwraps_outside_tests() {
    let findings = scan(|line, in_tests| {
        !in_tests && !line.trim_start().starts_with("//") && (line.contains(".unwrap()") || line.contains(".expect("))
    });
    report(&findings, "propagate errors instead of unwrapping in non-test code");
}

fn report(findings: &[Finding], message: &str) {
    if !findings.is_empty() {
        eprintln!("\nfound {} offending line(s):", findings.len());
        for (file, line_num, line) in findings {
            eprintln!("  {}:{}: {}", file, line_num, line.trim());
        }
        panic!("{message}");
    }
}

fn scan(check: impl Fn(&str, bool) -> bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let src_dir = Path::new("src");
    if src_dir.exists() {
        search_dir(src_dir, &check, &mut findings);
    }
    findings
}

fn search_dir(dir: &Path, check: &impl Fn(&str, bool) -> bool, findings: &mut Vec<Finding>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                search_dir(&path, check, findings);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                search_file(&path, check, findings);
            }
        }
    }
}

fn search_file(path: &Path, check: &impl Fn(&str, bool) -> bool, findings: &mut Vec<Finding>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    // test submodules live in tests.rs, inline ones start at #[cfg(test)]
    let mut in_tests = path.file_name().and_then(|s| s.to_str()) == Some("tests.rs");
    for (line_num, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            in_tests = true;
        }
        if check(line, in_tests) {
            findings.push((path.display().to_string(), line_num + 1, line.to_string()));
        }
    }
}

fn is_todo_in_comment(line: &str) -> bool {
    let line_upper = line.to_uppercase();

    // line comments: // TODO
    if let Some(comment_pos) = line.find("//")
        && line_upper[comment_pos..].contains("TODO")
    {
        return true;
    }

    // block comments: /* TODO */
    if let Some(block_start) = line.find("/*")
        && line_upper[block_start..].contains("TODO")
    {
        return true;
    }

    // block comment continuation lines (e.g., " * TODO")
    let trimmed = line.trim_start();
    trimmed.starts_with('*') && !trimmed.starts_with("*/") && line_upper.contains("TODO")
}
