//! # Output Writer
//!
//! Turns the developer agent's raw response into files on disk.
//!
//! The only structure imposed on the response is a marker line per file:
//!
//! ```text
//! === FILE: src/app.py ===
//! from flask import Flask
//! ...
//! === FILE: SUMMARY.md ===
//! # What was built
//! ```
//!
//! Everything under a marker up to the next marker is that file's content. A
//! content block that is a single fenced code block loses its fence lines.
//! A response without any marker is kept whole as one Markdown file.

use crate::plan::{create_unique, TIMESTAMP_FORMAT};
use chrono::{DateTime, Local};
use plancraft_error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Opening of a file marker line; the line closes with `===`.
pub const FILE_MARKER: &str = "=== FILE:";
const MARKER_CLOSE: &str = "===";

/// One file extracted from a model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path exactly as the model wrote it
    pub path: String,
    pub content: String,
}

/// Result of splitting a response on file markers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub files: Vec<GeneratedFile>,
    /// Text before the first marker
    pub preamble: String,
}

/// What a write pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    /// Paths refused because they would escape the output directory
    pub rejected: Vec<String>,
}

/// Path named by a marker line, if `line` is one.
fn marker_path(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(FILE_MARKER)?;
    let path = rest.strip_suffix(MARKER_CLOSE)?;
    Some(path.trim().trim_matches('`').trim())
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn is_closing_fence(line: &str) -> bool {
    line.trim() == "```"
}

/// `lines` without leading and trailing blank lines.
fn trim_blank<'a, 'b>(lines: &'a [&'b str]) -> &'a [&'b str] {
    let Some(start) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return &[];
    };
    let end = lines.iter().rposition(|l| !l.trim().is_empty()).unwrap_or(start);
    &lines[start..=end]
}

/// Drop surrounding blank lines and, if what's left is one fenced block, the fences.
fn clean_content(lines: &[&str]) -> String {
    let mut body = trim_blank(lines);

    // Only a single block: any fence line inside means several blocks
    if body.len() >= 2
        && is_fence(body[0])
        && is_closing_fence(body[body.len() - 1])
        && !body[1..body.len() - 1].iter().any(|l| is_fence(l))
    {
        body = trim_blank(&body[1..body.len() - 1]);
    }

    if body.is_empty() {
        return String::new();
    }
    let mut content = body.join("\n");
    content.push('\n');
    content
}

/// Split a developer response into files. A later block for the same path
/// replaces the earlier one.
pub fn parse_generated_files(text: &str) -> ParsedOutput {
    let lines: Vec<&str> = text.lines().collect();
    let markers: Vec<(usize, &str)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| marker_path(line).map(|path| (i, path)))
        .collect();

    let (Some(&(first, _)), Some(&(last_marker, _))) = (markers.first(), markers.last()) else {
        return ParsedOutput {
            files: Vec::new(),
            preamble: text.to_string(),
        };
    };

    // A fence opened before the first marker wraps the whole response; its
    // closing line is not part of the last file. The last file's fences must
    // be unbalanced for that line to belong to the wrapper.
    let mut end_of_files = lines.len();
    if trim_blank(&lines[..first]).last().is_some_and(|l| is_fence(l)) {
        if let Some(close) = lines.iter().rposition(|l| !l.trim().is_empty()) {
            if close > last_marker && is_closing_fence(lines[close]) {
                let fences = lines[last_marker + 1..=close].iter().filter(|l| is_fence(l)).count();
                if fences % 2 == 1 {
                    end_of_files = close;
                }
            }
        }
    }

    let mut files: Vec<GeneratedFile> = Vec::new();
    for (n, &(line_no, path)) in markers.iter().enumerate() {
        let end = markers.get(n + 1).map(|&(next, _)| next).unwrap_or(end_of_files);
        let file = GeneratedFile {
            path: path.to_string(),
            content: clean_content(&lines[line_no + 1..end]),
        };
        match files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => files.push(file),
        }
    }

    ParsedOutput {
        files,
        preamble: lines[..first].join("\n").trim().to_string(),
    }
}

/// Normalize a model-supplied path, refusing anything that could leave the
/// output directory.
pub fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    if path.is_absolute() {
        return None;
    }

    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Writes generated files under one directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Create the writer, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| Error::io("output::new", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every parsed file, skipping unsafe paths.
    pub fn write(&self, parsed: &ParsedOutput) -> Result<WriteReport> {
        let mut report = WriteReport::default();

        for file in &parsed.files {
            let Some(relative) = safe_relative_path(&file.path) else {
                tracing::warn!(path = %file.path, "refusing to write outside the output directory");
                report.rejected.push(file.path.clone());
                continue;
            };
            let target = self.dir.join(relative);
            self.write_file(&target, &file.content)?;
            report.written.push(target);
        }

        Ok(report)
    }

    /// Parse and write a raw response. Without markers the whole response
    /// becomes `implementation_<timestamp>.md`.
    pub fn write_response(&self, response: &str, now: DateTime<Local>) -> Result<WriteReport> {
        let parsed = parse_generated_files(response);
        if !parsed.preamble.is_empty() && !parsed.files.is_empty() {
            tracing::debug!(chars = parsed.preamble.len(), "discarding text before the first file marker");
        }

        if parsed.files.is_empty() {
            tracing::warn!("response has no file markers, saving it as a single document");
            let stem = format!("implementation_{}", now.format(TIMESTAMP_FORMAT));
            let mut content = response.trim_end().to_string();
            content.push('\n');
            let target = create_unique(&self.dir, &stem, "md", &content, "output::write")?;
            tracing::debug!(path = %target.display(), bytes = content.len(), "wrote file");
            return Ok(WriteReport {
                written: vec![target],
                rejected: Vec::new(),
            });
        }

        self.write(&parsed)
    }

    fn write_file(&self, target: &Path, content: &str) -> Result<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("output::write", parent, e))?;
        }
        std::fs::write(target, content).map_err(|e| Error::io("output::write", target, e))?;
        tracing::debug!(path = %target.display(), bytes = content.len(), "wrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const RESPONSE: &str = "Here is the implementation.\n\
        \n\
        === FILE: app.py ===\n\
        ```python\n\
        print('hello')\n\
        ```\n\
        \n\
        === FILE: `src/models/user.py` ===\n\
        class User:\n\
        \x20   pass\n\
        === FILE: SUMMARY.md ===\n\
        # Summary\n\
        Run `python app.py`.\n";

    #[test]
    fn test_marker_path() {
        assert_eq!(marker_path("=== FILE: a/b.rs ==="), Some("a/b.rs"));
        assert_eq!(marker_path("  === FILE:`x.md`===  "), Some("x.md"));
        assert_eq!(marker_path("=== FILE: missing close"), None);
        assert_eq!(marker_path("FILE: a.rs"), None);
    }

    #[test]
    fn test_parse_splits_on_markers() {
        let parsed = parse_generated_files(RESPONSE);

        assert_eq!(parsed.preamble, "Here is the implementation.");
        let paths: Vec<&str> = parsed.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["app.py", "src/models/user.py", "SUMMARY.md"]);

        assert_eq!(parsed.files[0].content, "print('hello')\n");
        assert_eq!(parsed.files[1].content, "class User:\n    pass\n");
        assert_eq!(parsed.files[2].content, "# Summary\nRun `python app.py`.\n");
    }

    #[test]
    fn test_parse_keeps_inner_fences() {
        let text = "=== FILE: README.md ===\n# Title\n```sh\nmake\n```\nDone.\n";
        let parsed = parse_generated_files(text);
        assert_eq!(parsed.files[0].content, "# Title\n```sh\nmake\n```\nDone.\n");
    }

    #[test]
    fn test_parse_keeps_several_blocks() {
        let text = "=== FILE: README.md ===\n```sh\nmake\n```\n```sh\nmake test\n```\n";
        let parsed = parse_generated_files(text);
        assert_eq!(parsed.files[0].content, "```sh\nmake\n```\n```sh\nmake test\n```\n");
    }

    #[test]
    fn test_parse_trims_blank_lines_inside_fence() {
        let text = "=== FILE: a.py ===\n```\n\ncode\n\n```\n";
        let parsed = parse_generated_files(text);
        assert_eq!(parsed.files[0].content, "code\n");
    }

    #[test]
    fn test_parse_response_wrapped_in_fence() {
        let text = "Sure:\n```\n=== FILE: a.py ===\nprint(1)\n=== FILE: b.py ===\nprint(2)\n```\n";
        let parsed = parse_generated_files(text);

        assert_eq!(parsed.files[0].content, "print(1)\n");
        assert_eq!(parsed.files[1].content, "print(2)\n");
    }

    #[test]
    fn test_parse_wrapped_response_with_fenced_last_file() {
        let text = "```\n=== FILE: a.py ===\n```python\nprint(1)\n```\n```\n";
        let parsed = parse_generated_files(text);
        assert_eq!(parsed.files[0].content, "print(1)\n");
    }

    #[test]
    fn test_parse_unclosed_wrapper_keeps_last_file_fence() {
        let text = "```\n=== FILE: a.py ===\n```python\nprint(1)\n```\n";
        let parsed = parse_generated_files(text);
        assert_eq!(parsed.files[0].content, "print(1)\n");
    }

    #[test]
    fn test_parse_later_duplicate_wins() {
        let text = "=== FILE: a.txt ===\nold\n=== FILE: b.txt ===\nb\n=== FILE: a.txt ===\nnew\n";
        let parsed = parse_generated_files(text);

        assert_eq!(parsed.files.len(), 2);
        assert_eq!(parsed.files[0].path, "a.txt");
        assert_eq!(parsed.files[0].content, "new\n");
    }

    #[test]
    fn test_parse_without_markers() {
        let parsed = parse_generated_files("just prose");
        assert!(parsed.files.is_empty());
        assert_eq!(parsed.preamble, "just prose");
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(safe_relative_path("./src/main.rs"), Some(PathBuf::from("src/main.rs")));
        assert_eq!(safe_relative_path("../escape.txt"), None);
        assert_eq!(safe_relative_path("a/../../b"), None);
        assert_eq!(safe_relative_path("/etc/passwd"), None);
        assert_eq!(safe_relative_path(""), None);
        assert_eq!(safe_relative_path("."), None);
    }

    #[test]
    fn test_write_creates_nested_files() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path().join("output")).unwrap();

        let report = writer.write_response(RESPONSE, Local::now()).unwrap();

        assert_eq!(report.written.len(), 3);
        assert!(report.rejected.is_empty());
        let user = tmp.path().join("output/src/models/user.py");
        assert_eq!(std::fs::read_to_string(user).unwrap(), "class User:\n    pass\n");
        assert!(report.written.iter().all(|p| p.starts_with(writer.dir())));
    }

    #[test]
    fn test_write_rejects_escaping_paths() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path().join("output")).unwrap();

        let text = "=== FILE: ../outside.txt ===\nnope\n=== FILE: ok.txt ===\nyes\n";
        let report = writer.write_response(text, Local::now()).unwrap();

        assert_eq!(report.rejected, ["../outside.txt"]);
        assert_eq!(report.written, [tmp.path().join("output/ok.txt")]);
        assert!(!tmp.path().join("outside.txt").exists());
    }

    #[test]
    fn test_write_response_without_markers() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path()).unwrap();
        let now = Local.with_ymd_and_hms(2025, 1, 14, 10, 0, 0).unwrap();

        let report = writer.write_response("Some code\n\n\n", now).unwrap();

        let expected = tmp.path().join("implementation_20250114_100000.md");
        assert_eq!(report.written, [expected.clone()]);
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "Some code\n");
    }

    #[test]
    fn test_write_response_without_markers_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path()).unwrap();
        let now = Local.with_ymd_and_hms(2025, 1, 14, 10, 0, 0).unwrap();

        writer.write_response("first run", now).unwrap();
        let report = writer.write_response("second run", now).unwrap();

        let first = tmp.path().join("implementation_20250114_100000.md");
        let second = tmp.path().join("implementation_20250114_100000_1.md");
        assert_eq!(report.written, [second.clone()]);
        assert_eq!(std::fs::read_to_string(first).unwrap(), "first run\n");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "second run\n");
    }
}
