//! Flat line-oriented text produced by the format readers.

/// Document content as an ordered list of non-blank lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatText {
    lines: Vec<String>,
}

impl FlatText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits free text on newlines, dropping blank lines.
    pub fn from_text(text: &str) -> Self {
        let mut flat = Self::new();
        for line in text.lines() {
            flat.push_line(line);
        }
        flat
    }

    pub fn push_line(&mut self, line: &str) {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            self.lines.push(line);
        }
    }

    /// Appends a table row with cells joined by `separator`; empty cells
    /// are skipped.
    pub fn push_row<I, S>(&mut self, cells: I, separator: &str)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let row: Vec<String> = cells
            .into_iter()
            .map(|cell| cell.as_ref().trim().to_string())
            .filter(|cell| !cell.is_empty())
            .collect();
        if !row.is_empty() {
            self.lines.push(row.join(separator));
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_blank(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|line| line.chars().count() + 1).sum()
    }

    pub fn as_text(&self) -> String {
        self.lines.join("\n")
    }

    /// First `max_chars` characters, cut on a line boundary.
    pub fn truncated(&self, max_chars: usize) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if out.chars().count() + line.chars().count() + 1 > max_chars {
                break;
            }
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// The first line containing `needle`, case-insensitively.
    pub fn line_containing(&self, needle: &str) -> Option<&str> {
        let needle = needle.to_lowercase();
        if needle.trim().is_empty() {
            return None;
        }
        self.lines
            .iter()
            .find(|line| line.to_lowercase().contains(&needle))
            .map(String::as_str)
    }
}
