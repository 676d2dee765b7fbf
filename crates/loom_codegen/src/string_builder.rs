//! Indented line builder for generated source.

const INDENT: &str = "    ";

/// Line-oriented buffer with an indentation level.
///
/// Preprocessor directives (`#if`, `#endif`, ...) are always written at
/// column 0.
#[derive(Debug, Default, Clone)]
pub struct ShaderStringBuilder {
    buf: String,
    indent: usize,
}

impl ShaderStringBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn deindent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Appends one line at the current indentation. Empty lines carry no indent.
    pub fn append_line(&mut self, line: &str) {
        if !line.is_empty() && !line.starts_with('#') {
            for _ in 0..self.indent {
                self.buf.push_str(INDENT);
            }
        }
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    pub fn append_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        match args.as_str() {
            Some(line) => self.append_line(line),
            None => self.append_line(&args.to_string()),
        }
    }

    /// Appends every line of `text`, each at the current indentation.
    pub fn append_lines(&mut self, text: &str) {
        for line in text.lines() {
            self.append_line(line.trim_end());
        }
    }

    /// Appends `text` verbatim.
    pub fn append_raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_ignore_indentation() {
        let mut sb = ShaderStringBuilder::new();
        sb.append_line("{");
        sb.indent();
        sb.append_line("#if FOO");
        sb.append_line("float x;");
        sb.append_line("#endif");
        sb.append_line("");
        sb.deindent();
        sb.append_line("}");
        assert_eq!(sb.finish(), "{\n#if FOO\n    float x;\n#endif\n\n}\n");
    }

    #[test]
    fn test_append_lines_indents_each_line() {
        let mut sb = ShaderStringBuilder::new();
        sb.indent();
        sb.append_lines("a;\nb;  \n");
        assert_eq!(sb.as_str(), "    a;\n    b;\n");
    }
}
