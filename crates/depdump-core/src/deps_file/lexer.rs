//! Tokenizer for DEPS files

use super::DepsFileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Name(String),
    Str(String),
    Int(i128),
    Float(f64),
    /// Single-character punctuation: `( ) [ ] { } , : = + - ;`
    Punct(char),
    /// End of a logical line.
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Splits DEPS source into tokens.
///
/// Physical lines inside brackets (or after a trailing backslash) are joined
/// into one logical line, and blank or comment-only lines produce no tokens.
pub(crate) struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    depth: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, DepsFileError> {
        while let Some(c) = self.peek() {
            match c {
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        self.end_logical_line();
                    }
                }
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.bump();
                }
                '#' => {
                    while matches!(self.peek(), Some(c) if c != '\n') {
                        self.bump();
                    }
                }
                '\\' => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    if self.peek() == Some('\r') {
                        self.bump();
                    }
                    if self.peek() != Some('\n') {
                        return Err(DepsFileError::syntax(
                            line,
                            column,
                            "unexpected character after line continuation",
                        ));
                    }
                    self.bump();
                }
                '(' | '[' | '{' => {
                    self.push_punct(c);
                    self.depth += 1;
                }
                ')' | ']' | '}' => {
                    if self.depth == 0 {
                        return Err(DepsFileError::syntax(
                            self.line,
                            self.column,
                            format!("unmatched '{c}'"),
                        ));
                    }
                    self.push_punct(c);
                    self.depth -= 1;
                }
                ',' | ':' | '=' | '+' | '-' | ';' => self.push_punct(c),
                '\'' | '"' => self.string(false)?,
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                c if is_name_start(c) => self.name_or_prefixed_string()?,
                other => {
                    return Err(DepsFileError::syntax(
                        self.line,
                        self.column,
                        format!("invalid character '{other}'"),
                    ))
                }
            }
        }

        if self.depth > 0 {
            return Err(DepsFileError::syntax(
                self.line,
                self.column,
                "unexpected end of file inside brackets",
            ));
        }
        self.end_logical_line();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
            column: self.column,
        });
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn push_punct(&mut self, c: char) {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.push(TokenKind::Punct(c), line, column);
    }

    fn end_logical_line(&mut self) {
        match self.tokens.last() {
            None => {}
            Some(token) if token.kind == TokenKind::Newline => {}
            Some(token) => {
                let (line, column) = (token.line, token.column);
                self.push(TokenKind::Newline, line, column);
            }
        }
    }

    fn take_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_continue(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn at_statement_start(&self) -> bool {
        self.depth == 0
            && self
                .tokens
                .last()
                .map_or(true, |token| token.kind == TokenKind::Newline)
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), DepsFileError> {
        let (line, column) = (self.line, self.column);
        let statement_start = self.at_statement_start();
        let name = self.take_name();

        if name == "def" && statement_start && column == 1 {
            return self.def_block(line, column);
        }

        if matches!(self.peek(), Some('\'' | '"')) {
            let lower = name.to_ascii_lowercase();
            return match lower.as_str() {
                "r" => self.string_at(true, line, column),
                "u" => self.string_at(false, line, column),
                "b" | "br" | "rb" => Err(DepsFileError::syntax(
                    line,
                    column,
                    "byte strings are not supported",
                )),
                "f" | "fr" | "rf" => Err(DepsFileError::syntax(
                    line,
                    column,
                    "f-strings are not supported",
                )),
                _ => Err(DepsFileError::syntax(
                    line,
                    column,
                    format!("invalid string prefix '{name}'"),
                )),
            };
        }

        self.push(TokenKind::Name(name), line, column);
        Ok(())
    }

    /// Emits `def NAME` and skips the rest of the block as raw text.
    ///
    /// Helper bodies may use any Python syntax, so only the header's name is
    /// tokenized. The block ends at the first line that starts in column 1
    /// outside brackets and strings.
    fn def_block(&mut self, line: usize, column: usize) -> Result<(), DepsFileError> {
        self.push(TokenKind::Name("def".to_string()), line, column);

        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
        if self.peek().is_some_and(is_name_start) {
            let (name_line, name_column) = (self.line, self.column);
            let name = self.take_name();
            self.push(TokenKind::Name(name), name_line, name_column);
        }

        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '\n' => {
                    self.bump();
                    if depth == 0
                        && matches!(self.peek(), Some(c) if !matches!(c, ' ' | '\t' | '\r' | '\x0c' | '\n' | '#'))
                    {
                        break;
                    }
                }
                '#' => {
                    while matches!(self.peek(), Some(c) if c != '\n') {
                        self.bump();
                    }
                }
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '\'' | '"' => self.skip_string()?,
                '(' | '[' | '{' => {
                    depth += 1;
                    self.bump();
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }

        self.end_logical_line();
        Ok(())
    }

    fn skip_string(&mut self) -> Result<(), DepsFileError> {
        let (line, column) = (self.line, self.column);
        let quote = self.bump().unwrap_or('\'');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        loop {
            match self.bump() {
                None => {
                    return Err(DepsFileError::syntax(line, column, "unterminated string literal"))
                }
                Some('\\') => {
                    self.bump();
                }
                Some('\n') if !triple => {
                    return Err(DepsFileError::syntax(line, column, "unterminated string literal"))
                }
                Some(c) if c == quote => {
                    if !triple {
                        return Ok(());
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.bump();
                        self.bump();
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn string(&mut self, raw: bool) -> Result<(), DepsFileError> {
        let (line, column) = (self.line, self.column);
        self.string_at(raw, line, column)
    }

    fn string_at(&mut self, raw: bool, line: usize, column: usize) -> Result<(), DepsFileError> {
        let quote = self.bump().unwrap_or('\'');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(DepsFileError::syntax(line, column, "unterminated string literal"));
            };
            match c {
                c if c == quote => {
                    if !triple {
                        break;
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.bump();
                        self.bump();
                        break;
                    }
                    value.push(c);
                }
                '\n' if !triple => {
                    return Err(DepsFileError::syntax(line, column, "unterminated string literal"));
                }
                '\\' => self.escape(raw, &mut value, line, column)?,
                c => value.push(c),
            }
        }

        // Adjacent literals concatenate: 'a' 'b' == 'ab'
        if let Some(Token {
            kind: TokenKind::Str(previous),
            ..
        }) = self.tokens.last_mut()
        {
            previous.push_str(&value);
            return Ok(());
        }
        self.push(TokenKind::Str(value), line, column);
        Ok(())
    }

    fn escape(
        &mut self,
        raw: bool,
        value: &mut String,
        line: usize,
        column: usize,
    ) -> Result<(), DepsFileError> {
        let Some(next) = self.bump() else {
            return Err(DepsFileError::syntax(line, column, "unterminated string literal"));
        };

        if raw {
            value.push('\\');
            value.push(next);
            return Ok(());
        }

        match next {
            '\n' => {}
            '\\' => value.push('\\'),
            '\'' => value.push('\''),
            '"' => value.push('"'),
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            '0' => value.push('\0'),
            'a' => value.push('\x07'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'v' => value.push('\x0b'),
            'x' => value.push(self.hex_escape(2, line, column)?),
            'u' => value.push(self.hex_escape(4, line, column)?),
            'U' => value.push(self.hex_escape(8, line, column)?),
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize, line: usize, column: usize) -> Result<char, DepsFileError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| DepsFileError::syntax(line, column, "truncated escape sequence"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code)
            .ok_or_else(|| DepsFileError::syntax(line, column, "escape sequence is not a valid character"))
    }

    fn number(&mut self) -> Result<(), DepsFileError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();

        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        if radix != 10 {
            self.bump();
            self.bump();
            while let Some(c) = self.peek() {
                if c == '_' {
                    self.bump();
                } else if c.is_digit(radix) {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            let value = i128::from_str_radix(&text, radix).map_err(|e| {
                DepsFileError::syntax(line, column, format!("invalid integer literal: {e}"))
            })?;
            self.push(TokenKind::Int(value), line, column);
            return Ok(());
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' if !is_float => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.bump();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        if is_float {
            let value: f64 = text.parse().map_err(|_| {
                DepsFileError::syntax(line, column, format!("invalid float literal '{text}'"))
            })?;
            self.push(TokenKind::Float(value), line, column);
        } else {
            let value: i128 = text.parse().map_err(|e| {
                DepsFileError::syntax(line, column, format!("invalid integer literal: {e}"))
            })?;
            self.push(TokenKind::Int(value), line, column);
        }
        Ok(())
    }
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_brackets_join_lines() {
        let tokens = kinds("deps = {\n  'a': 1,\n}\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Name("deps".into()),
                TokenKind::Punct('='),
                TokenKind::Punct('{'),
                TokenKind::Str("a".into()),
                TokenKind::Punct(':'),
                TokenKind::Int(1),
                TokenKind::Punct(','),
                TokenKind::Punct('}'),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let tokens = kinds("# header\n\n  # indented comment\nx = 1  # trailing\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Name("x".into()),
                TokenKind::Punct('='),
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_prefixes() {
        let tokens = kinds(r#"'a\tb' r'\d+' "it's" '\x41é'"#);
        assert_eq!(tokens[0], TokenKind::Str("a\tb\\d+it's\u{41}\u{e9}".into()));
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let tokens = kinds("\"\"\"line one\nline \"two\"\n\"\"\"\n");
        assert_eq!(tokens[0], TokenKind::Str("line one\nline \"two\"\n".into()));
        assert_eq!(tokens[1], TokenKind::Newline);
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("1_000 0x1F 0b101 2.5 1e3 .5");
        assert_eq!(
            &tokens[..6],
            &[
                TokenKind::Int(1000),
                TokenKind::Int(31),
                TokenKind::Int(5),
                TokenKind::Float(2.5),
                TokenKind::Float(1000.0),
                TokenKind::Float(0.5),
            ]
        );
    }

    #[test]
    fn test_byte_strings_are_rejected() {
        let err = Lexer::new("x = b'abc'").tokenize().unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 5);
        assert!(err.message.contains("byte strings"));
    }

    #[test]
    fn test_unterminated_string_reports_start() {
        let err = Lexer::new("x = 1\ny = 'abc\n").tokenize().unwrap_err();
        assert_eq!((err.line, err.column), (2, 5));
    }

    #[test]
    fn test_unclosed_bracket() {
        let err = Lexer::new("deps = {\n 'a': 1,\n").tokenize().unwrap_err();
        assert!(err.message.contains("inside brackets"));
    }

    #[test]
    fn test_def_block_body_is_not_tokenized() {
        let source = "def Str(value: str) -> str:\n  return '%s' % value.strip()  # any syntax\n\n  # trailing comment\nx = 1\n";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Name("def".into()),
                TokenKind::Name("Str".into()),
                TokenKind::Newline,
                TokenKind::Name("x".into()),
                TokenKind::Punct('='),
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_def_block_ends_outside_brackets_and_strings() {
        let source = "def f(a,\nb=('x',\n)):\n  return \"\"\"\ndoc\n\"\"\"\ny = 2\n";
        let tokens = Lexer::new(source).tokenize().unwrap();
        let y = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Name("y".into()))
            .unwrap();
        assert_eq!((y.line, y.column), (7, 1));
        assert_eq!(tokens[2].kind, TokenKind::Newline);
        assert_eq!(tokens[3].kind, TokenKind::Name("y".into()));
    }

    #[test]
    fn test_def_inside_expression_is_a_name() {
        assert_eq!(kinds("x = [def]")[3], TokenKind::Name("def".into()));
    }

    #[test]
    fn test_integers_beyond_i64() {
        let tokens = kinds("9223372036854775808 0xFFFFFFFFFFFFFFFF");
        assert_eq!(tokens[0], TokenKind::Int(9_223_372_036_854_775_808));
        assert_eq!(tokens[1], TokenKind::Int(u64::MAX as i128));
    }
}
