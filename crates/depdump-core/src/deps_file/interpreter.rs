//! Statement and expression evaluation for DEPS files

use super::lexer::{Token, TokenKind};
use super::value::DepsValue;
use super::{DepsFileError, Namespace};

const UNSUPPORTED_STATEMENTS: &[&str] = &[
    "import", "from", "if", "elif", "else", "for", "while", "class", "return", "with", "try",
    "except", "finally", "lambda", "global", "nonlocal", "del", "pass", "assert", "raise",
];

const KEYWORDS: &[&str] = &["True", "False", "None", "def"];

/// Evaluates a token stream one logical line at a time, binding names into a
/// [`Namespace`].
pub(crate) struct Interpreter {
    tokens: Vec<Token>,
    pos: usize,
    namespace: Namespace,
    skipped_defs: Vec<String>,
}

impl Interpreter {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            namespace: Namespace::default(),
            skipped_defs: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<Namespace, DepsFileError> {
        while self.peek().kind != TokenKind::Eof {
            self.statement()?;
        }
        Ok(self.namespace)
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek().kind == TokenKind::Punct(c)
    }

    fn expect_punct(&mut self, c: char) -> Result<Token, DepsFileError> {
        if self.is_punct(c) {
            return Ok(self.advance());
        }
        let token = self.peek();
        Err(DepsFileError::syntax(
            token.line,
            token.column,
            format!("expected '{c}', found {}", describe(&token.kind)),
        ))
    }

    fn statement(&mut self) -> Result<(), DepsFileError> {
        let first = self.peek().clone();
        if first.column > 1 {
            return Err(DepsFileError::syntax(first.line, first.column, "unexpected indent"));
        }

        if let TokenKind::Name(name) = &first.kind {
            if name == "def" {
                return self.skip_def();
            }
            if UNSUPPORTED_STATEMENTS.contains(&name.as_str()) {
                return Err(DepsFileError::syntax(
                    first.line,
                    first.column,
                    format!("'{name}' statements are not supported in DEPS files"),
                ));
            }
        }

        let mut targets = Vec::new();
        loop {
            let TokenKind::Name(name) = &self.peek().kind else {
                break;
            };
            if self.peek_at(1).kind != TokenKind::Punct('=') {
                break;
            }
            if KEYWORDS.contains(&name.as_str()) {
                let token = self.peek();
                return Err(DepsFileError::syntax(
                    token.line,
                    token.column,
                    format!("cannot assign to {name}"),
                ));
            }
            targets.push(name.clone());
            self.pos += 2;
        }

        let value = self.expression()?;
        self.end_of_statement()?;

        for target in targets {
            self.namespace.insert(target, value.clone());
        }
        Ok(())
    }

    fn end_of_statement(&mut self) -> Result<(), DepsFileError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Newline | TokenKind::Eof => Ok(()),
            TokenKind::Punct(';') => Err(DepsFileError::syntax(
                token.line,
                token.column,
                "multiple statements on one line are not supported",
            )),
            other => Err(DepsFileError::syntax(
                token.line,
                token.column,
                format!("unexpected {} after expression", describe(&other)),
            )),
        }
    }

    /// Skips a `def` block: its header line plus every following indented line.
    fn skip_def(&mut self) -> Result<(), DepsFileError> {
        let def = self.advance();
        let name_token = self.advance();
        let TokenKind::Name(name) = name_token.kind else {
            return Err(DepsFileError::syntax(
                def.line,
                def.column,
                "expected function name after 'def'",
            ));
        };

        self.skip_logical_line();
        while self.peek().kind != TokenKind::Eof && self.peek().column > 1 {
            self.skip_logical_line();
        }

        tracing::debug!(function = %name, "Skipping helper definition");
        self.skipped_defs.push(name);
        Ok(())
    }

    fn skip_logical_line(&mut self) {
        loop {
            match self.advance().kind {
                TokenKind::Newline | TokenKind::Eof => break,
                _ => {}
            }
        }
    }

    fn expression(&mut self) -> Result<DepsValue, DepsFileError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Punct(c @ ('+' | '-')) => c,
                _ => break,
            };
            let token = self.advance();
            let right = self.unary()?;
            left = binary(op, left, right, &token)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<DepsValue, DepsFileError> {
        let op = match self.peek().kind {
            TokenKind::Punct(c @ ('+' | '-')) => c,
            _ => return self.postfix(),
        };
        let token = self.advance();
        let operand = self.unary()?;
        match (op, operand) {
            ('+', value @ (DepsValue::Int(_) | DepsValue::Float(_))) => Ok(value),
            ('-', DepsValue::Int(i)) => i
                .checked_neg()
                .map(DepsValue::Int)
                .ok_or_else(|| DepsFileError::runtime(token.line, token.column, "integer overflow")),
            ('-', DepsValue::Float(f)) => Ok(DepsValue::Float(-f)),
            (op, other) => Err(DepsFileError::runtime(
                token.line,
                token.column,
                format!("bad operand type for unary {op}: '{}'", other.type_name()),
            )),
        }
    }

    fn postfix(&mut self) -> Result<DepsValue, DepsFileError> {
        let mut value = self.primary()?;
        while self.is_punct('[') {
            let open = self.advance();
            let index = self.expression()?;
            self.expect_punct(']')?;
            value = subscript(value, index, &open)?;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<DepsValue, DepsFileError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(s) => Ok(DepsValue::Str(s)),
            TokenKind::Int(i) => Ok(DepsValue::Int(i)),
            TokenKind::Float(f) => Ok(DepsValue::Float(f)),
            TokenKind::Name(ref name) => match name.as_str() {
                "True" => Ok(DepsValue::Bool(true)),
                "False" => Ok(DepsValue::Bool(false)),
                "None" => Ok(DepsValue::None),
                _ if self.is_punct('(') => self.call(&token, name),
                _ => self.namespace.get(name).cloned().ok_or_else(|| {
                    DepsFileError::runtime(
                        token.line,
                        token.column,
                        format!("name '{name}' is not defined"),
                    )
                }),
            },
            TokenKind::Punct('[') => self.list(),
            TokenKind::Punct('(') => self.parenthesized(),
            TokenKind::Punct('{') => self.braced(),
            other => Err(DepsFileError::syntax(
                token.line,
                token.column,
                format!("unexpected {}", describe(&other)),
            )),
        }
    }

    fn arguments(&mut self) -> Result<Vec<DepsValue>, DepsFileError> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        while !self.is_punct(')') {
            if matches!(self.peek().kind, TokenKind::Name(_))
                && self.peek_at(1).kind == TokenKind::Punct('=')
            {
                let token = self.peek();
                return Err(DepsFileError::syntax(
                    token.line,
                    token.column,
                    "keyword arguments are not supported",
                ));
            }
            args.push(self.expression()?);
            if !self.is_punct(')') {
                self.expect_punct(',')?;
            }
        }
        self.expect_punct(')')?;
        Ok(args)
    }

    fn call(&mut self, token: &Token, name: &str) -> Result<DepsValue, DepsFileError> {
        let args = self.arguments()?;
        let error = |message: String| DepsFileError::runtime(token.line, token.column, message);

        match name {
            "Var" => {
                let [key] = args.as_slice() else {
                    return Err(error(format!(
                        "Var() takes exactly one argument ({} given)",
                        args.len()
                    )));
                };
                let vars = self
                    .namespace
                    .get("vars")
                    .ok_or_else(|| error("name 'vars' is not defined".to_string()))?;
                if !matches!(vars, DepsValue::Dict(_)) {
                    return Err(error(format!(
                        "'vars' must be a dict, not {}",
                        vars.type_name()
                    )));
                }
                vars.get(key)
                    .cloned()
                    .ok_or_else(|| error(format!("KeyError: {}", key.to_py_str())))
            }
            "Str" | "str" => match args.as_slice() {
                [] => Ok(DepsValue::Str(String::new())),
                [value] => Ok(DepsValue::Str(value.to_py_str())),
                _ => Err(error(format!(
                    "{name}() takes at most one argument ({} given)",
                    args.len()
                ))),
            },
            _ if self.skipped_defs.iter().any(|d| d == name) => Err(error(format!(
                "function '{name}' is defined in the module but cannot be evaluated"
            ))),
            _ => match self.namespace.get(name) {
                Some(value) => Err(error(format!(
                    "'{}' object is not callable",
                    value.type_name()
                ))),
                None => Err(error(format!("name '{name}' is not defined"))),
            },
        }
    }

    fn list(&mut self) -> Result<DepsValue, DepsFileError> {
        let items = self.sequence(']')?;
        Ok(DepsValue::List(items))
    }

    fn sequence(&mut self, close: char) -> Result<Vec<DepsValue>, DepsFileError> {
        let mut items = Vec::new();
        while !self.is_punct(close) {
            items.push(self.expression()?);
            if !self.is_punct(close) {
                self.expect_punct(',')?;
            }
        }
        self.expect_punct(close)?;
        Ok(items)
    }

    fn parenthesized(&mut self) -> Result<DepsValue, DepsFileError> {
        if self.is_punct(')') {
            self.advance();
            return Ok(DepsValue::Tuple(Vec::new()));
        }
        let first = self.expression()?;
        if self.is_punct(')') {
            self.advance();
            return Ok(first);
        }
        self.expect_punct(',')?;
        let mut items = vec![first];
        items.extend(self.sequence(')')?);
        Ok(DepsValue::Tuple(items))
    }

    fn braced(&mut self) -> Result<DepsValue, DepsFileError> {
        if self.is_punct('}') {
            self.advance();
            return Ok(DepsValue::Dict(Vec::new()));
        }

        let first_token = self.peek().clone();
        let first = self.expression()?;
        if !self.is_punct(':') {
            let mut members = Vec::new();
            add_member(&mut members, first, &first_token)?;
            if !self.is_punct('}') {
                self.expect_punct(',')?;
            }
            while !self.is_punct('}') {
                let token = self.peek().clone();
                let member = self.expression()?;
                add_member(&mut members, member, &token)?;
                if !self.is_punct('}') {
                    self.expect_punct(',')?;
                }
            }
            self.expect_punct('}')?;
            return Ok(DepsValue::Set(members));
        }

        let mut entries = Vec::new();
        let mut key = first;
        let mut key_token = first_token;
        loop {
            self.expect_punct(':')?;
            let value = self.expression()?;
            insert_entry(&mut entries, key, value, &key_token)?;

            if !self.is_punct('}') {
                self.expect_punct(',')?;
            }
            if self.is_punct('}') {
                break;
            }
            key_token = self.peek().clone();
            key = self.expression()?;
        }
        self.expect_punct('}')?;
        Ok(DepsValue::Dict(entries))
    }
}

fn insert_entry(
    entries: &mut Vec<(DepsValue, DepsValue)>,
    key: DepsValue,
    value: DepsValue,
    token: &Token,
) -> Result<(), DepsFileError> {
    if !key.is_hashable() {
        return Err(DepsFileError::runtime(
            token.line,
            token.column,
            format!("unhashable type: '{}'", key.type_name()),
        ));
    }
    // A repeated key keeps its first position and takes the last value
    match entries.iter_mut().find(|(k, _)| k.same_key(&key)) {
        Some((_, existing)) => *existing = value,
        None => entries.push((key, value)),
    }
    Ok(())
}

fn add_member(members: &mut Vec<DepsValue>, member: DepsValue, token: &Token) -> Result<(), DepsFileError> {
    if !member.is_hashable() {
        return Err(DepsFileError::runtime(
            token.line,
            token.column,
            format!("unhashable type: '{}'", member.type_name()),
        ));
    }
    if !members.iter().any(|m| m.same_key(&member)) {
        members.push(member);
    }
    Ok(())
}

fn binary(op: char, left: DepsValue, right: DepsValue, token: &Token) -> Result<DepsValue, DepsFileError> {
    let overflow = || DepsFileError::runtime(token.line, token.column, "integer overflow");
    let result = match (op, left, right) {
        ('+', DepsValue::Str(mut a), DepsValue::Str(b)) => {
            a.push_str(&b);
            DepsValue::Str(a)
        }
        ('+', DepsValue::List(mut a), DepsValue::List(b)) => {
            a.extend(b);
            DepsValue::List(a)
        }
        ('+', DepsValue::Tuple(mut a), DepsValue::Tuple(b)) => {
            a.extend(b);
            DepsValue::Tuple(a)
        }
        ('+', DepsValue::Int(a), DepsValue::Int(b)) => DepsValue::Int(a.checked_add(b).ok_or_else(overflow)?),
        ('-', DepsValue::Int(a), DepsValue::Int(b)) => DepsValue::Int(a.checked_sub(b).ok_or_else(overflow)?),
        (op, left, right) => match (as_float(&left), as_float(&right)) {
            (Some(a), Some(b)) if op == '+' => DepsValue::Float(a + b),
            (Some(a), Some(b)) => DepsValue::Float(a - b),
            _ => {
                return Err(DepsFileError::runtime(
                    token.line,
                    token.column,
                    format!(
                        "unsupported operand type(s) for {op}: '{}' and '{}'",
                        left.type_name(),
                        right.type_name()
                    ),
                ))
            }
        },
    };
    Ok(result)
}

fn as_float(value: &DepsValue) -> Option<f64> {
    match value {
        DepsValue::Int(i) => Some(*i as f64),
        DepsValue::Float(f) => Some(*f),
        _ => None,
    }
}

fn subscript(value: DepsValue, index: DepsValue, token: &Token) -> Result<DepsValue, DepsFileError> {
    let error = |message: String| DepsFileError::runtime(token.line, token.column, message);
    match (&value, &index) {
        (DepsValue::Dict(_), key) => value
            .get(key)
            .cloned()
            .ok_or_else(|| error(format!("KeyError: {}", key.to_py_str()))),
        (DepsValue::List(items) | DepsValue::Tuple(items), DepsValue::Int(i)) => {
            let len = items.len() as i128;
            let position = if *i < 0 { len + i } else { *i };
            if (0..len).contains(&position) {
                Ok(items[position as usize].clone())
            } else {
                Err(error(format!("{} index out of range", value.type_name())))
            }
        }
        _ => Err(error(format!(
            "'{}' object is not subscriptable by {}",
            value.type_name(),
            index.type_name()
        ))),
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Name(name) => format!("name '{name}'"),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Int(_) | TokenKind::Float(_) => "number".to_string(),
        TokenKind::Punct(c) => format!("'{c}'"),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of file".to_string(),
    }
}
