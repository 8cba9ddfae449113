//! Formula parser
//!
//! A recursive descent parser with operator precedence. Instead of building
//! an AST, the parser reports the expression to an [`ExprBuilder`] in
//! postfix order; see the module docs in [`builder`](crate::builder).
//!
//! Precedence, loosest to tightest:
//!
//! 1. comparison: `=`, `<>`, `<`, `<=`, `>`, `>=`
//! 2. additive: `+`, `-`
//! 3. multiplicative: `*`, `/`
//! 4. unary minus
//! 5. exponentiation: `^` (right-associative, so `-2^2` is `-(2^2)`)
//! 6. primary: literals, references, ranges, function calls, parentheses

use crate::builder::ExprBuilder;
use crate::error::{FormulaError, FormulaResult};

/// Parse a formula and drive `builder` with its postfix form.
///
/// The formula must start with `=` and must be consumed completely. On
/// error the builder may have received a prefix of the callbacks; callers
/// discard partially-built programs.
///
/// # Example
/// ```
/// use tally_formula::{parse, ExprBuilder};
///
/// #[derive(Default)]
/// struct Trace(Vec<String>);
///
/// impl ExprBuilder for Trace {
///     fn op_add(&mut self) { self.0.push("+".into()) }
///     fn op_sub(&mut self) { self.0.push("-".into()) }
///     fn op_mul(&mut self) { self.0.push("*".into()) }
///     fn op_div(&mut self) { self.0.push("/".into()) }
///     fn op_pow(&mut self) { self.0.push("^".into()) }
///     fn op_neg(&mut self) { self.0.push("neg".into()) }
///     fn op_eq(&mut self) { self.0.push("=".into()) }
///     fn op_ne(&mut self) { self.0.push("<>".into()) }
///     fn op_lt(&mut self) { self.0.push("<".into()) }
///     fn op_le(&mut self) { self.0.push("<=".into()) }
///     fn op_gt(&mut self) { self.0.push(">".into()) }
///     fn op_ge(&mut self) { self.0.push(">=".into()) }
///     fn val_number(&mut self, v: f64) { self.0.push(v.to_string()) }
///     fn val_string(&mut self, v: &str) { self.0.push(format!("{v:?}")) }
///     fn val_reference(&mut self, r: &str) { self.0.push(r.into()) }
///     fn val_range(&mut self, r: &str) { self.0.push(r.into()) }
///     fn func_call(&mut self, n: &str, argc: usize) { self.0.push(format!("{n}/{argc}")) }
/// }
///
/// let mut trace = Trace::default();
/// parse("=A1+B2*3", &mut trace).unwrap();
/// assert_eq!(trace.0, ["A1", "B2", "3", "*", "+"]);
/// ```
pub fn parse<B: ExprBuilder>(formula: &str, builder: &mut B) -> FormulaResult<()> {
    let body = formula.trim();
    let body = body
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("formula must start with '='".into()))?;

    let mut parser = Parser::new(body)?;
    parser.parse_comparison(builder)?;

    if !matches!(parser.current(), Token::Eof) {
        return Err(FormulaError::Parse(format!(
            "unexpected input after expression: '{}'",
            parser.rest()
        )));
    }
    Ok(())
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    CellRef(String),
    Ident(String),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Colon,
    Comma,
    LParen,
    RParen,

    Eof,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            current: Token::Eof,
        };
        parser.advance()?;
        Ok(parser)
    }

    // === Scanner ===

    fn advance(&mut self) -> FormulaResult<()> {
        self.current = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '+' => {
                self.bump();
                return Ok(Token::Plus);
            }
            '-' => {
                self.bump();
                return Ok(Token::Minus);
            }
            '*' => {
                self.bump();
                return Ok(Token::Star);
            }
            '/' => {
                self.bump();
                return Ok(Token::Slash);
            }
            '^' => {
                self.bump();
                return Ok(Token::Caret);
            }
            ':' => {
                self.bump();
                return Ok(Token::Colon);
            }
            ',' => {
                self.bump();
                return Ok(Token::Comma);
            }
            '(' => {
                self.bump();
                return Ok(Token::LParen);
            }
            ')' => {
                self.bump();
                return Ok(Token::RParen);
            }
            '=' => {
                self.bump();
                return Ok(Token::Eq);
            }
            _ => {}
        }

        if c == '<' {
            self.bump();
            if self.peek_char() == Some('=') {
                self.bump();
                return Ok(Token::Le);
            }
            if self.peek_char() == Some('>') {
                self.bump();
                return Ok(Token::Ne);
            }
            return Ok(Token::Lt);
        }

        if c == '>' {
            self.bump();
            if self.peek_char() == Some('=') {
                self.bump();
                return Ok(Token::Ge);
            }
            return Ok(Token::Gt);
        }

        if c == '"' {
            return self.scan_string();
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return Ok(self.scan_identifier_or_ref());
        }

        Err(FormulaError::Parse(format!("unexpected character '{c}'")))
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        self.bump(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    // A doubled quote is an escaped quote; a lone one ends
                    // the literal.
                    if self.peek_char_at(1) == Some('"') {
                        s.push('"');
                        self.bump();
                        self.bump();
                    } else {
                        self.bump();
                        return Ok(Token::Str(s));
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.bump();
                }
                None => {
                    return Err(FormulaError::Parse("unterminated string literal".into()));
                }
            }
        }
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }

        if self.peek_char() == Some('.') {
            self.bump();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }

        if self.peek_char().is_some_and(|c| c == 'e' || c == 'E') {
            self.bump();
            if self.peek_char().is_some_and(|c| c == '+' || c == '-') {
                self.bump();
            }
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }

        let text = &self.input[start..self.pos];
        let value: f64 = text
            .parse()
            .map_err(|_| FormulaError::Parse(format!("invalid number '{text}'")))?;
        Ok(Token::Number(value))
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            self.bump();
        }

        let text = &self.input[start..self.pos];
        if is_cell_reference(text) {
            Token::CellRef(text.to_string())
        } else {
            Token::Ident(text.to_string())
        }
    }

    // === Scanner helpers ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
    }

    fn current(&self) -> &Token {
        &self.current
    }

    fn rest(&self) -> &str {
        self.input[self.pos..].trim()
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if &self.current == expected {
            self.advance()
        } else {
            Err(FormulaError::Parse(format!(
                "expected {:?}, found {:?}",
                expected, self.current
            )))
        }
    }

    // === Grammar ===

    fn parse_comparison<B: ExprBuilder>(&mut self, builder: &mut B) -> FormulaResult<()> {
        self.parse_additive(builder)?;

        loop {
            let op = self.current.clone();
            match op {
                Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
                    self.advance()?;
                    self.parse_additive(builder)?;
                    match op {
                        Token::Eq => builder.op_eq(),
                        Token::Ne => builder.op_ne(),
                        Token::Lt => builder.op_lt(),
                        Token::Le => builder.op_le(),
                        Token::Gt => builder.op_gt(),
                        Token::Ge => builder.op_ge(),
                        _ => unreachable!(),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_additive<B: ExprBuilder>(&mut self, builder: &mut B) -> FormulaResult<()> {
        self.parse_multiplicative(builder)?;

        loop {
            match self.current {
                Token::Plus => {
                    self.advance()?;
                    self.parse_multiplicative(builder)?;
                    builder.op_add();
                }
                Token::Minus => {
                    self.advance()?;
                    self.parse_multiplicative(builder)?;
                    builder.op_sub();
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_multiplicative<B: ExprBuilder>(&mut self, builder: &mut B) -> FormulaResult<()> {
        self.parse_unary(builder)?;

        loop {
            match self.current {
                Token::Star => {
                    self.advance()?;
                    self.parse_unary(builder)?;
                    builder.op_mul();
                }
                Token::Slash => {
                    self.advance()?;
                    self.parse_unary(builder)?;
                    builder.op_div();
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_unary<B: ExprBuilder>(&mut self, builder: &mut B) -> FormulaResult<()> {
        match self.current {
            Token::Minus => {
                self.advance()?;
                self.parse_unary(builder)?;
                builder.op_neg();
                Ok(())
            }
            // Prefix plus is accepted and ignored.
            Token::Plus => {
                self.advance()?;
                self.parse_unary(builder)
            }
            _ => self.parse_power(builder),
        }
    }

    fn parse_power<B: ExprBuilder>(&mut self, builder: &mut B) -> FormulaResult<()> {
        self.parse_primary(builder)?;

        if matches!(self.current, Token::Caret) {
            self.advance()?;
            // Right-associative: the whole right side binds to this caret.
            // The exponent may itself carry a unary minus (`2^-1`).
            self.parse_unary(builder)?;
            builder.op_pow();
        }
        Ok(())
    }

    fn parse_primary<B: ExprBuilder>(&mut self, builder: &mut B) -> FormulaResult<()> {
        match self.current.clone() {
            Token::Number(value) => {
                self.advance()?;
                builder.val_number(value);
                Ok(())
            }

            Token::Str(value) => {
                self.advance()?;
                builder.val_string(&value);
                Ok(())
            }

            Token::CellRef(reference) => {
                self.advance()?;
                if matches!(self.current, Token::Colon) {
                    self.advance()?;
                    match self.current.clone() {
                        Token::CellRef(end) => {
                            self.advance()?;
                            builder.val_range(&format!("{reference}:{end}"));
                            Ok(())
                        }
                        ref other => Err(FormulaError::Parse(format!(
                            "expected cell reference after ':', found {other:?}"
                        ))),
                    }
                } else {
                    builder.val_reference(&reference);
                    Ok(())
                }
            }

            Token::Ident(name) => {
                self.advance()?;
                if matches!(self.current, Token::LParen) {
                    self.parse_call(&name, builder)
                } else {
                    Err(FormulaError::Parse(format!("unknown identifier '{name}'")))
                }
            }

            Token::LParen => {
                self.advance()?;
                self.parse_comparison(builder)?;
                self.expect(&Token::RParen)
            }

            ref other => Err(FormulaError::Parse(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_call<B: ExprBuilder>(&mut self, name: &str, builder: &mut B) -> FormulaResult<()> {
        self.expect(&Token::LParen)?;

        let mut arg_count = 0;
        if !matches!(self.current, Token::RParen) {
            self.parse_comparison(builder)?;
            arg_count += 1;

            while matches!(self.current, Token::Comma) {
                self.advance()?;
                self.parse_comparison(builder)?;
                arg_count += 1;
            }
        }

        self.expect(&Token::RParen)?;
        builder.func_call(&name.to_uppercase(), arg_count);
        Ok(())
    }
}

/// `[$]LETTERS[$]DIGITS`, fully consumed. Range bounds are not checked
/// here; classification is purely lexical.
fn is_cell_reference(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    if bytes.first() == Some(&b'$') {
        i += 1;
    }

    let letter_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letter_start {
        return false;
    }

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }

    let digit_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digit_start {
        return false;
    }

    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builder that records callbacks as a flat postfix trace.
    #[derive(Default)]
    struct Trace(Vec<String>);

    impl ExprBuilder for Trace {
        fn op_add(&mut self) {
            self.0.push("+".into());
        }
        fn op_sub(&mut self) {
            self.0.push("-".into());
        }
        fn op_mul(&mut self) {
            self.0.push("*".into());
        }
        fn op_div(&mut self) {
            self.0.push("/".into());
        }
        fn op_pow(&mut self) {
            self.0.push("^".into());
        }
        fn op_neg(&mut self) {
            self.0.push("neg".into());
        }
        fn op_eq(&mut self) {
            self.0.push("=".into());
        }
        fn op_ne(&mut self) {
            self.0.push("<>".into());
        }
        fn op_lt(&mut self) {
            self.0.push("<".into());
        }
        fn op_le(&mut self) {
            self.0.push("<=".into());
        }
        fn op_gt(&mut self) {
            self.0.push(">".into());
        }
        fn op_ge(&mut self) {
            self.0.push(">=".into());
        }
        fn val_number(&mut self, value: f64) {
            self.0.push(value.to_string());
        }
        fn val_string(&mut self, value: &str) {
            self.0.push(format!("str:{value}"));
        }
        fn val_reference(&mut self, reference: &str) {
            self.0.push(format!("ref:{reference}"));
        }
        fn val_range(&mut self, range: &str) {
            self.0.push(format!("range:{range}"));
        }
        fn func_call(&mut self, name: &str, arg_count: usize) {
            self.0.push(format!("call:{name}/{arg_count}"));
        }
    }

    fn postfix(formula: &str) -> Vec<String> {
        let mut trace = Trace::default();
        parse(formula, &mut trace).unwrap();
        trace.0
    }

    fn rejects(formula: &str) {
        let mut trace = Trace::default();
        assert!(parse(formula, &mut trace).is_err(), "accepted: {formula}");
    }

    #[test]
    fn test_precedence_mul_over_add() {
        assert_eq!(postfix("=A1+B2*3"), ["ref:A1", "ref:B2", "3", "*", "+"]);
        assert_eq!(postfix("=1*2+3"), ["1", "2", "*", "3", "+"]);
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(postfix("=1-2-3"), ["1", "2", "-", "3", "-"]);
        assert_eq!(postfix("=8/4/2"), ["8", "4", "/", "2", "/"]);
    }

    #[test]
    fn test_power_right_associative() {
        assert_eq!(postfix("=2^3^2"), ["2", "3", "2", "^", "^"]);
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        // -A1^2 must mean -(A1^2)
        assert_eq!(postfix("=-A1^2"), ["ref:A1", "2", "^", "neg"]);
        assert_eq!(postfix("=- A1 ^ 2 - 1"), ["ref:A1", "2", "^", "neg", "1", "-"]);
    }

    #[test]
    fn test_negative_exponent() {
        assert_eq!(postfix("=2^-1"), ["2", "1", "neg", "^"]);
    }

    #[test]
    fn test_parentheses_override() {
        assert_eq!(postfix("=(1+2)*3"), ["1", "2", "+", "3", "*"]);
        assert_eq!(postfix("=($A1+A$2)^2"), ["ref:$A1", "ref:A$2", "+", "2", "^"]);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(postfix("=A1<B1"), ["ref:A1", "ref:B1", "<"]);
        assert_eq!(postfix("=A1<>B1"), ["ref:A1", "ref:B1", "<>"]);
        assert_eq!(postfix("=1+1=2"), ["1", "1", "+", "2", "="]);
        assert_eq!(postfix("=A1>=0"), ["ref:A1", "0", ">="]);
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(postfix("=\"hello\""), ["str:hello"]);
        // Doubled quotes unescape to a single quote.
        assert_eq!(postfix("=\"say \"\"hi\"\"\""), ["str:say \"hi\""]);
        assert_eq!(postfix("=\"a\"+\"b\""), ["str:a", "str:b", "+"]);
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(postfix("=3e1"), ["30"]);
        assert_eq!(postfix("=5e+1"), ["50"]);
        assert_eq!(postfix("=0.25"), ["0.25"]);
        assert_eq!(postfix("=.5"), ["0.5"]);
    }

    #[test]
    fn test_absolute_reference_markers_preserved() {
        assert_eq!(postfix("=$D0"), ["ref:$D0"]);
        assert_eq!(postfix("=D$0"), ["ref:D$0"]);
        assert_eq!(postfix("=$D$0"), ["ref:$D$0"]);
    }

    #[test]
    fn test_range_and_function_call() {
        assert_eq!(postfix("=SUM(A1:B5)"), ["range:A1:B5", "call:SUM/1"]);
        assert_eq!(
            postfix("=sum(A1, 2+3)"),
            ["ref:A1", "2", "3", "+", "call:SUM/2"]
        );
        assert_eq!(postfix("=NOW()"), ["call:NOW/0"]);
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(postfix("=  A1 +  B2 * 3 "), ["ref:A1", "ref:B2", "3", "*", "+"]);
    }

    #[test]
    fn test_rejects_malformed() {
        rejects("1+2"); // missing '='
        rejects("=");
        rejects("=1+");
        rejects("=(1+2");
        rejects("=1+2)");
        rejects("=1 2");
        rejects("=foo");
        rejects("=\"unterminated");
        rejects("=A1:");
        rejects("=1 @ 2");
    }

    #[test]
    fn test_cell_reference_classification() {
        assert!(is_cell_reference("A1"));
        assert!(is_cell_reference("$A1"));
        assert!(is_cell_reference("A$1"));
        assert!(is_cell_reference("$AAAA$9999"));
        assert!(is_cell_reference("zz42"));

        assert!(!is_cell_reference("A"));
        assert!(!is_cell_reference("1"));
        assert!(!is_cell_reference("A1B"));
        assert!(!is_cell_reference("SUM"));
        assert!(!is_cell_reference("_A1"));
        assert!(!is_cell_reference(""));
    }
}
