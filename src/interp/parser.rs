//! nom parser for console statements.
//!
//! One line holds one statement. Blank lines and lines starting with `#`
//! parse to [`Stmt::Empty`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, hex_digit1, multispace0, multispace1, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    error::{ErrorKind, ParseError, VerboseError},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    Finish, IResult,
};

use super::ast::{Expr, Literal, Stmt};
use crate::error::EvalError;

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Deepest bracket nesting a line may use.
const MAX_NESTING: usize = 64;

/// Most brackets, `.` and `/` operators a line may hold.
const MAX_OPERATORS: usize = 4096;

/// Parse one line of input.
pub fn parse_statement(line: &str) -> Result<Stmt, EvalError> {
    let source = line.trim();
    if source.is_empty() || source.starts_with('#') {
        return Ok(Stmt::Empty);
    }
    check_shape(source)?;
    all_consuming(statement)(source)
        .finish()
        .map(|(_, stmt)| stmt)
        .map_err(|e| syntax_error(source, e))
}

/// Parse a standalone expression.
pub fn parse_expression(text: &str) -> Result<Expr, EvalError> {
    let source = text.trim();
    check_shape(source)?;
    all_consuming(expr)(source)
        .finish()
        .map(|(_, e)| e)
        .map_err(|e| syntax_error(source, e))
}

/// Reject lines whose syntax tree would be too deep to parse or evaluate.
fn check_shape(source: &str) -> Result<(), EvalError> {
    let mut depth = 0usize;
    let mut operators = 0usize;
    let mut quote = None;
    let mut escaped = false;

    for c in source.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' => {
                depth += 1;
                operators += 1;
                if depth > MAX_NESTING {
                    return Err(EvalError::Syntax(format!(
                        "expression nested deeper than {} brackets",
                        MAX_NESTING
                    )));
                }
            }
            ')' | ']' => depth = depth.saturating_sub(1),
            '.' | '/' => operators += 1,
            _ => {}
        }
        if operators > MAX_OPERATORS {
            return Err(EvalError::Syntax(format!(
                "expression has more than {} operators",
                MAX_OPERATORS
            )));
        }
    }
    Ok(())
}

fn syntax_error(source: &str, err: VerboseError<&str>) -> EvalError {
    let rest = err.errors.first().map(|(rest, _)| *rest).unwrap_or(source);
    if rest.is_empty() {
        return EvalError::Syntax("unexpected end of line".to_string());
    }
    let column = source.len() - rest.len() + 1;
    EvalError::Syntax(format!("invalid syntax at column {}: {}", column, rest))
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    F: FnMut(&'a str) -> ParseResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn statement(input: &str) -> ParseResult<'_, Stmt> {
    alt((del_stmt, assign_stmt, map(expr, Stmt::Expr)))(input)
}

fn del_stmt(input: &str) -> ParseResult<'_, Stmt> {
    map(preceded(pair(tag("del"), multispace1), identifier), Stmt::Del)(input)
}

fn assign_stmt(input: &str) -> ParseResult<'_, Stmt> {
    let (input, lhs) = term(input)?;
    let (after, _) = tuple((multispace0, char('='), not(char('=')), multispace0))(input)?;
    let Some(target) = lhs.into_target() else {
        return Err(nom::Err::Failure(VerboseError::from_error_kind(
            input,
            ErrorKind::Verify,
        )));
    };
    let (rest, value) = expr(after)?;
    Ok((rest, Stmt::Assign { target, value }))
}

/// `term ('/' term)*`, left-associative.
fn expr(input: &str) -> ParseResult<'_, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(preceded(ws(char('/')), term))(input)?;
    let folded = rest
        .into_iter()
        .fold(first, |lower, upper| Expr::Div(Box::new(lower), Box::new(upper)));
    Ok((input, folded))
}

enum Postfix {
    Attr(String),
    Call(Vec<Arg>),
}

enum Arg {
    Positional(Expr),
    Keyword(String, Expr),
}

fn term(input: &str) -> ParseResult<'_, Expr> {
    let (input, base) = atom(input)?;
    let (input, ops) = many0(postfix)(input)?;
    let folded = ops.into_iter().fold(base, |object, op| match op {
        Postfix::Attr(attr) => Expr::Attr {
            object: Box::new(object),
            attr,
        },
        Postfix::Call(call_args) => {
            let mut args = Vec::new();
            let mut kwargs = Vec::new();
            for arg in call_args {
                match arg {
                    Arg::Positional(e) => args.push(e),
                    Arg::Keyword(k, e) => kwargs.push((k, e)),
                }
            }
            Expr::Call {
                func: Box::new(object),
                args,
                kwargs,
            }
        }
    });
    Ok((input, folded))
}

fn postfix(input: &str) -> ParseResult<'_, Postfix> {
    alt((
        map(preceded(pair(multispace0, char('.')), identifier), Postfix::Attr),
        map(preceded(multispace0, call_args), Postfix::Call),
    ))(input)
}

fn call_args(input: &str) -> ParseResult<'_, Vec<Arg>> {
    delimited(
        pair(char('('), multispace0),
        terminated(separated_list0(ws(char(',')), arg), opt(ws(char(',')))),
        pair(multispace0, char(')')),
    )(input)
}

fn arg(input: &str) -> ParseResult<'_, Arg> {
    alt((
        map(
            pair(
                terminated(
                    identifier,
                    tuple((multispace0, char('='), not(char('=')), multispace0)),
                ),
                expr,
            ),
            |(name, value)| Arg::Keyword(name, value),
        ),
        map(expr, Arg::Positional),
    ))(input)
}

fn atom(input: &str) -> ParseResult<'_, Expr> {
    alt((
        map(hex_literal, Expr::Literal),
        map(float_literal, Expr::Literal),
        map(int_literal, Expr::Literal),
        map(string_literal, |s| Expr::Literal(Literal::Str(s))),
        list_expr,
        delimited(pair(char('('), multispace0), expr, pair(multispace0, char(')'))),
        map(identifier, keyword_or_name),
    ))(input)
}

fn keyword_or_name(name: String) -> Expr {
    match name.as_str() {
        "None" => Expr::Literal(Literal::None),
        "True" => Expr::Literal(Literal::Bool(true)),
        "False" => Expr::Literal(Literal::Bool(false)),
        _ => Expr::Name(name),
    }
}

fn list_expr(input: &str) -> ParseResult<'_, Expr> {
    map(
        delimited(
            pair(char('['), multispace0),
            terminated(separated_list0(ws(char(',')), expr), opt(ws(char(',')))),
            pair(multispace0, char(']')),
        ),
        Expr::List,
    )(input)
}

pub(crate) fn identifier(input: &str) -> ParseResult<'_, String> {
    map(
        recognize(pair(
            satisfy(|c| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        str::to_string,
    )(input)
}

fn hex_literal(input: &str) -> ParseResult<'_, Literal> {
    map_res(
        preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
        |digits: &str| i64::from_str_radix(digits, 16).map(Literal::Int),
    )(input)
}

fn float_literal(input: &str) -> ParseResult<'_, Literal> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        |text: &str| text.parse::<f64>().map(Literal::Float),
    )(input)
}

fn int_literal(input: &str) -> ParseResult<'_, Literal> {
    map_res(recognize(pair(opt(char('-')), digit1)), |text: &str| {
        text.parse::<i64>().map(Literal::Int)
    })(input)
}

fn string_body<'a>(quote: char) -> impl FnMut(&'a str) -> ParseResult<'a, String> {
    move |input| {
        let (input, chars) = many0(alt((
            value('\n', tag("\\n")),
            value('\r', tag("\\r")),
            value('\t', tag("\\t")),
            value('\\', tag("\\\\")),
            value('\'', tag("\\'")),
            value('"', tag("\\\"")),
            satisfy(move |c| c != quote && c != '\\'),
        )))(input)?;
        Ok((input, chars.into_iter().collect()))
    }
}

fn string_literal(input: &str) -> ParseResult<'_, String> {
    alt((
        delimited(char('"'), string_body('"'), char('"')),
        delimited(char('\''), string_body('\''), char('\'')),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ast::Target;

    fn name(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    #[test]
    fn test_blank_and_comment() {
        assert_eq!(parse_statement("").unwrap(), Stmt::Empty);
        assert_eq!(parse_statement("   # note").unwrap(), Stmt::Empty);
    }

    #[test]
    fn test_literals() {
        let cases = [
            ("42", Literal::Int(42)),
            ("-7", Literal::Int(-7)),
            ("0x800", Literal::Int(0x800)),
            ("1.5", Literal::Float(1.5)),
            ("'a\\'b'", Literal::Str("a'b".into())),
            ("\"x\\ny\"", Literal::Str("x\ny".into())),
            ("None", Literal::None),
            ("True", Literal::Bool(true)),
        ];
        for (text, expected) in cases {
            assert_eq!(
                parse_expression(text).unwrap(),
                Expr::Literal(expected),
                "parsing {}",
                text
            );
        }
    }

    #[test]
    fn test_assignment() {
        let stmt = parse_statement("pkt = IP(dst='10.0.0.1', ttl=3)").unwrap();
        let Stmt::Assign { target, value } = stmt else {
            panic!("not an assignment");
        };
        assert_eq!(target, Target::Name("pkt".into()));
        assert_eq!(
            value,
            Expr::Call {
                func: Box::new(name("IP")),
                args: vec![],
                kwargs: vec![
                    ("dst".into(), Expr::Literal(Literal::Str("10.0.0.1".into()))),
                    ("ttl".into(), Expr::Literal(Literal::Int(3))),
                ],
            }
        );
    }

    #[test]
    fn test_attribute_assignment() {
        let stmt = parse_statement("conf.prompt = '$ '").unwrap();
        assert!(matches!(
            stmt,
            Stmt::Assign {
                target: Target::Attr { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_stacking_is_left_associative() {
        let e = parse_expression("Ether() / IP() / TCP()").unwrap();
        let Expr::Div(lower, _) = e else {
            panic!("not a division");
        };
        assert!(matches!(*lower, Expr::Div(_, _)));
    }

    #[test]
    fn test_attribute_chain_and_call() {
        let e = parse_expression("pkt.payload.summary()").unwrap();
        let Expr::Call { func, args, kwargs } = e else {
            panic!("not a call");
        };
        assert!(args.is_empty() && kwargs.is_empty());
        assert!(matches!(*func, Expr::Attr { ref attr, .. } if attr == "summary"));
    }

    #[test]
    fn test_del_and_names_starting_with_del() {
        assert_eq!(parse_statement("del pkt").unwrap(), Stmt::Del("pkt".into()));
        assert_eq!(
            parse_statement("delta").unwrap(),
            Stmt::Expr(name("delta"))
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            parse_expression("[1, 'a', ]").unwrap(),
            Expr::List(vec![
                Expr::Literal(Literal::Int(1)),
                Expr::Literal(Literal::Str("a".into())),
            ])
        );
        assert_eq!(parse_expression("[]").unwrap(), Expr::List(vec![]));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse_statement("x = ").unwrap_err(),
            EvalError::Syntax(_)
        ));
        assert!(parse_statement("f() = 1").is_err());
        assert!(parse_statement("a b").is_err());
        assert!(parse_statement("'open").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse_expression(&ok).unwrap(), Expr::Literal(Literal::Int(1)));

        let deep = format!("x = {}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = parse_statement(&deep).unwrap_err();
        assert!(matches!(err, EvalError::Syntax(ref m) if m.contains("nested deeper")));

        let lists = format!("{}{}", "[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1));
        assert!(matches!(parse_expression(&lists), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn test_brackets_inside_strings_not_counted() {
        let text = format!("'{}'", "(".repeat(MAX_NESTING * 2));
        assert!(parse_expression(&text).is_ok());
        assert!(parse_expression("'it\\'s ((('").is_ok());
    }

    #[test]
    fn test_operator_limit() {
        let chain = format!("a{}", ".b".repeat(MAX_OPERATORS + 1));
        assert!(matches!(parse_expression(&chain), Err(EvalError::Syntax(_))));
        let stack = format!("a{}", " / a".repeat(100));
        assert!(parse_expression(&stack).is_ok());
    }
}
