//! Syntax tree of console statements.

/// A literal value written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    List(Vec<Expr>),
    Attr {
        object: Box<Expr>,
        attr: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    /// `lower / upper`
    Div(Box<Expr>, Box<Expr>),
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(String),
    Attr { object: Expr, attr: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Blank line or comment.
    Empty,
    Assign { target: Target, value: Expr },
    Del(String),
    Expr(Expr),
}

impl Expr {
    /// Turn an expression into an assignment target, if it names one.
    pub fn into_target(self) -> Option<Target> {
        match self {
            Expr::Name(name) => Some(Target::Name(name)),
            Expr::Attr { object, attr } => Some(Target::Attr {
                object: *object,
                attr,
            }),
            _ => None,
        }
    }
}
