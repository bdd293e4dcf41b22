//! Expression syntax tree and builder functions.

use std::fmt;

use crate::value::{SqlValue, ToSqlValue};

/// Creates a member access; nested fields are separated by dots.
///
/// ```rust
/// use oxide_mapper_core::expr::{member, Expr};
///
/// let city = member("address.city");
/// assert!(matches!(city, Expr::Member(ref path) if path.len() == 2));
/// ```
#[must_use]
pub fn member(path: &str) -> Expr {
    Expr::Member(path.split('.').map(String::from).collect())
}

/// Creates a literal operand; it compiles to one bound parameter.
#[must_use]
pub fn lit<T: ToSqlValue>(value: T) -> Expr {
    Expr::Literal(value.to_sql_value())
}

/// Creates a finite literal collection, used with [`Expr::contains`].
#[must_use]
pub fn list<I, T>(values: I) -> Expr
where
    I: IntoIterator<Item = T>,
    T: ToSqlValue,
{
    Expr::List(values.into_iter().map(ToSqlValue::to_sql_value).collect())
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// A predicate, projection or ordering expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field path from the root record.
    Member(Vec<String>),
    /// A single value.
    Literal(SqlValue),
    /// A finite collection of values.
    List(Vec<SqlValue>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    /// A method applied to `target`.
    Call {
        method: String,
        target: Box<Expr>,
        args: Vec<Expr>,
    },
}

/// Conversion into an expression operand.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl<T: ToSqlValue> IntoExpr for T {
    fn into_expr(self) -> Expr {
        Expr::Literal(self.to_sql_value())
    }
}

impl Expr {
    fn binary(self, op: BinaryOp, right: impl IntoExpr) -> Self {
        Self::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into_expr()),
        }
    }

    /// Applies an arbitrary method. Unknown methods fail at compile time.
    #[must_use]
    pub fn call(self, method: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Call {
            method: method.into(),
            target: Box::new(self),
            args,
        }
    }

    /// Creates an equality expression.
    #[must_use]
    pub fn eq(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// Creates an inequality expression.
    #[must_use]
    pub fn ne(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Ne, other)
    }

    #[must_use]
    pub fn lt(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    #[must_use]
    pub fn le(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Le, other)
    }

    #[must_use]
    pub fn gt(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    #[must_use]
    pub fn ge(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Ge, other)
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.binary(BinaryOp::And, other)
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// Logical negation.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn add(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn sub(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Sub, other)
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn mul(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Mul, other)
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn div(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Div, other)
    }

    /// Substring test on text, or membership test on a [`list`].
    #[must_use]
    pub fn contains(self, item: impl IntoExpr) -> Self {
        self.call("contains", vec![item.into_expr()])
    }

    #[must_use]
    pub fn starts_with(self, prefix: impl IntoExpr) -> Self {
        self.call("starts_with", vec![prefix.into_expr()])
    }

    #[must_use]
    pub fn ends_with(self, suffix: impl IntoExpr) -> Self {
        self.call("ends_with", vec![suffix.into_expr()])
    }

    #[must_use]
    pub fn upper(self) -> Self {
        self.call("upper", Vec::new())
    }

    #[must_use]
    pub fn lower(self) -> Self {
        self.call("lower", Vec::new())
    }

    #[must_use]
    pub fn length(self) -> Self {
        self.call("length", Vec::new())
    }

    /// `IS NOT NULL` test on a nullable member.
    #[must_use]
    pub fn has_value(self) -> Self {
        self.call("has_value", Vec::new())
    }

    /// Membership of this operand in a literal collection.
    #[must_use]
    pub fn in_list<I, T>(self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        list(values).contains(self)
    }

    /// Name of the node kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Member(_) => "member",
            Self::Literal(_) => "literal",
            Self::List(_) => "list",
            Self::Binary { .. } => "binary",
            Self::Not(_) => "not",
            Self::Call { .. } => "call",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(path) => f.write_str(&path.join(".")),
            Self::Literal(v) => write!(f, "{}", v.to_sql_inline()),
            Self::List(values) => {
                let items: Vec<String> = values.iter().map(SqlValue::to_sql_inline).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Binary { op, left, right } => write!(f, "({left} {} {right})", op.as_str()),
            Self::Not(inner) => write!(f, "!({inner})"),
            Self::Call {
                method,
                target,
                args,
            } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{target}.{method}({})", args.join(", "))
            }
        }
    }
}
