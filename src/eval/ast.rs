//! Expression syntax tree.
//!
//! The parser accepts a slightly larger language than the evaluator runs:
//! displays (`[..]`, `{..}`), `**`, `%`, bitwise operators, `is`, lambdas and
//! the like parse fine so that they can be reported as unsupported instead of
//! as plain syntax errors.

use super::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numbers, strings, `True`/`False`/`None`.
    Constant(Value),
    /// `f"..."` literal, a sequence of literal runs and embedded expressions.
    FString(Vec<FStringPart>),
    Name(String),
    /// `value[index]`
    Subscript { value: Box<Expr>, index: Box<Expr> },
    /// `value.attr`
    Attribute { value: Box<Expr>, attr: String },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `left op1 c1 op2 c2 ...`, evaluated pairwise.
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CmpOp, Expr)>,
    },
    /// `a and b and c` / `a or b or c`
    BoolOp { op: BoolOp, values: Vec<Expr> },
    /// `body if test else orelse`
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
    },

    // Parsed, never evaluated.
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Lambda { params: Vec<String>, body: Box<Expr> },
    NamedExpr { target: String, value: Box<Expr> },
}

impl Expr {
    /// Direct subexpressions, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Constant(_) | Expr::Name(_) => Vec::new(),
            Expr::FString(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    FStringPart::Expr(expr) => Some(expr),
                    FStringPart::Literal(_) => None,
                })
                .collect(),
            Expr::Subscript { value, index } => vec![&**value, &**index],
            Expr::Attribute { value, .. } => vec![&**value],
            Expr::Unary { operand, .. } => vec![&**operand],
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::Compare { left, comparisons } => std::iter::once(&**left)
                .chain(comparisons.iter().map(|(_, expr)| expr))
                .collect(),
            Expr::BoolOp { values, .. }
            | Expr::List(values)
            | Expr::Tuple(values)
            | Expr::Set(values) => values.iter().collect(),
            Expr::IfExp { test, body, orelse } => vec![&**test, &**body, &**orelse],
            Expr::Call { func, args, keywords } => std::iter::once(&**func)
                .chain(args)
                .chain(keywords.iter().map(|(_, expr)| expr))
                .collect(),
            Expr::Dict(items) => items.iter().flat_map(|(k, v)| [k, v]).collect(),
            Expr::Slice { lower, upper, step } => [lower, upper, step]
                .into_iter()
                .filter_map(|bound| bound.as_deref())
                .collect(),
            Expr::Lambda { body, .. } => vec![&**body],
            Expr::NamedExpr { value, .. } => vec![&**value],
        }
    }

    /// Nesting depth of the tree; a lone atom is 1. Walks with an explicit
    /// stack, so arbitrarily deep trees are measured safely.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((expr, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(expr.children().into_iter().map(|child| (child, level + 1)));
        }
        deepest
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BinOp {
    /// Python spelling of the operator, used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::LShift => "<<",
            Self::RShift => ">>",
        }
    }
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
        }
    }
}
