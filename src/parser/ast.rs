// AST (Abstract Syntax Tree) definitions for calculator expressions

/// Source location information for error reporting
///
/// Expressions are always a single line, so only the 1-based column is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub column: usize,
}

impl SourceLocation {
    pub fn new(column: usize) -> Self {
        Self { column }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Pow => '^',
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Factorial, // postfix !
}

/// Expression tree produced by the parser
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Number(f64, SourceLocation),

    /// Named constant such as `PI`; resolved by the evaluator
    Constant(String, SourceLocation),

    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },

    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        location: SourceLocation,
    },

    /// Function application, e.g. `SQRT(16)` or `POW(2, 10)`.
    /// The name is stored upper-cased.
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Returns the source location of this node.
    pub fn location(&self) -> SourceLocation {
        match self {
            AstNode::Number(_, loc) | AstNode::Constant(_, loc) => *loc,
            AstNode::BinaryOp { location, .. }
            | AstNode::UnaryOp { location, .. }
            | AstNode::FunctionCall { location, .. } => *location,
        }
    }
}
