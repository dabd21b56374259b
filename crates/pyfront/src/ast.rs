use num_bigint::BigInt;
use num_complex::Complex64;

#[derive(Debug, Clone, PartialEq)]
pub enum Num {
    Int(i32),
    Long(BigInt),
    Float(f64),
    Complex(Complex64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Str {
    Bytes(Vec<u8>),
    Unicode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Invert,
    Not,
    UAdd,
    USub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

/// Node payloads. Child links live in the arena; variants carry only the
/// data that positional children cannot express.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Containers
    Module,
    Suite,

    // Statements
    ExprStmt,
    Assign,
    AugAssign { op: Operator },
    Print { has_dest: bool, newline: bool },
    Del,
    Pass,
    Break,
    Continue,
    Return { has_value: bool },
    Global { names: Vec<String> },
    If,
    While,
    For,
    FunctionDef { name: String },
    ClassDef { name: String },

    // Expressions
    Name { id: String },
    NumLit { value: Num },
    StrLit { value: Str },
    Tuple,
    List,
    Dict,
    BoolOp { op: BoolOpKind },
    BinOp { op: Operator },
    UnaryOp { op: UnaryOpKind },
    Compare { ops: Vec<CmpOp> },
    Lambda,
    IfExp,
    Call { has_star: bool, has_dstar: bool },
    Keyword { name: String },
    Attribute { attr: String },
    Subscript,
    Repr,
    ListComp,
    GeneratorExp,
    Comprehension,
    YieldExpr { has_value: bool },
    Params,
    Param { name: String },

    // Slices
    Index,
    Slice { has_lower: bool, has_upper: bool },
    ExtSlice,
    Ellipsis,

    // Recording-mode placeholders, one per syntactic category
    ErrorModule,
    ErrorStmt,
    ErrorExpr,
    ErrorSlice,
}

impl NodeKind {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            NodeKind::ErrorModule | NodeKind::ErrorStmt | NodeKind::ErrorExpr | NodeKind::ErrorSlice
        )
    }
}

impl Operator {
    pub fn from_symbol(sym: &str) -> Option<Operator> {
        Some(match sym {
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mult,
            "/" => Operator::Div,
            "%" => Operator::Mod,
            "**" => Operator::Pow,
            "<<" => Operator::LShift,
            ">>" => Operator::RShift,
            "|" => Operator::BitOr,
            "^" => Operator::BitXor,
            "&" => Operator::BitAnd,
            "//" => Operator::FloorDiv,
            _ => return None,
        })
    }

    pub fn from_augmented(sym: &str) -> Option<Operator> {
        sym.strip_suffix('=').and_then(Operator::from_symbol)
    }
}
