use crate::runtime::node::SiteId;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A failed evaluation: what went wrong plus the site of the node that
/// detected it, for mapping back to the source text.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub site: SiteId,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, site: SiteId) -> Self {
        Self { kind, site }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Invalid tuple operation: {projection}(<{found}>)")]
    InvalidProjection {
        projection: &'static str,
        found: &'static str,
    },
    #[error("Invalid type: if(<{found}>)")]
    InvalidCondition { found: &'static str },
    #[error("Invalid binary operation: <{lhs}> {op} <{rhs}>")]
    InvalidOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Invalid binary operation: <{lhs}> {op} ...")]
    InvalidLeftOperand {
        op: &'static str,
        lhs: &'static str,
    },
    #[error("it is not possible to call a <{found}>")]
    NotCallable { found: &'static str },
    #[error("Wrong number of arguments")]
    WrongArity,
    #[error("var not found")]
    VarNotFound,
    #[error("Integer divide by zero")]
    DivideByZero,
}
