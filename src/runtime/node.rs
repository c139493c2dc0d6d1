use crate::language::ast::BinaryOp;
use crate::runtime::scope::BlueprintId;
use std::rc::Rc;

/// Index into the program's site table, mapping a failing node back to its
/// source location.
pub type SiteId = usize;

/// A composed evaluator node, produced once by the build phase. Nodes that
/// can fail carry their `SiteId`; literals and other infallible nodes do
/// not. `BinaryRhsInt` and `EqRhsBool` are the literal-operand fast paths:
/// the right operand was folded at build time.
pub enum Node {
    Int(i64),
    Str(Rc<str>),
    Bool(bool),
    Tuple {
        first: Box<Node>,
        second: Box<Node>,
    },
    First {
        value: Box<Node>,
        site: SiteId,
    },
    Second {
        value: Box<Node>,
        site: SiteId,
    },
    If {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
        site: SiteId,
    },
    Let {
        slot: usize,
        value: Box<Node>,
        next: Box<Node>,
    },
    Var {
        blueprint: BlueprintId,
        slot: usize,
        name: Rc<str>,
        site: SiteId,
    },
    Function {
        blueprint: BlueprintId,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
        site: SiteId,
    },
    Print {
        value: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
        site: SiteId,
    },
    BinaryRhsInt {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: i64,
        site: SiteId,
    },
    EqRhsBool {
        lhs: Box<Node>,
        rhs: bool,
        site: SiteId,
    },
}
