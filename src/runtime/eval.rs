use crate::language::ast::BinaryOp;
use crate::runtime::builder::Program;
use crate::runtime::error::{ErrorKind, RuntimeError, RuntimeResult};
use crate::runtime::memo::Memo;
use crate::runtime::node::{Node, SiteId};
use crate::runtime::scope::{Frame, FunctionSpec};
use crate::runtime::value::{Closure, Value};
use num_bigint::{BigInt, Sign};
use std::cmp::Ordering;
use std::io::Write;
use std::rc::Rc;

// Grow the host stack instead of overflowing it on deeply recursive
// programs: if less than the red zone remains, allocate another segment.
const STACK_RED_ZONE: usize = 100 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, Default)]
pub struct EvalOptions {
    /// `&&`/`||` evaluate both operands by default. Set this for
    /// conventional short-circuit behavior.
    pub short_circuit: bool,
}

/// Executes a built `Program` over a stack of scope frames. Print output
/// goes to `out`; the driver passes stdout, tests pass a buffer.
pub struct Evaluator<'p, W> {
    program: &'p Program,
    frame: Rc<Frame>,
    out: W,
    options: EvalOptions,
}

impl<'p, W: Write> Evaluator<'p, W> {
    pub fn new(program: &'p Program, out: W) -> Self {
        Self::with_options(program, out, EvalOptions::default())
    }

    pub fn with_options(program: &'p Program, out: W, options: EvalOptions) -> Self {
        let root = program.root_blueprint();
        let size = program.blueprint(root).len();
        Self {
            program,
            frame: Frame::root(root, size),
            out,
            options,
        }
    }

    pub fn run(&mut self) -> RuntimeResult<Value> {
        let program = self.program;
        self.eval(program.root())
    }

    fn eval(&mut self, node: &Node) -> RuntimeResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_node(node))
    }

    fn eval_node(&mut self, node: &Node) -> RuntimeResult<Value> {
        match node {
            Node::Int(value) => Ok(Value::Int(*value)),
            Node::Str(text) => Ok(Value::Str(text.clone())),
            Node::Bool(value) => Ok(Value::Bool(*value)),
            Node::Tuple { first, second } => {
                let first = self.eval(first)?;
                let second = self.eval(second)?;
                Ok(Value::tuple(first, second))
            }
            Node::First { value, site } => match self.eval(value)? {
                Value::Tuple(pair) => Ok(pair.0.clone()),
                other => Err(RuntimeError::new(
                    ErrorKind::InvalidProjection {
                        projection: "first",
                        found: other.tag(),
                    },
                    *site,
                )),
            },
            Node::Second { value, site } => match self.eval(value)? {
                Value::Tuple(pair) => Ok(pair.1.clone()),
                other => Err(RuntimeError::new(
                    ErrorKind::InvalidProjection {
                        projection: "second",
                        found: other.tag(),
                    },
                    *site,
                )),
            },
            Node::If {
                condition,
                then,
                otherwise,
                site,
            } => match self.eval(condition)? {
                Value::Bool(true) => self.eval(then),
                Value::Bool(false) => self.eval(otherwise),
                other => Err(RuntimeError::new(
                    ErrorKind::InvalidCondition { found: other.tag() },
                    *site,
                )),
            },
            Node::Let { slot, value, next } => {
                let value = self.eval(value)?;
                // Rebinding over a closure retires its cache for good: the
                // name it was memoized under no longer resolves to it.
                if let Some(Value::Closure(previous)) = self.frame.get(*slot) {
                    self.program
                        .function(previous.blueprint)
                        .memo
                        .borrow_mut()
                        .disable();
                }
                self.frame.set(*slot, value);
                self.eval(next)
            }
            Node::Var {
                blueprint,
                slot,
                name,
                site,
            } => {
                if self.frame.blueprint() == *blueprint {
                    if let Some(value) = self.frame.get(*slot) {
                        return Ok(value);
                    }
                }
                self.frame
                    .parent()
                    .and_then(|parent| parent.find(self.program.blueprints(), name))
                    .ok_or_else(|| RuntimeError::new(ErrorKind::VarNotFound, *site))
            }
            Node::Function { blueprint } => Ok(Value::Closure(Rc::new(Closure {
                blueprint: *blueprint,
                frame: self.frame.clone(),
            }))),
            Node::Print { value } => {
                let value = self.eval(value)?;
                let _ = writeln!(self.out, "{value}");
                Ok(value)
            }
            Node::Call {
                callee,
                arguments,
                site,
            } => self.eval_call(callee, arguments, *site),
            Node::Binary { op, lhs, rhs, site } => self.eval_binary(*op, lhs, rhs, *site),
            Node::BinaryRhsInt { op, lhs, rhs, site } => {
                self.eval_binary_rhs_int(*op, lhs, *rhs, *site)
            }
            Node::EqRhsBool { lhs, rhs, site } => match self.eval(lhs)? {
                Value::Bool(left) => Ok(Value::Bool(left == *rhs)),
                other => Err(invalid_operands("==", other.tag(), "boolean", *site)),
            },
        }
    }

    fn eval_call(
        &mut self,
        callee: &Node,
        arguments: &[Node],
        site: SiteId,
    ) -> RuntimeResult<Value> {
        let closure = match self.eval(callee)? {
            Value::Closure(closure) => closure,
            other => {
                return Err(RuntimeError::new(
                    ErrorKind::NotCallable { found: other.tag() },
                    site,
                ))
            }
        };
        let program = self.program;
        let function = program.function(closure.blueprint);
        if function.params.len() != arguments.len() {
            return Err(RuntimeError::new(ErrorKind::WrongArity, site));
        }
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.eval(argument)?);
        }

        if function.memo.borrow().enabled() {
            match Memo::fingerprint(&args) {
                Some(key) => {
                    {
                        let mut memo = function.memo.borrow_mut();
                        if let Some(hit) = memo.lookup(&key) {
                            return Ok(hit);
                        }
                        memo.record_miss();
                    }
                    let value = self.apply(&closure, function, args)?;
                    function.memo.borrow_mut().insert(key, value.clone());
                    Ok(value)
                }
                None => {
                    function.memo.borrow_mut().disable();
                    self.apply(&closure, function, args)
                }
            }
        } else {
            self.apply(&closure, function, args)
        }
    }

    /// Run a closure body under a fresh child frame of its captured frame,
    /// bracketing the active-frame switch.
    fn apply(
        &mut self,
        closure: &Closure,
        function: &FunctionSpec,
        args: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let size = self.program.blueprint(closure.blueprint).len();
        let child = Frame::child(&closure.frame, closure.blueprint, size);
        for (slot, value) in function.params.iter().zip(args) {
            child.set(*slot, value);
        }
        let previous = std::mem::replace(&mut self.frame, child);
        let result = self.eval(&function.body);
        self.frame = previous;
        result
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Node,
        rhs: &Node,
        site: SiteId,
    ) -> RuntimeResult<Value> {
        let left = self.eval(lhs)?;
        match op {
            BinaryOp::Add => self.eval_add(left, rhs, site),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.eval_arithmetic(op, left, rhs, site)
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                self.eval_comparison(op, left, rhs, site)
            }
            BinaryOp::Eq | BinaryOp::Neq => self.eval_equality(op, left, rhs, site),
            BinaryOp::And | BinaryOp::Or => self.eval_logical(op, left, rhs, site),
        }
    }

    /// `+` is the one polymorphic operator beyond numbers: either side may
    /// be a string, with numeric operands rendered in decimal.
    fn eval_add(&mut self, left: Value, rhs: &Node, site: SiteId) -> RuntimeResult<Value> {
        match left {
            Value::Int(l) => match self.eval(rhs)? {
                Value::Int(r) => Ok(add_ints(l, r)),
                Value::Big(r) => Ok(Value::big(BigInt::from(l) + &*r)),
                Value::Str(r) => Ok(Value::string(format!("{l}{r}"))),
                other => Err(invalid_operands("+", "int", other.tag(), site)),
            },
            Value::Big(l) => match self.eval(rhs)? {
                Value::Int(r) => Ok(Value::big(&*l + BigInt::from(r))),
                Value::Big(r) => Ok(Value::big(&*l + &*r)),
                Value::Str(r) => Ok(Value::string(format!("{l}{r}"))),
                other => Err(invalid_operands("+", "int", other.tag(), site)),
            },
            Value::Str(l) => match self.eval(rhs)? {
                Value::Int(r) => Ok(Value::string(format!("{l}{r}"))),
                Value::Big(r) => Ok(Value::string(format!("{l}{r}"))),
                Value::Str(r) => Ok(Value::string(format!("{l}{r}"))),
                other => Err(invalid_operands("+", "string", other.tag(), site)),
            },
            other => Err(invalid_left("+", other.tag(), site)),
        }
    }

    fn eval_arithmetic(
        &mut self,
        op: BinaryOp,
        left: Value,
        rhs: &Node,
        site: SiteId,
    ) -> RuntimeResult<Value> {
        match left {
            Value::Int(l) => match self.eval(rhs)? {
                Value::Int(r) => int_arithmetic(op, l, r, site),
                Value::Big(r) => big_arithmetic(op, &BigInt::from(l), &r, site),
                other => Err(invalid_operands(op.symbol(), "int", other.tag(), site)),
            },
            Value::Big(l) => match self.eval(rhs)? {
                Value::Int(r) => big_arithmetic(op, &l, &BigInt::from(r), site),
                Value::Big(r) => big_arithmetic(op, &l, &r, site),
                other => Err(invalid_operands(op.symbol(), "int", other.tag(), site)),
            },
            other => Err(invalid_left(op.symbol(), other.tag(), site)),
        }
    }

    fn eval_comparison(
        &mut self,
        op: BinaryOp,
        left: Value,
        rhs: &Node,
        site: SiteId,
    ) -> RuntimeResult<Value> {
        let ordering = match left {
            Value::Int(l) => match self.eval(rhs)? {
                Value::Int(r) => l.cmp(&r),
                Value::Big(r) => BigInt::from(l).cmp(&r),
                other => return Err(invalid_operands(op.symbol(), "int", other.tag(), site)),
            },
            Value::Big(l) => match self.eval(rhs)? {
                Value::Int(r) => (*l).cmp(&BigInt::from(r)),
                Value::Big(r) => (*l).cmp(&r),
                other => return Err(invalid_operands(op.symbol(), "int", other.tag(), site)),
            },
            other => return Err(invalid_left(op.symbol(), other.tag(), site)),
        };
        Ok(Value::Bool(ordering_matches(op, ordering)))
    }

    fn eval_equality(
        &mut self,
        op: BinaryOp,
        left: Value,
        rhs: &Node,
        site: SiteId,
    ) -> RuntimeResult<Value> {
        let wanted = op == BinaryOp::Eq;
        let equal = match left {
            Value::Int(l) => match self.eval(rhs)? {
                Value::Int(r) => l == r,
                Value::Big(r) => BigInt::from(l) == *r,
                other => return Err(invalid_operands(op.symbol(), "int", other.tag(), site)),
            },
            Value::Big(l) => match self.eval(rhs)? {
                Value::Int(r) => *l == BigInt::from(r),
                Value::Big(r) => l == r,
                other => return Err(invalid_operands(op.symbol(), "int", other.tag(), site)),
            },
            Value::Bool(l) => match self.eval(rhs)? {
                Value::Bool(r) => l == r,
                other => return Err(invalid_operands(op.symbol(), "boolean", other.tag(), site)),
            },
            Value::Str(l) => match self.eval(rhs)? {
                Value::Str(r) => l == r,
                other => return Err(invalid_operands(op.symbol(), "string", other.tag(), site)),
            },
            other => return Err(invalid_left(op.symbol(), other.tag(), site)),
        };
        Ok(Value::Bool(equal == wanted))
    }

    fn eval_logical(
        &mut self,
        op: BinaryOp,
        left: Value,
        rhs: &Node,
        site: SiteId,
    ) -> RuntimeResult<Value> {
        let l = match left {
            Value::Bool(l) => l,
            other => return Err(invalid_left(op.symbol(), other.tag(), site)),
        };
        if self.options.short_circuit {
            match op {
                BinaryOp::And if !l => return Ok(Value::Bool(false)),
                BinaryOp::Or if l => return Ok(Value::Bool(true)),
                _ => {}
            }
        }
        match self.eval(rhs)? {
            Value::Bool(r) => Ok(Value::Bool(if op == BinaryOp::And {
                l && r
            } else {
                l || r
            })),
            other => Err(invalid_operands(op.symbol(), "boolean", other.tag(), site)),
        }
    }

    /// Fast path for a literal integer right operand, folded at build time.
    /// Semantics are identical to the generic dispatch for every left kind.
    fn eval_binary_rhs_int(
        &mut self,
        op: BinaryOp,
        lhs: &Node,
        r: i64,
        site: SiteId,
    ) -> RuntimeResult<Value> {
        let left = self.eval(lhs)?;
        match op {
            BinaryOp::Add => match left {
                Value::Int(l) => Ok(add_ints(l, r)),
                Value::Big(l) => Ok(Value::big(&*l + BigInt::from(r))),
                Value::Str(l) => Ok(Value::string(format!("{l}{r}"))),
                other => Err(invalid_operands("+", other.tag(), "int", site)),
            },
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => match left {
                Value::Int(l) => int_arithmetic(op, l, r, site),
                Value::Big(l) => big_arithmetic(op, &l, &BigInt::from(r), site),
                other => Err(invalid_operands(op.symbol(), other.tag(), "int", site)),
            },
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let ordering = match left {
                    Value::Int(l) => l.cmp(&r),
                    Value::Big(l) => (*l).cmp(&BigInt::from(r)),
                    other => {
                        return Err(invalid_operands(op.symbol(), other.tag(), "int", site))
                    }
                };
                Ok(Value::Bool(ordering_matches(op, ordering)))
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                let equal = match left {
                    Value::Int(l) => l == r,
                    Value::Big(l) => *l == BigInt::from(r),
                    other => {
                        return Err(invalid_operands(op.symbol(), other.tag(), "int", site))
                    }
                };
                Ok(Value::Bool(equal == (op == BinaryOp::Eq)))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("logical operators are never folded"),
        }
    }
}

/// Overflowing addition promotes to a big integer instead of wrapping.
fn add_ints(l: i64, r: i64) -> Value {
    match l.checked_add(r) {
        Some(sum) => Value::Int(sum),
        None => Value::big(BigInt::from(l) + BigInt::from(r)),
    }
}

fn int_arithmetic(op: BinaryOp, l: i64, r: i64, site: SiteId) -> RuntimeResult<Value> {
    match op {
        BinaryOp::Sub => Ok(match l.checked_sub(r) {
            Some(difference) => Value::Int(difference),
            None => Value::big(BigInt::from(l) - BigInt::from(r)),
        }),
        BinaryOp::Mul => Ok(Value::Int(l.wrapping_mul(r))),
        BinaryOp::Div => {
            if r == 0 {
                return Err(RuntimeError::new(ErrorKind::DivideByZero, site));
            }
            Ok(Value::Int(l.wrapping_div(r)))
        }
        BinaryOp::Rem => {
            if r == 0 {
                return Err(RuntimeError::new(ErrorKind::DivideByZero, site));
            }
            Ok(Value::Int(l.wrapping_rem(r)))
        }
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn big_arithmetic(op: BinaryOp, l: &BigInt, r: &BigInt, site: SiteId) -> RuntimeResult<Value> {
    match op {
        BinaryOp::Sub => Ok(Value::big(l - r)),
        BinaryOp::Mul => Ok(Value::big(l * r)),
        BinaryOp::Div => {
            if r.sign() == Sign::NoSign {
                return Err(RuntimeError::new(ErrorKind::DivideByZero, site));
            }
            Ok(Value::big(l / r))
        }
        BinaryOp::Rem => {
            if r.sign() == Sign::NoSign {
                return Err(RuntimeError::new(ErrorKind::DivideByZero, site));
            }
            Ok(Value::big(l % r))
        }
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn ordering_matches(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Lte => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Gte => ordering != Ordering::Less,
        _ => unreachable!("not a comparison operator"),
    }
}

fn invalid_operands(op: &'static str, lhs: &'static str, rhs: &'static str, site: SiteId) -> RuntimeError {
    RuntimeError::new(ErrorKind::InvalidOperands { op, lhs, rhs }, site)
}

fn invalid_left(op: &'static str, lhs: &'static str, site: SiteId) -> RuntimeError {
    RuntimeError::new(ErrorKind::InvalidLeftOperand { op, lhs }, site)
}
