use crate::language::ast::{BinaryOp, Ident, Location, ProgramAst, Term};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::{Builder, EvalOptions, Evaluator, Program, Value};


fn loc() -> Location {
    Location {
        filename: "test.rinha".into(),
        start: 0,
        end: 0,
    }
}

fn int(value: i64) -> Term {
    Term::Int {
        value,
        location: loc(),
    }
}

fn string(text: &str) -> Term {
    Term::Str {
        value: text.into(),
        location: loc(),
    }
}

fn boolean(value: bool) -> Term {
    Term::Bool {
        value,
        location: loc(),
    }
}

fn tuple(first: Term, second: Term) -> Term {
    Term::Tuple {
        first: Box::new(first),
        second: Box::new(second),
        location: loc(),
    }
}

fn first(value: Term) -> Term {
    Term::First {
        value: Box::new(value),
        location: loc(),
    }
}

fn second(value: Term) -> Term {
    Term::Second {
        value: Box::new(value),
        location: loc(),
    }
}

fn var(text: &str) -> Term {
    Term::Var {
        text: text.into(),
        location: loc(),
    }
}

fn let_(name: &str, value: Term, next: Term) -> Term {
    Term::Let {
        name: Ident { text: name.into() },
        value: Box::new(value),
        next: Box::new(next),
        location: loc(),
    }
}

fn function(params: &[&str], body: Term) -> Term {
    Term::Function {
        parameters: params
            .iter()
            .map(|text| Ident {
                text: (*text).into(),
            })
            .collect(),
        value: Box::new(body),
        location: loc(),
    }
}

fn call(callee: Term, arguments: Vec<Term>) -> Term {
    Term::Call {
        callee: Box::new(callee),
        arguments,
        location: loc(),
    }
}

fn if_(condition: Term, then: Term, otherwise: Term) -> Term {
    Term::If {
        condition: Box::new(condition),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
        location: loc(),
    }
}

fn binary(op: BinaryOp, lhs: Term, rhs: Term) -> Term {
    Term::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        location: loc(),
    }
}

fn print(value: Term) -> Term {
    Term::Print {
        value: Box::new(value),
        location: loc(),
    }
}

/// Build and run a single expression, capturing print output.
fn eval_expr(expression: Term) -> (Program, RuntimeResult<Value>, String) {
    eval_expr_with(expression, EvalOptions::default())
}

fn eval_expr_with(
    expression: Term,
    options: EvalOptions,
) -> (Program, RuntimeResult<Value>, String) {
    let program = Builder::build(&ProgramAst { expression });
    let mut out = Vec::new();
    let result = Evaluator::with_options(&program, &mut out, options).run();
    (program, result, String::from_utf8(out).expect("utf8 output"))
}

fn run_ok(expression: Term) -> (Value, String) {
    let (_, result, output) = eval_expr(expression);
    (result.expect("evaluation succeeds"), output)
}

fn run_err(expression: Term) -> RuntimeError {
    let (_, result, _) = eval_expr(expression);
    match result {
        Ok(value) => panic!("expected an error, got {value}"),
        Err(error) => error,
    }
}

fn memo_state(program: &Program, blueprint: usize) -> (bool, usize) {
    let memo = program
        .blueprint(blueprint)
        .function()
        .expect("function blueprint")
        .memo
        .borrow();
    (memo.enabled(), memo.size())
}
