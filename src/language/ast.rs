use serde::Deserialize;

/// Root of the AST wire format: `{"expression": {...}}` plus whatever
/// extra metadata the parser emits, which is ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct ProgramAst {
    pub expression: Term,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Location {
    pub filename: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Ident {
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum Term {
    Int {
        value: i64,
        location: Location,
    },
    Str {
        value: String,
        location: Location,
    },
    Bool {
        value: bool,
        location: Location,
    },
    Tuple {
        first: Box<Term>,
        second: Box<Term>,
        location: Location,
    },
    First {
        value: Box<Term>,
        location: Location,
    },
    Second {
        value: Box<Term>,
        location: Location,
    },
    Let {
        name: Ident,
        value: Box<Term>,
        next: Box<Term>,
        location: Location,
    },
    Var {
        text: String,
        location: Location,
    },
    Function {
        parameters: Vec<Ident>,
        value: Box<Term>,
        location: Location,
    },
    Call {
        callee: Box<Term>,
        arguments: Vec<Term>,
        location: Location,
    },
    If {
        condition: Box<Term>,
        then: Box<Term>,
        otherwise: Box<Term>,
        location: Location,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Term>,
        rhs: Box<Term>,
        location: Location,
    },
    Print {
        value: Box<Term>,
        location: Location,
    },
}

impl Term {
    pub fn location(&self) -> &Location {
        match self {
            Term::Int { location, .. }
            | Term::Str { location, .. }
            | Term::Bool { location, .. }
            | Term::Tuple { location, .. }
            | Term::First { location, .. }
            | Term::Second { location, .. }
            | Term::Let { location, .. }
            | Term::Var { location, .. }
            | Term::Function { location, .. }
            | Term::Call { location, .. }
            | Term::If { location, .. }
            | Term::Binary { location, .. }
            | Term::Print { location, .. } => location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_tagged_expression_tree() {
        let json = r#"{
            "name": "demo.rinha",
            "expression": {
                "kind": "Let",
                "name": { "text": "x" },
                "value": {
                    "kind": "Binary",
                    "op": "Add",
                    "lhs": { "kind": "Int", "value": 1, "location": { "filename": "demo.rinha", "start": 8, "end": 9 } },
                    "rhs": { "kind": "Int", "value": 2, "location": { "filename": "demo.rinha", "start": 12, "end": 13 } },
                    "location": { "filename": "demo.rinha", "start": 8, "end": 13 }
                },
                "next": {
                    "kind": "Print",
                    "value": { "kind": "Var", "text": "x", "location": { "filename": "demo.rinha", "start": 21, "end": 22 } },
                    "location": { "filename": "demo.rinha", "start": 15, "end": 23 }
                },
                "location": { "filename": "demo.rinha", "start": 0, "end": 23 }
            },
            "location": { "filename": "demo.rinha", "start": 0, "end": 23 }
        }"#;
        let ast: ProgramAst = serde_json::from_str(json).expect("decode");
        let Term::Let { name, value, next, .. } = ast.expression else {
            panic!("expected a let at the root");
        };
        assert_eq!(name.text, "x");
        assert!(matches!(*value, Term::Binary { op: BinaryOp::Add, .. }));
        assert!(matches!(*next, Term::Print { .. }));
    }

    #[test]
    fn decodes_every_operator_name() {
        for (name, op) in [
            ("Add", BinaryOp::Add),
            ("Sub", BinaryOp::Sub),
            ("Mul", BinaryOp::Mul),
            ("Div", BinaryOp::Div),
            ("Rem", BinaryOp::Rem),
            ("Lt", BinaryOp::Lt),
            ("Lte", BinaryOp::Lte),
            ("Gt", BinaryOp::Gt),
            ("Gte", BinaryOp::Gte),
            ("Eq", BinaryOp::Eq),
            ("Neq", BinaryOp::Neq),
            ("And", BinaryOp::And),
            ("Or", BinaryOp::Or),
        ] {
            let decoded: BinaryOp =
                serde_json::from_str(&format!("\"{name}\"")).expect("operator name");
            assert_eq!(decoded, op);
        }
    }

    #[test]
    fn rejects_unknown_kinds() {
        let json = r#"{ "expression": { "kind": "While", "location": { "filename": "x", "start": 0, "end": 0 } } }"#;
        assert!(serde_json::from_str::<ProgramAst>(json).is_err());
    }
}
