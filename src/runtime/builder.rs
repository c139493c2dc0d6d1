use crate::language::ast::{BinaryOp, Location, ProgramAst, Term};
use crate::runtime::memo::Memo;
use crate::runtime::node::{Node, SiteId};
use crate::runtime::scope::{Blueprint, BlueprintId, FunctionSpec};
use std::cell::RefCell;
use std::rc::Rc;

/// Output of the build phase: the composed evaluator tree, the blueprint
/// arena it refers into, and the site table for diagnostics.
pub struct Program {
    root: Node,
    root_blueprint: BlueprintId,
    blueprints: Vec<Blueprint>,
    sites: Vec<Location>,
}

impl Program {
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_blueprint(&self) -> BlueprintId {
        self.root_blueprint
    }

    pub fn blueprints(&self) -> &[Blueprint] {
        &self.blueprints
    }

    pub fn blueprint(&self, id: BlueprintId) -> &Blueprint {
        &self.blueprints[id]
    }

    /// The function behind a closure. Closures are only ever created from
    /// function blueprints, so the lookup cannot miss.
    pub fn function(&self, id: BlueprintId) -> &FunctionSpec {
        match self.blueprints[id].function() {
            Some(spec) => spec,
            None => unreachable!("closure over a non-function blueprint"),
        }
    }

    pub fn site(&self, id: SiteId) -> &Location {
        &self.sites[id]
    }
}

/// Single-pass AST traversal producing a `Program`. All build state lives
/// here: the blueprint being populated, the name a `Let` is currently
/// binding, the names a function body may use without losing purity, and
/// the purity tracker itself.
pub struct Builder {
    blueprints: Vec<Blueprint>,
    sites: Vec<Location>,
    active: BlueprintId,
    last_bound: Option<Rc<str>>,
    visible: Vec<Rc<str>>,
    closure_depth: usize,
    impure: bool,
}

impl Builder {
    pub fn build(ast: &ProgramAst) -> Program {
        let mut builder = Builder {
            blueprints: vec![Blueprint::new()],
            sites: Vec::new(),
            active: 0,
            last_bound: None,
            visible: Vec::new(),
            closure_depth: 0,
            impure: false,
        };
        let root = builder.node(&ast.expression);
        Program {
            root,
            root_blueprint: 0,
            blueprints: builder.blueprints,
            sites: builder.sites,
        }
    }

    fn site(&mut self, location: &Location) -> SiteId {
        self.sites.push(location.clone());
        self.sites.len() - 1
    }

    fn register(&mut self, name: &Rc<str>) -> usize {
        self.blueprints[self.active].register(name)
    }

    fn is_visible(&self, name: &str) -> bool {
        self.visible.iter().any(|known| &**known == name)
    }

    fn node(&mut self, term: &Term) -> Node {
        match term {
            Term::Int { value, .. } => Node::Int(*value),
            Term::Str { value, .. } => Node::Str(Rc::from(value.as_str())),
            Term::Bool { value, .. } => Node::Bool(*value),
            Term::Tuple { first, second, .. } => Node::Tuple {
                first: Box::new(self.node(first)),
                second: Box::new(self.node(second)),
            },
            Term::First { value, location } => {
                let site = self.site(location);
                Node::First {
                    value: Box::new(self.node(value)),
                    site,
                }
            }
            Term::Second { value, location } => {
                let site = self.site(location);
                Node::Second {
                    value: Box::new(self.node(value)),
                    site,
                }
            }
            Term::If {
                condition,
                then,
                otherwise,
                location,
            } => {
                let site = self.site(location);
                Node::If {
                    condition: Box::new(self.node(condition)),
                    then: Box::new(self.node(then)),
                    otherwise: Box::new(self.node(otherwise)),
                    site,
                }
            }
            Term::Let {
                name, value, next, ..
            } => {
                let bound: Rc<str> = Rc::from(name.text.as_str());
                let slot = self.register(&bound);
                self.last_bound = Some(bound.clone());
                let value = self.node(value);
                self.last_bound = None;
                self.visible.push(bound);
                let next = self.node(next);
                Node::Let {
                    slot,
                    value: Box::new(value),
                    next: Box::new(next),
                }
            }
            Term::Var { text, location } => {
                let name: Rc<str> = Rc::from(text.as_str());
                let slot = self.register(&name);
                if !self.is_visible(&name) {
                    self.impure = true;
                }
                let site = self.site(location);
                Node::Var {
                    blueprint: self.active,
                    slot,
                    name,
                    site,
                }
            }
            Term::Function {
                parameters, value, ..
            } => {
                let enclosing = self.active;
                self.blueprints.push(Blueprint::new());
                let id = self.blueprints.len() - 1;
                self.active = id;

                let owner = self.last_bound.clone();
                let saved_visible = std::mem::take(&mut self.visible);
                if let Some(owner) = &owner {
                    self.visible.push(owner.clone());
                }
                let mut params = Vec::with_capacity(parameters.len());
                for parameter in parameters {
                    let name: Rc<str> = Rc::from(parameter.text.as_str());
                    params.push(self.register(&name));
                    self.visible.push(name);
                }

                // The purity flag only resets for top-level functions;
                // nested ones inherit and contribute to it.
                if self.closure_depth == 0 {
                    self.impure = false;
                }
                self.closure_depth += 1;
                let body = self.node(value);
                self.closure_depth -= 1;
                self.active = enclosing;
                self.visible = saved_visible;

                let memoizable = owner.is_some() && !self.impure;
                self.blueprints[id].set_function(FunctionSpec {
                    params,
                    body,
                    memo: RefCell::new(Memo::new(memoizable)),
                });
                Node::Function { blueprint: id }
            }
            Term::Call {
                callee,
                arguments,
                location,
            } => {
                let site = self.site(location);
                let callee = Box::new(self.node(callee));
                let arguments = arguments.iter().map(|arg| self.node(arg)).collect();
                Node::Call {
                    callee,
                    arguments,
                    site,
                }
            }
            Term::Print { value, .. } => {
                self.impure = true;
                Node::Print {
                    value: Box::new(self.node(value)),
                }
            }
            Term::Binary {
                op,
                lhs,
                rhs,
                location,
            } => {
                let site = self.site(location);
                let lhs = Box::new(self.node(lhs));
                if let Term::Int { value, .. } = &**rhs {
                    if matches!(
                        op,
                        BinaryOp::Add
                            | BinaryOp::Sub
                            | BinaryOp::Mul
                            | BinaryOp::Div
                            | BinaryOp::Rem
                            | BinaryOp::Lt
                            | BinaryOp::Lte
                            | BinaryOp::Gt
                            | BinaryOp::Gte
                            | BinaryOp::Eq
                            | BinaryOp::Neq
                    ) {
                        return Node::BinaryRhsInt {
                            op: *op,
                            lhs,
                            rhs: *value,
                            site,
                        };
                    }
                } else if let Term::Bool { value, .. } = &**rhs {
                    if *op == BinaryOp::Eq {
                        return Node::EqRhsBool {
                            lhs,
                            rhs: *value,
                            site,
                        };
                    }
                }
                Node::Binary {
                    op: *op,
                    lhs,
                    rhs: Box::new(self.node(rhs)),
                    site,
                }
            }
        }
    }
}
