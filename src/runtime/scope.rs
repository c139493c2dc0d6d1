use crate::runtime::memo::Memo;
use crate::runtime::node::Node;
use crate::runtime::value::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type BlueprintId = usize;

/// Build-time description of one scope: a dense name→slot table and, for
/// function scopes, the parameters, body and memoization cell. Blueprints
/// live in the program's arena and are immutable once the build finishes,
/// except for the interior-mutable memo cell.
pub struct Blueprint {
    names: FxHashMap<Rc<str>, usize>,
    seq: usize,
    function: Option<FunctionSpec>,
}

pub struct FunctionSpec {
    /// Slot indices of the parameters, in declaration order.
    pub params: Vec<usize>,
    pub body: Node,
    pub memo: RefCell<Memo>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self {
            names: FxHashMap::default(),
            seq: 0,
            function: None,
        }
    }

    /// Assign the next slot to `name`, or return the slot it already has.
    pub fn register(&mut self, name: &Rc<str>) -> usize {
        if let Some(&slot) = self.names.get(&**name) {
            return slot;
        }
        let slot = self.seq;
        self.names.insert(name.clone(), slot);
        self.seq += 1;
        slot
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Frame size for instances of this blueprint.
    pub fn len(&self) -> usize {
        self.seq
    }

    pub fn is_empty(&self) -> bool {
        self.seq == 0
    }

    pub fn function(&self) -> Option<&FunctionSpec> {
        self.function.as_ref()
    }

    pub(crate) fn set_function(&mut self, spec: FunctionSpec) {
        self.function = Some(spec);
    }
}

impl Default for Blueprint {
    fn default() -> Self {
        Self::new()
    }
}

/// Run-time instance of a blueprint: a slot vector plus the enclosing
/// frame. Call frames die with the call unless a closure keeps them alive.
pub struct Frame {
    blueprint: BlueprintId,
    parent: Option<Rc<Frame>>,
    slots: RefCell<Vec<Option<Value>>>,
}

impl Frame {
    pub fn root(blueprint: BlueprintId, size: usize) -> Rc<Frame> {
        Rc::new(Frame {
            blueprint,
            parent: None,
            slots: RefCell::new(vec![None; size]),
        })
    }

    pub fn child(parent: &Rc<Frame>, blueprint: BlueprintId, size: usize) -> Rc<Frame> {
        Rc::new(Frame {
            blueprint,
            parent: Some(parent.clone()),
            slots: RefCell::new(vec![None; size]),
        })
    }

    pub fn blueprint(&self) -> BlueprintId {
        self.blueprint
    }

    pub fn parent(&self) -> Option<&Rc<Frame>> {
        self.parent.as_ref()
    }

    pub fn set(&self, slot: usize, value: Value) {
        self.slots.borrow_mut()[slot] = Some(value);
    }

    pub fn get(&self, slot: usize) -> Option<Value> {
        self.slots.borrow()[slot].clone()
    }

    /// Lexical fallback: resolve `name` against this frame and its parents,
    /// returning the first populated slot. Registered-but-unwritten names
    /// are skipped, which is what lets recursion and closures cross
    /// blueprint boundaries.
    pub fn find(&self, blueprints: &[Blueprint], name: &str) -> Option<Value> {
        let mut current = self;
        loop {
            if let Some(slot) = blueprints[current.blueprint].slot_of(name) {
                if let Some(value) = current.get(slot) {
                    return Some(value);
                }
            }
            match current.parent.as_ref() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Rc<str> {
        Rc::from(text)
    }

    #[test]
    fn registration_is_idempotent_and_dense() {
        let mut blueprint = Blueprint::new();
        assert_eq!(blueprint.register(&name("a")), 0);
        assert_eq!(blueprint.register(&name("b")), 1);
        assert_eq!(blueprint.register(&name("a")), 0);
        assert_eq!(blueprint.len(), 2);
    }

    #[test]
    fn find_skips_unpopulated_slots_and_walks_parents() {
        let mut root = Blueprint::new();
        let n_root = root.register(&name("n"));
        let mut inner = Blueprint::new();
        // Registered in the inner scope but never written there.
        inner.register(&name("n"));
        let blueprints = vec![root, inner];

        let root_frame = Frame::root(0, blueprints[0].len());
        root_frame.set(n_root, Value::Int(7));
        let call_frame = Frame::child(&root_frame, 1, blueprints[1].len());

        assert_eq!(call_frame.find(&blueprints, "n"), Some(Value::Int(7)));
        assert_eq!(call_frame.find(&blueprints, "missing"), None);
    }

    #[test]
    fn shadowing_resolves_to_the_nearest_populated_slot() {
        let mut root = Blueprint::new();
        let n_root = root.register(&name("n"));
        let mut inner = Blueprint::new();
        let n_inner = inner.register(&name("n"));
        let blueprints = vec![root, inner];

        let root_frame = Frame::root(0, blueprints[0].len());
        root_frame.set(n_root, Value::Int(1));
        let call_frame = Frame::child(&root_frame, 1, blueprints[1].len());
        call_frame.set(n_inner, Value::Int(2));

        assert_eq!(call_frame.find(&blueprints, "n"), Some(Value::Int(2)));
    }
}
