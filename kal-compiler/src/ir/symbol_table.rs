use std::collections::HashMap;

use crate::ast::Prototype;
use crate::ir::ValueId;

/// Scoped mapping from source names to the stack slots backing them.
///
/// Shadowing is a stack discipline: `push` installs a binding in front of any
/// older binding of the same name, `lookup` finds the innermost one, and
/// `pop` removes the newest binding *for a given name*, uncovering whatever
/// it shadowed. Naming the popped binding lets multi-binding `var` forms
/// restore each shadowed name exactly, in any order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    bindings: Vec<(String, ValueId)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn push(&mut self, name: &str, slot: ValueId) {
        self.bindings.push((name.to_string(), slot));
    }

    pub fn lookup(&self, name: &str) -> Option<ValueId> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, slot)| *slot)
    }

    pub fn pop(&mut self, name: &str) {
        if let Some(at) = self.bindings.iter().rposition(|(bound, _)| bound == name) {
            self.bindings.remove(at);
        }
    }

    /// Drop every binding; the table is per function body.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

/// The latest prototype seen for each function name.
///
/// A re-declaration replaces the entry outright; whatever IR was already
/// emitted against the old prototype is left alone, and only later lookups
/// see the new one.
#[derive(Debug, Default)]
pub struct PrototypeTable {
    protos: HashMap<String, Prototype>,
}

impl PrototypeTable {
    pub fn new() -> Self {
        PrototypeTable::default()
    }

    pub fn put(&mut self, name: String, proto: Prototype) {
        self.protos.insert(name, proto);
    }

    pub fn get(&self, name: &str) -> Option<&Prototype> {
        self.protos.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PrototypeKind;
    use crate::SourceLocation;

    #[test]
    fn lookup_finds_the_innermost_binding() {
        let mut table = SymbolTable::new();
        table.push("x", ValueId(1));
        table.push("y", ValueId(2));
        table.push("x", ValueId(3));
        assert_eq!(table.lookup("x"), Some(ValueId(3)));
        assert_eq!(table.lookup("y"), Some(ValueId(2)));
        assert_eq!(table.lookup("z"), None);
    }

    #[test]
    fn pop_by_name_uncovers_the_shadowed_binding() {
        let mut table = SymbolTable::new();
        table.push("x", ValueId(1));
        table.push("x", ValueId(2));
        table.pop("x");
        assert_eq!(table.lookup("x"), Some(ValueId(1)));
        table.pop("x");
        assert_eq!(table.lookup("x"), None);
    }

    #[test]
    fn pop_restores_across_interleaved_names() {
        let mut table = SymbolTable::new();
        table.push("a", ValueId(1));
        table.push("b", ValueId(2));
        table.push("a", ValueId(3));
        // Restoring in reverse binding order, as a `var a, b in ...` body does.
        table.pop("b");
        table.pop("a");
        assert_eq!(table.lookup("a"), Some(ValueId(1)));
        assert_eq!(table.lookup("b"), None);
    }

    #[test]
    fn prototype_replacement_is_total() {
        let proto = |params: &[&str]| Prototype {
            loc: SourceLocation::default(),
            name: "f".to_string(),
            params: params.iter().map(|s| s.to_string()).collect(),
            kind: PrototypeKind::Function,
        };
        let mut table = PrototypeTable::new();
        table.put("f".to_string(), proto(&["a"]));
        table.put("f".to_string(), proto(&["a", "b"]));
        assert_eq!(table.get("f").unwrap().params.len(), 2);
    }
}
