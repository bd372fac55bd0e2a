use crate::error::RuntimeError;
use crate::value::Value;
use indexmap::IndexMap;
use log::trace;

/// Index of a scope inside an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    bindings: IndexMap<String, Binding>,
    captured: bool,
}

/// Arena of lexically nested scopes. Slot 0 is the root scope and lives as
/// long as the environment does.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Option<Scope>>,
    free: Vec<usize>,
}

impl Default for Environment {
    fn default() -> Environment {
        Environment::new()
    }
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            scopes: vec![Some(Scope::default())],
            free: Vec::new(),
        }
    }
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let scope = Scope {
            parent: Some(parent),
            ..Scope::default()
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.scopes[slot] = Some(scope);
                ScopeId(slot)
            }
            None => {
                self.scopes.push(Some(scope));
                ScopeId(self.scopes.len() - 1)
            }
        };
        trace!("push scope {} (parent {})", id.0, parent.0);
        id
    }
    /// Frees `id` unless it is the root or a context closure refers to it.
    pub fn release(&mut self, id: ScopeId) {
        if id == self.root() {
            return;
        }
        let captured = match self.scopes.get(id.0) {
            Some(Some(scope)) => scope.captured,
            _ => return,
        };
        if captured {
            trace!("keep captured scope {}", id.0);
            return;
        }
        self.scopes[id.0] = None;
        self.free.push(id.0);
        trace!("release scope {}", id.0);
    }
    pub fn capture(&mut self, id: ScopeId) {
        if let Some(Some(scope)) = self.scopes.get_mut(id.0) {
            scope.captured = true;
        }
    }
    pub fn live_scopes(&self) -> usize {
        self.scopes.iter().filter(|s| s.is_some()).count()
    }
    pub fn define(&mut self, id: ScopeId, name: &str, value: Value, mutable: bool) {
        if let Some(Some(scope)) = self.scopes.get_mut(id.0) {
            scope
                .bindings
                .insert(name.to_string(), Binding { value, mutable });
        }
    }
    /// Innermost binding of `name` visible from `id`.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<&Binding> {
        let mut cur = Some(id);
        while let Some(scope) = cur.and_then(|id| self.scope(id)) {
            if let Some(binding) = scope.bindings.get(name) {
                return Some(binding);
            }
            cur = scope.parent;
        }
        None
    }
    pub fn get(&self, id: ScopeId, name: &str) -> Result<Value, RuntimeError> {
        self.lookup(id, name)
            .map(|b| b.value.clone())
            .ok_or_else(|| RuntimeError::Name(name.to_string()))
    }
    /// Only bindings held directly by `id`, ignoring enclosing scopes.
    pub fn get_local(&self, id: ScopeId, name: &str) -> Option<&Binding> {
        self.scope(id).and_then(|s| s.bindings.get(name))
    }
    /// Writes through to the scope that already holds `name`. A name that is
    /// bound nowhere becomes a new mutable binding in `id` itself.
    pub fn assign(&mut self, id: ScopeId, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut cur = Some(id);
        while let Some(scope_id) = cur {
            let scope = match self.scopes.get_mut(scope_id.0) {
                Some(Some(scope)) => scope,
                _ => break,
            };
            if let Some(binding) = scope.bindings.get_mut(name) {
                if !binding.mutable {
                    return Err(RuntimeError::ImmutableWrite(name.to_string()));
                }
                binding.value = value;
                return Ok(());
            }
            cur = scope.parent;
        }
        self.define(id, name, value, true);
        Ok(())
    }
    pub fn bindings(&self, id: ScopeId) -> impl Iterator<Item = (&String, &Binding)> {
        self.scope(id).into_iter().flat_map(|s| s.bindings.iter())
    }
    fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0).and_then(Option::as_ref)
    }
}
