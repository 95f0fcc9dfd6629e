//! Binding levels and the scope stack.
//!
//! Each binding contour records the declarations it introduces, the tags
//! defined in it, and a shadow list of identifier bindings to restore
//! when the contour ends. The current meaning of a name lives in side
//! maps keyed by the interned identifier, mirroring how the meaning of a
//! name is found by searching contours from the innermost out to the
//! global one.

use hashbrown::HashMap;
use log::debug;

use crate::ast::NameId;
use crate::semantic::decls::DeclRef;
use crate::semantic::types::TagEntry;

/// One binding contour.
#[derive(Debug, Default)]
pub struct BindingLevel {
    /// Declarations introduced in this contour, most recent first. The
    /// public accessor reverses to declaration order.
    pub names: Vec<DeclRef>,
    /// Struct, union and enum tags defined in this contour.
    pub tags: Vec<TagEntry>,
    /// Outer-level bindings shadowed by this contour, restored on exit.
    pub shadowed: Vec<(NameId, DeclRef)>,
}

impl BindingLevel {
    fn clear(&mut self) {
        self.names.clear();
        self.tags.clear();
        self.shadowed.clear();
    }
}

/// The stack of binding contours, with the identifier binding maps.
pub struct ScopeStack {
    /// Active contours; index 0 is the global one, which is created once
    /// and never popped.
    levels: Vec<BindingLevel>,
    /// Exited contours awaiting reuse.
    free_levels: Vec<BindingLevel>,
    /// Current local (innermost) meaning of each identifier.
    local_values: HashMap<NameId, DeclRef>,
    /// File-scope meaning of each identifier.
    global_values: HashMap<NameId, DeclRef>,
    /// Label meaning of each identifier; scoped to the current function.
    label_values: HashMap<NameId, DeclRef>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            levels: vec![BindingLevel::default()],
            free_levels: Vec::new(),
            local_values: HashMap::new(),
            global_values: HashMap::new(),
            label_values: HashMap::new(),
        }
    }

    /// Number of active contours, the global one included.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn at_global_scope(&self) -> bool {
        self.levels.len() == 1
    }

    /// Whether the current contour sits directly below the global one.
    /// Anything declared there must be a function parameter, because a
    /// function body is at least two contours down.
    pub fn at_parameter_level(&self) -> bool {
        self.levels.len() == 2
    }

    pub fn push_level(&mut self) {
        let level = self.free_levels.pop().unwrap_or_default();
        self.levels.push(level);
        debug!("ScopeStack: entered level {}", self.levels.len());
    }

    /// Detach the innermost contour and hand it to the free pool. The
    /// caller is responsible for unwinding bindings first.
    pub fn pop_level(&mut self) {
        if self.levels.len() == 1 {
            panic!("ICE: attempt to pop the global binding level");
        }
        let mut level = self.levels.pop().unwrap();
        level.clear();
        self.free_levels.push(level);
        debug!("ScopeStack: exited to level {}", self.levels.len());
    }

    pub fn current(&self) -> &BindingLevel {
        self.levels.last().unwrap()
    }

    pub fn current_mut(&mut self) -> &mut BindingLevel {
        self.levels.last_mut().unwrap()
    }

    /// Iterate contours from the innermost outward, optionally only the
    /// innermost one.
    pub fn walk_out(&self, this_level_only: bool) -> impl Iterator<Item = &BindingLevel> {
        let take = if this_level_only { 1 } else { self.levels.len() };
        self.levels.iter().rev().take(take)
    }

    // --- Identifier binding maps ---

    pub fn local_value(&self, name: NameId) -> Option<DeclRef> {
        self.local_values.get(&name).copied()
    }

    pub fn set_local_value(&mut self, name: NameId, decl: DeclRef) {
        self.local_values.insert(name, decl);
    }

    pub fn clear_local_value(&mut self, name: NameId) {
        self.local_values.remove(&name);
    }

    pub fn global_value(&self, name: NameId) -> Option<DeclRef> {
        self.global_values.get(&name).copied()
    }

    pub fn set_global_value(&mut self, name: NameId, decl: DeclRef) {
        self.global_values.insert(name, decl);
    }

    pub fn label_value(&self, name: NameId) -> Option<DeclRef> {
        self.label_values.get(&name).copied()
    }

    pub fn set_label_value(&mut self, name: NameId, decl: DeclRef) {
        self.label_values.insert(name, decl);
    }

    pub fn clear_label_value(&mut self, name: NameId) {
        self.label_values.remove(&name);
    }
}
