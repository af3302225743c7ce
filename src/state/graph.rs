use crate::clock::SimDuration;

/// Compact index identifying a state node within its graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct StateId(u16);

impl StateId {
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

struct StateDef {
    name: &'static str,
    parent: Option<StateId>,
    default_next: Option<(StateId, SimDuration)>,
}

/// Immutable tree of state definitions shared by the authoritative machine
/// and any follower mirrors.
///
/// Acyclicity holds by construction: a child always references an
/// already-built parent, so every parent chain strictly decreases in id and
/// terminates at a root.
pub struct StateGraph {
    nodes: Vec<StateDef>,
}

impl StateGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: StateId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn name(&self, id: StateId) -> &'static str {
        self.nodes[id.index()].name
    }

    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.nodes[id.index()].parent
    }

    pub fn default_next(&self, id: StateId) -> Option<(StateId, SimDuration)> {
        self.nodes[id.index()].default_next
    }

    /// Root-to-parent chain, excluding `id` itself.
    pub fn ancestors(&self, id: StateId) -> Vec<StateId> {
        let mut chain = self.chain(id);
        chain.pop();
        chain
    }

    /// Root-to-`id` chain, inclusive. This is the active path when `id` is
    /// the current state.
    pub fn chain(&self, id: StateId) -> Vec<StateId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            chain.push(node);
            cursor = self.parent(node);
        }
        chain.reverse();
        chain
    }

    /// Whether `node` is `scope_root` or one of its descendants.
    pub fn is_in_scope(&self, node: StateId, scope_root: StateId) -> bool {
        assert!(
            self.contains(node),
            "state {:?} is not a state in this graph",
            node
        );
        assert!(
            self.contains(scope_root),
            "scope state {:?} is not a state in this graph",
            scope_root
        );
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == scope_root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }
}

/// Construction-time builder for a [`StateGraph`]; the produced graph is
/// frozen, matching the declare-once lifecycle of states.
pub struct StateGraphBuilder {
    nodes: Vec<StateDef>,
}

impl StateGraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds a root state.
    pub fn state(&mut self, name: &'static str) -> StateId {
        self.push(name, None)
    }

    /// Adds a state nested under `parent`.
    pub fn child_state(&mut self, name: &'static str, parent: StateId) -> StateId {
        assert!(
            parent.index() < self.nodes.len(),
            "parent state {:?} was not declared in this builder",
            parent
        );
        self.push(name, Some(parent))
    }

    /// Declares that entering `state` schedules a transition to `next` after
    /// `delay`. Zero-delay chains are allowed; the machine bounds them.
    pub fn default_next(&mut self, state: StateId, next: StateId, delay: SimDuration) {
        assert!(
            state.index() < self.nodes.len() && next.index() < self.nodes.len(),
            "default-next declaration references an undeclared state"
        );
        self.nodes[state.index()].default_next = Some((next, delay));
    }

    pub fn build(self) -> StateGraph {
        StateGraph { nodes: self.nodes }
    }

    fn push(&mut self, name: &'static str, parent: Option<StateId>) -> StateId {
        let id = StateId(
            u16::try_from(self.nodes.len()).expect("state graph exceeds u16 id space"),
        );
        self.nodes.push(StateDef {
            name,
            parent,
            default_next: None,
        });
        id
    }
}

impl Default for StateGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
