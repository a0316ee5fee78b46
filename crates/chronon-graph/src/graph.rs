//! Arena storage, structural mutation, and hierarchical routing.

use chronon_core::{GraphError, ModelId};

use crate::model::{Coupled, InputLink, InternalConnection, ModelKind, ModelNode, OutputLink};

/// The hierarchical model tree of one simulation.
///
/// Nodes live in an arena indexed by [`ModelId`]. Removing a model
/// tombstones its slot; slots are never reused within a run, so a stale
/// id is detected ([`GraphError::RemovedModel`]) rather than silently
/// aliasing a newer model.
///
/// All mutation goes through the methods here, which enforce the
/// structural invariants eagerly: sibling names are unique, connection
/// endpoints are the owning coupled model itself or its direct
/// children, and every endpoint port exists at the time the connection
/// is made. [`ModelGraph::validate`] re-checks the same invariants over
/// the whole tree at load time.
///
/// # Examples
///
/// ```
/// use chronon_graph::ModelGraph;
///
/// let mut graph = ModelGraph::new("top");
/// let root = graph.root();
/// let gen = graph.add_atomic(root, "gen", &[], &["out"]).unwrap();
/// let cnt = graph.add_atomic(root, "cnt", &["in"], &[]).unwrap();
/// graph.add_connection(root, "gen", "out", "cnt", "in").unwrap();
///
/// let targets = graph.atomic_targets(gen, "out").unwrap();
/// assert_eq!(targets, vec![(cnt, "in".to_string())]);
/// ```
#[derive(Clone, Debug)]
pub struct ModelGraph {
    slots: Vec<Option<ModelNode>>,
    root: ModelId,
}

/// A routing work item: an event leaving a model upward through an
/// output port, or entering a coupled model downward through an input
/// port.
enum Walk {
    Out(ModelId, String),
    In(ModelId, String),
}

impl ModelGraph {
    /// A new graph containing only a coupled root named `root_name`.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root_node = ModelNode::new(root_name, None, ModelKind::Coupled(Coupled::default()));
        Self {
            slots: vec![Some(root_node)],
            root: ModelId(0),
        }
    }

    /// The root coupled model.
    pub fn root(&self) -> ModelId {
        self.root
    }

    /// Look up a node, or `None` for an out-of-range or removed id.
    pub fn get(&self, id: ModelId) -> Option<&ModelNode> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    /// Look up a node, reporting stale ids as [`GraphError::RemovedModel`].
    pub fn node(&self, id: ModelId) -> Result<&ModelNode, GraphError> {
        self.get(id).ok_or(GraphError::RemovedModel { id: id.0 })
    }

    fn node_mut(&mut self, id: ModelId) -> Result<&mut ModelNode, GraphError> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(|s| s.as_mut())
            .ok_or(GraphError::RemovedModel { id: id.0 })
    }

    fn coupled(&self, id: ModelId) -> Result<&Coupled, GraphError> {
        let node = self.node(id)?;
        node.as_coupled().ok_or_else(|| GraphError::NotCoupled {
            name: self.full_name(id),
        })
    }

    fn coupled_mut(&mut self, id: ModelId) -> Result<&mut Coupled, GraphError> {
        if self.node(id)?.as_coupled().is_none() {
            return Err(GraphError::NotCoupled {
                name: self.full_name(id),
            });
        }
        Ok(self
            .node_mut(id)
            .expect("checked above")
            .as_coupled_mut()
            .expect("checked above"))
    }

    /// The model's full hierarchical name, segments joined with `.`.
    ///
    /// Stale ids render as `<removed>` so error paths never fail twice.
    pub fn full_name(&self, id: ModelId) -> String {
        let Some(node) = self.get(id) else {
            return "<removed>".to_string();
        };
        let mut segments = vec![node.name.as_str()];
        let mut cursor = node.parent;
        while let Some(pid) = cursor {
            let Some(parent) = self.get(pid) else { break };
            segments.push(parent.name.as_str());
            cursor = parent.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    /// Resolve a direct child of `parent` by name.
    pub fn find_child(&self, parent: ModelId, name: &str) -> Option<ModelId> {
        self.get(parent)?.as_coupled()?.children.get(name).copied()
    }

    /// All live atomic models, in deterministic depth-first preorder.
    pub fn atomics(&self) -> Vec<ModelId> {
        let mut result = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            match &node.kind {
                ModelKind::Atomic => result.push(id),
                ModelKind::Coupled(c) => {
                    // Reverse so the pop order follows insertion order.
                    stack.extend(c.children.values().rev().copied());
                }
            }
        }
        result
    }

    // ── Construction ─────────────────────────────────────────────

    /// Add an atomic child under `parent` with the given ports.
    pub fn add_atomic(
        &mut self,
        parent: ModelId,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<ModelId, GraphError> {
        self.add_child(parent, name, inputs, outputs, ModelKind::Atomic)
    }

    /// Add a coupled child under `parent` with the given boundary ports.
    pub fn add_coupled(
        &mut self,
        parent: ModelId,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<ModelId, GraphError> {
        self.add_child(
            parent,
            name,
            inputs,
            outputs,
            ModelKind::Coupled(Coupled::default()),
        )
    }

    fn add_child(
        &mut self,
        parent: ModelId,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        kind: ModelKind,
    ) -> Result<ModelId, GraphError> {
        let coupled = self.coupled(parent)?;
        if coupled.children.contains_key(name) {
            return Err(GraphError::DuplicateModel {
                parent: self.full_name(parent),
                name: name.to_string(),
            });
        }

        let id = ModelId(self.slots.len() as u32);
        let mut node = ModelNode::new(name, Some(parent), kind);
        node.input_ports.extend(inputs.iter().map(|p| p.to_string()));
        node.output_ports
            .extend(outputs.iter().map(|p| p.to_string()));
        self.slots.push(Some(node));

        self.coupled_mut(parent)
            .expect("parent checked above")
            .children
            .insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare an input port. Re-declaring an existing port is a no-op.
    pub fn add_input_port(&mut self, model: ModelId, port: &str) -> Result<(), GraphError> {
        self.node_mut(model)?.input_ports.insert(port.to_string());
        Ok(())
    }

    /// Declare an output port. Re-declaring an existing port is a no-op.
    pub fn add_output_port(&mut self, model: ModelId, port: &str) -> Result<(), GraphError> {
        self.node_mut(model)?.output_ports.insert(port.to_string());
        Ok(())
    }

    /// Remove an input port and every connection that references it.
    pub fn remove_input_port(&mut self, model: ModelId, port: &str) -> Result<(), GraphError> {
        if !self.node(model)?.input_ports.contains(port) {
            return Err(GraphError::UnknownPort {
                model: self.full_name(model),
                port: port.to_string(),
            });
        }

        // Connections in the parent scope pointing at this port.
        if let Some(parent) = self.node(model)?.parent {
            let c = self
                .coupled_mut(parent)
                .expect("parent of a live node is coupled");
            c.internal
                .retain(|ic| !(ic.target == model && ic.target_port == port));
            c.input_links
                .retain(|il| !(il.child == model && il.child_port == port));
        }

        // If the model is itself coupled, its own inward relays.
        if let Ok(c) = self.coupled_mut(model) {
            c.input_links.retain(|il| il.port != port);
        }

        self.node_mut(model)?.input_ports.shift_remove(port);
        Ok(())
    }

    /// Remove an output port and every connection that references it.
    pub fn remove_output_port(&mut self, model: ModelId, port: &str) -> Result<(), GraphError> {
        if !self.node(model)?.output_ports.contains(port) {
            return Err(GraphError::UnknownPort {
                model: self.full_name(model),
                port: port.to_string(),
            });
        }

        if let Some(parent) = self.node(model)?.parent {
            let c = self
                .coupled_mut(parent)
                .expect("parent of a live node is coupled");
            c.internal
                .retain(|ic| !(ic.source == model && ic.source_port == port));
            c.output_links
                .retain(|ol| !(ol.child == model && ol.child_port == port));
        }

        if let Ok(c) = self.coupled_mut(model) {
            c.output_links.retain(|ol| ol.port != port);
        }

        self.node_mut(model)?.output_ports.shift_remove(port);
        Ok(())
    }

    // ── Connections ──────────────────────────────────────────────

    /// Add a connection inside `coupled`, naming endpoints the way an
    /// executive does: a child by its sibling name, or the coupled
    /// model itself by its own name for a boundary port.
    ///
    /// Three shapes result: child-to-child (internal), own-input-to-
    /// child-input (input link), child-output-to-own-output (output
    /// link). Both endpoint ports must already be declared.
    pub fn add_connection(
        &mut self,
        coupled: ModelId,
        source_model: &str,
        source_port: &str,
        target_model: &str,
        target_port: &str,
    ) -> Result<(), GraphError> {
        let shape = self.resolve_connection(
            coupled,
            source_model,
            source_port,
            target_model,
            target_port,
        )?;
        let desc = self.connection_desc(source_model, source_port, target_model, target_port);
        let owner = self.full_name(coupled);
        let c = self.coupled_mut(coupled)?;
        match shape {
            Shape::Internal(ic) => {
                if c.internal.contains(&ic) {
                    return Err(GraphError::ConnectionExists {
                        coupled: owner,
                        connection: desc,
                    });
                }
                c.internal.push(ic);
            }
            Shape::Input(il) => {
                if c.input_links.contains(&il) {
                    return Err(GraphError::ConnectionExists {
                        coupled: owner,
                        connection: desc,
                    });
                }
                c.input_links.push(il);
            }
            Shape::Output(ol) => {
                if c.output_links.contains(&ol) {
                    return Err(GraphError::ConnectionExists {
                        coupled: owner,
                        connection: desc,
                    });
                }
                c.output_links.push(ol);
            }
        }
        Ok(())
    }

    /// Remove a connection previously added with the same endpoint
    /// naming. Fails with [`GraphError::UnknownConnection`] if absent.
    pub fn remove_connection(
        &mut self,
        coupled: ModelId,
        source_model: &str,
        source_port: &str,
        target_model: &str,
        target_port: &str,
    ) -> Result<(), GraphError> {
        let shape = self.resolve_connection(
            coupled,
            source_model,
            source_port,
            target_model,
            target_port,
        )?;
        let desc = self.connection_desc(source_model, source_port, target_model, target_port);
        let owner = self.full_name(coupled);
        let c = self.coupled_mut(coupled)?;
        let removed = match shape {
            Shape::Internal(ic) => {
                let before = c.internal.len();
                c.internal.retain(|x| *x != ic);
                c.internal.len() != before
            }
            Shape::Input(il) => {
                let before = c.input_links.len();
                c.input_links.retain(|x| *x != il);
                c.input_links.len() != before
            }
            Shape::Output(ol) => {
                let before = c.output_links.len();
                c.output_links.retain(|x| *x != ol);
                c.output_links.len() != before
            }
        };
        if removed {
            Ok(())
        } else {
            Err(GraphError::UnknownConnection {
                coupled: owner,
                connection: desc,
            })
        }
    }

    fn connection_desc(&self, sm: &str, sp: &str, tm: &str, tp: &str) -> String {
        format!("{sm}.{sp} -> {tm}.{tp}")
    }

    fn resolve_connection(
        &self,
        coupled: ModelId,
        source_model: &str,
        source_port: &str,
        target_model: &str,
        target_port: &str,
    ) -> Result<Shape, GraphError> {
        let owner = self.node(coupled)?;
        let owner_name = owner.name.clone();
        let c = self.coupled(coupled)?;

        let resolve = |name: &str| -> Result<Option<ModelId>, GraphError> {
            if name == owner_name {
                Ok(None)
            } else {
                c.children
                    .get(name)
                    .copied()
                    .map(Some)
                    .ok_or_else(|| GraphError::UnknownModel {
                        name: name.to_string(),
                    })
            }
        };

        let source = resolve(source_model)?;
        let target = resolve(target_model)?;

        match (source, target) {
            (Some(s), Some(t)) => {
                self.ensure_output_port(s, source_port)?;
                self.ensure_input_port(t, target_port)?;
                Ok(Shape::Internal(InternalConnection {
                    source: s,
                    source_port: source_port.to_string(),
                    target: t,
                    target_port: target_port.to_string(),
                }))
            }
            (None, Some(t)) => {
                self.ensure_input_port(coupled, source_port)?;
                self.ensure_input_port(t, target_port)?;
                Ok(Shape::Input(InputLink {
                    port: source_port.to_string(),
                    child: t,
                    child_port: target_port.to_string(),
                }))
            }
            (Some(s), None) => {
                self.ensure_output_port(s, source_port)?;
                self.ensure_output_port(coupled, target_port)?;
                Ok(Shape::Output(OutputLink {
                    child: s,
                    child_port: source_port.to_string(),
                    port: target_port.to_string(),
                }))
            }
            (None, None) => Err(GraphError::ForeignEndpoint {
                coupled: self.full_name(coupled),
                model: owner_name,
            }),
        }
    }

    fn ensure_input_port(&self, model: ModelId, port: &str) -> Result<(), GraphError> {
        if self.node(model)?.input_ports.contains(port) {
            Ok(())
        } else {
            Err(GraphError::UnknownPort {
                model: self.full_name(model),
                port: port.to_string(),
            })
        }
    }

    fn ensure_output_port(&self, model: ModelId, port: &str) -> Result<(), GraphError> {
        if self.node(model)?.output_ports.contains(port) {
            Ok(())
        } else {
            Err(GraphError::UnknownPort {
                model: self.full_name(model),
                port: port.to_string(),
            })
        }
    }

    // ── Removal ──────────────────────────────────────────────────

    /// Remove the child named `name` from `parent`, destroying its
    /// whole subtree and every connection referencing it.
    ///
    /// Returns the removed *atomic* models (in depth-first preorder) so
    /// the caller can retire their simulators.
    pub fn remove_model(
        &mut self,
        parent: ModelId,
        name: &str,
    ) -> Result<Vec<ModelId>, GraphError> {
        let child = self
            .find_child(parent, name)
            .ok_or_else(|| GraphError::UnknownModel {
                name: name.to_string(),
            })?;

        // Detach: connections in the parent scope, then the child entry.
        {
            let c = self.coupled_mut(parent)?;
            c.internal
                .retain(|ic| ic.source != child && ic.target != child);
            c.input_links.retain(|il| il.child != child);
            c.output_links.retain(|ol| ol.child != child);
            c.children.shift_remove(name);
        }

        // Tombstone the subtree, collecting atomic leaves.
        let mut removed_atomics = Vec::new();
        let mut stack = vec![child];
        while let Some(id) = stack.pop() {
            let Some(node) = self.slots[id.0 as usize].take() else {
                continue;
            };
            match node.kind {
                ModelKind::Atomic => removed_atomics.push(id),
                ModelKind::Coupled(c) => {
                    stack.extend(c.children.values().rev().copied());
                }
            }
        }
        removed_atomics.reverse();
        Ok(removed_atomics)
    }

    // ── Routing ──────────────────────────────────────────────────

    /// Resolve every concrete atomic destination of an event emitted on
    /// `model`'s output port `port`.
    ///
    /// Iterative walk over the hierarchy: within the parent scope,
    /// internal connections lead to siblings (descending through input
    /// links when the sibling is coupled) and output links relay the
    /// event up into the grandparent scope. An unconnected port yields
    /// an empty list — that is a valid configuration, not an error.
    pub fn atomic_targets(
        &self,
        model: ModelId,
        port: &str,
    ) -> Result<Vec<(ModelId, String)>, GraphError> {
        self.ensure_output_port(model, port)?;

        let mut result = Vec::new();
        let mut stack = vec![Walk::Out(model, port.to_string())];

        while let Some(item) = stack.pop() {
            match item {
                Walk::Out(m, p) => {
                    let Some(parent) = self.node(m)?.parent else {
                        // Root output ports lead nowhere.
                        continue;
                    };
                    let scope = self.coupled(parent)?;
                    for ic in &scope.internal {
                        if ic.source == m && ic.source_port == p {
                            if self.node(ic.target)?.is_atomic() {
                                result.push((ic.target, ic.target_port.clone()));
                            } else {
                                stack.push(Walk::In(ic.target, ic.target_port.clone()));
                            }
                        }
                    }
                    for ol in &scope.output_links {
                        if ol.child == m && ol.child_port == p {
                            stack.push(Walk::Out(parent, ol.port.clone()));
                        }
                    }
                }
                Walk::In(c, p) => {
                    for il in &self.coupled(c)?.input_links {
                        if il.port == p {
                            if self.node(il.child)?.is_atomic() {
                                result.push((il.child, il.child_port.clone()));
                            } else {
                                stack.push(Walk::In(il.child, il.child_port.clone()));
                            }
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    // ── Validation ───────────────────────────────────────────────

    /// Re-check every structural invariant over the whole tree.
    ///
    /// The mutation methods enforce these eagerly; `validate` is the
    /// load-time sweep that guarantees routing can assume a coherent
    /// graph for the entire run.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(node) = slot else { continue };
            let id = ModelId(index as u32);

            if let Some(parent) = node.parent {
                let listed = self
                    .get(parent)
                    .and_then(|p| p.as_coupled())
                    .and_then(|c| c.children.get(&node.name))
                    == Some(&id);
                if !listed {
                    return Err(GraphError::UnknownModel {
                        name: self.full_name(id),
                    });
                }
            }

            let Some(c) = node.as_coupled() else { continue };
            let is_child = |m: ModelId| c.children.values().any(|&cid| cid == m);

            for ic in &c.internal {
                for &endpoint in &[ic.source, ic.target] {
                    if !is_child(endpoint) {
                        return Err(GraphError::ForeignEndpoint {
                            coupled: self.full_name(id),
                            model: self.full_name(endpoint),
                        });
                    }
                }
                self.ensure_output_port(ic.source, &ic.source_port)?;
                self.ensure_input_port(ic.target, &ic.target_port)?;
            }
            for il in &c.input_links {
                if !is_child(il.child) {
                    return Err(GraphError::ForeignEndpoint {
                        coupled: self.full_name(id),
                        model: self.full_name(il.child),
                    });
                }
                self.ensure_input_port(id, &il.port)?;
                self.ensure_input_port(il.child, &il.child_port)?;
            }
            for ol in &c.output_links {
                if !is_child(ol.child) {
                    return Err(GraphError::ForeignEndpoint {
                        coupled: self.full_name(id),
                        model: self.full_name(ol.child),
                    });
                }
                self.ensure_output_port(ol.child, &ol.child_port)?;
                self.ensure_output_port(id, &ol.port)?;
            }
        }
        Ok(())
    }
}

enum Shape {
    Internal(InternalConnection),
    Input(InputLink),
    Output(OutputLink),
}
