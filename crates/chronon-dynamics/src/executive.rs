//! Executives: dynamics with graph-mutation privileges.
//!
//! An executive never touches the model graph directly. During its
//! transitions it queues [`StructuralChange`] requests into its
//! [`StructuralChanges`] queue; the coordinator drains the queue after
//! every transition of the step has completed and applies the requests
//! against the executive's parent coupled model — an executive can only
//! mutate its own sibling scope, never a remote subtree.

use crate::dynamics::Dynamics;

/// One queued graph-mutation request.
///
/// Models and connection endpoints are named relative to the
/// requesting executive's parent coupled model: a sibling by its name,
/// the coupled model itself by its own name (for boundary ports).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructuralChange {
    /// Create an atomic sibling with the given ports, bound to a named
    /// dynamics constructor, optionally watched by views.
    AddModel {
        /// Name for the new sibling.
        name: String,
        /// Input ports to declare.
        inputs: Vec<String>,
        /// Output ports to declare.
        outputs: Vec<String>,
        /// Dynamics constructor name, resolved through the factory.
        dynamics: String,
        /// `(port, view)` observables to attach after creation.
        observables: Vec<(String, String)>,
    },
    /// Remove a sibling (and, for a coupled sibling, its whole subtree).
    RemoveModel {
        /// Name of the sibling to remove.
        name: String,
    },
    /// Add a connection in the parent scope.
    AddConnection {
        /// Source model name (sibling, or the parent coupled model).
        source_model: String,
        /// Source port.
        source_port: String,
        /// Target model name (sibling, or the parent coupled model).
        target_model: String,
        /// Target port.
        target_port: String,
    },
    /// Remove a connection in the parent scope.
    RemoveConnection {
        /// Source model name (sibling, or the parent coupled model).
        source_model: String,
        /// Source port.
        source_port: String,
        /// Target model name (sibling, or the parent coupled model).
        target_model: String,
        /// Target port.
        target_port: String,
    },
    /// Declare an input port on a sibling.
    AddInputPort {
        /// Sibling name.
        model: String,
        /// Port to declare.
        port: String,
    },
    /// Declare an output port on a sibling.
    AddOutputPort {
        /// Sibling name.
        model: String,
        /// Port to declare.
        port: String,
    },
    /// Remove an input port (and its connections) from a sibling.
    RemoveInputPort {
        /// Sibling name.
        model: String,
        /// Port to remove.
        port: String,
    },
    /// Remove an output port (and its connections) from a sibling.
    RemoveOutputPort {
        /// Sibling name.
        model: String,
        /// Port to remove.
        port: String,
    },
    /// Attach an observable (sibling atomic model, port) to a view.
    AddObservable {
        /// Sibling name.
        model: String,
        /// Port to watch.
        port: String,
        /// The receiving view's name.
        view: String,
    },
}

/// The request queue an executive implementation embeds.
///
/// Convenience methods mirror the operations an executive performs;
/// each pushes one [`StructuralChange`] in call order. The coordinator
/// drains the queue after the executive transitions.
#[derive(Clone, Debug, Default)]
pub struct StructuralChanges {
    queue: Vec<StructuralChange>,
}

impl StructuralChanges {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary request.
    pub fn push(&mut self, change: StructuralChange) {
        self.queue.push(change);
    }

    /// Queue the creation of an atomic sibling.
    pub fn add_model(
        &mut self,
        name: impl Into<String>,
        inputs: &[&str],
        outputs: &[&str],
        dynamics: impl Into<String>,
    ) {
        self.queue.push(StructuralChange::AddModel {
            name: name.into(),
            inputs: inputs.iter().map(|p| p.to_string()).collect(),
            outputs: outputs.iter().map(|p| p.to_string()).collect(),
            dynamics: dynamics.into(),
            observables: Vec::new(),
        });
    }

    /// Queue the removal of a sibling.
    pub fn remove_model(&mut self, name: impl Into<String>) {
        self.queue.push(StructuralChange::RemoveModel { name: name.into() });
    }

    /// Queue a connection in the parent scope.
    pub fn add_connection(
        &mut self,
        source_model: impl Into<String>,
        source_port: impl Into<String>,
        target_model: impl Into<String>,
        target_port: impl Into<String>,
    ) {
        self.queue.push(StructuralChange::AddConnection {
            source_model: source_model.into(),
            source_port: source_port.into(),
            target_model: target_model.into(),
            target_port: target_port.into(),
        });
    }

    /// Queue a connection removal in the parent scope.
    pub fn remove_connection(
        &mut self,
        source_model: impl Into<String>,
        source_port: impl Into<String>,
        target_model: impl Into<String>,
        target_port: impl Into<String>,
    ) {
        self.queue.push(StructuralChange::RemoveConnection {
            source_model: source_model.into(),
            source_port: source_port.into(),
            target_model: target_model.into(),
            target_port: target_port.into(),
        });
    }

    /// Queue an input-port declaration on a sibling.
    pub fn add_input_port(&mut self, model: impl Into<String>, port: impl Into<String>) {
        self.queue.push(StructuralChange::AddInputPort {
            model: model.into(),
            port: port.into(),
        });
    }

    /// Queue an output-port declaration on a sibling.
    pub fn add_output_port(&mut self, model: impl Into<String>, port: impl Into<String>) {
        self.queue.push(StructuralChange::AddOutputPort {
            model: model.into(),
            port: port.into(),
        });
    }

    /// Queue an input-port removal on a sibling.
    pub fn remove_input_port(&mut self, model: impl Into<String>, port: impl Into<String>) {
        self.queue.push(StructuralChange::RemoveInputPort {
            model: model.into(),
            port: port.into(),
        });
    }

    /// Queue an output-port removal on a sibling.
    pub fn remove_output_port(&mut self, model: impl Into<String>, port: impl Into<String>) {
        self.queue.push(StructuralChange::RemoveOutputPort {
            model: model.into(),
            port: port.into(),
        });
    }

    /// Queue an observable attachment.
    pub fn add_observable(
        &mut self,
        model: impl Into<String>,
        port: impl Into<String>,
        view: impl Into<String>,
    ) {
        self.queue.push(StructuralChange::AddObservable {
            model: model.into(),
            port: port.into(),
            view: view.into(),
        });
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every queued request, in call order, leaving the queue
    /// empty. Called by the coordinator after the executive
    /// transitions.
    pub fn drain(&mut self) -> Vec<StructuralChange> {
        std::mem::take(&mut self.queue)
    }
}

/// The privileged facet of a dynamics that coordinates its siblings.
///
/// Implement [`Dynamics`] as usual, embed a [`StructuralChanges`]
/// queue, and override [`Dynamics::executive`] to return `self`. The
/// coordinator resolves every drained request against the executive's
/// parent coupled model.
pub trait Executive: Dynamics {
    /// The request queue the coordinator drains after each transition.
    fn changes(&mut self) -> &mut StructuralChanges;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_preserves_call_order() {
        let mut q = StructuralChanges::new();
        q.add_model("m", &["in"], &["out"], "pulse");
        q.add_connection("m", "out", "sink", "in");
        q.remove_model("old");

        let drained = q.drain();
        assert_eq!(drained.len(), 3);
        assert!(matches!(drained[0], StructuralChange::AddModel { .. }));
        assert!(matches!(drained[1], StructuralChange::AddConnection { .. }));
        assert!(matches!(drained[2], StructuralChange::RemoveModel { .. }));
        assert!(q.is_empty());
    }
}
