//! The coordinator: drives one discrete step of the model population.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use chronon_core::{
    ConfigError, ExternalEventList, GraphError, ModelId, ObservationEvent, SimulatorId, StepError,
    Time,
};
use chronon_dynamics::{DynamicsFactory, StructuralChange};
use chronon_graph::ModelGraph;
use chronon_obs::{Observable, View, ViewKind};

use crate::config::SimulationConfig;
use crate::scheduler::{ImminentSet, Scheduler};
use crate::simulator::Simulator;

/// How a simulator transitions this step, decided by the delivery
/// partition: imminent-only → internal, receiving-only → external,
/// both → confluent.
enum Transition {
    Internal,
    Confluent,
    External,
}

/// Owns the whole running population: the model graph, one simulator
/// per atomic model, the scheduler, and the views.
///
/// One call to [`Coordinator::run`] executes one step, entirely at the
/// instant `t = next_time()`:
///
/// 1. imminent collection, 2. output collection, 3. routing,
/// 4. delivery partition, 5. transition application, 6. observation,
/// 7. structural changes.
///
/// Everything is sequential; no phase observes another phase's state
/// mid-flight, and the graph/scheduler are mutated only here.
pub struct Coordinator {
    graph: ModelGraph,
    factory: DynamicsFactory,
    simulators: Vec<Option<Simulator>>,
    by_model: HashMap<ModelId, SimulatorId>,
    views: IndexMap<String, View>,
    scheduler: Scheduler,
    current: Time,
    last_step_time: Option<Time>,
    same_time_steps: u32,
    max_zero_delay_steps: u32,
}

impl Coordinator {
    /// Build the population from a validated configuration: views,
    /// then one simulator per atomic model, then the initial
    /// observables. No user code runs yet — [`Coordinator::initialize`]
    /// performs the init pass.
    pub(crate) fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let SimulationConfig {
            graph,
            factory,
            bindings,
            views,
            observables,
            experiment,
            max_zero_delay_steps,
        } = config;
        let begin = experiment.begin;

        let mut coordinator = Self {
            graph,
            factory,
            simulators: Vec::new(),
            by_model: HashMap::new(),
            views: IndexMap::new(),
            scheduler: Scheduler::new(begin),
            current: begin,
            last_step_time: None,
            same_time_steps: 0,
            max_zero_delay_steps,
        };

        for view_config in views {
            let mut view = View::new(view_config.name.clone(), view_config.kind, view_config.stream);
            view.start(begin);
            coordinator.views.insert(view_config.name, view);
        }

        for model in coordinator.graph.atomics() {
            let dynamics = bindings.get(&model).expect("bindings validated");
            coordinator.create_simulator(model, dynamics);
        }

        for obs in observables {
            let id = *coordinator
                .by_model
                .get(&obs.model)
                .expect("observables validated against atomic models");
            let model_name = coordinator.graph.full_name(obs.model);
            let view = coordinator
                .views
                .get_mut(&obs.view)
                .expect("observable views validated");
            view.add_observable(id, model_name, obs.port, begin);
        }

        Ok(coordinator)
    }

    /// The global init pass: every simulator's `init` at the experiment
    /// begin, scheduled at its first deadline.
    pub(crate) fn initialize(&mut self) -> Result<(), StepError> {
        let begin = self.current;
        let ids: Vec<SimulatorId> = (0..self.simulators.len() as u32).map(SimulatorId).collect();
        for id in ids {
            let next = self.simulator_mut(id).init(begin)?;
            self.schedule(id, next)?;
        }
        Ok(())
    }

    /// The time of the next step: the scheduler head or the earliest
    /// timed-view sample, whichever comes first. [`Time::INFINITY`]
    /// when nothing remains.
    pub fn next_time(&mut self) -> Time {
        let mut next = self.scheduler.peek_min_time();
        for view in self.views.values() {
            next = next.min(view.next_sample());
        }
        next
    }

    /// The clock of the last executed step (the experiment begin before
    /// any step ran).
    pub fn current_time(&self) -> Time {
        self.current
    }

    /// Look up a live simulator.
    pub fn simulator(&self, id: SimulatorId) -> Option<&Simulator> {
        self.simulators.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    /// The simulator wrapping `model`, if it is alive.
    pub fn simulator_for(&self, model: ModelId) -> Option<&Simulator> {
        self.by_model.get(&model).and_then(|&id| self.simulator(id))
    }

    /// The model graph as it currently stands.
    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    /// A view by name.
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// Execute one step at `next_time()`. No-op when nothing remains.
    pub fn run(&mut self) -> Result<(), StepError> {
        let t = self.next_time();
        if t.is_infinity() {
            return Ok(());
        }

        // Zero-delay circuit breaker: a healthy population advances the
        // clock eventually; unbounded same-instant stepping is a cycle.
        if self.last_step_time == Some(t) {
            self.same_time_steps += 1;
            if self.same_time_steps > self.max_zero_delay_steps {
                return Err(StepError::ZeroDelayLoop {
                    time: t,
                    steps: self.max_zero_delay_steps,
                });
            }
        } else {
            self.last_step_time = Some(t);
            self.same_time_steps = 0;
        }

        self.scheduler.advance_to(t);
        self.current = t;

        // 1. Imminent collection. May be empty: a pure observation step.
        let imminents: ImminentSet = self.scheduler.extract_imminent();

        // 2. Output collection, in imminent (insertion) order.
        let mut outputs = ExternalEventList::new();
        for &id in &imminents {
            self.simulator_mut(id).output(t, &mut outputs)?;
        }

        // 3. Routing: clone each event per concrete atomic destination.
        // Unconnected ports contribute nothing.
        let mut deliveries: IndexMap<SimulatorId, ExternalEventList> = IndexMap::new();
        for event in &outputs {
            let source = event.source().expect("outputs are stamped by their simulator");
            for (target, port) in self.resolve_targets(source, event.port())? {
                deliveries
                    .entry(target)
                    .or_default()
                    .push(event.retarget(target, port));
            }
        }

        // 4. Delivery partition: imminents split into internal/confluent,
        // receivers outside the imminent set get external. Executives go
        // last so structure mutations never race peer transitions.
        let in_imminent: HashSet<SimulatorId> = imminents.iter().copied().collect();
        let mut plan: Vec<(SimulatorId, Transition)> = Vec::new();
        for &id in &imminents {
            let kind = if deliveries.contains_key(&id) {
                Transition::Confluent
            } else {
                Transition::Internal
            };
            plan.push((id, kind));
        }
        for &id in deliveries.keys() {
            if !in_imminent.contains(&id) {
                plan.push((id, Transition::External));
            }
        }
        let (mut ordered, mut executives): (Vec<_>, Vec<_>) = (Vec::new(), Vec::new());
        for entry in plan {
            if self.simulator_mut(entry.0).is_executive() {
                executives.push(entry);
            } else {
                ordered.push(entry);
            }
        }

        // 5. Transition application, rescheduling each simulator.
        let mut transitioned: Vec<SimulatorId> = Vec::new();
        let mut changes: Vec<(SimulatorId, Vec<StructuralChange>)> = Vec::new();
        for (id, kind) in ordered.into_iter().chain(executives) {
            let events = deliveries.swap_remove(&id).unwrap_or_default();
            let (next, queued) = {
                let sim = self.simulator_mut(id);
                let next = match kind {
                    Transition::Internal => sim.internal_transition(t)?,
                    Transition::Confluent => sim.confluent_transition(t, &events)?,
                    Transition::External => sim.external_transition(&events, t)?,
                };
                (next, sim.drain_changes())
            };
            self.schedule(id, next)?;
            if !queued.is_empty() {
                changes.push((id, queued));
            }
            transitioned.push(id);
        }

        // 6. Observation: event views that watched a transitioned
        // simulator, and timed views whose sample time arrived.
        let transitioned_set: HashSet<SimulatorId> = transitioned.iter().copied().collect();
        self.process_views(&transitioned_set, t);

        // 7. Structural changes, strictly after every transition.
        if !changes.is_empty() {
            for (executive, queued) in changes {
                for change in queued {
                    self.apply_change(executive, change)?;
                }
            }
            // Routing may differ from here on; drop every cached target.
            for sim in self.simulators.iter_mut().flatten() {
                sim.clear_target_cache();
            }
        }

        Ok(())
    }

    /// End of run: finish views sample once, dynamics release state,
    /// sinks close. In that order — sampling reads the final states
    /// before `finish` hooks run.
    pub fn finish(&mut self) {
        let t = self.current;
        {
            let Self {
                views, simulators, ..
            } = self;
            for view in views.values_mut() {
                if matches!(view.kind(), ViewKind::Finish) {
                    Self::sample_view(&*simulators, view, t);
                }
            }
        }
        for sim in self.simulators.iter_mut().flatten() {
            sim.finish();
        }
        for view in self.views.values_mut() {
            view.close(t);
        }
    }

    // ── Scheduling ───────────────────────────────────────────────

    /// Insert a finite deadline into the scheduler; infinity means the
    /// simulator goes passive and holds no entry.
    fn schedule(&mut self, id: SimulatorId, next: Time) -> Result<(), StepError> {
        if next.is_infinity() {
            return Ok(());
        }
        self.scheduler.insert(id, next).map_err(|e| StepError::Causality {
            model: self.simulator_name(id),
            reason: e,
        })
    }

    // ── Routing ──────────────────────────────────────────────────

    /// Concrete `(simulator, input port)` destinations of `source`'s
    /// output `port`, through the simulator's cache.
    fn resolve_targets(
        &mut self,
        source: SimulatorId,
        port: &str,
    ) -> Result<Vec<(SimulatorId, String)>, StepError> {
        if let Some(cached) = self.simulator_ref(source).cached_targets(port) {
            return Ok(cached.clone());
        }

        let model = self.simulator_ref(source).model();
        let model_targets = self.graph.atomic_targets(model, port).map_err(|e| match e {
            GraphError::UnknownPort { model, port } => StepError::UndeclaredPort { model, port },
            other => StepError::Structural {
                model: self.simulator_name(source),
                reason: other,
            },
        })?;

        let targets: Vec<(SimulatorId, String)> = model_targets
            .into_iter()
            .filter_map(|(m, p)| self.by_model.get(&m).map(|&id| (id, p)))
            .collect();
        self.simulator_mut(source).cache_targets(port, targets.clone());
        Ok(targets)
    }

    // ── Observation ──────────────────────────────────────────────

    fn process_views(&mut self, transitioned: &HashSet<SimulatorId>, t: Time) {
        let Self {
            views, simulators, ..
        } = self;
        for view in views.values_mut() {
            let event_due = matches!(view.kind(), ViewKind::Event)
                && view
                    .observables()
                    .iter()
                    .any(|o| transitioned.contains(&o.simulator));
            let timed_due = view.next_sample() <= t;
            if event_due || timed_due {
                Self::sample_view(&*simulators, view, t);
            }
            if timed_due {
                view.advance_sample(t);
            }
        }
    }

    /// Sample every observable of one view against the live simulators.
    fn sample_view(simulators: &[Option<Simulator>], view: &mut View, t: Time) {
        let observables: Vec<Observable> = view.observables().to_vec();
        for obs in observables {
            let Some(sim) = simulators
                .get(obs.simulator.0 as usize)
                .and_then(|s| s.as_ref())
            else {
                continue;
            };
            let event = ObservationEvent::new(view.name(), &obs.port, t);
            // None is "no data this port this instant", not an error.
            if let Some(value) = sim.observation(&event) {
                view.record(&obs.model, &obs.port, t, value);
            }
        }
    }

    // ── Structural changes ───────────────────────────────────────

    /// Apply one executive request against the executive's parent
    /// coupled model — its own sibling scope, never a remote subtree.
    fn apply_change(
        &mut self,
        executive: SimulatorId,
        change: StructuralChange,
    ) -> Result<(), StepError> {
        let exec_name = self.simulator_name(executive);
        let scope = self
            .graph
            .node(self.simulator_ref(executive).model())
            .map_err(|reason| StepError::Structural {
                model: exec_name.clone(),
                reason,
            })?
            .parent()
            .expect("atomic models always sit under a coupled parent");
        let structural = |reason: GraphError| StepError::Structural {
            model: exec_name.clone(),
            reason,
        };

        match change {
            StructuralChange::AddModel {
                name,
                inputs,
                outputs,
                dynamics,
                observables,
            } => {
                if !self.factory.contains(&dynamics) {
                    return Err(StepError::UnknownDynamics {
                        model: exec_name.clone(),
                        dynamics,
                    });
                }
                let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
                let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
                let model = self
                    .graph
                    .add_atomic(scope, &name, &inputs, &outputs)
                    .map_err(structural)?;
                let id = self.create_simulator(model, &dynamics);
                let now = self.current;
                let next = self.simulator_mut(id).init(now)?;
                self.schedule(id, next)?;
                for (port, view) in observables {
                    self.attach_observable(&exec_name, id, &port, &view)?;
                }
            }
            StructuralChange::RemoveModel { name } => {
                let removed = self.graph.remove_model(scope, &name).map_err(structural)?;
                for model in removed {
                    self.retire(model);
                }
            }
            StructuralChange::AddConnection {
                source_model,
                source_port,
                target_model,
                target_port,
            } => {
                self.graph
                    .add_connection(scope, &source_model, &source_port, &target_model, &target_port)
                    .map_err(structural)?;
            }
            StructuralChange::RemoveConnection {
                source_model,
                source_port,
                target_model,
                target_port,
            } => {
                self.graph
                    .remove_connection(
                        scope,
                        &source_model,
                        &source_port,
                        &target_model,
                        &target_port,
                    )
                    .map_err(structural)?;
            }
            StructuralChange::AddInputPort { model, port } => {
                let m = self.resolve_sibling(scope, &model).map_err(structural)?;
                self.graph.add_input_port(m, &port).map_err(structural)?;
            }
            StructuralChange::AddOutputPort { model, port } => {
                let m = self.resolve_sibling(scope, &model).map_err(structural)?;
                self.graph.add_output_port(m, &port).map_err(structural)?;
            }
            StructuralChange::RemoveInputPort { model, port } => {
                let m = self.resolve_sibling(scope, &model).map_err(structural)?;
                self.graph.remove_input_port(m, &port).map_err(structural)?;
            }
            StructuralChange::RemoveOutputPort { model, port } => {
                let m = self.resolve_sibling(scope, &model).map_err(structural)?;
                self.graph.remove_output_port(m, &port).map_err(structural)?;
            }
            StructuralChange::AddObservable { model, port, view } => {
                let m = self.resolve_sibling(scope, &model).map_err(structural)?;
                let id = match self.by_model.get(&m) {
                    Some(&id) => id,
                    None => {
                        return Err(structural(GraphError::NotAtomic {
                            name: self.graph.full_name(m),
                        }))
                    }
                };
                self.attach_observable(&exec_name, id, &port, &view)?;
            }
        }
        Ok(())
    }

    fn resolve_sibling(&self, scope: ModelId, name: &str) -> Result<ModelId, GraphError> {
        self.graph
            .find_child(scope, name)
            .ok_or_else(|| GraphError::UnknownModel {
                name: name.to_string(),
            })
    }

    fn attach_observable(
        &mut self,
        exec_name: &str,
        id: SimulatorId,
        port: &str,
        view_name: &str,
    ) -> Result<(), StepError> {
        let model_name = self.simulator_name(id);
        let time = self.current;
        let view = self
            .views
            .get_mut(view_name)
            .ok_or_else(|| StepError::UnknownView {
                model: exec_name.to_string(),
                view: view_name.to_string(),
            })?;
        view.add_observable(id, model_name, port, time);
        Ok(())
    }

    /// Instantiate dynamics for `model` and register the simulator.
    fn create_simulator(&mut self, model: ModelId, dynamics: &str) -> SimulatorId {
        let behavior = self.factory.build(dynamics).expect("binding checked");
        let id = SimulatorId(self.simulators.len() as u32);
        let name = self.graph.full_name(model);
        self.simulators
            .push(Some(Simulator::new(id, model, name, behavior)));
        self.by_model.insert(model, id);
        id
    }

    /// Retire the simulator of a removed model: scheduler entry out,
    /// view observables cleared, slot tombstoned.
    fn retire(&mut self, model: ModelId) {
        let Some(id) = self.by_model.remove(&model) else {
            return;
        };
        self.scheduler.remove(id);
        for view in self.views.values_mut() {
            view.remove_simulator(id, self.current);
        }
        self.simulators[id.0 as usize] = None;
    }

    // ── Simulator access ─────────────────────────────────────────

    fn simulator_ref(&self, id: SimulatorId) -> &Simulator {
        self.simulators[id.0 as usize]
            .as_ref()
            .expect("simulator ids stay live for the whole step")
    }

    fn simulator_mut(&mut self, id: SimulatorId) -> &mut Simulator {
        self.simulators[id.0 as usize]
            .as_mut()
            .expect("simulator ids stay live for the whole step")
    }

    fn simulator_name(&self, id: SimulatorId) -> String {
        self.simulator_ref(id).name().to_string()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("current", &self.current)
            .field("simulators", &self.simulators.iter().flatten().count())
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .finish()
    }
}
