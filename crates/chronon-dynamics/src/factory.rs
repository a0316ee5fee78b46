//! Name-to-constructor bindings for dynamics instantiation.

use std::fmt;

use indexmap::IndexMap;

use crate::dynamics::Dynamics;

type Constructor = Box<dyn Fn() -> Box<dyn Dynamics> + Send>;

/// Binds dynamics constructor names to boxed builders.
///
/// The configuration names a constructor per atomic model; executives
/// name one in their add-model requests. Both are resolved here, so a
/// model created mid-run uses exactly the same registration path as one
/// created at load.
///
/// # Examples
///
/// ```
/// use chronon_dynamics::{Dynamics, DynamicsFactory};
///
/// struct Idle;
/// impl Dynamics for Idle {}
///
/// let mut factory = DynamicsFactory::new();
/// factory.register("idle", || Box::new(Idle));
/// assert!(factory.contains("idle"));
/// assert!(factory.build("idle").is_some());
/// assert!(factory.build("missing").is_none());
/// ```
#[derive(Default)]
pub struct DynamicsFactory {
    constructors: IndexMap<String, Constructor>,
}

impl DynamicsFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a constructor under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Dynamics> + Send + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// `true` when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Build a fresh dynamics instance, or `None` for an unknown name.
    pub fn build(&self, name: &str) -> Option<Box<dyn Dynamics>> {
        self.constructors.get(name).map(|c| c())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl fmt::Debug for DynamicsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicsFactory")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronon_core::Time;

    struct Fixed(f64);
    impl Dynamics for Fixed {
        fn time_advance(&self) -> Time {
            Time::new(self.0)
        }
    }

    #[test]
    fn each_build_is_a_fresh_instance() {
        let mut factory = DynamicsFactory::new();
        factory.register("fixed", || Box::new(Fixed(2.0)));

        let a = factory.build("fixed").unwrap();
        let b = factory.build("fixed").unwrap();
        assert_eq!(a.time_advance(), Time::new(2.0));
        assert_eq!(b.time_advance(), Time::new(2.0));
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut factory = DynamicsFactory::new();
        factory.register("b", || Box::new(Fixed(1.0)));
        factory.register("a", || Box::new(Fixed(1.0)));
        let names: Vec<&str> = factory.names().collect();
        assert_eq!(names, ["b", "a"]);
    }
}
