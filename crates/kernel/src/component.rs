//! Ordered, type-keyed component containers.
//!
//! A [`ComponentList`] holds at most one component per concrete type, in
//! insertion order. Insertion order is the update order, so later components
//! observe the results of earlier ones within a tick.

use std::any::TypeId;

use worldsim_common::GameTime;

use crate::entity::EntityHandle;
use crate::error::ComponentError;

/// A simulation-wide behavior module.
///
/// Components are told about every entity attached to or detached from the
/// simulation and are updated once per tick while enabled.
pub trait SimulationComponent: Send + 'static {
    fn enabled(&self) -> bool {
        true
    }

    /// Called after `entity` has been bound to the simulation.
    fn on_entity_added(&mut self, _entity: &EntityHandle) {}

    /// Called before `entity` loses its identity and simulation binding.
    fn on_entity_removed(&mut self, _entity: &EntityHandle) {}

    fn update(&mut self, time: &GameTime);
}

/// Data or behavior attached to a single entity.
pub trait EntityComponent: Send + Sync + 'static {}

/// Boxes a concrete component into the list's trait object type.
pub trait IntoComponent<T: ?Sized> {
    fn into_boxed(self) -> Box<T>;
}

impl<C: SimulationComponent> IntoComponent<dyn SimulationComponent> for C {
    fn into_boxed(self) -> Box<dyn SimulationComponent> {
        Box::new(self)
    }
}

impl<C: EntityComponent> IntoComponent<dyn EntityComponent> for C {
    fn into_boxed(self) -> Box<dyn EntityComponent> {
        Box::new(self)
    }
}

/// Hook consulted before a component is inserted or removed.
pub type ComponentValidator<T> = Box<dyn Fn(&T) -> Result<(), ComponentError> + Send + Sync>;

struct Slot<T: ?Sized> {
    type_id: TypeId,
    type_name: &'static str,
    component: Box<T>,
}

/// Insertion-ordered set of components, unique by concrete type.
pub struct ComponentList<T: ?Sized> {
    slots: Vec<Slot<T>>,
    validate_add: Option<ComponentValidator<T>>,
    validate_remove: Option<ComponentValidator<T>>,
}

impl<T: ?Sized> Default for ComponentList<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            validate_add: None,
            validate_remove: None,
        }
    }
}

impl<T: ?Sized> ComponentList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the hook consulted before every insertion.
    pub fn set_add_validator(&mut self, validator: Option<ComponentValidator<T>>) {
        self.validate_add = validator;
    }

    /// Install the hook consulted before every removal.
    pub fn set_remove_validator(&mut self, validator: Option<ComponentValidator<T>>) {
        self.validate_remove = validator;
    }

    /// Append a component.
    ///
    /// Returns `Ok(false)` without consulting the validator when a component
    /// of the same concrete type is already present.
    pub fn add<V>(&mut self, component: V) -> Result<bool, ComponentError>
    where
        V: IntoComponent<T> + 'static,
    {
        let type_id = TypeId::of::<V>();
        if self.position(type_id).is_some() {
            return Ok(false);
        }
        let component = component.into_boxed();
        if let Some(validate) = &self.validate_add {
            validate(&*component)?;
        }
        self.slots.push(Slot {
            type_id,
            type_name: std::any::type_name::<V>(),
            component,
        });
        Ok(true)
    }

    /// Remove the component of type `V`. Returns `Ok(false)` if none is present.
    pub fn remove<V: 'static>(&mut self) -> Result<bool, ComponentError> {
        let Some(index) = self.position(TypeId::of::<V>()) else {
            return Ok(false);
        };
        if let Some(validate) = &self.validate_remove {
            validate(&*self.slots[index].component)?;
        }
        self.slots.remove(index);
        Ok(true)
    }

    pub fn contains<V: 'static>(&self) -> bool {
        self.position(TypeId::of::<V>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Components in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().map(|s| &*s.component)
    }

    /// Components in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().map(|s| &mut *s.component)
    }

    /// Type names of the registered components, in insertion order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.type_name).collect()
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.slots.iter().position(|s| s.type_id == type_id)
    }
}

impl<T: ?Sized> std::fmt::Debug for ComponentList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Gravity;
    struct Physics(u32);

    impl SimulationComponent for Gravity {
        fn update(&mut self, _time: &GameTime) {}
    }

    impl SimulationComponent for Physics {
        fn update(&mut self, _time: &GameTime) {
            self.0 += 1;
        }
    }

    struct Tag;
    impl EntityComponent for Tag {}

    #[test]
    fn add_keeps_insertion_order() {
        let mut list: ComponentList<dyn SimulationComponent> = ComponentList::new();
        assert!(list.add(Physics(0)).unwrap());
        assert!(list.add(Gravity).unwrap());
        assert_eq!(list.len(), 2);
        let names = list.type_names();
        assert!(names[0].ends_with("Physics"));
        assert!(names[1].ends_with("Gravity"));
    }

    #[test]
    fn duplicate_type_is_noop() {
        let mut list: ComponentList<dyn SimulationComponent> = ComponentList::new();
        assert!(list.add(Physics(0)).unwrap());
        assert!(!list.add(Physics(5)).unwrap());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicate_skips_validator() {
        let mut list: ComponentList<dyn SimulationComponent> = ComponentList::new();
        list.add(Gravity).unwrap();
        list.set_add_validator(Some(Box::new(|_: &dyn SimulationComponent| {
            Err(ComponentError::new("any", "closed"))
        })));
        assert_eq!(list.add(Gravity), Ok(false));
    }

    #[test]
    fn add_validator_can_veto() {
        let mut list: ComponentList<dyn SimulationComponent> = ComponentList::new();
        list.set_add_validator(Some(Box::new(|_: &dyn SimulationComponent| {
            Err(ComponentError::new("Physics", "registry sealed"))
        })));
        let err = list.add(Physics(0)).unwrap_err();
        assert_eq!(err.reason, "registry sealed");
        assert!(list.is_empty());
    }

    #[test]
    fn remove_validator_can_veto() {
        let mut list: ComponentList<dyn SimulationComponent> = ComponentList::new();
        list.add(Gravity).unwrap();
        let consulted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&consulted);
        list.set_remove_validator(Some(Box::new(move |_: &dyn SimulationComponent| {
            flag.store(true, Ordering::SeqCst);
            Err(ComponentError::new("Gravity", "in use"))
        })));
        assert!(list.remove::<Gravity>().is_err());
        assert!(consulted.load(Ordering::SeqCst));
        assert!(list.contains::<Gravity>());
    }

    #[test]
    fn remove_missing_type_is_false() {
        let mut list: ComponentList<dyn SimulationComponent> = ComponentList::new();
        list.add(Gravity).unwrap();
        assert_eq!(list.remove::<Physics>(), Ok(false));
        assert_eq!(list.remove::<Gravity>(), Ok(true));
        assert!(list.is_empty());
    }

    #[test]
    fn iter_mut_reaches_components() {
        let mut list: ComponentList<dyn SimulationComponent> = ComponentList::new();
        list.add(Physics(0)).unwrap();
        for c in list.iter_mut() {
            c.update(&GameTime::default());
        }
        assert_eq!(list.iter().count(), 1);
    }

    #[test]
    fn entity_component_lists_share_the_container() {
        let mut list: ComponentList<dyn EntityComponent> = ComponentList::new();
        assert!(list.add(Tag).unwrap());
        assert!(list.contains::<Tag>());
    }
}
