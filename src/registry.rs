//!# Controller registry
//! One slot per FDCAN instance of the device. Populated once during board bring-up, afterwards shared by
//! reference with the tasks and interrupt vectors that need a controller.
//!
//! ```
//!# use fdcan_classic::can::{CanError, Controller};
//!# use fdcan_classic::config::Configuration;
//!# use fdcan_classic::example::ExamplePeripheral;
//!# use fdcan_classic::registry::{ControllerRegistry, Instance};
//! let mut registry = ControllerRegistry::new();
//! registry.register(Controller::new(Instance::Fdcan1, ExamplePeripheral::new())).unwrap();
//!
//! registry.init(Instance::Fdcan1, &Configuration::default()).unwrap();
//! registry.start(Instance::Fdcan1).unwrap();
//!
//! // Second instance is not populated on this board
//! assert_eq!(Err(CanError::UnknownInstance), registry.start(Instance::Fdcan2));
//! assert_eq!(Err(CanError::UnknownInstance), Instance::try_from(3));
//! ```
use crate::can::{CanError, Controller};
use crate::config::Configuration;
use crate::filter::{FilterAction, FilterKind};
use crate::peripheral::Peripheral;
use serde::{Deserialize, Serialize};

/// FDCAN instances of the device
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instance {
    Fdcan1 = 1,
    Fdcan2 = 2,
}

impl Instance {
    pub const ALL: [Instance; 2] = [Instance::Fdcan1, Instance::Fdcan2];

    /// Instance number as used in the reference manual, starting at 1
    pub fn number(&self) -> u8 {
        *self as u8
    }

    fn index(&self) -> usize {
        *self as usize - 1
    }
}

impl TryFrom<u8> for Instance {
    type Error = CanError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Instance::Fdcan1),
            2 => Ok(Instance::Fdcan2),
            _ => Err(CanError::UnknownInstance),
        }
    }
}

/// Owner of all controllers of the board
pub struct ControllerRegistry<'a, P: Peripheral> {
    controllers: [Option<Controller<'a, P>>; 2],
}

impl<P: Peripheral> Default for ControllerRegistry<'_, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, P: Peripheral> ControllerRegistry<'a, P> {
    pub const fn new() -> Self {
        Self {
            controllers: [None, None],
        }
    }

    /// Takes ownership of the controller, each instance may only be registered once
    pub fn register(&mut self, controller: Controller<'a, P>) -> Result<(), CanError> {
        let slot = &mut self.controllers[controller.instance().index()];
        if slot.is_some() {
            return Err(CanError::AlreadyInitialized);
        }

        *slot = Some(controller);
        Ok(())
    }

    /// Controller of the given instance, [CanError::UnknownInstance] if not populated
    pub fn get(&self, instance: Instance) -> Result<&Controller<'a, P>, CanError> {
        self.controllers[instance.index()]
            .as_ref()
            .ok_or(CanError::UnknownInstance)
    }

    /// Controller by instance number
    pub fn get_by_number(&self, number: u8) -> Result<&Controller<'a, P>, CanError> {
        self.get(Instance::try_from(number)?)
    }

    pub fn init(&self, instance: Instance, config: &Configuration) -> Result<(), CanError> {
        self.get(instance)?.init(config)
    }

    pub fn add_filter(
        &self,
        instance: Instance,
        kind: FilterKind,
        action: FilterAction,
        id1: u16,
        id2: u16,
    ) -> Result<u8, CanError> {
        self.get(instance)?.add_filter(kind, action, id1, id2)
    }

    pub fn start(&self, instance: Instance) -> Result<(), CanError> {
        self.get(instance)?.start()
    }

    pub fn stop(&self, instance: Instance) -> Result<(), CanError> {
        self.get(instance)?.stop()
    }

    pub fn send(&self, instance: Instance, id: u16, data: &[u8]) -> Result<(), CanError> {
        self.get(instance)?.send(id, data)
    }

    /// Interrupt entry point of the given instance
    pub fn on_interrupt(&self, instance: Instance) -> Result<(), CanError> {
        self.get(instance)?.on_interrupt()
    }
}
