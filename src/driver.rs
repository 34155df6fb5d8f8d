use crate::can::{CanError, Controller};
use crate::config::Configuration;
use crate::peripheral::Peripheral;
use crate::status::ControllerState;

/// Lifecycle shared by the board's peripheral drivers
///
/// Drivers without configurable hardware implement it trivially, so board bring-up can treat all of them alike.
pub trait Driver {
    type Config;
    type Error;

    /// Applies the configuration, discarding any previous one
    fn init(&self, config: &Self::Config) -> Result<(), Self::Error>;

    fn start(&self) -> Result<(), Self::Error>;

    fn stop(&self) -> Result<(), Self::Error>;

    /// True once [Driver::init] succeeded and until [Driver::stop]
    fn is_initialized(&self) -> bool;
}

impl<P: Peripheral> Driver for Controller<'_, P> {
    type Config = Configuration;
    type Error = CanError;

    fn init(&self, config: &Configuration) -> Result<(), CanError> {
        Controller::init(self, config)
    }

    fn start(&self) -> Result<(), CanError> {
        Controller::start(self)
    }

    fn stop(&self) -> Result<(), CanError> {
        Controller::stop(self)
    }

    fn is_initialized(&self) -> bool {
        self.state() != ControllerState::Uninitialized
    }
}
