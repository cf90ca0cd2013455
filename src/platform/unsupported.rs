use std::sync::Arc;

use crate::{
    error::{Error, Result},
    hook::{Backend, Dispatcher},
};

/// A backend for platforms without low-level input hooks.
///
/// Every operation fails with [`Error::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl Backend for Unsupported {
    type Hooks = ();

    fn install(&self, _dispatcher: Arc<Dispatcher>) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn pump(&self, _hooks: &mut ()) -> bool {
        false
    }

    fn cursor_position(&self) -> Result<(i32, i32)> {
        Err(Error::Unsupported)
    }
}
