// ── Host entity registry seam ──
//
// The pipeline never talks to a host platform directly. It announces
// new entities, state changes and disappearances through this trait;
// the host owns persistence of registrations.

use crate::model::{ClassifiedParameter, EntityRegistration, EntityUpdate};

/// Callbacks into the host entity registry.
///
/// Called from the poll cycle only, never concurrently.
pub trait EntityHost: Send {
    /// A key was seen for the first time.
    fn on_create(&mut self, registration: &EntityRegistration, parameter: &ClassifiedParameter);

    /// A registered key's published state changed.
    fn on_update(&mut self, key: &str, update: &EntityUpdate);

    /// A registered key disappeared or the controller became unreachable.
    fn on_unavailable(&mut self, key: &str);
}
