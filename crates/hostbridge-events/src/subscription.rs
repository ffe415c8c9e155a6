//! One live registration.

use std::fmt;

use hostbridge_common::UiEventKind;

use crate::host::Unsubscribe;

/// A live subscription, one variant per kind of registration.
///
/// Subscriptions are immutable once created, with one exception: `stop`
/// takes the unsubscribe thunk out of a Global/Local entry so it can never
/// run twice.
pub enum Subscription {
    /// Listener bound at the document/root scope.
    Global {
        kind: UiEventKind,
        unsubscribe: Option<Unsubscribe>,
    },
    /// Listener bound to one identified element.
    Local {
        element_id: String,
        kind: UiEventKind,
        unsubscribe: Option<Unsubscribe>,
    },
    /// Recurring per-frame callback. Table membership is its only liveness
    /// signal; there is no host listener to detach.
    FrameLoop,
}

impl Subscription {
    /// Take the unsubscribe thunk, leaving `None` behind. Returns `None`
    /// for frame loops and for entries whose thunk was already taken.
    pub(crate) fn take_unsubscribe(&mut self) -> Option<Unsubscribe> {
        match self {
            Subscription::Global { unsubscribe, .. }
            | Subscription::Local { unsubscribe, .. } => unsubscribe.take(),
            Subscription::FrameLoop => None,
        }
    }

    /// Short label for logs and stats.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Subscription::Global { .. } => "global",
            Subscription::Local { .. } => "local",
            Subscription::FrameLoop => "frame-loop",
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscription::Global { kind, .. } => {
                f.debug_struct("Global").field("kind", kind).finish()
            }
            Subscription::Local {
                element_id, kind, ..
            } => f
                .debug_struct("Local")
                .field("element_id", element_id)
                .field("kind", kind)
                .finish(),
            Subscription::FrameLoop => f.write_str("FrameLoop"),
        }
    }
}
