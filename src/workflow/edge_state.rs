/// Edge result annotation
///
/// Pure update of a single edge's visual kind and run flags. Never looks at
/// any other edge or at engine state.

use crate::workflow::types::{Edge, EdgeKind};

/// Return `edge` annotated with the given visual kind and flags
///
/// `is_success` is only written when provided; an existing value is kept
/// otherwise. Applying the same state twice yields the same edge.
pub fn set_edge_state(edge: &Edge, visual_kind: EdgeKind, is_active: bool, is_success: Option<bool>) -> Edge {
    let mut updated = edge.clone();
    updated.visual_kind = visual_kind;
    updated.data.is_active = is_active;
    if let Some(success) = is_success {
        updated.data.is_success = Some(success);
    }
    updated
}

/// Return `edge` with its annotation cleared back to plain and inactive
pub fn reset_edge_state(edge: &Edge) -> Edge {
    let mut updated = edge.clone();
    updated.visual_kind = EdgeKind::Plain;
    updated.data.is_active = false;
    updated.data.is_success = None;
    updated
}
