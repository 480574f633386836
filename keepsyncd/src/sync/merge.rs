/// Outcome of a three-way comparison of one item field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDecision {
    NoOp,
    PushLocal,
    PullRemote,
}

/// Resolves one field against the agreed base.
///
/// A field changed on one side only moves to the other side. A field changed
/// on both sides to different values goes to `local_wins_conflict`. Without a
/// base, differing values resolve to the local value.
pub fn resolve_field<T: PartialEq>(
    base: Option<&T>,
    local: &T,
    remote: &T,
    local_wins_conflict: bool,
) -> FieldDecision {
    if local == remote {
        return FieldDecision::NoOp;
    }
    let Some(base) = base else {
        return FieldDecision::PushLocal;
    };
    let local_changed = local != base;
    let remote_changed = remote != base;
    match (local_changed, remote_changed) {
        (true, false) => FieldDecision::PushLocal,
        (false, true) => FieldDecision::PullRemote,
        _ if local_wins_conflict => FieldDecision::PushLocal,
        _ => FieldDecision::PullRemote,
    }
}

/// Picks the merged value for a field given the decision.
pub fn merged<'a, T: ?Sized>(decision: FieldDecision, local: &'a T, remote: &'a T) -> &'a T {
    match decision {
        FieldDecision::NoOp | FieldDecision::PushLocal => local,
        FieldDecision::PullRemote => remote,
    }
}

/// Last-writer-wins check for a field edited on both sides.
///
/// A remote edit is dated at the fetch that first observed it. A local write
/// at or after that instant wins.
pub fn local_write_wins(local_updated_at: i64, remote_seen_at: i64) -> bool {
    local_updated_at >= remote_seen_at
}
