#![forbid(unsafe_code)]

/// Where a species sits in its tree's ancestry forest.
///
/// A root carries an absolute apparition time; an attached node carries an
/// offset relative to its ancestor's apparition. A node is never in both
/// states, so the two stored fields collapse into one sum type.
#[derive(Clone, Debug, PartialEq)]
pub enum Position {
    Root { apparition: f64 },
    Attached { ancestor_id: String, after_apparition: f64 },
}

impl Position {
    pub fn ancestor_id(&self) -> Option<&str> {
        match self {
            Self::Root { .. } => None,
            Self::Attached { ancestor_id, .. } => Some(ancestor_id),
        }
    }

    pub fn apparition(&self) -> Option<f64> {
        match self {
            Self::Root { apparition } => Some(*apparition),
            Self::Attached { .. } => None,
        }
    }

    pub fn after_apparition(&self) -> Option<f64> {
        match self {
            Self::Root { .. } => None,
            Self::Attached { after_apparition, .. } => Some(*after_apparition),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root { .. })
    }
}

/// Offset stored for a newly attached child. A child cannot start inside its
/// ancestor's duration window, so the requested offset (default 0) is lifted
/// to at least the ancestor's duration.
pub fn child_offset(requested: Option<f64>, ancestor_duration: f64) -> f64 {
    requested
        .unwrap_or(0.0)
        .max(ancestor_duration)
        .max(0.0)
}

/// Duration accepted for a node with the given earliest direct-child offset.
/// Durations are non-negative and may not extend past where the first child
/// begins.
pub fn clamp_duration(requested: f64, earliest_child_offset: Option<f64>) -> f64 {
    let duration = requested.max(0.0);
    match earliest_child_offset {
        Some(limit) => duration.min(limit),
        None => duration,
    }
}

/// Offset for a node moving under a new ancestor without an explicit value:
/// keep the node's absolute apparition where it was.
pub fn reattach_offset(old_absolute: f64, ancestor_absolute: f64) -> f64 {
    (old_absolute - ancestor_absolute).max(0.0)
}

pub fn explicit_offset(requested: f64) -> f64 {
    requested.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_offset_lifts_to_ancestor_duration() {
        assert_eq!(child_offset(Some(3.0), 10.0), 10.0);
        assert_eq!(child_offset(Some(15.0), 10.0), 15.0);
        assert_eq!(child_offset(None, 10.0), 10.0);
        assert_eq!(child_offset(Some(-4.0), 0.0), 0.0);
    }

    #[test]
    fn duration_is_clamped_by_earliest_child() {
        assert_eq!(clamp_duration(12.0, Some(8.0)), 8.0);
        assert_eq!(clamp_duration(5.0, Some(8.0)), 5.0);
        assert_eq!(clamp_duration(-1.0, None), 0.0);
        assert_eq!(clamp_duration(7.5, None), 7.5);
    }

    #[test]
    fn reattach_preserves_absolute_position() {
        assert_eq!(reattach_offset(50.0, 30.0), 20.0);
        assert_eq!(reattach_offset(30.0, 50.0), 0.0);
    }

    #[test]
    fn position_accessors_split_by_state() {
        let root = Position::Root { apparition: 42.0 };
        assert_eq!(root.apparition(), Some(42.0));
        assert_eq!(root.after_apparition(), None);
        assert_eq!(root.ancestor_id(), None);

        let attached = Position::Attached {
            ancestor_id: "sp_000001".to_string(),
            after_apparition: 9.0,
        };
        assert_eq!(attached.apparition(), None);
        assert_eq!(attached.after_apparition(), Some(9.0));
        assert_eq!(attached.ancestor_id(), Some("sp_000001"));
    }
}
