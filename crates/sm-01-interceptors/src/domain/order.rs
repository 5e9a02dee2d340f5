//! Ordering descriptors shared by the create, update and delete families.
//!
//! Each provider declares, per hook shape, where it goes relative to an
//! already registered provider. `None` appends to the end of the chain.

use std::fmt;

/// Placement relative to an anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PositionType {
    /// Append after everything registered so far.
    #[default]
    None,
    /// Insert directly before the anchor.
    Before,
    /// Insert directly after the anchor.
    After,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PositionType::None => "none",
            PositionType::Before => "before",
            PositionType::After => "after",
        })
    }
}

/// Position within one hook shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptorPosition {
    pub position_type: PositionType,
    /// Anchor provider name. Ignored for `PositionType::None`.
    pub name: String,
}

impl InterceptorPosition {
    pub fn before(name: impl Into<String>) -> Self {
        Self {
            position_type: PositionType::Before,
            name: name.into(),
        }
    }

    pub fn after(name: impl Into<String>) -> Self {
        Self {
            position_type: PositionType::After,
            name: name.into(),
        }
    }

    /// The anchor name, if this position has one.
    pub fn anchor(&self) -> Option<&str> {
        match self.position_type {
            PositionType::None => None,
            PositionType::Before | PositionType::After => Some(&self.name),
        }
    }
}

/// Positions for both hook shapes of one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptorOrder {
    pub around_tx: InterceptorPosition,
    pub on_tx: InterceptorPosition,
}

impl InterceptorOrder {
    /// Same position for both hook shapes.
    pub fn both(position: InterceptorPosition) -> Self {
        Self {
            around_tx: position.clone(),
            on_tx: position,
        }
    }

    #[must_use]
    pub fn with_around_tx(mut self, position: InterceptorPosition) -> Self {
        self.around_tx = position;
        self
    }

    #[must_use]
    pub fn with_on_tx(mut self, position: InterceptorPosition) -> Self {
        self.on_tx = position;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order_appends() {
        let order = InterceptorOrder::default();
        assert_eq!(order.around_tx.position_type, PositionType::None);
        assert_eq!(order.around_tx.anchor(), None);
        assert_eq!(order.on_tx.anchor(), None);
    }

    #[test]
    fn test_builder_sets_each_shape() {
        let order = InterceptorOrder::default()
            .with_around_tx(InterceptorPosition::after("audit"))
            .with_on_tx(InterceptorPosition::before("notify"));
        assert_eq!(order.around_tx.anchor(), Some("audit"));
        assert_eq!(order.on_tx.position_type, PositionType::Before);
        assert_eq!(order.on_tx.anchor(), Some("notify"));
    }
}
