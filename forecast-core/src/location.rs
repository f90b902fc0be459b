use async_trait::async_trait;
use thiserror::Error;

use crate::model::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location service unavailable")]
    Unavailable,
    #[error("Location error: {0}")]
    Other(String),
}

/// Permission-gated, one-shot access to the device position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Answers from fixed values, e.g. coordinates given on the command line.
#[derive(Debug, Clone)]
pub struct StaticLocation {
    permission: PermissionStatus,
    position: Option<Coordinate>,
}

impl StaticLocation {
    pub fn new(permission: PermissionStatus, position: Option<Coordinate>) -> Self {
        Self { permission, position }
    }

    /// Permission granted; position known when `position` is `Some`.
    pub fn granted(position: Option<Coordinate>) -> Self {
        Self::new(PermissionStatus::Granted, position)
    }

    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, None)
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        self.position.ok_or(LocationError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn granted_without_position_is_unavailable() {
        let loc = StaticLocation::granted(None);
        assert_eq!(loc.request_permission().await, PermissionStatus::Granted);
        assert_eq!(loc.current_position().await, Err(LocationError::Unavailable));
    }

    #[tokio::test]
    async fn granted_with_position() {
        let loc = StaticLocation::granted(Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(loc.current_position().await, Ok(Coordinate::new(1.0, 2.0)));
    }

    #[tokio::test]
    async fn denied() {
        assert_eq!(StaticLocation::denied().request_permission().await, PermissionStatus::Denied);
    }
}
