#![forbid(unsafe_code)]

//! Top-level error type.
//!
//! Each variant wraps the error of the component that failed, so `?` works
//! across the whole stack. Nothing here is retried: every error is reported
//! synchronously to the caller of the failing operation.

use std::fmt;

use figlay_core::{FigureId, GeometryError, PanelId, RegistryError};
use figlay_layout::{GridError, ModeError, MosaicError, SolveError};

use crate::config::FigureConfigError;

/// Top-level error type for figure operations.
#[derive(Debug)]
pub enum Error {
    /// Invalid size, resolution, rectangle or subplot parameters.
    Geometry(GeometryError),
    /// Unknown panel or rejected key collision.
    Registry(RegistryError),
    /// Bad grid shape, index or span.
    Grid(GridError),
    /// Malformed or inconsistent mosaic layout.
    Mosaic(MosaicError),
    /// Conflicting layout modes.
    Mode(ModeError),
    /// An explicitly requested fit or solve failed.
    Solve(SolveError),
    /// Configuration could not be loaded or is invalid.
    Config(FigureConfigError),
    /// The panel was created by another figure.
    ForeignPanel {
        panel: PanelId,
        owner: FigureId,
        figure: FigureId,
    },
}

/// Standard result type for figure APIs.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(e) => write!(f, "{e}"),
            Self::Registry(e) => write!(f, "{e}"),
            Self::Grid(e) => write!(f, "{e}"),
            Self::Mosaic(e) => write!(f, "{e}"),
            Self::Mode(e) => write!(f, "{e}"),
            Self::Solve(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::ForeignPanel {
                panel,
                owner,
                figure,
            } => write!(
                f,
                "panel {panel} belongs to figure {owner}, not {figure}"
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            Self::Registry(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Mosaic(e) => Some(e),
            Self::Mode(e) => Some(e),
            Self::Solve(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::ForeignPanel { .. } => None,
        }
    }
}

impl From<GeometryError> for Error {
    fn from(err: GeometryError) -> Self {
        Self::Geometry(err)
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<GridError> for Error {
    fn from(err: GridError) -> Self {
        Self::Grid(err)
    }
}

impl From<MosaicError> for Error {
    fn from(err: MosaicError) -> Self {
        Self::Mosaic(err)
    }
}

impl From<ModeError> for Error {
    fn from(err: ModeError) -> Self {
        Self::Mode(err)
    }
}

impl From<SolveError> for Error {
    fn from(err: SolveError) -> Self {
        Self::Solve(err)
    }
}

impl From<FigureConfigError> for Error {
    fn from(err: FigureConfigError) -> Self {
        Self::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_delegates_to_source() {
        let err = Error::from(RegistryError::NotFound(PanelId::from_raw(4)));
        assert_eq!(err.to_string(), "panel P4 is not registered");
        assert!(err.source().is_some());
    }

    #[test]
    fn foreign_panel_has_no_source() {
        let err = Error::ForeignPanel {
            panel: PanelId::from_raw(1),
            owner: FigureId::from_raw(2),
            figure: FigureId::from_raw(3),
        };
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "panel P1 belongs to figure F2, not F3");
    }
}
