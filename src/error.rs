//! Error surface for the admission middleware.
//!
//! The decision engine itself never fails (degenerate inputs normalize to
//! defined verdicts), so the only failure modes at the middleware seam are a
//! deny verdict and whatever the wrapped service produces.

use crate::engine::BlockReason;
use std::fmt;

/// Unified error type for [`AdmissionService`](crate::middleware::AdmissionService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError<E> {
    /// The request was blocked by the decision engine.
    Denied {
        /// Which stage produced the block.
        reason: BlockReason,
    },
    /// The wrapped service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for AdmissionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied { reason: BlockReason::Signature } => {
                write!(f, "request denied: automation signature")
            }
            Self::Denied { reason: BlockReason::Velocity { count } } => {
                write!(f, "request denied: velocity {} over threshold", count)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AdmissionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Denied { .. } => None,
        }
    }
}

impl<E> AdmissionError<E> {
    /// Check if this error is a deny verdict.
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    /// The block reason, when denied.
    pub fn reason(&self) -> Option<BlockReason> {
        match self {
            Self::Denied { reason } => Some(*reason),
            Self::Inner(_) => None,
        }
    }

    /// Check if this error wraps an inner service error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Get the inner error if this is an `Inner` variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Denied { .. } => None,
        }
    }

    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Denied { .. } => None,
        }
    }
}
