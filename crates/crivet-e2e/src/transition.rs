//! Lifecycle calls and the container states they are legal from.
//!
//! | call   | legal from                 | lands in |
//! |--------|----------------------------|----------|
//! | start  | created                    | running  |
//! | stop   | running, exited            | exited   |
//! | remove | any (left to the runtime)  | gone     |

use std::fmt;

use crivet_common::types::{ContainerId, ContainerState};

use crate::error::{Result, VerifyError};

/// A state-changing lifecycle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// `StartContainer`.
    Start,
    /// `StopContainer`. Stopping an exited container leaves it exited.
    Stop,
    /// `RemoveContainer`. Unchecked: whether removing a running container is
    /// allowed is the runtime's decision.
    Remove,
}

impl Transition {
    /// State the container is in after the call succeeds, if it still exists.
    #[must_use]
    pub const fn target(self) -> Option<ContainerState> {
        match self {
            Self::Start => Some(ContainerState::Running),
            Self::Stop => Some(ContainerState::Exited),
            Self::Remove => None,
        }
    }

    /// Returns whether the call may be issued against a container in `from`.
    #[must_use]
    pub fn is_allowed_from(self, from: ContainerState) -> bool {
        self.target()
            .is_none_or(|target| from.can_transition_to(target))
    }

    /// Rejects the call if `from` does not allow it.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::IllegalTransition`] naming the container.
    pub fn check(self, id: &ContainerId, from: ContainerState) -> Result<()> {
        if self.is_allowed_from(from) {
            Ok(())
        } else {
            Err(VerifyError::IllegalTransition {
                id: id.clone(),
                from,
                transition: self,
            })
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
            Self::Remove => f.write_str("remove"),
        }
    }
}
