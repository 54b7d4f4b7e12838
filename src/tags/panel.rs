use tracing::{debug, info, warn};

use super::hierarchy::{build_hierarchy, HierarchyError};
use super::model::TagRecord;
use super::tree::{NodeKey, TagTree};
use crate::api::{FetchError, FetchErrorKind};

/// Identifies one load request. Results carrying an older ticket are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    Dismissed,
    OutsideClick,
    Escape,
    Selected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureCategory {
    Auth,
    Connectivity,
    Generic,
}

impl FailureCategory {
    pub fn message(self) -> &'static str {
        match self {
            FailureCategory::Auth => "Authentication failed, check the auth key in settings.",
            FailureCategory::Connectivity => "Cannot reach the Blinko tag service.",
            FailureCategory::Generic => "Something went wrong while loading tags.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelFailure {
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl PanelFailure {
    pub fn category(&self) -> FailureCategory {
        match self.kind {
            FetchErrorKind::Auth => FailureCategory::Auth,
            FetchErrorKind::Network => FailureCategory::Connectivity,
            FetchErrorKind::Shape | FetchErrorKind::Unknown => FailureCategory::Generic,
        }
    }
}

impl From<&FetchError> for PanelFailure {
    fn from(err: &FetchError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

impl From<&HierarchyError> for PanelFailure {
    fn from(err: &HierarchyError) -> Self {
        Self {
            kind: FetchErrorKind::Shape,
            detail: err.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Loading,
    Ready(TagTree),
    Failed(PanelFailure),
}

#[derive(Clone, Debug, Default)]
pub struct TagPanel {
    state: PanelState,
    generation: u64,
}

impl TagPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, PanelState::Closed)
    }

    pub fn tree(&self) -> Option<&TagTree> {
        match &self.state {
            PanelState::Ready(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn tree_mut(&mut self) -> Option<&mut TagTree> {
        match &mut self.state {
            PanelState::Ready(tree) => Some(tree),
            _ => None,
        }
    }

    fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = PanelState::Loading;
        LoadTicket(self.generation)
    }

    pub fn open(&mut self) -> Option<LoadTicket> {
        if self.is_open() {
            return None;
        }
        let ticket = self.begin_load();
        debug!(generation = self.generation, "tag panel opened");
        Some(ticket)
    }

    pub fn toggle(&mut self) -> Option<LoadTicket> {
        if self.is_open() {
            self.close(CloseReason::Dismissed);
            None
        } else {
            self.open()
        }
    }

    pub fn retry(&mut self) -> Option<LoadTicket> {
        if !matches!(self.state, PanelState::Failed(_)) {
            return None;
        }
        let ticket = self.begin_load();
        debug!(generation = self.generation, "retrying tag load");
        Some(ticket)
    }

    pub fn close(&mut self, reason: CloseReason) {
        if !self.is_open() {
            return;
        }
        self.generation += 1;
        self.state = PanelState::Closed;
        debug!(?reason, "tag panel closed");
    }

    /// Applies a load result. Returns `false` when the ticket is stale.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<TagRecord>, FetchError>,
    ) -> bool {
        if ticket.0 != self.generation || !matches!(self.state, PanelState::Loading) {
            debug!(
                ticket = ticket.0,
                generation = self.generation,
                "dropping stale tag load"
            );
            return false;
        }

        self.state = match result {
            Ok(records) => match build_hierarchy(&records) {
                Ok(forest) => {
                    let tree = TagTree::from_forest(&forest);
                    info!(tags = tree.len(), "tag panel ready");
                    PanelState::Ready(tree)
                }
                Err(err) => {
                    warn!(error = %err, "tag hierarchy rejected");
                    PanelState::Failed(PanelFailure::from(&err))
                }
            },
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "failed to load tags");
                PanelState::Failed(PanelFailure::from(&err))
            }
        };
        true
    }

    pub fn select(&mut self, key: NodeKey) -> Option<String> {
        let path = self.tree()?.path(key)?.to_string();
        self.close(CloseReason::Selected);
        Some(path)
    }
}
