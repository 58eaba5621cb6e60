//! Distribution boards
//!
//! An installation has exactly one main board (`order == 0`) and any number
//! of sub-boards fed from it or from each other. The main board cannot be
//! removed; circuits on a removed sub-board move to the main board.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::DesignCircuit;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BoardError {
    #[error("the main board cannot be removed")]
    CannotRemoveMain,
    #[error("unknown board '{0}'")]
    UnknownBoard(String),
    #[error("no main board (order 0) present")]
    NoMainBoard,
    #[error("{0} boards claim order 0; exactly one main board is allowed")]
    MultipleMainBoards(usize),
    #[error("duplicate board id '{0}'")]
    DuplicateId(String),
    #[error("board '{board}' is fed from unknown board '{feed}'")]
    UnknownFeed { board: String, feed: String },
    #[error("board feed topology contains a cycle")]
    FeedCycle,
    #[error("invalid board data: {0}")]
    InvalidData(String),
}

/// Surge protection device status recorded during board verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SpdStatus {
    Operational,
    NotApplicable,
    #[default]
    Unchecked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBoard {
    pub id: String,
    pub name: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fed_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Earth fault loop impedance at the board, ohms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zdb: Option<f64>,
    /// Prospective fault current at the board, kA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipf: Option<f64>,
    #[serde(default)]
    pub confirmed_correct_polarity: bool,
    #[serde(default)]
    pub confirmed_phase_sequence: bool,
    #[serde(default)]
    pub spd_status: SpdStatus,
}

impl DistributionBoard {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            fed_from: None,
            location: None,
            zdb: None,
            ipf: None,
            confirmed_correct_polarity: false,
            confirmed_phase_sequence: false,
            spd_status: SpdStatus::Unchecked,
        }
    }

    pub fn is_main(&self) -> bool {
        self.order == 0
    }

    /// Circuits fed from this board. Untagged circuits sit on the main board.
    pub fn circuits_fed<'a>(&self, circuits: &'a [DesignCircuit]) -> Vec<&'a DesignCircuit> {
        circuits
            .iter()
            .filter(|c| match c.board_id.as_deref() {
                Some(b) => b == self.id,
                None => self.is_main(),
            })
            .collect()
    }
}

/// The boards of one installation, with the main-board invariant enforced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardSet {
    boards: Vec<DistributionBoard>,
}

impl BoardSet {
    /// A set holding only a freshly created main board.
    pub fn new() -> Self {
        Self::with_main(uuid::Uuid::new_v4().to_string(), "Main Consumer Unit")
    }

    pub fn with_main(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            boards: vec![DistributionBoard::new(id, name, 0)],
        }
    }

    /// Wrap existing boards, rejecting sets that break the invariants.
    pub fn from_boards(boards: Vec<DistributionBoard>) -> Result<Self, BoardError> {
        let set = Self { boards };
        set.validate()?;
        Ok(set)
    }

    pub fn boards(&self) -> &[DistributionBoard] {
        &self.boards
    }

    pub fn into_boards(self) -> Vec<DistributionBoard> {
        self.boards
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn main_board(&self) -> Option<&DistributionBoard> {
        self.boards.iter().find(|b| b.is_main())
    }

    pub fn board(&self, id: &str) -> Option<&DistributionBoard> {
        self.boards.iter().find(|b| b.id == id)
    }

    pub fn board_mut(&mut self, id: &str) -> Option<&mut DistributionBoard> {
        self.boards.iter_mut().find(|b| b.id == id)
    }

    /// Add a sub-board. Without an explicit feed it is fed from the main board.
    pub fn add_board(
        &mut self,
        name: impl Into<String>,
        fed_from: Option<&str>,
    ) -> Result<&DistributionBoard, BoardError> {
        let main_id = self.main_board().map(|b| b.id.clone()).ok_or(BoardError::NoMainBoard)?;
        let feed = match fed_from {
            Some(id) if self.board(id).is_none() => {
                return Err(BoardError::UnknownBoard(id.to_string()))
            }
            Some(id) => id.to_string(),
            None => main_id,
        };
        let order = self.boards.iter().map(|b| b.order).max().unwrap_or(0) + 1;
        let mut board = DistributionBoard::new(uuid::Uuid::new_v4().to_string(), name, order);
        board.fed_from = Some(feed);
        self.boards.push(board);
        Ok(&self.boards[self.boards.len() - 1])
    }

    /// Remove a sub-board.
    ///
    /// Its circuits move to the main board and its own sub-boards are
    /// re-fed from whatever fed the removed board. Returns the removed board
    /// and the number of circuits reassigned.
    pub fn remove_board(
        &mut self,
        id: &str,
        circuits: &mut [DesignCircuit],
    ) -> Result<(DistributionBoard, usize), BoardError> {
        let idx = self
            .boards
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| BoardError::UnknownBoard(id.to_string()))?;
        if self.boards[idx].is_main() {
            return Err(BoardError::CannotRemoveMain);
        }
        let main_id = self.main_board().map(|b| b.id.clone()).ok_or(BoardError::NoMainBoard)?;

        let removed = self.boards.remove(idx);
        let new_feed = removed.fed_from.clone().unwrap_or_else(|| main_id.clone());
        for board in self.boards.iter_mut() {
            if board.fed_from.as_deref() == Some(id) {
                board.fed_from = Some(new_feed.clone());
            }
        }

        let mut moved = 0;
        for circuit in circuits.iter_mut() {
            if circuit.board_id.as_deref() == Some(id) {
                circuit.board_id = Some(main_id.clone());
                moved += 1;
            }
        }
        tracing::info!(
            "Removed board '{}'; {} circuit(s) moved to main board",
            removed.name,
            moved
        );
        Ok((removed, moved))
    }

    /// Boards fed directly from `id`.
    pub fn sub_boards(&self, id: &str) -> Vec<&DistributionBoard> {
        let (graph, index) = self.feed_graph();
        let Some(&node) = index.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<&DistributionBoard> = graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| &self.boards[graph[n]])
            .collect();
        children.sort_by_key(|b| b.order);
        children
    }

    /// Circuits belonging to a board. Untagged circuits belong to the main board.
    pub fn circuits_on<'a>(
        &self,
        id: &str,
        circuits: &'a [DesignCircuit],
    ) -> Vec<&'a DesignCircuit> {
        match self.board(id) {
            Some(board) => board.circuits_fed(circuits),
            None => circuits
                .iter()
                .filter(|c| c.board_id.as_deref() == Some(id))
                .collect(),
        }
    }

    /// Check the main-board invariant and the feed topology.
    pub fn validate(&self) -> Result<(), BoardError> {
        let mains = self.boards.iter().filter(|b| b.is_main()).count();
        match mains {
            0 => return Err(BoardError::NoMainBoard),
            1 => {}
            n => return Err(BoardError::MultipleMainBoards(n)),
        }

        let mut seen = HashSet::new();
        for board in &self.boards {
            if !seen.insert(board.id.as_str()) {
                return Err(BoardError::DuplicateId(board.id.clone()));
            }
        }
        for board in &self.boards {
            if let Some(feed) = &board.fed_from {
                if !seen.contains(feed.as_str()) {
                    return Err(BoardError::UnknownFeed {
                        board: board.id.clone(),
                        feed: feed.clone(),
                    });
                }
            }
        }

        let (graph, _) = self.feed_graph();
        if is_cyclic_directed(&graph) {
            return Err(BoardError::FeedCycle);
        }
        Ok(())
    }

    /// Directed feed graph; node weights are indices into `self.boards`.
    fn feed_graph(&self) -> (DiGraph<usize, ()>, HashMap<&str, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for (i, board) in self.boards.iter().enumerate() {
            index.insert(board.id.as_str(), graph.add_node(i));
        }
        for board in &self.boards {
            if let Some(feed) = &board.fed_from {
                if let (Some(&from), Some(&to)) =
                    (index.get(feed.as_str()), index.get(board.id.as_str()))
                {
                    graph.add_edge(from, to, ());
                }
            }
        }
        (graph, index)
    }
}

impl Default for BoardSet {
    fn default() -> Self {
        Self::new()
    }
}
