//! Player input as data.
//!
//! Hosts translate clicks and drags into [`Command`]s, queue them, and the
//! engine applies the whole queue between ticks. Each command maps onto one
//! input entry point on [`Engine`]; rejections come back per command and
//! never abort the rest of the batch.

use crate::engine::{BuyError, EditError, Engine, SendError, SpawnError};
use crate::fixed::Ticks;
use crate::grid::{Direction, GridPosition, ObjectKind};
use crate::id::TruckId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Buy {
        kind: ObjectKind,
        position: GridPosition,
        facing: Direction,
    },
    Remove {
        position: GridPosition,
    },
    Rotate {
        position: GridPosition,
    },
    Move {
        from: GridPosition,
        to: GridPosition,
    },
    SendTruck {
        truck: TruckId,
    },
    /// Send whichever truck covers `position` (the click-a-truck gesture).
    SendTruckAt {
        position: GridPosition,
    },
    SpawnDie {
        position: GridPosition,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Buy(#[from] BuyError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("no truck at ({}, {})", .0.x, .0.y)]
    NoTruckAt(GridPosition),
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick boundary, plus an optional bounded
/// log of what was applied and when.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    history: VecDeque<(Ticks, Command)>,
    /// 0 keeps no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Take every pending command in submission order, logging each under
    /// `tick`.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Command> {
        let commands = std::mem::take(&mut self.pending);
        if self.max_history > 0 {
            for command in &commands {
                if self.history.len() == self.max_history {
                    self.history.pop_front();
                }
                self.history.push_back((tick, command.clone()));
            }
        }
        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applied commands, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &(Ticks, Command)> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// A command to submit once the engine reaches `tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub tick: Ticks,
    pub command: Command,
}

/// A list of scheduled commands, kept sorted by tick. Loaded from RON by
/// headless hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ScheduledCommand>", into = "Vec<ScheduledCommand>")]
pub struct CommandScript {
    entries: VecDeque<ScheduledCommand>,
}

impl From<Vec<ScheduledCommand>> for CommandScript {
    fn from(mut entries: Vec<ScheduledCommand>) -> Self {
        // Stable sort keeps same-tick commands in file order.
        entries.sort_by_key(|e| e.tick);
        Self {
            entries: entries.into(),
        }
    }
}

impl From<CommandScript> for Vec<ScheduledCommand> {
    fn from(script: CommandScript) -> Self {
        script.entries.into()
    }
}

impl CommandScript {
    pub fn load(path: &Path) -> Result<Self, crate::config::ConfigError> {
        crate::config::deserialize_file(path)
    }

    /// Move every command due at or before `tick` into `queue`.
    pub fn release(&mut self, tick: Ticks, queue: &mut CommandQueue) -> usize {
        let mut released = 0;
        while self.entries.front().is_some_and(|e| e.tick <= tick) {
            if let Some(entry) = self.entries.pop_front() {
                queue.push(entry.command);
                released += 1;
            }
        }
        released
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine integration
// ---------------------------------------------------------------------------

impl Engine {
    /// Apply a single command through the matching input entry point.
    pub fn apply_command(&mut self, command: &Command) -> Result<(), CommandError> {
        match *command {
            Command::Buy {
                kind,
                position,
                facing,
            } => {
                self.buy(kind, position, facing)?;
            }
            Command::Remove { position } => {
                self.remove_object_at(position)?;
            }
            Command::Rotate { position } => {
                self.rotate_object_at(position)?;
            }
            Command::Move { from, to } => self.move_object(from, to)?,
            Command::SendTruck { truck } => self.send_truck(truck)?,
            Command::SendTruckAt { position } => {
                let truck = self
                    .truck_at(position)
                    .ok_or(CommandError::NoTruckAt(position))?;
                self.send_truck(truck)?;
            }
            Command::SpawnDie { position } => {
                self.spawn_die_at(position)?;
            }
        }
        Ok(())
    }

    /// Drain `queue` and apply every command in order. Returns one result
    /// per command.
    pub fn apply_commands(&mut self, queue: &mut CommandQueue) -> Vec<Result<(), CommandError>> {
        queue
            .drain(self.tick())
            .iter()
            .map(|command| self.apply_command(command))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::CurrencyKind;
    use crate::test_utils::*;

    fn belt_at(x: i32, y: i32) -> Command {
        Command::Buy {
            kind: ObjectKind::ConveyorBelt,
            position: GridPosition::new(x, y),
            facing: Direction::East,
        }
    }

    #[test]
    fn drain_empties_pending_in_order() {
        let mut queue = CommandQueue::new();
        queue.push(belt_at(0, 0));
        queue.push_batch([belt_at(1, 0), belt_at(2, 0)]);
        assert_eq!(queue.pending_count(), 3);
        let drained = queue.drain(5);
        assert_eq!(drained, vec![belt_at(0, 0), belt_at(1, 0), belt_at(2, 0)]);
        assert!(queue.is_empty());
        assert_eq!(queue.history().count(), 0);
    }

    #[test]
    fn history_is_bounded() {
        let mut queue = CommandQueue::with_max_history(2);
        queue.push_batch([belt_at(0, 0), belt_at(1, 0), belt_at(2, 0)]);
        queue.drain(7);
        let kept: Vec<_> = queue.history().cloned().collect();
        assert_eq!(kept, vec![(7, belt_at(1, 0)), (7, belt_at(2, 0))]);
        queue.clear_history();
        assert_eq!(queue.history().count(), 0);
    }

    #[test]
    fn apply_commands_reports_each_result() {
        let mut engine = test_engine();
        engine.credit(CurrencyKind::PlainBuck, 5);
        let mut queue = CommandQueue::new();
        queue.push_batch([belt_at(0, 0), belt_at(0, 0), belt_at(1, 0), belt_at(2, 0)]);
        let results = engine.apply_commands(&mut queue);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(CommandError::Buy(BuyError::Occupied(GridPosition::new(0, 0))))
        );
        assert!(results[2].is_ok());
        assert!(matches!(
            results[3],
            Err(CommandError::Buy(BuyError::InsufficientFunds { cost: 9, balance: 0, .. }))
        ));
        assert_eq!(engine.object_count(), 2);
    }

    #[test]
    fn send_truck_at_without_truck() {
        let mut engine = test_engine();
        let position = GridPosition::new(3, 3);
        assert_eq!(
            engine.apply_command(&Command::SendTruckAt { position }),
            Err(CommandError::NoTruckAt(position))
        );
    }

    #[test]
    fn script_releases_due_commands() {
        let mut script = CommandScript::from(vec![
            ScheduledCommand {
                tick: 10,
                command: belt_at(1, 0),
            },
            ScheduledCommand {
                tick: 0,
                command: belt_at(0, 0),
            },
        ]);
        let mut queue = CommandQueue::new();
        assert_eq!(script.release(0, &mut queue), 1);
        assert_eq!(script.release(9, &mut queue), 0);
        assert_eq!(script.release(10, &mut queue), 1);
        assert!(script.is_empty());
        assert_eq!(queue.drain(10), vec![belt_at(0, 0), belt_at(1, 0)]);
    }

    #[test]
    fn script_parses_from_ron() {
        let source = r#"[
            (tick: 120, command: SendTruckAt(position: (x: 6, y: 5))),
            (tick: 0, command: Rotate(position: (x: 2, y: 3))),
        ]"#;
        let script: CommandScript = ron::from_str(source).unwrap();
        assert_eq!(script.len(), 2);
    }
}
