use std::collections::VecDeque;

use log::debug;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use pgp_keyring_core::{KeyringError, KeyringResult};

use crate::driver::Driver;
use crate::query::BoundQuery;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionCommand {
    Begin,
    Commit,
    Rollback,
}

impl TransactionCommand {
    pub fn as_sql(self) -> &'static str {
        match self {
            TransactionCommand::Begin => "BEGIN",
            TransactionCommand::Commit => "COMMIT",
            TransactionCommand::Rollback => "ROLLBACK",
        }
    }

    fn target(self) -> TransactionState {
        match self {
            TransactionCommand::Begin => TransactionState::Open,
            TransactionCommand::Commit | TransactionCommand::Rollback => TransactionState::Idle,
        }
    }

    fn is_noop_in(self, state: TransactionState) -> bool {
        state == self.target()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionState {
    Idle,
    Transitioning,
    Open,
}

enum Wake {
    Done(KeyringResult<()>),
    Issue,
}

struct Waiter {
    command: TransactionCommand,
    wake: oneshot::Sender<Wake>,
}

enum Phase {
    Idle,
    Open,
    Transitioning { queue: VecDeque<Waiter> },
}

impl Phase {
    fn settled(state: TransactionState) -> Self {
        match state {
            TransactionState::Open => Phase::Open,
            _ => Phase::Idle,
        }
    }

    fn state(&self) -> TransactionState {
        match self {
            Phase::Idle => TransactionState::Idle,
            Phase::Open => TransactionState::Open,
            Phase::Transitioning { .. } => TransactionState::Transitioning,
        }
    }
}

/// Serializes BEGIN/COMMIT/ROLLBACK over a shared session.
///
/// Requests that arrive while a command is in flight are queued and resolved
/// in arrival order once it completes: those already satisfied by the new
/// state finish immediately, the first one that is not issues its own command.
/// A failed command resets the state to idle and fails every queued request.
pub struct TransactionCoordinator {
    phase: Mutex<Phase>,
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionCoordinator {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.phase.lock().state()
    }

    pub async fn request(
        &self,
        driver: &dyn Driver,
        command: TransactionCommand,
    ) -> KeyringResult<()> {
        let pending = {
            let mut phase = self.phase.lock();
            match &mut *phase {
                Phase::Transitioning { queue } => {
                    let (wake, woken) = oneshot::channel();
                    queue.push_back(Waiter { command, wake });
                    Some(woken)
                }
                current => {
                    if command.is_noop_in(current.state()) {
                        return Ok(());
                    }
                    *current = Phase::Transitioning {
                        queue: VecDeque::new(),
                    };
                    None
                }
            }
        };
        if let Some(woken) = pending {
            match woken.await {
                Ok(Wake::Done(result)) => return result,
                Ok(Wake::Issue) => {}
                Err(_) => {
                    return Err(KeyringError::transaction_state(
                        "transaction command was abandoned",
                    ))
                }
            }
        }
        self.issue(driver, command).await
    }

    async fn issue(&self, driver: &dyn Driver, command: TransactionCommand) -> KeyringResult<()> {
        debug!("keyring: transaction {}", command.as_sql());
        let mut in_flight = InFlight {
            coordinator: self,
            command,
            settled: false,
        };
        let result = driver
            .execute(BoundQuery::raw(command.as_sql()))
            .await
            .map(|_| ());
        in_flight.settled = true;
        self.settle(command, &result);
        result
    }

    fn settle(&self, command: TransactionCommand, result: &KeyringResult<()>) {
        let mut phase = self.phase.lock();
        let mut queue = match std::mem::replace(&mut *phase, Phase::Idle) {
            Phase::Transitioning { queue } => queue,
            _ => VecDeque::new(),
        };
        if let Err(err) = result {
            debug!("keyring: {} failed, releasing {} waiters", command.as_sql(), queue.len());
            for waiter in queue {
                let _ = waiter.wake.send(Wake::Done(Err(err.clone())));
            }
            return;
        }
        let state = command.target();
        *phase = Phase::settled(state);
        while let Some(waiter) = queue.pop_front() {
            if waiter.command.is_noop_in(state) {
                let _ = waiter.wake.send(Wake::Done(Ok(())));
                continue;
            }
            if waiter.wake.send(Wake::Issue).is_ok() {
                *phase = Phase::Transitioning { queue };
                return;
            }
        }
    }
}

/// Releases the coordinator if an issuing future is dropped mid-command.
struct InFlight<'a> {
    coordinator: &'a TransactionCoordinator,
    command: TransactionCommand,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let err = KeyringError::transaction_state(format!(
                "{} was cancelled before completing",
                self.command.as_sql()
            ));
            self.coordinator.settle(self.command, &Err(err));
        }
    }
}
