//! In-memory journaled aggregate
//!
//! The host contract in its smallest form: keep the journal, keep the
//! current state, apply persisted events only, rebuild by replay.

use crate::{
    execute, Aggregate, Command, CommandOutcome, CommandStrategy, Context, Event, EventOf,
    EventStrategy, JournalRecord, StrategyResult,
};
use core_types::{DomainError, Revision};
use tracing::{debug, info};

/// An aggregate together with its journal
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRoot<A: Aggregate> {
    entity_id: A::Id,
    state: Option<A>,
    journal: Vec<JournalRecord>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// A nonexistent aggregate with an empty journal
    pub fn new(entity_id: A::Id) -> Self {
        Self {
            entity_id,
            state: None,
            journal: Vec::new(),
        }
    }

    /// Rebuilds an aggregate by replaying its journal
    pub fn recover<E>(
        entity_id: A::Id,
        records: Vec<JournalRecord>,
        events: &E,
    ) -> Result<Self, DomainError>
    where
        E: EventStrategy<A>,
    {
        let mut state = None;
        for record in &records {
            let event = Event::from_journal_record::<A>(record)?;
            if event.entity_id != entity_id {
                return Err(DomainError::EntityIdMismatch {
                    expected: entity_id.to_string(),
                    actual: event.entity_id.to_string(),
                });
            }
            state = events.handle(&event, state)?;
        }
        debug!(
            entity_id = %entity_id,
            events = records.len(),
            "Recovered aggregate from journal"
        );
        Ok(Self {
            entity_id,
            state,
            journal: records,
        })
    }

    pub fn entity_id(&self) -> &A::Id {
        &self.entity_id
    }

    /// Current state; deleted entities are kept with their lifecycle
    pub fn state(&self) -> Option<&A> {
        self.state.as_ref()
    }

    pub fn journal(&self) -> &[JournalRecord] {
        &self.journal
    }

    pub fn revision(&self) -> Revision {
        self.state
            .as_ref()
            .map_or(Revision::initial(), Aggregate::revision)
    }

    /// Runs a command and persists the event of a successful mutation
    pub fn handle<S, E>(
        &mut self,
        strategy: &S,
        events: &E,
        context: &Context,
        command: Command<A::Id, S::Payload>,
    ) -> CommandOutcome<Command<A::Id, S::Payload>, EventOf<A>>
    where
        S: CommandStrategy<A>,
        E: EventStrategy<A>,
    {
        if command.entity_id != self.entity_id {
            let error = DomainError::EntityIdMismatch {
                expected: self.entity_id.to_string(),
                actual: command.entity_id.to_string(),
            };
            return CommandOutcome::new(command, StrategyResult::error(error));
        }

        let outcome = execute(strategy, events, context, self.state.as_ref(), command);
        let StrategyResult::Mutation {
            event,
            entity_deleted,
            ..
        } = &outcome.result
        else {
            return outcome;
        };

        match events.handle(event, self.state.clone()) {
            Ok(next) => {
                self.journal.push(event.to_journal_record());
                self.state = next;
                if *entity_deleted {
                    info!(entity_id = %self.entity_id, aggregate = A::TYPE, "Deleted aggregate");
                }
                outcome
            }
            Err(error) => CommandOutcome::new(outcome.command, StrategyResult::error(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventPayload;
    use crate::test_support::{
        Counter, CounterCommand, CounterEventStrategy, CounterId, CounterStrategy,
    };
    use core_types::{Lifecycle, Timestamp};
    use std::cell::Cell;

    fn id() -> CounterId {
        CounterId::parse("c:1").unwrap()
    }

    fn run(root: &mut AggregateRoot<Counter>, at: u64, command: CounterCommand) -> bool {
        let outcome = root.handle(
            &CounterStrategy,
            &CounterEventStrategy,
            &Context::at(Timestamp::from_millis(at)),
            Command::new(id(), command),
        );
        !outcome.result.is_error()
    }

    #[test]
    fn test_handle_persists_mutations_only() {
        let mut root = AggregateRoot::<Counter>::new(id());
        assert!(!run(&mut root, 1, CounterCommand::Increment { by: 1 }));
        assert!(root.journal().is_empty());

        assert!(run(&mut root, 1, CounterCommand::Create));
        assert!(run(&mut root, 2, CounterCommand::Increment { by: 3 }));
        assert!(run(&mut root, 3, CounterCommand::Retrieve));
        assert_eq!(root.journal().len(), 2);
        assert_eq!(root.revision(), Revision::new(2));
        assert_eq!(root.state().unwrap().value, 3);
    }

    #[test]
    fn test_recover_replays_to_same_state() {
        let mut root = AggregateRoot::<Counter>::new(id());
        run(&mut root, 1, CounterCommand::Create);
        run(&mut root, 2, CounterCommand::Increment { by: 2 });
        run(&mut root, 3, CounterCommand::Delete);
        run(&mut root, 4, CounterCommand::Create);

        let recovered =
            AggregateRoot::recover(id(), root.journal().to_vec(), &CounterEventStrategy).unwrap();
        assert_eq!(recovered, root);
        assert_eq!(recovered.revision(), Revision::new(4));
        assert_eq!(recovered.state().unwrap().lifecycle, Lifecycle::Active);
        assert_eq!(recovered.state().unwrap().created, Some(Timestamp::from_millis(4)));
    }

    #[test]
    fn test_recover_rejects_foreign_records() {
        let mut root = AggregateRoot::<Counter>::new(CounterId::parse("c:other").unwrap());
        root.handle(
            &CounterStrategy,
            &CounterEventStrategy,
            &Context::at(Timestamp::from_millis(1)),
            Command::new(CounterId::parse("c:other").unwrap(), CounterCommand::Create),
        );
        let result = AggregateRoot::<Counter>::recover(id(), root.journal().to_vec(), &CounterEventStrategy);
        assert!(matches!(result, Err(DomainError::EntityIdMismatch { .. })));
    }

    #[test]
    fn test_command_for_other_entity_is_rejected() {
        let mut root = AggregateRoot::<Counter>::new(id());
        let outcome = root.handle(
            &CounterStrategy,
            &CounterEventStrategy,
            &Context::at(Timestamp::from_millis(1)),
            Command::new(CounterId::parse("c:2").unwrap(), CounterCommand::Create),
        );
        assert!(outcome.result.is_error());
        assert!(root.state().is_none());
    }

    /// Applies events normally on odd calls and fails on even ones
    #[derive(Default)]
    struct FailingSecondApplication {
        calls: Cell<u32>,
    }

    impl EventStrategy<Counter> for FailingSecondApplication {
        fn create(&self, event: &EventOf<Counter>) -> Result<Counter, DomainError> {
            CounterEventStrategy.create(event)
        }

        fn modify(&self, event: &EventOf<Counter>, entity: &Counter) -> Result<Counter, DomainError> {
            CounterEventStrategy.modify(event, entity)
        }

        fn handle(
            &self,
            event: &EventOf<Counter>,
            entity: Option<Counter>,
        ) -> Result<Option<Counter>, DomainError> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() % 2 == 0 {
                return Err(DomainError::EventNotApplicable {
                    event_type: event.payload.event_type(),
                    entity_id: event.entity_id.to_string(),
                    reason: "refused".to_string(),
                });
            }
            CounterEventStrategy.handle(event, entity)
        }
    }

    #[test]
    fn test_failed_application_keeps_state() {
        let mut root = AggregateRoot::<Counter>::new(id());
        run(&mut root, 1, CounterCommand::Create);
        run(&mut root, 2, CounterCommand::Increment { by: 2 });

        let outcome = root.handle(
            &CounterStrategy,
            &FailingSecondApplication::default(),
            &Context::at(Timestamp::from_millis(3)),
            Command::new(id(), CounterCommand::Increment { by: 5 }),
        );
        assert!(matches!(
            outcome.result.error_ref(),
            Some(DomainError::EventNotApplicable { .. })
        ));
        assert_eq!(root.state().unwrap().value, 2);
        assert_eq!(root.revision(), Revision::new(2));
        assert_eq!(root.journal().len(), 2);
    }
}
