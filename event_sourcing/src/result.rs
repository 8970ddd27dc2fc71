//! Results of command strategies

use crate::CommandResponse;
use core_types::DomainError;

/// What a command strategy decided
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyResult<E> {
    /// Persist `event`, then answer with `response`
    Mutation {
        event: E,
        response: CommandResponse,
        entity_created: bool,
        entity_deleted: bool,
    },
    /// Answer with `response`; nothing to persist
    Query { response: CommandResponse },
    /// The command was rejected; nothing to persist
    Error { error: DomainError },
}

impl<E> StrategyResult<E> {
    pub fn mutation(event: E, response: CommandResponse) -> Self {
        Self::Mutation {
            event,
            response,
            entity_created: false,
            entity_deleted: false,
        }
    }

    pub fn created(event: E, response: CommandResponse) -> Self {
        Self::Mutation {
            event,
            response,
            entity_created: true,
            entity_deleted: false,
        }
    }

    pub fn deleted(event: E, response: CommandResponse) -> Self {
        Self::Mutation {
            event,
            response,
            entity_created: false,
            entity_deleted: true,
        }
    }

    pub fn query(response: CommandResponse) -> Self {
        Self::Query { response }
    }

    pub fn error(error: DomainError) -> Self {
        Self::Error { error }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn event(&self) -> Option<&E> {
        match self {
            Self::Mutation { event, .. } => Some(event),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&CommandResponse> {
        match self {
            Self::Mutation { response, .. } | Self::Query { response } => Some(response),
            Self::Error { .. } => None,
        }
    }

    pub fn error_ref(&self) -> Option<&DomainError> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}

impl<E> From<Result<StrategyResult<E>, DomainError>> for StrategyResult<E> {
    fn from(result: Result<StrategyResult<E>, DomainError>) -> Self {
        result.unwrap_or_else(Self::error)
    }
}

/// A strategy result together with the command it answers
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome<C, E> {
    pub command: C,
    pub result: StrategyResult<E>,
}

impl<C, E> CommandOutcome<C, E> {
    pub fn new(command: C, result: StrategyResult<E>) -> Self {
        Self { command, result }
    }
}
