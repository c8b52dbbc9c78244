//! Engine command interface and reply values.

use crate::SessionResult;

/// Executes one engine command and returns its parsed reply.
///
/// Calls are synchronous round-trips; the engine holds state (working
/// directory, loaded classes) between calls.
pub trait Engine {
    fn send(&mut self, expression: &str) -> SessionResult<EngineReply>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn send(&mut self, expression: &str) -> SessionResult<EngineReply> {
        (**self).send(expression)
    }
}

/// Value returned by the engine for one command.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    /// Empty reply, `NONE()`, or no value at all
    Nothing,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Bare identifier such as a class name
    Name(String),
    Tuple(Vec<EngineReply>),
    List(Vec<EngineReply>),
    Record {
        name: String,
        fields: Vec<(String, EngineReply)>,
    },
}

impl EngineReply {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) | Self::Name(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Field of a record reply.
    pub fn field(&self, name: &str) -> Option<&EngineReply> {
        match self {
            Self::Record { fields, .. } => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.as_bool() == Some(true)
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }
}
