use std::{borrow::Cow, fmt::Display};

use thiserror::Error;
use tracing::debug;

use crate::tree::{Kind, Literal};

/// A scalar handed to, or returned by, a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'de> {
    Int(i64),
    Float(f64),
    Str(Cow<'de, str>),
}

impl<'de> Value<'de> {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::String,
        }
    }

    /// Converts a literal's raw text into a value of the requested kind.
    pub fn coerce(text: &'de str, kind: Kind) -> Result<Self, CommandError> {
        let out_of_range = || CommandError::OutOfRange {
            text: text.to_string(),
            kind,
        };
        match kind {
            Kind::Int => text.parse().map(Value::Int).map_err(|_| out_of_range()),
            Kind::Float => match text.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Value::Float(n)),
                _ => Err(out_of_range()),
            },
            Kind::String => Ok(Value::Str(Cow::Borrowed(text))),
            Kind::Call => Err(CommandError::Invalid(format!(
                "`{text}` is a call, not a value"
            ))),
        }
    }

    /// Renders the value as the literal it collapses into.
    pub fn into_literal(self, kind: Kind) -> Result<Literal, CommandError> {
        if let Value::Float(n) = self {
            if !n.is_finite() {
                return Err(CommandError::OutOfRange {
                    text: n.to_string(),
                    kind: Kind::Float,
                });
            }
        }
        Ok(Literal::new(kind, self.to_string()))
    }
}

impl Display for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => {
                if *n == n.trunc() {
                    write!(f, "{n}.0")
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Why a command invocation failed. Shown only in verbose mode; users see one
/// generic failure message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("`{text}` does not fit in a {kind}")]
    OutOfRange { text: String, kind: Kind },
    #[error("integer overflow in `{0}`")]
    Overflow(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("`{name}` was called with ({actual}) but takes ({expected})")]
    Arguments {
        name: &'static str,
        expected: String,
        actual: String,
    },
    #[error("{0}")]
    Invalid(String),
}

impl CommandError {
    /// Builds an [`CommandError::Arguments`] from the values a command got.
    pub fn arguments(name: &'static str, expected: &[Kind], actual: &[Value<'_>]) -> Self {
        CommandError::Arguments {
            name,
            expected: join_kinds(expected.iter().copied()),
            actual: join_kinds(actual.iter().map(Value::kind)),
        }
    }
}

pub(crate) fn join_kinds(kinds: impl IntoIterator<Item = Kind>) -> String {
    kinds
        .into_iter()
        .map(|kind| kind.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub type CommandFn = for<'de> fn(&[Value<'de>]) -> Result<Value<'de>, CommandError>;

/// Descriptor of one invocable operation.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub params: Vec<Kind>,
    pub ret: Kind,
    pub func: CommandFn,
}

impl Command {
    pub fn new(name: impl Into<String>, params: &[Kind], ret: Kind, func: CommandFn) -> Self {
        Command {
            name: name.into(),
            params: params.to_vec(),
            ret,
            func,
        }
    }

    /// Whether arguments of these kinds can be passed to this command.
    pub fn accepts(&self, kinds: &[Kind]) -> bool {
        self.params.len() == kinds.len()
            && self
                .params
                .iter()
                .zip(kinds)
                .all(|(param, arg)| param == arg)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.name)?;
        for param in &self.params {
            write!(f, " {param}")?;
        }
        write!(f, ") : {}", self.ret)
    }
}

/// Source of commands for the evaluator.
///
/// The order of [`Registry::commands`] is the load order and decides which
/// command wins when several accept the same arguments.
pub trait Registry {
    fn commands(&self) -> &[Command];

    /// Picks the first command, in load order, with this name and exactly these
    /// parameter kinds.
    fn resolve(&self, name: &str, kinds: &[Kind]) -> Option<&Command> {
        let found = self
            .commands()
            .iter()
            .filter(|command| command.name == name)
            .filter(|command| command.params.len() == kinds.len())
            .find(|command| command.accepts(kinds));
        debug!(name, kinds = %join_kinds(kinds.iter().copied()), found = found.is_some(), "resolve");
        found
    }

    fn invoke<'de>(
        &self,
        command: &Command,
        args: &[Value<'de>],
    ) -> Result<Value<'de>, CommandError> {
        (command.func)(args)
    }
}

/// A registry backed by an in-memory table, in registration order.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<Command>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table of commands shipped with the crate.
    pub fn builtin() -> Self {
        CommandTable {
            commands: crate::system::builtins(),
        }
    }

    pub fn register(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Registry for CommandTable {
    fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl FromIterator<Command> for CommandTable {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        CommandTable {
            commands: iter.into_iter().collect(),
        }
    }
}
