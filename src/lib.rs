use miette::Diagnostic;

pub mod eval;
pub mod parse;
pub mod registry;
pub mod system;
pub mod tree;

pub use eval::{CommandFailure, Evaluator, UnresolvedCallError};
pub use parse::{Opening, Parser, SyntaxError, SyntaxErrorKind, UnterminatedInputError};
pub use registry::{Command, CommandError, CommandTable, Registry, Value};
pub use tree::{Kind, Literal, Node, NodeId, Tree};

/// Everything that can go wrong with one line of input.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unterminated(#[from] UnterminatedInputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unresolved(#[from] UnresolvedCallError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandFailure),
}

impl Error {
    /// Character offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            Error::Syntax(e) => e.offset,
            Error::Unterminated(e) => e.offset,
            Error::Unresolved(e) => e.offset,
            Error::Command(e) => e.offset,
        }
    }

    /// Renders the error the way the shell prints it: the message, then the
    /// input line, then a caret under the offending character.
    ///
    /// Command failures are reported with the message alone.
    pub fn report(&self) -> String {
        match self {
            Error::Syntax(e) => caret(e, e.input(), e.offset),
            Error::Unterminated(e) => caret(e, e.input(), e.offset),
            Error::Unresolved(e) => caret(e, e.input(), e.offset),
            Error::Command(e) => e.to_string(),
        }
    }
}

fn caret(message: &impl std::fmt::Display, input: &str, offset: usize) -> String {
    format!("{message}\n{input}\n{}^", "-".repeat(offset))
}

/// Parses one line and reduces it against `registry`.
pub fn evaluate<R: Registry + ?Sized>(input: &str, registry: &R) -> Result<Literal, Error> {
    let mut tree = Parser::new(input).build_tree()?;
    Evaluator::new(input, registry).evaluate(&mut tree)
}
