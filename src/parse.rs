use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::trace;

use crate::{
    Error,
    tree::{Kind, Node, NodeId, Tree},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    Token,
    Bracket,
}

impl Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxErrorKind::Token => write!(f, "token"),
            SyntaxErrorKind::Bracket => write!(f, "bracket"),
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("Encountered incorrect {kind} at offset {offset}")]
#[diagnostic(help(
    "expressions are integers, floats, \"strings\" or calls of the form `(name arg ...)`"
))]
pub struct SyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub kind: SyntaxErrorKind,
    pub offset: usize,
}

impl SyntaxError {
    pub fn input(&self) -> &str {
        self.src.inner()
    }
}

/// What was still open when the input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opening {
    String,
    Call,
}

// The message reads "string" for an open call as well; it is part of the
// diagnostic contract.
#[derive(Error, Debug, Diagnostic)]
#[error("Encountered end-of-input while reading string beginning at offset {offset}")]
pub struct UnterminatedInputError {
    #[source_code]
    src: NamedSource<String>,

    #[label("opened here and never closed")]
    bad_line: SourceSpan,

    #[help]
    advice: String,

    pub opening: Opening,
    pub offset: usize,
}

impl UnterminatedInputError {
    pub fn input(&self) -> &str {
        self.src.inner()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pos {
    /// Character offset, used in messages and caret lines.
    offset: usize,
    /// Byte offset, used for source spans.
    byte: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// After `(`; `start` is the first character of the name once seen.
    Name { start: Option<Pos> },
    Str { start: Pos },
    Number {
        start: Pos,
        dot: Option<Pos>,
        /// Whether a digit was seen since the sign or the dot.
        digits: bool,
    },
}

/// A call whose `(` has been read but whose `)` has not.
#[derive(Debug, Clone, Copy)]
struct Frame {
    bracket: Pos,
    node: Option<NodeId>,
}

/// Single-pass scanner turning one line of text into a [`Tree`].
pub struct Parser<'de> {
    whole: &'de str,
    tree: Tree,
    open: Vec<Frame>,
    state: State,
    buffer: String,
}

impl<'de> Parser<'de> {
    pub fn new(input: &'de str) -> Self {
        Parser {
            whole: input,
            tree: Tree::new(),
            open: Vec::new(),
            state: State::Idle,
            buffer: String::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip(self), fields(input = self.whole))]
    pub fn build_tree(mut self) -> Result<Tree, Error> {
        let mut offset = 0;
        for (byte, c) in self.whole.char_indices() {
            self.step(c, Pos { offset, byte })?;
            offset += 1;
        }
        self.finish(Pos {
            offset,
            byte: self.whole.len(),
        })?;
        Ok(self.tree)
    }

    fn step(&mut self, c: char, at: Pos) -> Result<(), Error> {
        match self.state {
            State::Str { start } => {
                if c == '"' {
                    self.close_string(start)
                } else {
                    self.buffer.push(c);
                    Ok(())
                }
            }
            State::Name { start } => match c {
                c if is_space(c) => {
                    if let Some(start) = start {
                        self.name_call(start);
                    }
                    Ok(())
                }
                ')' => match start {
                    Some(start) => {
                        self.name_call(start);
                        self.close_call(at)
                    }
                    None => Err(self.syntax_error(SyntaxErrorKind::Bracket, at, c)),
                },
                '(' => Err(self.syntax_error(SyntaxErrorKind::Bracket, at, c)),
                c if is_ident(c) => {
                    if start.is_none() {
                        self.state = State::Name { start: Some(at) };
                    }
                    self.buffer.push(c);
                    Ok(())
                }
                _ => Err(self.syntax_error(SyntaxErrorKind::Token, at, c)),
            },
            State::Number { start, dot, digits } => match c {
                '0'..='9' => {
                    self.buffer.push(c);
                    self.state = State::Number {
                        start,
                        dot,
                        digits: true,
                    };
                    Ok(())
                }
                '.' if dot.is_none() && digits => {
                    self.buffer.push(c);
                    self.state = State::Number {
                        start,
                        dot: Some(at),
                        digits: false,
                    };
                    Ok(())
                }
                c if is_space(c) || c == '(' || c == ')' => {
                    self.flush_number()?;
                    // `5)`: the bracket has no call to close.
                    if c == ')' && self.open.is_empty() {
                        return Err(self.syntax_error(SyntaxErrorKind::Bracket, at, c));
                    }
                    self.step(c, at)
                }
                _ => Err(self.syntax_error(SyntaxErrorKind::Token, at, c)),
            },
            State::Idle if self.is_complete() => {
                if is_space(c) {
                    Ok(())
                } else {
                    Err(self.syntax_error(SyntaxErrorKind::Token, at, c))
                }
            }
            State::Idle => match c {
                c if is_space(c) => Ok(()),
                '(' => {
                    self.open.push(Frame {
                        bracket: at,
                        node: None,
                    });
                    self.buffer.clear();
                    self.state = State::Name { start: None };
                    Ok(())
                }
                ')' => self.close_call(at),
                '"' => {
                    self.buffer.clear();
                    self.state = State::Str { start: at };
                    Ok(())
                }
                '0'..='9' | '-' => {
                    self.buffer.clear();
                    self.buffer.push(c);
                    self.state = State::Number {
                        start: at,
                        dot: None,
                        digits: c != '-',
                    };
                    Ok(())
                }
                // A name outside any call is missing its opening bracket.
                c if is_ident(c) && self.open.is_empty() => {
                    Err(self.syntax_error(SyntaxErrorKind::Bracket, at, c))
                }
                _ => Err(self.syntax_error(SyntaxErrorKind::Token, at, c)),
            },
        }
    }

    fn finish(&mut self, end: Pos) -> Result<(), Error> {
        match self.state {
            State::Str { start } => return Err(self.unterminated(Opening::String, start)),
            State::Number { .. } => self.flush_number()?,
            State::Name { .. } | State::Idle => {}
        }

        if let Some(frame) = self.open.last() {
            return Err(self.unterminated(Opening::Call, frame.bracket));
        }

        if self.tree.is_empty() {
            let at = Pos { offset: 0, byte: 0 };
            return Err(SyntaxError {
                src: self.source(),
                bad_bit: SourceSpan::from(at.byte..end.byte),
                kind: SyntaxErrorKind::Token,
                offset: at.offset,
            }
            .into());
        }

        Ok(())
    }

    fn is_complete(&self) -> bool {
        !self.tree.is_empty() && self.open.is_empty()
    }

    /// Adds a node under the innermost named call, or as the root.
    fn attach(&mut self, node: Node) -> NodeId {
        let parent = self.open.iter().rev().find_map(|frame| frame.node);
        trace!(kind = %node.kind, text = %node.text, offset = node.offset, "node");
        match parent {
            Some(parent) => self.tree.push_child(parent, node),
            None => self.tree.push(node),
        }
    }

    /// Turns the name buffer into a call node and makes it the current call.
    fn name_call(&mut self, start: Pos) {
        let name = std::mem::take(&mut self.buffer);
        let id = self.attach(Node::call(name, start.offset));
        if let Some(frame) = self.open.last_mut() {
            frame.node = Some(id);
        }
        self.state = State::Idle;
    }

    fn close_call(&mut self, at: Pos) -> Result<(), Error> {
        if self.open.pop().is_none() {
            return Err(self.syntax_error(SyntaxErrorKind::Bracket, at, ')'));
        }
        self.state = State::Idle;
        Ok(())
    }

    fn close_string(&mut self, start: Pos) -> Result<(), Error> {
        let text = std::mem::take(&mut self.buffer);
        self.attach(Node::literal(Kind::String, text, start.offset));
        self.state = State::Idle;
        Ok(())
    }

    fn flush_number(&mut self) -> Result<(), Error> {
        let State::Number { start, dot, digits } = self.state else {
            return Ok(());
        };
        if !digits {
            // A lone `-`, or a dot with nothing after it.
            let at = dot.unwrap_or(start);
            let c = if dot.is_some() { '.' } else { '-' };
            return Err(self.syntax_error(SyntaxErrorKind::Token, at, c));
        }
        let kind = if dot.is_some() { Kind::Float } else { Kind::Int };
        let text = std::mem::take(&mut self.buffer);
        self.attach(Node::literal(kind, text, start.offset));
        self.state = State::Idle;
        Ok(())
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new("<input>", self.whole.to_string())
    }

    fn syntax_error(&self, kind: SyntaxErrorKind, at: Pos, c: char) -> Error {
        SyntaxError {
            src: self.source(),
            bad_bit: SourceSpan::from(at.byte..at.byte + c.len_utf8()),
            kind,
            offset: at.offset,
        }
        .into()
    }

    fn unterminated(&self, opening: Opening, start: Pos) -> Error {
        let advice = match opening {
            Opening::String => "add a closing `\"` to terminate the string literal",
            Opening::Call => "add a closing `)` to terminate the call",
        };
        UnterminatedInputError {
            src: self.source(),
            bad_line: SourceSpan::from(start.byte..self.whole.len()),
            advice: advice.to_string(),
            opening,
            offset: start.offset,
        }
        .into()
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
