use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::debug;

use crate::{
    Error,
    registry::{Command, CommandError, Registry, Value, join_kinds},
    tree::{Kind, Literal, Node, NodeId, Tree},
};

#[derive(Error, Debug, Diagnostic)]
#[error("Matching function for '({signature})' not found at offset {offset}")]
#[diagnostic(help("no registered command takes arguments of these kinds"))]
pub struct UnresolvedCallError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this call")]
    bad_bit: SourceSpan,

    signature: String,

    pub name: String,
    pub kinds: Vec<Kind>,
    pub offset: usize,
}

impl UnresolvedCallError {
    pub fn input(&self) -> &str {
        self.src.inner()
    }
}

/// Any fault raised while invoking a command. Users only see the generic
/// message; the cause is kept for verbose output.
#[derive(Error, Debug, Diagnostic)]
#[error("Number exceeds supported number range")]
pub struct CommandFailure {
    #[source_code]
    src: NamedSource<String>,

    #[label("while evaluating this call")]
    bad_bit: SourceSpan,

    pub name: String,
    pub offset: usize,

    #[source]
    pub cause: CommandError,
}

/// Reduces a [`Tree`] bottom-up against a [`Registry`].
pub struct Evaluator<'a, R: ?Sized> {
    whole: &'a str,
    registry: &'a R,
}

impl<'a, R: Registry + ?Sized> Evaluator<'a, R> {
    /// `whole` is the text the tree was parsed from; it is echoed in
    /// diagnostics.
    pub fn new(whole: &'a str, registry: &'a R) -> Self {
        Evaluator { whole, registry }
    }

    /// Reduces every call, innermost first and left to right, and returns the
    /// literal the root collapses into.
    #[tracing::instrument(level = "debug", skip_all, fields(input = self.whole))]
    pub fn evaluate(&self, tree: &mut Tree) -> Result<Literal, Error> {
        let root = tree.root();
        match tree.node(root).as_literal() {
            Some(literal) => Ok(literal),
            None => self.reduce(tree, root),
        }
    }

    /// Reduces the calls below `id` in post-order on an explicit work stack,
    /// then `id` itself.
    fn reduce(&self, tree: &mut Tree, id: NodeId) -> Result<Literal, Error> {
        // `(node, children_done)`; children are pushed reversed so the leftmost
        // is reduced first.
        let mut pending: Vec<(NodeId, bool)> =
            tree.children(id).iter().rev().map(|&child| (child, false)).collect();
        while let Some((next, children_done)) = pending.pop() {
            if !tree.node(next).is_call() {
                continue;
            }
            if children_done {
                self.apply(tree, next)?;
            } else {
                pending.push((next, true));
                pending.extend(tree.children(next).iter().rev().map(|&child| (child, false)));
            }
        }
        self.apply(tree, id)
    }

    /// Resolves and invokes a call whose children are all literals, then
    /// collapses it.
    fn apply(&self, tree: &mut Tree, id: NodeId) -> Result<Literal, Error> {
        let node = tree.node(id);
        let kinds: Vec<Kind> = node.children.iter().map(|&child| tree.node(child).kind).collect();
        let Some(command) = self.registry.resolve(&node.text, &kinds) else {
            return Err(self.unresolved(node, kinds));
        };

        let literal = self.invoke(tree, id, command)?;
        debug!(name = %node.text, offset = node.offset, result = %literal, "reduced");
        tree.collapse(id, literal.clone());
        Ok(literal)
    }

    fn invoke(&self, tree: &Tree, id: NodeId, command: &Command) -> Result<Literal, Error> {
        let node = tree.node(id);
        node.children
            .iter()
            .zip(&command.params)
            .map(|(&child, &kind)| Value::coerce(&tree.node(child).text, kind))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|args| self.registry.invoke(command, &args))
            .and_then(|value| value.into_literal(command.ret))
            .map_err(|cause| {
                debug!(name = %node.text, %cause, "command failed");
                CommandFailure {
                    src: self.source(),
                    bad_bit: self.span(node),
                    name: node.text.clone(),
                    offset: node.offset,
                    cause,
                }
                .into()
            })
    }

    fn unresolved(&self, node: &Node, kinds: Vec<Kind>) -> Error {
        let signature = if kinds.is_empty() {
            node.text.clone()
        } else {
            format!("{} {}", node.text, join_kinds(kinds.iter().copied()))
        };
        UnresolvedCallError {
            src: self.source(),
            bad_bit: self.span(node),
            signature,
            name: node.text.clone(),
            kinds,
            offset: node.offset,
        }
        .into()
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new("<input>", self.whole.to_string())
    }

    /// Byte span of a node's name, from its character offset.
    fn span(&self, node: &Node) -> SourceSpan {
        let start = self
            .whole
            .char_indices()
            .nth(node.offset)
            .map_or(self.whole.len(), |(byte, _)| byte);
        let end = (start + node.text.len()).min(self.whole.len());
        SourceSpan::from(start..end)
    }
}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, cell::RefCell};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Parser, registry::CommandTable};

    fn run(input: &str, registry: &impl Registry) -> Result<Literal, Error> {
        let mut tree = Parser::new(input).build_tree()?;
        Evaluator::new(input, registry).evaluate(&mut tree)
    }

    fn add<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
        crate::system::add_int(input)
    }

    fn table() -> CommandTable {
        let mut table = CommandTable::new();
        table.register(Command::new("add", &[Kind::Int, Kind::Int], Kind::Int, add));
        table
    }

    #[test]
    fn adds() {
        assert_eq!(run("(add 1 2)", &table()).unwrap(), Literal::new(Kind::Int, "3"));
        assert_eq!(
            run("(add 1 (add 2 (add 3 4)))", &table()).unwrap(),
            Literal::new(Kind::Int, "10")
        );
    }

    #[test]
    fn bare_literal_is_its_own_value() {
        assert_eq!(run("-42", &table()).unwrap(), Literal::new(Kind::Int, "-42"));
        assert_eq!(run("\"hi\"", &table()).unwrap(), Literal::new(Kind::String, "hi"));
        assert_eq!(run("2.50", &table()).unwrap(), Literal::new(Kind::Float, "2.50"));
    }

    #[test]
    fn kinds_must_match_exactly() {
        let Err(Error::Unresolved(e)) = run("(add 1 2.0)", &table()) else {
            panic!("expected an unresolved call");
        };
        assert_eq!(e.name, "add");
        assert_eq!(e.kinds, [Kind::Int, Kind::Float]);
        assert_eq!(e.offset, 1);
        assert_eq!(
            e.to_string(),
            "Matching function for '(add int float)' not found at offset 1"
        );
    }

    #[test]
    fn unresolved_zero_argument_call() {
        let Err(Error::Unresolved(e)) = run("(add)", &table()) else {
            panic!("expected an unresolved call");
        };
        assert_eq!(e.to_string(), "Matching function for '(add)' not found at offset 1");
    }

    #[test]
    fn inner_unresolved_call_surfaces_first() {
        let Err(Error::Unresolved(e)) = run("(nope (add 1 \"x\") (missing))", &table()) else {
            panic!("expected an unresolved call");
        };
        assert_eq!(e.name, "add");
        assert_eq!(e.offset, 7);
    }

    thread_local! {
        static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn record<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
        let rendered = input.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        CALLS.with(|calls| calls.borrow_mut().push(rendered.clone()));
        Ok(Value::Str(Cow::Owned(rendered)))
    }

    #[test]
    fn innermost_first_left_to_right() {
        let mut table = CommandTable::new();
        table
            .register(Command::new("g", &[Kind::Int], Kind::String, record))
            .register(Command::new("h", &[Kind::String], Kind::String, record))
            .register(Command::new(
                "f",
                &[Kind::String, Kind::Int, Kind::String],
                Kind::String,
                record,
            ));

        CALLS.with(|calls| calls.borrow_mut().clear());
        let result = run("(f (g 1) 2 (h (g 3)))", &table).unwrap();

        assert_eq!(result, Literal::new(Kind::String, "1,2,3"));
        let calls = CALLS.with(|calls| calls.borrow().clone());
        assert_eq!(calls, ["1", "3", "3", "1,2,3"]);
    }

    fn one<'de>(_: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
        Ok(Value::Int(1))
    }

    fn two<'de>(_: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
        Ok(Value::Int(2))
    }

    #[test]
    fn earliest_registered_match_wins() {
        let table: CommandTable = [
            Command::new("pick", &[Kind::String], Kind::Int, two),
            Command::new("pick", &[Kind::Int], Kind::Int, one),
            Command::new("pick", &[Kind::Int], Kind::Int, two),
        ]
        .into_iter()
        .collect();
        assert_eq!(run("(pick 5)", &table).unwrap().text, "1");
        assert_eq!(run("(pick \"5\")", &table).unwrap().text, "2");
    }

    #[test]
    fn declared_return_kind_is_used() {
        let table: CommandTable = [Command::new("f", &[], Kind::Float, one)]
            .into_iter()
            .collect();
        assert_eq!(run("(f)", &table).unwrap(), Literal::new(Kind::Float, "1"));
    }

    #[test]
    fn failures_are_generic() {
        let Err(Error::Command(e)) = run("(add 9223372036854775807 1)", &table()) else {
            panic!("expected a command failure");
        };
        assert_eq!(e.to_string(), "Number exceeds supported number range");
        assert_eq!(e.cause, CommandError::Overflow("add"));
        assert_eq!(e.offset, 1);

        let Err(Error::Command(e)) = run("(add 99999999999999999999 1)", &table()) else {
            panic!("expected a command failure");
        };
        assert!(matches!(e.cause, CommandError::OutOfRange { kind: Kind::Int, .. }));
    }

    #[test]
    fn first_failure_in_evaluation_order_wins() {
        let Err(Error::Unresolved(e)) = run("(add (add 1 (nope)) (missing))", &table()) else {
            panic!("expected an unresolved call");
        };
        assert_eq!(e.name, "nope");
        assert_eq!(e.offset, 13);
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        fn inc<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
            crate::system::inc(input)
        }
        let table: CommandTable = [Command::new("inc", &[Kind::Int], Kind::Int, inc)]
            .into_iter()
            .collect();

        let depth = 200_000;
        let input = format!("{}0{}", "(inc ".repeat(depth), ")".repeat(depth));
        assert_eq!(run(&input, &table).unwrap(), Literal::new(Kind::Int, "200000"));
    }

    #[test]
    fn collapse_happens_in_place() {
        let input = "(add (add 1 2) 3)";
        let mut tree = Parser::new(input).build_tree().unwrap();
        let inner = tree.children(tree.root())[0];

        let table = table();
        Evaluator::new(input, &table).evaluate(&mut tree).unwrap();

        let root = tree.node(tree.root());
        assert_eq!(root.kind, Kind::Int);
        assert_eq!(root.text, "6");
        assert_eq!(root.offset, 1);
        assert!(root.children.is_empty());
        assert_eq!(tree.node(inner).text, "3");
        assert_eq!(tree.node(inner).offset, 6);
    }
}
