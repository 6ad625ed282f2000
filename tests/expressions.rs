use std::process::Command;

use callexpr::{CommandTable, Error, Kind, Literal, evaluate};
use pretty_assertions::assert_eq;

fn ok(input: &str) -> Literal {
    evaluate(input, &CommandTable::builtin())
        .unwrap_or_else(|e| panic!("`{input}` failed:\n{}", e.report()))
}

fn report(input: &str) -> String {
    match evaluate(input, &CommandTable::builtin()) {
        Ok(literal) => panic!("`{input}` evaluated to {literal}"),
        Err(e) => e.report(),
    }
}

#[test]
fn evaluates_builtins() {
    assert_eq!(ok("(add 1 (mul 2 3))"), Literal::new(Kind::Int, "7"));
    assert_eq!(ok("(add 1.5 2.5)"), Literal::new(Kind::Float, "4.0"));
    assert_eq!(ok("(doubleSum 2 3)"), Literal::new(Kind::Int, "10"));
    assert_eq!(ok("(reverse \"hello world\")"), Literal::new(Kind::String, "dlrow olleh"));
    assert_eq!(ok("(len (concat \"ab\" \"cd\"))"), Literal::new(Kind::Int, "4"));
    assert_eq!(ok("(int_to_float (sub 1 4))"), Literal::new(Kind::Float, "-3.0"));
    assert_eq!(ok("(to_string (div 7.0 2.0))"), Literal::new(Kind::String, "3.5"));
    assert_eq!(ok("(float_to_int (pi))"), Literal::new(Kind::Int, "3"));
}

#[test]
fn float_results_feed_float_commands() {
    // `4.0` must stay a float so the outer call resolves to the float overload.
    assert_eq!(ok("(mul (add 1.5 2.5) 2.0)"), Literal::new(Kind::Float, "8.0"));
}

#[test]
fn bare_literals() {
    assert_eq!(ok("42").to_string(), "42");
    assert_eq!(ok("3.14").to_string(), "3.14");
    assert_eq!(ok("\"hi\"").to_string(), "hi");
}

#[test]
fn syntax_reports() {
    assert_eq!(
        report("--5"),
        "Encountered incorrect token at offset 1\n--5\n-^"
    );
    assert_eq!(
        report("1.2.3"),
        "Encountered incorrect token at offset 3\n1.2.3\n---^"
    );
    assert_eq!(
        report("add 1 2)"),
        "Encountered incorrect bracket at offset 0\nadd 1 2)\n^"
    );
    assert_eq!(
        report("5)"),
        "Encountered incorrect bracket at offset 1\n5)\n-^"
    );
    assert_eq!(
        report("(add 1 2) 3"),
        "Encountered incorrect token at offset 10\n(add 1 2) 3\n----------^"
    );
}

#[test]
fn unterminated_reports() {
    assert_eq!(
        report("\"abc"),
        "Encountered end-of-input while reading string beginning at offset 0\n\"abc\n^"
    );
    assert_eq!(
        report("(add 1 2"),
        "Encountered end-of-input while reading string beginning at offset 0\n(add 1 2\n^"
    );
}

#[test]
fn unresolved_report() {
    assert_eq!(
        report("(add 1 2.0)"),
        "Matching function for '(add int float)' not found at offset 1\n(add 1 2.0)\n-^"
    );
    assert_eq!(
        report("(add 1 (nope \"x\" 2))"),
        "Matching function for '(nope string int)' not found at offset 8\n\
         (add 1 (nope \"x\" 2))\n\
         --------^"
    );
}

#[test]
fn failures_are_one_line() {
    assert_eq!(report("(div 1 0)"), "Number exceeds supported number range");
    assert_eq!(
        report("(mul 9223372036854775807 2)"),
        "Number exceeds supported number range"
    );

    assert_eq!(
        report("(repeat \"ab\" 4611686018427387903)"),
        "Number exceeds supported number range"
    );

    let e = evaluate("(div 1 0)", &CommandTable::builtin()).unwrap_err();
    let Error::Command(failure) = e else {
        panic!("expected a command failure");
    };
    assert_eq!(failure.name, "div");
}

#[test]
fn deeply_nested_calls() {
    let depth = 200_000;
    let input = format!("{}0{}", "(inc ".repeat(depth), ")".repeat(depth));
    assert_eq!(ok(&input), Literal::new(Kind::Int, "200000"));
}

#[test]
fn errors_do_not_leak_between_lines() {
    let table = CommandTable::builtin();
    assert!(evaluate("(add 1", &table).is_err());
    assert_eq!(evaluate("(add 1 1)", &table).unwrap().text, "2");
}

#[test]
fn binary_evaluates_and_reports() {
    let output = Command::new(env!("CARGO_BIN_EXE_callexpr"))
        .args(["-e", "(add 1 2)", "-e", "(add 1 x)"])
        .env_remove("RUST_LOG")
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "3\nEncountered incorrect token at offset 7\n(add 1 x)\n-------^\n"
    );
}

#[test]
fn binary_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_callexpr"))
        .arg("--list")
        .output()
        .expect("binary runs");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("(add int int) : int"));
    assert!(stdout.contains("(doubleSum int int) : int\n"));
    assert!(stdout.contains("(pi) : float\n"));
}
