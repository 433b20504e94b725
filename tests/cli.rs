//! End-to-end checks against the compiled binary: write a script to a temp file, run it, check
//! stdout and the exit code.
use assert_cmd::Command;
use predicates::prelude::*;

fn wisp() -> Command {
    Command::cargo_bin("wisp").unwrap()
}

fn script_file(source: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{source}").unwrap();
    file
}

#[test]
fn prints_to_stdout() {
    let file = script_file(r#"println("hello");"#);
    wisp()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));
}

#[test]
fn recursive_closure_sum() {
    let file = script_file(
        r#"
        sum_to := func(n) {
            return if n == 0 { 0 } else { n + sum_to(n - 1) };
        };
        println(sum_to(5));
        "#,
    );
    wisp()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("15"));
}

#[test]
fn undeclared_name_fails_with_nonzero_exit() {
    let file = script_file("println(never_declared);");
    wisp().arg(file.path()).assert().failure();
}

#[test]
fn division_by_zero_fails_with_nonzero_exit() {
    let file = script_file("x := 1 / 0;");
    wisp().arg(file.path()).assert().failure();
}

#[test]
fn missing_file_fails_with_nonzero_exit() {
    wisp().arg("/nonexistent/path/to/a/script.wisp").assert().failure();
}

#[test]
fn eval_builtin_is_reentrant_end_to_end() {
    let file = script_file(r#"println(eval("eval(\"1 + 2\")"));"#);
    wisp()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));
}
