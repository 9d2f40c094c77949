use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn canonhtml() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_canonhtml"));
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn overwrites_input_by_default() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("page.html");
    fs::write(&input, "<div><p>A</p><p>B</p></div>").unwrap();

    let status = canonhtml().arg(&input).status().unwrap();
    assert!(status.success());
    assert_eq!(
        fs::read_to_string(&input).unwrap(),
        "<div>\n\t<p>A</p>\n\t<p>B</p>\n</div>"
    );
}

#[test]
fn writes_to_explicit_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.html");
    let output = dir.path().join("out.html");
    fs::write(&input, "<ul><li><p>x</p></li></ul>").unwrap();

    let status = canonhtml().args(["--compact"]).arg(&input).arg(&output).status().unwrap();
    assert!(status.success());
    assert_eq!(fs::read_to_string(&input).unwrap(), "<ul><li><p>x</p></li></ul>");
    assert_eq!(fs::read_to_string(&output).unwrap(), "<ul><li>x</li></ul>");
}

#[test]
fn stdin_goes_to_stdout() {
    let mut child = canonhtml()
        .args(["--div-fixup", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"hello<div>world</div>")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "<p>hello</p>\n<p>world</p>\n"
    );
}

#[test]
fn config_file_feeds_options_and_flags_win() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("canonhtml.toml");
    fs::write(&config, "[normalize]\ncode_line_ending = \"crlf\"\nunwrap_tags = []\n").unwrap();
    let input = dir.path().join("in.html");
    fs::write(&input, "<code class=block>a\nb</code><span>s</span>").unwrap();

    let output = canonhtml()
        .arg("--config")
        .arg(&config)
        .args(["--line-ending", "lf", "--stdout"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "<code class=block>a\nb</code>\n<span>s</span>\n"
    );
}

#[test]
fn missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.html");
    fs::write(&input, "<p>x</p>").unwrap();

    let output = canonhtml()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg(&input)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(fs::read_to_string(&input).unwrap(), "<p>x</p>");
}
