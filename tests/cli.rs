// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn tsen(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tsen"))
        .current_dir(dir)
        .env_remove("TSEN_CONFIG")
        .env_remove("TSEN_LOG")
        .env_remove("TSEN_NODE")
        .args(args)
        .output()
        .unwrap()
}

fn tsen_stdin(dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tsen"))
        .current_dir(dir)
        .env_remove("TSEN_CONFIG")
        .env_remove("TSEN_LOG")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn rewrite_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("main.js"),
        "const m = await import('./dynamic.ts');\nimport('./x.js');\n",
    )
    .unwrap();

    let out = tsen(dir.path(), &["rewrite", "main.js"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "const m = await Promise.resolve(require('./dynamic.ts'));\nimport('./x.js');\n"
    );
}

#[test]
fn rewrite_stdin_uses_configured_suffix() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tsen.toml"), "[rewrite]\nsuffix = \".mts\"\n").unwrap();

    let out = tsen_stdin(dir.path(), &["rewrite", "-"], "import('./a.mts'); import('./b.ts');");
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "Promise.resolve(require('./a.mts')); import('./b.ts');"
    );
}

#[test]
fn transform_stdin_as_typescript() {
    let dir = tempfile::tempdir().unwrap();
    let out = tsen_stdin(
        dir.path(),
        &["transform", "-", "--ext", "ts"],
        "export const n: number = 1;\nconst m = import('./m.ts');\n",
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("const n = exports.n = 1;"), "{stdout}");
    assert!(stdout.contains("Promise.resolve(require('./m.ts'))"), "{stdout}");
    assert!(stdout.contains("//# sourceMappingURL=data:application/json,"));
}

#[test]
fn transform_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.ts"), "let x: string = 'a';\n").unwrap();

    let out = tsen(dir.path(), &["transform", "a.ts", "-o", "a.out.js"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.is_empty());
    let written = fs::read_to_string(dir.path().join("a.out.js")).unwrap();
    assert!(written.contains("let x = 'a';"), "{written}");
}

#[test]
fn transform_reports_syntax_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.ts"), "let s = 'open").unwrap();

    let out = tsen(dir.path(), &["transform", "bad.ts"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("bad.ts"), "{stderr}");
    assert_eq!(stderr.matches("SyntaxError").count(), 1, "{stderr}");
}

#[test]
fn build_directory() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("main.js"), "import('./util.ts');\n").unwrap();
    fs::write(src.join("util.ts"), "export function f(): void {}\n").unwrap();
    fs::write(src.join("README.md"), "# hi\n").unwrap();

    let out = tsen(dir.path(), &["build", "src", "--out-dir", "dist"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("3 files"));

    let main = fs::read_to_string(dir.path().join("dist/main.js")).unwrap();
    assert_eq!(main, "Promise.resolve(require('./util.ts'));\n");
    let util = fs::read_to_string(dir.path().join("dist/util.ts")).unwrap();
    assert!(util.contains("exports.f = f;"), "{util}");
    assert!(dir.path().join("dist/README.md").exists());
}

#[test]
fn hooks_lists_configuration() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("custom.toml"),
        "[[hooks]]\nextension = \".mjs\"\nignore = [\"**/vendor/**\"]\n",
    )
    .unwrap();

    let out = tsen(dir.path(), &["hooks", "--config", "custom.toml"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 1, "{stdout}");
    assert!(stdout.contains(".mjs"));
    assert!(stdout.contains("**/vendor/**"));
}

#[test]
fn invalid_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tsen.toml"), "[rewrite]\nunknown = 1\n").unwrap();

    let out = tsen(dir.path(), &["hooks"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error"));
}

fn has_node() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

#[test]
fn run_executes_entry_with_node() {
    if !has_node() {
        eprintln!("node not found, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("main.ts"),
        r#"const required: { a: number } = require('./dynamic.ts');
const same = (m: unknown) => m === required;
import('./dynamic.ts').then(m => console.log('literal', same(m), m.a, m.default));
import('./dyn' + 'amic.ts').then(same, () => false).then(ok => console.log('concat', ok));
import(`./${'dynamic'}.ts`).then(same, () => false).then(ok => console.log('template', ok));
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("dynamic.ts"),
        "export default 2;\nexport const a: number = 1;\n",
    )
    .unwrap();

    let out = tsen(dir.path(), &["run", "main.ts"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("literal true 1 2"), "{stdout}");
    assert!(stdout.contains("concat false"), "{stdout}");
    assert!(stdout.contains("template false"), "{stdout}");
}

#[test]
fn run_forwards_exit_code() {
    if !has_node() {
        eprintln!("node not found, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("exit.ts"),
        "const code: number = Number(process.argv[2]);\nprocess.exit(code);\n",
    )
    .unwrap();

    let out = tsen(dir.path(), &["run", "exit.ts", "3"]);
    assert_eq!(out.status.code(), Some(3));
}
