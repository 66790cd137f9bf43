// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Properties of the dynamic import rewrite filter.

use regex::{Captures, Regex};
use tsen_hook::rewrite;

const FRAGMENTS: &[&str] = &[
    "import('./a.ts')",
    "import(\"../b/c.ts\")",
    "import('./a.js')",
    "import(`./${x}.ts`)",
    "import(`./x.ts`)",
    "import('./a' + '.ts')",
    "import ('./a.ts')",
    "reimport('./a.ts')",
    "x.import('./a.ts')",
    "import('./a\".ts')",
    "import('pkg.ts')",
    "import(",
    "'./q.ts')",
    "é ",
    " ",
    "\n",
    ";",
];

fn oracle(source: &str) -> String {
    let pattern = Regex::new(r#"\bimport\(('\.\.?/[^']*\.ts'|"\.\.?/[^"]*\.ts")\)"#).unwrap();
    pattern
        .replace_all(source, |caps: &Captures| {
            format!("Promise.resolve(require({}))", &caps[1])
        })
        .into_owned()
}

#[test]
fn test_matches_regex_oracle() {
    for a in FRAGMENTS {
        for b in FRAGMENTS {
            for c in FRAGMENTS {
                let source = format!("{a}{b}{c}");
                assert_eq!(rewrite(&source), oracle(&source), "input: {source:?}");
            }
        }
    }
}

#[test]
fn test_identity_without_matches() {
    for source in [
        "",
        "const a = require('./a.ts');",
        "import x from './x.ts';",
        "import(`./${name}.ts`)",
        "import(`./x.ts`)",
        "import('./a' + '.ts')",
        "import('lib/x.ts')",
        "await import(name)",
    ] {
        assert_eq!(rewrite(source), source);
    }
}

#[test]
fn test_both_quote_styles() {
    for path in ["./dynamic.ts", "../up/one.ts", "./deep/a/b/c.ts", "./with space.ts"] {
        for quote in ['\'', '"'] {
            assert_eq!(
                rewrite(&format!("import({quote}{path}{quote})")),
                format!("Promise.resolve(require({quote}{path}{quote}))")
            );
        }
    }
}

#[test]
fn test_output_is_fixed_point() {
    for a in FRAGMENTS {
        for b in FRAGMENTS {
            let source = format!("{a}{b}");
            let once = rewrite(&source).into_owned();
            assert_eq!(rewrite(&once), once, "input: {source:?}");
        }
    }
}

#[test]
fn test_static_and_template_imports_together() {
    let source = r#"
async function load(dynamic) {
    const fixed = await import('./dynamic.ts');
    const chosen = await import(`./${dynamic}.ts`);
    return [fixed, chosen];
}
"#;
    let output = rewrite(source);
    assert_eq!(output.matches("Promise.resolve(require(").count(), 1);
    assert!(output.contains("Promise.resolve(require('./dynamic.ts'))"));
    assert!(output.contains("import(`./${dynamic}.ts`)"));
}
