/// Bytes read from the start of a file when guessing its language.
pub(crate) const SNIFF_BYTES: usize = 256;

/// Guess a language id from the first bytes of a file.
///
/// Looks at a `#!` interpreter line (`#!/usr/bin/env python3`,
/// `#!/bin/bash`) and a leading PHP open tag.
pub fn sniff_language(head: &str) -> Option<String> {
    let head = head.trim_start_matches('\u{feff}');
    let first = head.lines().next()?.trim();

    if first.starts_with("<?php") {
        return Some("php".to_string());
    }

    let shebang = first.strip_prefix("#!")?.trim();
    let mut parts = shebang.split_whitespace();
    let program = parts.next()?;
    let mut interpreter = program.rsplit('/').next()?;
    if interpreter == "env" {
        // skip `env -S` style flags
        interpreter = parts.find(|p| !p.starts_with('-'))?;
    }

    let language = match interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.') {
        "python" => "python",
        "node" | "nodejs" | "deno" | "bun" => "javascript",
        "ts-node" | "tsx" => "typescript",
        "sh" | "bash" | "zsh" | "dash" | "ksh" => "shellscript",
        "fish" => "fish",
        "ruby" => "ruby",
        "perl" => "perl",
        "php" => "php",
        "lua" => "lua",
        "Rscript" => "r",
        "pwsh" => "powershell",
        "elixir" => "elixir",
        "swift" => "swift",
        "julia" => "julia",
        _ => return None,
    };
    Some(language.to_string())
}
