//! Line-oriented stylesheet parser for the integration tests.
//!
//! One statement per line, blocks closed by a lone `}`:
//!
//! ```text
//! @use "theme" as t with $primary: red
//! @mixin pad($n) {
//!   padding: $n
//! }
//! .btn {
//!   color: t.$primary
//!   @include pad(2)
//! }
//! ```

use std::fs;
use std::path::Path;

use sass_ir::ast::{Expr, ForwardFilter, StylesheetBuilder};
use sassc::{ParseError, SourceParser};

pub struct LineParser;

impl SourceParser for LineParser {
    fn parse(&self, source: &str, builder: &mut StylesheetBuilder<'_>) -> Result<(), ParseError> {
        let lines = source
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with("//"))
            .collect();
        let mut cursor = Cursor { lines, pos: 0 };
        parse_block(&mut cursor, builder, false)
    }
}

/// Write `contents` to `dir/relative`, creating parent directories.
pub fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| panic!("{e}"));
    }
    fs::write(&path, contents).unwrap_or_else(|e| panic!("{e}"));
}

struct Cursor<'s> {
    lines: Vec<(usize, &'s str)>,
    pos: usize,
}

fn parse_block(
    cursor: &mut Cursor<'_>,
    b: &mut StylesheetBuilder<'_>,
    nested: bool,
) -> Result<(), ParseError> {
    let mut last = 0;
    while let Some(&(line, text)) = cursor.lines.get(cursor.pos) {
        cursor.pos += 1;
        last = line;
        if text == "}" {
            if nested {
                return Ok(());
            }
            return Err(ParseError::new(line, "unexpected `}`"));
        }
        parse_stmt(cursor, b, line, text)?;
    }
    if nested {
        return Err(ParseError::new(last, "unclosed block"));
    }
    Ok(())
}

fn parse_stmt(
    cursor: &mut Cursor<'_>,
    b: &mut StylesheetBuilder<'_>,
    line: usize,
    text: &str,
) -> Result<(), ParseError> {
    let text = text.strip_suffix(';').unwrap_or(text);

    if let Some(rule) = text.strip_prefix('@') {
        let (keyword, rest) = rule.split_once(' ').unwrap_or((rule, ""));
        return parse_at_rule(cursor, b, line, keyword, rest.trim());
    }

    if let Some(selector) = text.strip_suffix('{') {
        let mut result = Ok(());
        b.style_rule(selector.trim(), |b| result = parse_block(cursor, b, true));
        return result;
    }

    if let Some(assignment) = text.strip_prefix('$') {
        let (name, value) = assignment
            .split_once(':')
            .ok_or_else(|| ParseError::new(line, "expected `:` in assignment"))?;
        let name = name.trim();
        let value = value.trim();
        if let Some(value) = value.strip_suffix("!default") {
            let value = expr(b, line, value)?;
            b.assign_default(name, value);
        } else if let Some(value) = value.strip_suffix("!global") {
            let value = expr(b, line, value)?;
            b.assign_global(name, value);
        } else {
            let value = expr(b, line, value)?;
            b.assign(name, value);
        }
        return Ok(());
    }

    if let Some((property, value)) = text.split_once(':') {
        let value = expr(b, line, value)?;
        b.declaration(property.trim(), value);
        return Ok(());
    }

    Err(ParseError::new(line, format!("unrecognized statement `{text}`")))
}

fn parse_at_rule(
    cursor: &mut Cursor<'_>,
    b: &mut StylesheetBuilder<'_>,
    line: usize,
    keyword: &str,
    rest: &str,
) -> Result<(), ParseError> {
    match keyword {
        "use" => {
            let (url, rest) = quoted(line, rest)?;
            let (rest, config) = match rest.split_once("with ") {
                Some((before, config)) => (before.trim(), config_entries(b, line, config)?),
                None => (rest, Vec::new()),
            };
            let namespace = rest.strip_prefix("as ").map(str::trim);
            b.use_(url, namespace, &config);
        }
        "forward" => {
            let (url, rest) = quoted(line, rest)?;
            let (rest, filter) = if let Some((before, members)) = rest.split_once("show ") {
                (before.trim(), Some(ForwardFilter::Show(b.members(&list(members)))))
            } else if let Some((before, members)) = rest.split_once("hide ") {
                (before.trim(), Some(ForwardFilter::Hide(b.members(&list(members)))))
            } else {
                (rest, None)
            };
            let prefix = rest
                .strip_prefix("as ")
                .map(|p| p.trim().trim_end_matches('*'));
            b.forward(url, filter, prefix, &[]);
        }
        "import" => {
            let (url, _) = quoted(line, rest)?;
            b.import(url);
        }
        "mixin" | "function" => {
            let signature = rest
                .strip_suffix('{')
                .ok_or_else(|| ParseError::new(line, "expected `{`"))?
                .trim();
            let (name, params) = match call_parts(signature) {
                Some((name, params)) => (name, params),
                None => (signature, Vec::new()),
            };
            let params: Vec<_> = params
                .iter()
                .map(|p| (p.trim_start_matches('$'), None))
                .collect();
            let mut result = Ok(());
            if keyword == "mixin" {
                b.mixin(name, &params, |b| result = parse_block(cursor, b, true));
            } else {
                b.function(name, &params, |b| result = parse_block(cursor, b, true));
            }
            return result;
        }
        "include" => {
            let (call, has_content) = match rest.strip_suffix('{') {
                Some(call) => (call.trim(), true),
                None => (rest, false),
            };
            let (name, args) = call_parts(call).unwrap_or((call, Vec::new()));
            let args = args
                .iter()
                .map(|arg| expr(b, line, arg))
                .collect::<Result<Vec<_>, _>>()?;
            if has_content {
                let mut result = Ok(());
                b.include_with_content(name, args, |b| result = parse_block(cursor, b, true));
                return result;
            }
            b.include(name, args);
        }
        "return" => {
            let value = expr(b, line, rest)?;
            b.return_(value);
        }
        "content" => b.content(),
        _ => return Err(ParseError::new(line, format!("unknown at-rule @{keyword}"))),
    }
    Ok(())
}

/// `"url" rest...`
fn quoted(line: usize, text: &str) -> Result<(&str, &str), ParseError> {
    text.strip_prefix('"')
        .and_then(|rest| rest.split_once('"'))
        .map(|(url, rest)| (url, rest.trim()))
        .ok_or_else(|| ParseError::new(line, "expected a quoted URL"))
}

/// `$a: 1, $b: 2 !default`
fn config_entries<'t>(
    b: &StylesheetBuilder<'_>,
    line: usize,
    text: &'t str,
) -> Result<Vec<(&'t str, Expr, bool)>, ParseError> {
    list(text)
        .into_iter()
        .map(|entry| -> Result<_, ParseError> {
            let (name, value) = entry
                .trim_start_matches('$')
                .split_once(':')
                .ok_or_else(|| ParseError::new(line, "expected `$name: value`"))?;
            let (value, guarded) = match value.trim().strip_suffix("!default") {
                Some(value) => (value, true),
                None => (value, false),
            };
            Ok((name.trim(), expr(b, line, value)?, guarded))
        })
        .collect()
}

fn list(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// `name(a, b)` into its name and arguments.
fn call_parts(text: &str) -> Option<(&str, Vec<&str>)> {
    let inner = text.strip_suffix(')')?;
    let (name, args) = inner.split_once('(')?;
    Some((name.trim(), list(args)))
}

fn expr(b: &StylesheetBuilder<'_>, line: usize, text: &str) -> Result<Expr, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::new(line, "expected a value"));
    }
    if let Some(name) = text.strip_prefix('$') {
        return Ok(b.var(name));
    }
    if let Some((namespace, name)) = text.split_once(".$") {
        return Ok(b.ns_var(namespace, name));
    }
    if let Ok(number) = text.parse::<f64>() {
        return Ok(b.num(number));
    }
    if let Some((callee, args)) = call_parts(text) {
        let args = args
            .iter()
            .map(|arg| expr(b, line, arg))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(match callee.split_once('.') {
            Some((namespace, name)) => b.ns_call(namespace, name, args),
            None => b.call(callee, args),
        });
    }
    Ok(match text {
        "true" => b.boolean(true),
        "false" => b.boolean(false),
        "null" => b.null(),
        _ => b.string(text.trim_matches('"')),
    })
}
