//! Element handlers plugged into htmd
//!
//! htmd walks the tree bottom-up and hands each handler the already converted
//! markdown of the element's children. Handlers that need to see structure
//! across several elements (lists, tables, code) mark their output with
//! private control characters; the enclosing handler or [`finish`] consumes
//! them, so none survive into the final text.

use crate::markdown::table::TableRows;
use crate::markdown::{HeadingStyle, MarkdownOptions};
use htmd::options::{HeadingStyle as HtmdHeadingStyle, Options};
use htmd::{Element, HtmlToMarkdown};
use std::sync::Arc;
use url::Url;

const CELL_END: char = '\u{1F}';
const ROW_END: char = '\u{1E}';
const ITEM_OPEN: char = '\u{11}';
const ITEM_CLOSE: char = '\u{12}';
const CODE_OPEN: char = '\u{02}';
const CODE_LANG_END: char = '\u{03}';
const CODE_CLOSE: char = '\u{04}';

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "iframe"];

/// Option-dependent rendering shared by the handlers of one conversion
struct Rules {
    options: MarkdownOptions,
    base_url: Option<Url>,
}

/// Builds an htmd converter for one set of options
pub fn build(options: &MarkdownOptions, base_url: Option<&Url>) -> HtmlToMarkdown {
    let heading_style = match options.heading_style {
        HeadingStyle::Atx => HtmdHeadingStyle::Atx,
        HeadingStyle::Setext => HtmdHeadingStyle::Setex,
    };

    let rules = Arc::new(Rules {
        options: options.clone(),
        base_url: base_url.cloned(),
    });
    let anchor = Arc::clone(&rules);
    let image = Arc::clone(&rules);
    let code = Arc::clone(&rules);
    let table = Arc::clone(&rules);

    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .options(Options {
            heading_style,
            ..Default::default()
        })
        .add_handler(vec!["a"], move |element: Element| anchor.anchor(&element))
        .add_handler(vec!["img"], move |element: Element| image.image(&element))
        .add_handler(vec!["pre"], move |element: Element| code.code_block(&element))
        .add_handler(vec!["table"], move |element: Element| table.table(&element))
        .add_handler(vec!["code", "kbd", "samp", "tt"], inline_code_mark)
        .add_handler(vec!["strong", "b"], strong)
        .add_handler(vec!["em", "i"], emphasis)
        .add_handler(vec!["ul"], bullet_list)
        .add_handler(vec!["ol"], ordered_list)
        .add_handler(vec!["li"], list_item_mark)
        .add_handler(vec!["td", "th"], table_cell_mark)
        .add_handler(vec!["tr"], table_row_mark)
        .add_handler(vec!["thead", "tbody", "tfoot"], passthrough)
        .add_handler(vec!["caption", "colgroup"], drop_element)
        .add_handler(vec!["hr"], rule)
        .add_handler(vec!["br"], line_break)
        .build()
}

impl Rules {
    fn anchor(&self, element: &Element) -> Option<String> {
        let text = flatten(element.content);
        let href = attr(element, "href").map(|href| href.trim().to_string());

        match href {
            Some(href)
                if !self.options.ignore_links
                    && !href.is_empty()
                    && !href.starts_with("javascript:") =>
            {
                if text.is_empty() {
                    Some(String::new())
                } else {
                    Some(format!("[{}]({})", escape_brackets(&text), self.resolve(&href)))
                }
            }
            _ => Some(text),
        }
    }

    fn image(&self, element: &Element) -> Option<String> {
        if !self.options.preserve_images {
            return Some(String::new());
        }

        let src = attr(element, "src").map(|src| src.trim().to_string());
        match src {
            Some(src) if !src.is_empty() => {
                let alt = flatten(&attr(element, "alt").unwrap_or_default());
                Some(format!("![{}]({})", escape_brackets(&alt), self.resolve(&src)))
            }
            _ => Some(String::new()),
        }
    }

    fn code_block(&self, element: &Element) -> Option<String> {
        let (code_hint, code) = strip_code_marks(element.content);
        let code = code.trim_matches('\n').trim_end();

        let language = if self.options.code_highlighting {
            attr(element, "lang")
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
                .or(code_hint)
                .or_else(|| attr(element, "class").and_then(|class| class_language(&class)))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let fence = fence_for(code);
        Some(format!("\n\n{}{}\n{}\n{}\n\n", fence, language, code, fence))
    }

    fn table(&self, element: &Element) -> Option<String> {
        let rows: Vec<Vec<String>> = element
            .content
            .split(ROW_END)
            .filter(|row| row.contains(CELL_END))
            .map(|row| {
                let mut cells: Vec<String> = row.split(CELL_END).map(flatten).collect();
                // Whatever follows the last cell marker is not a cell
                cells.pop();
                cells
            })
            .collect();

        let rows = TableRows { rows };
        if rows.is_empty() {
            return Some(String::new());
        }

        let rendered = if self.options.preserve_tables {
            rows.to_pipe_table()
        } else {
            rows.to_plain_rows()
        };
        Some(format!("\n\n{}\n\n", rendered))
    }

    fn resolve(&self, target: &str) -> String {
        match self.base_url.as_ref().and_then(|base| base.join(target).ok()) {
            Some(url) => url.to_string(),
            None => target.to_string(),
        }
    }
}

// ===== Stateless handlers =====

fn strong(element: Element) -> Option<String> {
    Some(wrap_inline(element.content, "**"))
}

fn emphasis(element: Element) -> Option<String> {
    Some(wrap_inline(element.content, "*"))
}

fn inline_code_mark(element: Element) -> Option<String> {
    let hint = attr(&element, "class")
        .and_then(|class| class_language(&class))
        .unwrap_or_default();
    Some(format!(
        "{}{}{}{}{}",
        CODE_OPEN, hint, CODE_LANG_END, element.content, CODE_CLOSE
    ))
}

fn list_item_mark(element: Element) -> Option<String> {
    Some(format!("{}{}{}", ITEM_OPEN, element.content, ITEM_CLOSE))
}

fn bullet_list(element: Element) -> Option<String> {
    Some(render_list(element.content, |_| "* ".to_string()))
}

fn ordered_list(element: Element) -> Option<String> {
    let start: i64 = attr(&element, "start")
        .and_then(|start| start.trim().parse().ok())
        .unwrap_or(1);
    Some(render_list(element.content, |index| {
        format!("{}. ", start.saturating_add(index as i64))
    }))
}

fn table_cell_mark(element: Element) -> Option<String> {
    Some(format!("{}{}", element.content, CELL_END))
}

fn table_row_mark(element: Element) -> Option<String> {
    Some(format!("{}{}", element.content, ROW_END))
}

fn passthrough(element: Element) -> Option<String> {
    Some(element.content.to_string())
}

fn drop_element(_: Element) -> Option<String> {
    Some(String::new())
}

fn rule(_: Element) -> Option<String> {
    Some("\n\n---\n\n".to_string())
}

fn line_break(_: Element) -> Option<String> {
    Some("\n".to_string())
}

// ===== Post-processing =====

/// Resolves leftover marks and normalizes blank lines
pub fn finish(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut chars = markdown.chars();

    while let Some(c) = chars.next() {
        match c {
            CODE_OPEN => {
                // Inline code: the language hint only matters for blocks
                for c in chars.by_ref() {
                    if c == CODE_LANG_END {
                        break;
                    }
                }
                let mut code = String::new();
                for c in chars.by_ref() {
                    if c == CODE_CLOSE {
                        break;
                    }
                    code.push(c);
                }
                let code = code.split_whitespace().collect::<Vec<_>>().join(" ");
                if !code.is_empty() {
                    out.push_str(&inline_code(&code));
                }
            }
            CODE_LANG_END | CODE_CLOSE => {}
            // A cell or item outside its table or list reads as plain text
            CELL_END => out.push(' '),
            ROW_END | ITEM_CLOSE => out.push('\n'),
            ITEM_OPEN => out.push_str("\n* "),
            c => out.push(c),
        }
    }

    tidy(&out)
}

/// Final cleanup: trailing spaces removed, blank line runs collapsed, ends trimmed
///
/// Outside code fences, the first line of a block also loses leading spaces
/// left over from inter-element whitespace.
fn tidy(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;
    let mut fence: Option<String> = None;
    let mut block_start = true;

    for line in markdown.lines() {
        let mut line = line.trim_end();

        match &fence {
            Some(open) => {
                if line.trim_start() == open {
                    fence = None;
                }
            }
            None => {
                if line.is_empty() {
                    blank_run += 1;
                    block_start = true;
                    if blank_run > 1 {
                        continue;
                    }
                } else {
                    blank_run = 0;
                    if block_start {
                        line = line.trim_start();
                    }
                    block_start = false;

                    let ticks = line.len() - line.trim_start_matches('`').len();
                    if ticks >= 3 && !line[ticks..].contains('`') {
                        fence = Some("`".repeat(ticks));
                    }
                }
            }
        }

        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

// ===== Helpers =====

fn attr(element: &Element, name: &str) -> Option<String> {
    element
        .attrs
        .iter()
        .find(|attr| &*attr.name.local == name)
        .map(|attr| attr.value.to_string())
}

/// Collapses multi-line text onto one line
fn flatten(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prefixes the first line with `first` and every later line with `rest`
///
/// Blank lines get the trimmed form of `rest`, so indented blank lines stay
/// empty.
fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(text.len() + first.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let prefix = if i == 0 { first } else { rest };
        if line.is_empty() {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
    }
    out
}

/// Renders the items of one list, numbering them with `marker`
fn render_list(content: &str, marker: impl Fn(usize) -> String) -> String {
    let mut items = Vec::new();
    let mut numbered = 0;
    let mut rest = content;

    while let Some(open) = rest.find(ITEM_OPEN) {
        // Text between items is a misnested block; keep it indented
        let stray = rest[..open].trim();
        if !stray.is_empty() {
            items.push(prefix_lines(stray, "  ", "  "));
        }

        let after = &rest[open + ITEM_OPEN.len_utf8()..];
        let (body, tail) = match after.find(ITEM_CLOSE) {
            Some(close) => (&after[..close], &after[close + ITEM_CLOSE.len_utf8()..]),
            None => (after, ""),
        };
        rest = tail;

        let body = body
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let body = body.trim_start();
        if body.is_empty() {
            continue;
        }

        let marker = marker(numbered);
        numbered += 1;
        let indent = " ".repeat(marker.len());
        items.push(prefix_lines(body, &marker, &indent));
    }

    let stray = rest.trim();
    if !stray.is_empty() {
        items.push(prefix_lines(stray, "  ", "  "));
    }

    if items.is_empty() {
        String::new()
    } else {
        format!("\n\n{}\n\n", items.join("\n"))
    }
}

/// Wraps inline content in `marker`, keeping edge whitespace outside it
fn wrap_inline(content: &str, marker: &str) -> String {
    let inner = content.trim();
    if inner.is_empty() {
        return content.to_string();
    }

    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{}{}{}{}{}", lead, marker, inner, marker, trail)
}

/// Splits block code content into its first language hint and plain text
fn strip_code_marks(content: &str) -> (Option<String>, String) {
    let mut hint = None;
    let mut text = String::with_capacity(content.len());
    let mut chars = content.chars();

    while let Some(c) = chars.next() {
        match c {
            CODE_OPEN => {
                let lang: String = chars.by_ref().take_while(|c| *c != CODE_LANG_END).collect();
                if hint.is_none() && !lang.is_empty() {
                    hint = Some(lang);
                }
            }
            CODE_LANG_END | CODE_CLOSE => {}
            c => text.push(c),
        }
    }
    (hint, text)
}

/// Escapes unbalanced brackets that would end link or image text early
///
/// Balanced pairs are left alone so an image nested in a link survives.
fn escape_brackets(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut unmatched = vec![false; chars.len()];
    let mut open = Vec::new();
    let mut escaped = false;

    for (i, c) in chars.iter().enumerate() {
        match c {
            '[' if !escaped => open.push(i),
            ']' if !escaped => match open.pop() {
                Some(_) => {}
                None => unmatched[i] = true,
            },
            _ => {}
        }
        escaped = *c == '\\' && !escaped;
    }
    for i in open {
        unmatched[i] = true;
    }

    let mut out = String::with_capacity(text.len());
    for (c, lone) in chars.into_iter().zip(unmatched) {
        if lone {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn class_language(class: &str) -> Option<String> {
    class.split_whitespace().find_map(|name| {
        name.strip_prefix("language-")
            .or_else(|| name.strip_prefix("lang-"))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    })
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn fence_for(code: &str) -> String {
    "`".repeat(longest_run(code, '`').max(2) + 1)
}

fn inline_code(text: &str) -> String {
    let ticks = "`".repeat(longest_run(text, '`') + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{} {} {}", ticks, text, ticks)
    } else {
        format!("{}{}{}", ticks, text, ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_class_language() {
        assert_eq!(class_language("language-rust"), Some("rust".to_string()));
        assert_eq!(class_language("hl lang-js"), Some("js".to_string()));
        assert_eq!(class_language("language-"), None);
        assert_eq!(class_language("plain"), None);
    }

    #[test]
    fn test_fence_grows_past_backticks() {
        assert_eq!(fence_for("let x = 1;"), "```");
        assert_eq!(fence_for("```nested```"), "````");
    }

    #[test]
    fn test_inline_code_with_backtick() {
        assert_eq!(inline_code("a"), "`a`");
        assert_eq!(inline_code("a`b"), "``a`b``");
        assert_eq!(inline_code("`x"), "`` `x ``");
    }

    #[test]
    fn test_unbalanced_brackets_escaped_once() {
        assert_eq!(escape_brackets("a]b"), "a\\]b");
        assert_eq!(escape_brackets("a\\]b"), "a\\]b");
        assert_eq!(escape_brackets("see [x"), "see \\[x");
        assert_eq!(escape_brackets("![logo](x.png)"), "![logo](x.png)");
    }

    #[test]
    fn test_ordered_list_numbering_saturates() {
        let content = format!("{o}a{c}{o}b{c}", o = ITEM_OPEN, c = ITEM_CLOSE);
        let rendered = render_list(&content, |index| {
            format!("{}. ", i64::MAX.saturating_add(index as i64))
        });
        assert_eq!(
            rendered.trim(),
            "9223372036854775807. a\n9223372036854775807. b"
        );
    }

    #[test]
    fn test_list_items_indent_continuations() {
        let content = format!(
            "{o}four\n\n* inner\n\n{c} {o}{c}",
            o = ITEM_OPEN,
            c = ITEM_CLOSE
        );
        assert_eq!(
            render_list(&content, |i| format!("{}. ", i + 4)).trim(),
            "4. four\n   * inner"
        );
    }

    #[test]
    fn test_finish_resolves_inline_code() {
        let marked = format!("Run {}{}cargo \n fmt{} now", CODE_OPEN, CODE_LANG_END, CODE_CLOSE);
        assert_eq!(finish(&marked), "Run `cargo fmt` now");
    }

    #[test]
    fn test_strip_code_marks_keeps_first_hint() {
        let marked = format!("{}py{}x = 1\n{}", CODE_OPEN, CODE_LANG_END, CODE_CLOSE);
        assert_eq!(
            strip_code_marks(&marked),
            (Some("py".to_string()), "x = 1\n".to_string())
        );
    }

    #[test]
    fn test_tidy_keeps_code_block_lines() {
        assert_eq!(
            tidy("\n\n   para  \n\n\n\n```\n  indented\n\n\n```\n"),
            "para\n\n```\n  indented\n\n\n```"
        );
    }
}
