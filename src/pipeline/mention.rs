//! Mention filter — decides whether a post is addressed to the bot and
//! extracts the text to translate.
//!
//! Runs before any I/O. A post that does not mention the bot, or that consists
//! of nothing but the mention, never reaches the translation backend.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::activitypub::BotIdentity;

/// Tags (opening or closing) with their attribute text.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9-]*)((?:[^>\x22']|\x22[^\x22]*\x22|'[^']*')*)>")
        .expect("tag pattern is valid")
});

/// `class` attribute inside a tag's attribute text.
static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("class pattern is valid")
});

/// `href` attribute inside a tag's attribute text.
static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("href pattern is valid")
});

/// HTML comments.
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Filter verdict for one post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// The body does not mention the bot.
    NotMentioned,
    /// The body mentions the bot but has no other text.
    OnlyMention,
    /// Plain text to translate. Never empty.
    Text(String),
}

/// Matches the bot's canonical mention forms in rendered post bodies.
#[derive(Debug, Clone)]
pub struct MentionFilter {
    actor_url: String,
    handle: String,
}

impl MentionFilter {
    pub fn new(identity: &BotIdentity) -> Self {
        Self {
            actor_url: identity.actor_url(),
            handle: identity.handle().to_lowercase(),
        }
    }

    /// Whether the rendered body mentions the bot, either by linking its actor
    /// URI or by spelling out its `@user@domain` handle.
    pub fn mentions_bot(&self, body: &str) -> bool {
        let links_actor = TAG
            .captures_iter(body)
            .filter(|caps| caps[1].is_empty())
            .filter_map(|caps| attr_value(&HREF_ATTR, &caps[3]).map(str::to_string))
            .any(|href| href.trim_end_matches('/') == self.actor_url);
        if links_actor {
            return true;
        }
        strip_tags(body, false)
            .split_whitespace()
            .any(|token| self.is_handle(token))
    }

    fn is_handle(&self, token: &str) -> bool {
        token
            .trim_start_matches(['(', '[', '"'])
            .trim_end_matches([',', '.', ':', ';', '!', '?', ')', ']', '"'])
            .eq_ignore_ascii_case(&self.handle)
    }

    /// Apply the filter to a rendered body.
    pub fn evaluate(&self, body: &str) -> Eligibility {
        if !self.mentions_bot(body) {
            return Eligibility::NotMentioned;
        }

        // Plain-text handles survive tag stripping and are removed here.
        let text = strip_tags(body, true)
            .split(' ')
            .filter(|token| !self.is_handle(token))
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            debug!("Post contains only the bot mention");
            Eligibility::OnlyMention
        } else {
            Eligibility::Text(text)
        }
    }
}

/// Reduce markup to single-spaced plain text.
///
/// When `drop_mentions` is set, any element whose `class` list contains
/// `mention` is removed together with its content.
pub fn strip_tags(html: &str, drop_mentions: bool) -> String {
    let html = COMMENT.replace_all(html, " ");
    let mut out = String::with_capacity(html.len());
    // Name and nesting depth of the mention element currently being skipped.
    let mut skipping: Option<(String, usize)> = None;
    let mut last = 0;

    for caps in TAG.captures_iter(&html) {
        let Some(whole) = caps.get(0) else { continue };
        if skipping.is_none() {
            out.push_str(&html[last..whole.start()]);
        }
        last = whole.end();
        out.push(' ');

        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let attrs = &caps[3];
        let self_closing = attrs.trim_end().ends_with('/') || VOID_ELEMENTS.contains(&name.as_str());

        match skipping.as_mut() {
            Some((skip_name, depth)) if *skip_name == name => {
                if closing {
                    *depth -= 1;
                    if *depth == 0 {
                        skipping = None;
                    }
                } else if !self_closing {
                    *depth += 1;
                }
            }
            Some(_) => {}
            None => {
                if drop_mentions && !closing && !self_closing && has_mention_class(attrs) {
                    skipping = Some((name, 1));
                }
            }
        }
    }
    if skipping.is_none() {
        out.push_str(&html[last..]);
    }

    decode_entities(&out)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First value of the attribute matched by `pattern`, whichever quoting it uses.
fn attr_value<'a>(pattern: &Regex, attrs: &'a str) -> Option<&'a str> {
    let caps = pattern.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

fn has_mention_class(attrs: &str) -> bool {
    attr_value(&CLASS_ATTR, attrs)
        .is_some_and(|value| value.split_whitespace().any(|class| class == "mention"))
}

/// Decode the character references that post bodies use in practice.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
