//! Ordered masking rules for volatile log tokens.
//!
//! Each rule pairs a pattern with the placeholder that replaces its matches.
//! Rules run in table order over the output of the previous rule, so broad
//! shapes (URLs, UUIDs, addresses, timestamps) are consumed before the generic
//! token rules near the end of the table get a chance to split them.
//!
//! Every pattern that mentions letters is case-insensitive. Lowercasing after
//! masking therefore never exposes a new match, which keeps the normalizer
//! idempotent.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

pub const URL: &str = "<url>";
pub const ID: &str = "<id>";
pub const IP: &str = "<ip>";
pub const TS: &str = "<ts>";
pub const HEX: &str = "<hex>";

/// How a rule rewrites one match.
enum Rewrite {
    /// Replace the whole match with a placeholder.
    Fixed(&'static str),
    /// Expand a capture template (keeps a key, masks the value).
    Template(&'static str),
    /// Replace with the placeholder only when the guard accepts the match.
    Guarded {
        placeholder: &'static str,
        accept: fn(&str) -> bool,
    },
}

pub(crate) struct MaskRule {
    pub(crate) name: &'static str,
    regex: Regex,
    rewrite: Rewrite,
}

impl MaskRule {
    fn new(name: &'static str, pattern: &str, rewrite: Rewrite) -> Self {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|err| panic!("mask rule `{name}` failed to compile: {err}"));
        Self {
            name,
            regex,
            rewrite,
        }
    }

    pub(crate) fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.rewrite {
            Rewrite::Fixed(placeholder) => self.regex.replace_all(text, *placeholder),
            Rewrite::Template(template) => self.regex.replace_all(text, *template),
            Rewrite::Guarded {
                placeholder,
                accept,
            } => self.regex.replace_all(text, |caps: &Captures<'_>| {
                let matched = &caps[0];
                if accept(matched) {
                    (*placeholder).to_string()
                } else {
                    matched.to_string()
                }
            }),
        }
    }
}

const KV_ID_KEYS: &str = "trace[_-]?id|span[_-]?id|request[_-]?id|req[_-]?id|correlation[_-]?id\
|session[_-]?id|event[_-]?id|message[_-]?id|msg[_-]?id|job[_-]?id|task[_-]?id|txn[_-]?id\
|transaction[_-]?id|op[_-]?id|operation[_-]?id|run[_-]?id|uid|user[_-]?id|account[_-]?id\
|customer[_-]?id|tenant[_-]?id|org[_-]?id";

fn looks_like_base64(token: &str) -> bool {
    token
        .chars()
        .any(|c| c.is_ascii_digit() || matches!(c, '+' | '/' | '='))
}

fn has_letter_and_digit(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic()) && token.chars().any(|c| c.is_ascii_digit())
}

fn has_mixed_case(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_uppercase()) && token.chars().any(|c| c.is_ascii_lowercase())
}

/// The ordered rule table, compiled once per process.
pub(crate) fn rules() -> &'static [MaskRule] {
    static RULES: OnceLock<Vec<MaskRule>> = OnceLock::new();
    RULES.get_or_init(build_rules).as_slice()
}

fn build_rules() -> Vec<MaskRule> {
    use Rewrite::{Fixed, Guarded, Template};

    let kv_ids = format!(r"(?i)\b({KV_ID_KEYS})\s*([=:])\s*([A-Za-z0-9._:/+=-]{{6,}})\b");

    vec![
        MaskRule::new("url", r#"(?i)\bhttps?://[^\s"'<>]+"#, Fixed(URL)),
        MaskRule::new(
            "email",
            r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
            Fixed(URL),
        ),
        MaskRule::new(
            "arn",
            r#"(?i)\barn:aws[a-z-]*:[a-z0-9-]+:[a-z0-9-]*:\d{12}:[^\s"']+\b"#,
            Fixed(URL),
        ),
        MaskRule::new(
            "jwt",
            r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b",
            Fixed(URL),
        ),
        MaskRule::new(
            "uuid",
            r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}\b",
            Fixed(ID),
        ),
        MaskRule::new(
            "ipv4",
            r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b",
            Fixed(IP),
        ),
        // Four or more groups, so clock times like 12:30:45 stay for the ts rules.
        MaskRule::new(
            "ipv6",
            r"(?i)\b(?:[0-9a-f]{1,4}:){3,7}[0-9a-f]{1,4}\b",
            Fixed(IP),
        ),
        MaskRule::new(
            "ipv6_compressed",
            r"(?i)\b(?:[0-9a-f]{1,4}:){1,6}:[0-9a-f]{1,4}\b",
            Fixed(IP),
        ),
        MaskRule::new(
            "mac",
            r"(?i)\b(?:[0-9a-f]{2}[:-]){5}[0-9a-f]{2}\b",
            Fixed(IP),
        ),
        MaskRule::new(
            "ts_iso",
            r"(?i)\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?(?:Z|[+-]\d{2}:\d{2})?\b",
            Fixed(TS),
        ),
        MaskRule::new("date_slashed", r"\b\d{4}/\d{2}/\d{2}\b", Fixed(TS)),
        MaskRule::new("date_dashed", r"\b\d{4}-\d{2}-\d{2}\b", Fixed(TS)),
        MaskRule::new("clock", r"\b\d{2}:\d{2}:\d{2}(?:\.\d+)?\b", Fixed(TS)),
        MaskRule::new("kv_id", &kv_ids, Template("${1}${2}<id>")),
        MaskRule::new("hex_literal", r"(?i)\b0x[0-9a-f]+\b", Fixed(HEX)),
        MaskRule::new("hex_run", r"(?i)\b[0-9a-f]{16,}\b", Fixed(HEX)),
        MaskRule::new(
            "base64",
            r"(?i)\b[a-z0-9+/]{20,}(?:={1,2}|\b)",
            Guarded {
                placeholder: HEX,
                accept: looks_like_base64,
            },
        ),
        MaskRule::new(
            "alnum_token",
            r"(?i)\b[a-z0-9_-]{12,}\b",
            Guarded {
                placeholder: ID,
                accept: has_letter_and_digit,
            },
        ),
        MaskRule::new(
            "mixed_case_token",
            r"(?i)\b[a-z0-9]{18,}\b",
            Guarded {
                placeholder: ID,
                accept: has_mixed_case,
            },
        ),
        MaskRule::new("number", r"\b[0-9]+\b", Fixed(ID)),
    ]
}

/// Run every rule in order.
pub(crate) fn mask_volatile(text: &str) -> String {
    let mut text = text.to_string();
    for rule in rules() {
        let replaced = match rule.apply(&text) {
            Cow::Owned(replaced) => Some(replaced),
            Cow::Borrowed(_) => None,
        };
        if let Some(replaced) = replaced {
            text = replaced;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static MaskRule {
        rules()
            .iter()
            .find(|rule| rule.name == name)
            .unwrap_or_else(|| panic!("no rule named {name}"))
    }

    #[test]
    fn table_compiles_in_order() {
        let names: Vec<&str> = rules().iter().map(|r| r.name).collect();
        assert_eq!(names.first(), Some(&"url"));
        assert_eq!(names.last(), Some(&"number"));
        let ts = names.iter().position(|n| *n == "ts_iso").unwrap();
        let number = names.iter().position(|n| *n == "number").unwrap();
        assert!(ts < number);
    }

    #[test]
    fn url_and_email_become_url_placeholder() {
        assert_eq!(
            mask_volatile("GET https://api.example.com/v1/users?id=9 failed"),
            "GET <url> failed"
        );
        assert_eq!(mask_volatile("notify ops@example.org now"), "notify <url> now");
    }

    #[test]
    fn addresses_become_ip_placeholder() {
        assert_eq!(mask_volatile("peer 10.0.12.7 closed"), "peer <ip> closed");
        assert_eq!(mask_volatile("peer fe80:0:0:0:1:2:3:4 up"), "peer <ip> up");
        assert_eq!(mask_volatile("nic 00:1a:2b:3c:4d:5e"), "nic <ip>");
    }

    #[test]
    fn clock_time_is_not_mistaken_for_ipv6() {
        assert_eq!(mask_volatile("at 12:30:45 ok"), "at <ts> ok");
    }

    #[test]
    fn timestamps_and_dates() {
        assert_eq!(
            mask_volatile("2024-05-01T10:11:12.345Z worker started"),
            "<ts> worker started"
        );
        assert_eq!(mask_volatile("on 2024/05/01 and 2024-05-02"), "on <ts> and <ts>");
    }

    #[test]
    fn key_value_ids_keep_their_key() {
        assert_eq!(
            mask_volatile("request_id = abcdef12 done"),
            "request_id=<id> done"
        );
        assert_eq!(mask_volatile("traceId:Zq93kLp0 x"), "traceId:<id> x");
    }

    #[test]
    fn guarded_rules_leave_plain_words() {
        assert_eq!(rule("alnum_token").apply("configuration").as_ref(), "configuration");
        assert_eq!(rule("alnum_token").apply("build12345abc").as_ref(), "<id>");
        assert_eq!(
            rule("base64").apply("abcdefghijklmnopqrstuvwxyz").as_ref(),
            "abcdefghijklmnopqrstuvwxyz"
        );
        assert_eq!(
            rule("mixed_case_token").apply("ABCDEFGHIJKLMNOPQRS").as_ref(),
            "ABCDEFGHIJKLMNOPQRS"
        );
        assert_eq!(
            rule("mixed_case_token").apply("AbCdEfGhIjKlMnOpQrS").as_ref(),
            "<id>"
        );
    }

    #[test]
    fn hex_literals_and_numbers() {
        assert_eq!(mask_volatile("ptr 0xDEADBEEF len 42"), "ptr <hex> len <id>");
        assert_eq!(mask_volatile("sha 0123456789abcdef0123"), "sha <hex>");
    }
}
