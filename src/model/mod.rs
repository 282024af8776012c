// src/model/mod.rs
pub mod bills;
pub mod divisions;
pub mod members;

use serde::Deserialize;

/// The members/bills services wrap each record in a `value` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub value: T,
}

/// Deserialization helpers shared by the DTOs and the feed parser.
pub(crate) mod de {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use once_cell::sync::OnceCell;
    use regex::Regex;
    use serde::{Deserialize, Deserializer};

    /// Upstream timestamps arrive in one of three spellings: ISO-8601 with an
    /// offset or trailing `Z`, ISO-8601 without any offset, or RFC-822 (feed
    /// channels). Everything is normalized to UTC.
    pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Utc.from_utc_datetime(&naive));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        // Feed channels sometimes spell UTC as a bare trailing "Z", which
        // RFC-822 parsers reject.
        if let Some(stripped) = s.strip_suffix(" Z") {
            if let Ok(dt) = DateTime::parse_from_rfc2822(&format!("{stripped} +0000")) {
                return Ok(dt.with_timezone(&Utc));
            }
        }
        Err(format!("unrecognized datetime: {s:?}"))
    }

    pub(crate) fn datetime<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        parse_datetime(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn opt_datetime<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let s: Option<String> = Option::deserialize(d)?;
        match s {
            Some(s) if !s.is_empty() => parse_datetime(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }

    #[derive(Deserialize)]
    struct MemberRef {
        #[serde(rename = "memberId", alias = "MemberId")]
        member_id: u32,
    }

    /// Teller/voter arrays hold member objects (and may be null outright);
    /// only the ids are kept, the member records are resolved later.
    pub(crate) fn member_ids<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u32>, D::Error> {
        let refs: Option<Vec<MemberRef>> = Option::deserialize(d)?;
        Ok(refs
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.member_id)
            .collect())
    }

    /// Strip markup and decode entities from upstream rich-text snippets.
    pub(crate) fn strip_markup(s: &str) -> String {
        static RE_TAGS: OnceCell<Regex> = OnceCell::new();
        static RE_WS: OnceCell<Regex> = OnceCell::new();
        let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
        let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

        let decoded = html_escape::decode_html_entities(s).to_string();
        let stripped = re_tags.replace_all(&decoded, "");
        re_ws.replace_all(&stripped, " ").trim().to_string()
    }

    pub(crate) fn clean_text_opt<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<String>, D::Error> {
        let s: Option<String> = Option::deserialize(d)?;
        Ok(s.map(|s| strip_markup(&s)).filter(|s| !s.is_empty()))
    }

}
