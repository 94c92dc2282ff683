//! Shared page-parsing machinery.
//!
//! Field extractors are plain functions returning `anyhow::Result`; the
//! [`PageParser`] turns their failures into either a [`Error::MalformedPage`]
//! or an unset slot, depending on the session's policy.

pub(crate) mod dates;

use crate::error::{Error, Result};
use crate::resource::ResourceKind;
use crate::session::Session;
use anyhow::{bail, ensure, Context};
use scraper::{ElementRef, Html, Selector};
use std::fmt::Display;
use tracing::warn;

/// Per-page field policy.
pub(crate) struct PageParser<'a> {
    session: &'a Session,
    kind: ResourceKind,
    id: String,
}

impl<'a> PageParser<'a> {
    pub(crate) fn new(session: &'a Session, kind: ResourceKind, id: &impl Display) -> Self {
        Self {
            session,
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(&self) -> Error {
        Error::InvalidEntity {
            kind: self.kind,
            id: self.id.clone(),
        }
    }

    /// Fails with [`Error::InvalidEntity`] when the page carries the site's
    /// not-found marker.
    pub(crate) fn check_exists(&self, doc: &Html) -> Result<()> {
        if doc.select(selector!("div.badresult, div.error404")).next().is_some() {
            return Err(self.invalid());
        }
        Ok(())
    }

    /// Apply the session policy to one extracted field.
    pub(crate) fn field<T>(&self, name: &'static str, result: anyhow::Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.session.suppress_parse_errors() => {
                warn!(
                    kind = %self.kind,
                    id = %self.id,
                    field = name,
                    error = %format!("{e:#}"),
                    "Field not parsed, leaving it unset"
                );
                Ok(None)
            }
            Err(e) => Err(Error::MalformedPage {
                kind: self.kind,
                id: self.id.clone(),
                field: name,
                message: format!("{e:#}"),
            }),
        }
    }
}

/// Try extraction strategies in order; the first success wins.
pub(crate) fn first_of<T>(strategies: &[&dyn Fn() -> anyhow::Result<T>]) -> anyhow::Result<T> {
    let mut failures = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        match strategy() {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(format!("{e:#}")),
        }
    }
    bail!("no known markup matched ({})", failures.join("; "))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All descendant text, whitespace-collapsed.
pub(crate) fn text(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Descendant text with inner line breaks preserved.
pub(crate) fn raw_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of direct text children only.
pub(crate) fn own_text(el: ElementRef) -> String {
    let own: String = el
        .children()
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect();
    collapse_whitespace(&own)
}

pub(crate) fn has_class(el: ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

pub(crate) fn is_tag(el: ElementRef, name: &str) -> bool {
    el.value().name() == name
}

/// Following sibling elements.
pub(crate) fn next_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.next_siblings().filter_map(ElementRef::wrap)
}

/// Direct child elements named `name`.
pub(crate) fn child_elements<'a>(el: ElementRef<'a>, name: &str) -> Vec<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| is_tag(*child, name))
        .collect()
}

/// Trimmed text of the first match, which must be non-empty.
pub(crate) fn first_text(doc: &Html, selector: &Selector) -> anyhow::Result<String> {
    let value = doc
        .select(selector)
        .map(text)
        .find(|value| !value.is_empty())
        .context("element not found")?;
    Ok(value)
}

/// Trimmed text of the first non-empty match below `el`.
pub(crate) fn child_text(el: ElementRef, selector: &Selector) -> Option<String> {
    el.select(selector).map(text).find(|value| !value.is_empty())
}

/// First link under `el` with a matching href and non-empty text.
pub(crate) fn text_link<'a>(el: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    el.select(selector).find(|link| !text(*link).is_empty())
}

pub(crate) fn href(link: ElementRef) -> anyhow::Result<&str> {
    link.value().attr("href").context("link has no href")
}

/// First `<h2>` whose text contains `needle`.
pub(crate) fn h2<'a>(doc: &'a Html, needle: &str) -> Option<ElementRef<'a>> {
    doc.select(selector!("h2")).find(|h| text(*h).contains(needle))
}

/// First `div.normal_header` whose text contains `needle`.
pub(crate) fn normal_header<'a>(doc: &'a Html, needle: &str) -> Option<ElementRef<'a>> {
    doc.select(selector!("div.normal_header"))
        .find(|h| text(*h).contains(needle))
}

/// The sidebar row introduced by a `span.dark_text` label such as `"Episodes:"`.
pub(crate) fn labelled<'a>(doc: &'a Html, label: &str) -> anyhow::Result<ElementRef<'a>> {
    doc.select(selector!("span.dark_text"))
        .find(|span| text(*span) == label)
        .and_then(|span| span.parent().and_then(ElementRef::wrap))
        .with_context(|| format!("{label:?} not found"))
}

/// Value text of a sidebar row, without its label, footnotes and tooltips.
pub(crate) fn sidebar_value(row: ElementRef) -> String {
    fn collect(el: ElementRef, out: &mut String) {
        for child in el.children() {
            if let Some(t) = child.value().as_text() {
                out.push_str(t);
            } else if let Some(child) = ElementRef::wrap(child) {
                let skipped = matches!(child.value().name(), "sup" | "script" | "style" | "div")
                    || (is_tag(child, "span") && has_class(child, "dark_text"));
                if !skipped {
                    collect(child, out);
                }
            }
        }
    }

    let mut out = String::new();
    collect(row, &mut out);
    collapse_whitespace(&out)
}

/// Non-empty sidebar value for `label`.
pub(crate) fn sidebar_text(doc: &Html, label: &str) -> anyhow::Result<String> {
    let value = sidebar_value(labelled(doc, label)?);
    ensure!(!value.is_empty(), "{label:?} is empty");
    Ok(value)
}

/// `"1,234"`, `"#26"` and friends.
pub(crate) fn parse_count(value: &str) -> anyhow::Result<u32> {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, '#' | ',') && !c.is_whitespace())
        .collect();
    digits
        .parse()
        .with_context(|| format!("{value:?} is not a count"))
}

/// A count where `"N/A"` means not ranked.
pub(crate) fn parse_ranking(value: &str) -> anyhow::Result<Option<u32>> {
    if value.trim() == "N/A" {
        return Ok(None);
    }
    parse_count(value).map(Some)
}

/// A count where `"Unknown"` means not yet determined.
pub(crate) fn parse_known_count(value: &str) -> anyhow::Result<Option<u32>> {
    if value.trim() == "Unknown" {
        return Ok(None);
    }
    parse_count(value).map(Some)
}

/// Numeric id following `/{segment}/` in a link, e.g. `/people/1867/Naoki_Urasawa`.
pub(crate) fn id_from_href(href: &str, segment: &str) -> anyhow::Result<u32> {
    regex!(r"/([a-z_]+)/(\d+)")
        .captures_iter(href)
        .find(|caps| &caps[1] == segment)
        .with_context(|| format!("no {segment} id in {href:?}"))?[2]
        .parse()
        .with_context(|| format!("bad {segment} id in {href:?}"))
}

/// `"Family, Given"` becomes `"Given Family"`.
pub(crate) fn reorder_name(name: &str) -> String {
    match name.split_once(',') {
        Some((family, given)) if !given.trim().is_empty() => {
            format!("{} {}", given.trim(), family.trim())
        }
        _ => name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session, StubFetcher};

    const SIDEBAR: &str = r#"
        <div id="content"><table><tr><td>
          <div class="spaceit_pad"><span class="dark_text">Episodes:</span> 26 </div>
          <div class="spaceit_pad po-r"><span class="dark_text">Ranked:</span> #28<sup>2</sup>
            <div class="statistics-info">based on the top anime page</div></div>
          <div class="spaceit_pad"><span class="dark_text">Members:</span> 1,771,505</div>
        </td></tr></table></div>"#;

    #[test]
    fn test_sidebar_value_strips_label_and_footnotes() -> anyhow::Result<()> {
        let doc = Html::parse_document(SIDEBAR);

        assert_eq!(sidebar_text(&doc, "Episodes:")?, "26");
        assert_eq!(sidebar_text(&doc, "Ranked:")?, "#28");
        assert_eq!(parse_count(&sidebar_text(&doc, "Members:")?)?, 1_771_505);
        assert!(labelled(&doc, "Favorites:").is_err());

        Ok(())
    }

    #[test]
    fn test_counts() -> anyhow::Result<()> {
        assert_eq!(parse_count("#1,024")?, 1024);
        assert_eq!(parse_ranking("N/A")?, None);
        assert_eq!(parse_known_count("Unknown")?, None);
        assert_eq!(parse_known_count("12")?, Some(12));
        assert!(parse_count("many").is_err());
        Ok(())
    }

    #[test]
    fn test_id_from_href() -> anyhow::Result<()> {
        assert_eq!(id_from_href("/people/1867/Naoki_Urasawa", "people")?, 1867);
        assert_eq!(id_from_href("https://mal.test/anime/producer/23/Bandai", "producer")?, 23);
        assert_eq!(id_from_href("/manga/magazine/1/Big_Comic_Original", "magazine")?, 1);
        assert!(id_from_href("/anime//", "anime").is_err());
        Ok(())
    }

    #[test]
    fn test_reorder_name() {
        assert_eq!(reorder_name("Urasawa, Naoki"), "Naoki Urasawa");
        assert_eq!(reorder_name("Holo"), "Holo");
        assert_eq!(reorder_name("Trailing,"), "Trailing,");
    }

    #[test]
    fn test_first_of_tries_in_order() {
        let missing = || -> anyhow::Result<u32> { bail!("missing") };
        let found = || -> anyhow::Result<u32> { Ok(7) };

        assert_eq!(first_of(&[&missing, &found]).unwrap(), 7);
        let err = first_of(&[&missing, &missing]).unwrap_err();
        assert!(format!("{err:#}").contains("missing; missing"));
    }

    #[test]
    fn test_own_text_skips_children() {
        let doc = Html::parse_fragment("<p>outer <b>inner</b> text</p>");
        let p = doc.select(selector!("p")).next().unwrap();
        assert_eq!(own_text(p), "outer text");
    }

    #[test]
    fn test_field_policy() {
        let fetcher = StubFetcher::new();

        let strict = session(&fetcher, false);
        let parser = PageParser::new(&strict, ResourceKind::Anime, &1);
        assert_eq!(parser.field("episodes", Ok(3)).unwrap(), Some(3));
        let err = parser
            .field::<u32>("favorites", Err(anyhow::anyhow!("\"Favorites:\" not found")))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPage { field: "favorites", .. }));

        let lenient = session(&fetcher, true);
        let parser = PageParser::new(&lenient, ResourceKind::Anime, &1);
        assert_eq!(
            parser.field::<u32>("favorites", Err(anyhow::anyhow!("gone"))).unwrap(),
            None
        );
    }

    #[test]
    fn test_not_found_marker() {
        let fetcher = StubFetcher::new();
        let session = session(&fetcher, true);
        let parser = PageParser::new(&session, ResourceKind::Manga, &5);

        let missing = Html::parse_document(r#"<div class="badresult">No manga found</div>"#);
        assert!(parser.check_exists(&missing).unwrap_err().is_invalid());
        let present = Html::parse_document("<h1>Monster</h1>");
        assert!(parser.check_exists(&present).is_ok());
    }
}
