//! Parsers for the two XML API v2 responses the client uses.

use std::collections::{HashMap, HashSet};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use gameshelf_core::{CatalogError, GameId};

/// Parse a `/collection` response into owned object ids, first-seen order.
///
/// ```xml
/// <items totalitems="2">
///   <item objecttype="thing" objectid="13" subtype="boardgame">...</item>
/// </items>
/// ```
pub fn parse_collection(xml: &str) -> Result<Vec<GameId>, CatalogError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    let mut errors = ErrorScan::default();
    loop {
        let event = reader.read_event().map_err(xml_err)?;
        errors.observe(&event)?;
        match &event {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"item" => {
                if let Some(id) = attr(e, "objectid")?.as_deref().and_then(parse_id)
                    && seen.insert(id)
                {
                    ids.push(id);
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    errors.finish()?;
    Ok(ids)
}

/// Parse a `/thing` response into primary names keyed by id. Items without
/// a primary name are left out.
///
/// ```xml
/// <items>
///   <item type="boardgame" id="13">
///     <name type="primary" sortindex="1" value="CATAN"/>
///     <name type="alternate" sortindex="1" value="Catan"/>
///   </item>
/// </items>
/// ```
pub fn parse_things(xml: &str) -> Result<HashMap<GameId, String>, CatalogError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut names = HashMap::new();
    let mut current: Option<GameId> = None;
    let mut errors = ErrorScan::default();
    loop {
        let event = reader.read_event().map_err(xml_err)?;
        errors.observe(&event)?;
        match &event {
            Event::Start(e) if e.name().as_ref() == b"item" => {
                current = attr(e, "id")?.as_deref().and_then(parse_id);
            },
            Event::End(e) if e.name().as_ref() == b"item" => current = None,
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"name" => {
                let Some(id) = current else { continue };
                if names.contains_key(&id) || attr(e, "type")?.as_deref() != Some("primary") {
                    continue;
                }
                if let Some(value) = attr(e, "value")?
                    && !value.is_empty()
                {
                    names.insert(id, value);
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    errors.finish()?;
    Ok(names)
}

/// Picks up `<errors><error><message>..</message></error></errors>` bodies,
/// which BGG serves with a 200 status.
#[derive(Default)]
struct ErrorScan {
    in_message: bool,
    message: Option<String>,
}

impl ErrorScan {
    fn observe(&mut self, event: &Event<'_>) -> Result<(), CatalogError> {
        match event {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"error" => {
                if let Some(message) = attr(e, "message")? {
                    self.message = Some(message);
                } else if self.message.is_none() {
                    self.message = Some("unspecified error".to_string());
                }
            },
            Event::Start(e) if e.name().as_ref() == b"message" && self.message.is_some() => {
                self.in_message = true;
            },
            Event::End(e) if e.name().as_ref() == b"message" => self.in_message = false,
            Event::Text(t) if self.in_message => {
                self.message = Some(t.unescape().map_err(xml_err)?.trim().to_string());
            },
            _ => {},
        }
        Ok(())
    }

    fn finish(self) -> Result<(), CatalogError> {
        match self.message {
            Some(message) => Err(CatalogError::Rejected(message)),
            None => Ok(()),
        }
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, CatalogError> {
    match e.try_get_attribute(name).map_err(xml_err)? {
        Some(a) => Ok(Some(a.unescape_value().map_err(xml_err)?.into_owned())),
        None => Ok(None),
    }
}

fn parse_id(raw: &str) -> Option<GameId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn xml_err(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Xml(e.to_string())
}
