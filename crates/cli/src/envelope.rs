//! Control envelope read from stdin.
//!
//! The scheduler hands over the input's configuration as XML:
//!
//! ```text
//! <input>
//!   <checkpoint_dir>/var/lib/meter</checkpoint_dir>
//!   <configuration>
//!     <stanza name="powerclub://home">
//!       <param name="email">me@example.com</param>
//!       <param name="password">secret</param>
//!     </stanza>
//!   </configuration>
//! </input>
//! ```
//!
//! Only the first stanza is read. For `--validate-arguments` the scheduler
//! sends the same params inside `<items><item name="..">` instead; an `item`
//! is read like a stanza.

use meter_ingest_core::{ConfigError, ConfigOverrides};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::PathBuf;

#[derive(Debug)]
enum Target {
    Param(String),
    CheckpointDir,
}

/// Parses the envelope into configuration overrides.
///
/// Blank input yields no overrides; unknown params are ignored.
///
/// # Errors
/// Returns [`ConfigError::Envelope`] if the XML is malformed.
pub fn parse(input: &str) -> Result<ConfigOverrides, ConfigError> {
    let mut overrides = ConfigOverrides::default();
    if input.trim().is_empty() {
        return Ok(overrides);
    }

    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stanzas_seen = 0usize;
    let mut in_stanza = false;
    let mut target: Option<Target> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(envelope_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"stanza" | b"item" => {
                    stanzas_seen += 1;
                    in_stanza = stanzas_seen == 1;
                    if in_stanza {
                        if let Some(name) = attribute(&e, "name")? {
                            tracing::debug!(stanza = %name, "Envelope stanza");
                        }
                    }
                }
                b"param" if in_stanza => {
                    target = attribute(&e, "name")?.map(Target::Param);
                    text.clear();
                }
                b"checkpoint_dir" => {
                    target = Some(Target::CheckpointDir);
                    text.clear();
                }
                _ => {}
            },
            Event::Text(t) if target.is_some() => {
                text.push_str(&t.unescape().map_err(envelope_error)?);
            }
            Event::CData(c) if target.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) => match e.name().as_ref() {
                b"stanza" | b"item" => in_stanza = false,
                b"param" | b"checkpoint_dir" => {
                    if let Some(t) = target.take() {
                        assign(&mut overrides, t, std::mem::take(&mut text));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(overrides)
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, ConfigError> {
    let Some(attr) = element.try_get_attribute(name).map_err(envelope_error)? else {
        return Ok(None);
    };
    let value = attr.unescape_value().map_err(envelope_error)?;
    Ok(Some(value.into_owned()))
}

fn assign(overrides: &mut ConfigOverrides, target: Target, value: String) {
    if value.is_empty() {
        return;
    }
    match target {
        Target::CheckpointDir => overrides.checkpoint_dir = Some(PathBuf::from(value)),
        Target::Param(name) => match name.as_str() {
            "email" => overrides.email = Some(value),
            "password" => overrides.password = Some(value),
            "timezone" => overrides.timezone = Some(value),
            other => tracing::debug!(param = %other, "Ignoring envelope param"),
        },
    }
}

fn envelope_error(err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Envelope(err.to_string())
}
