use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use thiserror::Error;

use super::types::FeedSnapshot;

const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write RSS document: {0}")]
    Write(#[from] std::io::Error),

    #[error("Generated RSS contains invalid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a snapshot as an RSS 2.0 document.
///
/// The channel links back to the subscription URL. Each entry becomes an
/// `<item>`; empty optional fields are left out, and the entry's full content
/// goes into `content:encoded`.
pub fn export_rss(snapshot: &FeedSnapshot) -> Result<String, ExportError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:content", CONTENT_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &snapshot.title)?;
    write_text_element(&mut writer, "link", &snapshot.url)?;
    write_text_element(&mut writer, "description", &snapshot.description)?;
    write_text_element(&mut writer, "lastBuildDate", &snapshot.fetched_at.to_rfc2822())?;

    for entry in &snapshot.entries {
        writer.write_event(Event::Start(BytesStart::new("item")))?;

        write_text_element(&mut writer, "title", &entry.title)?;
        if let Some(link) = entry.link.as_deref().filter(|l| !l.is_empty()) {
            write_text_element(&mut writer, "link", link)?;
        }
        if !entry.summary.is_empty() {
            write_text_element(&mut writer, "description", &entry.summary)?;
        }
        if !entry.content.is_empty() {
            write_text_element(&mut writer, "content:encoded", &entry.content)?;
        }
        if let Some(published) = entry.published {
            write_text_element(&mut writer, "pubDate", &published.to_rfc2822())?;
        }
        if !entry.guid.is_empty() {
            let mut guid = BytesStart::new("guid");
            guid.push_attribute(("isPermaLink", "false"));
            writer.write_event(Event::Start(guid))?;
            writer.write_event(Event::Text(BytesText::new(&entry.guid)))?;
            writer.write_event(Event::End(BytesEnd::new("guid")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> std::io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
