//! Streaming event source over quick-xml.
//!
//! Drives a [SaxHandler] with lowercased tag names, insertion-ordered
//! attributes and unescaped text. HTML void elements synthesize their own
//! close event and are marked self-closing, whether the input writes
//! `<br>`, `<br/>` or `<br></br>`. Comments, processing instructions and
//! doctypes are skipped. Tag balance is not checked here; that is the
//! handler's concern.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::tag::Tag;
use super::utils::is_inline_empty_tag;

use crate::error::Error;

pub trait SaxHandler {
    fn on_open_tag(&mut self, tag: Tag) -> Result<(), Error>;
    fn on_close_tag(&mut self, tag_name: &str) -> Result<(), Error>;
    fn on_text(&mut self, text: &str) -> Result<(), Error>;
}

pub fn run<H: SaxHandler>(html: &str, handler: &mut H) -> Result<(), Error> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    loop {
        match reader.read_event()? {
            Event::Start(event) => {
                let tag = tag_from_event(&event, false)?;
                if tag.is_self_closing() {
                    let name = tag.name().to_string();
                    handler.on_open_tag(tag)?;
                    handler.on_close_tag(&name)?;
                } else {
                    handler.on_open_tag(tag)?;
                }
            }
            Event::Empty(event) => {
                let tag = tag_from_event(&event, true)?;
                let name = tag.name().to_string();
                handler.on_open_tag(tag)?;
                handler.on_close_tag(&name)?;
            }
            Event::End(event) => {
                let name = String::from_utf8_lossy(event.name().as_ref()).to_lowercase();
                if is_inline_empty_tag(&name) {
                    // already closed at its open event
                    continue;
                }
                handler.on_close_tag(&name)?;
            }
            Event::Text(event) => {
                let text = match event.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(event.as_ref()).into_owned(),
                };
                handler.on_text(&text)?;
            }
            Event::CData(event) => {
                handler.on_text(&String::from_utf8_lossy(event.as_ref()))?;
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }
    Ok(())
}

fn tag_from_event(event: &BytesStart, self_closed: bool) -> Result<Tag, Error> {
    let name = String::from_utf8_lossy(event.name().as_ref()).to_lowercase();
    let self_closing = self_closed || is_inline_empty_tag(&name);
    let tag = Tag::new(&name).set_self_closing(self_closing);

    for attribute in event.attributes() {
        let attribute =
            attribute.map_err(|e| Error::MalformedInput(format!("bad attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_lowercase();
        let value = match attribute.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
        };
        tag.set_attr(&key, &value);
    }
    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl SaxHandler for Recorder {
        fn on_open_tag(&mut self, tag: Tag) -> Result<(), Error> {
            let attrs: Vec<String> = tag
                .attributes()
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            self.events.push(format!("open:{}[{}]", tag.name(), attrs.join(",")));
            Ok(())
        }

        fn on_close_tag(&mut self, tag_name: &str) -> Result<(), Error> {
            self.events.push(format!("close:{}", tag_name));
            Ok(())
        }

        fn on_text(&mut self, text: &str) -> Result<(), Error> {
            self.events.push(format!("text:{}", text));
            Ok(())
        }
    }

    #[test]
    fn events_in_document_order() {
        let mut recorder = Recorder::default();
        run("<p>a<b>c</b></p>", &mut recorder).unwrap();
        assert_eq!(
            recorder.events,
            vec!["open:p[]", "text:a", "open:b[]", "text:c", "close:b", "close:p"]
        );
    }

    #[test]
    fn void_elements_close_themselves() {
        let mut recorder = Recorder::default();
        run("<p>a<img src=\"x.png\"/>b</p>", &mut recorder).unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "open:p[]",
                "text:a",
                "open:img[src=x.png]",
                "close:img",
                "text:b",
                "close:p"
            ]
        );
    }

    #[test]
    fn entities_are_unescaped() {
        let mut recorder = Recorder::default();
        run("<p>a &#38; b &lt;c&gt;</p>", &mut recorder).unwrap();
        assert_eq!(recorder.events[1], "text:a & b <c>");
    }

    #[test]
    fn single_quoted_attributes() {
        let mut recorder = Recorder::default();
        run("<p data-mw='{\"parts\":[]}'></p>", &mut recorder).unwrap();
        assert_eq!(recorder.events[0], "open:p[data-mw={\"parts\":[]}]");
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let mut recorder = Recorder::default();
        run("<!DOCTYPE html><p><!-- hi -->a</p>", &mut recorder).unwrap();
        assert_eq!(recorder.events, vec!["open:p[]", "text:a", "close:p"]);
    }
}
