use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::error::FeedError;
use crate::status::Project;

pub const CONTENT_TYPE: &str = "application/xml";

/// Writes projects as a CCTray XML document.
///
/// The output depends only on the projects and their order. Attribute values
/// are escaped, so any pipeline or stage name produces a well-formed document.
pub fn encode<W: Write>(projects: &[Project], out: W) -> Result<W, FeedError> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("Projects")))?;

    for project in projects {
        let last_build_time = project.formatted_build_time();

        let mut element = BytesStart::new("Project");
        element.push_attribute(("name", project.name.as_str()));
        element.push_attribute(("activity", project.activity.as_str()));
        element.push_attribute(("lastBuildStatus", project.last_build_status.as_str()));
        element.push_attribute(("lastBuildTime", last_build_time.as_str()));

        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Projects")))?;

    let mut out = writer.into_inner();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(out)
}

/// Encodes the whole feed into memory, ready for a single atomic write.
pub fn encode_to_vec(projects: &[Project]) -> Result<Vec<u8>, FeedError> {
    encode(projects, Vec::new())
}
