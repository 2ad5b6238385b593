//! XML rendering of a [`StatisticsReport`].

use std::fmt::Display;
use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{AppError, AppResult};
use crate::models::StatisticsReport;

pub const CONTENT_TYPE: &str = "text/xml; encoding='UTF-8'";

const ROOT_ELEMENT: &str = "dspace-repository-statistics";
const STATISTIC_ELEMENT: &str = "statistic";
const NAME_ATTRIBUTE: &str = "name";
const DATE_ATTRIBUTE: &str = "date";

fn document_error(e: impl Display) -> AppError {
    AppError::Document(e.to_string())
}

/// Renders the complete document into memory. Nothing is sent until the
/// whole report is known to be good.
pub fn render_xml(report: &StatisticsReport) -> AppResult<String> {
    let date = report.formatted_date()?;
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(document_error)?;

    let mut root = BytesStart::new(ROOT_ELEMENT);
    root.push_attribute((DATE_ATTRIBUTE, date.as_str()));
    writer
        .write_event(Event::Start(root))
        .map_err(document_error)?;

    for statistic in &report.statistics {
        let mut element = BytesStart::new(STATISTIC_ELEMENT);
        element.push_attribute((NAME_ATTRIBUTE, statistic.name));
        let value = statistic.value.to_string();

        writer
            .write_event(Event::Start(element))
            .map_err(document_error)?;
        writer
            .write_event(Event::Text(BytesText::new(&value)))
            .map_err(document_error)?;
        writer
            .write_event(Event::End(BytesEnd::new(STATISTIC_ELEMENT)))
            .map_err(document_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))
        .map_err(document_error)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(document_error)
}
