//! Draws an input record onto a decoded template.

use chrono::NaiveDate;
use log::{debug, warn};

use super::common::format_issue_date;
use super::document::{Color, DocumentModel, FontHandle, StandardFont, TextStyle};
use super::layout::{FieldLayout, Placement};
use super::record::{InputRecord, Mobility};
use super::AttestationError;

/// Which side of the mobility branch was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobilityBranch {
    No,
    Yes { with_date: bool },
}

/// What a render put on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    /// Names of the record fields drawn, in table order.
    pub fields: Vec<&'static str>,
    pub mobility: MobilityBranch,
}

/// Stateless overlay renderer parameterized by a variant's layout table.
pub struct OverlayRenderer<'a> {
    layout: &'a FieldLayout,
}

impl<'a> OverlayRenderer<'a> {
    pub fn new(layout: &'a FieldLayout) -> Self {
        Self { layout }
    }

    /// Draw every field of `record` present in the table, the issue date and
    /// exactly one mobility mark.
    ///
    /// Pages are checked before anything is drawn, so a template that does not
    /// match the table fails without touching the document.
    pub fn render(
        &self,
        model: &mut DocumentModel,
        record: &InputRecord,
        issued_on: NaiveDate,
    ) -> Result<RenderSummary, AttestationError> {
        for placement in self.layout.placements() {
            model.get_page(placement.page)?;
        }

        let font = model.embed_font(StandardFont::HelveticaBold);
        let mut fields = Vec::with_capacity(self.layout.fields.len());

        for entry in self.layout.fields {
            let Some(value) = record.value(entry.field) else {
                continue;
            };
            debug!("drawing field '{}'", entry.field.as_str());
            draw(model, &font, &entry.at, &value)?;
            fields.push(entry.field.as_str());
        }

        draw(
            model,
            &font,
            &self.layout.issue_date,
            &format_issue_date(issued_on),
        )?;

        let marks = &self.layout.mobility;
        let mobility = match &record.mobility {
            Mobility::No => {
                draw(model, &font, &marks.no, marks.glyph)?;
                MobilityBranch::No
            }
            Mobility::Yes { date } => {
                if date.is_empty() {
                    warn!("mobility marked yes without a date; drawing an empty date");
                }
                draw(model, &font, &marks.yes, marks.glyph)?;
                draw(model, &font, &marks.date, date)?;
                MobilityBranch::Yes {
                    with_date: !date.is_empty(),
                }
            }
        };

        Ok(RenderSummary { fields, mobility })
    }
}

fn draw(
    model: &mut DocumentModel,
    font: &FontHandle,
    at: &Placement,
    text: &str,
) -> Result<(), AttestationError> {
    let page = model.get_page(at.page)?;
    let style = TextStyle {
        font,
        size: at.size,
        color: Color::BLACK,
        wrap: at.wrap,
    };
    model.draw_text(page, text, at.x, at.y, &style)
}
