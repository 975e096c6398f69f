//! Coordinate tables for each certificate variant.
//!
//! Coordinates are PDF user-space points with the origin at the bottom-left
//! of the page. A table is tied to the exact artwork of its template; moving
//! anything in the template means bumping `version` and the numbers here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::record::Field;

/// Certificate variant, each with its own template and table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Sustainable-mobility allowance certificate for private employers.
    Limited,
    /// Public-sector cycling commute certificate.
    Public,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Limited, Variant::Public];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Limited => "limited",
            Variant::Public => "public",
        }
    }

    pub fn layout(&self) -> &'static FieldLayout {
        match self {
            Variant::Limited => &LIMITED_LAYOUT,
            Variant::Public => &PUBLIC_LAYOUT,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "limited" => Ok(Variant::Limited),
            "public" => Ok(Variant::Public),
            other => Err(format!("unknown certificate variant '{other}'")),
        }
    }
}

/// Bounding constraints for wrapped-box fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapBox {
    pub max_width: f32,
    pub line_height: f32,
}

/// Where and how large a piece of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// `None` draws a single line at the anchor.
    pub wrap: Option<WrapBox>,
}

impl Placement {
    pub const fn line(page: usize, x: f32, y: f32, size: f32) -> Self {
        Self {
            page,
            x,
            y,
            size,
            wrap: None,
        }
    }

    pub const fn wrapped(self, max_width: f32, line_height: f32) -> Self {
        Self {
            wrap: Some(WrapBox {
                max_width,
                line_height,
            }),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldEntry {
    pub field: Field,
    pub at: Placement,
}

/// The mutually exclusive mobility marks plus the date drawn with "yes".
#[derive(Debug, Clone, Copy)]
pub struct MobilityMarks {
    pub glyph: &'static str,
    pub no: Placement,
    pub yes: Placement,
    pub date: Placement,
}

#[derive(Debug)]
pub struct FieldLayout {
    pub variant: Variant,
    pub version: u32,
    /// Template identifier handed to the template source.
    pub template_id: &'static str,
    pub fields: &'static [FieldEntry],
    /// Derived issue date, never taken from the record.
    pub issue_date: Placement,
    pub mobility: MobilityMarks,
}

impl FieldLayout {
    /// Every placement in the table, marks included.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> + '_ {
        self.fields
            .iter()
            .map(|entry| &entry.at)
            .chain([
                &self.issue_date,
                &self.mobility.no,
                &self.mobility.yes,
                &self.mobility.date,
            ])
    }

    /// Highest page index the table draws on.
    pub fn last_page(&self) -> usize {
        self.placements().map(|p| p.page).max().unwrap_or(0)
    }

    pub fn entry(&self, field: Field) -> Option<&FieldEntry> {
        self.fields.iter().find(|entry| entry.field == field)
    }
}

const fn entry(field: Field, at: Placement) -> FieldEntry {
    FieldEntry { field, at }
}

const MARK: &str = "x";

pub static LIMITED_LAYOUT: FieldLayout = FieldLayout {
    variant: Variant::Limited,
    version: 2,
    template_id: "certificate_limited.pdf",
    fields: &[
        // Room for three name lines above the address block.
        entry(
            Field::Name,
            Placement::line(0, 150.0, 720.0, 11.0).wrapped(390.0, 13.0),
        ),
        entry(
            Field::Address,
            Placement::line(0, 150.0, 670.0, 10.0).wrapped(380.0, 13.0),
        ),
        entry(
            Field::Employer,
            Placement::line(0, 150.0, 600.0, 10.0).wrapped(380.0, 13.0),
        ),
        entry(Field::Distance, Placement::line(0, 455.0, 540.0, 11.0)),
        entry(Field::Days, Placement::line(0, 205.0, 510.0, 11.0)),
        entry(Field::Year, Placement::line(0, 455.0, 510.0, 11.0)),
        // Flows down towards the issue date, six lines at most.
        entry(
            Field::Location,
            Placement::line(0, 385.0, 215.0, 11.0).wrapped(200.0, 13.0),
        ),
    ],
    issue_date: Placement::line(0, 385.0, 130.0, 11.0),
    mobility: MobilityMarks {
        glyph: MARK,
        yes: Placement::line(0, 72.0, 450.0, 11.0),
        date: Placement::line(0, 230.0, 450.0, 10.0),
        no: Placement::line(0, 72.0, 432.0, 11.0),
    },
};

pub static PUBLIC_LAYOUT: FieldLayout = FieldLayout {
    variant: Variant::Public,
    version: 1,
    template_id: "certificate_public.pdf",
    // Name, rank and location stay single-line to match the printed form.
    fields: &[
        entry(Field::Name, Placement::line(0, 420.0, 494.0, 11.0)),
        entry(Field::Days, Placement::line(0, 405.0, 290.0, 11.0)),
        entry(Field::Year, Placement::line(0, 517.0, 290.0, 11.0)),
        entry(Field::Location, Placement::line(0, 385.0, 163.0, 11.0)),
        // Identity block, repeated in the left column.
        entry(Field::Name, Placement::line(0, 79.0, 482.0, 10.0)),
        entry(
            Field::Ministry,
            Placement::line(0, 79.0, 456.0, 10.0).wrapped(256.0, 13.0),
        ),
        entry(Field::Rank, Placement::line(0, 79.0, 417.0, 10.0)),
        entry(
            Field::HomeAddress,
            Placement::line(0, 79.0, 391.0, 10.0).wrapped(256.0, 13.0),
        ),
        entry(
            Field::WorkAddress,
            Placement::line(0, 79.0, 352.0, 10.0).wrapped(256.0, 13.0),
        ),
    ],
    issue_date: Placement::line(0, 385.0, 150.0, 11.0),
    mobility: MobilityMarks {
        glyph: MARK,
        yes: Placement::line(0, 94.0, 284.0, 11.0),
        date: Placement::line(0, 230.0, 284.0, 10.0),
        no: Placement::line(0, 94.0, 271.0, 11.0),
    },
};
