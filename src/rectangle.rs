use crate::lopdf_utils;
use crate::Error;
use lopdf::Object;
use serde::{Deserialize, Serialize};

/// US Letter in PDF points.
pub const LETTER_WIDTH: f64 = 612.0;
pub const LETTER_HEIGHT: f64 = 792.0;

/// A PDF rectangle as stored in `MediaBox`, `BBox` and friends:
/// lower-left corner `(x1, y1)`, upper-right corner `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    pub fn letter() -> Self {
        Rectangle {
            x1: 0.0,
            y1: 0.0,
            x2: LETTER_WIDTH,
            y2: LETTER_HEIGHT,
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Read a rectangle from a PDF array of 4 numbers.
    /// Corners are normalized, PDF allows any two opposite corners.
    pub fn from_object(obj: &Object) -> Result<Self, Error> {
        let values = obj.as_array()?;
        if values.len() != 4 {
            return Err(Error::InvalidSourceDocument(format!(
                "Rectangle should have 4 values, found {}.",
                values.len()
            )));
        }
        let a = lopdf_utils::as_number(&values[0])?;
        let b = lopdf_utils::as_number(&values[1])?;
        let c = lopdf_utils::as_number(&values[2])?;
        let d = lopdf_utils::as_number(&values[3])?;
        Ok(Rectangle {
            x1: a.min(c),
            y1: b.min(d),
            x2: a.max(c),
            y2: b.max(d),
        })
    }

    pub fn to_object(self) -> Object {
        Object::Array(vec![
            lopdf_utils::real(self.x1),
            lopdf_utils::real(self.y1),
            lopdf_utils::real(self.x2),
            lopdf_utils::real(self.y2),
        ])
    }
}

/// Where the signature is painted on the first page.
/// Origin is the bottom-left of the page, units are PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    /// Bottom-center of a Letter page, the position used by the first deployment.
    pub const ORIGINAL: Placement = Placement {
        x: 170.0,
        y: 150.0,
        width: 150.0,
        height: 30.0,
    };

    /// Taller box further up the page, used by the later template.
    pub const LOWER_LEFT: Placement = Placement {
        x: 200.0,
        y: 350.0,
        width: 140.0,
        height: 40.0,
    };

    pub fn to_rectangle(self) -> Rectangle {
        Rectangle {
            x1: self.x,
            y1: self.y,
            x2: self.x + self.width,
            y2: self.y + self.height,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|value| value.is_finite());
        if !finite || self.width <= 0.0 || self.height <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "Placement needs a positive, finite size. Got: {:?}",
                self
            )));
        }
        Ok(())
    }
}

impl Default for Placement {
    fn default() -> Self {
        Placement::ORIGINAL
    }
}
