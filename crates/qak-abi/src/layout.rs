//! Record layouts shared with the engine.
//!
//! Each record type is declared once as a table of fields. Decoders and
//! encoders address fields only through these tables, so a layout change is
//! an edit here plus a bump of [`ABI_VERSION`].
//!
//! ```text
//! string      (8)   data:u32@0  length:u32@4
//! span        (24)  text:string@0  start:u32@8  end:u32@12  start_line:u32@16  end_line:u32@20
//! token       (28)  kind:u32@0  span:span@4
//! diagnostic  (32)  message:string@0  span:span@8
//! source      (16)  data:string@0  file_name:string@8
//! ```

use crate::error::{AbiError, AbiResult};

/// Version of the record layouts below.
pub const ABI_VERSION: u32 = 1;

/// What a field holds, which fixes its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U32,
    String,
    Span,
}

impl FieldKind {
    pub const fn width(self) -> u32 {
        match self {
            Self::U32 => 4,
            Self::String => string::LAYOUT_SIZE,
            Self::Span => span::LAYOUT_SIZE,
        }
    }
}

/// One field of a record: name, byte offset, kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: u32,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, offset: u32, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    pub const fn width(&self) -> u32 {
        self.kind.width()
    }

    /// Absolute address of this field in a record starting at `base`.
    pub fn at(&self, base: u32) -> AbiResult<u32> {
        base.checked_add(self.offset)
            .ok_or(AbiError::OutOfBounds {
                offset: base,
                len: self.offset + self.width(),
                memory_size: u32::MAX,
            })
    }
}

/// A fixed-size packed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub name: &'static str,
    pub size: u32,
    pub fields: &'static [Field],
}

impl RecordLayout {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields are contiguous, start at 0 and fill exactly `size` bytes.
    pub fn is_packed(&self) -> bool {
        let mut expected = 0;
        for field in self.fields {
            if field.offset != expected {
                return false;
            }
            expected += field.width();
        }
        expected == self.size
    }
}

pub mod string {
    use super::{Field, FieldKind, RecordLayout};

    pub(super) const LAYOUT_SIZE: u32 = 8;

    pub const DATA: Field = Field::new("data", 0, FieldKind::U32);
    pub const LENGTH: Field = Field::new("length", 4, FieldKind::U32);

    pub const LAYOUT: RecordLayout = RecordLayout {
        name: "string",
        size: LAYOUT_SIZE,
        fields: &[DATA, LENGTH],
    };
}

pub mod span {
    use super::{Field, FieldKind, RecordLayout};

    pub(super) const LAYOUT_SIZE: u32 = 24;

    pub const TEXT: Field = Field::new("text", 0, FieldKind::String);
    pub const START: Field = Field::new("start", 8, FieldKind::U32);
    pub const END: Field = Field::new("end", 12, FieldKind::U32);
    pub const START_LINE: Field = Field::new("start_line", 16, FieldKind::U32);
    pub const END_LINE: Field = Field::new("end_line", 20, FieldKind::U32);

    pub const LAYOUT: RecordLayout = RecordLayout {
        name: "span",
        size: LAYOUT_SIZE,
        fields: &[TEXT, START, END, START_LINE, END_LINE],
    };
}

pub mod token {
    use super::{Field, FieldKind, RecordLayout};

    pub const KIND: Field = Field::new("kind", 0, FieldKind::U32);
    pub const SPAN: Field = Field::new("span", 4, FieldKind::Span);

    pub const LAYOUT: RecordLayout = RecordLayout {
        name: "token",
        size: 28,
        fields: &[KIND, SPAN],
    };
}

pub mod diagnostic {
    use super::{Field, FieldKind, RecordLayout};

    pub const MESSAGE: Field = Field::new("message", 0, FieldKind::String);
    pub const SPAN: Field = Field::new("span", 8, FieldKind::Span);

    pub const LAYOUT: RecordLayout = RecordLayout {
        name: "diagnostic",
        size: 32,
        fields: &[MESSAGE, SPAN],
    };
}

pub mod source {
    use super::{Field, FieldKind, RecordLayout};

    pub const DATA: Field = Field::new("data", 0, FieldKind::String);
    pub const FILE_NAME: Field = Field::new("file_name", 8, FieldKind::String);

    pub const LAYOUT: RecordLayout = RecordLayout {
        name: "source",
        size: 16,
        fields: &[DATA, FILE_NAME],
    };
}

/// Every record layout of this ABI version.
pub const ALL_LAYOUTS: [&RecordLayout; 5] = [
    &string::LAYOUT,
    &span::LAYOUT,
    &token::LAYOUT,
    &diagnostic::LAYOUT,
    &source::LAYOUT,
];
