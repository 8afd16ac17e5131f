//! Report field extraction.
//!
//! The decoder never parses report bytes itself. It asks a [`ReportFields`]
//! implementation for one axis value or for the asserted usages of one button
//! group. On Windows the HIDP parser answers
//! ([`crate::backends::windows::hidp::HidpDevice`]); everywhere else
//! [`BitLayout`] reads fields at explicit bit offsets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::caps::{AxisDescriptor, ButtonGroup};
use crate::error::ReportError;

pub trait ReportFields {
    /// Raw logical value of one value usage in `report`.
    fn value(&self, report: &[u8], axis: &AxisDescriptor) -> Result<i32, ReportError>;

    /// Usages of `group` that are asserted in `report`.
    fn pressed_usages(&self, report: &[u8], group: &ButtonGroup) -> Result<Vec<u16>, ReportError>;
}

impl<F: ReportFields + ?Sized> ReportFields for Box<F> {
    fn value(&self, report: &[u8], axis: &AxisDescriptor) -> Result<i32, ReportError> {
        (**self).value(report, axis)
    }

    fn pressed_usages(&self, report: &[u8], group: &ButtonGroup) -> Result<Vec<u16>, ReportError> {
        (**self).pressed_usages(report, group)
    }
}

/// Used when the transport cannot describe the report layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFields;

impl ReportFields for NoFields {
    fn value(&self, _: &[u8], _: &AxisDescriptor) -> Result<i32, ReportError> {
        Err(ReportError::NoLayout)
    }

    fn pressed_usages(&self, _: &[u8], _: &ButtonGroup) -> Result<Vec<u16>, ReportError> {
        Err(ReportError::NoLayout)
    }
}

/// A little-endian bit field inside a report body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField {
    pub bit_offset: usize,
    pub bit_size: u8,
    #[serde(default)]
    pub signed: bool,
}

impl BitField {
    pub fn unsigned(bit_offset: usize, bit_size: u8) -> Self {
        Self { bit_offset, bit_size, signed: false }
    }

    pub fn signed(bit_offset: usize, bit_size: u8) -> Self {
        Self { bit_offset, bit_size, signed: true }
    }

    fn read(&self, body: &[u8]) -> Result<i64, ReportError> {
        let size = usize::from(self.bit_size.clamp(1, 32));
        let end = self.bit_offset + size;
        let needed = end.div_ceil(8);
        if needed > body.len() {
            return Err(ReportError::TooShort { needed, actual: body.len() });
        }
        let mut v: i64 = 0;
        for i in 0..size {
            let bit = self.bit_offset + i;
            let byte = body
                .get(bit / 8)
                .copied()
                .ok_or(ReportError::TooShort { needed, actual: body.len() })?;
            v |= i64::from((byte >> (bit % 8)) & 1) << i;
        }
        if self.signed && (v >> (size - 1)) & 1 == 1 {
            v -= 1i64 << size;
        }
        Ok(v)
    }
}

/// Explicit field offsets keyed by report data index.
///
/// With a report id set, the first report byte must equal it and offsets are
/// measured from the byte after it. Button groups are read as one bit per
/// usage, starting at the field registered for the group's first data index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitLayout {
    report_id: Option<u8>,
    fields: BTreeMap<u16, BitField>,
}

impl BitLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report_id(report_id: u8) -> Self {
        Self { report_id: Some(report_id), fields: BTreeMap::new() }
    }

    #[must_use]
    pub fn field(mut self, data_index: u16, field: BitField) -> Self {
        self.fields.insert(data_index, field);
        self
    }

    pub fn insert(&mut self, data_index: u16, field: BitField) {
        self.fields.insert(data_index, field);
    }

    fn body<'a>(&self, report: &'a [u8]) -> Result<&'a [u8], ReportError> {
        match self.report_id {
            None => Ok(report),
            Some(expected) => match report.split_first() {
                Some((&id, rest)) if id == expected => Ok(rest),
                Some((&id, _)) => Err(ReportError::ReportIdMismatch { expected, actual: Some(id) }),
                None => Err(ReportError::ReportIdMismatch { expected, actual: None }),
            },
        }
    }
}

impl ReportFields for BitLayout {
    fn value(&self, report: &[u8], axis: &AxisDescriptor) -> Result<i32, ReportError> {
        let body = self.body(report)?;
        let field = self
            .fields
            .get(&axis.data_index)
            .ok_or(ReportError::UnknownDataIndex(axis.data_index))?;
        let v = field.read(body)?;
        Ok(v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    fn pressed_usages(&self, report: &[u8], group: &ButtonGroup) -> Result<Vec<u16>, ReportError> {
        let body = self.body(report)?;
        let first = group.range.data_index_min;
        let start = self
            .fields
            .get(&first)
            .ok_or(ReportError::UnknownDataIndex(first))?;
        let mut out = Vec::new();
        for (i, usage) in (group.range.usage_min..=group.range.usage_max).enumerate() {
            let bit = BitField::unsigned(start.bit_offset + i, 1);
            if bit.read(body)? != 0 {
                out.push(usage);
            }
        }
        Ok(out)
    }
}
