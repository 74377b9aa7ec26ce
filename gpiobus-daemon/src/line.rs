use gpiobus_core::LineInfo;

/// One line of a chip, created on first access.
///
/// Only valid while the parent chip's handle is open; the owning
/// [`crate::chip::ChipObject`] releases its lines before closing the handle.
#[derive(Debug)]
pub struct LineObject {
    offset: u32,
    info: LineInfo,
}

impl LineObject {
    pub(crate) fn new(info: LineInfo) -> Self {
        Self {
            offset: info.offset,
            info,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn info(&self) -> &LineInfo {
        &self.info
    }

    pub(crate) fn release(self) {
        tracing::debug!(offset = self.offset, name = %self.info.name, "destroying line object");
    }
}
