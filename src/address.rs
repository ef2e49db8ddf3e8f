//! Logical-to-physical page/column translation.
//
// Controller RAM is often wider than the visible panel, shifted vertically,
// or (on one panel family) split into two interleaved banks: even logical
// pages occupy the first half of RAM, odd pages the second. All of that is a
// pure function of the configuration, kept in one place so the full-refresh,
// partial-refresh and write-through paths can never disagree about where a
// page lives.

/// Pure page/column address translator.
///
/// Both mappings are infallible; callers clip to panel bounds first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressMap {
    /// Added to every column (panel glass narrower than RAM).
    pub column_offset: u8,
    /// Added to every page, after the interleave remap.
    pub page_offset: u8,
    /// Total page count; the interleave remap splits it in half.
    pub pages: u8,
    /// Two-bank interleaved RAM layout.
    pub interleaved: bool,
}

impl AddressMap {
    /// Identity mapping over `pages` pages.
    pub const fn linear(pages: u8) -> Self {
        Self {
            column_offset: 0,
            page_offset: 0,
            pages,
            interleaved: false,
        }
    }

    /// Physical page-select value for a logical page index.
    pub fn physical_page(&self, page: u8) -> u8 {
        let p = if self.interleaved {
            if page % 2 == 0 {
                page / 2
            } else {
                (page - 1) / 2 + self.pages / 2
            }
        } else {
            page
        };
        p.wrapping_add(self.page_offset)
    }

    /// Physical column value for a logical column index.
    pub fn physical_column(&self, column: u8) -> u8 {
        column.wrapping_add(self.column_offset)
    }
}
