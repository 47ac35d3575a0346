//! Print page list
//!
//! Maps a publisher-supplied list of print page numbers onto CFIs so a
//! reading position can be shown as "page 42" and a page number can be
//! navigated to. Only entries whose href carries a CFI fragment take part
//! in address lookups.

mod parser;

use serde::Serialize;
use tracing::debug;

use crate::cfi::{compare, CanonicalAddress};
use crate::error::Result;

/// One print page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageListEntry {
    pub page: u32,
    /// Position of the page break, when the href carries a CFI fragment
    pub address: Option<CanonicalAddress>,
    pub href: String,
    /// Href part before `#`, present for CFI-bearing hrefs
    pub package_href: Option<String>,
}

/// Page list with lookups in both directions
#[derive(Debug, Clone, Default)]
pub struct PageList {
    entries: Vec<PageListEntry>,
    /// Indexes into `entries` of the entries that carry an address
    addressed: Vec<usize>,
    first_page: u32,
    last_page: u32,
    total_pages: u32,
}

impl PageList {
    /// Parse a nav document or an NCX, whichever `content` is
    pub fn parse(content: &str) -> Result<Self> {
        if parser::is_ncx(content) {
            Self::parse_ncx(content)
        } else {
            Self::parse_nav(content)
        }
    }

    /// Parse `<nav epub:type="page-list">` from an EPUB 3 nav document
    pub fn parse_nav(content: &str) -> Result<Self> {
        Ok(Self::from_entries(parser::nav_items(content)?))
    }

    /// Parse `pageList` from an EPUB 2 NCX
    pub fn parse_ncx(content: &str) -> Result<Self> {
        Ok(Self::from_entries(parser::ncx_items(content)?))
    }

    /// Build from `(label, href)` pairs. Non-numeric labels are skipped.
    pub fn from_entries<I, L, H>(items: I) -> Self
    where
        I: IntoIterator<Item = (L, H)>,
        L: AsRef<str>,
        H: AsRef<str>,
    {
        let entries: Vec<PageListEntry> = items
            .into_iter()
            .filter_map(|(label, href)| parser::entry_from_item(label.as_ref(), href.as_ref()))
            .collect();

        let addressed: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.address.is_some())
            .map(|(i, _)| i)
            .collect();

        let bounds: Vec<u32> = if addressed.is_empty() {
            entries.iter().map(|entry| entry.page).collect()
        } else {
            addressed.iter().map(|&i| entries[i].page).collect()
        };
        let first_page = bounds.first().copied().unwrap_or(0);
        let last_page = bounds.last().copied().unwrap_or(0);

        debug!(
            pages = entries.len(),
            addressed = addressed.len(),
            first_page,
            last_page,
            "Parsed page list"
        );

        Self {
            entries,
            addressed,
            first_page,
            last_page,
            total_pages: last_page.saturating_sub(first_page),
        }
    }

    pub fn entries(&self) -> &[PageListEntry] {
        &self.entries
    }

    /// Page numbers in list order
    pub fn pages(&self) -> Vec<u32> {
        self.entries.iter().map(|entry| entry.page).collect()
    }

    /// Addresses of the CFI-bearing entries in list order
    pub fn locations(&self) -> Vec<&CanonicalAddress> {
        self.addressed
            .iter()
            .filter_map(|&i| self.entries[i].address.as_ref())
            .collect()
    }

    pub fn first_page(&self) -> u32 {
        self.first_page
    }

    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Page holding `cfi`: the exact match, else the page whose break
    /// precedes it, else the first page. `None` without addressed pages.
    pub fn page_from_address(&self, cfi: &CanonicalAddress) -> Option<u32> {
        let locations = self.locations();
        if locations.is_empty() {
            return None;
        }

        let slot = match locations.binary_search_by(|entry| compare(entry, cfi)) {
            Ok(found) => found,
            Err(0) => 0,
            Err(insert_at) => insert_at - 1,
        };
        self.addressed.get(slot).map(|&i| self.entries[i].page)
    }

    /// Address of the break for page `page`
    pub fn address_from_page(&self, page: u32) -> Option<&CanonicalAddress> {
        self.entries
            .iter()
            .find(|entry| entry.page == page)
            .and_then(|entry| entry.address.as_ref())
    }

    /// `round(total_pages * percentage)`
    pub fn page_from_percentage(&self, percentage: f64) -> u32 {
        (self.total_pages as f64 * percentage).round().max(0.0) as u32
    }

    /// Fraction of the list up to `page`, rounded to three decimals
    pub fn percentage_from_page(&self, page: u32) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        let offset = page as f64 - self.first_page as f64;
        (offset / self.total_pages as f64 * 1000.0).round() / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfi::parse;

    fn addressed_list() -> PageList {
        PageList::from_entries(vec![
            ("i", "front.xhtml#pi"),
            ("1", "package.opf#epubcfi(/6/4!/4/2/1:0)"),
            ("2", "package.opf#epubcfi(/6/4!/4/8/1:20)"),
            ("3", "package.opf#epubcfi(/6/6!/4/2/1:0)"),
            ("4", "package.opf#epubcfi(/6/6!/4/10/1:0)"),
            ("5", "package.opf#epubcfi(/6/8!/4/2/1:0)"),
        ])
    }

    #[test]
    fn test_bounds() {
        let list = addressed_list();
        assert_eq!(list.pages(), vec![1, 2, 3, 4, 5]);
        assert_eq!(list.locations().len(), 5);
        assert_eq!(list.first_page(), 1);
        assert_eq!(list.last_page(), 5);
        assert_eq!(list.total_pages(), 4);
    }

    #[test]
    fn test_page_from_address() {
        let list = addressed_list();

        let exact = parse("epubcfi(/6/6!/4/2/1:0)").unwrap();
        assert_eq!(list.page_from_address(&exact), Some(3));

        let between = parse("epubcfi(/6/6!/4/4/1:7)").unwrap();
        assert_eq!(list.page_from_address(&between), Some(3));

        let before_all = parse("epubcfi(/6/2!/4/2/1:0)").unwrap();
        assert_eq!(list.page_from_address(&before_all), Some(1));

        let after_all = parse("epubcfi(/6/20!/4/2/1:0)").unwrap();
        assert_eq!(list.page_from_address(&after_all), Some(5));

        assert_eq!(PageList::default().page_from_address(&exact), None);
    }

    #[test]
    fn test_address_from_page() {
        let list = addressed_list();
        assert_eq!(
            list.address_from_page(2).unwrap().to_string(),
            "epubcfi(/6/4!/4/8/1:20)"
        );
        assert!(list.address_from_page(99).is_none());
    }

    #[test]
    fn test_percentages() {
        let list = PageList::from_entries(vec![
            ("1", "p.opf#epubcfi(/6/2!/4/2/1:0)"),
            ("101", "p.opf#epubcfi(/6/4!/4/2/1:0)"),
        ]);

        assert_eq!(list.total_pages(), 100);
        assert_eq!(list.page_from_percentage(0.5), 50);
        assert_eq!(list.percentage_from_page(51), 0.5);
        assert_eq!(list.percentage_from_page(34), 0.33);
    }

    #[test]
    fn test_single_page_has_zero_percentage() {
        let list = PageList::from_entries(vec![("7", "c.xhtml#p7")]);
        assert_eq!(list.total_pages(), 0);
        assert_eq!(list.percentage_from_page(7), 0.0);
        assert!(list.locations().is_empty());
        assert_eq!(list.first_page(), 7);
    }

    #[test]
    fn test_parse_dispatches_on_format() {
        let ncx = r#"<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/">
  <pageList>
    <pageTarget><navLabel><text>1</text></navLabel><content src="c1.xhtml#epubcfi(/6/2!/4/2/1:0)"/></pageTarget>
    <pageTarget><navLabel><text>2</text></navLabel><content src="c1.xhtml#epubcfi(/6/2!/4/4/1:0)"/></pageTarget>
  </pageList>
</ncx>"#;

        let list = PageList::parse(ncx).unwrap();
        assert_eq!(list.pages(), vec![1, 2]);
        assert_eq!(list.entries()[0].package_href.as_deref(), Some("c1.xhtml"));
        assert!(PageList::parse("<ncx").is_err());
    }

    #[test]
    fn test_parse_documents_with_doctype() {
        let ncx = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap/>
  <pageList>
    <pageTarget id="p1" type="normal" value="1"><navLabel><text>1</text></navLabel><content src="c1.xhtml#p1"/></pageTarget>
    <pageTarget id="p2" type="normal" value="2"><navLabel><text>2</text></navLabel><content src="c1.xhtml#p2"/></pageTarget>
  </pageList>
</ncx>"#;
        assert_eq!(PageList::parse(ncx).unwrap().pages(), vec![1, 2]);

        let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="page-list"><ol>
    <li><a href="package.opf#epubcfi(/6/4!/4/2/1:0)">1</a></li>
    <li><a href="package.opf#epubcfi(/6/4!/4/6/1:0)">2</a></li>
  </ol></nav>
</body>
</html>"#;
        let list = PageList::parse(nav).unwrap();
        assert_eq!(list.pages(), vec![1, 2]);
        assert_eq!(list.locations().len(), 2);
        assert_eq!(list.total_pages(), 1);
    }
}
