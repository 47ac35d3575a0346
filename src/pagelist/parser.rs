//! Page-list extraction from navigation documents

use tracing::warn;

use crate::cfi::{is_cfi_string, parse};
use crate::error::Result;
use crate::tree::parse_xml;

use super::PageListEntry;

/// Raw `(label, href)` pairs from an EPUB 3 nav document's
/// `<nav epub:type="page-list">`
pub(crate) fn nav_items(content: &str) -> Result<Vec<(String, String)>> {
    let doc = parse_xml(content)?;
    let mut items = Vec::new();

    let page_list = doc.descendants().find(|node| {
        node.tag_name().name() == "nav"
            && node.attributes().any(|a| {
                a.name() == "type" && a.value().split_whitespace().any(|t| t == "page-list")
            })
    });

    let Some(nav) = page_list else {
        return Ok(items);
    };

    for li in nav.descendants().filter(|n| n.tag_name().name() == "li") {
        let Some(anchor) = li.children().find(|n| n.tag_name().name() == "a") else {
            continue;
        };
        let href = anchor.attribute("href").unwrap_or("").to_string();
        items.push((get_text_content(&anchor), href));
    }

    Ok(items)
}

/// Raw `(label, href)` pairs from an NCX `pageList`
pub(crate) fn ncx_items(content: &str) -> Result<Vec<(String, String)>> {
    let doc = parse_xml(content)?;
    let mut items = Vec::new();

    for target in doc
        .descendants()
        .filter(|n| n.tag_name().name() == "pageTarget")
    {
        let mut label = String::new();
        let mut href = String::new();

        for child in target.children() {
            match child.tag_name().name() {
                "navLabel" => {
                    // Find text element inside navLabel
                    for sub in child.descendants() {
                        if sub.tag_name().name() == "text" {
                            if let Some(text) = sub.text() {
                                label = text.trim().to_string();
                            }
                        }
                    }
                }
                "content" => {
                    href = child.attribute("src").unwrap_or("").to_string();
                }
                _ => {}
            }
        }

        items.push((label, href));
    }

    Ok(items)
}

/// Whether a document is an NCX rather than a nav document
pub(crate) fn is_ncx(content: &str) -> bool {
    content.contains("<ncx")
}

/// Get text content from a node recursively
fn get_text_content(node: &roxmltree::Node) -> String {
    let mut text = String::new();
    for child in node.children() {
        if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t);
            }
        } else {
            text.push_str(&get_text_content(&child));
        }
    }
    text
}

/// Turn a raw item into an entry. Labels that are not page numbers
/// (front-matter roman numerals and the like) yield `None`.
pub(crate) fn entry_from_item(label: &str, href: &str) -> Option<PageListEntry> {
    let page: u32 = label.trim().parse().ok()?;

    if !href.contains("epubcfi") {
        return Some(PageListEntry {
            page,
            address: None,
            href: href.to_string(),
            package_href: None,
        });
    }

    let (package_href, fragment) = match href.split_once('#') {
        Some((package, fragment)) => (package.to_string(), Some(fragment)),
        None => (href.to_string(), None),
    };

    let address = fragment.and_then(|fragment| {
        let decoded = urlencoding::decode(fragment).ok()?;
        if !is_cfi_string(&decoded) {
            return None;
        }
        match parse(&decoded) {
            Ok(address) => Some(address),
            Err(e) => {
                warn!(page, href, error = %e, "Ignoring unparseable page-list CFI");
                None
            }
        }
    });

    Some(PageListEntry {
        page,
        address,
        href: href.to_string(),
        package_href: Some(package_href),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_with_encoded_cfi() {
        let entry = entry_from_item(
            " 12 ",
            "package.opf#epubcfi(%2F6%2F4%5Bchap01ref%5D!%2F4%2F2%2F1%3A10)",
        )
        .unwrap();

        assert_eq!(entry.page, 12);
        assert_eq!(entry.package_href.as_deref(), Some("package.opf"));
        assert_eq!(
            entry.address.unwrap().to_string(),
            "epubcfi(/6/4[chap01ref]!/4/2/1:10)"
        );
    }

    #[test]
    fn test_entry_without_cfi() {
        let entry = entry_from_item("3", "chapter1.xhtml#page3").unwrap();
        assert_eq!(entry.page, 3);
        assert!(entry.address.is_none());
        assert!(entry.package_href.is_none());
    }

    #[test]
    fn test_roman_numeral_is_skipped() {
        assert!(entry_from_item("xii", "front.xhtml#p12").is_none());
    }

    #[test]
    fn test_nav_items_only_from_page_list() {
        let nav = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="toc"><ol><li><a href="c1.xhtml">Chapter <b>1</b></a></li></ol></nav>
  <nav epub:type="page-list"><ol>
    <li><a href="c1.xhtml#p1">1</a></li>
    <li><a href="c1.xhtml#p2"><span>2</span></a></li>
  </ol></nav>
</body>
</html>"#;

        let items = nav_items(nav).unwrap();
        assert_eq!(
            items,
            vec![
                ("1".to_string(), "c1.xhtml#p1".to_string()),
                ("2".to_string(), "c1.xhtml#p2".to_string()),
            ]
        );
        assert!(!is_ncx(nav));
    }

    #[test]
    fn test_ncx_items() {
        let ncx = r#"<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap/>
  <pageList>
    <pageTarget id="p1" type="normal" value="1">
      <navLabel><text>1</text></navLabel>
      <content src="c1.xhtml#p1"/>
    </pageTarget>
  </pageList>
</ncx>"#;

        let items = ncx_items(ncx).unwrap();
        assert_eq!(items, vec![("1".to_string(), "c1.xhtml#p1".to_string())]);
        assert!(is_ncx(ncx));
    }
}
