//! THREDDS catalog documents.
//!
//! Two kinds of documents are read:
//!
//! - **Catalog documents** list sub-catalogs (`catalogRef`) and leaf
//!   datasets (`dataset[@urlPath]`). See [`CatalogDocument`].
//! - **Detail documents** (`<catalog>?dataset=<ID>`) describe a single
//!   dataset and the services it is published through. See [`DatasetDetail`].

use tracing::warn;

use crate::error::ParseError;
use crate::urls;
use crate::xml::Element;

/// XML namespaces used by THREDDS and ISO 19139 documents.
pub mod ns {
    pub const THREDDS: &str = "http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0";
    pub const XLINK: &str = "http://www.w3.org/1999/xlink";
    pub const GMD: &str = "http://www.isotc211.org/2005/gmd";
    pub const GCO: &str = "http://www.isotc211.org/2005/gco";
    pub const GML: &str = "http://www.opengis.net/gml/3.2";
}

/// A dataset with a `urlPath`, i.e. one that becomes a STAC item.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafDataset {
    pub id: String,
    pub name: Option<String>,
    pub url_path: String,
}

/// Shape of a catalog document, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Empty,
    /// At least one `catalogRef`; datasets alongside are ignored for counting.
    HasBranches,
    HasLeaves,
}

/// Sub-catalogs and leaf datasets of one catalog document.
#[derive(Debug, Clone, Default)]
pub struct CatalogDocument {
    /// Resolved child catalog URLs, in document order.
    pub branches: Vec<String>,
    /// Number of `catalogRef` elements, including any whose href was unusable.
    pub catalog_ref_count: usize,
    pub datasets: Vec<LeafDataset>,
}

impl CatalogDocument {
    /// Parse a catalog document fetched from `base_url`.
    pub fn parse(base_url: &str, xml: &str) -> Result<Self, ParseError> {
        let root = Element::parse(xml)?;
        Ok(Self::from_root(base_url, &root))
    }

    pub fn from_root(base_url: &str, root: &Element) -> Self {
        let mut doc = CatalogDocument::default();

        for reference in root.find_all(ns::THREDDS, "catalogRef") {
            doc.catalog_ref_count += 1;
            let Some(href) = reference.attr_ns(ns::XLINK, "href") else {
                warn!(catalog = base_url, "catalogRef without xlink:href");
                continue;
            };
            match urls::resolve(base_url, href) {
                Ok(url) => doc.branches.push(url),
                Err(e) => warn!(catalog = base_url, href, "skipping catalogRef: {}", e),
            }
        }

        collect_leaves(root, false, &mut doc.datasets);
        doc
    }

    pub fn kind(&self) -> DocumentKind {
        if self.catalog_ref_count > 0 {
            DocumentKind::HasBranches
        } else if !self.datasets.is_empty() {
            DocumentKind::HasLeaves
        } else {
            DocumentKind::Empty
        }
    }
}

fn collect_leaves(element: &Element, inside_ref: bool, out: &mut Vec<LeafDataset>) {
    for child in &element.children {
        let in_ref = inside_ref || child.is(ns::THREDDS, "catalogRef");
        if !in_ref && child.is(ns::THREDDS, "dataset") {
            if let Some(url_path) = child.attr("urlPath") {
                out.push(LeafDataset {
                    id: child.attr("ID").unwrap_or_default().to_string(),
                    name: child.attr("name").map(str::to_string),
                    url_path: url_path.to_string(),
                });
            }
        }
        collect_leaves(child, in_ref, out);
    }
}

/// A THREDDS `service` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub service_type: String,
    pub base: String,
    pub suffix: Option<String>,
    pub services: Vec<Service>,
}

impl Service {
    fn from_element(element: &Element) -> Self {
        Self {
            name: element.attr("name").unwrap_or_default().to_string(),
            service_type: element.attr("serviceType").unwrap_or_default().to_string(),
            base: element.attr("base").unwrap_or_default().to_string(),
            suffix: element.attr("suffix").map(str::to_string),
            services: element
                .children(ns::THREDDS, "service")
                .map(Service::from_element)
                .collect(),
        }
    }

    pub fn is_compound(&self) -> bool {
        self.service_type.eq_ignore_ascii_case("compound")
    }
}

/// The dataset described by a detail document, with its services.
#[derive(Debug, Clone)]
pub struct DatasetDetail {
    pub id: String,
    pub name: Option<String>,
    pub url_path: Option<String>,
    pub modified: Option<String>,
    pub service_name: Option<String>,
    /// Services selected for this dataset: the named service, or every
    /// compound service when the dataset names none.
    pub services: Vec<Service>,
}

impl DatasetDetail {
    /// Locate dataset `id` in a parsed detail document.
    ///
    /// Returns `None` when no dataset with that `ID` exists.
    pub fn from_root(root: &Element, id: &str) -> Option<Self> {
        let dataset = root
            .find_all(ns::THREDDS, "dataset")
            .into_iter()
            .find(|d| d.attr("ID") == Some(id))?;

        let modified = dataset
            .find_all(ns::THREDDS, "date")
            .into_iter()
            .find(|d| d.attr("type") == Some("modified"))
            .map(|d| d.text().to_string());

        let service_name = dataset
            .child(ns::THREDDS, "serviceName")
            .or_else(|| {
                dataset
                    .child(ns::THREDDS, "metadata")
                    .and_then(|m| m.child(ns::THREDDS, "serviceName"))
            })
            .map(|s| s.text().to_string());

        let services = root
            .find_all(ns::THREDDS, "service")
            .into_iter()
            .filter(|s| match &service_name {
                Some(name) => s.attr("name") == Some(name.as_str()),
                None => s
                    .attr("serviceType")
                    .is_some_and(|t| t.eq_ignore_ascii_case("compound")),
            })
            .map(Service::from_element)
            .collect();

        Some(Self {
            id: id.to_string(),
            name: dataset.attr("name").map(str::to_string),
            url_path: dataset.attr("urlPath").map(str::to_string),
            modified,
            service_name,
            services,
        })
    }

    /// Sub-services of the selected compound services, in document order.
    pub fn access_services(&self) -> impl Iterator<Item = &Service> {
        self.services
            .iter()
            .filter(|s| s.is_compound())
            .flat_map(|s| s.services.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="{}" xmlns:xlink="{}" version="1.0.1">{}</catalog>"#,
            ns::THREDDS,
            ns::XLINK,
            body
        )
    }

    #[test]
    fn branches_resolve_against_base() {
        let xml = catalog(
            r#"<dataset name="root">
                 <catalogRef xlink:href="a/catalog.xml" xlink:title="a" name=""/>
                 <catalogRef xlink:href="/thredds/catalog/b/catalog.xml" xlink:title="b" name=""/>
               </dataset>"#,
        );
        let doc = CatalogDocument::parse("https://tds.example.org/thredds/catalog/catalog.xml", &xml)
            .unwrap();
        assert_eq!(
            doc.branches,
            vec![
                "https://tds.example.org/thredds/catalog/a/catalog.xml",
                "https://tds.example.org/thredds/catalog/b/catalog.xml",
            ]
        );
        assert_eq!(doc.kind(), DocumentKind::HasBranches);
    }

    #[test]
    fn leaves_require_url_path() {
        let xml = catalog(
            r#"<dataset name="collection" ID="coll">
                 <dataset name="a.nc" ID="coll/a.nc" urlPath="coll/a.nc"/>
                 <dataset name="b.nc" ID="coll/b.nc" urlPath="coll/b.nc"/>
               </dataset>"#,
        );
        let doc = CatalogDocument::parse("http://h/thredds/catalog/coll/catalog.xml", &xml).unwrap();
        let ids: Vec<_> = doc.datasets.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["coll/a.nc", "coll/b.nc"]);
        assert_eq!(doc.kind(), DocumentKind::HasLeaves);
    }

    #[test]
    fn mixed_document_counts_as_branches() {
        let xml = catalog(
            r#"<dataset name="d" ID="d" urlPath="d.nc"/>
               <catalogRef xlink:href="x/catalog.xml" xlink:title="x"/>"#,
        );
        let doc = CatalogDocument::parse("http://h/catalog.xml", &xml).unwrap();
        assert_eq!(doc.kind(), DocumentKind::HasBranches);
        assert_eq!(doc.datasets.len(), 1);
    }

    #[test]
    fn datasets_inside_catalog_refs_are_not_leaves() {
        let xml = catalog(
            r#"<dataset name="top.nc" ID="top.nc" urlPath="top.nc"/>
               <catalogRef xlink:href="x/catalog.xml" xlink:title="x">
                 <dataset name="nested" ID="x/nested.nc" urlPath="x/nested.nc">
                   <dataset name="deeper" ID="x/deeper.nc" urlPath="x/deeper.nc"/>
                 </dataset>
               </catalogRef>"#,
        );
        let doc = CatalogDocument::parse("http://h/catalog.xml", &xml).unwrap();
        let ids: Vec<_> = doc.datasets.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["top.nc"]);
        assert_eq!(doc.branches, vec!["http://h/x/catalog.xml"]);
        assert_eq!(doc.kind(), DocumentKind::HasBranches);

        let only_nested = catalog(
            r#"<catalogRef xlink:href="x/catalog.xml" xlink:title="x">
                 <dataset name="nested" ID="x/nested.nc" urlPath="x/nested.nc"/>
               </catalogRef>"#,
        );
        let doc = CatalogDocument::parse("http://h/catalog.xml", &only_nested).unwrap();
        assert!(doc.datasets.is_empty());
        assert_eq!(doc.catalog_ref_count, 1);
        assert_eq!(doc.kind(), DocumentKind::HasBranches);
    }

    #[test]
    fn empty_document() {
        let doc = CatalogDocument::parse("http://h/catalog.xml", &catalog("")).unwrap();
        assert_eq!(doc.kind(), DocumentKind::Empty);
    }

    #[test]
    fn detail_uses_named_service() {
        let xml = catalog(
            r#"<service name="all" serviceType="Compound" base="">
                 <service name="odap" serviceType="OpenDAP" base="/thredds/dodsC/"/>
               </service>
               <service name="other" serviceType="Compound" base="">
                 <service name="http" serviceType="HTTPServer" base="/thredds/fileServer/"/>
               </service>
               <dataset name="a.nc" ID="ds/a.nc" urlPath="ds/a.nc">
                 <metadata inherited="true"><serviceName>all</serviceName></metadata>
                 <date type="modified">2021-03-04T05:06:07Z</date>
               </dataset>"#,
        );
        let root = Element::parse(&xml).unwrap();
        let detail = DatasetDetail::from_root(&root, "ds/a.nc").unwrap();
        assert_eq!(detail.service_name.as_deref(), Some("all"));
        assert_eq!(detail.modified.as_deref(), Some("2021-03-04T05:06:07Z"));
        let names: Vec<_> = detail.access_services().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["odap"]);
    }

    #[test]
    fn detail_falls_back_to_compound_services() {
        let xml = catalog(
            r#"<service name="all" serviceType="Compound" base="">
                 <service name="odap" serviceType="OpenDAP" base="/thredds/dodsC/"/>
               </service>
               <service name="virtual" serviceType="Compound" base="">
                 <service name="wms" serviceType="WMS" base="/thredds/wms/"/>
               </service>
               <dataset name="a.nc" ID="a" urlPath="a.nc"/>"#,
        );
        let root = Element::parse(&xml).unwrap();
        let detail = DatasetDetail::from_root(&root, "a").unwrap();
        assert!(detail.service_name.is_none());
        let names: Vec<_> = detail.access_services().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["odap", "wms"]);
    }

    #[test]
    fn detail_missing_dataset() {
        let root = Element::parse(&catalog(r#"<dataset name="x" ID="x"/>"#)).unwrap();
        assert!(DatasetDetail::from_root(&root, "y").is_none());
    }
}
