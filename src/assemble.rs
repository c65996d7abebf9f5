//! STAC item assembly.
//!
//! Turns [`ExtractedMetadata`] into an [`Item`]: rectangular footprint,
//! one asset per access service, and the datacube extension payload.
//!
//! # Service URLs
//!
//! `resolve(catalog, base) + urlPath + suffix`, then:
//!
//! | Service | Addition |
//! |---------|----------|
//! | `iso`, `ncml`, `uddc` | `?dataset=<ID>&catalog=<catalog URL>` |
//! | `odap` | `.html` |
//!
//! # Media types
//!
//! | Service | Media type |
//! |---------|-----------|
//! | `iso`, `ncml`, `wms`, `wcs` | `application/xml` |
//! | `http` | `application/netcdf` |
//! | `dap4`, `odap`, `uddc` | `text/html` |
//! | Other | `text/plain` |

use std::collections::BTreeMap;

use tds_stac_core::{media_type, Asset, Item, Variable};

use crate::error::AssemblyError;
use crate::metadata::{ExtractedMetadata, COORDINATE_NAMES};
use crate::thredds::Service;
use crate::urls;

/// Build the access URL of `service` for one dataset.
pub fn service_href(
    catalog_url: &str,
    service: &Service,
    url_path: &str,
    dataset_id: &str,
) -> Result<String, AssemblyError> {
    let base = urls::resolve(catalog_url, &service.base).map_err(|e| AssemblyError::ServiceUrl {
        base: service.base.clone(),
        message: e.to_string(),
    })?;

    let mut href = format!("{}{}", base, url_path);
    if let Some(suffix) = &service.suffix {
        href.push_str(suffix);
    }

    match service.name.as_str() {
        "iso" | "ncml" | "uddc" => {
            href = urls::with_dataset_query(&href, dataset_id, urls::strip_query(catalog_url))
                .map_err(|e| AssemblyError::ServiceUrl {
                    base: service.base.clone(),
                    message: e.to_string(),
                })?;
        }
        "odap" => href.push_str(".html"),
        _ => {}
    }

    Ok(href)
}

/// Media type of the asset produced by a service.
pub fn media_type_for(service_name: &str) -> &'static str {
    match service_name {
        "iso" | "ncml" | "wms" | "wcs" => media_type::XML,
        "http" => media_type::NETCDF,
        "dap4" | "odap" | "uddc" => media_type::HTML,
        _ => media_type::TEXT,
    }
}

/// Assemble the STAC item for one dataset.
pub fn assemble(metadata: &ExtractedMetadata) -> Result<Item, AssemblyError> {
    let mut item = Item::new(metadata.dataset_id.clone(), metadata.bbox, metadata.modified);
    item.properties.title = metadata.name.clone();

    for service in &metadata.services {
        let href = service_href(
            &metadata.catalog_url,
            service,
            &metadata.url_path,
            &metadata.dataset_id,
        )?;
        let mut asset = Asset::new(href, media_type_for(&service.name));
        if !service.service_type.is_empty() {
            asset.title = Some(service.service_type.clone());
        }
        item.add_asset(service.name.clone(), asset);
    }

    let mut variables = BTreeMap::new();
    for variable in &metadata.variables {
        if COORDINATE_NAMES.contains(&variable.name.as_str()) {
            continue;
        }
        let description = variable
            .description
            .clone()
            .ok_or_else(|| AssemblyError::MissingDescriptor(variable.name.clone()))?;
        variables.insert(
            variable.name.clone(),
            Variable::data(description, metadata.keywords.clone()),
        );
    }

    let dimensions: BTreeMap<_, _> = metadata.dimensions()?.into_iter().collect();
    item.apply_datacube(dimensions, variables);

    Ok(item)
}
